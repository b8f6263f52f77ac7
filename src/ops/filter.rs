use std::sync::Arc;

use crate::{
  error::RxError,
  observable::{Observable, ObservableSource},
  observer::Observer,
  safe_observer::SafeObserver,
};

impl<Item: Send + 'static> Observable<Item> {
  /// Emit only the values for which `predicate` holds.
  pub fn filter<F>(&self, predicate: F) -> Observable<Item>
  where
    F: Fn(&Item) -> bool + Send + Sync + 'static,
  {
    Observable::new(FilterOp { source: self.clone(), predicate: Arc::new(predicate) })
  }
}

struct FilterOp<Item, F> {
  source: Observable<Item>,
  predicate: Arc<F>,
}

impl<Item, F> ObservableSource<Item> for FilterOp<Item, F>
where
  Item: Send + 'static,
  F: Fn(&Item) -> bool + Send + Sync + 'static,
{
  fn actual_subscribe(&self, observer: SafeObserver<Item>) {
    let upstream = observer.upstream(FilterObserver {
      observer: observer.clone(),
      predicate: self.predicate.clone(),
    });
    self.source.actual_subscribe(upstream);
  }
}

struct FilterObserver<Item, F> {
  observer: SafeObserver<Item>,
  predicate: Arc<F>,
}

impl<Item, F> Observer<Item> for FilterObserver<Item, F>
where
  Item: Send + 'static,
  F: Fn(&Item) -> bool + Send + Sync + 'static,
{
  fn next(&mut self, value: Item) {
    if (self.predicate)(&value) {
      self.observer.next(value)
    }
  }

  fn error(&mut self, err: RxError) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::observable;

  #[test]
  fn keeps_matching_values() {
    let seen = Arc::new(Mutex::new(vec![]));
    let done = Arc::new(Mutex::new(false));
    let (c_seen, c_done) = (seen.clone(), done.clone());
    observable::range(0, 10).filter(|v| v % 3 == 0).subscribe_all(
      move |v| c_seen.lock().push(v),
      |_| {},
      move || *c_done.lock() = true,
    );
    assert_eq!(*seen.lock(), vec![0, 3, 6, 9]);
    assert!(*done.lock());
  }
}
