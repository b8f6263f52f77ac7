use std::sync::Arc;

use crate::{
  error::RxError,
  observable::{Observable, ObservableSource},
  observer::Observer,
  safe_observer::SafeObserver,
};

impl<Item: Send + 'static> Observable<Item> {
  /// Creates a new stream which calls a closure on each element and uses
  /// its return as the value.
  pub fn map<B, F>(&self, f: F) -> Observable<B>
  where
    B: Send + 'static,
    F: Fn(Item) -> B + Send + Sync + 'static,
  {
    Observable::new(MapOp { source: self.clone(), func: Arc::new(f) })
  }
}

struct MapOp<Item, F> {
  source: Observable<Item>,
  func: Arc<F>,
}

impl<Item, B, F> ObservableSource<B> for MapOp<Item, F>
where
  Item: Send + 'static,
  B: Send + 'static,
  F: Fn(Item) -> B + Send + Sync + 'static,
{
  fn actual_subscribe(&self, observer: SafeObserver<B>) {
    let upstream = observer.upstream(MapObserver { observer: observer.clone(), func: self.func.clone() });
    self.source.actual_subscribe(upstream);
  }
}

struct MapObserver<B, F> {
  observer: SafeObserver<B>,
  func: Arc<F>,
}

impl<Item, B, F> Observer<Item> for MapObserver<B, F>
where
  B: Send + 'static,
  F: Fn(Item) -> B + Send + Sync + 'static,
{
  fn next(&mut self, value: Item) { self.observer.next((self.func)(value)) }

  fn error(&mut self, err: RxError) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::observable;

  #[test]
  fn maps_values() {
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    observable::range(1, 3)
      .map(|v| format!("#{v}"))
      .subscribe(move |v| c_seen.lock().push(v));
    assert_eq!(*seen.lock(), vec!["#1", "#2", "#3"]);
  }

  #[test]
  fn panicking_mapper_errors_the_stream() {
    let failed = Arc::new(Mutex::new(false));
    let c_failed = failed.clone();
    observable::create(|emitter| {
      emitter.next(0);
      emitter.next(1);
      Ok(())
    })
    .map(|v: i32| 10 / v)
    .subscribe_all(|_| {}, move |e| *c_failed.lock() = e.is_panic(), || {});
    assert!(*failed.lock());
  }
}
