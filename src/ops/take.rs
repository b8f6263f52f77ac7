use crate::{
  error::RxError,
  observable::{Observable, ObservableSource},
  observer::Observer,
  safe_observer::SafeObserver,
};

impl<Item: Send + 'static> Observable<Item> {
  /// Emits only the first `count` values emitted by the source, then
  /// completes and disposes the source, regardless of whether the source
  /// completes.
  ///
  /// ```
  /// # use rxkit::prelude::*;
  /// observable::range(0, 10).take(5).subscribe(|v| println!("{v}"));
  /// // prints 0 to 4
  /// ```
  pub fn take(&self, count: usize) -> Observable<Item> {
    Observable::new(TakeOp { source: self.clone(), count })
  }
}

struct TakeOp<Item> {
  source: Observable<Item>,
  count: usize,
}

impl<Item: Send + 'static> ObservableSource<Item> for TakeOp<Item> {
  fn actual_subscribe(&self, observer: SafeObserver<Item>) {
    if self.count == 0 {
      observer.complete();
      return;
    }
    let upstream = observer.upstream(TakeObserver { observer: observer.clone(), left: self.count });
    self.source.actual_subscribe(upstream);
  }
}

struct TakeObserver<Item> {
  observer: SafeObserver<Item>,
  left: usize,
}

impl<Item: Send + 'static> Observer<Item> for TakeObserver<Item> {
  fn next(&mut self, value: Item) {
    if self.left == 0 {
      return;
    }
    self.left -= 1;
    self.observer.next(value);
    if self.left == 0 {
      self.observer.complete();
    }
  }

  fn error(&mut self, err: RxError) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }
}
