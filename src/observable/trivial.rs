use super::{Observable, ObservableSource};
use crate::{error::RxError, safe_observer::SafeObserver};

/// Completes immediately without emitting.
pub fn empty<Item: Send + 'static>() -> Observable<Item> { Observable::new(Empty) }

/// Never emits and never terminates.
pub fn never<Item: Send + 'static>() -> Observable<Item> { Observable::new(Never) }

/// Fails immediately with `err` (a clone per subscription).
pub fn throw<Item: Send + 'static>(err: RxError) -> Observable<Item> { Observable::new(Throw(err)) }

struct Empty;

impl<Item: Send + 'static> ObservableSource<Item> for Empty {
  fn actual_subscribe(&self, observer: SafeObserver<Item>) { observer.complete() }
}

struct Never;

impl<Item: Send + 'static> ObservableSource<Item> for Never {
  fn actual_subscribe(&self, _observer: SafeObserver<Item>) {}
}

struct Throw(RxError);

impl<Item: Send + 'static> ObservableSource<Item> for Throw {
  fn actual_subscribe(&self, observer: SafeObserver<Item>) { observer.error(self.0.clone()) }
}
