//! Observable: the push-based, cold-by-default source.
//!
//! An [`Observable`] only describes a sequence. Nothing runs until
//! `subscribe`, and every subscription runs the producer afresh.
//!
//! ```rust
//! use rxkit::prelude::*;
//!
//! let evens = observable::range(1, 10).filter(|v| v % 2 == 0).map(|v| v * 10);
//! let first = std::sync::Arc::new(parking_lot::Mutex::new(vec![]));
//! let c_first = first.clone();
//! evens.subscribe(move |v| c_first.lock().push(v));
//! assert_eq!(*first.lock(), vec![20, 40, 60, 80, 100]);
//! ```

use std::sync::Arc;

use crate::{
  disposable::Disposable,
  error::RxError,
  observer::{noop, noop_subscribe, unhandled_error, FnObserver, Observer},
  safe_observer::SafeObserver,
};

mod connectable;
mod create;
mod defer;
mod from_iter;
mod interval;
mod trivial;

pub use connectable::ConnectableObservable;
pub use create::create;
pub use defer::defer;
pub use from_iter::{from_iter, just, of, range, repeat};
pub(crate) use from_iter::range_overflow;
pub use interval::{interval, interval_at, timer};
pub use trivial::{empty, never, throw};

/// The producing side behind an [`Observable`].
///
/// `actual_subscribe` is called once per subscription. It must deliver
/// events only through `observer` and stop once `observer.is_closed()`.
pub trait ObservableSource<Item>: Send + Sync + 'static {
  fn actual_subscribe(&self, observer: SafeObserver<Item>);
}

/// A cheaply cloneable description of a push sequence.
pub struct Observable<Item> {
  source: Arc<dyn ObservableSource<Item>>,
}

impl<Item> Clone for Observable<Item> {
  fn clone(&self) -> Self { Self { source: self.source.clone() } }
}

impl<Item: Send + 'static> Observable<Item> {
  pub fn new(source: impl ObservableSource<Item>) -> Self { Self { source: Arc::new(source) } }

  /// Attach an already-guarded observer, bypassing `on_subscribe`. This is
  /// how operators subscribe to their upstream.
  pub fn actual_subscribe(&self, observer: SafeObserver<Item>) {
    self.source.actual_subscribe(observer)
  }

  /// Subscribe a full [`Observer`]. `on_subscribe` is delivered before the
  /// producer starts.
  pub fn subscribe_observer(&self, observer: impl Observer<Item>) -> Disposable {
    let safe = SafeObserver::new(observer);
    safe.start();
    if !safe.is_closed() {
      self.actual_subscribe(safe.clone());
    }
    safe.disposable()
  }

  /// Subscribe to values only. Errors are logged.
  pub fn subscribe<N>(&self, next: N) -> Disposable
  where
    N: FnMut(Item) + Send + 'static,
  {
    self.subscribe_observer(FnObserver::new(next, unhandled_error, noop, noop_subscribe))
  }

  /// Subscribe with value, error and completion callbacks.
  pub fn subscribe_all<N, E, C>(&self, next: N, error: E, complete: C) -> Disposable
  where
    N: FnMut(Item) + Send + 'static,
    E: FnMut(RxError) + Send + 'static,
    C: FnMut() + Send + 'static,
  {
    self.subscribe_observer(FnObserver::new(next, error, complete, noop_subscribe))
  }

  /// Like [`subscribe_all`](Self::subscribe_all), also receiving the
  /// subscription handle before anything is emitted.
  pub fn subscribe_with<N, E, C, S>(&self, next: N, error: E, complete: C, on_subscribe: S) -> Disposable
  where
    N: FnMut(Item) + Send + 'static,
    E: FnMut(RxError) + Send + 'static,
    C: FnMut() + Send + 'static,
    S: FnOnce(Disposable) + Send + 'static,
  {
    self.subscribe_observer(FnObserver::new(next, error, complete, on_subscribe))
  }
}
