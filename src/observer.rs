//! Observer trait and implementations
//!
//! The Observer trait defines the consumer of data in the push model. The
//! engine calls `on_subscribe` first, then any number of `next`, then at most
//! one of `error` / `complete`. Implementations never need to guard against
//! out-of-order calls: every observer handed to the engine is wrapped in a
//! [`SafeObserver`](crate::safe_observer::SafeObserver) that enforces the
//! protocol.

use crate::{disposable::Disposable, error::RxError, logging};

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: The consumer of data in reactive programming
pub trait Observer<Item>: Send + 'static {
  /// Receives the handle of the subscription before any other event. The
  /// observer may keep it to dispose the subscription from inside a
  /// callback.
  fn on_subscribe(&mut self, _disposable: Disposable) {}

  /// Receive the next value from the observable
  fn next(&mut self, value: Item);

  /// Handle an error from the observable. No event follows.
  fn error(&mut self, err: RxError);

  /// Handle completion of the observable. No event follows.
  fn complete(&mut self);
}

pub type BoxedObserver<Item> = Box<dyn Observer<Item>>;

impl<Item: 'static> Observer<Item> for BoxedObserver<Item> {
  fn on_subscribe(&mut self, disposable: Disposable) { (**self).on_subscribe(disposable) }

  fn next(&mut self, value: Item) { (**self).next(value) }

  fn error(&mut self, err: RxError) { (**self).error(err) }

  fn complete(&mut self) { (**self).complete() }
}

// ============================================================================
// Closure observer
// ============================================================================

/// Observer built from closures, used by the `subscribe*` convenience
/// methods.
pub struct FnObserver<N, E, C, S> {
  next: N,
  error: E,
  complete: C,
  on_subscribe: Option<S>,
}

impl<N, E, C, S> FnObserver<N, E, C, S> {
  pub fn new(next: N, error: E, complete: C, on_subscribe: S) -> Self {
    Self { next, error, complete, on_subscribe: Some(on_subscribe) }
  }
}

impl<Item, N, E, C, S> Observer<Item> for FnObserver<N, E, C, S>
where
  N: FnMut(Item) + Send + 'static,
  E: FnMut(RxError) + Send + 'static,
  C: FnMut() + Send + 'static,
  S: FnOnce(Disposable) + Send + 'static,
{
  fn on_subscribe(&mut self, disposable: Disposable) {
    if let Some(on_subscribe) = self.on_subscribe.take() {
      on_subscribe(disposable);
    }
  }

  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  #[inline]
  fn error(&mut self, err: RxError) { (self.error)(err) }

  #[inline]
  fn complete(&mut self) { (self.complete)() }
}

/// Error handler used when a subscriber did not supply one.
pub(crate) fn unhandled_error(err: RxError) {
  logging::error!("unhandled stream error: {}", err);
}

pub(crate) fn noop() {}

pub(crate) fn noop_subscribe(_: Disposable) {}
