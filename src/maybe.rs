//! Maybe: a source of at most one value.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use parking_lot::Mutex;

use crate::{
  disposable::Disposable,
  error::{RxError, RxResult},
  observable::{self, Observable},
  observer::unhandled_error,
  safe_observer::ObservableEmitter,
};

/// Emitter handed to [`Maybe::create`] producers.
pub struct MaybeEmitter<Item> {
  emitter: ObservableEmitter<Item>,
}

impl<Item: Send + 'static> MaybeEmitter<Item> {
  pub fn on_success(&self, value: Item) {
    if self.emitter.is_closed() {
      return;
    }
    self.emitter.next(value);
    self.emitter.complete();
  }

  /// Finish without a value.
  pub fn on_complete(&self) { self.emitter.complete() }

  pub fn on_error(&self, err: RxError) { self.emitter.error(err) }

  pub fn is_disposed(&self) -> bool { self.emitter.is_closed() }

  pub fn add(&self, teardown: Disposable) { self.emitter.add(teardown) }
}

/// A cold source that yields one value, nothing, or an error: exactly one
/// of `on_success`, `on_complete` and `on_error` is delivered.
pub struct Maybe<Item> {
  source: Observable<Item>,
}

impl<Item> Clone for Maybe<Item> {
  fn clone(&self) -> Self { Self { source: self.source.clone() } }
}

impl<Item: Send + 'static> Maybe<Item> {
  pub fn create<F>(emit_fn: F) -> Self
  where
    F: Fn(MaybeEmitter<Item>) -> RxResult<()> + Send + Sync + 'static,
  {
    Self { source: observable::create(move |emitter| emit_fn(MaybeEmitter { emitter })) }
  }

  pub fn just(value: Item) -> Self
  where
    Item: Clone + Sync,
  {
    Self::create(move |emitter| {
      emitter.on_success(value.clone());
      Ok(())
    })
  }

  pub fn empty() -> Self {
    Self::create(|emitter| {
      emitter.on_complete();
      Ok(())
    })
  }

  /// Calls `f` anew for every subscriber: `Some` succeeds, `None`
  /// completes empty.
  pub fn from_callable<F>(f: F) -> Self
  where
    F: Fn() -> RxResult<Option<Item>> + Send + Sync + 'static,
  {
    Self::create(move |emitter| {
      match f()? {
        Some(value) => emitter.on_success(value),
        None => emitter.on_complete(),
      }
      Ok(())
    })
  }

  pub fn subscribe<S, C, E>(&self, on_success: S, on_complete: C, on_error: E) -> Disposable
  where
    S: FnOnce(Item) + Send + 'static,
    C: FnOnce() + Send + 'static,
    E: FnOnce(RxError) + Send + 'static,
  {
    let succeeded = Arc::new(AtomicBool::new(false));
    let c_succeeded = succeeded.clone();
    let on_success = Mutex::new(Some(on_success));
    let on_complete = Mutex::new(Some(on_complete));
    let on_error = Mutex::new(Some(on_error));
    self.source.subscribe_all(
      move |value| {
        if let Some(f) = on_success.lock().take() {
          c_succeeded.store(true, Ordering::Release);
          f(value);
        }
      },
      move |err| match on_error.lock().take() {
        Some(f) => f(err),
        None => unhandled_error(err),
      },
      move || {
        if succeeded.load(Ordering::Acquire) {
          return;
        }
        if let Some(f) = on_complete.lock().take() {
          f();
        }
      },
    )
  }

  /// Zero or one `next`, then `complete`; or `error`.
  pub fn to_observable(&self) -> Observable<Item> { self.source.clone() }
}

impl<Item: Send + 'static> From<Maybe<Item>> for Observable<Item> {
  fn from(maybe: Maybe<Item>) -> Self { maybe.source }
}
