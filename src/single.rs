//! Single: a source of exactly one value or an error.

use parking_lot::Mutex;

use crate::{
  disposable::Disposable,
  error::{RxError, RxResult},
  observable::{self, Observable},
  observer::unhandled_error,
  safe_observer::ObservableEmitter,
};

/// Emitter handed to [`Single::create`] producers.
pub struct SingleEmitter<Item> {
  emitter: ObservableEmitter<Item>,
}

impl<Item: Send + 'static> SingleEmitter<Item> {
  pub fn on_success(&self, value: Item) {
    if self.emitter.is_closed() {
      return;
    }
    self.emitter.next(value);
    self.emitter.complete();
  }

  pub fn on_error(&self, err: RxError) { self.emitter.error(err) }

  pub fn is_disposed(&self) -> bool { self.emitter.is_closed() }

  /// Register teardown that runs on dispose or after the result.
  pub fn add(&self, teardown: Disposable) { self.emitter.add(teardown) }
}

/// A cold source that yields one value (`on_success`) or fails
/// (`on_error`). At most one of the two is delivered.
///
/// ```rust
/// # use rxkit::prelude::*;
/// Single::from_callable(|| Ok(21 * 2)).subscribe(|v| assert_eq!(v, 42), |_| {});
/// ```
pub struct Single<Item> {
  source: Observable<Item>,
}

impl<Item> Clone for Single<Item> {
  fn clone(&self) -> Self { Self { source: self.source.clone() } }
}

impl<Item: Send + 'static> Single<Item> {
  /// `emit_fn` runs once per subscriber. Returning without calling
  /// `on_success` or `on_error` leaves the subscription pending, so a
  /// producer may hand its emitter to a callback or a scheduled task and
  /// signal later. A producer that never signals behaves like
  /// [`never`](crate::observable::never).
  pub fn create<F>(emit_fn: F) -> Self
  where
    F: Fn(SingleEmitter<Item>) -> RxResult<()> + Send + Sync + 'static,
  {
    Self { source: observable::create(move |emitter| emit_fn(SingleEmitter { emitter })) }
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

  /// Calls `f` anew for every subscriber; `Err` becomes `on_error`.
  pub fn from_callable<F>(f: F) -> Self
  where
    F: Fn() -> RxResult<Item> + Send + Sync + 'static,
  {
    Self::create(move |emitter| {
      emitter.on_success(f()?);
      Ok(())
    })
  }

  pub fn subscribe<S, E>(&self, on_success: S, on_error: E) -> Disposable
  where
    S: FnOnce(Item) + Send + 'static,
    E: FnOnce(RxError) + Send + 'static,
  {
    let on_success = Mutex::new(Some(on_success));
    let on_error = Mutex::new(Some(on_error));
    self.source.subscribe_all(
      move |value| {
        if let Some(f) = on_success.lock().take() {
          f(value);
        }
      },
      move |err| match on_error.lock().take() {
        Some(f) => f(err),
        None => unhandled_error(err),
      },
      || {},
    )
  }

  /// One `next` followed by `complete`, or `error`.
  pub fn to_observable(&self) -> Observable<Item> { self.source.clone() }
}

impl<Item: Send + 'static> From<Single<Item>> for Observable<Item> {
  fn from(single: Single<Item>) -> Self { single.source }
}
