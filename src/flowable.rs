//! Flowable: the pull-based, backpressured counterpart of
//! [`Observable`](crate::observable::Observable).
//!
//! A [`Subscriber`] receives a [`Subscription`] in `on_subscribe` and nothing
//! flows until it calls [`Subscription::request`]. Demand accumulates and
//! saturates at [`UNBOUNDED`]; a source never delivers more values than
//! have been requested. Producers that cannot slow down are adapted with a
//! [`BackpressureStrategy`] through [`Flowable::create`].
//!
//! ```rust
//! use rxkit::prelude::*;
//!
//! let seen = std::sync::Arc::new(parking_lot::Mutex::new(vec![]));
//! let c_seen = seen.clone();
//! Flowable::range(1, 100).subscribe_with(
//!   move |v| c_seen.lock().push(v),
//!   |_| {},
//!   || {},
//!   |subscription| subscription.request(3),
//! );
//! assert_eq!(*seen.lock(), vec![1, 2, 3]);
//! ```

use std::sync::{
  atomic::{AtomicU64, Ordering},
  Arc,
};

use crate::{
  disposable::{Disposable, DisposableLike},
  error::RxError,
  observable::{Observable, ObservableSource},
  observer::{noop, unhandled_error},
  safe_observer::SafeObserver,
  scheduler::Scheduler,
};

mod create;
mod from_iter;
mod safe_subscriber;

pub use create::FlowableEmitter;
pub use safe_subscriber::SafeSubscriber;

/// Demand value meaning "no limit".
pub const UNBOUNDED: u64 = u64::MAX;

/// Default capacity of [`BackpressureStrategy::Buffer`].
pub const DEFAULT_BUFFER_CAPACITY: usize = 128;

// ============================================================================
// Backpressure strategy
// ============================================================================

/// What [`Flowable::create`] does with values produced while there is no
/// outstanding demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressureStrategy {
  /// Fail with [`RxError::BackpressureOverflow`].
  Error,
  /// Queue up to `capacity` values until demand arrives. Exceeding the
  /// capacity fails with [`RxError::BackpressureOverflow`].
  Buffer { capacity: usize },
  /// Discard the value.
  Drop,
  /// Keep only the most recent undelivered value.
  Latest,
}

impl BackpressureStrategy {
  /// `Buffer` with [`DEFAULT_BUFFER_CAPACITY`].
  pub fn buffer() -> Self { Self::Buffer { capacity: DEFAULT_BUFFER_CAPACITY } }
}

impl Default for BackpressureStrategy {
  fn default() -> Self { Self::buffer() }
}

// ============================================================================
// Subscriber & Subscription
// ============================================================================

/// Consumer of a [`Flowable`].
pub trait Subscriber<Item>: Send + 'static {
  /// Receives the demand controller before any other event.
  fn on_subscribe(&mut self, subscription: Subscription);

  fn next(&mut self, value: Item);

  fn error(&mut self, err: RxError);

  fn complete(&mut self);
}

pub type BoxedSubscriber<Item> = Box<dyn Subscriber<Item>>;

impl<Item: 'static> Subscriber<Item> for BoxedSubscriber<Item> {
  fn on_subscribe(&mut self, subscription: Subscription) { (**self).on_subscribe(subscription) }

  fn next(&mut self, value: Item) { (**self).next(value) }

  fn error(&mut self, err: RxError) { (**self).error(err) }

  fn complete(&mut self) { (**self).complete() }
}

/// The demand side a source hands to its subscriber.
pub trait SubscriptionLike: Send + Sync + 'static {
  /// Add `n` to the outstanding demand.
  fn request(&self, n: u64);

  /// Stop delivery and release the source. Idempotent.
  fn cancel(&self);

  fn is_cancelled(&self) -> bool;
}

/// Cloneable demand controller.
#[derive(Clone)]
pub struct Subscription(Arc<dyn SubscriptionLike>);

impl Subscription {
  pub fn new(inner: impl SubscriptionLike) -> Self { Self(Arc::new(inner)) }

  /// A subscription with nothing behind it.
  pub fn empty() -> Self { Self::new(EmptySubscription) }

  /// Request `n` more values. `request(0)` is a protocol violation: the
  /// subscriber receives [`RxError::Protocol`] and the subscription is
  /// cancelled.
  pub fn request(&self, n: u64) { self.0.request(n) }

  pub fn cancel(&self) { self.0.cancel() }

  pub fn is_cancelled(&self) -> bool { self.0.is_cancelled() }

  /// A [`Disposable`] that cancels this subscription.
  pub fn to_disposable(&self) -> Disposable { Disposable::from_like(Arc::new(self.clone())) }
}

impl DisposableLike for Subscription {
  fn dispose(&self) { self.cancel() }

  fn is_disposed(&self) -> bool { self.is_cancelled() }

  fn identity(&self) -> *const () { Arc::as_ptr(&self.0) as *const () }
}

struct EmptySubscription;

impl SubscriptionLike for EmptySubscription {
  fn request(&self, _: u64) {}

  fn cancel(&self) {}

  fn is_cancelled(&self) -> bool { false }
}

// ============================================================================
// Demand accounting
// ============================================================================

/// Add `n` to `requested`, saturating at [`UNBOUNDED`].
pub(crate) fn add_demand(requested: &AtomicU64, n: u64) -> u64 {
  let previous = requested
    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
      Some(current.saturating_add(n))
    })
    .unwrap_or(UNBOUNDED);
  previous.saturating_add(n)
}

/// Subtract `n` delivered values. Unbounded demand stays unbounded.
pub(crate) fn produced(requested: &AtomicU64, n: u64) -> u64 {
  let previous = requested
    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
      if current == UNBOUNDED { None } else { Some(current.saturating_sub(n)) }
    })
    .unwrap_or(UNBOUNDED);
  if previous == UNBOUNDED { UNBOUNDED } else { previous.saturating_sub(n) }
}

/// Take one unit of demand if there is any.
pub(crate) fn try_consume(requested: &AtomicU64) -> bool {
  requested
    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| match current {
      0 => None,
      UNBOUNDED => Some(UNBOUNDED),
      n => Some(n - 1),
    })
    .is_ok()
}

// ============================================================================
// Flowable
// ============================================================================

/// The producing side behind a [`Flowable`].
///
/// `actual_subscribe` must call `subscriber.on_subscribe` exactly once and
/// then honor the demand the subscriber expresses through it.
pub trait FlowableSource<Item>: Send + Sync + 'static {
  fn actual_subscribe(&self, subscriber: SafeSubscriber<Item>);
}

/// A cheaply cloneable description of a backpressured sequence.
pub struct Flowable<Item> {
  source: Arc<dyn FlowableSource<Item>>,
}

impl<Item> Clone for Flowable<Item> {
  fn clone(&self) -> Self { Self { source: self.source.clone() } }
}

impl<Item: Send + 'static> Flowable<Item> {
  pub fn new(source: impl FlowableSource<Item>) -> Self { Self { source: Arc::new(source) } }

  /// Attach an already-guarded subscriber.
  pub fn actual_subscribe(&self, subscriber: SafeSubscriber<Item>) {
    self.source.actual_subscribe(subscriber)
  }

  /// Subscribe a full [`Subscriber`]. The returned handle cancels the
  /// subscription.
  pub fn subscribe_subscriber(&self, subscriber: impl Subscriber<Item>) -> Disposable {
    let safe = SafeSubscriber::new(subscriber);
    self.actual_subscribe(safe.clone());
    safe.subscription().to_disposable()
  }

  /// Subscribe to values only, requesting everything. Errors are logged.
  pub fn subscribe<N>(&self, next: N) -> Disposable
  where
    N: FnMut(Item) + Send + 'static,
  {
    self.subscribe_subscriber(FnSubscriber::new(next, unhandled_error, noop, request_all))
  }

  /// Subscribe with value, error and completion callbacks, requesting
  /// everything.
  pub fn subscribe_all<N, E, C>(&self, next: N, error: E, complete: C) -> Disposable
  where
    N: FnMut(Item) + Send + 'static,
    E: FnMut(RxError) + Send + 'static,
    C: FnMut() + Send + 'static,
  {
    self.subscribe_subscriber(FnSubscriber::new(next, error, complete, request_all))
  }

  /// Subscribe with full control over demand: `on_subscribe` receives the
  /// [`Subscription`] and nothing is requested on its behalf.
  pub fn subscribe_with<N, E, C, S>(&self, next: N, error: E, complete: C, on_subscribe: S) -> Disposable
  where
    N: FnMut(Item) + Send + 'static,
    E: FnMut(RxError) + Send + 'static,
    C: FnMut() + Send + 'static,
    S: FnOnce(Subscription) + Send + 'static,
  {
    self.subscribe_subscriber(FnSubscriber::new(next, error, complete, on_subscribe))
  }

  /// View this flowable as an [`Observable`], requesting everything.
  pub fn to_observable(&self) -> Observable<Item> { Observable::new(ToObservable { source: self.clone() }) }

  /// Subscribe to the source on `scheduler`. Cancelling before the task
  /// runs prevents the subscription altogether.
  pub fn subscribe_on<S: Scheduler>(&self, scheduler: S) -> Flowable<Item> {
    Flowable::new(SubscribeOn { source: self.clone(), scheduler })
  }
}

impl<Item: Send + 'static> Observable<Item> {
  /// Adapt this observable to the pull model, applying `strategy` to values
  /// that arrive without demand.
  pub fn to_flowable(&self, strategy: BackpressureStrategy) -> Flowable<Item> {
    let source = self.clone();
    Flowable::create(
      move |emitter: FlowableEmitter<Item>| {
        let (on_next, on_error, on_complete) = (emitter.clone(), emitter.clone(), emitter.clone());
        let handle = source.subscribe_all(
          move |v| on_next.next(v),
          move |err| on_error.error(err),
          move || on_complete.complete(),
        );
        emitter.add(handle);
        Ok(())
      },
      strategy,
    )
  }
}

fn request_all(subscription: Subscription) { subscription.request(UNBOUNDED) }

/// Subscriber built from closures.
pub struct FnSubscriber<N, E, C, S> {
  next: N,
  error: E,
  complete: C,
  on_subscribe: Option<S>,
}

impl<N, E, C, S> FnSubscriber<N, E, C, S> {
  pub fn new(next: N, error: E, complete: C, on_subscribe: S) -> Self {
    Self { next, error, complete, on_subscribe: Some(on_subscribe) }
  }
}

impl<Item, N, E, C, S> Subscriber<Item> for FnSubscriber<N, E, C, S>
where
  N: FnMut(Item) + Send + 'static,
  E: FnMut(RxError) + Send + 'static,
  C: FnMut() + Send + 'static,
  S: FnOnce(Subscription) + Send + 'static,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    if let Some(on_subscribe) = self.on_subscribe.take() {
      on_subscribe(subscription);
    }
  }

  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  #[inline]
  fn error(&mut self, err: RxError) { (self.error)(err) }

  #[inline]
  fn complete(&mut self) { (self.complete)() }
}

// ==================== to_observable ====================

struct ToObservable<Item> {
  source: Flowable<Item>,
}

impl<Item: Send + 'static> ObservableSource<Item> for ToObservable<Item> {
  fn actual_subscribe(&self, observer: SafeObserver<Item>) {
    self
      .source
      .actual_subscribe(SafeSubscriber::new(ObserverSubscriber { observer }));
  }
}

struct ObserverSubscriber<Item> {
  observer: SafeObserver<Item>,
}

impl<Item: Send + 'static> Subscriber<Item> for ObserverSubscriber<Item> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.observer.add(subscription.to_disposable());
    subscription.request(UNBOUNDED);
  }

  fn next(&mut self, value: Item) { self.observer.next(value) }

  fn error(&mut self, err: RxError) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }
}

// ==================== subscribe_on ====================

struct SubscribeOn<Item, S> {
  source: Flowable<Item>,
  scheduler: S,
}

impl<Item: Send + 'static, S: Scheduler> FlowableSource<Item> for SubscribeOn<Item, S> {
  fn actual_subscribe(&self, subscriber: SafeSubscriber<Item>) {
    let source = self.source.clone();
    let target = subscriber.clone();
    match self.scheduler.schedule(move || source.actual_subscribe(target), None) {
      Ok(handle) => subscriber.add(handle),
      Err(err) => subscriber.reject(err),
    }
  }
}
