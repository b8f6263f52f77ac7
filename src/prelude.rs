//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Factories live in `observable::*`
pub use crate::observable;
// Core types
pub use crate::observable::{ConnectableObservable, Observable, ObservableSource};
pub use crate::observer::Observer;
pub use crate::safe_observer::{ObservableEmitter, SafeObserver};
// Disposables
pub use crate::disposable::{CompositeDisposable, Disposable, DisposableGuard, DisposableLike, SerialDisposable};
// Errors
pub use crate::error::{RxError, RxResult};
// Backpressure
pub use crate::flowable::{
  BackpressureStrategy, Flowable, FlowableEmitter, Subscriber, Subscription, UNBOUNDED,
};
// Hot sources
pub use crate::subject::Subject;
// Single-value types
pub use crate::{completable::Completable, maybe::Maybe, single::Single};
// Schedulers
pub use crate::scheduler::{
  schedulers, Duration, ImmediateScheduler, Instant, NewThreadScheduler, Scheduler, TaskState, TestScheduler,
};
#[cfg(feature = "futures-scheduler")]
pub use crate::scheduler::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
