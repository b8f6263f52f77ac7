//! # rxkit: a push-based reactive stream engine
//!
//! Observables, schedulers, hot sources and backpressured flowables, all
//! thread-safe and reference counted.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxkit::prelude::*;
//!
//! observable::from_iter(0..10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe(|v| println!("Value: {}", v));
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | Cold push source; every subscription runs the producer afresh |
//! | [`Observer`] | Consumes `on_subscribe`, `next`, `error` and `complete` events |
//! | [`Disposable`] | Idempotent handle tearing a subscription down |
//! | [`ConnectableObservable`] | Hot wrapper sharing one upstream run (`publish` / `connect` / `ref_count`) |
//! | [`Subject`] | Hot source you push into by hand |
//! | [`Flowable`] | Pull source with demand and a [`BackpressureStrategy`] |
//! | [`Scheduler`] | Where work runs: `subscribe_on` / `observe_on` |
//!
//! ## Feature Flags
//!
//! - **`futures-scheduler`** (default): thread-pool schedulers behind
//!   `schedulers::computation()`, `io()` and `single()`
//! - **`tokio-scheduler`**: a scheduler over a tokio runtime handle
//! - **`tracing`** (default): diagnostics through `tracing`
//!
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Disposable`]: disposable::Disposable
//! [`ConnectableObservable`]: observable::ConnectableObservable
//! [`Subject`]: subject::Subject
//! [`Flowable`]: flowable::Flowable
//! [`BackpressureStrategy`]: flowable::BackpressureStrategy
//! [`Scheduler`]: scheduler::Scheduler

mod logging;

pub mod completable;
pub mod disposable;
pub mod error;
pub mod flowable;
pub mod maybe;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod safe_observer;
pub mod scheduler;
pub mod single;
pub mod subject;

pub use prelude::*;
