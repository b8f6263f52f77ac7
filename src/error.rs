//! Error types carried on the `error` channel of every stream.
//!
//! A single [`RxError`] enum covers the whole failure taxonomy of the engine.
//! It is `Clone` so that hot sources can hand the same error to every
//! attached observer.
//!
//! ```
//! use rxkit::prelude::*;
//!
//! let numbers = observable::create(|emitter| {
//!   emitter.next(1);
//!   let parsed: i32 = "x".parse().map_err(RxError::producer)?;
//!   emitter.next(parsed);
//!   emitter.complete();
//!   Ok(())
//! });
//! numbers.subscribe_all(|_| {}, |err| assert!(err.is_producer()), || unreachable!());
//! ```

use std::{any::Any, error::Error, sync::Arc};

/// Root error type for everything that can terminate a stream.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RxError {
  /// Raised by producer logic (an `emit_fn` or an upstream) before it
  /// completed. Terminates only the subscription it belongs to.
  #[error("producer error: {0}")]
  Producer(Arc<dyn Error + Send + Sync>),

  /// A producer or a callback panicked before a terminal event.
  #[error("panicked: {0}")]
  Panic(String),

  /// The demand protocol was misused in a recoverable way, e.g.
  /// `request(0)`.
  #[error("protocol violation: {0}")]
  Protocol(String),

  /// The producer outpaced demand under the `Error` strategy, or a bounded
  /// buffer ran out of room.
  #[error("backpressure overflow: {0}")]
  BackpressureOverflow(String),

  /// A scheduler refused to accept more work.
  #[error("scheduler rejected task: {0}")]
  SchedulerRejection(String),
}

/// Result alias used by producers and schedulers.
pub type RxResult<T> = Result<T, RxError>;

impl RxError {
  /// Wrap any error raised by producer logic.
  pub fn producer(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
    Self::Producer(Arc::from(err.into()))
  }

  /// Producer error built from a plain message.
  pub fn msg(message: impl Into<String>) -> Self {
    let message: String = message.into();
    Self::producer(message)
  }

  pub fn protocol(context: impl Into<String>) -> Self { Self::Protocol(context.into()) }

  pub fn overflow(context: impl Into<String>) -> Self {
    Self::BackpressureOverflow(context.into())
  }

  pub fn rejected(context: impl Into<String>) -> Self {
    Self::SchedulerRejection(context.into())
  }

  pub fn is_producer(&self) -> bool { matches!(self, Self::Producer(_)) }

  pub fn is_panic(&self) -> bool { matches!(self, Self::Panic(_)) }

  pub fn is_protocol(&self) -> bool { matches!(self, Self::Protocol(_)) }

  pub fn is_overflow(&self) -> bool { matches!(self, Self::BackpressureOverflow(_)) }

  pub fn is_rejection(&self) -> bool { matches!(self, Self::SchedulerRejection(_)) }

  /// Convert a caught panic payload into [`RxError::Panic`].
  pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
      (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
      s.clone()
    } else {
      "unknown panic payload".to_string()
    };
    Self::Panic(message)
  }
}
