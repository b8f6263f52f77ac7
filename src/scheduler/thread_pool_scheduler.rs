use futures::{
  executor::ThreadPool,
  future::{abortable, FutureExt},
  task::SpawnExt,
};

use super::{Duration, RepeatableTask, Scheduler, TaskState};
use crate::{
  disposable::Disposable,
  error::{RxError, RxResult},
  logging,
};

/// Runs tasks on a `futures` [`ThreadPool`]. Delays and periodic re-arming
/// are timers on the pool, so no worker thread is parked while waiting.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
  pool: ThreadPool,
}

impl ThreadPoolScheduler {
  /// Build a pool of `pool_size` workers whose threads are named
  /// `name_prefix` + index.
  pub fn new(pool_size: usize, name_prefix: &str) -> RxResult<Self> {
    let pool = ThreadPool::builder()
      .pool_size(pool_size.max(1))
      .name_prefix(name_prefix)
      .create()
      .map_err(|e| RxError::rejected(format!("cannot build thread pool: {e}")))?;
    Ok(Self { pool })
  }

  pub fn from_pool(pool: ThreadPool) -> Self { Self { pool } }
}

impl Scheduler for ThreadPoolScheduler {
  fn schedule_task(&self, mut task: RepeatableTask, delay: Option<Duration>) -> RxResult<Disposable> {
    let (fut, handle) = abortable(async move {
      if let Some(delay) = delay {
        futures_time::task::sleep(delay.into()).await;
      }
      while let TaskState::Sleeping(next) = task() {
        futures_time::task::sleep(next.into()).await;
      }
    });
    self.pool.spawn(fut.map(|_| ())).map_err(|e| {
      logging::warning!("thread pool rejected task: {}", e);
      RxError::rejected(e.to_string())
    })?;
    Ok(Disposable::new(move || handle.abort()))
  }
}
