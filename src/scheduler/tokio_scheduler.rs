use tokio::runtime::Handle;

use super::{Duration, RepeatableTask, Scheduler, TaskState};
use crate::{
  disposable::Disposable,
  error::{RxError, RxResult},
};

/// Spawns tasks onto a tokio runtime. Steps run on the runtime's worker
/// threads, so keep them short.
#[derive(Clone)]
pub struct TokioScheduler {
  handle: Handle,
}

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self { Self { handle } }

  /// Uses the runtime the caller is running in.
  pub fn current() -> RxResult<Self> {
    Handle::try_current()
      .map(Self::new)
      .map_err(|e| RxError::rejected(e.to_string()))
  }
}

impl Scheduler for TokioScheduler {
  fn schedule_task(&self, mut task: RepeatableTask, delay: Option<Duration>) -> RxResult<Disposable> {
    let join = self.handle.spawn(async move {
      if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
      }
      while let TaskState::Sleeping(next) = task() {
        tokio::time::sleep(next).await;
      }
    });
    Ok(Disposable::new(move || join.abort()))
  }
}
