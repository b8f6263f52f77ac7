use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Duration, RepeatableTask, Scheduler, TaskState};
use crate::{
  disposable::Disposable,
  error::{RxError, RxResult},
  logging,
};

static THREAD_ID: AtomicUsize = AtomicUsize::new(0);

/// Spawns a new named OS thread for each unit of work.
///
/// Cancellation is checked before every step; a sleeping thread notices it
/// when it wakes up.
#[derive(Clone, Default)]
pub struct NewThreadScheduler {
  stack_size: Option<usize>,
}

impl NewThreadScheduler {
  pub fn with_stack_size(stack_size: usize) -> Self { Self { stack_size: Some(stack_size) } }
}

impl Scheduler for NewThreadScheduler {
  fn schedule_task(&self, mut task: RepeatableTask, delay: Option<Duration>) -> RxResult<Disposable> {
    let handle = Disposable::empty();
    let cancelled = handle.clone();
    let mut builder = std::thread::Builder::new().name(format!(
      "rx-new-thread-{}",
      THREAD_ID.fetch_add(1, Ordering::Relaxed)
    ));
    if let Some(size) = self.stack_size {
      builder = builder.stack_size(size);
    }
    builder
      .spawn(move || {
        if let Some(delay) = delay {
          std::thread::sleep(delay);
        }
        while !cancelled.is_disposed() {
          match task() {
            TaskState::Finished => break,
            TaskState::Sleeping(next) => std::thread::sleep(next),
          }
        }
      })
      .map_err(|e| {
        logging::warning!("cannot spawn scheduler thread: {}", e);
        RxError::rejected(e.to_string())
      })?;
    Ok(handle)
  }
}
