use super::{Duration, RepeatableTask, Scheduler, TaskState};
use crate::{disposable::Disposable, error::RxResult};

/// Runs every task synchronously on the thread that schedules it, sleeping
/// through delays. `schedule_task` returns only once the task finished.
#[derive(Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  fn schedule_task(&self, mut task: RepeatableTask, delay: Option<Duration>) -> RxResult<Disposable> {
    if let Some(delay) = delay {
      std::thread::sleep(delay);
    }
    while let TaskState::Sleeping(next) = task() {
      std::thread::sleep(next);
    }
    Ok(Disposable::disposed())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn runs_inline() {
    let mut seen = Vec::new();
    let caller = std::thread::current().id();
    let (tx, rx) = std::sync::mpsc::channel();
    ImmediateScheduler
      .schedule(move || tx.send(std::thread::current().id()).unwrap(), None)
      .unwrap();
    seen.extend(rx.try_iter());
    assert_eq!(seen, vec![caller]);
  }

  #[test]
  fn repeats_until_finished() {
    let mut left = 3;
    let handle = ImmediateScheduler
      .schedule_task(
        Box::new(move || {
          left -= 1;
          if left == 0 {
            TaskState::Finished
          } else {
            TaskState::Sleeping(Duration::from_millis(1))
          }
        }),
        Some(Duration::from_millis(1)),
      )
      .unwrap();
    assert!(handle.is_disposed());
  }
}
