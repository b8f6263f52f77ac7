//! Test Scheduler for deterministic testing of time-based operators.
//!
//! Provides virtual time that only advances when explicitly instructed,
//! enabling deterministic testing of `interval`, `timer`, `observe_on`, etc.
//!
//! # Usage
//!
//! ```rust
//! use rxkit::prelude::*;
//!
//! let scheduler = TestScheduler::new();
//! let ticks = std::sync::Arc::new(parking_lot::Mutex::new(vec![]));
//! let c_ticks = ticks.clone();
//! observable::interval(Duration::from_millis(100), scheduler.clone())
//!   .take(3)
//!   .subscribe(move |v| c_ticks.lock().push(v));
//!
//! scheduler.advance_by(Duration::from_millis(250));
//! assert_eq!(*ticks.lock(), vec![0, 1]);
//! scheduler.flush();
//! assert_eq!(*ticks.lock(), vec![0, 1, 2]);
//! ```
//!
//! Tasks run on the thread that drives the clock (`advance_by`, `flush`),
//! never inside `schedule_task`.

use std::{cmp::Ordering, collections::BinaryHeap, sync::Arc};

use parking_lot::Mutex;

use super::{Duration, RepeatableTask, Scheduler, TaskState};
use crate::{
  disposable::Disposable,
  error::{RxError, RxResult},
};

// ==================== Internal State ====================

#[derive(Default)]
struct TestSchedulerState {
  virtual_time: Duration,
  task_queue: BinaryHeap<ScheduledTask>,
  next_task_id: usize,
  shutdown: bool,
}

struct ScheduledTask {
  scheduled_time: Duration,
  task_id: usize,
  task: RepeatableTask,
  handle: Disposable,
}

impl PartialEq for ScheduledTask {
  fn eq(&self, other: &Self) -> bool {
    self.scheduled_time == other.scheduled_time && self.task_id == other.task_id
  }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledTask {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by task_id
    other
      .scheduled_time
      .cmp(&self.scheduled_time)
      .then_with(|| other.task_id.cmp(&self.task_id))
  }
}

// ==================== TestScheduler ====================

/// A virtual time scheduler for deterministic testing.
///
/// Clones share the same clock and task queue.
#[derive(Clone, Default)]
pub struct TestScheduler {
  state: Arc<Mutex<TestSchedulerState>>,
}

impl TestScheduler {
  pub fn new() -> Self { Self::default() }

  /// Current virtual time, measured from the scheduler's creation.
  pub fn now(&self) -> Duration { self.state.lock().virtual_time }

  /// Number of tasks waiting to run, cancelled ones excluded.
  pub fn pending_count(&self) -> usize {
    self
      .state
      .lock()
      .task_queue
      .iter()
      .filter(|t| !t.handle.is_disposed())
      .count()
  }

  /// Advance virtual time by `duration`, running every task that becomes
  /// due, in time order.
  pub fn advance_by(&self, duration: Duration) {
    let target = self.now() + duration;
    self.advance_to(target);
  }

  /// Advance virtual time to `time`. Times in the past are ignored.
  pub fn advance_to(&self, time: Duration) {
    self.run_tasks(Some(time));
    let mut state = self.state.lock();
    if state.virtual_time < time {
      state.virtual_time = time;
    }
  }

  /// Run the tasks that are due right now without moving the clock.
  pub fn run_due(&self) { self.advance_by(Duration::ZERO) }

  /// Run every queued task, jumping the clock forward as needed.
  ///
  /// A periodic task that never finishes keeps this looping forever; use
  /// [`advance_by`](Self::advance_by) for those.
  pub fn flush(&self) { self.run_tasks(None) }

  /// Reject all further scheduling and drop queued tasks.
  pub fn shutdown(&self) {
    let dropped = {
      let mut state = self.state.lock();
      state.shutdown = true;
      std::mem::take(&mut state.task_queue)
    };
    dropped.iter().for_each(|t| t.handle.dispose());
  }

  fn pop_due(&self, until: Option<Duration>) -> Option<ScheduledTask> {
    let mut state = self.state.lock();
    let due = match (state.task_queue.peek(), until) {
      (Some(next), Some(until)) => next.scheduled_time <= until,
      (Some(_), None) => true,
      (None, _) => false,
    };
    if !due {
      return None;
    }
    let task = state.task_queue.pop()?;
    if state.virtual_time < task.scheduled_time {
      state.virtual_time = task.scheduled_time;
    }
    Some(task)
  }

  fn run_tasks(&self, until: Option<Duration>) {
    while let Some(mut scheduled) = self.pop_due(until) {
      if scheduled.handle.is_disposed() {
        continue;
      }
      if let TaskState::Sleeping(next) = (scheduled.task)() {
        let mut state = self.state.lock();
        if !scheduled.handle.is_disposed() && !state.shutdown {
          scheduled.scheduled_time = state.virtual_time + next;
          scheduled.task_id = state.next_task_id;
          state.next_task_id += 1;
          state.task_queue.push(scheduled);
        }
      }
    }
  }
}

impl Scheduler for TestScheduler {
  fn schedule_task(&self, task: RepeatableTask, delay: Option<Duration>) -> RxResult<Disposable> {
    let mut state = self.state.lock();
    if state.shutdown {
      return Err(RxError::rejected("test scheduler is shut down"));
    }
    let handle = Disposable::empty();
    let task = ScheduledTask {
      scheduled_time: state.virtual_time + delay.unwrap_or(Duration::ZERO),
      task_id: state.next_task_id,
      task,
      handle: handle.clone(),
    };
    state.next_task_id += 1;
    state.task_queue.push(task);
    Ok(handle)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce() + Send>) {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let c_log = log.clone();
    let make = move |name: &'static str| {
      let log = c_log.clone();
      Box::new(move || log.lock().push(name)) as Box<dyn FnOnce() + Send>
    };
    (log, make)
  }

  #[test]
  fn nothing_runs_until_time_advances() {
    let scheduler = TestScheduler::new();
    let (log, task) = recorder();
    scheduler.schedule(task("a"), None).unwrap();
    assert!(log.lock().is_empty());
    assert_eq!(scheduler.pending_count(), 1);

    scheduler.run_due();
    assert_eq!(*log.lock(), vec!["a"]);
    assert_eq!(scheduler.pending_count(), 0);
  }

  #[test]
  fn ordered_by_time_then_fifo() {
    let scheduler = TestScheduler::new();
    let (log, task) = recorder();
    scheduler.schedule(task("late"), Some(Duration::from_millis(20))).unwrap();
    scheduler.schedule(task("first"), Some(Duration::from_millis(10))).unwrap();
    scheduler.schedule(task("second"), Some(Duration::from_millis(10))).unwrap();

    scheduler.advance_by(Duration::from_millis(15));
    assert_eq!(*log.lock(), vec!["first", "second"]);
    assert_eq!(scheduler.now(), Duration::from_millis(15));

    scheduler.advance_by(Duration::from_millis(5));
    assert_eq!(*log.lock(), vec!["first", "second", "late"]);
  }

  #[test]
  fn cancelled_task_never_runs() {
    let scheduler = TestScheduler::new();
    let (log, task) = recorder();
    let handle = scheduler.schedule(task("x"), Some(Duration::from_millis(1))).unwrap();
    handle.dispose();
    assert_eq!(scheduler.pending_count(), 0);
    scheduler.flush();
    assert!(log.lock().is_empty());
  }

  #[test]
  fn periodic_task_rearms_from_its_own_time() {
    let scheduler = TestScheduler::new();
    let times: Arc<Mutex<Vec<Duration>>> = Arc::default();
    let c_times = times.clone();
    let c_scheduler = scheduler.clone();
    let handle = scheduler
      .schedule_task(
        Box::new(move || {
          c_times.lock().push(c_scheduler.now());
          TaskState::Sleeping(Duration::from_millis(10))
        }),
        Some(Duration::from_millis(5)),
      )
      .unwrap();

    scheduler.advance_by(Duration::from_millis(30));
    assert_eq!(
      *times.lock(),
      vec![
        Duration::from_millis(5),
        Duration::from_millis(15),
        Duration::from_millis(25)
      ]
    );
    handle.dispose();
    scheduler.advance_by(Duration::from_millis(30));
    assert_eq!(times.lock().len(), 3);
  }

  #[test]
  fn tasks_scheduled_while_running_are_picked_up() {
    let scheduler = TestScheduler::new();
    let (log, task) = recorder();
    let c_scheduler = scheduler.clone();
    let inner = task("inner");
    scheduler
      .schedule(
        move || {
          c_scheduler.schedule(inner, Some(Duration::from_millis(1))).unwrap();
        },
        None,
      )
      .unwrap();
    scheduler.advance_by(Duration::from_millis(1));
    assert_eq!(*log.lock(), vec!["inner"]);
  }

  #[test]
  fn shutdown_rejects_new_work() {
    let scheduler = TestScheduler::new();
    let (log, task) = recorder();
    scheduler.schedule(task("queued"), None).unwrap();
    scheduler.shutdown();
    let err = scheduler.schedule(task("rejected"), None).unwrap_err();
    assert!(err.is_rejection());
    scheduler.flush();
    assert!(log.lock().is_empty());
  }
}
