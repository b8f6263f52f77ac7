//! Schedulers: where and when work runs.
//!
//! A [`Scheduler`] accepts tasks, optionally delayed, and hands back a
//! [`Disposable`] that cancels the task if it has not run yet. Periodic work
//! is expressed by returning [`TaskState::Sleeping`] from the task, which
//! re-arms it after the given duration.
//!
//! | Scheduler | Runs tasks on |
//! |-----------|---------------|
//! | [`ThreadPoolScheduler`] | a `futures` thread pool (`computation`, `io`, `single`) |
//! | [`NewThreadScheduler`] | a fresh OS thread per task |
//! | [`ImmediateScheduler`] | the calling thread |
//! | [`TokioScheduler`] | a tokio runtime (feature `tokio-scheduler`) |
//! | [`TestScheduler`] | virtual time, driven by the test |

use std::sync::Arc;

pub use std::time::{Duration, Instant};

use crate::{disposable::Disposable, error::RxResult};

mod immediate_scheduler;
mod test_scheduler;
mod thread_scheduler;
#[cfg(feature = "futures-scheduler")]
mod thread_pool_scheduler;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;

pub use immediate_scheduler::ImmediateScheduler;
pub use test_scheduler::TestScheduler;
pub use thread_scheduler::NewThreadScheduler;
#[cfg(feature = "futures-scheduler")]
pub use thread_pool_scheduler::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;

/// What a task wants after one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
  /// The task is done and must not run again.
  Finished,
  /// Run the task again after the given duration.
  Sleeping(Duration),
}

/// A task the scheduler may run repeatedly until it reports
/// [`TaskState::Finished`].
pub type RepeatableTask = Box<dyn FnMut() -> TaskState + Send + 'static>;

/// A Scheduler is an object to order tasks and schedule their execution.
pub trait Scheduler: Send + Sync + 'static {
  /// Schedule `task` to run after `delay` (or as soon as possible), and
  /// again each time it returns [`TaskState::Sleeping`].
  ///
  /// Disposing the returned handle cancels the task if it has not run yet
  /// and stops any further re-arming. It never waits for a running step.
  fn schedule_task(&self, task: RepeatableTask, delay: Option<Duration>) -> RxResult<Disposable>;

  /// Schedule a one-shot task.
  fn schedule<F>(&self, task: F, delay: Option<Duration>) -> RxResult<Disposable>
  where
    F: FnOnce() + Send + 'static,
    Self: Sized,
  {
    self.schedule_task(once(task), delay)
  }
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
  fn schedule_task(&self, task: RepeatableTask, delay: Option<Duration>) -> RxResult<Disposable> {
    (**self).schedule_task(task, delay)
  }
}

/// Adapt a one-shot closure into a [`RepeatableTask`].
pub(crate) fn once(task: impl FnOnce() + Send + 'static) -> RepeatableTask {
  let mut task = Some(task);
  Box::new(move || {
    if let Some(task) = task.take() {
      task();
    }
    TaskState::Finished
  })
}

/// Process-wide schedulers, created lazily on first use.
pub mod schedulers {
  use super::*;

  #[cfg(feature = "futures-scheduler")]
  use once_cell::sync::Lazy;

  #[cfg(feature = "futures-scheduler")]
  static COMPUTATION: Lazy<Option<ThreadPoolScheduler>> =
    Lazy::new(|| ThreadPoolScheduler::new(parallelism(), "rx-computation-").ok());

  #[cfg(feature = "futures-scheduler")]
  static IO: Lazy<Option<ThreadPoolScheduler>> =
    Lazy::new(|| ThreadPoolScheduler::new(parallelism() * 4, "rx-io-").ok());

  #[cfg(feature = "futures-scheduler")]
  static SINGLE: Lazy<Option<ThreadPoolScheduler>> =
    Lazy::new(|| ThreadPoolScheduler::new(1, "rx-single-").ok());

  #[cfg(feature = "futures-scheduler")]
  fn parallelism() -> usize { std::thread::available_parallelism().map_or(4, |n| n.get()) }

  /// Pool for CPU-bound work, sized to the available parallelism.
  ///
  /// Falls back to a [`NewThreadScheduler`] when the pool cannot be built.
  #[cfg(feature = "futures-scheduler")]
  pub fn computation() -> Arc<dyn Scheduler> { pooled(&COMPUTATION) }

  /// Larger pool for blocking work.
  #[cfg(feature = "futures-scheduler")]
  pub fn io() -> Arc<dyn Scheduler> { pooled(&IO) }

  /// A single worker: every task runs serialized on the same thread. Used
  /// as the "main" context.
  #[cfg(feature = "futures-scheduler")]
  pub fn single() -> Arc<dyn Scheduler> { pooled(&SINGLE) }

  #[cfg(feature = "futures-scheduler")]
  fn pooled(pool: &Lazy<Option<ThreadPoolScheduler>>) -> Arc<dyn Scheduler> {
    match Lazy::force(pool) {
      Some(pool) => Arc::new(pool.clone()),
      None => {
        crate::logging::warning!("thread pool unavailable, falling back to new_thread");
        new_thread()
      }
    }
  }

  /// Spawns an OS thread for every task.
  pub fn new_thread() -> Arc<dyn Scheduler> { Arc::new(NewThreadScheduler::default()) }

  /// Runs tasks on the calling thread.
  pub fn immediate() -> Arc<dyn Scheduler> { Arc::new(ImmediateScheduler) }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc,
  };

  use super::*;

  #[test]
  fn once_runs_a_single_time() {
    let runs = Arc::new(AtomicUsize::new(0));
    let c_runs = runs.clone();
    let mut task = once(move || {
      c_runs.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(task(), TaskState::Finished);
    assert_eq!(task(), TaskState::Finished);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
  }

  #[cfg(feature = "futures-scheduler")]
  #[test]
  fn global_pools_run_tasks() {
    for scheduler in [schedulers::computation(), schedulers::io(), schedulers::single()] {
      let (tx, rx) = mpsc::channel();
      scheduler
        .schedule(move || tx.send(std::thread::current().id()).unwrap(), None)
        .unwrap();
      let id = rx.recv_timeout(Duration::from_secs(5)).unwrap();
      assert_ne!(id, std::thread::current().id());
    }
  }

  #[cfg(feature = "futures-scheduler")]
  #[test]
  fn single_is_serialized_on_one_thread() {
    let (tx, rx) = mpsc::channel();
    let single = schedulers::single();
    for _ in 0..4 {
      let tx = tx.clone();
      single
        .schedule(move || tx.send(std::thread::current().id()).unwrap(), None)
        .unwrap();
    }
    let ids: Vec<_> = (0..4)
      .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
      .collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]));
  }

  #[test]
  fn arc_dyn_scheduler_delegates() {
    let scheduler: Arc<dyn Scheduler> = schedulers::immediate();
    let runs = Arc::new(AtomicUsize::new(0));
    let c_runs = runs.clone();
    scheduler
      .schedule(
        move || {
          c_runs.fetch_add(1, Ordering::SeqCst);
        },
        None,
      )
      .unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
  }
}
