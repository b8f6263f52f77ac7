use super::{Observable, ObservableSource};
use crate::{
  safe_observer::SafeObserver,
  scheduler::{Duration, Scheduler, TaskState},
};

/// Emits `0, 1, 2, ...` every `period` on `scheduler`, starting one period
/// after subscription. Never completes on its own.
///
/// ```rust
/// # use rxkit::prelude::*;
/// let scheduler = TestScheduler::new();
/// let d = observable::interval(Duration::from_secs(1), scheduler.clone())
///   .subscribe(|tick| println!("tick {tick}"));
/// scheduler.advance_by(Duration::from_secs(3)); // ticks 0, 1, 2
/// d.dispose();
/// ```
pub fn interval<S: Scheduler>(period: Duration, scheduler: S) -> Observable<u64> {
  interval_at(period, period, scheduler)
}

/// Like [`interval`], with a distinct delay before the first tick.
pub fn interval_at<S: Scheduler>(initial_delay: Duration, period: Duration, scheduler: S) -> Observable<u64> {
  Observable::new(Interval { initial_delay, period, scheduler })
}

/// Emits `0` after `delay`, then completes.
pub fn timer<S: Scheduler>(delay: Duration, scheduler: S) -> Observable<u64> {
  Observable::new(Timer { delay, scheduler })
}

struct Interval<S> {
  initial_delay: Duration,
  period: Duration,
  scheduler: S,
}

impl<S: Scheduler> ObservableSource<u64> for Interval<S> {
  fn actual_subscribe(&self, observer: SafeObserver<u64>) {
    let period = self.period;
    let emitter = observer.clone();
    let mut tick = 0;
    let task = Box::new(move || {
      if emitter.is_closed() {
        return TaskState::Finished;
      }
      emitter.next(tick);
      tick += 1;
      TaskState::Sleeping(period)
    });
    match self.scheduler.schedule_task(task, Some(self.initial_delay)) {
      Ok(handle) => observer.add(handle),
      Err(err) => observer.error(err),
    }
  }
}

struct Timer<S> {
  delay: Duration,
  scheduler: S,
}

impl<S: Scheduler> ObservableSource<u64> for Timer<S> {
  fn actual_subscribe(&self, observer: SafeObserver<u64>) {
    let emitter = observer.clone();
    let fire = move || {
      emitter.next(0);
      emitter.complete();
    };
    match self.scheduler.schedule(fire, Some(self.delay)) {
      Ok(handle) => observer.add(handle),
      Err(err) => observer.error(err),
    }
  }
}
