use std::{
  collections::VecDeque,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
};

use parking_lot::Mutex;

use crate::{
  disposable::SerialDisposable,
  error::RxError,
  observable::{Observable, ObservableSource},
  observer::Observer,
  safe_observer::SafeObserver,
  scheduler::Scheduler,
};

impl<Item: Send + 'static> Observable<Item> {
  /// Deliver every downstream event on `scheduler`.
  ///
  /// Events are queued without bound and drained in order by one task at a
  /// time, so delivery stays sequential even on a multi-threaded pool.
  ///
  /// ```rust
  /// # use rxkit::prelude::*;
  /// observable::range(0, 3)
  ///   .observe_on(schedulers::single())
  ///   .subscribe(|v| println!("{v} on the single worker"));
  /// ```
  pub fn observe_on<S: Scheduler + Clone>(&self, scheduler: S) -> Observable<Item> {
    Observable::new(ObserveOnOp { source: self.clone(), scheduler })
  }
}

struct ObserveOnOp<Item, S> {
  source: Observable<Item>,
  scheduler: S,
}

impl<Item: Send + 'static, S: Scheduler + Clone> ObservableSource<Item> for ObserveOnOp<Item, S> {
  fn actual_subscribe(&self, observer: SafeObserver<Item>) {
    let drain_task = SerialDisposable::new();
    observer.add(drain_task.to_disposable());
    let state = Arc::new(ObserveOnState {
      queue: Mutex::new(VecDeque::new()),
      wip: AtomicUsize::new(0),
      downstream: observer.clone(),
      scheduler: self.scheduler.clone(),
      drain_task,
    });
    let upstream = observer.upstream(ObserveOnObserver { state });
    self.source.actual_subscribe(upstream);
  }
}

enum Notification<Item> {
  Next(Item),
  Error(RxError),
  Complete,
}

struct ObserveOnState<Item, S> {
  queue: Mutex<VecDeque<Notification<Item>>>,
  wip: AtomicUsize,
  downstream: SafeObserver<Item>,
  scheduler: S,
  drain_task: SerialDisposable,
}

impl<Item: Send + 'static, S: Scheduler + Clone> ObserveOnState<Item, S> {
  fn enqueue(self: &Arc<Self>, notification: Notification<Item>) {
    self.queue.lock().push_back(notification);
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    let state = self.clone();
    match self.scheduler.schedule(move || state.drain(), None) {
      Ok(handle) => self.drain_task.set(handle),
      Err(err) => {
        self.queue.lock().clear();
        self.downstream.error(err);
      }
    }
  }

  fn drain(&self) {
    let mut missed = 1;
    loop {
      loop {
        if self.downstream.is_closed() {
          self.queue.lock().clear();
          return;
        }
        let notification = self.queue.lock().pop_front();
        match notification {
          Some(Notification::Next(value)) => self.downstream.next(value),
          Some(Notification::Error(err)) => self.downstream.error(err),
          Some(Notification::Complete) => self.downstream.complete(),
          None => break,
        }
      }
      missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
      if missed == 0 {
        break;
      }
    }
  }
}

struct ObserveOnObserver<Item, S> {
  state: Arc<ObserveOnState<Item, S>>,
}

impl<Item: Send + 'static, S: Scheduler + Clone> Observer<Item> for ObserveOnObserver<Item, S> {
  fn next(&mut self, value: Item) { self.state.enqueue(Notification::Next(value)) }

  fn error(&mut self, err: RxError) { self.state.enqueue(Notification::Error(err)) }

  fn complete(&mut self) { self.state.enqueue(Notification::Complete) }
}

#[cfg(test)]
mod tests {
  use std::sync::mpsc;

  use super::*;
  use crate::{
    observable,
    scheduler::{Duration, NewThreadScheduler, TestScheduler},
  };

  #[test]
  fn delivery_moves_to_scheduler() {
    let scheduler = TestScheduler::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let done = Arc::new(Mutex::new(false));
    let (c_seen, c_done) = (seen.clone(), done.clone());
    observable::range(1, 3).observe_on(scheduler.clone()).subscribe_all(
      move |v| c_seen.lock().push(v),
      |_| {},
      move || *c_done.lock() = true,
    );
    assert!(seen.lock().is_empty());
    assert_eq!(scheduler.pending_count(), 1);

    scheduler.run_due();
    assert_eq!(*seen.lock(), vec![1, 2, 3]);
    assert!(*done.lock());
  }

  #[test]
  fn order_is_kept_across_threads() {
    let (tx, rx) = mpsc::channel();
    let c_tx = tx.clone();
    observable::range(0, 500)
      .observe_on(NewThreadScheduler::default())
      .subscribe_all(
        move |v| tx.send(Some(v)).unwrap(),
        |_| {},
        move || c_tx.send(None).unwrap(),
      );
    let mut received = vec![];
    while let Some(v) = rx.recv_timeout(Duration::from_secs(5)).unwrap() {
      received.push(v);
    }
    assert_eq!(received, (0..500).collect::<Vec<_>>());
  }

  #[test]
  fn dispose_drops_queued_events() {
    let scheduler = TestScheduler::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let d = observable::range(1, 3)
      .observe_on(scheduler.clone())
      .subscribe(move |v| c_seen.lock().push(v));
    d.dispose();
    assert_eq!(scheduler.pending_count(), 0);
    scheduler.flush();
    assert!(seen.lock().is_empty());
  }

  #[test]
  fn errors_are_delivered_in_order() {
    let scheduler = TestScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    observable::create(|emitter| {
      emitter.next(1);
      emitter.error(RxError::msg("late"));
      Ok(())
    })
    .observe_on(scheduler.clone())
    .subscribe_all(
      move |v: i32| l1.lock().push(v.to_string()),
      move |e| l2.lock().push(e.to_string()),
      || {},
    );
    scheduler.flush();
    assert_eq!(*log.lock(), vec!["1", "producer error: late"]);
  }

  #[test]
  fn rejected_drain_is_an_error() {
    let scheduler = TestScheduler::new();
    scheduler.shutdown();
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    observable::range(1, 3).observe_on(scheduler.clone()).subscribe_all(
      move |v| l1.lock().push(v.to_string()),
      move |e: RxError| l2.lock().push(format!("rejected {}", e.is_rejection())),
      move || l3.lock().push("complete".to_string()),
    );
    scheduler.flush();
    assert_eq!(*log.lock(), vec!["rejected true"]);
  }
}
