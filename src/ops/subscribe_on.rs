use crate::{
  observable::{Observable, ObservableSource},
  safe_observer::SafeObserver,
  scheduler::Scheduler,
};

impl<Item: Send + 'static> Observable<Item> {
  /// Subscribe to the source on `scheduler`: the producer (and everything
  /// it emits synchronously) runs there.
  ///
  /// Only the `subscribe_on` closest to the source decides where the
  /// producer runs; outer ones merely move the act of subscribing to that
  /// inner one.
  ///
  /// ```rust
  /// # use rxkit::prelude::*;
  /// observable::create(|emitter| {
  ///   // runs on a computation thread
  ///   emitter.next(std::thread::current().id());
  ///   emitter.complete();
  ///   Ok(())
  /// })
  /// .subscribe_on(schedulers::computation())
  /// .subscribe(|id| println!("produced on {id:?}"));
  /// ```
  pub fn subscribe_on<S: Scheduler>(&self, scheduler: S) -> Observable<Item> {
    Observable::new(SubscribeOnOp { source: self.clone(), scheduler })
  }
}

struct SubscribeOnOp<Item, S> {
  source: Observable<Item>,
  scheduler: S,
}

impl<Item: Send + 'static, S: Scheduler> ObservableSource<Item> for SubscribeOnOp<Item, S> {
  fn actual_subscribe(&self, observer: SafeObserver<Item>) {
    let source = self.source.clone();
    let downstream = observer.clone();
    match self.scheduler.schedule(move || source.actual_subscribe(downstream), None) {
      Ok(handle) => observer.add(handle),
      Err(err) => observer.error(err),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::{mpsc, Arc},
    thread::ThreadId,
  };

  use parking_lot::Mutex;

  use crate::{
    observable,
    scheduler::{schedulers, Duration, NewThreadScheduler, Scheduler, TestScheduler},
  };

  fn producer_thread() -> observable::Observable<ThreadId> {
    observable::create(|emitter| {
      emitter.next(std::thread::current().id());
      emitter.complete();
      Ok(())
    })
  }

  #[test]
  fn producer_runs_on_scheduler() {
    let (tx, rx) = mpsc::channel();
    producer_thread()
      .subscribe_on(NewThreadScheduler::default())
      .subscribe(move |id| tx.send(id).unwrap());
    let id = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_ne!(id, std::thread::current().id());
  }

  #[cfg(feature = "futures-scheduler")]
  #[test]
  fn innermost_subscribe_on_wins() {
    let single = schedulers::single();
    let (id_tx, id_rx) = mpsc::channel();
    single
      .schedule(move || id_tx.send(std::thread::current().id()).unwrap(), None)
      .unwrap();
    let single_thread = id_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    let (tx, rx) = mpsc::channel();
    producer_thread()
      .subscribe_on(single)
      .subscribe_on(NewThreadScheduler::default())
      .subscribe(move |id| tx.send(id).unwrap());
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), single_thread);
  }

  #[test]
  fn dispose_before_run_cancels() {
    let scheduler = TestScheduler::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let d = observable::of(1)
      .subscribe_on(scheduler.clone())
      .subscribe(move |v| c_seen.lock().push(v));
    assert_eq!(scheduler.pending_count(), 1);
    d.dispose();
    scheduler.flush();
    assert!(seen.lock().is_empty());
  }

  #[test]
  fn rejection_surfaces_as_error() {
    let scheduler = TestScheduler::new();
    scheduler.shutdown();
    let failed = Arc::new(Mutex::new(false));
    let c_failed = failed.clone();
    observable::of(1)
      .subscribe_on(scheduler)
      .subscribe_all(|_| {}, move |e| *c_failed.lock() = e.is_rejection(), || {});
    assert!(*failed.lock());
  }
}
