use std::{
  iter::Peekable,
  panic::{catch_unwind, AssertUnwindSafe},
  sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc,
  },
};

use parking_lot::Mutex;

use super::{
  add_demand, produced, BackpressureStrategy, Flowable, FlowableSource, SafeSubscriber, Subscription,
  SubscriptionLike,
};
use crate::{error::RxError, observable::range_overflow};

impl<Item: Send + 'static> Flowable<Item> {
  /// Emits the items of `iter`, only as fast as they are requested.
  pub fn from_iter<I>(iter: I) -> Flowable<Item>
  where
    I: IntoIterator<Item = Item> + Clone + Send + Sync + 'static,
    I::IntoIter: Send + 'static,
  {
    Flowable::new(FromIter { iter })
  }

  /// Emits `value` once, then completes.
  pub fn just(value: Item) -> Flowable<Item>
  where
    Item: Clone + Sync,
  {
    Flowable::from_iter(Some(value))
  }

  /// Completes as soon as it is subscribed.
  pub fn empty() -> Flowable<Item> { Flowable::from_iter(std::iter::empty()) }
}

impl Flowable<i64> {
  /// Emits `start, start + 1, ..., start + count - 1` on demand. A range
  /// running past `i64::MAX` fails every subscriber instead.
  pub fn range(start: i64, count: usize) -> Flowable<i64> {
    match range_overflow(start, count) {
      None => Flowable::from_iter((0..count).map(move |offset| start + offset as i64)),
      Some(err) => Flowable::create(move |_| Err(err.clone()), BackpressureStrategy::Error),
    }
  }
}

struct FromIter<I> {
  iter: I,
}

impl<I> FlowableSource<I::Item> for FromIter<I>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::IntoIter: Send + 'static,
  I::Item: Send + 'static,
{
  fn actual_subscribe(&self, subscriber: SafeSubscriber<I::Item>) {
    let state = Arc::new(IterState {
      iter: Mutex::new(self.iter.clone().into_iter().peekable()),
      downstream: subscriber.clone(),
      requested: AtomicU64::new(0),
      wip: AtomicUsize::new(1),
      cancelled: AtomicBool::new(false),
    });
    subscriber.on_subscribe(Subscription::new(IterSubscription(state.clone())));
    state.drain_loop();
  }
}

struct IterState<It: Iterator> {
  iter: Mutex<Peekable<It>>,
  downstream: SafeSubscriber<It::Item>,
  requested: AtomicU64,
  wip: AtomicUsize,
  cancelled: AtomicBool,
}

impl<It> IterState<It>
where
  It: Iterator + Send + 'static,
  It::Item: Send + 'static,
{
  fn is_cancelled(&self) -> bool { self.cancelled.load(Ordering::Acquire) }

  fn finish(&self) {
    if !self.cancelled.swap(true, Ordering::AcqRel) {
      self.downstream.complete();
    }
  }

  fn fail(&self, err: RxError) {
    if !self.cancelled.swap(true, Ordering::AcqRel) {
      self.downstream.error(err);
    }
  }

  fn drain(&self) {
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    self.drain_loop();
  }

  fn drain_loop(&self) {
    let mut missed = 1;
    loop {
      let requested = self.requested.load(Ordering::Acquire);
      let mut emitted = 0;
      while emitted != requested {
        if self.is_cancelled() {
          return;
        }
        let value = catch_unwind(AssertUnwindSafe(|| self.iter.lock().next()));
        match value {
          Ok(Some(value)) => {
            self.downstream.next(value);
            emitted += 1;
          }
          Ok(None) => {
            self.finish();
            return;
          }
          Err(payload) => {
            self.fail(RxError::from_panic(&*payload));
            return;
          }
        }
      }
      if self.is_cancelled() {
        return;
      }
      // Complete without waiting for a request the sequence cannot serve.
      let exhausted = catch_unwind(AssertUnwindSafe(|| self.iter.lock().peek().is_none()));
      match exhausted {
        Ok(false) => {}
        Ok(true) => {
          self.finish();
          return;
        }
        Err(payload) => {
          self.fail(RxError::from_panic(&*payload));
          return;
        }
      }
      if emitted != 0 {
        produced(&self.requested, emitted);
      }
      missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
      if missed == 0 {
        break;
      }
    }
  }
}

struct IterSubscription<It: Iterator>(Arc<IterState<It>>);

impl<It> SubscriptionLike for IterSubscription<It>
where
  It: Iterator + Send + 'static,
  It::Item: Send + 'static,
{
  fn request(&self, n: u64) {
    add_demand(&self.0.requested, n);
    self.0.drain();
  }

  fn cancel(&self) { self.0.cancelled.store(true, Ordering::Release) }

  fn is_cancelled(&self) -> bool { self.0.is_cancelled() }
}
