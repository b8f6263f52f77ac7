use std::{
  cell::RefCell,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use parking_lot::{Mutex, ReentrantMutex};

use super::{BoxedSubscriber, Subscriber, Subscription, SubscriptionLike};
use crate::{
  disposable::{CompositeDisposable, Disposable, DisposableLike},
  error::RxError,
  logging,
};

enum Terminal {
  Error(RxError),
  Complete,
}

struct SafeInner<Item> {
  subscriber: ReentrantMutex<RefCell<Option<BoxedSubscriber<Item>>>>,
  // Subscription from the source, kept to forward requests and cancel.
  upstream: Mutex<Option<Subscription>>,
  teardown: CompositeDisposable,
  subscribed: AtomicBool,
  cancelled: AtomicBool,
  terminated: AtomicBool,
  pending: Mutex<Option<Terminal>>,
}

/// Protocol guard in front of one [`Subscriber`].
///
/// Sources talk to this instead of the subscriber itself. It delivers
/// `on_subscribe` once, serializes every callback, drops events after a
/// terminal event or cancellation, and rejects `request(0)`.
pub struct SafeSubscriber<Item> {
  inner: Arc<SafeInner<Item>>,
}

impl<Item> Clone for SafeSubscriber<Item> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<Item: Send + 'static> SafeSubscriber<Item> {
  pub fn new(subscriber: impl Subscriber<Item>) -> Self {
    Self {
      inner: Arc::new(SafeInner {
        subscriber: ReentrantMutex::new(RefCell::new(Some(Box::new(subscriber)))),
        upstream: Mutex::new(None),
        teardown: CompositeDisposable::new(),
        subscribed: AtomicBool::new(false),
        cancelled: AtomicBool::new(false),
        terminated: AtomicBool::new(false),
        pending: Mutex::new(None),
      }),
    }
  }

  /// Hand the source's subscription to the subscriber. A subscription
  /// arriving after the subscriber already cancelled is cancelled at once.
  ///
  /// # Panics
  ///
  /// Delivering `on_subscribe` twice is a protocol violation and panics.
  pub fn on_subscribe(&self, subscription: Subscription) {
    assert!(
      !self.inner.subscribed.swap(true, Ordering::AcqRel),
      "protocol violation: on_subscribe delivered twice"
    );
    if self.is_cancelled() {
      subscription.cancel();
      return;
    }
    *self.inner.upstream.lock() = Some(subscription);
    if self.is_cancelled() {
      self.cancel_upstream();
      return;
    }
    let handle = self.subscription();
    self.with_subscriber(|subscriber| subscriber.on_subscribe(handle));
  }

  pub fn next(&self, value: Item) {
    if self.is_closed() {
      logging::trace!("value dropped: subscriber closed");
      return;
    }
    self.with_subscriber(|subscriber| subscriber.next(value));
  }

  pub fn error(&self, err: RxError) { self.terminate(Terminal::Error(err)) }

  pub fn complete(&self) { self.terminate(Terminal::Complete) }

  /// Fail a subscriber that could not be subscribed to its source: it
  /// still sees `on_subscribe` first.
  pub(crate) fn reject(&self, err: RxError) {
    if !self.inner.subscribed.load(Ordering::Acquire) {
      self.on_subscribe(Subscription::empty());
    }
    self.error(err);
  }

  pub fn is_cancelled(&self) -> bool { self.inner.cancelled.load(Ordering::Acquire) }

  pub fn is_terminated(&self) -> bool { self.inner.terminated.load(Ordering::Acquire) }

  pub fn is_closed(&self) -> bool { self.is_cancelled() || self.is_terminated() }

  /// Teardown that runs once the subscriber cancels or terminates.
  pub fn add(&self, teardown: Disposable) {
    if self.is_closed() {
      teardown.dispose();
    } else {
      self.inner.teardown.add(teardown);
    }
  }

  /// The demand controller as seen by the subscriber.
  pub fn subscription(&self) -> Subscription { Subscription::new(Handle { inner: self.inner.clone() }) }

  fn cancel(&self) {
    if self.inner.cancelled.swap(true, Ordering::AcqRel) {
      return;
    }
    self.cancel_upstream();
    self.inner.teardown.dispose();
  }

  fn cancel_upstream(&self) {
    let upstream = self.inner.upstream.lock().take();
    if let Some(upstream) = upstream {
      upstream.cancel();
    }
  }

  fn request(&self, n: u64) {
    if n == 0 {
      logging::warning!("request(0) is a protocol violation, cancelling");
      self.cancel_upstream();
      self.error(RxError::protocol("request must be positive, got 0"));
      return;
    }
    let upstream = self.inner.upstream.lock().clone();
    if let Some(upstream) = upstream {
      upstream.request(n);
    }
  }

  fn with_subscriber(&self, f: impl FnOnce(&mut BoxedSubscriber<Item>)) {
    {
      let guard = self.inner.subscriber.lock();
      let Ok(mut slot) = guard.try_borrow_mut() else {
        logging::debug!("re-entrant delivery into a busy subscriber skipped");
        return;
      };
      if self.is_cancelled() {
        return;
      }
      if let Some(subscriber) = slot.as_mut() {
        f(subscriber);
      }
      if self.is_cancelled() {
        slot.take();
      }
    }
    self.flush_pending();
  }

  fn terminate(&self, terminal: Terminal) {
    if self.is_cancelled() {
      logging::debug!("terminal event after cancel dropped");
      return;
    }
    if self.inner.terminated.swap(true, Ordering::AcqRel) {
      logging::debug!("second terminal event dropped");
      return;
    }
    self.inner.upstream.lock().take();
    let taken = {
      let guard = self.inner.subscriber.lock();
      let taken = guard.try_borrow_mut().map(|mut slot| slot.take());
      taken
    };
    match taken {
      Ok(subscriber) => self.deliver(subscriber, terminal),
      Err(_) => *self.inner.pending.lock() = Some(terminal),
    }
  }

  fn flush_pending(&self) {
    if !self.is_terminated() {
      return;
    }
    let Some(terminal) = self.inner.pending.lock().take() else {
      return;
    };
    let subscriber = {
      let guard = self.inner.subscriber.lock();
      let subscriber = guard.try_borrow_mut().ok().and_then(|mut slot| slot.take());
      subscriber
    };
    self.deliver(subscriber, terminal);
  }

  fn deliver(&self, subscriber: Option<BoxedSubscriber<Item>>, terminal: Terminal) {
    if let Some(mut subscriber) = subscriber {
      match terminal {
        Terminal::Error(err) => subscriber.error(err),
        Terminal::Complete => subscriber.complete(),
      }
    }
    self.inner.teardown.dispose();
  }
}

struct Handle<Item> {
  inner: Arc<SafeInner<Item>>,
}

impl<Item: Send + 'static> Handle<Item> {
  fn guard(&self) -> SafeSubscriber<Item> { SafeSubscriber { inner: self.inner.clone() } }
}

impl<Item: Send + 'static> SubscriptionLike for Handle<Item> {
  fn request(&self, n: u64) { self.guard().request(n) }

  fn cancel(&self) { self.guard().cancel() }

  fn is_cancelled(&self) -> bool { self.guard().is_closed() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::flowable::FnSubscriber;

  type Events = Arc<Mutex<Vec<String>>>;

  #[derive(Default)]
  struct Upstream {
    requests: Mutex<Vec<u64>>,
    cancelled: AtomicBool,
  }

  #[derive(Clone, Default)]
  struct Probe(Arc<Upstream>);

  impl SubscriptionLike for Probe {
    fn request(&self, n: u64) { self.0.requests.lock().push(n) }

    fn cancel(&self) { self.0.cancelled.store(true, Ordering::SeqCst) }

    fn is_cancelled(&self) -> bool { self.0.cancelled.load(Ordering::SeqCst) }
  }

  fn recording(initial: u64) -> (SafeSubscriber<i32>, Events) {
    let events: Events = Arc::default();
    let (e1, e2, e3) = (events.clone(), events.clone(), events.clone());
    let subscriber = SafeSubscriber::new(FnSubscriber::new(
      move |v: i32| e1.lock().push(format!("next {v}")),
      move |e: RxError| e2.lock().push(format!("error {e}")),
      move || e3.lock().push("complete".to_string()),
      move |s: Subscription| s.request(initial),
    ));
    (subscriber, events)
  }

  #[test]
  fn requests_reach_the_source() {
    let (subscriber, _) = recording(3);
    let probe = Probe::default();
    subscriber.on_subscribe(Subscription::new(probe.clone()));
    subscriber.subscription().request(2);
    assert_eq!(*probe.0.requests.lock(), vec![3, 2]);
  }

  #[test]
  fn request_zero_errors_and_cancels() {
    let (subscriber, events) = recording(0);
    let probe = Probe::default();
    subscriber.on_subscribe(Subscription::new(probe.clone()));
    assert!(probe.is_cancelled());
    assert!(probe.0.requests.lock().is_empty());
    assert_eq!(events.lock().len(), 1);
    assert!(events.lock()[0].starts_with("error protocol violation"));
    subscriber.next(1);
    assert_eq!(events.lock().len(), 1);
  }

  #[test]
  fn cancel_before_subscription_arrives() {
    let (subscriber, events) = recording(1);
    subscriber.subscription().cancel();
    let probe = Probe::default();
    subscriber.on_subscribe(Subscription::new(probe.clone()));
    assert!(probe.is_cancelled());
    subscriber.next(1);
    assert!(events.lock().is_empty());
  }

  #[test]
  #[should_panic(expected = "on_subscribe delivered twice")]
  fn double_subscribe_is_fatal() {
    let (subscriber, _) = recording(1);
    subscriber.on_subscribe(Subscription::empty());
    subscriber.on_subscribe(Subscription::empty());
  }

  #[test]
  fn terminal_runs_teardown_once() {
    let (subscriber, events) = recording(1);
    subscriber.on_subscribe(Subscription::empty());
    let teardown = Disposable::empty();
    subscriber.add(teardown.clone());
    subscriber.complete();
    subscriber.error(RxError::msg("late"));
    assert!(teardown.is_disposed());
    assert_eq!(*events.lock(), vec!["complete"]);
    assert!(subscriber.subscription().is_cancelled());
  }
}
