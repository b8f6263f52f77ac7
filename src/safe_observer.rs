//! The protocol guard every observer is wrapped in.
//!
//! [`SafeObserver`] is the emitter producers talk to. It makes the observer
//! protocol hold no matter what the producer does:
//!
//! - `on_subscribe` reaches the observer once, before anything else;
//! - `next` calls never overlap and stop once the subscription is terminated
//!   or disposed;
//! - at most one of `error` / `complete` is delivered, after which the
//!   subscription's teardown runs.

use std::{
  cell::RefCell,
  panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use parking_lot::{Mutex, ReentrantMutex};

use crate::{
  disposable::{CompositeDisposable, Disposable, DisposableLike},
  error::{RxError, RxResult},
  logging,
  observer::{BoxedObserver, Observer},
};

/// Emitter handed to [`create`](crate::observable::create) producers.
pub type ObservableEmitter<Item> = SafeObserver<Item>;

enum Terminal {
  Error(RxError),
  Complete,
}

struct SafeInner<Item> {
  observer: ReentrantMutex<RefCell<Option<BoxedObserver<Item>>>>,
  disposables: CompositeDisposable,
  terminated: AtomicBool,
  subscribed: AtomicBool,
  // Terminal raised from inside one of this observer's own callbacks.
  pending: Mutex<Option<Terminal>>,
}

/// Thread-safe, cloneable sink in front of one observer.
pub struct SafeObserver<Item> {
  inner: Arc<SafeInner<Item>>,
}

impl<Item> Clone for SafeObserver<Item> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<Item: Send + 'static> SafeObserver<Item> {
  pub fn new(observer: impl Observer<Item>) -> Self {
    Self {
      inner: Arc::new(SafeInner {
        observer: ReentrantMutex::new(RefCell::new(Some(Box::new(observer)))),
        disposables: CompositeDisposable::new(),
        terminated: AtomicBool::new(false),
        subscribed: AtomicBool::new(false),
        pending: Mutex::new(None),
      }),
    }
  }

  /// Hands the subscription handle to the observer.
  ///
  /// # Panics
  ///
  /// Delivering `on_subscribe` twice is a protocol violation and panics.
  pub(crate) fn start(&self) {
    assert!(
      !self.inner.subscribed.swap(true, Ordering::AcqRel),
      "protocol violation: on_subscribe delivered twice"
    );
    let handle = self.disposable();
    self.with_observer(|observer| observer.on_subscribe(handle));
  }

  /// Deliver a value. Dropped once the subscription is closed.
  pub fn next(&self, value: Item) {
    if self.is_closed() {
      logging::trace!("value dropped: subscription closed");
      return;
    }
    self.with_observer(|observer| observer.next(value));
  }

  /// Terminate with an error. Later events are ignored.
  pub fn error(&self, err: RxError) { self.terminate(Terminal::Error(err)) }

  /// Terminate normally. Later events are ignored.
  pub fn complete(&self) { self.terminate(Terminal::Complete) }

  /// Terminated or disposed: producers should stop emitting.
  pub fn is_closed(&self) -> bool {
    self.inner.terminated.load(Ordering::Acquire) || self.inner.disposables.is_disposed()
  }

  /// Whether `error` or `complete` has been accepted.
  pub fn is_terminated(&self) -> bool { self.inner.terminated.load(Ordering::Acquire) }

  /// Register teardown that runs on dispose or after the terminal event.
  /// Runs at once if the subscription is already closed.
  pub fn add(&self, teardown: Disposable) {
    if self.is_terminated() {
      teardown.dispose();
    } else {
      self.inner.disposables.add(teardown);
    }
  }

  /// Handle disposing this subscription.
  pub fn disposable(&self) -> Disposable { self.inner.disposables.to_disposable() }

  /// Subscriber for an operator's upstream. Disposing `self` also disposes
  /// the returned subscriber.
  pub(crate) fn upstream<U: Send + 'static>(&self, observer: impl Observer<U>) -> SafeObserver<U> {
    let upstream = SafeObserver::new(observer);
    self.add(upstream.disposable());
    upstream
  }

  /// Run `f` with exclusive access to the observer. A call re-entering from
  /// one of the observer's own callbacks finds it busy and is skipped.
  fn with_observer(&self, f: impl FnOnce(&mut BoxedObserver<Item>)) {
    {
      let guard = self.inner.observer.lock();
      let Ok(mut slot) = guard.try_borrow_mut() else {
        logging::debug!("re-entrant delivery into a busy observer skipped");
        return;
      };
      if self.inner.disposables.is_disposed() {
        return;
      }
      if let Some(observer) = slot.as_mut() {
        f(observer);
      }
    }
    self.flush_pending();
  }

  fn terminate(&self, terminal: Terminal) {
    if self.inner.disposables.is_disposed() {
      logging::debug!("terminal event after dispose dropped");
      return;
    }
    if self.inner.terminated.swap(true, Ordering::AcqRel) {
      logging::debug!("second terminal event dropped");
      return;
    }
    let taken = {
      let guard = self.inner.observer.lock();
      let taken = guard.try_borrow_mut().map(|mut slot| slot.take());
      taken
    };
    match taken {
      Ok(observer) => self.deliver(observer, terminal),
      // Raised from inside a callback of this observer: deliver on return.
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
    let observer = {
      let guard = self.inner.observer.lock();
      let observer = guard.try_borrow_mut().ok().and_then(|mut slot| slot.take());
      observer
    };
    self.deliver(observer, terminal);
  }

  fn deliver(&self, observer: Option<BoxedObserver<Item>>, terminal: Terminal) {
    if let Some(mut observer) = observer {
      match terminal {
        Terminal::Error(err) => observer.error(err),
        Terminal::Complete => observer.complete(),
      }
    }
    self.inner.disposables.dispose();
  }
}

impl<Item: Send + 'static> Observer<Item> for SafeObserver<Item> {
  fn on_subscribe(&mut self, disposable: Disposable) { self.add(disposable) }

  fn next(&mut self, value: Item) { SafeObserver::next(self, value) }

  fn error(&mut self, err: RxError) { SafeObserver::error(self, err) }

  fn complete(&mut self) { SafeObserver::complete(self) }
}

/// Run producer logic for `observer`. Failures before a terminal event
/// become `error`; failures after it are re-raised.
pub(crate) fn run_producer<Item: Send + 'static>(
  observer: &SafeObserver<Item>,
  producer: impl FnOnce() -> RxResult<()>,
) {
  match catch_unwind(AssertUnwindSafe(producer)) {
    Ok(Ok(())) => {}
    Ok(Err(err)) => {
      if observer.is_terminated() {
        panic!("producer failed after a terminal event: {err}");
      }
      observer.error(err);
    }
    Err(payload) => {
      if observer.is_terminated() {
        resume_unwind(payload);
      }
      observer.error(RxError::from_panic(&*payload));
    }
  }
}
