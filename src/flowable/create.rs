use std::{
  collections::VecDeque,
  panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
  sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc,
  },
};

use parking_lot::Mutex;

use super::{
  add_demand, produced, try_consume, BackpressureStrategy, Flowable, FlowableSource, SafeSubscriber, Subscription,
  SubscriptionLike, UNBOUNDED,
};
use crate::{
  disposable::{CompositeDisposable, Disposable, DisposableLike},
  error::{RxError, RxResult},
  logging,
};

impl<Item: Send + 'static> Flowable<Item> {
  /// Flowable created from a producer that ignores demand. `strategy`
  /// decides what happens to values produced while the subscriber has no
  /// outstanding request.
  ///
  /// `emit_fn` runs once per subscription, right after `on_subscribe`.
  /// Returning `Err` or panicking before a terminal event delivers `error`.
  ///
  /// ```rust
  /// # use rxkit::prelude::*;
  /// let numbers = Flowable::create(
  ///   |emitter| {
  ///     for v in 0..1_000 {
  ///       if emitter.is_cancelled() {
  ///         break;
  ///       }
  ///       emitter.next(v);
  ///     }
  ///     emitter.complete();
  ///     Ok(())
  ///   },
  ///   BackpressureStrategy::Drop,
  /// );
  /// numbers.subscribe(|v| println!("{v}"));
  /// ```
  pub fn create<F>(emit_fn: F, strategy: BackpressureStrategy) -> Flowable<Item>
  where
    F: Fn(FlowableEmitter<Item>) -> RxResult<()> + Send + Sync + 'static,
  {
    Flowable::new(Create { emit_fn, strategy })
  }
}

struct Create<F> {
  emit_fn: F,
  strategy: BackpressureStrategy,
}

impl<Item, F> FlowableSource<Item> for Create<F>
where
  Item: Send + 'static,
  F: Fn(FlowableEmitter<Item>) -> RxResult<()> + Send + Sync + 'static,
{
  fn actual_subscribe(&self, subscriber: SafeSubscriber<Item>) {
    let state = Arc::new(EmitterState {
      downstream: subscriber.clone(),
      strategy: self.strategy,
      requested: AtomicU64::new(0),
      queue: Mutex::new(VecDeque::new()),
      done: Mutex::new(None),
      terminated: AtomicBool::new(false),
      wip: AtomicUsize::new(1),
      disposables: CompositeDisposable::new(),
    });
    // `wip` starts held: requests made inside `on_subscribe` are drained
    // once it returns.
    subscriber.on_subscribe(Subscription::new(SubscriptionState(state.clone())));
    state.drain_loop();

    let emitter = FlowableEmitter { state };
    let guard = emitter.clone();
    match catch_unwind(AssertUnwindSafe(|| (self.emit_fn)(emitter))) {
      Ok(Ok(())) => {}
      Ok(Err(err)) => {
        if guard.is_terminated() {
          panic!("producer failed after a terminal event: {err}");
        }
        guard.error(err);
      }
      Err(payload) => {
        if guard.is_terminated() {
          resume_unwind(payload);
        }
        guard.error(RxError::from_panic(&*payload));
      }
    }
  }
}

enum Terminal {
  Error(RxError),
  Complete,
}

struct EmitterState<Item> {
  downstream: SafeSubscriber<Item>,
  strategy: BackpressureStrategy,
  requested: AtomicU64,
  // Undelivered values for `Buffer` (bounded) and `Latest` (at most one).
  queue: Mutex<VecDeque<Item>>,
  // Terminal event waiting for `queue` to drain.
  done: Mutex<Option<Terminal>>,
  terminated: AtomicBool,
  wip: AtomicUsize,
  disposables: CompositeDisposable,
}

impl<Item: Send + 'static> EmitterState<Item> {
  fn is_cancelled(&self) -> bool { self.disposables.is_disposed() }

  fn cancel(&self) {
    self.disposables.dispose();
    self.queue.lock().clear();
  }

  fn next(&self, value: Item) {
    if self.terminated.load(Ordering::Acquire) || self.is_cancelled() {
      return;
    }
    match self.strategy {
      BackpressureStrategy::Error => {
        if try_consume(&self.requested) {
          self.downstream.next(value);
        } else {
          self.error(RxError::overflow("value produced without outstanding demand"));
        }
      }
      BackpressureStrategy::Drop => {
        if try_consume(&self.requested) {
          self.downstream.next(value);
        } else {
          logging::trace!("no demand, value dropped");
        }
      }
      BackpressureStrategy::Buffer { capacity } => {
        // Only values still waiting for demand after the drain count
        // against the capacity.
        self.queue.lock().push_back(value);
        self.drain();
        let overflow = {
          let mut queue = self.queue.lock();
          let overflow = queue.len() > capacity;
          if overflow {
            queue.clear();
          }
          overflow
        };
        if overflow {
          self.fail_now(RxError::overflow(format!("buffer capacity of {capacity} exceeded")));
        }
      }
      BackpressureStrategy::Latest => {
        {
          let mut queue = self.queue.lock();
          if queue.pop_front().is_some() {
            logging::trace!("undelivered value replaced by a newer one");
          }
          queue.push_back(value);
        }
        self.drain();
      }
    }
  }

  fn error(&self, err: RxError) { self.terminate(Terminal::Error(err)) }

  fn complete(&self) { self.terminate(Terminal::Complete) }

  fn terminate(&self, terminal: Terminal) {
    if self.is_cancelled() || self.terminated.swap(true, Ordering::AcqRel) {
      return;
    }
    match self.strategy {
      BackpressureStrategy::Buffer { .. } | BackpressureStrategy::Latest => {
        *self.done.lock() = Some(terminal);
        self.drain();
      }
      BackpressureStrategy::Error | BackpressureStrategy::Drop => self.deliver(terminal),
    }
  }

  /// Overflow of a bounded buffer: fail without draining what is left.
  fn fail_now(&self, err: RxError) {
    if self.terminated.swap(true, Ordering::AcqRel) {
      return;
    }
    self.deliver(Terminal::Error(err));
  }

  fn deliver(&self, terminal: Terminal) {
    match terminal {
      Terminal::Error(err) => self.downstream.error(err),
      Terminal::Complete => self.downstream.complete(),
    }
    self.disposables.dispose();
  }

  fn drain(&self) {
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    self.drain_loop();
  }

  /// Deliver queued values while there is demand. The caller owns `wip`.
  fn drain_loop(&self) {
    let mut missed = 1;
    loop {
      let requested = self.requested.load(Ordering::Acquire);
      let mut emitted = 0;
      while emitted != requested {
        if self.is_cancelled() {
          self.queue.lock().clear();
          return;
        }
        let finished = self.done.lock().is_some();
        let value = self.queue.lock().pop_front();
        match value {
          Some(value) => {
            self.downstream.next(value);
            emitted += 1;
          }
          None => {
            if finished {
              self.deliver_done();
              return;
            }
            break;
          }
        }
      }
      if emitted == requested {
        if self.is_cancelled() {
          self.queue.lock().clear();
          return;
        }
        let finished = self.done.lock().is_some();
        if finished && self.queue.lock().is_empty() {
          self.deliver_done();
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

  fn deliver_done(&self) {
    let terminal = self.done.lock().take();
    if let Some(terminal) = terminal {
      self.deliver(terminal);
    }
  }
}

/// The subscription handed downstream.
struct SubscriptionState<Item>(Arc<EmitterState<Item>>);

impl<Item: Send + 'static> SubscriptionLike for SubscriptionState<Item> {
  fn request(&self, n: u64) {
    add_demand(&self.0.requested, n);
    self.0.drain();
  }

  fn cancel(&self) { self.0.cancel() }

  fn is_cancelled(&self) -> bool { self.0.is_cancelled() }
}

/// Emitter handed to [`Flowable::create`] producers.
///
/// Emission must be serialized by the producer, like any observer. Demand
/// may be added from other threads at any time.
pub struct FlowableEmitter<Item> {
  state: Arc<EmitterState<Item>>,
}

impl<Item> Clone for FlowableEmitter<Item> {
  fn clone(&self) -> Self { Self { state: self.state.clone() } }
}

impl<Item: Send + 'static> FlowableEmitter<Item> {
  pub fn next(&self, value: Item) { self.state.next(value) }

  pub fn error(&self, err: RxError) { self.state.error(err) }

  pub fn complete(&self) { self.state.complete() }

  /// Outstanding demand; [`UNBOUNDED`] once unbounded.
  pub fn requested(&self) -> u64 { self.state.requested.load(Ordering::Acquire) }

  /// The subscriber cancelled or the stream has ended. Long-running
  /// producers should check this and stop.
  pub fn is_cancelled(&self) -> bool { self.state.is_cancelled() }

  /// Whether `error` or `complete` has been called.
  pub fn is_terminated(&self) -> bool { self.state.terminated.load(Ordering::Acquire) }

  /// Register teardown that runs on cancel or after the terminal event.
  pub fn add(&self, teardown: Disposable) { self.state.disposables.add(teardown); }

  /// Whether the subscriber asked for everything.
  pub fn is_unbounded(&self) -> bool { self.requested() == UNBOUNDED }
}
