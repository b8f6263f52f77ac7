use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

use parking_lot::Mutex;

use crate::{
  disposable::{DisposableLike, SerialDisposable},
  error::RxError,
  observable::{Observable, ObservableSource},
  observer::Observer,
  safe_observer::SafeObserver,
};

impl<Item: Send + 'static> Observable<Item> {
  /// Re-subscribe to the source every time it completes, forever, until
  /// disposed. Errors end the repetition.
  pub fn repeat(&self) -> Observable<Item> { Observable::new(RepeatOp { source: self.clone(), times: None }) }

  /// Subscribe to the source `times` times in a row, completing after the
  /// last run. `repeat_n(0)` completes immediately.
  pub fn repeat_n(&self, times: usize) -> Observable<Item> {
    Observable::new(RepeatOp { source: self.clone(), times: Some(times) })
  }
}

struct RepeatOp<Item> {
  source: Observable<Item>,
  times: Option<usize>,
}

impl<Item: Send + 'static> ObservableSource<Item> for RepeatOp<Item> {
  fn actual_subscribe(&self, observer: SafeObserver<Item>) {
    if self.times == Some(0) {
      observer.complete();
      return;
    }
    let current = SerialDisposable::new();
    observer.add(current.to_disposable());
    let state = Arc::new(RepeatState {
      source: self.source.clone(),
      downstream: observer,
      remaining: Mutex::new(self.times),
      current,
      wip: AtomicUsize::new(0),
    });
    state.subscribe_next();
  }
}

struct RepeatState<Item> {
  source: Observable<Item>,
  downstream: SafeObserver<Item>,
  remaining: Mutex<Option<usize>>,
  current: SerialDisposable,
  wip: AtomicUsize,
}

impl<Item: Send + 'static> RepeatState<Item> {
  /// Trampolines re-subscription: a source completing synchronously inside
  /// `actual_subscribe` bumps `wip` instead of recursing.
  fn subscribe_next(self: &Arc<Self>) {
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    loop {
      if self.downstream.is_closed() || self.current.is_disposed() {
        return;
      }
      let upstream = SafeObserver::new(RepeatObserver { state: self.clone() });
      self.current.set(upstream.disposable());
      self.source.actual_subscribe(upstream);
      if self.wip.fetch_sub(1, Ordering::AcqRel) == 1 {
        break;
      }
    }
  }

  /// Whether another run is due after one completed.
  fn next_run(&self) -> bool {
    let mut remaining = self.remaining.lock();
    match remaining.as_mut() {
      None => true,
      Some(left) => {
        *left = left.saturating_sub(1);
        *left > 0
      }
    }
  }
}

struct RepeatObserver<Item> {
  state: Arc<RepeatState<Item>>,
}

impl<Item: Send + 'static> Observer<Item> for RepeatObserver<Item> {
  fn next(&mut self, value: Item) { self.state.downstream.next(value) }

  fn error(&mut self, err: RxError) { self.state.downstream.error(err) }

  fn complete(&mut self) {
    if self.state.next_run() {
      self.state.subscribe_next();
    } else {
      self.state.downstream.complete();
    }
  }
}
