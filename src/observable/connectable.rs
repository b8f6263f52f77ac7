use std::sync::Arc;

use parking_lot::Mutex;

use super::{Observable, ObservableSource};
use crate::{
  disposable::Disposable,
  error::RxError,
  logging,
  observer::Observer,
  safe_observer::SafeObserver,
  subject::Subscribers,
};

/// A hot wrapper around a cold source: subscribing only registers the
/// observer, [`connect`](Self::connect) starts the single shared upstream
/// run.
///
/// - Observers attached before `connect` see the whole run; later ones see
///   only what is emitted after they attach.
/// - Disposing the handle returned by `connect` stops the run but keeps every
///   observer attached; the next `connect` starts a fresh run for them.
/// - An upstream `error`/`complete` reaches every attached observer, after
///   which the connectable waits for a new `connect`.
///
/// ```rust
/// # use rxkit::prelude::*;
/// let connectable = observable::from_iter(vec![1, 2, 3]).publish();
/// connectable.subscribe(|v| println!("first {v}"));
/// connectable.subscribe(|v| println!("second {v}"));
/// connectable.connect(); // both observers share one run
/// ```
pub struct ConnectableObservable<Item> {
  inner: Arc<ConnectableInner<Item>>,
}

struct ConnectableInner<Item> {
  source: Observable<Item>,
  subscribers: Arc<Subscribers<Item>>,
  connection: Mutex<Option<Disposable>>,
}

impl<Item> Clone for ConnectableObservable<Item> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<Item: Clone + Send + 'static> Observable<Item> {
  /// Turn this cold source into a [`ConnectableObservable`].
  pub fn publish(&self) -> ConnectableObservable<Item> {
    ConnectableObservable {
      inner: Arc::new(ConnectableInner {
        source: self.clone(),
        subscribers: Arc::default(),
        connection: Mutex::new(None),
      }),
    }
  }

  /// Shorthand for `publish().ref_count()`.
  pub fn share(&self) -> Observable<Item> { self.publish().ref_count() }
}

impl<Item: Clone + Send + 'static> ConnectableObservable<Item> {
  /// The subscribing side: attaching through it never connects.
  pub fn observable(&self) -> Observable<Item> { Observable::new(self.clone()) }

  pub fn subscribe<N>(&self, next: N) -> Disposable
  where
    N: FnMut(Item) + Send + 'static,
  {
    self.observable().subscribe(next)
  }

  pub fn subscribe_all<N, E, C>(&self, next: N, error: E, complete: C) -> Disposable
  where
    N: FnMut(Item) + Send + 'static,
    E: FnMut(RxError) + Send + 'static,
    C: FnMut() + Send + 'static,
  {
    self.observable().subscribe_all(next, error, complete)
  }

  pub fn subscribe_observer(&self, observer: impl Observer<Item>) -> Disposable {
    self.observable().subscribe_observer(observer)
  }

  /// Start the shared upstream run, or return the handle of the run already
  /// in progress.
  pub fn connect(&self) -> Disposable {
    let upstream = {
      let mut connection = self.inner.connection.lock();
      if let Some(current) = connection.as_ref() {
        if !current.is_disposed() {
          return current.clone();
        }
      }
      let upstream = SafeObserver::new(Broadcast { subscribers: self.inner.subscribers.clone() });
      *connection = Some(upstream.disposable());
      upstream
    };
    logging::debug!(observers = self.inner.subscribers.len(), "connectable connected");
    self.inner.source.actual_subscribe(upstream.clone());
    upstream.disposable()
  }

  /// Whether an upstream run is in progress.
  pub fn is_connected(&self) -> bool {
    self
      .inner
      .connection
      .lock()
      .as_ref()
      .is_some_and(|c| !c.is_disposed())
  }

  /// Number of observers attached right now.
  pub fn subscriber_count(&self) -> usize { self.inner.subscribers.len() }
}

impl<Item: Clone + Send + 'static> ObservableSource<Item> for ConnectableObservable<Item> {
  fn actual_subscribe(&self, observer: SafeObserver<Item>) { self.inner.subscribers.add(observer) }
}

/// Upstream observer of one connected run.
struct Broadcast<Item> {
  subscribers: Arc<Subscribers<Item>>,
}

impl<Item: Clone + Send + 'static> Observer<Item> for Broadcast<Item> {
  fn next(&mut self, value: Item) { self.subscribers.broadcast_value(value) }

  fn error(&mut self, err: RxError) {
    logging::debug!("connectable run failed: {}", err);
    self.subscribers.broadcast_error(err)
  }

  fn complete(&mut self) { self.subscribers.broadcast_complete() }
}
