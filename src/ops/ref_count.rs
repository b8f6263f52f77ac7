use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  disposable::Disposable,
  logging,
  observable::{ConnectableObservable, Observable, ObservableSource},
  safe_observer::SafeObserver,
};

impl<Item: Clone + Send + 'static> ConnectableObservable<Item> {
  /// Make a ConnectableObservable behave like an ordinary observable and
  /// automate the way you connect to it.
  ///
  /// Internally it counts the observers attached through the returned
  /// observable: the first one connects the source, and when the count
  /// drops back to zero the shared run is disposed. Attaching again after
  /// that starts a fresh run.
  ///
  /// ```rust
  /// # use rxkit::prelude::*;
  /// let scheduler = TestScheduler::new();
  /// let shared = observable::interval(Duration::from_millis(10), scheduler.clone()).share();
  /// let a = shared.subscribe(|v| println!("a {v}"));
  /// let b = shared.subscribe(|v| println!("b {v}"));
  /// scheduler.advance_by(Duration::from_millis(20));
  /// a.dispose();
  /// b.dispose(); // last observer gone: the interval is stopped
  /// ```
  pub fn ref_count(&self) -> Observable<Item> {
    Observable::new(RefCountOp {
      connectable: self.clone(),
      state: Arc::new(Mutex::new(RefState { count: 0, connection: None })),
    })
  }
}

struct RefState {
  count: usize,
  connection: Option<Disposable>,
}

struct RefCountOp<Item> {
  connectable: ConnectableObservable<Item>,
  state: Arc<Mutex<RefState>>,
}

impl<Item: Clone + Send + 'static> ObservableSource<Item> for RefCountOp<Item> {
  fn actual_subscribe(&self, observer: SafeObserver<Item>) {
    let should_connect = {
      let mut state = self.state.lock();
      state.count += 1;
      state.count == 1
    };

    let state = self.state.clone();
    observer.add(Disposable::new(move || {
      let connection = {
        let mut state = state.lock();
        state.count -= 1;
        if state.count == 0 { state.connection.take() } else { None }
      };
      if let Some(connection) = connection {
        logging::debug!("last shared observer left, disconnecting");
        connection.dispose();
      }
    }));

    self.connectable.observable().actual_subscribe(observer);

    if should_connect {
      let connection = self.connectable.connect();
      let mut state = self.state.lock();
      if state.count == 0 {
        drop(state);
        connection.dispose();
      } else if state.connection.is_none() {
        state.connection = Some(connection);
      }
    }
  }
}
