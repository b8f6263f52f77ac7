//! Subject: a hot source that is also an observer.
//!
//! Values pushed into a [`Subject`] go to the observers attached at that
//! moment; nothing is replayed to late subscribers. Once the subject has
//! terminated, new subscribers immediately receive the same terminal event.
//!
//! ```rust
//! use rxkit::prelude::*;
//!
//! let subject = Subject::new();
//! subject.next(1); // nobody is listening yet
//! subject.observable().subscribe(|v: i32| println!("{v}"));
//! subject.next(2); // printed
//! subject.complete();
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  disposable::Disposable,
  error::RxError,
  observable::{Observable, ObservableSource},
  observer::Observer,
  safe_observer::SafeObserver,
};

mod subscribers;
pub(crate) use subscribers::Subscribers;

#[derive(Clone)]
enum Terminated {
  Error(RxError),
  Complete,
}

struct SubjectInner<Item> {
  subscribers: Arc<Subscribers<Item>>,
  terminated: Mutex<Option<Terminated>>,
}

/// A multicasting source you push into by hand.
pub struct Subject<Item> {
  inner: Arc<SubjectInner<Item>>,
}

impl<Item> Clone for Subject<Item> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<Item: Clone + Send + 'static> Default for Subject<Item> {
  fn default() -> Self { Self::new() }
}

impl<Item: Clone + Send + 'static> Subject<Item> {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(SubjectInner {
        subscribers: Arc::default(),
        terminated: Mutex::new(None),
      }),
    }
  }

  /// The subscribing side of this subject.
  pub fn observable(&self) -> Observable<Item> { Observable::new(self.clone()) }

  pub fn next(&self, value: Item) {
    if self.is_terminated() {
      return;
    }
    self.inner.subscribers.broadcast_value(value);
  }

  pub fn error(&self, err: RxError) {
    if self.set_terminated(Terminated::Error(err.clone())) {
      self.inner.subscribers.broadcast_error(err);
    }
  }

  pub fn complete(&self) {
    if self.set_terminated(Terminated::Complete) {
      self.inner.subscribers.broadcast_complete();
    }
  }

  pub fn is_terminated(&self) -> bool { self.inner.terminated.lock().is_some() }

  /// Number of observers currently attached.
  pub fn subscriber_count(&self) -> usize { self.inner.subscribers.len() }

  fn set_terminated(&self, terminal: Terminated) -> bool {
    let mut terminated = self.inner.terminated.lock();
    if terminated.is_some() {
      return false;
    }
    *terminated = Some(terminal);
    true
  }
}

impl<Item: Clone + Send + 'static> ObservableSource<Item> for Subject<Item> {
  fn actual_subscribe(&self, observer: SafeObserver<Item>) {
    let terminated = self.inner.terminated.lock();
    match terminated.clone() {
      Some(terminal) => {
        drop(terminated);
        match terminal {
          Terminated::Error(err) => observer.error(err),
          Terminated::Complete => observer.complete(),
        }
      }
      None => {
        self.inner.subscribers.add(observer);
        drop(terminated);
      }
    }
  }
}

impl<Item: Clone + Send + 'static> Observer<Item> for Subject<Item> {
  fn on_subscribe(&mut self, disposable: Disposable) {
    if self.is_terminated() {
      disposable.dispose();
    }
  }

  fn next(&mut self, value: Item) { Subject::next(self, value) }

  fn error(&mut self, err: RxError) { Subject::error(self, err) }

  fn complete(&mut self) { Subject::complete(self) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::observable;

  type Log = Arc<Mutex<Vec<String>>>;

  fn attach(subject: &Subject<i32>, name: &'static str, log: &Log) -> Disposable {
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    subject.observable().subscribe_all(
      move |v| l1.lock().push(format!("{name} {v}")),
      move |e| l2.lock().push(format!("{name} error {e}")),
      move || l3.lock().push(format!("{name} complete")),
    )
  }

  #[test]
  fn late_subscribers_miss_earlier_values() {
    let log: Log = Arc::default();
    let subject = Subject::new();
    attach(&subject, "a", &log);
    subject.next(1);
    attach(&subject, "b", &log);
    subject.next(2);
    subject.complete();

    assert_eq!(
      *log.lock(),
      vec!["a 1", "a 2", "b 2", "a complete", "b complete"]
    );
    assert_eq!(subject.subscriber_count(), 0);
  }

  #[test]
  fn dispose_detaches_one_observer() {
    let log: Log = Arc::default();
    let subject = Subject::new();
    let a = attach(&subject, "a", &log);
    attach(&subject, "b", &log);
    assert_eq!(subject.subscriber_count(), 2);
    a.dispose();
    a.dispose();
    assert_eq!(subject.subscriber_count(), 1);
    subject.next(5);
    assert_eq!(*log.lock(), vec!["b 5"]);
  }

  #[test]
  fn terminal_is_replayed_to_newcomers() {
    let log: Log = Arc::default();
    let subject = Subject::new();
    subject.error(RxError::msg("gone"));
    subject.next(1);
    attach(&subject, "late", &log);
    assert_eq!(*log.lock(), vec!["late error producer error: gone"]);
  }

  #[test]
  fn detach_during_delivery_uses_snapshot() {
    let log: Log = Arc::default();
    let subject = Subject::new();
    let b_handle: Arc<Mutex<Option<Disposable>>> = Arc::default();
    let (c_log, c_handle) = (log.clone(), b_handle.clone());
    subject.observable().subscribe(move |v: i32| {
      c_log.lock().push(format!("a {v}"));
      if let Some(b) = c_handle.lock().take() {
        b.dispose();
      }
    });
    *b_handle.lock() = Some(attach(&subject, "b", &log));

    subject.next(1);
    subject.next(2);
    assert_eq!(*log.lock(), vec!["a 1", "a 2"]);
  }

  #[test]
  fn subject_as_observer() {
    let log: Log = Arc::default();
    let subject = Subject::new();
    attach(&subject, "s", &log);
    observable::from_iter(vec![1, 2]).subscribe_observer(subject.clone());
    assert_eq!(*log.lock(), vec!["s 1", "s 2", "s complete"]);
    assert!(subject.is_terminated());
  }
}
