use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::{disposable::Disposable, error::RxError, safe_observer::SafeObserver};

type Snapshot<Item> = SmallVec<[SafeObserver<Item>; 2]>;

/// The observers attached to a hot source, keyed by registration id.
///
/// Broadcasting works on a snapshot taken under the lock, so observers may
/// attach or detach from inside a callback while a value is being
/// delivered. An observer detached mid-emission is skipped by its own
/// guard.
pub(crate) struct Subscribers<Item> {
  inner: Mutex<SubscribersInner<Item>>,
}

struct SubscribersInner<Item> {
  next_id: usize,
  entries: SmallVec<[(usize, SafeObserver<Item>); 2]>,
}

impl<Item> Default for Subscribers<Item> {
  fn default() -> Self {
    Self {
      inner: Mutex::new(SubscribersInner { next_id: 0, entries: SmallVec::new() }),
    }
  }
}

impl<Item: Send + 'static> Subscribers<Item> {
  /// Register `observer`. Disposing it removes the registration.
  pub(crate) fn add(self: &Arc<Self>, observer: SafeObserver<Item>) {
    let id = {
      let mut inner = self.inner.lock();
      let id = inner.next_id;
      inner.next_id += 1;
      inner.entries.push((id, observer.clone()));
      id
    };
    let subscribers: Weak<Self> = Arc::downgrade(self);
    observer.add(Disposable::new(move || {
      if let Some(subscribers) = subscribers.upgrade() {
        subscribers.remove(id);
      }
    }));
  }

  fn remove(&self, id: usize) { self.inner.lock().entries.retain(|(key, _)| *key != id); }

  pub(crate) fn len(&self) -> usize { self.inner.lock().entries.len() }

  fn snapshot(&self) -> Snapshot<Item> {
    self.inner.lock().entries.iter().map(|(_, o)| o.clone()).collect()
  }

  fn drain(&self) -> Snapshot<Item> {
    let entries = std::mem::take(&mut self.inner.lock().entries);
    entries.into_iter().map(|(_, o)| o).collect()
  }

  /// Deliver `value` to everyone attached right now: clones for all but the
  /// last observer, which receives the moved value.
  pub(crate) fn broadcast_value(&self, value: Item)
  where
    Item: Clone,
  {
    let observers = self.snapshot();
    let mut iter = observers.iter().peekable();
    while let Some(observer) = iter.next() {
      if iter.peek().is_some() {
        observer.next(value.clone());
      } else {
        observer.next(value);
        break;
      }
    }
  }

  /// Send `err` to every observer and clear the set.
  pub(crate) fn broadcast_error(&self, err: RxError) {
    for observer in self.drain() {
      observer.error(err.clone());
    }
  }

  /// Complete every observer and clear the set.
  pub(crate) fn broadcast_complete(&self) {
    for observer in self.drain() {
      observer.complete();
    }
  }
}
