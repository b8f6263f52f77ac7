//! Disposables: idempotent handles that tear down running work.
//!
//! Every `subscribe` returns a [`Disposable`]. Calling
//! [`Disposable::dispose`] any number of times, from any thread, runs the
//! underlying teardown exactly once.

use std::{
  fmt,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use parking_lot::Mutex;
use smallvec::SmallVec;

/// Anything that can be disposed. Implementations must be idempotent.
pub trait DisposableLike: Send + Sync + 'static {
  fn dispose(&self);

  fn is_disposed(&self) -> bool;

  /// Address of the shared state behind this disposable. Handles built
  /// over the same state report the same identity.
  fn identity(&self) -> *const () { self as *const Self as *const () }
}

/// A cloneable handle over some teardown. All clones refer to the same
/// underlying resource.
#[derive(Clone)]
pub struct Disposable(Arc<dyn DisposableLike>);

impl Disposable {
  /// A disposable that runs `teardown` the first time it is disposed.
  pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
    Self(Arc::new(ActionDisposable {
      disposed: AtomicBool::new(false),
      action: Mutex::new(Some(Box::new(teardown))),
    }))
  }

  /// A disposable with nothing to tear down. It still tracks its state.
  pub fn empty() -> Self {
    Self(Arc::new(ActionDisposable {
      disposed: AtomicBool::new(false),
      action: Mutex::new(None),
    }))
  }

  /// A disposable that starts out disposed.
  pub fn disposed() -> Self {
    Self(Arc::new(ActionDisposable {
      disposed: AtomicBool::new(true),
      action: Mutex::new(None),
    }))
  }

  pub fn from_like(inner: Arc<dyn DisposableLike>) -> Self { Self(inner) }

  #[inline]
  pub fn dispose(&self) { self.0.dispose() }

  #[inline]
  pub fn is_disposed(&self) -> bool { self.0.is_disposed() }

  /// Whether both handles refer to the same resource.
  pub fn same(&self, other: &Disposable) -> bool {
    std::ptr::eq(self.0.identity(), other.0.identity())
  }

  /// Activates "RAII" behavior: the returned guard disposes when dropped.
  pub fn dispose_when_dropped(self) -> DisposableGuard { DisposableGuard::new(self) }
}

impl fmt::Debug for Disposable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Disposable")
      .field("disposed", &self.is_disposed())
      .finish()
  }
}

impl DisposableLike for Disposable {
  fn dispose(&self) { self.0.dispose() }

  fn is_disposed(&self) -> bool { self.0.is_disposed() }

  fn identity(&self) -> *const () { self.0.identity() }
}

struct ActionDisposable {
  disposed: AtomicBool,
  action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl DisposableLike for ActionDisposable {
  fn dispose(&self) {
    if !self.disposed.swap(true, Ordering::AcqRel) {
      let action = self.action.lock().take();
      if let Some(action) = action {
        action();
      }
    }
  }

  fn is_disposed(&self) -> bool { self.disposed.load(Ordering::Acquire) }
}

// ============================================================================
// CompositeDisposable
// ============================================================================

/// A set of disposables torn down together.
///
/// Once the composite is disposed, anything added afterwards is disposed on
/// the spot instead of being retained.
#[derive(Clone, Default)]
pub struct CompositeDisposable(Arc<Mutex<CompositeInner>>);

#[derive(Default)]
struct CompositeInner {
  disposed: bool,
  items: SmallVec<[Disposable; 2]>,
}

impl CompositeDisposable {
  pub fn new() -> Self { Self::default() }

  /// Adds `item` to the set. Returns `false` (after disposing `item`) when
  /// the composite was already disposed.
  pub fn add(&self, item: Disposable) -> bool {
    let mut inner = self.0.lock();
    if inner.disposed {
      drop(inner);
      item.dispose();
      false
    } else {
      inner.items.retain(|d| !d.is_disposed());
      inner.items.push(item);
      true
    }
  }

  /// Removes `item` and disposes it. Returns whether it was a member.
  pub fn remove(&self, item: &Disposable) -> bool {
    let removed = self.delete(item);
    if removed {
      item.dispose();
    }
    removed
  }

  /// Removes `item` without disposing it.
  pub fn delete(&self, item: &Disposable) -> bool {
    let mut inner = self.0.lock();
    let before = inner.items.len();
    inner.items.retain(|d| !d.same(item));
    before != inner.items.len()
  }

  /// Disposes every member but keeps the composite usable.
  pub fn clear(&self) {
    let items = std::mem::take(&mut self.0.lock().items);
    items.iter().for_each(Disposable::dispose);
  }

  /// Number of members still held.
  pub fn len(&self) -> usize { self.0.lock().items.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  pub fn to_disposable(&self) -> Disposable { Disposable::from_like(Arc::new(self.clone())) }
}

impl DisposableLike for CompositeDisposable {
  fn dispose(&self) {
    let items = {
      let mut inner = self.0.lock();
      if inner.disposed {
        return;
      }
      inner.disposed = true;
      std::mem::take(&mut inner.items)
    };
    items.iter().for_each(Disposable::dispose);
  }

  fn is_disposed(&self) -> bool { self.0.lock().disposed }

  fn identity(&self) -> *const () { Arc::as_ptr(&self.0) as *const () }
}

impl From<CompositeDisposable> for Disposable {
  fn from(composite: CompositeDisposable) -> Self { Disposable::from_like(Arc::new(composite)) }
}

// ============================================================================
// SerialDisposable
// ============================================================================

/// Holds at most one disposable; setting a new one disposes the previous
/// one.
#[derive(Clone, Default)]
pub struct SerialDisposable(Arc<Mutex<SerialInner>>);

#[derive(Default)]
struct SerialInner {
  disposed: bool,
  current: Option<Disposable>,
}

impl SerialDisposable {
  pub fn new() -> Self { Self::default() }

  /// Replaces the held disposable, disposing the old one. If the serial
  /// itself is disposed, `next` is disposed immediately.
  pub fn set(&self, next: Disposable) {
    let previous = {
      let mut inner = self.0.lock();
      if inner.disposed {
        None
      } else {
        Some(inner.current.replace(next.clone()))
      }
    };
    match previous {
      None => next.dispose(),
      Some(Some(previous)) => previous.dispose(),
      Some(None) => {}
    }
  }

  pub fn to_disposable(&self) -> Disposable { Disposable::from_like(Arc::new(self.clone())) }
}

impl DisposableLike for SerialDisposable {
  fn dispose(&self) {
    let current = {
      let mut inner = self.0.lock();
      if inner.disposed {
        return;
      }
      inner.disposed = true;
      inner.current.take()
    };
    if let Some(current) = current {
      current.dispose();
    }
  }

  fn is_disposed(&self) -> bool { self.0.lock().disposed }

  fn identity(&self) -> *const () { Arc::as_ptr(&self.0) as *const () }
}

// ============================================================================
// DisposableGuard
// ============================================================================

/// An RAII implementation of a "scoped subscription". When this structure is
/// dropped (falls out of scope), the disposable will be disposed.
///
/// If you want to drop it immediately, wrap it in its own scope.
#[derive(Debug)]
#[must_use]
pub struct DisposableGuard(Option<Disposable>);

impl DisposableGuard {
  pub fn new(disposable: Disposable) -> Self { Self(Some(disposable)) }

  /// Gives the handle back without disposing it.
  pub fn into_inner(mut self) -> Disposable { self.0.take().unwrap_or_else(Disposable::disposed) }
}

impl Drop for DisposableGuard {
  #[inline]
  fn drop(&mut self) {
    if let Some(d) = self.0.take() {
      d.dispose();
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::AtomicUsize;

  use super::*;

  fn counting() -> (Disposable, Arc<AtomicUsize>) {
    let runs = Arc::new(AtomicUsize::new(0));
    let c_runs = runs.clone();
    let d = Disposable::new(move || {
      c_runs.fetch_add(1, Ordering::SeqCst);
    });
    (d, runs)
  }

  #[test]
  fn dispose_is_idempotent() {
    let (d, runs) = counting();
    assert!(!d.is_disposed());
    d.dispose();
    d.dispose();
    d.clone().dispose();
    assert!(d.is_disposed());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn dispose_from_many_threads_runs_once() {
    let (d, runs) = counting();
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let d = d.clone();
        std::thread::spawn(move || d.dispose())
      })
      .collect();
    for h in handles {
      h.join().unwrap();
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn dispose_inside_own_teardown() {
    let slot: Arc<Mutex<Option<Disposable>>> = Arc::default();
    let c_slot = slot.clone();
    let d = Disposable::new(move || {
      if let Some(me) = c_slot.lock().take() {
        me.dispose();
      }
    });
    *slot.lock() = Some(d.clone());
    d.dispose();
    assert!(d.is_disposed());
  }

  #[test]
  fn composite_disposes_members() {
    let composite = CompositeDisposable::new();
    let (a, a_runs) = counting();
    let (b, b_runs) = counting();
    assert!(composite.add(a));
    assert!(composite.add(b));
    assert_eq!(composite.len(), 2);

    composite.dispose();
    assert!(composite.is_disposed());
    assert!(composite.is_empty());
    assert_eq!(a_runs.load(Ordering::SeqCst), 1);
    assert_eq!(b_runs.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn composite_add_after_dispose() {
    let composite = CompositeDisposable::new();
    composite.dispose();

    let (late, runs) = counting();
    assert!(!composite.add(late.clone()));
    assert!(late.is_disposed());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(composite.len(), 0);
  }

  #[test]
  fn composite_remove_and_delete() {
    let composite = CompositeDisposable::new();
    let (a, a_runs) = counting();
    let (b, b_runs) = counting();
    composite.add(a.clone());
    composite.add(b.clone());

    assert!(composite.remove(&a));
    assert_eq!(a_runs.load(Ordering::SeqCst), 1);
    assert!(composite.delete(&b));
    assert_eq!(b_runs.load(Ordering::SeqCst), 0);
    assert!(!composite.remove(&a));
    assert!(composite.is_empty());
  }

  #[test]
  fn handles_to_one_composite_are_the_same() {
    let outer = CompositeDisposable::new();
    let inner = CompositeDisposable::new();
    assert!(inner.to_disposable().same(&inner.to_disposable()));
    assert!(inner.to_disposable().same(&Disposable::from(inner.clone())));
    assert!(!inner.to_disposable().same(&outer.to_disposable()));

    outer.add(inner.to_disposable());
    assert!(outer.remove(&inner.to_disposable()));
    assert!(outer.is_empty());
    assert!(inner.is_disposed());

    let serial = SerialDisposable::new();
    assert!(serial.to_disposable().same(&serial.to_disposable()));
  }

  #[test]
  fn composite_prunes_disposed_members() {
    let composite = CompositeDisposable::new();
    let (a, _) = counting();
    composite.add(a.clone());
    a.dispose();
    composite.add(Disposable::empty());
    assert_eq!(composite.len(), 1);
  }

  #[test]
  fn composite_clear_keeps_it_open() {
    let composite = CompositeDisposable::new();
    let (a, runs) = counting();
    composite.add(a);
    composite.clear();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(!composite.is_disposed());
    assert!(composite.add(Disposable::empty()));
  }

  #[test]
  fn serial_replaces_and_disposes() {
    let serial = SerialDisposable::new();
    let (first, first_runs) = counting();
    let (second, second_runs) = counting();
    serial.set(first);
    serial.set(second);
    assert_eq!(first_runs.load(Ordering::SeqCst), 1);
    assert_eq!(second_runs.load(Ordering::SeqCst), 0);

    serial.dispose();
    assert_eq!(second_runs.load(Ordering::SeqCst), 1);

    let (late, late_runs) = counting();
    serial.set(late);
    assert_eq!(late_runs.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn guard_disposes_on_drop() {
    let (d, runs) = counting();
    {
      let _guard = d.clone().dispose_when_dropped();
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    let (kept, kept_runs) = counting();
    let handle = kept.dispose_when_dropped().into_inner();
    assert!(!handle.is_disposed());
    assert_eq!(kept_runs.load(Ordering::SeqCst), 0);
  }
}
