use super::{throw, Observable, ObservableSource};
use crate::{
  error::RxError,
  safe_observer::{run_producer, SafeObserver},
};

/// Creates an observable that produces values from an iterator.
///
/// Completes when all elements have been emitted. The iterator is cloned
/// for each subscription, so every subscriber sees the full sequence.
///
/// ```rust
/// # use rxkit::prelude::*;
/// observable::from_iter(vec![1, 2, 3]).subscribe(|v| println!("{v}"));
/// ```
pub fn from_iter<I>(iter: I) -> Observable<I::Item>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::Item: Send + 'static,
{
  Observable::new(FromIter { iter })
}

/// Emits `value` once, then completes.
pub fn of<Item>(value: Item) -> Observable<Item>
where
  Item: Clone + Send + Sync + 'static,
{
  from_iter(std::iter::once(value))
}

/// Alias of [`of`].
pub fn just<Item>(value: Item) -> Observable<Item>
where
  Item: Clone + Send + Sync + 'static,
{
  of(value)
}

/// Emits `start, start + 1, ..., start + count - 1`, then completes.
///
/// A range whose last value does not fit in an `i64` fails every
/// subscriber with an error instead of emitting anything.
pub fn range(start: i64, count: usize) -> Observable<i64> {
  match range_overflow(start, count) {
    None => from_iter((0..count).map(move |offset| start + offset as i64)),
    Some(err) => throw(err),
  }
}

/// The error for a range running past `i64::MAX`, if it does.
pub(crate) fn range_overflow(start: i64, count: usize) -> Option<RxError> {
  if count == 0 {
    return None;
  }
  let last = i64::try_from(count - 1).ok().and_then(|span| start.checked_add(span));
  match last {
    Some(_) => None,
    None => Some(RxError::msg(format!("range of {count} values from {start} overflows i64"))),
  }
}

/// Emits `value` `count` times, then completes.
pub fn repeat<Item>(value: Item, count: usize) -> Observable<Item>
where
  Item: Clone + Send + Sync + 'static,
{
  from_iter(std::iter::repeat(value).take(count))
}

struct FromIter<I> {
  iter: I,
}

impl<I> ObservableSource<I::Item> for FromIter<I>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::Item: Send + 'static,
{
  fn actual_subscribe(&self, observer: SafeObserver<I::Item>) {
    let iter = self.iter.clone();
    run_producer(&observer, || {
      for v in iter {
        if observer.is_closed() {
          return Ok(());
        }
        observer.next(v);
      }
      observer.complete();
      Ok(())
    });
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::observable::{self, Observable};

  fn collect<Item: Send + 'static>(source: &Observable<Item>) -> (Vec<Item>, bool) {
    let seen = Arc::new(Mutex::new(vec![]));
    let done = Arc::new(Mutex::new(false));
    let (c_seen, c_done) = (seen.clone(), done.clone());
    source.subscribe_all(move |v| c_seen.lock().push(v), |_| {}, move || *c_done.lock() = true);
    let seen = std::mem::take(&mut *seen.lock());
    let done = *done.lock();
    (seen, done)
  }

  #[test]
  fn range_emits_count_values() {
    assert_eq!(collect(&observable::range(3, 5)), (vec![3, 4, 5, 6, 7], true));
    assert_eq!(collect(&observable::range(-2, 0)), (vec![], true));
  }

  #[test]
  fn range_past_i64_max_is_an_error() {
    let seen = Arc::new(Mutex::new(vec![]));
    let errors = Arc::new(Mutex::new(vec![]));
    let (c_seen, c_errors) = (seen.clone(), errors.clone());
    observable::range(i64::MAX, 2).subscribe_all(
      move |v| c_seen.lock().push(v),
      move |e| c_errors.lock().push(e.to_string()),
      || {},
    );
    assert!(seen.lock().is_empty());
    assert_eq!(
      *errors.lock(),
      vec!["producer error: range of 2 values from 9223372036854775807 overflows i64"]
    );

    assert_eq!(collect(&observable::range(i64::MAX, 1)), (vec![i64::MAX], true));
    assert_eq!(collect(&observable::range(i64::MIN, 0)), (vec![], true));
  }

  #[test]
  fn panicking_iterator_becomes_error() {
    let source = observable::from_iter((0..3).map(|v| if v == 2 { panic!("boom at {v}") } else { v }));
    let seen = Arc::new(Mutex::new(vec![]));
    let errors = Arc::new(Mutex::new(vec![]));
    let (c_seen, c_errors) = (seen.clone(), errors.clone());
    source.subscribe_all(
      move |v| c_seen.lock().push(v),
      move |e| c_errors.lock().push(e.to_string()),
      || {},
    );
    assert_eq!(*seen.lock(), vec![0, 1]);
    assert_eq!(*errors.lock(), vec!["panicked: boom at 2"]);
  }

  #[test]
  fn from_iter_is_cold() {
    let source = observable::from_iter(vec!["x", "y"]);
    assert_eq!(collect(&source), collect(&source));
    assert_eq!(collect(&source).0, vec!["x", "y"]);
  }

  #[test]
  fn of_and_repeat() {
    assert_eq!(collect(&observable::of(9)), (vec![9], true));
    assert_eq!(collect(&observable::just('k')).0, vec!['k']);
    assert_eq!(collect(&observable::repeat(1, 3)).0, vec![1, 1, 1]);
  }

  #[test]
  fn stops_once_disposed() {
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let handle: Arc<Mutex<Option<crate::disposable::Disposable>>> = Arc::default();
    let c_handle = handle.clone();
    observable::from_iter(0..1000).subscribe_with(
      move |v| {
        c_seen.lock().push(v);
        if v == 3 {
          if let Some(d) = c_handle.lock().take() {
            d.dispose();
          }
        }
      },
      |_| {},
      || {},
      move |d| *handle.lock() = Some(d),
    );
    assert_eq!(*seen.lock(), vec![0, 1, 2, 3]);
  }
}
