use super::{Observable, ObservableSource};
use crate::{
  error::RxResult,
  safe_observer::{run_producer, ObservableEmitter},
};

/// Observable created from a producer function.
///
/// `emit_fn` runs once per subscription, on the subscribing thread unless a
/// scheduler moves it. Returning `Err` or panicking before a terminal event
/// delivers `error`; doing so after `complete`/`error` is fatal.
///
/// ```rust
/// # use rxkit::prelude::*;
/// let source = observable::create(|emitter| {
///   emitter.next(1);
///   emitter.next(2);
///   emitter.complete();
///   Ok(())
/// });
/// source.subscribe(|v| println!("{v}"));
/// ```
pub fn create<Item, F>(emit_fn: F) -> Observable<Item>
where
  Item: Send + 'static,
  F: Fn(ObservableEmitter<Item>) -> RxResult<()> + Send + Sync + 'static,
{
  Observable::new(Create { emit_fn })
}

struct Create<F> {
  emit_fn: F,
}

impl<Item, F> ObservableSource<Item> for Create<F>
where
  Item: Send + 'static,
  F: Fn(ObservableEmitter<Item>) -> RxResult<()> + Send + Sync + 'static,
{
  fn actual_subscribe(&self, observer: ObservableEmitter<Item>) {
    let emitter = observer.clone();
    run_producer(&observer, || (self.emit_fn)(emitter));
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use parking_lot::Mutex;

  use crate::{disposable::Disposable, error::RxError, observable};

  #[test]
  fn runs_per_subscription() {
    let runs = Arc::new(AtomicUsize::new(0));
    let c_runs = runs.clone();
    let source = observable::create(move |emitter| {
      c_runs.fetch_add(1, Ordering::SeqCst);
      emitter.next("a");
      emitter.next("b");
      emitter.complete();
      Ok(())
    });

    let first = Arc::new(Mutex::new(vec![]));
    let second = Arc::new(Mutex::new(vec![]));
    let (c_first, c_second) = (first.clone(), second.clone());
    source.subscribe(move |v| c_first.lock().push(v));
    source.subscribe(move |v| c_second.lock().push(v));

    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(*first.lock(), vec!["a", "b"]);
    assert_eq!(*first.lock(), *second.lock());
  }

  #[test]
  fn only_one_terminal() {
    let events = Arc::new(Mutex::new(vec![]));
    let (e1, e2, e3) = (events.clone(), events.clone(), events.clone());
    observable::create(|emitter| {
      emitter.next(1);
      emitter.complete();
      emitter.next(2);
      emitter.error(RxError::msg("ignored"));
      emitter.complete();
      Ok(())
    })
    .subscribe_all(
      move |v| e1.lock().push(format!("next {v}")),
      move |e| e2.lock().push(format!("error {e}")),
      move || e3.lock().push("complete".to_string()),
    );
    assert_eq!(*events.lock(), vec!["next 1", "complete"]);
  }

  #[test]
  fn producer_error_and_panic() {
    let errors = Arc::new(Mutex::new(vec![]));
    let c_errors = errors.clone();
    observable::create::<i32, _>(|_| Err(RxError::msg("nope"))).subscribe_all(
      |_| {},
      move |e| c_errors.lock().push(e),
      || {},
    );
    let c_errors = errors.clone();
    observable::create::<i32, _>(|_| panic!("boom")).subscribe_all(
      |_| {},
      move |e| c_errors.lock().push(e),
      || {},
    );
    let errors = errors.lock();
    assert!(errors[0].is_producer());
    assert!(errors[1].is_panic());
  }

  #[test]
  #[should_panic(expected = "producer failed after a terminal event")]
  fn error_after_complete_is_fatal() {
    observable::create::<i32, _>(|emitter| {
      emitter.complete();
      Err(RxError::msg("too late"))
    })
    .subscribe(|_| {});
  }

  #[test]
  fn teardown_runs_on_dispose() {
    let released = Arc::new(AtomicUsize::new(0));
    let c_released = released.clone();
    let stash: Arc<Mutex<Option<crate::safe_observer::ObservableEmitter<i32>>>> = Arc::default();
    let c_stash = stash.clone();
    let d = observable::create(move |emitter| {
      let c_released = c_released.clone();
      emitter.add(Disposable::new(move || {
        c_released.fetch_add(1, Ordering::SeqCst);
      }));
      *c_stash.lock() = Some(emitter);
      Ok(())
    })
    .subscribe(|_| {});

    assert_eq!(released.load(Ordering::SeqCst), 0);
    d.dispose();
    d.dispose();
    assert_eq!(released.load(Ordering::SeqCst), 1);
    let emitter = stash.lock().take().unwrap();
    assert!(emitter.is_closed());
  }
}
