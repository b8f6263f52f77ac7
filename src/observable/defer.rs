use super::{Observable, ObservableSource};
use crate::{
  error::RxResult,
  safe_observer::{run_producer, SafeObserver},
};

/// Creates an observable that will on subscription defer to another
/// observable supplied by `factory`, which runs anew for every subscription.
///
/// ```rust
/// # use rxkit::prelude::*;
/// observable::defer(|| {
///   println!("Hi!");
///   Ok(observable::of("Hello!"))
/// })
/// .subscribe(move |v| println!("{v}"));
/// // Prints: Hi!\nHello!\n
/// ```
///
/// A factory returning `Err` (or panicking) fails that subscription.
pub fn defer<Item, F>(factory: F) -> Observable<Item>
where
  Item: Send + 'static,
  F: Fn() -> RxResult<Observable<Item>> + Send + Sync + 'static,
{
  Observable::new(Defer { factory })
}

struct Defer<F> {
  factory: F,
}

impl<Item, F> ObservableSource<Item> for Defer<F>
where
  Item: Send + 'static,
  F: Fn() -> RxResult<Observable<Item>> + Send + Sync + 'static,
{
  fn actual_subscribe(&self, observer: SafeObserver<Item>) {
    let downstream = observer.clone();
    run_producer(&observer, || {
      let source = (self.factory)()?;
      source.actual_subscribe(downstream);
      Ok(())
    });
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
  };

  use parking_lot::Mutex;

  use crate::{error::RxError, observable};

  #[test]
  fn factory_runs_per_subscription() {
    let calls = Arc::new(AtomicI64::new(0));
    let c_calls = calls.clone();
    let source = observable::defer(move || {
      let n = c_calls.fetch_add(1, Ordering::SeqCst);
      Ok(observable::of(n * 100))
    });
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let seen = Arc::new(Mutex::new(vec![]));
    for _ in 0..2 {
      let c_seen = seen.clone();
      source.subscribe(move |v| c_seen.lock().push(v));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*seen.lock(), vec![0, 100]);
  }

  #[test]
  fn factory_error_fails_subscription() {
    let failed = Arc::new(Mutex::new(None));
    let c_failed = failed.clone();
    observable::defer::<i32, _>(|| Err(RxError::msg("no source"))).subscribe_all(
      |_| {},
      move |e| *c_failed.lock() = Some(e.to_string()),
      || {},
    );
    assert_eq!(failed.lock().as_deref(), Some("producer error: no source"));
  }
}
