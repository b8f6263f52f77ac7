//! Completable: a source that only reports success or failure.

use parking_lot::Mutex;

use crate::{
  disposable::Disposable,
  error::{RxError, RxResult},
  observable::{self, Observable},
  observer::unhandled_error,
  safe_observer::ObservableEmitter,
};

/// Emitter handed to [`Completable::create`] producers.
pub struct CompletableEmitter {
  emitter: ObservableEmitter<()>,
}

impl CompletableEmitter {
  pub fn on_complete(&self) { self.emitter.complete() }

  pub fn on_error(&self, err: RxError) { self.emitter.error(err) }

  pub fn is_disposed(&self) -> bool { self.emitter.is_closed() }

  pub fn add(&self, teardown: Disposable) { self.emitter.add(teardown) }
}

/// A cold unit of work: exactly one of `on_complete` / `on_error`.
///
/// ```rust
/// # use rxkit::prelude::*;
/// Completable::from_callable(|| {
///   println!("saved");
///   Ok(())
/// })
/// .subscribe(|| println!("done"), |e| eprintln!("{e}"));
/// ```
#[derive(Clone)]
pub struct Completable {
  source: Observable<()>,
}

impl Completable {
  pub fn create<F>(emit_fn: F) -> Self
  where
    F: Fn(CompletableEmitter) -> RxResult<()> + Send + Sync + 'static,
  {
    Self { source: observable::create(move |emitter| emit_fn(CompletableEmitter { emitter })) }
  }

  /// Completes immediately.
  pub fn complete() -> Self {
    Self::create(|emitter| {
      emitter.on_complete();
      Ok(())
    })
  }

  /// Runs `f` for every subscriber; `Ok` completes, `Err` fails.
  pub fn from_callable<F>(f: F) -> Self
  where
    F: Fn() -> RxResult<()> + Send + Sync + 'static,
  {
    Self::create(move |emitter| {
      f()?;
      emitter.on_complete();
      Ok(())
    })
  }

  pub fn subscribe<C, E>(&self, on_complete: C, on_error: E) -> Disposable
  where
    C: FnOnce() + Send + 'static,
    E: FnOnce(RxError) + Send + 'static,
  {
    let on_complete = Mutex::new(Some(on_complete));
    let on_error = Mutex::new(Some(on_error));
    self.source.subscribe_all(
      |_| {},
      move |err| match on_error.lock().take() {
        Some(f) => f(err),
        None => unhandled_error(err),
      },
      move || {
        if let Some(f) = on_complete.lock().take() {
          f();
        }
      },
    )
  }

  /// An observable of any item type that emits nothing and mirrors this
  /// completable's terminal event.
  pub fn to_observable<Item: Send + 'static>(&self) -> Observable<Item> {
    let source = self.source.clone();
    observable::create(move |emitter| {
      let (on_error, on_complete) = (emitter.clone(), emitter.clone());
      let handle = source.subscribe_all(|_| {}, move |err| on_error.error(err), move || on_complete.complete());
      emitter.add(handle);
      Ok(())
    })
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;

  type Log = Arc<Mutex<Vec<String>>>;

  fn record(completable: &Completable) -> Log {
    let log: Log = Arc::default();
    let (l1, l2) = (log.clone(), log.clone());
    completable.subscribe(
      move || l1.lock().push("complete".to_string()),
      move |e| l2.lock().push(format!("error {e}")),
    );
    log
  }

  #[test]
  fn complete_and_error() {
    assert_eq!(*record(&Completable::complete()).lock(), vec!["complete"]);
    let failing = Completable::from_callable(|| Err(RxError::msg("disk full")));
    assert_eq!(*record(&failing).lock(), vec!["error producer error: disk full"]);
  }

  #[test]
  fn work_runs_per_subscription() {
    let runs = Arc::new(AtomicUsize::new(0));
    let c_runs = runs.clone();
    let work = Completable::from_callable(move || {
      c_runs.fetch_add(1, Ordering::SeqCst);
      Ok(())
    });
    record(&work);
    record(&work);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn to_observable_of_any_item() {
    let log: Log = Arc::default();
    let (l1, l2) = (log.clone(), log.clone());
    Completable::complete().to_observable::<String>().subscribe_all(
      move |v| l1.lock().push(v),
      |_| {},
      move || l2.lock().push("complete".to_string()),
    );
    assert_eq!(*log.lock(), vec!["complete"]);
  }
}
