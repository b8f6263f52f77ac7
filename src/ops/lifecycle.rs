//! Lifecycle operators: side effects hooked onto the events of a stream.
//!
//! Every operator here forwards the stream unchanged and only runs a callback
//! at a fixed point of the subscription's life:
//!
//! | Operator | Runs |
//! |----------|------|
//! | `do_on_subscribe` | before the upstream is subscribed |
//! | `do_on_next` / `do_after_next` | before / after each value reaches downstream |
//! | `do_on_error` / `do_on_complete` | before that terminal event reaches downstream |
//! | `do_on_terminate` / `do_after_terminate` | before / after either terminal event |
//! | `do_finally` | once, after the terminal event or on dispose |

use std::{
  panic::{catch_unwind, AssertUnwindSafe},
  sync::Arc,
};

use crate::{
  disposable::Disposable,
  error::RxError,
  observable::{Observable, ObservableSource},
  observer::Observer,
  safe_observer::SafeObserver,
};

type Action = Arc<dyn Fn() + Send + Sync>;
type ValueAction<Item> = Arc<dyn Fn(&Item) + Send + Sync>;
type ErrorAction = Arc<dyn Fn(&RxError) + Send + Sync>;
type Deliver<Item> = Arc<dyn Fn(&SafeObserver<Item>, Item) + Send + Sync>;

// ==================== Hooks ====================

struct Hooks<Item> {
  on_subscribe: Option<Action>,
  on_next: Option<ValueAction<Item>>,
  after_next: Option<Deliver<Item>>,
  on_error: Option<ErrorAction>,
  on_complete: Option<Action>,
  on_terminate: Option<Action>,
  after_terminate: Option<Action>,
  finally: Option<Action>,
}

impl<Item> Default for Hooks<Item> {
  fn default() -> Self {
    Self {
      on_subscribe: None,
      on_next: None,
      after_next: None,
      on_error: None,
      on_complete: None,
      on_terminate: None,
      after_terminate: None,
      finally: None,
    }
  }
}

impl<Item: Send + 'static> Observable<Item> {
  fn with_hooks(&self, hooks: Hooks<Item>) -> Observable<Item> {
    Observable::new(LifecycleOp { source: self.clone(), hooks: Arc::new(hooks) })
  }

  /// Run `f` each time a subscriber attaches, before the upstream is
  /// subscribed. A panic in `f` errors the subscription and the upstream is
  /// never subscribed.
  pub fn do_on_subscribe<F>(&self, f: F) -> Observable<Item>
  where
    F: Fn() + Send + Sync + 'static,
  {
    self.with_hooks(Hooks { on_subscribe: Some(Arc::new(f)), ..Hooks::default() })
  }

  /// Inspect each value before it is delivered.
  pub fn do_on_next<F>(&self, f: F) -> Observable<Item>
  where
    F: Fn(&Item) + Send + Sync + 'static,
  {
    self.with_hooks(Hooks { on_next: Some(Arc::new(f)), ..Hooks::default() })
  }

  /// Inspect each value after downstream has consumed it. The value is
  /// cloned so the hook still sees it.
  pub fn do_after_next<F>(&self, f: F) -> Observable<Item>
  where
    Item: Clone,
    F: Fn(&Item) + Send + Sync + 'static,
  {
    let deliver = move |observer: &SafeObserver<Item>, value: Item| {
      observer.next(value.clone());
      f(&value);
    };
    self.with_hooks(Hooks { after_next: Some(Arc::new(deliver)), ..Hooks::default() })
  }

  pub fn do_on_error<F>(&self, f: F) -> Observable<Item>
  where
    F: Fn(&RxError) + Send + Sync + 'static,
  {
    self.with_hooks(Hooks { on_error: Some(Arc::new(f)), ..Hooks::default() })
  }

  pub fn do_on_complete<F>(&self, f: F) -> Observable<Item>
  where
    F: Fn() + Send + Sync + 'static,
  {
    self.with_hooks(Hooks { on_complete: Some(Arc::new(f)), ..Hooks::default() })
  }

  /// Run `f` just before either terminal event reaches downstream.
  pub fn do_on_terminate<F>(&self, f: F) -> Observable<Item>
  where
    F: Fn() + Send + Sync + 'static,
  {
    self.with_hooks(Hooks { on_terminate: Some(Arc::new(f)), ..Hooks::default() })
  }

  /// Run `f` right after either terminal event has been delivered.
  pub fn do_after_terminate<F>(&self, f: F) -> Observable<Item>
  where
    F: Fn() + Send + Sync + 'static,
  {
    self.with_hooks(Hooks { after_terminate: Some(Arc::new(f)), ..Hooks::default() })
  }

  /// Run `f` exactly once per subscription, after it terminates or is
  /// disposed, whichever happens first.
  ///
  /// ```rust
  /// # use rxkit::prelude::*;
  /// let d = observable::never::<i32>()
  ///   .do_finally(|| println!("released"))
  ///   .subscribe(|_| {});
  /// d.dispose(); // prints "released"
  /// ```
  pub fn do_finally<F>(&self, f: F) -> Observable<Item>
  where
    F: Fn() + Send + Sync + 'static,
  {
    self.with_hooks(Hooks { finally: Some(Arc::new(f)), ..Hooks::default() })
  }
}

// ==================== Operator ====================

struct LifecycleOp<Item> {
  source: Observable<Item>,
  hooks: Arc<Hooks<Item>>,
}

impl<Item: Send + 'static> ObservableSource<Item> for LifecycleOp<Item> {
  fn actual_subscribe(&self, observer: SafeObserver<Item>) {
    if let Some(finally) = self.hooks.finally.clone() {
      observer.add(Disposable::new(move || finally()));
    }
    if let Some(on_subscribe) = &self.hooks.on_subscribe {
      if let Err(payload) = catch_unwind(AssertUnwindSafe(|| on_subscribe())) {
        observer.error(RxError::from_panic(&*payload));
        return;
      }
    }
    let upstream = observer.upstream(LifecycleObserver { observer: observer.clone(), hooks: self.hooks.clone() });
    self.source.actual_subscribe(upstream);
  }
}

struct LifecycleObserver<Item> {
  observer: SafeObserver<Item>,
  hooks: Arc<Hooks<Item>>,
}

impl<Item: Send + 'static> LifecycleObserver<Item> {
  fn terminate(&self, deliver: impl FnOnce(&SafeObserver<Item>)) {
    if let Some(f) = &self.hooks.on_terminate {
      f();
    }
    deliver(&self.observer);
    if let Some(f) = &self.hooks.after_terminate {
      f();
    }
  }
}

impl<Item: Send + 'static> Observer<Item> for LifecycleObserver<Item> {
  fn next(&mut self, value: Item) {
    if let Some(f) = &self.hooks.on_next {
      f(&value);
    }
    match &self.hooks.after_next {
      Some(deliver) => deliver(&self.observer, value),
      None => self.observer.next(value),
    }
  }

  fn error(&mut self, err: RxError) {
    if let Some(f) = &self.hooks.on_error {
      f(&err);
    }
    self.terminate(|observer| observer.error(err));
  }

  fn complete(&mut self) {
    if let Some(f) = &self.hooks.on_complete {
      f();
    }
    self.terminate(|observer| observer.complete());
  }
}
