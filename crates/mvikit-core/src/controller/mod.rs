// ── Controller abstraction ──
//
// One screen's reactive state machine. Accepts UI events, runs them
// through long-lived handler tasks, and publishes on three independent
// outputs: state (replay-one), navigation (buffered, single router), and
// effects (single delivery). Disposal is one-way.

mod builder;
mod handler;
mod intake;
mod output;
mod scope;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub use builder::ControllerBuilder;
pub use scope::Scope;

use crate::context::AppContext;
use crate::error::CoreError;
use crate::isolate::run_isolated;
use crate::registry::ListenerToken;
use crate::store::StateStore;
use crate::stream::{EffectStream, NavigationStream, StateStream};

use self::intake::EventIntake;
use self::output::OutputLane;

// ── Contract ─────────────────────────────────────────────────────────

/// The types one screen's controller works with.
///
/// Usually implemented on an uninhabited marker enum:
///
/// ```
/// use mvikit_core::Contract;
///
/// enum Counter {}
///
/// #[derive(Debug, Clone)]
/// enum CounterEvent { Increment }
///
/// impl Contract for Counter {
///     type Params = ();
///     type State = u32;
///     type Event = CounterEvent;
///     type Navigation = ();
///     type Effect = ();
/// }
/// ```
pub trait Contract: Send + Sync + 'static {
    /// Immutable screen arguments.
    type Params: Send + Sync + 'static;
    type State: Clone + Send + Sync + 'static;
    /// Cloned once per matching handler.
    type Event: Clone + Send + Sync + fmt::Debug + 'static;
    type Navigation: Send + fmt::Debug + 'static;
    type Effect: Send + fmt::Debug + 'static;
}

type Cleanup = Box<dyn FnOnce() + Send>;

// ── Controller ───────────────────────────────────────────────────────

/// Handle to a running controller.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Built with
/// [`Controller::builder`]; must be [`dispose`](Self::dispose)d by its owner,
/// since handler tasks keep it alive until then.
pub struct Controller<C: Contract> {
    inner: Arc<ControllerInner<C>>,
}

impl<C: Contract> Clone for Controller<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub(crate) struct ControllerInner<C: Contract> {
    name: Arc<str>,
    params: C::Params,
    context: AppContext,
    store: StateStore<C::State>,
    intake: EventIntake<C::Event>,
    navigation: OutputLane<C::Navigation>,
    effects: OutputLane<C::Effect>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    cleanups: Mutex<Vec<Cleanup>>,
    disposed: AtomicBool,
}

impl<C: Contract> Controller<C> {
    /// Start describing a controller. Handlers are attached on the builder.
    pub fn builder(
        name: impl Into<String>,
        params: C::Params,
        initial: C::State,
        context: AppContext,
    ) -> ControllerBuilder<C> {
        ControllerBuilder::new(name.into(), params, initial, context)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn params(&self) -> &C::Params {
        &self.inner.params
    }

    pub fn context(&self) -> &AppContext {
        &self.inner.context
    }

    /// Current state snapshot.
    pub fn state(&self) -> Arc<C::State> {
        self.inner.store.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    // ── View-facing surface ──────────────────────────────────────────

    /// Queue a UI event. Never blocks and never drops an accepted event.
    pub fn emit_event(&self, event: C::Event) -> Result<(), CoreError> {
        self.inner.emit_event(event)
    }

    /// Queue a UI event, suspending while the intake is full.
    pub async fn send_event(&self, event: C::Event) -> Result<(), CoreError> {
        self.inner.intake.send(event).await
    }

    /// Current state followed by every later replacement.
    pub fn observe_state(&self) -> StateStream<C::State> {
        self.inner.store.subscribe()
    }

    /// The navigation subscription. Available once per controller.
    pub fn observe_navigation(&self) -> Result<NavigationStream<C::Navigation>, CoreError> {
        self.inner
            .navigation
            .take_receiver()
            .map(NavigationStream::new)
    }

    /// The effect subscription. Available once per controller.
    pub fn observe_effects(&self) -> Result<EffectStream<C::Effect>, CoreError> {
        self.inner.effects.take_receiver().map(EffectStream::new)
    }

    // ── Owner-side operations ────────────────────────────────────────

    pub fn update_state(
        &self,
        transform: impl FnOnce(&C::State) -> C::State,
    ) -> Result<Arc<C::State>, CoreError> {
        self.inner.store.update(transform)
    }

    pub fn set_state(&self, state: C::State) -> Result<Arc<C::State>, CoreError> {
        self.inner.store.update(move |_| state)
    }

    /// Register `listener` for other screens; unregistered on disposal.
    pub fn register_listener<T>(&self, listener: Arc<T>) -> Result<ListenerToken, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.inner.register_listener(listener)
    }

    /// Run `cleanup` on disposal, or right away if already disposed.
    pub fn add_cleanup(&self, cleanup: impl FnOnce() + Send + 'static) {
        self.inner.add_cleanup(Box::new(cleanup));
    }

    /// Stop handlers, close outputs, freeze state, and run cleanups.
    ///
    /// Idempotent. Safe to call from inside one of this controller's own
    /// handlers: every step that matters happens before the final join.
    pub async fn dispose(&self) {
        let Some(handles) = self.inner.shut_down() else {
            return;
        };
        for handle in handles {
            match handle.await {
                Err(e) if e.is_panic() => {
                    error!(controller = %self.inner.name, "controller task panicked during shutdown");
                }
                _ => {}
            }
        }
        debug!(controller = %self.inner.name, "controller tasks joined");
    }
}

impl<C: Contract> fmt::Debug for Controller<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.inner.name)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

// ── Shared internals ─────────────────────────────────────────────────

impl<C: Contract> ControllerInner<C> {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn emit_event(&self, event: C::Event) -> Result<(), CoreError> {
        if self.is_disposed() {
            return Err(CoreError::ControllerDisposed);
        }
        self.intake.emit(event)
    }

    fn register_listener<T>(&self, listener: Arc<T>) -> Result<ListenerToken, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if self.is_disposed() {
            return Err(CoreError::ControllerDisposed);
        }
        let registry = self.context.registry().clone();
        let token = registry.register(listener);
        let owned = token.clone();
        self.add_cleanup(Box::new(move || {
            registry.unregister(&owned);
        }));
        Ok(token)
    }

    fn add_cleanup(&self, cleanup: Cleanup) {
        {
            let mut cleanups = self.cleanups.lock();
            if !self.is_disposed() {
                cleanups.push(cleanup);
                return;
            }
        }
        run_isolated("controller cleanup", cleanup);
    }

    /// Last-resort policy for failures a handler did not recover from.
    fn fail(&self, handler: &str, error: &CoreError) {
        if matches!(error, CoreError::ControllerDisposed) && self.is_disposed() {
            debug!(controller = %self.name, handler, "handler outlived its controller");
            return;
        }
        error!(controller = %self.name, handler, error = %error, "uncaught handler failure");
        self.context.broker().report_failure(error);
    }

    /// Synchronous half of disposal. Returns the task handles to join, or
    /// `None` if another caller already disposed.
    fn shut_down(&self) -> Option<Vec<JoinHandle<()>>> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return None;
        }
        info!(controller = %self.name, "disposing controller");

        self.cancel.cancel();
        self.store.freeze();
        self.intake.close();
        self.navigation.close();
        self.effects.close();

        let cleanups = std::mem::take(&mut *self.cleanups.lock());
        let total = cleanups.len();
        let failed = cleanups
            .into_iter()
            .map(|cleanup| run_isolated("controller cleanup", cleanup))
            .filter(|ok| !ok)
            .count();
        if failed > 0 {
            error!(controller = %self.name, failed, total, "some cleanups panicked");
        }

        Some(std::mem::take(&mut *self.task_handles.lock()))
    }
}
