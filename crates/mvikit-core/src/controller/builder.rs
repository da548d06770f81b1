// ── Controller construction ──

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::context::AppContext;
use crate::error::{Channel, CoreError};
use crate::store::StateStore;

use super::handler::{self, HandlerSpec, Route};
use super::intake::EventIntake;
use super::output::OutputLane;
use super::scope::Scope;
use super::{Contract, Controller, ControllerInner};

/// Declares a controller's handlers, then starts it.
///
/// ```no_run
/// # use mvikit_core::{AppContext, Contract, Controller, CoreError};
/// # enum Counter {}
/// # #[derive(Debug, Clone)]
/// # enum CounterEvent { Increment }
/// # impl Contract for Counter {
/// #     type Params = ();
/// #     type State = u32;
/// #     type Event = CounterEvent;
/// #     type Navigation = ();
/// #     type Effect = ();
/// # }
/// # async fn demo() -> Result<(), CoreError> {
/// let counter = Controller::<Counter>::builder("counter", (), 0, AppContext::default())
///     .on("increment", |e| matches!(e, CounterEvent::Increment), |scope, _| async move {
///         scope.update_state(|n| n + 1)?;
///         Ok(())
///     })
///     .build()?;
/// counter.emit_event(CounterEvent::Increment)?;
/// # Ok(())
/// # }
/// ```
pub struct ControllerBuilder<C: Contract> {
    name: String,
    params: C::Params,
    initial: C::State,
    context: AppContext,
    handlers: Vec<HandlerSpec<C>>,
}

impl<C: Contract> ControllerBuilder<C> {
    pub(super) fn new(
        name: String,
        params: C::Params,
        initial: C::State,
        context: AppContext,
    ) -> Self {
        Self {
            name,
            params,
            initial,
            context,
            handlers: Vec::new(),
        }
    }

    /// Attach a handler serving the events `filter` accepts.
    pub fn on<F, H, Fut>(mut self, name: impl Into<String>, filter: F, handler: H) -> Self
    where
        F: Fn(&C::Event) -> bool + Send + Sync + 'static,
        H: Fn(Scope<C>, C::Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CoreError>> + Send + 'static,
    {
        self.handlers.push(HandlerSpec {
            name: Arc::from(name.into()),
            filter: Arc::new(filter),
            run: Arc::new(move |scope: Scope<C>, event: C::Event| handler(scope, event).boxed()),
        });
        self
    }

    /// Attach a handler serving every event.
    pub fn on_any<H, Fut>(self, name: impl Into<String>, handler: H) -> Self
    where
        H: Fn(Scope<C>, C::Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CoreError>> + Send + 'static,
    {
        self.on(name, |_| true, handler)
    }

    /// Spawn the dispatcher and handler tasks on the current tokio runtime.
    pub fn build(self) -> Result<Controller<C>, CoreError> {
        let runtime = Handle::try_current().map_err(|_| {
            CoreError::Internal("controllers must be built inside a tokio runtime".into())
        })?;
        let config = self.context.config().clone();
        let (intake, intake_rx) = EventIntake::new(config.event_capacity, runtime.clone());
        let cancel = CancellationToken::new();

        let inner = Arc::new(ControllerInner {
            name: Arc::from(self.name),
            params: self.params,
            store: StateStore::new(self.initial, config.state_history_capacity),
            intake,
            navigation: OutputLane::new(Channel::Navigation, config.navigation_capacity),
            effects: OutputLane::new(Channel::Effect, config.effect_capacity),
            context: self.context,
            cancel: cancel.clone(),
            task_handles: Mutex::new(Vec::new()),
            cleanups: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        });

        let mut handles = Vec::with_capacity(self.handlers.len() + 1);
        let mut routes = Vec::with_capacity(self.handlers.len());
        for spec in self.handlers {
            let (lane, lane_rx) = mpsc::unbounded_channel();
            routes.push(Route {
                name: Arc::clone(&spec.name),
                filter: spec.filter,
                lane,
            });
            handles.push(runtime.spawn(handler::serve(
                Scope::new(Arc::clone(&inner)),
                spec.name,
                spec.run,
                lane_rx,
                cancel.clone(),
            )));
        }
        let handler_count = routes.len();
        handles.push(runtime.spawn(handler::dispatch::<C>(
            Arc::clone(&inner.name),
            intake_rx,
            routes,
            cancel,
        )));
        inner.task_handles.lock().extend(handles);

        info!(controller = %inner.name, handlers = handler_count, "controller started");
        Ok(Controller { inner })
    }
}
