// ── Handler scope ──
//
// What a handler body can touch: the controller's state and outputs, the
// shared listener registry, and the notification broker.

use std::sync::Arc;

use crate::broker::{NotificationId, NotificationRequest, PopupSpec, ShowOutcome};
use crate::context::AppContext;
use crate::error::CoreError;
use crate::registry::ListenerToken;

use super::{Contract, ControllerInner};

/// Handle given to each handler invocation.
pub struct Scope<C: Contract> {
    pub(super) inner: Arc<ControllerInner<C>>,
}

impl<C: Contract> Clone for Scope<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Contract> Scope<C> {
    pub(super) fn new(inner: Arc<ControllerInner<C>>) -> Self {
        Self { inner }
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

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    // ── State ────────────────────────────────────────────────────────

    pub fn state(&self) -> Arc<C::State> {
        self.inner.store.get()
    }

    /// Atomic read-modify-write of the screen state.
    ///
    /// Keep `transform` pure and quick: it runs while other updates wait.
    pub fn update_state(
        &self,
        transform: impl FnOnce(&C::State) -> C::State,
    ) -> Result<Arc<C::State>, CoreError> {
        self.inner.store.update(transform)
    }

    pub fn set_state(&self, state: C::State) -> Result<Arc<C::State>, CoreError> {
        self.inner.store.update(move |_| state)
    }

    // ── Outputs ──────────────────────────────────────────────────────

    /// Ask the router for a transition. Suspends while the buffer is full.
    pub async fn navigate(&self, navigation: C::Navigation) -> Result<(), CoreError> {
        self.inner.navigation.send(navigation).await
    }

    /// Emit a one-shot effect. Suspends while the buffer is full.
    pub async fn send_effect(&self, effect: C::Effect) -> Result<(), CoreError> {
        self.inner.effects.send(effect).await
    }

    /// Feed another event back into this controller.
    pub fn emit_event(&self, event: C::Event) -> Result<(), CoreError> {
        self.inner.emit_event(event)
    }

    // ── Broker ───────────────────────────────────────────────────────

    /// Scoped transient message, e.g. after a locally recovered failure.
    pub fn notify(&self, request: impl Into<NotificationRequest>) -> NotificationId {
        self.inner.context.broker().notify(request)
    }

    pub fn show_popup(&self, spec: PopupSpec) -> ShowOutcome {
        self.inner.context.broker().show_popup(spec)
    }

    // ── Listeners ────────────────────────────────────────────────────

    /// Register a callback for another screen. Unregistered on disposal.
    pub fn register_listener<T>(&self, listener: Arc<T>) -> Result<ListenerToken, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.inner.register_listener(listener)
    }

    /// Resolve a callback registered by another screen.
    pub fn resolve_listener<T>(&self, token: &ListenerToken) -> Result<Arc<T>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.inner.context.registry().resolve(token)
    }
}
