//! Screen router.
//!
//! Owns the back stack. Each screen's navigation stream is mapped into a
//! [`Route`] and funneled into one queue, so transitions are applied one at
//! a time. The router is also the single owner responsible for disposing
//! every controller it created.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mvikit_core::{AppContext, Contract, Controller, CoreError, ListenerToken};

use crate::host::ConsoleHost;
use crate::screens::home::HomeNavigation;
use crate::screens::login::LoginNavigation;
use crate::screens::profile::ProfileNavigation;
use crate::screens::{ActiveScreen, home, login, profile};
use crate::service::{RepositoryService, Session};

const ROUTE_CAPACITY: usize = 16;

/// A transition requested by the screen on top of the stack.
#[derive(Debug)]
pub enum Route {
    LoggedIn(Session),
    OpenProfile {
        username: String,
        listener: ListenerToken,
    },
    Back,
}

impl From<LoginNavigation> for Route {
    fn from(nav: LoginNavigation) -> Self {
        match nav {
            LoginNavigation::LoggedIn { session } => Self::LoggedIn(session),
        }
    }
}

impl From<HomeNavigation> for Route {
    fn from(nav: HomeNavigation) -> Self {
        match nav {
            HomeNavigation::OpenProfile { username, listener } => {
                Self::OpenProfile { username, listener }
            }
        }
    }
}

impl From<ProfileNavigation> for Route {
    fn from(nav: ProfileNavigation) -> Self {
        match nav {
            ProfileNavigation::Back => Self::Back,
        }
    }
}

pub struct Router {
    context: AppContext,
    service: Arc<dyn RepositoryService>,
    host: Arc<ConsoleHost>,
    stack: Vec<ActiveScreen>,
    routes_tx: mpsc::Sender<Route>,
    routes_rx: mpsc::Receiver<Route>,
    active: watch::Sender<Option<ActiveScreen>>,
    forwarders: Vec<JoinHandle<()>>,
}

impl Router {
    pub fn new(
        context: AppContext,
        service: Arc<dyn RepositoryService>,
        host: Arc<ConsoleHost>,
    ) -> Self {
        let (routes_tx, routes_rx) = mpsc::channel(ROUTE_CAPACITY);
        let (active, _) = watch::channel(None);
        Self {
            context,
            service,
            host,
            stack: Vec::new(),
            routes_tx,
            routes_rx,
            active,
            forwarders: Vec::new(),
        }
    }

    /// The screen on top of the stack; `None` before start and after shutdown.
    pub fn active(&self) -> watch::Receiver<Option<ActiveScreen>> {
        self.active.subscribe()
    }

    /// Show the login screen, apply routes until `cancel`, then dispose
    /// every screen still on the stack.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), CoreError> {
        let result = self.drive(&cancel).await;
        self.teardown().await;
        result
    }

    async fn drive(&mut self, cancel: &CancellationToken) -> Result<(), CoreError> {
        let login = login::build(self.context.clone(), Arc::clone(&self.service))?;
        let login = ActiveScreen::Login(self.attach(login)?);
        self.push(login);

        loop {
            let route = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(()),
                route = self.routes_rx.recv() => route,
            };
            // The router holds a sender, so the queue never closes under it.
            let Some(route) = route else {
                return Ok(());
            };
            self.apply(route).await?;
        }
    }

    async fn apply(&mut self, route: Route) -> Result<(), CoreError> {
        debug!(?route, depth = self.stack.len(), "applying route");
        match route {
            Route::LoggedIn(session) => {
                info!(user = %session.username, "entering home");
                let home = home::build(self.context.clone(), Arc::clone(&self.service), session)?;
                let home = ActiveScreen::Home(self.attach(home)?);
                // Login is not kept on the back stack.
                if let Some(login) = self.stack.pop() {
                    login.dispose().await;
                }
                self.push(home);
            }
            Route::OpenProfile { username, listener } => {
                let profile = profile::build(
                    self.context.clone(),
                    Arc::clone(&self.service),
                    username,
                    listener,
                )?;
                let profile = ActiveScreen::Profile(self.attach(profile)?);
                self.push(profile);
            }
            Route::Back => {
                if self.stack.len() < 2 {
                    warn!("back requested on the root screen; ignored");
                    return Ok(());
                }
                if let Some(top) = self.stack.pop() {
                    top.dispose().await;
                }
                self.publish();
            }
        }
        Ok(())
    }

    fn push(&mut self, screen: ActiveScreen) {
        self.stack.push(screen);
        self.publish();
    }

    fn publish(&self) {
        let top = self.stack.last().cloned();
        if let Some(screen) = &top {
            self.host.record_screen(screen.name());
        }
        self.active.send_replace(top);
    }

    async fn teardown(&mut self) {
        self.active.send_replace(None);
        self.routes_rx.close();
        while let Some(screen) = self.stack.pop() {
            screen.dispose().await;
        }
        // Disposed controllers close their streams, which ends every forwarder.
        for forwarder in self.forwarders.drain(..) {
            if let Err(err) = forwarder.await {
                warn!(error = %err, "output forwarder failed");
            }
        }
        info!("router stopped");
    }

    /// Wire a new controller's outputs to the host and the route queue.
    ///
    /// The forwarding tasks end on their own once the controller is disposed
    /// and its streams close.
    fn attach<C>(&mut self, controller: Controller<C>) -> Result<Controller<C>, CoreError>
    where
        C: Contract,
        C::State: Serialize,
        C::Navigation: Into<Route>,
    {
        let name: Arc<str> = Arc::from(controller.name());

        let mut navigation = controller.observe_navigation()?;
        let routes = self.routes_tx.clone();
        let host = Arc::clone(&self.host);
        let screen = Arc::clone(&name);
        let nav_task = tokio::spawn(async move {
            while let Some(nav) = navigation.recv().await {
                host.record_navigation(&screen, &nav);
                if routes.send(nav.into()).await.is_err() {
                    break;
                }
            }
        });

        let mut effects = controller.observe_effects()?;
        let host = Arc::clone(&self.host);
        let screen = Arc::clone(&name);
        let effect_task = tokio::spawn(async move {
            while let Some(effect) = effects.recv().await {
                host.record_effect(&screen, &effect);
            }
        });

        let mut states = controller.observe_state();
        let host = Arc::clone(&self.host);
        let state_task = tokio::spawn(async move {
            while let Some(state) = states.next().await {
                host.record_state(&name, &*state);
            }
        });

        self.forwarders.extend([nav_task, effect_task, state_task]);
        Ok(controller)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stack: Vec<&str> = self.stack.iter().map(ActiveScreen::name).collect();
        f.debug_struct("Router").field("stack", &stack).finish_non_exhaustive()
    }
}
