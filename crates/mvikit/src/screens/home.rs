//! Home screen: the signed-in user's repositories.

use std::sync::{Arc, OnceLock};

use serde::Serialize;
use tracing::{debug, warn};

use mvikit_core::{
    AppContext, Contract, Controller, CoreError, ListenerToken, NotificationRequest, Scope,
};

use super::profile::ProfileListener;
use crate::service::{Repository, RepositoryService, Session};

pub enum Home {}

pub struct HomeParams {
    pub session: Session,
    pub service: Arc<dyn RepositoryService>,
    /// Rename listener registered once at build and handed to every
    /// profile screen this home opens.
    pub profile_listener: OnceLock<ListenerToken>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HomeState {
    pub display_name: String,
    pub loading: bool,
    pub repositories: Vec<Repository>,
    pub last_error: Option<String>,
    /// Completed fetch attempts, successful or not.
    pub fetches: u32,
}

#[derive(Debug, Clone)]
pub enum HomeEvent {
    Load,
    OpenProfile,
    /// Delivered by the profile screen through the listener registry.
    ProfileRenamed { display_name: String },
}

#[derive(Debug)]
pub enum HomeNavigation {
    OpenProfile {
        username: String,
        listener: ListenerToken,
    },
}

#[derive(Debug)]
pub enum HomeEffect {
    ScrollToTop,
}

impl Contract for Home {
    type Params = HomeParams;
    type State = HomeState;
    type Event = HomeEvent;
    type Navigation = HomeNavigation;
    type Effect = HomeEffect;
}

pub fn build(
    context: AppContext,
    service: Arc<dyn RepositoryService>,
    session: Session,
) -> Result<Controller<Home>, CoreError> {
    let initial = HomeState {
        display_name: session.username.clone(),
        ..HomeState::default()
    };
    let params = HomeParams {
        session,
        service,
        profile_listener: OnceLock::new(),
    };
    let home = Controller::<Home>::builder("home", params, initial, context)
        .on("load", |e| matches!(e, HomeEvent::Load), |scope, _| load(scope))
        .on(
            "open-profile",
            |e| matches!(e, HomeEvent::OpenProfile),
            |scope, _| open_profile(scope),
        )
        .on(
            "profile-renamed",
            |e| matches!(e, HomeEvent::ProfileRenamed { .. }),
            |scope, event| async move {
                if let HomeEvent::ProfileRenamed { display_name } = event {
                    scope.update_state(|s| HomeState {
                        display_name,
                        ..s.clone()
                    })?;
                }
                Ok(())
            },
        )
        .build()?;

    let listener: Arc<dyn ProfileListener> = Arc::new(RenameForwarder { home: home.clone() });
    let token = home.register_listener(listener)?;
    let _ = home.params().profile_listener.set(token);
    Ok(home)
}

async fn load(scope: Scope<Home>) -> Result<(), CoreError> {
    scope.update_state(|s| HomeState {
        loading: true,
        ..s.clone()
    })?;

    let params = scope.params();
    match params.service.repositories(&params.session).await {
        Ok(repositories) => {
            debug!(count = repositories.len(), "repositories loaded");
            scope.update_state(|s| HomeState {
                loading: false,
                repositories,
                last_error: None,
                fetches: s.fetches + 1,
                ..s.clone()
            })?;
            scope.send_effect(HomeEffect::ScrollToTop).await
        }
        // Keep whatever list is on screen and let the user retry.
        Err(err) => {
            warn!(error = %err, "repository fetch failed");
            scope.notify(NotificationRequest::error("Couldn't load repositories"));
            scope.update_state(|s| HomeState {
                loading: false,
                last_error: Some(err.to_string()),
                fetches: s.fetches + 1,
                ..s.clone()
            })?;
            Ok(())
        }
    }
}

async fn open_profile(scope: Scope<Home>) -> Result<(), CoreError> {
    let params = scope.params();
    let listener = params
        .profile_listener
        .get()
        .cloned()
        .ok_or_else(|| CoreError::Internal("home has no profile listener".into()))?;
    scope
        .navigate(HomeNavigation::OpenProfile {
            username: params.session.username.clone(),
            listener,
        })
        .await
}

/// Feeds profile renames back into the home controller. Unregistered when
/// home is disposed.
struct RenameForwarder {
    home: Controller<Home>,
}

impl ProfileListener for RenameForwarder {
    fn profile_renamed(&self, display_name: &str) {
        let event = HomeEvent::ProfileRenamed {
            display_name: display_name.to_owned(),
        };
        if let Err(err) = self.home.emit_event(event) {
            debug!(error = %err, "home screen gone; rename not forwarded");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use crate::service::{MockBehavior, MockRepositoryService};

    use super::*;

    #[tokio::test]
    async fn every_profile_visit_shares_one_listener() {
        let context = AppContext::default();
        let service = MockRepositoryService::shared(MockBehavior::default());
        let session = service.login("octocat", "pw").await.unwrap();
        let home = build(context.clone(), service, session).unwrap();
        let mut navigation = home.observe_navigation().unwrap();

        let mut tokens = Vec::new();
        for _ in 0..3 {
            home.emit_event(HomeEvent::OpenProfile).unwrap();
            let next = tokio::time::timeout(Duration::from_secs(5), navigation.recv())
                .await
                .unwrap();
            let Some(HomeNavigation::OpenProfile { listener, .. }) = next else {
                panic!("expected profile navigation, got {next:?}");
            };
            tokens.push(listener);
        }

        assert!(tokens.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(context.registry().len(), 1);

        home.dispose().await;
        assert_eq!(context.registry().len(), 0);
    }
}
