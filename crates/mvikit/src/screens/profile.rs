//! Profile screen: view and rename the signed-in user.
//!
//! The caller hands over a [`ProfileListener`] token; renames are reported
//! back through it without this screen knowing who is listening.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use mvikit_core::{
    AppContext, Contract, Controller, CoreError, ListenerToken, NotificationRequest, Scope,
};

use crate::service::{Profile as UserProfile, RepositoryService};

/// Capability a caller registers to hear about profile changes.
pub trait ProfileListener: Send + Sync {
    fn profile_renamed(&self, display_name: &str);
}

pub enum Profile {}

pub struct ProfileParams {
    pub username: String,
    pub listener: ListenerToken,
    pub service: Arc<dyn RepositoryService>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileState {
    pub loading: bool,
    pub saving: bool,
    pub profile: Option<UserProfile>,
    /// Display name of the last successful save.
    pub saved: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ProfileEvent {
    Load,
    Rename { display_name: String },
    Back,
}

#[derive(Debug)]
pub enum ProfileNavigation {
    Back,
}

#[derive(Debug)]
pub enum ProfileEffect {
    Saved,
}

impl Contract for Profile {
    type Params = ProfileParams;
    type State = ProfileState;
    type Event = ProfileEvent;
    type Navigation = ProfileNavigation;
    type Effect = ProfileEffect;
}

pub fn build(
    context: AppContext,
    service: Arc<dyn RepositoryService>,
    username: String,
    listener: ListenerToken,
) -> Result<Controller<Profile>, CoreError> {
    let params = ProfileParams {
        username,
        listener,
        service,
    };
    Controller::builder("profile", params, ProfileState::default(), context)
        .on("load", |e| matches!(e, ProfileEvent::Load), |scope, _| load(scope))
        .on(
            "rename",
            |e| matches!(e, ProfileEvent::Rename { .. }),
            |scope, event| async move {
                let ProfileEvent::Rename { display_name } = event else {
                    return Ok(());
                };
                rename(scope, display_name).await
            },
        )
        .on("back", |e| matches!(e, ProfileEvent::Back), |scope, _| async move {
            scope.navigate(ProfileNavigation::Back).await
        })
        .build()
}

// Failures here are not handled locally; they surface as the generic popup.
async fn load(scope: Scope<Profile>) -> Result<(), CoreError> {
    scope.update_state(|s| ProfileState {
        loading: true,
        ..s.clone()
    })?;

    let params = scope.params();
    let result = params.service.profile(&params.username).await;
    scope.update_state(|s| ProfileState {
        loading: false,
        ..s.clone()
    })?;

    let profile = result?;
    scope.update_state(|s| ProfileState {
        profile: Some(profile),
        ..s.clone()
    })?;
    Ok(())
}

async fn rename(scope: Scope<Profile>, display_name: String) -> Result<(), CoreError> {
    scope.update_state(|s| ProfileState {
        saving: true,
        ..s.clone()
    })?;

    let params = scope.params();
    let result = params
        .service
        .update_profile(&params.username, &display_name)
        .await;
    scope.update_state(|s| ProfileState {
        saving: false,
        ..s.clone()
    })?;
    let profile = result?;

    let listener = scope.resolve_listener::<dyn ProfileListener>(&params.listener)?;
    listener.profile_renamed(&profile.display_name);
    info!(user = %profile.username, display_name = %profile.display_name, "profile renamed");

    scope.update_state(|s| ProfileState {
        saved: Some(profile.display_name.clone()),
        profile: Some(profile),
        ..s.clone()
    })?;
    scope.send_effect(ProfileEffect::Saved).await?;
    scope.notify(NotificationRequest::success("Profile updated"));
    Ok(())
}
