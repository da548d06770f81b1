//! Login screen: credential entry and sign-in.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use mvikit_core::{
    AppContext, Contract, Controller, CoreError, NotificationLevel, NotificationRequest, Scope,
};

use crate::service::{RepositoryService, Session};

pub enum Login {}

pub struct LoginParams {
    pub service: Arc<dyn RepositoryService>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginState {
    pub username: String,
    pub submitting: bool,
    pub signed_in: bool,
    /// Last rejection, cleared on the next submit.
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum LoginEvent {
    UsernameChanged { username: String },
    Submit { username: String, password: String },
}

#[derive(Debug)]
pub enum LoginNavigation {
    LoggedIn { session: Session },
}

#[derive(Debug)]
pub enum LoginEffect {
    ClearPassword,
}

impl Contract for Login {
    type Params = LoginParams;
    type State = LoginState;
    type Event = LoginEvent;
    type Navigation = LoginNavigation;
    type Effect = LoginEffect;
}

pub fn build(
    context: AppContext,
    service: Arc<dyn RepositoryService>,
) -> Result<Controller<Login>, CoreError> {
    Controller::builder("login", LoginParams { service }, LoginState::default(), context)
        .on(
            "username",
            |e| matches!(e, LoginEvent::UsernameChanged { .. }),
            |scope, event| async move {
                if let LoginEvent::UsernameChanged { username } = event {
                    scope.update_state(|s: &LoginState| LoginState {
                        username,
                        error: None,
                        ..s.clone()
                    })?;
                }
                Ok(())
            },
        )
        .on(
            "submit",
            |e| matches!(e, LoginEvent::Submit { .. }),
            |scope, event| async move {
                let LoginEvent::Submit { username, password } = event else {
                    return Ok(());
                };
                submit(&scope, username, &password).await
            },
        )
        .build()
}

async fn submit(scope: &Scope<Login>, username: String, password: &str) -> Result<(), CoreError> {
    if username.trim().is_empty() || password.is_empty() {
        scope.update_state(|s| LoginState {
            username: username.clone(),
            error: Some("Username and password are required".into()),
            ..s.clone()
        })?;
        scope.notify(
            NotificationRequest::message("Enter a username and password")
                .level(NotificationLevel::Warning),
        );
        return Ok(());
    }

    scope.update_state(|s| LoginState {
        username: username.clone(),
        submitting: true,
        error: None,
        ..s.clone()
    })?;

    let result = scope.params().service.login(&username, password).await;
    scope.send_effect(LoginEffect::ClearPassword).await?;

    match result {
        Ok(session) => {
            info!(user = %session.username, "signed in");
            scope.update_state(|s| LoginState {
                submitting: false,
                signed_in: true,
                ..s.clone()
            })?;
            scope.navigate(LoginNavigation::LoggedIn { session }).await
        }
        // Rejections are expected; keep the user on this screen.
        Err(err) => {
            warn!(error = %err, "sign-in rejected");
            scope.update_state(|s| LoginState {
                submitting: false,
                error: Some(err.to_string()),
                ..s.clone()
            })?;
            scope.notify(NotificationRequest::error("Sign-in failed"));
            Ok(())
        }
    }
}
