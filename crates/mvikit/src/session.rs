//! Scripted user session.
//!
//! Plays the part of a person tapping through the UI: signs in, loads the
//! repository list, opens the profile, optionally renames it, and goes
//! back. Every wait is bounded so a stuck controller shows up as a
//! timeout rather than a hang.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use mvikit_core::{AppContext, Contract, Controller, GENERIC_ERROR_KEY, Popup};

use crate::error::CliError;
use crate::screens::ActiveScreen;
use crate::screens::home::HomeEvent;
use crate::screens::login::LoginEvent;
use crate::screens::profile::{Profile, ProfileEvent};

/// What the scripted user does.
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub username: String,
    pub password: String,
    pub rename: Option<String>,
    /// Upper bound for each step.
    pub step_timeout: Duration,
}

/// Outcome of a completed session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub user: String,
    pub repositories: usize,
    pub fetch_failed: bool,
    pub profile_failed: bool,
    pub renamed_to: Option<String>,
}

impl SessionSummary {
    pub fn text_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("signed in as {}", self.user),
            format!("repositories: {}", self.repositories),
        ];
        if self.fetch_failed {
            lines.push("repository fetch failed (recovered on screen)".into());
        }
        if self.profile_failed {
            lines.push("profile failed to load (generic error shown)".into());
        }
        if let Some(name) = &self.renamed_to {
            lines.push(format!("renamed to {name}"));
        }
        lines
    }
}

/// Run the script against the router's active screen. `popups` is what the
/// host has drawn; the user only reacts to a popup once it is visible.
pub async fn drive(
    context: &AppContext,
    mut active: watch::Receiver<Option<ActiveScreen>>,
    mut popups: watch::Receiver<Option<Arc<Popup>>>,
    plan: &SessionPlan,
) -> Result<SessionSummary, CliError> {
    let limit = plan.step_timeout;
    let mut summary = SessionSummary {
        user: plan.username.clone(),
        ..SessionSummary::default()
    };

    // ── Sign in ──────────────────────────────────────────────────────

    let login = bounded("login", limit, screen(&mut active, "login", |s| s.as_login().cloned())).await?;
    login.emit_event(LoginEvent::Submit {
        username: plan.username.clone(),
        password: plan.password.clone(),
    })?;
    let state = bounded(
        "login",
        limit,
        state_matching(&login, "login", |s| s.signed_in || s.error.is_some()),
    )
    .await?;
    if let Some(reason) = &state.error {
        return Err(CliError::LoginRejected {
            reason: reason.clone(),
        });
    }

    // ── Home ─────────────────────────────────────────────────────────

    let home = bounded("home", limit, screen(&mut active, "home", |s| s.as_home().cloned())).await?;
    home.emit_event(HomeEvent::Load)?;
    let state = bounded(
        "home",
        limit,
        state_matching(&home, "home", |s| s.fetches >= 1 && !s.loading),
    )
    .await?;
    summary.repositories = state.repositories.len();
    summary.fetch_failed = state.last_error.is_some();
    info!(repositories = summary.repositories, failed = summary.fetch_failed, "home loaded");

    // ── Profile ──────────────────────────────────────────────────────

    home.emit_event(HomeEvent::OpenProfile)?;
    let profile = bounded(
        "profile",
        limit,
        screen(&mut active, "profile", |s| s.as_profile().cloned()),
    )
    .await?;

    profile.emit_event(ProfileEvent::Load)?;
    let loaded = bounded("profile", limit, async {
        tokio::select! {
            state = state_matching(&profile, "profile", |s| s.profile.is_some()) => state.map(|_| true),
            () = generic_error(&mut popups) => Ok(false),
        }
    })
    .await?;

    if loaded {
        if let Some(name) = &plan.rename {
            rename(&profile, name, limit).await?;
            summary.renamed_to = Some(name.clone());
        }
    } else {
        summary.profile_failed = true;
        debug!("profile failed; dismissing generic error");
        context.broker().popups().dismiss_by_key(GENERIC_ERROR_KEY);
    }

    // ── Back home ────────────────────────────────────────────────────

    profile.emit_event(ProfileEvent::Back)?;
    let home = bounded("back", limit, screen(&mut active, "back", |s| s.as_home().cloned())).await?;

    if let Some(name) = &summary.renamed_to {
        bounded(
            "back",
            limit,
            state_matching(&home, "back", |s| &s.display_name == name),
        )
        .await?;
    }

    Ok(summary)
}

async fn rename(profile: &Controller<Profile>, name: &str, limit: Duration) -> Result<(), CliError> {
    profile.emit_event(ProfileEvent::Rename {
        display_name: name.to_owned(),
    })?;
    bounded(
        "rename",
        limit,
        state_matching(profile, "rename", |s| {
            !s.saving && s.saved.as_deref() == Some(name)
        }),
    )
    .await?;
    Ok(())
}

// ── Waiting helpers ──────────────────────────────────────────────────

async fn bounded<T>(
    step: &'static str,
    limit: Duration,
    work: impl Future<Output = Result<T, CliError>>,
) -> Result<T, CliError> {
    tokio::time::timeout(limit, work)
        .await
        .map_err(|_| CliError::SessionTimeout { step })?
}

/// Wait until the top of the stack is the screen `pick` accepts.
async fn screen<T>(
    active: &mut watch::Receiver<Option<ActiveScreen>>,
    step: &'static str,
    pick: impl Fn(&ActiveScreen) -> Option<T>,
) -> Result<T, CliError> {
    let top = active
        .wait_for(|top| top.as_ref().and_then(&pick).is_some())
        .await
        .map_err(|_| CliError::SessionAborted { step })?;
    let found = Option::as_ref(&top).and_then(&pick);
    found.ok_or(CliError::SessionAborted { step })
}

/// Wait for a state of `controller` satisfying `accept`.
async fn state_matching<C: Contract>(
    controller: &Controller<C>,
    step: &'static str,
    accept: impl Fn(&C::State) -> bool,
) -> Result<Arc<C::State>, CliError> {
    let mut states = controller.observe_state();
    while let Some(state) = states.next().await {
        if accept(&state) {
            return Ok(state);
        }
    }
    Err(CliError::SessionAborted { step })
}

/// Resolves once the generic error popup is on screen; never if the
/// popup stack goes away.
async fn generic_error(popups: &mut watch::Receiver<Option<Arc<Popup>>>) {
    let shown = popups
        .wait_for(|p| {
            p.as_ref()
                .is_some_and(|p| p.key.as_deref() == Some(GENERIC_ERROR_KEY))
        })
        .await
        .is_ok();
    if !shown {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_lines_mention_failures_and_rename() {
        let summary = SessionSummary {
            user: "octocat".into(),
            repositories: 3,
            fetch_failed: true,
            profile_failed: false,
            renamed_to: Some("Mona".into()),
        };
        let lines = summary.text_lines();
        assert_eq!(lines[0], "signed in as octocat");
        assert!(lines.iter().any(|l| l.contains("fetch failed")));
        assert_eq!(lines.last().map(String::as_str), Some("renamed to Mona"));
    }
}
