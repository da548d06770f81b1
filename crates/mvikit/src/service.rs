//! Repository service boundary and its in-memory mock.
//!
//! Controllers only see the `RepositoryService` trait; failures are opaque
//! to them and either recovered locally or propagated to the failure hook.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use mvikit_core::CoreError;

// ── Domain ───────────────────────────────────────────────────────────

/// An authenticated user session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub username: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub name: String,
    pub description: String,
    pub language: String,
    pub stars: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub username: String,
    pub display_name: String,
    pub bio: String,
}

// ── Error ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid credentials for '{username}'")]
    Unauthorized { username: String },

    #[error("{operation} is temporarily unavailable")]
    Unavailable { operation: &'static str },

    #[error("no profile for '{username}'")]
    ProfileNotFound { username: String },
}

impl From<ServiceError> for CoreError {
    fn from(err: ServiceError) -> Self {
        Self::service(err.to_string())
    }
}

// ── Service trait ────────────────────────────────────────────────────

/// Remote repository host, as seen by the screens.
pub trait RepositoryService: Send + Sync {
    fn login<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Session, ServiceError>>;

    fn repositories<'a>(
        &'a self,
        session: &'a Session,
    ) -> BoxFuture<'a, Result<Vec<Repository>, ServiceError>>;

    fn profile<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<Profile, ServiceError>>;

    fn update_profile<'a>(
        &'a self,
        username: &'a str,
        display_name: &'a str,
    ) -> BoxFuture<'a, Result<Profile, ServiceError>>;
}

// ── Mock ─────────────────────────────────────────────────────────────

/// Knobs for [`MockRepositoryService`].
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    pub latency: Duration,
    pub fail_fetch: bool,
    pub fail_profile: bool,
}

/// In-memory service with simulated latency and failure injection.
pub struct MockRepositoryService {
    behavior: MockBehavior,
    profiles: Mutex<HashMap<String, Profile>>,
}

impl MockRepositoryService {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            profiles: Mutex::new(HashMap::new()),
        }
    }

    pub fn shared(behavior: MockBehavior) -> Arc<dyn RepositoryService> {
        Arc::new(Self::new(behavior))
    }

    async fn latency(&self, operation: &'static str) {
        debug!(operation, latency_ms = self.behavior.latency.as_millis(), "mock call");
        if !self.behavior.latency.is_zero() {
            tokio::time::sleep(self.behavior.latency).await;
        }
    }

    fn seed_profile(username: &str) -> Profile {
        Profile {
            username: username.to_owned(),
            display_name: username.to_owned(),
            bio: format!("{username} builds things."),
        }
    }
}

impl RepositoryService for MockRepositoryService {
    fn login<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Session, ServiceError>> {
        async move {
            self.latency("login").await;
            if username.trim().is_empty() || password.is_empty() {
                return Err(ServiceError::Unauthorized {
                    username: username.to_owned(),
                });
            }
            Ok(Session {
                username: username.to_owned(),
                token: format!("mock-{}-{}", username, password.len()),
            })
        }
        .boxed()
    }

    fn repositories<'a>(
        &'a self,
        session: &'a Session,
    ) -> BoxFuture<'a, Result<Vec<Repository>, ServiceError>> {
        async move {
            self.latency("repositories").await;
            if self.behavior.fail_fetch {
                return Err(ServiceError::Unavailable {
                    operation: "repository listing",
                });
            }
            let owner = &session.username;
            Ok(vec![
                Repository {
                    name: format!("{owner}/hello-world"),
                    description: "My first repository".into(),
                    language: "Rust".into(),
                    stars: 42,
                },
                Repository {
                    name: format!("{owner}/dotfiles"),
                    description: "Shell and editor setup".into(),
                    language: "Shell".into(),
                    stars: 7,
                },
                Repository {
                    name: format!("{owner}/notes"),
                    description: "Scratchpad".into(),
                    language: "Markdown".into(),
                    stars: 0,
                },
            ])
        }
        .boxed()
    }

    fn profile<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<Profile, ServiceError>> {
        async move {
            self.latency("profile").await;
            if self.behavior.fail_profile {
                return Err(ServiceError::ProfileNotFound {
                    username: username.to_owned(),
                });
            }
            let mut profiles = self.profiles.lock().await;
            Ok(profiles
                .entry(username.to_owned())
                .or_insert_with(|| Self::seed_profile(username))
                .clone())
        }
        .boxed()
    }

    fn update_profile<'a>(
        &'a self,
        username: &'a str,
        display_name: &'a str,
    ) -> BoxFuture<'a, Result<Profile, ServiceError>> {
        async move {
            self.latency("update_profile").await;
            let mut profiles = self.profiles.lock().await;
            let profile = profiles
                .entry(username.to_owned())
                .or_insert_with(|| Self::seed_profile(username));
            display_name.clone_into(&mut profile.display_name);
            Ok(profile.clone())
        }
        .boxed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_password_is_unauthorized() {
        let service = MockRepositoryService::new(MockBehavior::default());
        let err = service.login("octocat", "").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn renames_persist_across_reads() {
        let service = MockRepositoryService::new(MockBehavior::default());
        service.update_profile("octocat", "The Octocat").await.unwrap();
        let profile = service.profile("octocat").await.unwrap();
        assert_eq!(profile.display_name, "The Octocat");
    }

    #[tokio::test]
    async fn injected_fetch_failure_converts_to_service_error() {
        let service = MockRepositoryService::new(MockBehavior {
            fail_fetch: true,
            ..MockBehavior::default()
        });
        let session = service.login("octocat", "pw").await.unwrap();
        let err: CoreError = service.repositories(&session).await.unwrap_err().into();
        assert!(matches!(err, CoreError::Service { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_simulated() {
        let service = MockRepositoryService::new(MockBehavior {
            latency: Duration::from_secs(2),
            ..MockBehavior::default()
        });
        let started = tokio::time::Instant::now();
        service.profile("octocat").await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
