// ── Listener registry ──
//
// Process-wide directory of callback objects keyed by opaque tokens.
// Lets one screen invoke a capability implemented by another without
// either importing the other: the token travels through navigation
// parameters, the callee resolves it back into a typed handle.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::CoreError;

/// Opaque handle to a registered listener.
///
/// Plain string underneath so it survives serialization into navigation
/// parameters. Never reused within one registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerToken(String);

impl ListenerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListenerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ListenerToken {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for ListenerToken {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

struct Entry {
    type_name: &'static str,
    /// Always an `Arc<T>` for the `T` named by `type_name`.
    listener: Box<dyn Any + Send + Sync>,
}

struct RegistryInner {
    entries: DashMap<String, Entry>,
    next_token: AtomicU64,
}

/// Token → listener directory.
///
/// Cheaply cloneable; clones share the same entries. Entries never expire:
/// whoever registers a token owns its unregistration (controllers bind it
/// to disposal).
#[derive(Clone)]
pub struct ListenerRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                entries: DashMap::new(),
                next_token: AtomicU64::new(1),
            }),
        }
    }

    /// Store `listener` under a fresh token.
    ///
    /// `T` may be unsized, so trait objects register as `Arc<dyn Trait>` and
    /// must be resolved with the same `dyn Trait`.
    pub fn register<T>(&self, listener: Arc<T>) -> ListenerToken
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let n = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let token = ListenerToken(format!("listener-{n}"));
        self.inner.entries.insert(
            token.0.clone(),
            Entry {
                type_name: type_name::<T>(),
                listener: Box::new(listener),
            },
        );
        debug!(%token, listener = type_name::<T>(), "listener registered");
        token
    }

    /// Resolve `token` into the capability `T` it was registered as.
    ///
    /// A miss means a registration/cleanup ordering bug in the caller, and a
    /// type mismatch means the token was handed to the wrong screen. Both are
    /// reported as errors rather than defaults.
    pub fn resolve<T>(&self, token: &ListenerToken) -> Result<Arc<T>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let entry =
            self.inner
                .entries
                .get(token.as_str())
                .ok_or_else(|| CoreError::ListenerNotFound {
                    token: token.0.clone(),
                })?;

        let stored: &(dyn Any + Send + Sync) = &*entry.listener;
        stored.downcast_ref::<Arc<T>>().cloned().ok_or_else(|| {
            error!(
                %token,
                expected = type_name::<T>(),
                found = entry.type_name,
                "listener resolved as the wrong type"
            );
            CoreError::ListenerTypeMismatch {
                token: token.0.clone(),
                expected: type_name::<T>(),
                found: entry.type_name,
            }
        })
    }

    /// Advisory lookup: `None` instead of an error.
    pub fn try_resolve<T>(&self, token: &ListenerToken) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.resolve(token).ok()
    }

    /// Remove the mapping. Returns `true` if something was removed;
    /// unregistering an unknown token is a no-op.
    pub fn unregister(&self, token: &ListenerToken) -> bool {
        let removed = self.inner.entries.remove(token.as_str()).is_some();
        if removed {
            debug!(%token, "listener unregistered");
        }
        removed
    }

    pub fn contains(&self, token: &ListenerToken) -> bool {
        self.inner.entries.contains_key(token.as_str())
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn resolve_returns_registered_object() {
        let registry = ListenerRegistry::new();
        let greeter: Arc<dyn Greeter> = Arc::new(English);
        let token = registry.register(Arc::clone(&greeter));

        let resolved = registry.resolve::<dyn Greeter>(&token).unwrap();
        assert!(Arc::ptr_eq(&resolved, &greeter));
        assert_eq!(resolved.greet(), "hello");
    }

    #[test]
    fn tokens_are_monotonic_and_unique() {
        let registry = ListenerRegistry::new();
        let a = registry.register(Arc::new(1_u32));
        let b = registry.register(Arc::new(2_u32));
        registry.unregister(&a);
        let c = registry.register(Arc::new(3_u32));

        assert_eq!(a.as_str(), "listener-1");
        assert_eq!(b.as_str(), "listener-2");
        assert_eq!(c.as_str(), "listener-3");
    }

    #[test]
    fn resolve_after_unregister_is_not_found() {
        let registry = ListenerRegistry::new();
        let token = registry.register(Arc::new(String::from("cb")));
        assert!(registry.unregister(&token));

        let err = registry.resolve::<String>(&token).unwrap_err();
        assert!(matches!(err, CoreError::ListenerNotFound { .. }));
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = ListenerRegistry::new();
        let token = registry.register(Arc::new(5_u8));
        assert!(registry.unregister(&token));
        assert!(!registry.unregister(&token));
        assert!(!registry.unregister(&ListenerToken::from("listener-404")));
        assert!(registry.is_empty());
    }

    #[test]
    fn wrong_capability_is_a_hard_error() {
        let registry = ListenerRegistry::new();
        let token = registry.register(Arc::new(42_u64));

        let err = registry.resolve::<dyn Greeter>(&token).err().expect("expected resolve to fail");
        assert!(matches!(err, CoreError::ListenerTypeMismatch { .. }));
        assert!(registry.try_resolve::<dyn Greeter>(&token).is_none());
        assert!(registry.contains(&token));
    }

    #[test]
    fn tokens_round_trip_through_serde() {
        let registry = ListenerRegistry::new();
        let token = registry.register(Arc::new(()));
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"listener-1\"");

        let back: ListenerToken = serde_json::from_str(&json).unwrap();
        assert!(registry.resolve::<()>(&back).is_ok());
    }

    #[test]
    fn clones_share_entries() {
        let registry = ListenerRegistry::new();
        let other = registry.clone();
        let token = registry.register(Arc::new(7_i32));
        assert_eq!(*other.resolve::<i32>(&token).unwrap(), 7);
        assert_eq!(other.len(), 1);
    }
}
