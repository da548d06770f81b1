// ── Application context ──
//
// Explicit composition root: the registry, the broker, and the runtime
// tuning are built once and handed to every controller.

use std::sync::Arc;

use crate::broker::NotificationBroker;
use crate::config::RuntimeConfig;
use crate::registry::ListenerRegistry;

/// Process-wide services shared by all controllers.
#[derive(Clone)]
pub struct AppContext {
    config: Arc<RuntimeConfig>,
    registry: ListenerRegistry,
    broker: NotificationBroker,
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl AppContext {
    pub fn new(config: RuntimeConfig) -> Self {
        let broker = NotificationBroker::new(&config);
        Self {
            config: Arc::new(config),
            registry: ListenerRegistry::new(),
            broker,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    pub fn broker(&self) -> &NotificationBroker {
        &self.broker
    }
}
