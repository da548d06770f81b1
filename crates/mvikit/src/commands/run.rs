//! `mvikit run`: the scripted repository-viewer session.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use mvikit_config::{Config, load_config_from};
use mvikit_core::{AppContext, CoreError};

use crate::cli::{GlobalOpts, RunArgs};
use crate::commands::config_cmd::resolve_path;
use crate::error::CliError;
use crate::host::ConsoleHost;
use crate::output::should_color;
use crate::router::Router;
use crate::service::{MockBehavior, MockRepositoryService};
use crate::session::{self, SessionPlan};

/// Floor for the per-step timeout, whatever the simulated latency.
const MIN_STEP_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = effective_config(&args, global)?;
    debug!(?cfg, "effective configuration");

    let context = AppContext::new(cfg.to_runtime_config());
    let service = MockRepositoryService::shared(MockBehavior {
        latency: Duration::from_millis(cfg.demo.latency_ms),
        fail_fetch: cfg.demo.fail_fetch,
        fail_profile: cfg.demo.fail_profile,
    });
    let host = Arc::new(ConsoleHost::new(global.output, should_color(global.color)));

    let cancel = CancellationToken::new();
    let watchers = host.watch_broker(context.broker().clone(), cancel.child_token());
    let router = Router::new(context.clone(), service, Arc::clone(&host));
    let active = router.active();
    let router_task = tokio::spawn(router.run(cancel.clone()));

    let plan = SessionPlan {
        username: cfg.demo.username.clone(),
        password: args.password,
        rename: args.rename,
        step_timeout: step_timeout(cfg.demo.latency_ms),
    };
    let outcome = session::drive(&context, active, host.displayed_popup(), &plan).await;

    cancel.cancel();
    let routed = match router_task.await {
        Ok(result) => result.map_err(CliError::from),
        Err(join) => {
            error!(error = %join, "router task failed");
            Err(CoreError::Internal(format!("router task failed: {join}")).into())
        }
    };
    for watcher in watchers {
        if let Err(join) = watcher.await {
            error!(error = %join, "host watcher failed");
        }
    }

    let summary = outcome?;
    routed?;
    host.finish(&summary)
}

/// Config file and environment, then command-line overrides.
fn effective_config(args: &RunArgs, global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config_from(&resolve_path(global))?;
    if let Some(username) = &args.username {
        cfg.demo.username.clone_from(username);
    }
    if let Some(latency) = args.latency_ms {
        cfg.demo.latency_ms = latency;
    }
    cfg.demo.fail_fetch |= args.fail_fetch;
    cfg.demo.fail_profile |= args.fail_profile;
    cfg.validate()?;
    Ok(cfg)
}

fn step_timeout(latency_ms: u64) -> Duration {
    Duration::from_millis(latency_ms.saturating_mul(20)).max(MIN_STEP_TIMEOUT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_timeout_scales_with_latency() {
        assert_eq!(step_timeout(0), MIN_STEP_TIMEOUT);
        assert_eq!(step_timeout(1_000), Duration::from_secs(20));
    }
}
