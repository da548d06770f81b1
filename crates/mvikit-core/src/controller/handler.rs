// ── Handler tasks ──
//
// A dispatcher task fans each accepted event out to the handlers whose
// filter matches, through one unbounded lane per handler. Events are
// bounded once, at the intake; the lanes never push back on the dispatcher,
// so a handler stuck in slow work cannot hold up its siblings. Each handler
// task serves its lane sequentially, so a handler sees events in emission
// order while different handlers interleave freely.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::CoreError;
use crate::isolate::{catch_isolated, panic_message};

use super::Contract;
use super::scope::Scope;

pub(crate) type HandlerFn<C> = Arc<
    dyn Fn(Scope<C>, <C as Contract>::Event) -> BoxFuture<'static, Result<(), CoreError>>
        + Send
        + Sync,
>;

pub(crate) type EventFilter<C> = Arc<dyn Fn(&<C as Contract>::Event) -> bool + Send + Sync>;

/// A handler as declared on the builder.
pub(crate) struct HandlerSpec<C: Contract> {
    pub(crate) name: Arc<str>,
    pub(crate) filter: EventFilter<C>,
    pub(crate) run: HandlerFn<C>,
}

/// Dispatcher-side end of one handler's lane.
pub(crate) struct Route<C: Contract> {
    pub(crate) name: Arc<str>,
    pub(crate) filter: EventFilter<C>,
    pub(crate) lane: mpsc::UnboundedSender<C::Event>,
}

/// Route every intake event to the matching handler lanes.
///
/// Delivery never suspends: a busy handler queues its own backlog and
/// every other handler keeps receiving.
pub(crate) async fn dispatch<C: Contract>(
    controller: Arc<str>,
    mut intake: mpsc::Receiver<C::Event>,
    routes: Vec<Route<C>>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = intake.recv() => match next {
                Some(event) => event,
                None => break,
            },
        };
        trace!(controller = %controller, ?event, "dispatching event");

        for route in &routes {
            let matched = catch_isolated("event filter", || (route.filter)(&event)).unwrap_or(false);
            if !matched {
                continue;
            }
            if route.lane.send(event.clone()).is_err() {
                debug!(controller = %controller, handler = %route.name, "handler lane closed");
            }
        }
    }
    debug!(controller = %controller, "dispatcher stopped");
}

/// Serve one handler's lane until cancelled.
///
/// Each event runs inside its own failure boundary: an `Err` or a panic is
/// handed to the controller's failure hook and the handler moves on to the
/// next event. Cancellation abandons in-flight work; whatever it already
/// committed stays committed.
pub(crate) async fn serve<C: Contract>(
    scope: Scope<C>,
    name: Arc<str>,
    run: HandlerFn<C>,
    mut lane: mpsc::UnboundedReceiver<C::Event>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = lane.recv() => match next {
                Some(event) => event,
                None => break,
            },
        };
        trace!(controller = %scope.name(), handler = %name, ?event, "handling event");

        let call = {
            let run = Arc::clone(&run);
            let scope = scope.clone();
            async move { run(scope, event).await }
        };

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(controller = %scope.name(), handler = %name, "in-flight work abandoned");
                break;
            }
            outcome = AssertUnwindSafe(call).catch_unwind() => outcome,
        };

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(error)) => scope.inner.fail(&name, &error),
            Err(payload) => {
                warn!(
                    controller = %scope.name(),
                    handler = %name,
                    panic = panic_message(payload.as_ref()),
                    "handler panicked"
                );
                let error = CoreError::HandlerPanicked {
                    handler: name.to_string(),
                };
                scope.inner.fail(&name, &error);
            }
        }
    }
    debug!(controller = %scope.name(), handler = %name, "handler stopped");
}
