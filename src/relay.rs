//! Notification relay: rule engine, text conversion and delivery, wired
//! against the live settings snapshot.

use std::sync::Arc;

use chrono::NaiveTime;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::delivery::queue::DeliveryQueue;
use crate::filter::convert;
use crate::filter::rules::RulesEngine;
use crate::filter::settings::FilterConfig;
use crate::filter::types::{Decision, EvaluationContext, NotificationEvent, OutgoingMessage, RejectReason};

/// Host conditions at the time an event arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostState {
    pub screen_on: bool,
    /// Local wall-clock time.
    pub now: NaiveTime,
}

impl HostState {
    /// Screen off, current local time.
    pub fn now() -> Self {
        Self {
            screen_on: false,
            now: chrono::Local::now().time(),
        }
    }
}

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Rejected(RejectReason),
    /// Accepted, but title or body was empty after conversion.
    Dropped,
    Queued(OutgoingMessage),
    /// Accepted, but the delivery queue has stopped.
    QueueClosed,
}

impl Outcome {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "rejected",
            Self::Dropped => "dropped",
            Self::Queued(_) => "queued",
            Self::QueueClosed => "queue_closed",
        }
    }
}

/// Routes host events to the delivery queue.
pub struct NotificationRelay {
    engine: RulesEngine,
    settings: watch::Receiver<Arc<FilterConfig>>,
    queue: DeliveryQueue,
}

impl NotificationRelay {
    pub fn new(
        engine: RulesEngine,
        settings: watch::Receiver<Arc<FilterConfig>>,
        queue: DeliveryQueue,
    ) -> Self {
        Self {
            engine,
            settings,
            queue,
        }
    }

    /// The snapshot the next event will be evaluated against.
    pub fn snapshot(&self) -> Arc<FilterConfig> {
        self.settings.borrow().clone()
    }

    /// Pre-compute the host-dependent gates for one evaluation.
    pub fn context(config: &FilterConfig, host: &HostState) -> EvaluationContext {
        EvaluationContext {
            screen_suppressed: config.screen_on_suppression && host.screen_on,
            quiet_now: config
                .quiet_hours
                .is_some_and(|quiet| quiet.contains(host.now)),
        }
    }

    /// Evaluate, convert and enqueue one event. Never blocks on delivery.
    pub fn handle(&self, event: &NotificationEvent, host: &HostState) -> Outcome {
        let config = self.snapshot();
        let ctx = Self::context(&config, host);

        let accepted = match self.engine.evaluate(event, &config, &ctx) {
            Decision::Accept(accepted) => accepted,
            Decision::Reject(reason) => return Outcome::Rejected(reason),
        };

        let Some(message) = convert::finalize(accepted, &config.convert_rules) else {
            return Outcome::Dropped;
        };

        match self.queue.enqueue(message.clone()) {
            Ok(()) => {
                debug!(
                    id = %message.id(),
                    app = %event.source_app_id,
                    title = %message.title(),
                    "Notification queued for delivery"
                );
                Outcome::Queued(message)
            }
            Err(e) => {
                error!(app = %event.source_app_id, "Cannot queue notification: {e}");
                Outcome::QueueClosed
            }
        }
    }
}
