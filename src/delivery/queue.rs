//! Delivery queue: single-slot, acknowledgement-driven FIFO to the wearable.
//!
//! All queue state lives in one `QueueWorker` task. Producers and the
//! transport talk to it only through `DeliveryQueue`, a cheap cloneable handle
//! whose methods never block: they post a command and return. Commands are
//! processed one at a time in submission order, and a hand-off (`wake` +
//! `send`) completes before the next command is looked at, so there is never
//! more than one message awaiting acknowledgement.
//!
//! ```text
//!            enqueue / ack / retry due
//!   Idle ───────────────────────────────▶ AwaitingAck
//!    ▲  ◀──── ack (head removed) ───────────┘   │
//!    │  ◀──── nack, no delay ───────────────────┤
//!    │  ◀──── nack, gave up (head dropped) ─────┤
//!    └──────── timer ──── Backoff ◀── nack, delay
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::delivery::retry::{RetryDecision, RetryPolicy};
use crate::delivery::transport::{DeviceId, Transport};
use crate::error::DeliveryError;
use crate::filter::types::OutgoingMessage;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Link state of the queue head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing handed off.
    Idle,
    /// Head handed to the transport, waiting for ack/nack.
    AwaitingAck,
    /// Head was nacked and waits for its retry delay.
    Backoff,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::AwaitingAck => "awaiting_ack",
            Self::Backoff => "backoff",
        };
        write!(f, "{s}")
    }
}

/// Acknowledgement signal from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Ack,
    Nack,
}

/// Observable queue transitions.
#[derive(Debug, Clone)]
pub enum DeliveryEvent {
    Queued { id: Uuid, pending: usize },
    HandedOff { message: OutgoingMessage, attempt: u32 },
    SendFailed { id: Uuid, attempt: u32, error: String },
    Acked { id: Uuid, attempts: u32 },
    RetryScheduled { id: Uuid, attempt: u32, delay: Duration },
    Abandoned { message: OutgoingMessage, attempts: u32 },
    ProtocolViolation { signal: Signal, state: LinkState },
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone)]
pub struct QueueSnapshot {
    pub state: LinkState,
    /// Pending messages, head first.
    pub pending: Vec<OutgoingMessage>,
    /// Hand-offs made so far for the head.
    pub attempts: u32,
}

enum Command {
    Enqueue(OutgoingMessage),
    Signal(Signal),
    Inspect(oneshot::Sender<QueueSnapshot>),
    Shutdown,
}

/// Handle to the delivery queue. Clone freely.
#[derive(Clone)]
pub struct DeliveryQueue {
    tx: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<DeliveryEvent>,
}

impl DeliveryQueue {
    /// Create a queue handle and its (not yet running) worker.
    ///
    /// Use this when the transport needs the handle to report acks; otherwise
    /// `spawn` is simpler.
    pub fn new(device: DeviceId, policy: RetryPolicy) -> (Self, QueueWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        let worker = QueueWorker {
            rx,
            events: events.clone(),
            device,
            policy,
            pending: VecDeque::new(),
            state: LinkState::Idle,
            attempts: 0,
            retry_at: None,
        };
        (Self { tx, events }, worker)
    }

    /// Create a queue and spawn its worker on the current runtime.
    pub fn spawn(
        transport: Arc<dyn Transport>,
        device: DeviceId,
        policy: RetryPolicy,
    ) -> (Self, JoinHandle<()>) {
        let (queue, worker) = Self::new(device, policy);
        let handle = tokio::spawn(worker.run(transport));
        (queue, handle)
    }

    /// Append a message to the tail.
    pub fn enqueue(&self, message: OutgoingMessage) -> Result<(), DeliveryError> {
        self.tx
            .send(Command::Enqueue(message))
            .map_err(|_| DeliveryError::QueueClosed)
    }

    /// Positive acknowledgement of the current hand-off.
    pub fn ack(&self) {
        self.signal(Signal::Ack);
    }

    /// Negative acknowledgement of the current hand-off.
    pub fn nack(&self) {
        self.signal(Signal::Nack);
    }

    fn signal(&self, signal: Signal) {
        if self.tx.send(Command::Signal(signal)).is_err() {
            warn!(?signal, "Delivery queue closed, dropping signal");
        }
    }

    /// Subscribe to queue transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<DeliveryEvent> {
        self.events.subscribe()
    }

    /// Current state, taken after every previously posted command.
    pub async fn snapshot(&self) -> Result<QueueSnapshot, DeliveryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Inspect(reply_tx))
            .map_err(|_| DeliveryError::QueueClosed)?;
        reply_rx.await.map_err(|_| DeliveryError::QueueClosed)
    }

    /// Stop the worker after the commands already posted.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

/// Owns the queue state. Runs until shutdown or until every handle is dropped.
pub struct QueueWorker {
    rx: mpsc::UnboundedReceiver<Command>,
    events: broadcast::Sender<DeliveryEvent>,
    device: DeviceId,
    policy: RetryPolicy,
    pending: VecDeque<OutgoingMessage>,
    state: LinkState,
    attempts: u32,
    retry_at: Option<Instant>,
}

impl QueueWorker {
    pub async fn run(mut self, transport: Arc<dyn Transport>) {
        info!(
            device = %self.device,
            transport = transport.name(),
            "Delivery queue started"
        );

        loop {
            let command = match self.retry_at {
                Some(at) => tokio::select! {
                    command = self.rx.recv() => command,
                    _ = tokio::time::sleep_until(at) => {
                        self.retry_due(transport.as_ref()).await;
                        continue;
                    }
                },
                None => self.rx.recv().await,
            };

            let Some(command) = command else {
                break;
            };

            match command {
                Command::Enqueue(message) => self.on_enqueue(message, transport.as_ref()).await,
                Command::Signal(Signal::Ack) => self.on_ack(transport.as_ref()).await,
                Command::Signal(Signal::Nack) => self.on_nack(transport.as_ref()).await,
                Command::Inspect(reply) => {
                    let _ = reply.send(self.snapshot());
                }
                Command::Shutdown => break,
            }
        }

        info!(
            device = %self.device,
            pending = self.pending.len(),
            "Delivery queue stopped"
        );
    }

    async fn on_enqueue(&mut self, message: OutgoingMessage, transport: &dyn Transport) {
        let id = message.id();
        self.pending.push_back(message);
        debug!(id = %id, pending = self.pending.len(), "Message queued");
        self.emit(DeliveryEvent::Queued {
            id,
            pending: self.pending.len(),
        });
        self.advance(transport).await;
    }

    async fn on_ack(&mut self, transport: &dyn Transport) {
        if self.state != LinkState::AwaitingAck {
            self.protocol_violation(Signal::Ack);
            return;
        }

        // AwaitingAck implies a head.
        if let Some(message) = self.pending.pop_front() {
            info!(id = %message.id(), attempts = self.attempts, "Message acknowledged");
            self.emit(DeliveryEvent::Acked {
                id: message.id(),
                attempts: self.attempts,
            });
        }
        self.attempts = 0;
        self.state = LinkState::Idle;
        self.advance(transport).await;
    }

    async fn on_nack(&mut self, transport: &dyn Transport) {
        if self.state != LinkState::AwaitingAck {
            self.protocol_violation(Signal::Nack);
            return;
        }

        debug!(attempts = self.attempts, "Message nacked");
        self.fail_attempt(false);
        self.advance(transport).await;
    }

    async fn retry_due(&mut self, transport: &dyn Transport) {
        self.retry_at = None;
        if self.state == LinkState::Backoff {
            self.state = LinkState::Idle;
            self.advance(transport).await;
        }
    }

    /// Hand off heads until one is awaiting a signal, backing off, or the queue is empty.
    async fn advance(&mut self, transport: &dyn Transport) {
        while self.state == LinkState::Idle && !self.pending.is_empty() {
            self.hand_off(transport).await;
        }
    }

    async fn hand_off(&mut self, transport: &dyn Transport) {
        let Some(head) = self.pending.front().cloned() else {
            return;
        };

        self.state = LinkState::AwaitingAck;
        self.attempts += 1;

        if let Err(e) = transport.wake(&self.device).await {
            warn!(device = %self.device, error = %e, "Wake failed, sending anyway");
        }

        match transport.send(&self.device, &head).await {
            Ok(()) => {
                debug!(id = %head.id(), attempt = self.attempts, "Message handed off");
                self.emit(DeliveryEvent::HandedOff {
                    message: head,
                    attempt: self.attempts,
                });
            }
            Err(e) => {
                warn!(id = %head.id(), attempt = self.attempts, error = %e, "Send failed");
                self.emit(DeliveryEvent::SendFailed {
                    id: head.id(),
                    attempt: self.attempts,
                    error: e.to_string(),
                });
                self.fail_attempt(true);
            }
        }
    }

    /// Apply the retry policy to the head after a nack or send failure.
    ///
    /// A send failure always goes through the retry timer, even with zero
    /// delay, so a dead link cannot starve queued commands.
    fn fail_attempt(&mut self, send_failed: bool) {
        let Some(head) = self.pending.front() else {
            self.state = LinkState::Idle;
            return;
        };
        let id = head.id();

        match self.policy.decide(self.attempts) {
            RetryDecision::GiveUp => {
                if let Some(message) = self.pending.pop_front() {
                    warn!(id = %id, attempts = self.attempts, "Giving up on message");
                    self.emit(DeliveryEvent::Abandoned {
                        message,
                        attempts: self.attempts,
                    });
                }
                self.attempts = 0;
                self.state = LinkState::Idle;
            }
            RetryDecision::RetryAfter(delay) if delay.is_zero() && !send_failed => {
                self.state = LinkState::Idle;
            }
            RetryDecision::RetryAfter(delay) => {
                debug!(id = %id, attempt = self.attempts, ?delay, "Retry scheduled");
                self.emit(DeliveryEvent::RetryScheduled {
                    id,
                    attempt: self.attempts,
                    delay,
                });
                self.state = LinkState::Backoff;
                self.retry_at = Some(Instant::now() + delay);
            }
        }
    }

    fn protocol_violation(&self, signal: Signal) {
        warn!(?signal, state = %self.state, "Signal received with nothing awaiting acknowledgement, ignoring");
        self.emit(DeliveryEvent::ProtocolViolation {
            signal,
            state: self.state,
        });
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            state: self.state,
            pending: self.pending.iter().cloned().collect(),
            attempts: self.attempts,
        }
    }

    fn emit(&self, event: DeliveryEvent) {
        // Ok if nobody is subscribed
        let _ = self.events.send(event);
    }
}
