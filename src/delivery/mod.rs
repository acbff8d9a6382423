//! Delivery to the wearable.
//!
//! - `queue` — actor-owned FIFO with at most one message awaiting ack
//! - `retry` — what happens to a nacked head
//! - `transport` — the link seam plus a console implementation

pub mod queue;
pub mod retry;
pub mod transport;

pub use queue::{DeliveryEvent, DeliveryQueue, LinkState, QueueSnapshot, QueueWorker, Signal};
pub use retry::{RetryDecision, RetryPolicy};
pub use transport::{ConsoleTransport, DeviceId, Transport};
