//! Wrist Relay: forwards selected phone notifications to a paired wearable.

pub mod config;
pub mod delivery;
pub mod error;
pub mod filter;
pub mod host;
pub mod relay;
pub mod store;
