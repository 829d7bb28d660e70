//! HiveMind bus connection handle and topic dispatch
//!
//! This crate provides the seam between the bridge and the HiveMind client:
//! the `BusClient` trait the bridge consumes, the `HandlerTable` that routes
//! inbound messages to subscribers by topic, and the shared `Connection`
//! handle every entity holds.

mod client;
mod connection;
mod error;
mod handlers;
mod loopback;

pub use client::BusClient;
pub use connection::{AvailabilityListener, Connection};
pub use error::{BusError, BusResult};
pub use handlers::{HandlerTable, ListenerId, MessageHandler};
pub use loopback::{Emitted, LifecycleEvent, LoopbackClient};
