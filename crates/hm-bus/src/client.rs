//! Bus client seam
//!
//! The HiveMind client (handshake, key negotiation, framing) is an external
//! collaborator. The bridge only needs the narrow surface below.

use async_trait::async_trait;
use hm_core::{HiveMessage, Message, Topic};

use crate::{BusResult, ListenerId, MessageHandler};

/// Contract the bridge consumes from a HiveMind bus client
///
/// Implementations are responsible for their own internal synchronization;
/// every method may be called from any entity without extra locking.
#[async_trait]
pub trait BusClient: Send + Sync {
    /// Host of the HiveMind node this client talks to
    fn host(&self) -> &str;

    /// True once the handshake completed and messages can flow
    fn is_handshake_complete(&self) -> bool;

    /// True while the transport is open
    fn is_connected(&self) -> bool;

    /// Open the transport and start the handshake for `site_id`
    async fn connect(&self, site_id: &str) -> BusResult<()>;

    /// Close the transport
    async fn close(&self) -> BusResult<()>;

    /// Clear the handshake and connected flags and discard session key
    /// material, so that the next connect negotiates a fresh key
    fn reset_session(&self);

    /// Subscribe to messages from the assistant's bus
    fn on_mycroft(&self, topic: Topic, handler: MessageHandler) -> ListenerId;

    /// Inject a message into the assistant's bus
    fn emit_mycroft(&self, message: Message) -> BusResult<()>;

    /// Send a HiveMind envelope to the node
    fn emit(&self, message: HiveMessage) -> BusResult<()>;
}
