//! Shared connection handle
//!
//! One `Connection` exists per config entry and is cloned into every entity.
//! All access to the client goes through it, so entities never poke client
//! internals directly.

use std::sync::{Arc, PoisonError, RwLock};

use hm_core::{Context, HiveMessage, Message, Topic};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::{BusClient, BusResult, ListenerId, MessageHandler};

/// Called with the fresh availability after every connect, close or reconnect step
pub type AvailabilityListener = Arc<dyn Fn(bool) + Send + Sync>;

struct ConnectionInner {
    client: Arc<dyn BusClient>,
    site_id: String,
    session_id: String,
    /// Held for the whole close/reset/connect sequence
    reconnect_lock: Mutex<()>,
    availability_listeners: RwLock<Vec<AvailabilityListener>>,
}

/// Reference-counted handle to the entry's bus client
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Wrap a client for the given site and session
    pub fn new(
        client: Arc<dyn BusClient>,
        site_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                client,
                site_id: site_id.into(),
                session_id: session_id.into(),
                reconnect_lock: Mutex::new(()),
                availability_listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Site the connection was opened for
    pub fn site_id(&self) -> &str {
        &self.inner.site_id
    }

    /// Session outgoing messages are tagged with
    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    /// Host of the HiveMind node
    pub fn host(&self) -> &str {
        self.inner.client.host()
    }

    /// Whether the handshake has completed; read fresh on every call
    pub fn is_available(&self) -> bool {
        self.inner.client.is_handshake_complete()
    }

    /// Open the connection for the entry's site
    #[instrument(skip(self), fields(site_id = %self.inner.site_id, host = %self.host()))]
    pub async fn connect(&self) -> BusResult<()> {
        let _guard = self.inner.reconnect_lock.lock().await;
        info!("Connecting to HiveMind");
        let result = self.inner.client.connect(&self.inner.site_id).await;
        self.announce_availability();
        result
    }

    /// Force a fresh handshake and key negotiation
    ///
    /// Closes the transport, clears the handshake and connected flags,
    /// discards the session key and reconnects with the same site id.
    /// Concurrent calls are serialized; the second waits for the first.
    #[instrument(skip(self), fields(site_id = %self.inner.site_id, host = %self.host()))]
    pub async fn reconnect(&self) -> BusResult<()> {
        let _guard = self.inner.reconnect_lock.lock().await;
        let client = &self.inner.client;

        info!(
            connected = client.is_handshake_complete(),
            "Reconnecting to HiveMind"
        );

        if let Err(e) = client.close().await {
            // The transport may already be gone, which is why we reconnect
            warn!(error = %e, "Error closing HiveMind connection");
        }
        client.reset_session();
        self.announce_availability();

        let result = client.connect(&self.inner.site_id).await;
        self.announce_availability();
        match &result {
            Ok(()) => info!("Reconnected to HiveMind"),
            Err(e) => error!(error = %e, "Failed to reconnect to HiveMind"),
        }
        result
    }

    /// Close the transport when the entry is unloaded
    #[instrument(skip(self), fields(site_id = %self.inner.site_id, host = %self.host()))]
    pub async fn close(&self) -> BusResult<()> {
        let _guard = self.inner.reconnect_lock.lock().await;
        info!("Closing HiveMind connection");
        let result = self.inner.client.close().await;
        self.announce_availability();
        result
    }

    /// Get told when `connect`, `reconnect` or `close` may have changed
    /// availability
    ///
    /// A handshake the client loses on its own is not announced; hosts still
    /// need to re-read availability periodically.
    pub fn on_availability_change(&self, listener: AvailabilityListener) {
        self.inner
            .availability_listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn announce_availability(&self) {
        let available = self.is_available();
        debug!(available, "Announcing HiveMind availability");
        let listeners = self
            .inner
            .availability_listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(available);
        }
    }

    /// Subscribe to a topic on the assistant's bus
    pub fn subscribe(&self, topic: impl Into<Topic>, handler: MessageHandler) -> ListenerId {
        self.inner.client.on_mycroft(topic.into(), handler)
    }

    /// Emit a message on the assistant's bus
    pub fn emit_mycroft(&self, message: Message) -> BusResult<()> {
        let message = self.stamp(message);
        debug!(topic = %message.msg_type, "Emitting bus message");
        self.inner.client.emit_mycroft(message)
    }

    /// Send a HiveMind envelope
    pub fn emit(&self, mut message: HiveMessage) -> BusResult<()> {
        message.payload = self.stamp(message.payload);
        debug!(topic = %message.payload.msg_type, "Emitting HiveMind message");
        self.inner.client.emit(message)
    }

    /// Emit a bus message, logging instead of returning transport errors
    pub fn send_mycroft(&self, message: Message) {
        let topic = message.msg_type.clone();
        if let Err(e) = self.emit_mycroft(message) {
            error!(topic = %topic, error = %e, "Error from HiveMind messagebus");
        }
    }

    /// Send a HiveMind envelope, logging instead of returning transport errors
    pub fn send(&self, message: HiveMessage) {
        let topic = message.payload.msg_type.clone();
        if let Err(e) = self.emit(message) {
            error!(topic = %topic, error = %e, "Error from HiveMind messagebus");
        }
    }

    /// Tag a message with the entry's session unless it carries its own
    fn stamp(&self, mut message: Message) -> Message {
        if !message.context.has_session() {
            let context = Context::for_session(&self.inner.session_id, &self.inner.site_id);
            message.context.session = context.session;
        }
        message
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("site_id", &self.inner.site_id)
            .field("session_id", &self.inner.session_id)
            .field("host", &self.host())
            .field("available", &self.is_available())
            .finish()
    }
}
