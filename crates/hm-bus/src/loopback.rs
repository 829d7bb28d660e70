//! In-process bus client
//!
//! Records everything emitted and lets the caller inject inbound messages.
//! Useful for wiring a bridge without a HiveMind node and for tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use hm_core::{HiveMessage, Message, Topic};
use tracing::debug;

use crate::{BusClient, BusError, BusResult, HandlerTable, ListenerId, MessageHandler};

/// Connection lifecycle step observed by the loopback client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connecting(String),
    Connected(String),
    ConnectFailed(String),
    Closed,
    SessionReset,
}

/// Something emitted through the client, in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum Emitted {
    Mycroft(Message),
    Hive(HiveMessage),
}

impl Emitted {
    /// Topic of the carried bus message
    pub fn topic(&self) -> &str {
        match self {
            Emitted::Mycroft(m) => m.msg_type.as_str(),
            Emitted::Hive(h) => h.payload.msg_type.as_str(),
        }
    }

    /// The carried bus message
    pub fn message(&self) -> &Message {
        match self {
            Emitted::Mycroft(m) => m,
            Emitted::Hive(h) => &h.payload,
        }
    }
}

/// Bus client that stays inside the process
pub struct LoopbackClient {
    host: String,
    handlers: HandlerTable,
    handshake: AtomicBool,
    connected: AtomicBool,
    session_key: Mutex<Option<String>>,
    key_counter: AtomicU64,
    emitted: Mutex<Vec<Emitted>>,
    lifecycle: Mutex<Vec<LifecycleEvent>>,
    connect_delay: Option<Duration>,
    fail_connect: AtomicBool,
    fail_emit: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LoopbackClient {
    /// Create a disconnected client
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            handlers: HandlerTable::new(),
            handshake: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            session_key: Mutex::new(None),
            key_counter: AtomicU64::new(0),
            emitted: Mutex::new(Vec::new()),
            lifecycle: Mutex::new(Vec::new()),
            connect_delay: None,
            fail_connect: AtomicBool::new(false),
            fail_emit: AtomicBool::new(false),
        }
    }

    /// Simulate a slow handshake
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    /// Make subsequent connects fail
    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent emissions fail with a transport error
    pub fn set_fail_emit(&self, fail: bool) {
        self.fail_emit.store(fail, Ordering::SeqCst);
    }

    /// Force the handshake flag
    pub fn set_handshake(&self, complete: bool) {
        self.handshake.store(complete, Ordering::SeqCst);
    }

    /// Deliver an inbound message to subscribers
    ///
    /// Returns the number of handlers invoked.
    pub fn deliver(&self, message: Message) -> usize {
        self.handlers.dispatch(&message)
    }

    /// Number of handlers subscribed to a topic
    pub fn handler_count(&self, topic: &str) -> usize {
        self.handlers.handler_count(topic)
    }

    /// Everything emitted so far
    pub fn emitted(&self) -> Vec<Emitted> {
        lock(&self.emitted).clone()
    }

    /// Topics of everything emitted so far
    pub fn emitted_topics(&self) -> Vec<String> {
        lock(&self.emitted)
            .iter()
            .map(|e| e.topic().to_string())
            .collect()
    }

    /// Messages sent with `emit_mycroft`
    pub fn sent_mycroft(&self) -> Vec<Message> {
        lock(&self.emitted)
            .iter()
            .filter_map(|e| match e {
                Emitted::Mycroft(m) => Some(m.clone()),
                Emitted::Hive(_) => None,
            })
            .collect()
    }

    /// Envelopes sent with `emit`
    pub fn sent_hive(&self) -> Vec<HiveMessage> {
        lock(&self.emitted)
            .iter()
            .filter_map(|e| match e {
                Emitted::Hive(h) => Some(h.clone()),
                Emitted::Mycroft(_) => None,
            })
            .collect()
    }

    /// Forget everything emitted so far
    pub fn clear_emitted(&self) {
        lock(&self.emitted).clear();
    }

    /// Lifecycle steps observed so far
    pub fn lifecycle(&self) -> Vec<LifecycleEvent> {
        lock(&self.lifecycle).clone()
    }

    /// Forget the lifecycle history
    pub fn clear_lifecycle(&self) {
        lock(&self.lifecycle).clear();
    }

    /// Key negotiated by the last successful handshake
    pub fn session_key(&self) -> Option<String> {
        lock(&self.session_key).clone()
    }

    fn record(&self, event: LifecycleEvent) {
        lock(&self.lifecycle).push(event);
    }

    fn check_emit(&self) -> BusResult<()> {
        if self.fail_emit.load(Ordering::SeqCst) {
            return Err(BusError::Transport("simulated send failure".to_string()));
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BusError::NotConnected);
        }
        Ok(())
    }
}

#[async_trait]
impl BusClient for LoopbackClient {
    fn host(&self) -> &str {
        &self.host
    }

    fn is_handshake_complete(&self) -> bool {
        self.handshake.load(Ordering::SeqCst)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn connect(&self, site_id: &str) -> BusResult<()> {
        self.record(LifecycleEvent::Connecting(site_id.to_string()));

        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_connect.load(Ordering::SeqCst) {
            self.record(LifecycleEvent::ConnectFailed(site_id.to_string()));
            return Err(BusError::Transport("simulated connect failure".to_string()));
        }

        let n = self.key_counter.fetch_add(1, Ordering::SeqCst);
        *lock(&self.session_key) = Some(format!("loopback-key-{}", n));
        self.connected.store(true, Ordering::SeqCst);
        self.handshake.store(true, Ordering::SeqCst);
        self.record(LifecycleEvent::Connected(site_id.to_string()));
        debug!(site_id = %site_id, "Loopback handshake complete");
        Ok(())
    }

    async fn close(&self) -> BusResult<()> {
        self.handshake.store(false, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        self.record(LifecycleEvent::Closed);
        Ok(())
    }

    fn reset_session(&self) {
        self.handshake.store(false, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        *lock(&self.session_key) = None;
        self.record(LifecycleEvent::SessionReset);
    }

    fn on_mycroft(&self, topic: Topic, handler: MessageHandler) -> ListenerId {
        self.handlers.subscribe(topic, handler)
    }

    fn emit_mycroft(&self, message: Message) -> BusResult<()> {
        self.check_emit()?;
        lock(&self.emitted).push(Emitted::Mycroft(message));
        Ok(())
    }

    fn emit(&self, message: HiveMessage) -> BusResult<()> {
        self.check_emit()?;
        lock(&self.emitted).push(Emitted::Hive(message));
        Ok(())
    }
}
