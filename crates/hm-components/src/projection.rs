//! State projection
//!
//! A projection mirrors a small piece of remote device state. Each field is
//! written by the handler of the topic that carries it (or by an optimistic
//! update from an action) and every write is followed by a refresh
//! notification to the host.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hm_bus::ListenerId;
use hm_core::{Message, Topic};
use tracing::debug;

use crate::entity::EntityBase;

fn read_lock<S>(lock: &RwLock<S>) -> RwLockReadGuard<'_, S> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<S>(lock: &RwLock<S>) -> RwLockWriteGuard<'_, S> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Locally mirrored state `S` of one entity
pub struct Projection<S> {
    state: Arc<RwLock<S>>,
    base: EntityBase,
    unique_id: String,
}

impl<S: Send + Sync + 'static> Projection<S> {
    pub fn new(base: EntityBase, unique_id: String, initial: S) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
            base,
            unique_id,
        }
    }

    pub fn base(&self) -> &EntityBase {
        &self.base
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Update the state from every message on `topic`
    ///
    /// `apply` returns whether the host should be notified. The lock is
    /// released before the notification goes out.
    pub fn on<F>(&self, topic: impl Into<Topic>, apply: F) -> ListenerId
    where
        F: Fn(&mut S, &Message) -> bool + Send + Sync + 'static,
    {
        let state = self.state.clone();
        let notifier = self.base.notifier().clone();
        let unique_id = self.unique_id.clone();

        self.base.connection().subscribe(
            topic,
            Arc::new(move |message: &Message| {
                let changed = {
                    let mut guard = write_lock(&state);
                    apply(&mut guard, message)
                };
                if changed {
                    debug!(unique_id = %unique_id, topic = %message.msg_type, "State updated");
                    notifier.schedule_update(&unique_id);
                }
            }),
        )
    }

    /// Read the current state
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&read_lock(&self.state))
    }

    /// Write the state locally and notify the host
    pub fn update(&self, f: impl FnOnce(&mut S)) {
        f(&mut write_lock(&self.state));
        self.base.notifier().schedule_update(&self.unique_id);
    }

    /// Emit a request topic; the response handler updates the state later
    pub fn request(&self, topic: impl Into<Topic>) {
        self.base.connection().send_mycroft(Message::empty(topic));
    }
}

impl<S: Clone + Send + Sync + 'static> Projection<S> {
    /// Copy of the current state
    pub fn get(&self) -> S {
        self.read(|s| s.clone())
    }
}
