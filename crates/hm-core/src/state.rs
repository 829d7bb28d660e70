//! Snapshot of an entity's state as handed to the host

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::STATE_UNAVAILABLE;

/// What the host sees of a bridged entity: a state string, attributes, and
/// when the string last changed or was last written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityState {
    pub unique_id: String,

    /// "on", "off", "playing", "unavailable", ...
    pub state: String,

    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// Last time `state` took a different value
    pub last_changed: DateTime<Utc>,

    /// Last time the entity was recorded
    pub last_updated: DateTime<Utc>,
}

impl EntityState {
    /// Snapshot taken now
    pub fn new(
        unique_id: impl Into<String>,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            unique_id: unique_id.into(),
            state: state.into(),
            attributes,
            last_changed: now,
            last_updated: now,
        }
    }

    /// Record `next` over this state; `last_changed` only moves with the state string
    pub fn with_update(&self, next: EntityState) -> Self {
        let state_changed = self.state != next.state;

        Self {
            unique_id: self.unique_id.clone(),
            state: next.state,
            attributes: next.attributes,
            last_changed: if state_changed {
                next.last_updated
            } else {
                self.last_changed
            },
            last_updated: next.last_updated,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.state == STATE_UNAVAILABLE
    }

    /// Typed attribute lookup
    pub fn attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

impl PartialEq for EntityState {
    fn eq(&self, other: &Self) -> bool {
        // Timestamps are not compared
        self.unique_id == other.unique_id
            && self.state == other.state
            && self.attributes == other.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_last_changed_preserved_when_state_unchanged() {
        let first = EntityState::new("hm-ssh-switch-dev-home", "on", HashMap::new());
        let mut attrs = HashMap::new();
        attrs.insert("icon".to_string(), json!("mdi:remote-desktop"));
        let second = first.with_update(EntityState::new("ignored", "on", attrs));

        assert_eq!(second.unique_id, "hm-ssh-switch-dev-home");
        assert_eq!(second.last_changed, first.last_changed);
        assert_eq!(
            second.attribute::<String>("icon").as_deref(),
            Some("mdi:remote-desktop")
        );
    }

    #[test]
    fn test_last_changed_moves_when_state_changes() {
        let first = EntityState::new("id", "off", HashMap::new());
        let next = EntityState::new("id", "on", HashMap::new());
        let updated = first.with_update(next.clone());
        assert_eq!(updated.last_changed, next.last_updated);
        assert!(!updated.is_unavailable());
    }
}
