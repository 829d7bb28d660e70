//! HiveMind envelope around bus messages

use serde::{Deserialize, Serialize};

use crate::Message;

/// HiveMind envelope type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiveMessageType {
    Handshake,
    /// Forwarded to the assistant's internal bus
    Bus,
    SharedBus,
    Broadcast,
    Propagate,
    Escalate,
    Hello,
    Query,
    Cascade,
    Ping,
}

/// A message addressed to the HiveMind node rather than a specific topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiveMessage {
    pub msg_type: HiveMessageType,
    pub payload: Message,
}

impl HiveMessage {
    /// Wrap a bus message for injection into the assistant's bus
    pub fn bus(payload: Message) -> Self {
        Self {
            msg_type: HiveMessageType::Bus,
            payload,
        }
    }

    /// Serialize to the JSON wire form
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
