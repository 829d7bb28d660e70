//! Message context carried alongside every bus message

use serde::{Deserialize, Serialize};

/// Session a message belongs to on the remote device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRef {
    pub session_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
}

/// Routing context of a bus message
///
/// The remote assistant uses the session to decide which device an answer
/// belongs to. Keys the bridge doesn't know about are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Originating component (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Intended recipient (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Session the message belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionRef>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context bound to a session on a site
    pub fn for_session(session_id: impl Into<String>, site_id: impl Into<String>) -> Self {
        Self {
            session: Some(SessionRef {
                session_id: session_id.into(),
                site_id: Some(site_id.into()),
            }),
            ..Self::default()
        }
    }

    /// Set the originating component
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Check whether a session has been assigned
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }
}
