//! Gateway message format
//!
//! Defines the `{op, d, s, t}` envelope for all WebSocket messages, with
//! constructors for the frames the client sends and parsers for the frames
//! it receives.

use super::{
    HelloPayload, IdentifyPayload, OpCode, RequestGuildMembersPayload, ResumePayload,
    VoiceStateUpdatePayload,
};
use chat_core::UpdatePresence;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway message envelope
///
/// All messages sent over the WebSocket connection follow this format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event type (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event data payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl GatewayMessage {
    fn command(op: OpCode, data: Option<Value>) -> Self {
        Self {
            op,
            t: None,
            s: None,
            d: data,
        }
    }

    // === Client Messages ===

    /// Create a Heartbeat message (op=1); payload is the last seen sequence
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::command(OpCode::Heartbeat, Some(match last_sequence {
            Some(s) => Value::Number(s.into()),
            None => Value::Null,
        }))
    }

    /// Create an Identify message (op=2)
    #[must_use]
    pub fn identify(payload: &IdentifyPayload) -> Self {
        Self::command(
            OpCode::Identify,
            Some(serde_json::to_value(payload).unwrap_or_default()),
        )
    }

    /// Create a Resume message (op=6)
    #[must_use]
    pub fn resume(payload: &ResumePayload) -> Self {
        Self::command(
            OpCode::Resume,
            Some(serde_json::to_value(payload).unwrap_or_default()),
        )
    }

    /// Create a Presence Update message (op=3)
    #[must_use]
    pub fn presence_update(payload: &UpdatePresence) -> Self {
        Self::command(
            OpCode::PresenceUpdate,
            Some(serde_json::to_value(payload).unwrap_or_default()),
        )
    }

    /// Create a Voice State Update message (op=4)
    #[must_use]
    pub fn voice_state_update(payload: &VoiceStateUpdatePayload) -> Self {
        Self::command(
            OpCode::VoiceStateUpdate,
            Some(serde_json::to_value(payload).unwrap_or_default()),
        )
    }

    /// Create a Request Guild Members message (op=8)
    #[must_use]
    pub fn request_guild_members(payload: &RequestGuildMembersPayload) -> Self {
        Self::command(
            OpCode::RequestGuildMembers,
            Some(serde_json::to_value(payload).unwrap_or_default()),
        )
    }

    // === Parsing Server Messages ===

    /// Try to parse as a Hello payload (op=10)
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.op != OpCode::Hello {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Try to read the resumable flag of an Invalid Session (op=9)
    pub fn as_invalid_session(&self) -> Option<bool> {
        if self.op != OpCode::InvalidSession {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_bool).unwrap_or(false))
    }

    /// Try to read a Dispatch (op=0) as `(event name, sequence, payload)`
    ///
    /// Events like RESUMED dispatch with a null payload; those yield
    /// `Value::Null`.
    pub fn as_dispatch(&self) -> Option<(&str, u64, &Value)> {
        if self.op != OpCode::Dispatch {
            return None;
        }
        static NULL: Value = Value::Null;
        Some((self.t.as_deref()?, self.s?, self.d.as_ref().unwrap_or(&NULL)))
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}
