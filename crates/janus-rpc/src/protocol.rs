//! Janus gateway wire envelopes.
//!
//! Every command sent to the gateway is a JSON object carrying a `janus` verb
//! and a client generated `transaction`. Replies echo the transaction and
//! carry a `janus` marker (`success`, `ack`, `error`, ...) plus an opaque
//! `data` payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marker of a successful synchronous reply.
pub const SUCCESS: &str = "success";
/// Marker of an acknowledgement; the real reply arrives on the long-poll.
pub const ACK: &str = "ack";
/// Marker of a gateway side failure.
pub const ERROR: &str = "error";
/// Marker of an asynchronous plugin event.
pub const EVENT: &str = "event";

pub const CREATE: &str = "create";
pub const ATTACH: &str = "attach";
pub const MESSAGE: &str = "message";
pub const KEEPALIVE: &str = "keepalive";

/// Prefix applied to plugin names given without a namespace.
pub const PLUGIN_NAMESPACE_PREFIX: &str = "janus.plugin.";

/// Opaque identifier assigned by the gateway to sessions and plugin handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    String(String),
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Id::Number(n) => write!(f, "{n}"),
            Id::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for Id {
    fn from(n: u64) -> Self {
        Id::Number(n)
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

/// Client generated correlation token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transaction(String);

impl Transaction {
    /// Generate a fresh random transaction.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Transaction {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Outbound command envelope.
///
/// The payload holds the `janus` verb and any command specific fields. The
/// transaction always comes from [`Request::new`]; a `transaction` key in the
/// payload is discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub transaction: Transaction,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Request {
    #[must_use]
    pub fn new(mut payload: Map<String, Value>, transaction: Transaction) -> Self {
        payload.remove("transaction");
        Self {
            transaction,
            payload,
        }
    }

    /// The `janus` verb of this command, if present.
    #[must_use]
    pub fn verb(&self) -> Option<&str> {
        self.payload.get("janus").and_then(Value::as_str)
    }
}

/// Inbound reply envelope for a command.
///
/// Built leniently from a decoded body: a missing or non-string marker reads
/// as an empty string and a non-string transaction reads as absent, so such
/// replies fail the marker or transaction check instead of the decode step.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub janus: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<GatewayError>,
}

impl Response {
    /// Read a reply envelope. Returns `None` unless `value` is an object.
    ///
    /// An `error` member that is not a well formed [`GatewayError`] is
    /// dropped.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut obj) = value else {
            return None;
        };

        let text = |v: Option<Value>| match v {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };

        Some(Self {
            janus: text(obj.remove("janus")).unwrap_or_default(),
            transaction: text(obj.remove("transaction")),
            data: obj.remove("data"),
            error: obj
                .remove("error")
                .and_then(|e| serde_json::from_value(e).ok()),
        })
    }

    #[must_use]
    pub fn is_for(&self, transaction: &Transaction) -> bool {
        self.transaction.as_deref() == Some(transaction.as_str())
    }
}

/// Error object attached to `{"janus": "error"}` replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    pub code: i32,
    #[serde(default)]
    pub reason: String,
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.reason)
    }
}

/// Plugin payload of an asynchronous event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginData {
    pub plugin: String,
    #[serde(default)]
    pub data: Value,
}

/// Body delivered by a long-poll request.
///
/// Fields the gateway sends that are not modelled here are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub janus: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugindata: Option<PluginData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsep: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    /// Interpret a raw long-poll body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not an object with a `janus` marker.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[must_use]
    pub fn is_keepalive(&self) -> bool {
        self.janus == KEEPALIVE
    }
}
