//! Request/response messages exchanged over the daemon socket.
//!
//! Each connection carries exactly one JSON line in each direction: the
//! client writes a [`Request`], the daemon answers with a [`Response`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dimmer::AttributeRequest;

/// A command for the daemon. Targets are unresolved names (`light/<id>`,
/// `grouped_light/<id>` or an alias); the daemon resolves them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    Raise {
        targets: Vec<String>,
        #[serde(default)]
        sweep: Option<f64>,
        #[serde(default)]
        limit: Option<f64>,
    },
    Lower {
        targets: Vec<String>,
        #[serde(default)]
        sweep: Option<f64>,
        #[serde(default)]
        limit: Option<f64>,
    },
    Stop {
        targets: Vec<String>,
    },
    Set {
        targets: Vec<String>,
        #[serde(default)]
        attributes: AttributeRequest,
    },
    Get {
        targets: Vec<String>,
    },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Raise { .. } => "raise",
            Request::Lower { .. } => "lower",
            Request::Stop { .. } => "stop",
            Request::Set { .. } => "set",
            Request::Get { .. } => "get",
        }
    }

    pub fn targets(&self) -> &[String] {
        match self {
            Request::Raise { targets, .. }
            | Request::Lower { targets, .. }
            | Request::Stop { targets }
            | Request::Set { targets, .. }
            | Request::Get { targets } => targets,
        }
    }
}

/// The daemon's answer to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Successful response carrying `result`.
    pub fn success(result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                ok: true,
                result: Some(value),
                error: None,
            },
            Err(e) => Self::failure(format!("Failed to serialize result: {e}")),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(message.into()),
        }
    }
}
