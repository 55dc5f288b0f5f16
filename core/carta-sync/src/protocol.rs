//! Messages exchanged with remote views.
//!
//! Every message is one JSON object tagged by `type`. Views send
//! `command`, `link`, `unlink`, and `snapshotRequest`; the server answers
//! with `commandResult`, `linkResult`, `snapshot`, or `error`, and pushes a
//! `stateUpdate` for every flush.

use crate::error::{SyncError, SyncResult};
use carta_state::{SnapshotView, StateUpdate};
use carta_types::{ObjectPath, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version for compatibility checking.
pub const PROTOCOL_VERSION: u32 = 1;

/// Separator in the combined `<path>:<command>` target form.
const TARGET_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncMessage {
    /// Sent once to each view on connect.
    #[serde(rename_all = "camelCase")]
    Hello { version: u32, session_id: SessionId },

    Command(CommandRequest),
    CommandResult(CommandResponse),

    Link { host: ObjectPath, target: ObjectPath },
    Unlink { host: ObjectPath, target: ObjectPath },
    /// `changed` is false when an unlink found nothing to remove.
    LinkResult {
        host: ObjectPath,
        target: ObjectPath,
        changed: bool,
    },

    SnapshotRequest { view: SnapshotView },
    Snapshot { view: SnapshotView, document: Value },

    StateUpdate(StateUpdate),

    Error { message: String },
}

impl SyncMessage {
    pub fn hello(session_id: SessionId) -> Self {
        Self::Hello {
            version: PROTOCOL_VERSION,
            session_id,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// A remote command aimed at one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    /// Caller-chosen correlation id, echoed in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub path: ObjectPath,
    pub command: String,
    /// Raw `key=value` parameter string.
    #[serde(default)]
    pub params: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl CommandRequest {
    pub fn new(path: ObjectPath, command: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            id: None,
            path,
            command: command.into(),
            params: params.into(),
            session_id: None,
        }
    }

    /// Parses the combined `"<path>:<command>"` form.
    pub fn from_target(target: &str, params: impl Into<String>) -> SyncResult<Self> {
        let (path, command) = target
            .rsplit_once(TARGET_SEPARATOR)
            .filter(|(_, command)| !command.is_empty())
            .ok_or_else(|| SyncError::Protocol(format!("missing command in target '{target}'")))?;
        let path = ObjectPath::new(path).map_err(|e| SyncError::Protocol(e.to_string()))?;
        Ok(Self::new(path, command, params))
    }

    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// Outcome of one command.
///
/// `result` carries the handler's string: empty for success, a rejection
/// message, or a query payload. `error` is set only for structural failures
/// (unknown object or command, type mismatch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub path: ObjectPath,
    pub command: String,
    #[serde(default)]
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResponse {
    pub fn completed(request: &CommandRequest, result: String) -> Self {
        Self {
            id: request.id,
            path: request.path.clone(),
            command: request.command.clone(),
            result,
            error: None,
        }
    }

    pub fn failed(request: &CommandRequest, error: impl ToString) -> Self {
        Self {
            id: request.id,
            path: request.path.clone(),
            command: request.command.clone(),
            result: String::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}
