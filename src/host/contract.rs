//! Versioned host command/event envelopes for the JSON bridge.

use serde::{Deserialize, Serialize};

/// Contract version for host command/event envelopes.
pub const EVENT_VERSION: u32 = 1;

/// Command set accepted by the host bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandName {
    #[serde(rename = "host.ping")]
    HostPing,
    #[serde(rename = "search.run")]
    SearchRun,
    #[serde(rename = "history.list")]
    HistoryList,
    #[serde(rename = "history.get")]
    HistoryGet,
    #[serde(rename = "history.delete")]
    HistoryDelete,
    #[serde(rename = "challenge.resolve")]
    ChallengeResolve,
    #[serde(rename = "challenge.abandon")]
    ChallengeAbandon,
    #[serde(rename = "runtime.stop")]
    RuntimeStop,
}

impl CommandName {
    /// Render command name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostPing => "host.ping",
            Self::SearchRun => "search.run",
            Self::HistoryList => "history.list",
            Self::HistoryGet => "history.get",
            Self::HistoryDelete => "history.delete",
            Self::ChallengeResolve => "challenge.resolve",
            Self::ChallengeAbandon => "challenge.abandon",
            Self::RuntimeStop => "runtime.stop",
        }
    }

    /// Parse a command name from wire format.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "host.ping" => Some(Self::HostPing),
            "search.run" => Some(Self::SearchRun),
            "history.list" => Some(Self::HistoryList),
            "history.get" => Some(Self::HistoryGet),
            "history.delete" => Some(Self::HistoryDelete),
            "challenge.resolve" => Some(Self::ChallengeResolve),
            "challenge.abandon" => Some(Self::ChallengeAbandon),
            "runtime.stop" => Some(Self::RuntimeStop),
            _ => None,
        }
    }
}

/// A versioned response envelope from host -> frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    pub payload: serde_json::Value,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Build a successful response envelope.
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: true,
            payload,
            error: None,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: false,
            payload: serde_json::Value::Null,
            error: Some(message.into()),
        }
    }
}

/// A versioned command envelope from frontend -> host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub v: u32,
    pub request_id: String,
    pub command: CommandName,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl CommandEnvelope {
    /// Build a v1 command envelope.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            command,
            payload,
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.v != EVENT_VERSION {
            return Err(ContractError::new(
                ContractErrorKind::UnsupportedVersion,
                format!(
                    "unsupported contract version {}; expected {}",
                    self.v, EVENT_VERSION
                ),
            ));
        }
        if self.request_id.trim().is_empty() {
            return Err(ContractError::new(
                ContractErrorKind::InvalidEnvelope,
                "request_id cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// A versioned event envelope from host -> frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event_id: String,
    pub event: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Build a v1 event envelope.
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            event_id: event_id.into(),
            event: event.into(),
            payload,
        }
    }
}

/// Contract validation error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractErrorKind {
    UnsupportedVersion,
    InvalidEnvelope,
}

/// Contract validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractError {
    pub kind: ContractErrorKind,
    pub message: String,
}

impl ContractError {
    #[must_use]
    pub fn new(kind: ContractErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ContractError {}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CommandName; 8] = [
        CommandName::HostPing,
        CommandName::SearchRun,
        CommandName::HistoryList,
        CommandName::HistoryGet,
        CommandName::HistoryDelete,
        CommandName::ChallengeResolve,
        CommandName::ChallengeAbandon,
        CommandName::RuntimeStop,
    ];

    #[test]
    fn wire_names_match_serde() {
        for command in ALL {
            let json = serde_json::to_value(command).expect("serialize");
            assert_eq!(json, command.as_str());
            assert_eq!(CommandName::parse(command.as_str()), Some(command));
        }
        assert_eq!(CommandName::parse("orb.flash"), None);
    }

    #[test]
    fn validate_rejects_wrong_version_and_blank_id() {
        let mut envelope = CommandEnvelope::new("r1", CommandName::HostPing, serde_json::json!({}));
        assert!(envelope.validate().is_ok());

        envelope.v = 2;
        let err = envelope.validate().unwrap_err();
        assert_eq!(err.kind, ContractErrorKind::UnsupportedVersion);

        envelope.v = EVENT_VERSION;
        envelope.request_id = "  ".into();
        let err = envelope.validate().unwrap_err();
        assert_eq!(err.kind, ContractErrorKind::InvalidEnvelope);
    }

    #[test]
    fn payload_defaults_to_null() {
        let envelope: CommandEnvelope =
            serde_json::from_str(r#"{"v":1,"request_id":"r","command":"history.list"}"#)
                .expect("parse");
        assert_eq!(envelope.payload, serde_json::Value::Null);
    }
}
