//! Auth domain event logging.
//!
//! Every event is emitted on the `domain_event` target with a consistent
//! schema. Events never carry credentials, hashes or raw tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of a domain operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationResult {
    Success,
    Failure,
}

impl std::fmt::Display for OperationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventKind {
    Register,
    Login,
    TokenCheck,
}

impl std::fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Register => write!(f, "register"),
            Self::Login => write!(f, "login"),
            Self::TokenCheck => write!(f, "token_check"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: AuthEventKind,
    pub result: OperationResult,
    pub user_id: Option<Uuid>,
    /// Machine-readable failure reason, e.g. "email_taken"
    pub reason: Option<String>,
    pub duration_ms: Option<u64>,
    /// Service that emitted the event
    pub service: String,
}

impl DomainEvent {
    pub fn new(service: impl Into<String>, kind: AuthEventKind) -> DomainEventBuilder {
        DomainEventBuilder {
            service: service.into(),
            kind,
            result: OperationResult::Success,
            user_id: None,
            reason: None,
            duration_ms: None,
        }
    }
}

pub struct DomainEventBuilder {
    service: String,
    kind: AuthEventKind,
    result: OperationResult,
    user_id: Option<Uuid>,
    reason: Option<String>,
    duration_ms: Option<u64>,
}

impl DomainEventBuilder {
    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn success(mut self) -> Self {
        self.result = OperationResult::Success;
        self.reason = None;
        self
    }

    pub fn failure(mut self, reason: impl Into<String>) -> Self {
        self.result = OperationResult::Failure;
        self.reason = Some(reason.into());
        self
    }

    pub fn duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    /// Build and emit the event as a log
    pub fn emit(self) {
        let event = self.build();
        let json = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());

        match event.result {
            OperationResult::Success => tracing::info!(
                target: "domain_event",
                kind = %event.kind,
                result = "success",
                "DomainEvent: {}", json
            ),
            // Rejected credentials are routine; they are not service errors.
            OperationResult::Failure => tracing::warn!(
                target: "domain_event",
                kind = %event.kind,
                result = "failure",
                reason = ?event.reason,
                "DomainEvent: {}", json
            ),
        }
    }

    pub fn build(self) -> DomainEvent {
        DomainEvent {
            timestamp: Utc::now(),
            kind: self.kind,
            result: self.result,
            user_id: self.user_id,
            reason: self.reason,
            duration_ms: self.duration_ms,
            service: self.service,
        }
    }
}

/// Log an authentication event
pub fn log_auth_event(
    service: &str,
    kind: AuthEventKind,
    user_id: Option<Uuid>,
    failure: Option<&str>,
    duration_ms: u64,
) {
    let mut builder = DomainEvent::new(service, kind).duration_ms(duration_ms);

    if let Some(uid) = user_id {
        builder = builder.user(uid);
    }

    builder = match failure {
        Some(reason) => builder.failure(reason),
        None => builder.success(),
    };

    builder.emit();
}
