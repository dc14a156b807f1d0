//! Audit logging.
//!
//! Structured audit events for account and access activity, and the logger
//! backends that record them. Events never carry passwords, hashes or tokens.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::role::Role;

/// Counter for generating unique event IDs.
static EVENT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Tree name for durable audit events.
pub const AUDIT_TREE: &str = "audit";

/// Current time in microseconds since the Unix epoch.
fn current_timestamp() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_micros()).unwrap_or(0)
}

/// Generate a unique event ID using timestamp and counter.
///
/// IDs sort in creation order when compared bytewise.
fn generate_event_id(timestamp: u64) -> [u8; 16] {
    let counter = EVENT_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut id = [0u8; 16];
    id[0..8].copy_from_slice(&timestamp.to_be_bytes());
    id[8..16].copy_from_slice(&counter.to_be_bytes());
    id
}

/// Types of audit events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventKind {
    /// An account was created by self-registration.
    AccountRegistered {
        username: String,
        role: Role,
    },
    /// An account was created by an administrator.
    AccountProvisioned {
        username: String,
        role: Role,
    },
    /// Login succeeded.
    LoginSucceeded {
        username: String,
    },
    /// Login failed (unknown user or wrong password).
    LoginFailed {
        username: String,
    },
    /// A privileged operation was refused.
    AccessDenied {
        /// Operation that was attempted.
        operation: String,
        /// Roles that would have been accepted.
        required: Vec<Role>,
    },
    /// A principal's role was changed.
    RoleChanged {
        target: String,
        role: Role,
    },
}

/// An audit event with metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    #[serde(with = "hex_id")]
    pub id: [u8; 16],
    /// Timestamp when the event occurred (microseconds).
    pub timestamp: u64,
    /// Username of the acting principal, or `anonymous`.
    pub actor: String,
    /// Event details.
    #[serde(flatten)]
    pub kind: AuditEventKind,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(actor: impl Into<String>, kind: AuditEventKind) -> Self {
        let timestamp = current_timestamp();
        Self {
            id: generate_event_id(timestamp),
            timestamp,
            actor: actor.into(),
            kind,
        }
    }

    pub fn account_registered(username: &str, role: Role) -> Self {
        Self::new(
            "anonymous",
            AuditEventKind::AccountRegistered {
                username: username.to_string(),
                role,
            },
        )
    }

    pub fn account_provisioned(actor: &str, username: &str, role: Role) -> Self {
        Self::new(
            actor,
            AuditEventKind::AccountProvisioned {
                username: username.to_string(),
                role,
            },
        )
    }

    pub fn login_succeeded(username: &str) -> Self {
        Self::new(
            username,
            AuditEventKind::LoginSucceeded {
                username: username.to_string(),
            },
        )
    }

    pub fn login_failed(username: &str) -> Self {
        Self::new(
            "anonymous",
            AuditEventKind::LoginFailed {
                username: username.to_string(),
            },
        )
    }

    pub fn access_denied(actor: &str, operation: impl Into<String>, required: &[Role]) -> Self {
        Self::new(
            actor,
            AuditEventKind::AccessDenied {
                operation: operation.into(),
                required: required.to_vec(),
            },
        )
    }

    pub fn role_changed(actor: &str, target: &str, role: Role) -> Self {
        Self::new(
            actor,
            AuditEventKind::RoleChanged {
                target: target.to_string(),
                role,
            },
        )
    }

    /// Hex form of the event ID.
    pub fn id_hex(&self) -> String {
        hex::encode(self.id)
    }

    /// Format the event as a log line.
    pub fn to_log_line(&self) -> String {
        let event_desc = match &self.kind {
            AuditEventKind::AccountRegistered { username, role } => {
                format!("ACCOUNT_REGISTERED username={} role={}", username, role)
            }
            AuditEventKind::AccountProvisioned { username, role } => {
                format!("ACCOUNT_PROVISIONED username={} role={}", username, role)
            }
            AuditEventKind::LoginSucceeded { username } => {
                format!("LOGIN_SUCCESS username={}", username)
            }
            AuditEventKind::LoginFailed { username } => {
                format!("LOGIN_FAILED username={}", username)
            }
            AuditEventKind::AccessDenied {
                operation,
                required,
            } => {
                let required: Vec<&str> = required.iter().map(Role::as_str).collect();
                format!(
                    "ACCESS_DENIED op={} required=[{}]",
                    operation,
                    required.join(",")
                )
            }
            AuditEventKind::RoleChanged { target, role } => {
                format!("ROLE_CHANGED target={} role={}", target, role)
            }
        };

        format!(
            "{} id={} actor={} {}",
            self.timestamp,
            self.id_hex(),
            self.actor,
            event_desc
        )
    }
}

mod hex_id {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &[u8; 16], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(id))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 16], D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut id = [0u8; 16];
        hex::decode_to_slice(&s, &mut id).map_err(D::Error::custom)?;
        Ok(id)
    }
}

/// Trait for audit log backends.
pub trait AuditLogger: Send + Sync {
    /// Log an audit event.
    fn log(&self, event: AuditEvent);

    /// Flush any buffered events.
    fn flush(&self) -> Result<(), AuditError>;
}

/// Audit logging error.
#[derive(Debug, Error)]
#[error("audit error: {0}")]
pub struct AuditError(pub String);

/// In-memory audit logger for testing.
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditLogger {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditLogger {
    /// Create a new memory logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all logged events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Clear all events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Get event count.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl AuditLogger for MemoryAuditLogger {
    fn log(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }

    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Audit logger that emits events through `tracing`.
#[derive(Debug, Default)]
pub struct TracingAuditLogger;

impl AuditLogger for TracingAuditLogger {
    fn log(&self, event: AuditEvent) {
        tracing::info!(target: "agrotrack::audit", "{}", event.to_log_line());
    }

    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Durable audit logger backed by a sled tree.
///
/// Keys are event IDs, so iteration order is creation order.
pub struct SledAuditLogger {
    tree: sled::Tree,
}

impl SledAuditLogger {
    /// Open or create the audit tree in a sled database.
    pub fn open(db: &sled::Db) -> Result<Self, AuditError> {
        let tree = db
            .open_tree(AUDIT_TREE)
            .map_err(|e| AuditError(e.to_string()))?;
        Ok(Self { tree })
    }

    /// The most recent `limit` events, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditEvent>, AuditError> {
        let mut events = Vec::with_capacity(limit.min(self.tree.len()));
        for entry in self.tree.iter().rev().take(limit) {
            let (_, value) = entry.map_err(|e| AuditError(e.to_string()))?;
            let event = serde_json::from_slice(&value).map_err(|e| AuditError(e.to_string()))?;
            events.push(event);
        }
        Ok(events)
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Check if no event is stored.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl AuditLogger for SledAuditLogger {
    fn log(&self, event: AuditEvent) {
        let bytes = match serde_json::to_vec(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode audit event");
                return;
            }
        };
        if let Err(e) = self.tree.insert(event.id, bytes) {
            tracing::warn!(error = %e, id = %event.id_hex(), "failed to persist audit event");
        }
    }

    fn flush(&self) -> Result<(), AuditError> {
        self.tree.flush().map_err(|e| AuditError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_failed_event() {
        let event = AuditEvent::login_failed("ana");
        assert_eq!(event.actor, "anonymous");
        match event.kind {
            AuditEventKind::LoginFailed { username } => assert_eq!(username, "ana"),
            _ => panic!("Expected LoginFailed event"),
        }
    }

    #[test]
    fn test_access_denied_event() {
        let event = AuditEvent::access_denied("ana", "list_users", &[Role::Admin, Role::Gerente]);

        match &event.kind {
            AuditEventKind::AccessDenied {
                operation,
                required,
            } => {
                assert_eq!(operation, "list_users");
                assert_eq!(required, &vec![Role::Admin, Role::Gerente]);
            }
            _ => panic!("Expected AccessDenied event"),
        }

        let line = event.to_log_line();
        assert!(line.contains("ACCESS_DENIED"));
        assert!(line.contains("required=[admin,gerente]"));
        assert!(line.contains("actor=ana"));
    }

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let a = AuditEvent::login_succeeded("ana");
        let b = AuditEvent::login_succeeded("ana");
        assert_ne!(a.id, b.id);
        assert!(a.id < b.id);
    }

    #[test]
    fn test_json_shape() {
        let event = AuditEvent::role_changed("boss", "ana", Role::Gerente);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "role_changed");
        assert_eq!(json["target"], "ana");
        assert_eq!(json["role"], "gerente");
        assert_eq!(json["actor"], "boss");
        assert_eq!(json["id"].as_str().unwrap().len(), 32);

        let back: AuditEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_memory_logger() {
        let logger = MemoryAuditLogger::new();

        logger.log(AuditEvent::login_succeeded("ana"));
        logger.log(AuditEvent::login_failed("ghost"));
        assert_eq!(logger.len(), 2);

        logger.clear();
        assert!(logger.is_empty());
    }

    #[test]
    fn test_sled_logger_recent_newest_first() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let logger = SledAuditLogger::open(&db).unwrap();

        logger.log(AuditEvent::account_registered("ana", Role::User));
        logger.log(AuditEvent::login_succeeded("ana"));
        logger.log(AuditEvent::login_failed("ghost"));
        logger.flush().unwrap();

        assert_eq!(logger.len(), 3);
        let recent = logger.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert!(matches!(recent[0].kind, AuditEventKind::LoginFailed { .. }));
        assert!(matches!(recent[1].kind, AuditEventKind::LoginSucceeded { .. }));
    }

    #[test]
    fn test_tracing_logger() {
        let logger = TracingAuditLogger;
        // Should not panic without a subscriber.
        logger.log(AuditEvent::login_succeeded("ana"));
        logger.flush().unwrap();
    }
}
