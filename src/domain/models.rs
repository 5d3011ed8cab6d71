use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const SENDER_SYSTEM: &str = "system";
pub const NOTIFICATION_CRISIS_ALERT: &str = "crisis_alert";
pub const EVENT_SOURCE_AUTOMATED: &str = "automated";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    Therapist,
    Member,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Therapist => "THERAPIST",
            UserRole::Member => "MEMBER",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ADMIN" => Some(UserRole::Admin),
            "THERAPIST" => Some(UserRole::Therapist),
            "MEMBER" => Some(UserRole::Member),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EscalationStatus {
    Open,
    Resolved,
}

impl EscalationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationStatus::Open => "open",
            EscalationStatus::Resolved => "resolved",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "open" => Some(EscalationStatus::Open),
            "resolved" => Some(EscalationStatus::Resolved),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrisisEscalation {
    pub id: Uuid,
    pub user_id: String,
    pub trigger_source: String,
    pub severity: String,
    pub trigger_data: Map<String, Value>,
    pub status: EscalationStatus,
    pub created_at: DateTime<Utc>,
}

/// Escalation row as handed to the store; `created_at` is assigned on insert.
#[derive(Clone, Debug, PartialEq)]
pub struct NewEscalation {
    pub id: Uuid,
    pub user_id: String,
    pub trigger_source: String,
    pub severity: String,
    pub trigger_data: Map<String, Value>,
    pub status: EscalationStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCrisisEvent {
    pub user_id: String,
    pub event_type: String,
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: String,
    pub sender_type: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub link: String,
    pub read: bool,
}
