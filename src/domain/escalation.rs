use crate::db::{CrisisStore, StoreError};
use crate::domain::models::{
    EscalationStatus, NewCrisisEvent, NewEscalation, EVENT_SOURCE_AUTOMATED,
};
use crate::domain::notify;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Crisis trigger as received from a caller. Fields stay optional so that a
/// missing field surfaces as a validation error rather than a decode error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrisisReport {
    pub user_id: Option<String>,
    pub trigger_source: Option<String>,
    pub severity: Option<String>,
    pub trigger_data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
struct ValidReport {
    user_id: String,
    trigger_source: String,
    severity: String,
    trigger_data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    EventLogFailed(String),
    RecipientLookupFailed(String),
    NotificationFanoutFailed(String),
}

impl Warning {
    pub fn describe(&self) -> String {
        match self {
            Warning::EventLogFailed(e) => format!("crisis event log write failed: {}", e),
            Warning::RecipientLookupFailed(e) => format!("admin lookup failed: {}", e),
            Warning::NotificationFanoutFailed(e) => format!("admin notification failed: {}", e),
        }
    }
}

impl Serialize for Warning {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.describe())
    }
}

/// `success: true` means the escalation is durably recorded. It says nothing
/// about whether any admin was notified; see `warnings`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationResult {
    pub success: bool,
    pub escalation_id: Uuid,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

#[derive(Debug, thiserror::Error)]
pub enum EscalationError {
    #[error("{0}")]
    Validation(String),
    #[error("failed to record crisis escalation: {0}")]
    Persistence(#[from] StoreError),
}

#[derive(Clone)]
pub struct EscalationService {
    store: Arc<dyn CrisisStore>,
    call_timeout: Duration,
}

impl EscalationService {
    pub fn new(store: Arc<dyn CrisisStore>, call_timeout: Duration) -> Self {
        Self {
            store,
            call_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn CrisisStore> {
        &self.store
    }

    /// Records the escalation, then best-effort logs the event and alerts every admin.
    /// Only a validation failure or a failed escalation write is returned as an error.
    pub async fn report_crisis(
        &self,
        report: CrisisReport,
    ) -> Result<EscalationResult, EscalationError> {
        let report = validate(report)?;
        let mut warnings = Vec::new();

        let escalation = self
            .deadline(self.store.insert_escalation(NewEscalation {
                id: Uuid::new_v4(),
                user_id: report.user_id.clone(),
                trigger_source: report.trigger_source.clone(),
                severity: report.severity.clone(),
                trigger_data: report.trigger_data,
                status: EscalationStatus::Open,
            }))
            .await
            .map_err(|e| {
                tracing::error!(
                    user_id = %report.user_id,
                    trigger_source = %report.trigger_source,
                    "Failed to record crisis escalation: {}",
                    e
                );
                EscalationError::Persistence(e)
            })?;

        let event = NewCrisisEvent {
            user_id: escalation.user_id.clone(),
            event_type: escalation.trigger_source.clone(),
            source: EVENT_SOURCE_AUTOMATED.to_string(),
        };
        if let Err(e) = self.deadline(self.store.insert_event(event)).await {
            tracing::error!(
                escalation_id = %escalation.id,
                user_id = %escalation.user_id,
                "Failed to write crisis event: {}",
                e
            );
            warnings.push(Warning::EventLogFailed(e.to_string()));
        }

        let recipients = match self.deadline(self.store.admin_ids()).await {
            Ok(ids) => notify::unique_recipients(ids),
            Err(e) => {
                tracing::error!(
                    escalation_id = %escalation.id,
                    "Failed to resolve admin recipients: {}",
                    e
                );
                warnings.push(Warning::RecipientLookupFailed(e.to_string()));
                Vec::new()
            }
        };

        let mut notified = 0;
        if recipients.is_empty() {
            tracing::debug!(escalation_id = %escalation.id, "No admins to notify");
        } else {
            let alerts = notify::build_crisis_alerts(&escalation, &recipients);
            match self.deadline(self.store.insert_notifications(alerts)).await {
                Ok(count) => notified = count,
                Err(e) => {
                    tracing::error!(
                        escalation_id = %escalation.id,
                        recipients = recipients.len(),
                        "Failed to notify admins of crisis escalation: {}",
                        e
                    );
                    warnings.push(Warning::NotificationFanoutFailed(e.to_string()));
                }
            }
        }

        tracing::warn!(
            escalation_id = %escalation.id,
            user_id = %escalation.user_id,
            severity = %escalation.severity,
            trigger_source = %escalation.trigger_source,
            notified,
            warnings = warnings.len(),
            "Crisis escalation recorded"
        );

        Ok(EscalationResult {
            success: true,
            escalation_id: escalation.id,
            message: "Crisis escalation created successfully".to_string(),
            warnings,
        })
    }

    /// Bounds one store call. An elapsed deadline does not cancel work the
    /// database has already committed: a timed-out escalation insert may still
    /// have landed, and a caller that retries will then create a second row.
    async fn deadline<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.call_timeout))?
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, EscalationError> {
    let value = value.unwrap_or_default();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EscalationError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn validate(report: CrisisReport) -> Result<ValidReport, EscalationError> {
    let user_id = required(report.user_id, "userId")?;
    let trigger_source = required(report.trigger_source, "triggerSource")?;
    let severity = required(report.severity, "severity")?;
    let trigger_data = match report.trigger_data {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(EscalationError::Validation(
                "triggerData must be an object".to_string(),
            ))
        }
    };

    Ok(ValidReport {
        user_id,
        trigger_source,
        severity,
        trigger_data,
    })
}
