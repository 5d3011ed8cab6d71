#[cfg(test)]
pub mod memory;

use crate::domain::models::{
    CrisisEscalation, EscalationStatus, NewCrisisEvent, NewEscalation, NewNotification, UserRole,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store call exceeded deadline of {0:?}")]
    Timeout(Duration),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Persistence seam for the crisis pipeline. Each call is a single statement;
/// no multi-statement transaction is assumed by callers.
#[async_trait]
pub trait CrisisStore: Send + Sync {
    async fn insert_escalation(&self, row: NewEscalation) -> Result<CrisisEscalation, StoreError>;

    async fn insert_event(&self, row: NewCrisisEvent) -> Result<(), StoreError>;

    /// Ids of every user currently holding the admin role, however its case is stored.
    async fn admin_ids(&self) -> Result<Vec<String>, StoreError>;

    /// Writes the whole batch in one statement and returns the number of rows written.
    async fn insert_notifications(&self, rows: Vec<NewNotification>) -> Result<u64, StoreError>;

    async fn open_escalations(&self, limit: i64) -> Result<Vec<CrisisEscalation>, StoreError>;

    async fn stale_open_escalations(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<CrisisEscalation>, StoreError>;
}

#[derive(Debug, FromRow)]
struct EscalationRow {
    id: Uuid,
    user_id: String,
    trigger_source: String,
    severity: String,
    trigger_data: Value,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<EscalationRow> for CrisisEscalation {
    type Error = StoreError;

    fn try_from(row: EscalationRow) -> Result<Self, Self::Error> {
        let status = EscalationStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown status '{}'", row.status)))?;
        let trigger_data = match row.trigger_data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(StoreError::Corrupt(format!(
                    "trigger_data is not an object: {}",
                    other
                )))
            }
        };

        Ok(CrisisEscalation {
            id: row.id,
            user_id: row.user_id,
            trigger_source: row.trigger_source,
            severity: row.severity,
            trigger_data,
            status,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CrisisStore for PgStore {
    async fn insert_escalation(&self, row: NewEscalation) -> Result<CrisisEscalation, StoreError> {
        let inserted = sqlx::query_as::<_, EscalationRow>(
            r#"
            INSERT INTO crisis_escalations (id, user_id, trigger_source, severity, trigger_data, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, trigger_source, severity, trigger_data, status, created_at
            "#,
        )
        .bind(row.id)
        .bind(&row.user_id)
        .bind(&row.trigger_source)
        .bind(&row.severity)
        .bind(Value::Object(row.trigger_data))
        .bind(row.status.as_str())
        .fetch_one(&self.pool)
        .await?;

        inserted.try_into()
    }

    async fn insert_event(&self, row: NewCrisisEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO crisis_events (user_id, event_type, source)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&row.user_id)
        .bind(&row.event_type)
        .bind(&row.source)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn admin_ids(&self) -> Result<Vec<String>, StoreError> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT user_id
            FROM user_roles
            WHERE upper(btrim(role)) = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(UserRole::Admin.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn insert_notifications(&self, rows: Vec<NewNotification>) -> Result<u64, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut recipients = Vec::with_capacity(rows.len());
        let mut sender_types = Vec::with_capacity(rows.len());
        let mut kinds = Vec::with_capacity(rows.len());
        let mut titles = Vec::with_capacity(rows.len());
        let mut messages = Vec::with_capacity(rows.len());
        let mut links = Vec::with_capacity(rows.len());
        let mut reads = Vec::with_capacity(rows.len());
        for row in rows {
            recipients.push(row.recipient_id);
            sender_types.push(row.sender_type);
            kinds.push(row.notification_type);
            titles.push(row.title);
            messages.push(row.message);
            links.push(row.link);
            reads.push(row.read);
        }

        let expected = recipients.len() as u64;
        let result = sqlx::query(
            r#"
            INSERT INTO notifications
                (recipient_id, sender_type, notification_type, title, message, link, read)
            SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[], $5::text[], $6::text[], $7::bool[])
            "#,
        )
        .bind(&recipients)
        .bind(&sender_types)
        .bind(&kinds)
        .bind(&titles)
        .bind(&messages)
        .bind(&links)
        .bind(&reads)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() != expected {
            return Err(StoreError::Rejected(format!(
                "{} of {} notifications written",
                result.rows_affected(),
                expected
            )));
        }
        Ok(expected)
    }

    async fn open_escalations(&self, limit: i64) -> Result<Vec<CrisisEscalation>, StoreError> {
        let rows = sqlx::query_as::<_, EscalationRow>(
            r#"
            SELECT id, user_id, trigger_source, severity, trigger_data, status, created_at
            FROM crisis_escalations
            WHERE status = 'open'
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CrisisEscalation::try_from).collect()
    }

    async fn stale_open_escalations(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<CrisisEscalation>, StoreError> {
        let rows = sqlx::query_as::<_, EscalationRow>(
            r#"
            SELECT id, user_id, trigger_source, severity, trigger_data, status, created_at
            FROM crisis_escalations
            WHERE status = 'open' AND created_at < $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(older_than)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CrisisEscalation::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn row(status: &str, trigger_data: Value) -> EscalationRow {
        EscalationRow {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            trigger_source: "manual-flag".to_string(),
            severity: "high".to_string(),
            trigger_data,
            status: status.to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_row_conversion() {
        let escalation =
            CrisisEscalation::try_from(row("open", json!({"score": 21}))).unwrap();
        assert_eq!(escalation.status, EscalationStatus::Open);
        assert_eq!(escalation.trigger_data.get("score"), Some(&json!(21)));

        let escalation = CrisisEscalation::try_from(row("resolved", Value::Null)).unwrap();
        assert_eq!(escalation.status, EscalationStatus::Resolved);
        assert!(escalation.trigger_data.is_empty());
    }

    #[test]
    fn test_row_conversion_rejects_corrupt_rows() {
        assert!(matches!(
            CrisisEscalation::try_from(row("pending", json!({}))),
            Err(StoreError::Corrupt(_))
        ));
        assert!(matches!(
            CrisisEscalation::try_from(row("open", json!([1, 2]))),
            Err(StoreError::Corrupt(_))
        ));
    }

    // Needs a Postgres reachable through DATABASE_URL; run with `--ignored`.
    #[sqlx::test]
    #[ignore]
    async fn test_admin_ids_matches_role_case_insensitively(pool: PgPool) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role)
            VALUES ('a1', 'admin'), ('a2', 'ADMIN'), ('a3', ' Admin '), ('m1', 'MEMBER')
            "#,
        )
        .execute(&pool)
        .await?;

        let store = PgStore::new(pool);
        let mut ids = store.admin_ids().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
        Ok(())
    }
}
