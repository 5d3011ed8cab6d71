//! In-process `CrisisStore` used by tests, with per-call failure and delay injection.
use super::{CrisisStore, StoreError};
use crate::domain::models::{
    CrisisEscalation, EscalationStatus, NewCrisisEvent, NewEscalation, NewNotification,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    InsertEscalation,
    InsertEvent,
    AdminIds,
    InsertNotifications,
}

#[derive(Default)]
struct Inner {
    escalations: Vec<CrisisEscalation>,
    events: Vec<(NewCrisisEvent, DateTime<Utc>)>,
    notifications: Vec<NewNotification>,
    admins: Vec<String>,
    failing: Vec<Call>,
    delayed: Vec<(Call, Duration)>,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn with_admins(admins: &[&str]) -> Self {
        let store = Self::default();
        store.inner.lock().unwrap().admins = admins.iter().map(|a| a.to_string()).collect();
        store
    }

    pub fn fail_on(&self, call: Call) {
        self.inner.lock().unwrap().failing.push(call);
    }

    pub fn delay_on(&self, call: Call, delay: Duration) {
        self.inner.lock().unwrap().delayed.push((call, delay));
    }

    pub fn seed_escalation(&self, escalation: CrisisEscalation) {
        self.inner.lock().unwrap().escalations.push(escalation);
    }

    pub fn escalations(&self) -> Vec<CrisisEscalation> {
        self.inner.lock().unwrap().escalations.clone()
    }

    pub fn events(&self) -> Vec<NewCrisisEvent> {
        self.inner
            .lock()
            .unwrap()
            .events
            .iter()
            .map(|(e, _)| e.clone())
            .collect()
    }

    pub fn notifications(&self) -> Vec<NewNotification> {
        self.inner.lock().unwrap().notifications.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    async fn enter(&self, call: Call) -> Result<(), StoreError> {
        let (fail, delay) = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(call);
            let delay = inner
                .delayed
                .iter()
                .find(|(c, _)| *c == call)
                .map(|(_, d)| *d);
            (inner.failing.contains(&call), delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(StoreError::Rejected(format!("injected failure on {:?}", call)));
        }
        Ok(())
    }
}

#[async_trait]
impl CrisisStore for MemoryStore {
    async fn insert_escalation(&self, row: NewEscalation) -> Result<CrisisEscalation, StoreError> {
        self.enter(Call::InsertEscalation).await?;
        let escalation = CrisisEscalation {
            id: row.id,
            user_id: row.user_id,
            trigger_source: row.trigger_source,
            severity: row.severity,
            trigger_data: row.trigger_data,
            status: row.status,
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().escalations.push(escalation.clone());
        Ok(escalation)
    }

    async fn insert_event(&self, row: NewCrisisEvent) -> Result<(), StoreError> {
        self.enter(Call::InsertEvent).await?;
        self.inner.lock().unwrap().events.push((row, Utc::now()));
        Ok(())
    }

    async fn admin_ids(&self) -> Result<Vec<String>, StoreError> {
        self.enter(Call::AdminIds).await?;
        Ok(self.inner.lock().unwrap().admins.clone())
    }

    async fn insert_notifications(&self, rows: Vec<NewNotification>) -> Result<u64, StoreError> {
        self.enter(Call::InsertNotifications).await?;
        let count = rows.len() as u64;
        self.inner.lock().unwrap().notifications.extend(rows);
        Ok(count)
    }

    async fn open_escalations(&self, limit: i64) -> Result<Vec<CrisisEscalation>, StoreError> {
        let mut open: Vec<CrisisEscalation> = self
            .escalations()
            .into_iter()
            .filter(|e| e.status == EscalationStatus::Open)
            .collect();
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        open.truncate(limit.max(0) as usize);
        Ok(open)
    }

    async fn stale_open_escalations(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<CrisisEscalation>, StoreError> {
        let mut stale: Vec<CrisisEscalation> = self
            .escalations()
            .into_iter()
            .filter(|e| e.status == EscalationStatus::Open && e.created_at < older_than)
            .collect();
        stale.sort_by_key(|e| e.created_at);
        Ok(stale)
    }
}
