use crate::db::{CrisisStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

/// Logs every escalation still open past `stale_after`. Read-only: nothing is
/// re-sent, so an admin has to pick these up from the open-escalation listing.
pub async fn log_stale_escalations(
    store: &dyn CrisisStore,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> Result<usize, StoreError> {
    let stale = store.stale_open_escalations(now - stale_after).await?;

    for escalation in &stale {
        tracing::warn!(
            escalation_id = %escalation.id,
            user_id = %escalation.user_id,
            severity = %escalation.severity,
            open_minutes = (now - escalation.created_at).num_minutes(),
            "Crisis escalation still open"
        );
    }

    Ok(stale.len())
}

pub async fn start(
    store: Arc<dyn CrisisStore>,
    cron: &str,
    stale_after: Duration,
) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    scheduler
        .add(Job::new_async(cron, move |_uuid, _l| {
            let store = store.clone();
            Box::pin(async move {
                match log_stale_escalations(store.as_ref(), Utc::now(), stale_after).await {
                    Ok(0) => tracing::debug!("No stale crisis escalations"),
                    Ok(count) => tracing::warn!("{} crisis escalations open past threshold", count),
                    Err(e) => tracing::error!("Open escalation sweep failed: {}", e),
                }
            })
        })?)
        .await?;

    scheduler.start().await?;
    tracing::info!("Open escalation sweep scheduled ({})", cron);
    Ok(scheduler)
}
