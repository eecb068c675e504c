//! Lease-expiry sweeper.
//!
//! Recovers from a crashed or stalled worker: any `LEASED` row whose
//! `lease_expires_at` has passed is put back through the same retry-policy
//! decision an explicit `FailTask` would make.

use std::time::Duration;

use chrono::Utc;
use db::{repository, DbPool};
use tracing::{error, info, warn};

use crate::scheduler::Scheduler;
use crate::tasks;

/// Run the sweeper loop forever, checking for expired leases every `period`.
pub async fn run(pool: DbPool, scheduler: Scheduler, period: Duration) -> ! {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        if let Err(err) = sweep_once(&pool, &scheduler).await {
            error!(%err, "lease sweep failed");
        }
    }
}

pub(crate) async fn sweep_once(pool: &DbPool, scheduler: &Scheduler) -> Result<(), crate::EngineError> {
    let expired = repository::task_queue::list_expired_leases(pool, Utc::now()).await?;
    if !expired.is_empty() {
        info!(count = expired.len(), "reclaiming expired leases");
    }

    for task in expired {
        let task_id = task.task_id;
        match tasks::fail_task(pool, scheduler, task_id, "lease expired").await {
            Ok(()) => {}
            // The lease may have been completed or re-claimed between the
            // scan and this call — benign, nothing to reclaim anymore.
            Err(crate::EngineError::Queue(queue::QueueError::NotLeased(_))) => {
                warn!(%task_id, "lease already resolved before sweep could act");
            }
            Err(err) => error!(%task_id, %err, "failed to reclaim expired lease"),
        }
    }

    Ok(())
}
