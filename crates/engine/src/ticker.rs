//! Timer tick loop.
//!
//! `TIMER` nodes have no worker: once ready, the scheduler stamps
//! `not_before_at` and leaves the row self-fired (`requires_worker = false`).
//! This loop polls for due rows, fires them `DONE`, and advances the
//! owning execution — surviving a restart because `not_before_at` and the
//! row itself are both persisted.

use std::time::Duration;

use chrono::Utc;
use db::{repository, DbPool};
use serde_json::json;
use tracing::{error, info};

use crate::scheduler::Scheduler;

/// Run the timer tick loop forever, firing due timers every `period`.
pub async fn run(pool: DbPool, scheduler: Scheduler, period: Duration) -> ! {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        if let Err(err) = tick_once(&pool, &scheduler).await {
            error!(%err, "timer tick failed");
        }
    }
}

pub(crate) async fn tick_once(pool: &DbPool, scheduler: &Scheduler) -> Result<(), crate::EngineError> {
    let now = Utc::now();
    let due = repository::task_queue::list_due_timers(pool, now).await?;
    if !due.is_empty() {
        info!(count = due.len(), "firing due timers");
    }

    for timer in due {
        let output_json = json!({ "fired_at": now }).to_string();

        let mut tx = pool.begin().await.map_err(db::DbError::from)?;
        let fired = repository::task_queue::fire_timer(&mut *tx, timer.task_id, &output_json).await?;
        let Some(fired) = fired else {
            // Already fired by a previous tick — nothing to commit.
            tx.rollback().await.map_err(db::DbError::from)?;
            continue;
        };
        repository::executions::set_completed_node(&mut *tx, fired.execution_id, &fired.node_id, &output_json)
            .await?;
        tx.commit().await.map_err(db::DbError::from)?;

        scheduler.advance(fired.execution_id).await?;
    }

    Ok(())
}
