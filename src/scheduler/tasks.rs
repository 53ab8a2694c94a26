use std::sync::Arc;

use chrono::Local;
use tracing::{error, info, warn};

use crate::composer::Composer;
use crate::platform::{ChatSender, OutgoingMessage};
use crate::scheduler::{DailySchedule, Scheduler};

/// The daily question broadcast: compose and send to every target chat.
pub struct BroadcastJob {
    composer: Arc<Composer>,
    sender: Arc<dyn ChatSender>,
    targets: Vec<i64>,
}

impl BroadcastJob {
    pub fn new(composer: Arc<Composer>, sender: Arc<dyn ChatSender>, targets: Vec<i64>) -> Self {
        Self {
            composer,
            sender,
            targets,
        }
    }

    /// One firing. Failures are logged per target and never escape.
    pub async fn fire(&self) {
        for &chat_id in &self.targets {
            let text = self.composer.compose_broadcast().await;
            match self.sender.send(OutgoingMessage::html(chat_id, text)).await {
                Ok(()) => info!("Daily question sent to chat {}", chat_id),
                Err(e) => error!("Failed to send daily question to chat {}: {:#}", chat_id, e),
            }
        }
    }
}

/// Register one cron job per daily time, all sharing the same broadcast job
pub async fn register_broadcast_jobs(
    scheduler: &Scheduler,
    schedule: &DailySchedule,
    job: Arc<BroadcastJob>,
) -> anyhow::Result<()> {
    if job.targets.is_empty() {
        warn!("No broadcast chat configured; daily question is disabled");
        return Ok(());
    }
    if schedule.is_empty() {
        warn!("No broadcast times configured; daily question is disabled");
        return Ok(());
    }

    for time in schedule.times() {
        let job = job.clone();
        scheduler
            .add_cron_job(
                &time.cron_expression(),
                &format!("daily-question-{time}"),
                move || {
                    let job = job.clone();
                    Box::pin(async move { job.fire().await })
                },
            )
            .await?;
    }

    if let Some(next) = schedule.next_after(Local::now().naive_local()) {
        info!("Next daily question at {}", next.format("%Y-%m-%d %H:%M"));
    }

    Ok(())
}
