use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::service::SignalService;

/// Fixed-period driver of live evaluations.
pub struct Scheduler {
    service: Arc<SignalService>,
}

impl Scheduler {
    pub fn new(service: Arc<SignalService>) -> Self {
        Self { service }
    }

    /// Evaluate the session context every `period`, starting immediately.
    /// Runs until the task is aborted. Ticks that fall due while an
    /// evaluation is still running are skipped, never queued.
    pub async fn run(self, period: Duration) {
        info!(period_secs = period.as_secs(), "Live scheduler started");
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.service.tick().await;
        }
    }
}
