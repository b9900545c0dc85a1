use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::store::DashboardStore;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_STALENESS_TICK: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleIntervals {
    /// How often auto-refresh fires
    pub refresh: Duration,
    /// How often the staleness counter advances by one
    pub staleness_tick: Duration,
}

impl Default for ScheduleIntervals {
    fn default() -> Self {
        Self {
            refresh: DEFAULT_REFRESH_INTERVAL,
            staleness_tick: DEFAULT_STALENESS_TICK,
        }
    }
}

/// The two periodic tasks that keep a dashboard fresh.
///
/// Both tasks stop when the scheduler is dropped or shut down.
pub struct RefreshScheduler {
    refresh_task: JoinHandle<()>,
    staleness_task: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Spawn both timers on the current tokio runtime
    pub fn spawn(store: Arc<DashboardStore>, intervals: ScheduleIntervals) -> Self {
        tracing::debug!(
            event = "dashboard.schedule.started",
            refresh_ms = intervals.refresh.as_millis() as u64,
            staleness_tick_ms = intervals.staleness_tick.as_millis() as u64,
        );

        let refresh_store = Arc::clone(&store);
        let refresh_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(intervals.refresh);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Skip the first tick (happens immediately)
            ticker.tick().await;

            loop {
                ticker.tick().await;
                refresh_store.auto_refresh_tick().await;
            }
        });

        let staleness_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(intervals.staleness_tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                store.tick_server_time_diff().await;
            }
        });

        Self {
            refresh_task,
            staleness_task,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.refresh_task.is_finished() || !self.staleness_task.is_finished()
    }

    /// Stop both timers and wait for them to wind down
    pub async fn shutdown(mut self) {
        self.refresh_task.abort();
        self.staleness_task.abort();
        let _ = (&mut self.refresh_task).await;
        let _ = (&mut self.staleness_task).await;
        tracing::debug!(event = "dashboard.schedule.stopped");
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.refresh_task.abort();
        self.staleness_task.abort();
    }
}
