//! Cooperative scheduler for the autonomous jobs.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::AutonomousConfig;
use crate::engine::{AutonomousEngine, JobSummary};
use crate::error::Result;

/// The cadenced jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    ActivityScan,
    ProactiveSweep,
    ScheduledTasks,
    ChatHealth,
    LearningOptimiser,
    ChannelPoster,
}

impl Job {
    pub const ALL: [Job; 6] = [
        Self::ActivityScan,
        Self::ProactiveSweep,
        Self::ScheduledTasks,
        Self::ChatHealth,
        Self::LearningOptimiser,
        Self::ChannelPoster,
    ];

    pub fn cadence(self, config: &AutonomousConfig) -> Duration {
        match self {
            Self::ActivityScan => config.activity_scan_every,
            Self::ProactiveSweep => config.proactive_sweep_every,
            Self::ScheduledTasks => config.scheduled_tasks_every,
            Self::ChatHealth => config.chat_health_every,
            Self::LearningOptimiser => config.optimiser_every,
            Self::ChannelPoster => config.channel_tick_every,
        }
    }

    /// Runs one iteration of this job.
    pub async fn run(self, engine: &AutonomousEngine) -> Result<JobSummary> {
        match self {
            Self::ActivityScan => engine.activity_scan().await,
            Self::ProactiveSweep => engine.proactive_sweep().await,
            Self::ScheduledTasks => engine.run_scheduled_tasks().await,
            Self::ChatHealth => engine.chat_health().await,
            Self::LearningOptimiser => engine.optimise_learning().await,
            Self::ChannelPoster => engine.channel_tick().await,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ActivityScan => "activity_scan",
            Self::ProactiveSweep => "proactive_sweep",
            Self::ScheduledTasks => "scheduled_tasks",
            Self::ChatHealth => "chat_health",
            Self::LearningOptimiser => "learning_optimiser",
            Self::ChannelPoster => "channel_poster",
        };
        f.write_str(s)
    }
}

/// Runs every [`Job`] as its own task until shut down.
///
/// Each task waits one cadence before its first iteration. A failing
/// iteration is logged and the job carries on. [`shutdown`](Self::shutdown)
/// flips the run flag; every task exits at its next wake-up.
pub struct AutonomousLoop {
    engine: Arc<AutonomousEngine>,
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl AutonomousLoop {
    pub fn new(engine: Arc<AutonomousEngine>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            engine,
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn engine(&self) -> &Arc<AutonomousEngine> {
        &self.engine
    }

    /// Spawns the job tasks. Calling it again while running is a no-op.
    pub async fn start(&self) {
        let mut handles = self.handles.lock().await;
        if !handles.is_empty() || *self.shutdown_tx.borrow() {
            return;
        }
        for job in Job::ALL {
            let engine = self.engine.clone();
            let shutdown = self.shutdown_tx.subscribe();
            handles.push(tokio::spawn(run_job(job, engine, shutdown)));
        }
        info!(jobs = handles.len(), "Autonomous loop started");
    }

    pub async fn is_running(&self) -> bool {
        !self.handles.lock().await.is_empty() && !*self.shutdown_tx.borrow()
    }

    /// Signals every job to stop and waits for them to exit.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handles: Vec<_> = self.handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Autonomous job task panicked");
            }
        }
        info!("Autonomous loop stopped");
    }
}

async fn run_job(job: Job, engine: Arc<AutonomousEngine>, mut shutdown: watch::Receiver<bool>) {
    let cadence = job.cadence(engine.config());
    let mut ticker = interval_at(Instant::now() + cadence, cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(%job, cadence_ms = cadence.as_millis() as u64, "Starting job");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if *shutdown.borrow() {
                    break;
                }
                match job.run(&engine).await {
                    Ok(summary) if summary != JobSummary::default() => {
                        debug!(%job, ?summary, "Job iteration complete");
                    }
                    Ok(_) => {}
                    Err(e) => warn!(%job, error = %e, "Job iteration failed"),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!(%job, "Job stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cadences_follow_config() {
        let config = AutonomousConfig::default();
        assert_eq!(Job::ScheduledTasks.cadence(&config), Duration::from_secs(60));
        assert_eq!(Job::ChatHealth.cadence(&config), Duration::from_secs(6 * 3600));
        assert_eq!(Job::ALL.len(), 6);
        assert_eq!(Job::LearningOptimiser.to_string(), "learning_optimiser");
    }
}
