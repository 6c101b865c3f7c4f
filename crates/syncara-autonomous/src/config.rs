//! Cadences and thresholds for the autonomous jobs.

use std::time::Duration;

use chrono::Duration as Span;

/// Configuration for [`AutonomousEngine`](crate::AutonomousEngine) and
/// [`AutonomousLoop`](crate::AutonomousLoop).
#[derive(Debug, Clone)]
pub struct AutonomousConfig {
    pub activity_scan_every: Duration,
    pub proactive_sweep_every: Duration,
    pub scheduled_tasks_every: Duration,
    pub chat_health_every: Duration,
    pub optimiser_every: Duration,
    pub channel_tick_every: Duration,

    /// Suggestions must score strictly above this to be sent.
    pub confidence_threshold: f32,
    /// Minimum gap between two proactive messages to one user.
    pub proactive_cooldown: Span,
    /// Activity scan looks at users seen within this window...
    pub active_within: Span,
    /// ...who have been quiet for at least this long.
    pub min_idle: Span,
    pub min_interactions: u64,
    /// Upper bound on sends per assistant per sweep.
    pub max_sweep_sends: usize,
    /// Pause between consecutive sweep sends.
    pub send_delay: Duration,

    pub inactive_min: Span,
    pub inactive_max: Span,
    pub reengage_min_interactions: u64,
    pub reengage_cooldown: Span,

    /// Audit records older than this are purged by the optimiser.
    pub audit_retention: Span,
}

impl Default for AutonomousConfig {
    fn default() -> Self {
        Self {
            activity_scan_every: Duration::from_secs(5 * 60),
            proactive_sweep_every: Duration::from_secs(15 * 60),
            scheduled_tasks_every: Duration::from_secs(60),
            chat_health_every: Duration::from_secs(6 * 60 * 60),
            optimiser_every: Duration::from_secs(2 * 60 * 60),
            channel_tick_every: Duration::from_secs(60),
            confidence_threshold: 0.7,
            proactive_cooldown: Span::hours(12),
            active_within: Span::hours(48),
            min_idle: Span::hours(1),
            min_interactions: 3,
            max_sweep_sends: 3,
            send_delay: Duration::from_secs(30),
            inactive_min: Span::days(7),
            inactive_max: Span::days(30),
            reengage_min_interactions: 5,
            reengage_cooldown: Span::days(7),
            audit_retention: Span::days(30),
        }
    }
}

impl AutonomousConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pause between sweep sends.
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    /// Sets the confidence a suggestion must exceed.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Scales every cadence to `every`; used by tests and dry runs.
    pub fn with_uniform_cadence(mut self, every: Duration) -> Self {
        self.activity_scan_every = every;
        self.proactive_sweep_every = every;
        self.scheduled_tasks_every = every;
        self.chat_health_every = every;
        self.optimiser_every = every;
        self.channel_tick_every = every;
        self
    }
}
