use chrono::{DateTime, Duration, Utc};

/// Decides when the user stopped paying attention to the active tab. Without a threshold nobody
/// is ever idle.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleEvaluator {
    threshold: Option<Duration>,
}

impl IdleEvaluator {
    pub fn new(threshold: Option<Duration>) -> Self {
        Self { threshold }
    }

    pub fn from_seconds(threshold_s: u32) -> Self {
        Self::new(Some(Duration::seconds(threshold_s.into())))
    }

    /// Moment after which an active span stops accruing time.
    pub fn deadline(&self, last_activity: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        Some(last_activity? + self.threshold?)
    }

    pub fn is_idle(&self, last_activity: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        self.deadline(last_activity)
            .is_some_and(|deadline| deadline < now)
    }
}
