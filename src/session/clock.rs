use serde::Serialize;

const WARNING_THRESHOLD_SECONDS: u64 = 600;
const CRITICAL_THRESHOLD_SECONDS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TimeUrgency {
    Normal,
    Warning,
    Critical,
}

/// Remaining exam time in whole seconds. Only ever counts down and stops at 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SessionClock {
    remaining: u64,
}

impl SessionClock {
    pub(crate) fn from_minutes(duration_minutes: u32) -> Self {
        Self { remaining: u64::from(duration_minutes) * 60 }
    }

    pub(crate) fn remaining_seconds(&self) -> u64 {
        self.remaining
    }

    pub(crate) fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    /// One-second decrement; returns what is left.
    pub(crate) fn tick(&mut self) -> u64 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    pub(crate) fn urgency(&self) -> TimeUrgency {
        match self.remaining {
            r if r <= CRITICAL_THRESHOLD_SECONDS => TimeUrgency::Critical,
            r if r <= WARNING_THRESHOLD_SECONDS => TimeUrgency::Warning,
            _ => TimeUrgency::Normal,
        }
    }
}
