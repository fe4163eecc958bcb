use chrono::{DateTime, Utc};
use serde::Serialize;

/// Time left until (or past) a borrowed item's return time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub overdue: bool,
    pub label: String,
}

impl Countdown {
    /// Compute the countdown from `now` to `return_time`
    pub fn until(return_time: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let diff = return_time - now;
        let overdue = diff.num_milliseconds() <= 0;
        let total_minutes = diff.num_minutes().unsigned_abs();

        let days = total_minutes / (60 * 24);
        let hours = (total_minutes / 60) % 24;
        let mins = total_minutes % 60;

        let label = if days > 0 {
            format!("{}d {}h {}m", days, hours, mins)
        } else {
            format!("{}h {}m", hours, mins)
        };

        Self { overdue, label }
    }

    pub fn display(&self) -> String {
        if self.overdue {
            format!("OVERDUE BY: {}", self.label)
        } else {
            format!("DUE IN: {}", self.label)
        }
    }
}
