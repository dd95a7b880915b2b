use chrono::{DateTime, Utc};

use crate::constants::{JUST_NOW_STR, SECONDS_IN_DAY, SECONDS_IN_HOUR, SECONDS_IN_MINUTE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimeScale {
    Minutes,
    Hours,
    Days,
}

impl TimeScale {
    fn to_str(self, is_plural: bool) -> &'static str {
        match (self, is_plural) {
            (TimeScale::Minutes, false) => "minute",
            (TimeScale::Minutes, true) => "minutes",
            (TimeScale::Hours, false) => "hour",
            (TimeScale::Hours, true) => "hours",
            (TimeScale::Days, false) => "day",
            (TimeScale::Days, true) => "days",
        }
    }
}

/// Human-relative duration between `timestamp` and `now`, such as "5 minutes ago".
///
/// Timestamps less than a minute old, or in the future, are "just now".
pub fn get_elapsed_time_string(
    timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
) -> String {
    let seconds = now.signed_duration_since(timestamp).num_seconds();
    let (count, time_scale) = match seconds {
        seconds if seconds < SECONDS_IN_MINUTE => return String::from(JUST_NOW_STR),
        seconds if seconds < SECONDS_IN_HOUR => (seconds / SECONDS_IN_MINUTE, TimeScale::Minutes),
        seconds if seconds < SECONDS_IN_DAY => (seconds / SECONDS_IN_HOUR, TimeScale::Hours),
        seconds => (seconds / SECONDS_IN_DAY, TimeScale::Days),
    };
    format!("{} {} ago", count, time_scale.to_str(count > 1))
}
