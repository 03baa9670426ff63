//! Rolling weekly window and the "at least one trade per week" flag.
//!
//! The window is derived from the clock and the flag from the ledger, so
//! rollover happens exactly once per window no matter how often the engine
//! runs inside it.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Configuration from which each week's `WeeklyTarget` is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklySchedule {
    /// Fractional growth pursued per week (0.05 = 5%).
    pub growth_target: f64,
    /// Weekday (00:00 UTC) on which a new window opens.
    pub anchor: Weekday,
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self {
            growth_target: 0.05,
            anchor: Weekday::Mon,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTarget {
    growth_target: f64,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    trade_already_satisfied: bool,
}

impl WeeklyTarget {
    /// Builds the target for the window containing `now`.
    pub fn derive(now: DateTime<Utc>, schedule: &WeeklySchedule, trade_already_satisfied: bool) -> Self {
        let window_start = window_start(now, schedule.anchor);
        Self {
            growth_target: schedule.growth_target,
            window_start,
            window_end: window_start + Duration::days(7),
            trade_already_satisfied,
        }
    }

    pub fn growth_target(&self) -> f64 {
        self.growth_target
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }

    pub fn window_end(&self) -> DateTime<Utc> {
        self.window_end
    }

    pub fn trade_already_satisfied(&self) -> bool {
        self.trade_already_satisfied
    }

    pub fn mark_satisfied(&mut self) {
        self.trade_already_satisfied = true;
    }

    /// Half-open membership: `[start, end)`.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.window_start && at < self.window_end
    }

    /// Weekdays left in the window strictly after the calendar day of `now`.
    pub fn business_days_remaining(&self, now: DateTime<Utc>) -> u32 {
        if now >= self.window_end {
            return 0;
        }
        let last_day = (self.window_end - Duration::days(1)).date_naive();
        let mut day = now.date_naive();
        let mut remaining = 0;
        while day < last_day {
            day = day.succ_opt().unwrap_or(last_day);
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                remaining += 1;
            }
        }
        remaining
    }

    /// True once at most one business day is left before the window closes.
    pub fn closes_within_one_business_day(&self, now: DateTime<Utc>) -> bool {
        self.contains(now) && self.business_days_remaining(now) <= 1
    }
}

fn window_start(now: DateTime<Utc>, anchor: Weekday) -> DateTime<Utc> {
    let days_back = (now.weekday().num_days_from_monday() + 7 - anchor.num_days_from_monday()) % 7;
    let midnight = now
        - Duration::seconds(i64::from(now.num_seconds_from_midnight()))
        - Duration::nanoseconds(i64::from(now.nanosecond()));
    midnight - Duration::days(i64::from(days_back))
}
