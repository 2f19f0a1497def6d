//! Acquisition date windows for Sentinel-2 requests.

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default lookback. Sentinel-2 revisits every ~5 days.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 3;

/// Longest lookback accepted from configuration (about ten years).
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

/// An inclusive range of UTC calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// `[end - lookback_days, end]`, with the start clamped to the earliest
    /// representable date.
    pub fn ending_at(end: NaiveDate, lookback_days: u32) -> Self {
        let start = end
            .checked_sub_days(Days::new(lookback_days as u64))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// Window ending today (UTC).
    pub fn recent(lookback_days: u32) -> Self {
        Self::ending_at(Utc::now().date_naive(), lookback_days)
    }

    /// WMS `TIME` parameter form: `YYYY-MM-DD/YYYY-MM-DD`.
    pub fn to_wms_time(&self) -> String {
        format!(
            "{}/{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wms_time())
    }
}
