//! Chart periods: lookback windows and bin widths.

use crate::core::{NodemeterError, Result, Timestamp};
use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chart time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartPeriod {
    /// Last 24 hours, raw points
    Day,
    /// Last 7 days, 30 minute bins
    Week,
    /// Last 31 days, 2 hour bins
    Month,
    /// Last 365 days, daily bins
    Year,
}

impl ChartPeriod {
    /// Every period, shortest first
    pub const ALL: [ChartPeriod; 4] =
        [ChartPeriod::Day, ChartPeriod::Week, ChartPeriod::Month, ChartPeriod::Year];

    /// Lowercase name used in file names and JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartPeriod::Day => "day",
            ChartPeriod::Week => "week",
            ChartPeriod::Month => "month",
            ChartPeriod::Year => "year",
        }
    }

    /// Length of the window ending at the chart's reference time, in seconds
    pub fn lookback_secs(&self) -> i64 {
        const DAY: i64 = 86_400;
        match self {
            ChartPeriod::Day => DAY,
            ChartPeriod::Week => 7 * DAY,
            ChartPeriod::Month => 31 * DAY,
            ChartPeriod::Year => 365 * DAY,
        }
    }

    /// Bucket width used to thin the series, `None` for raw points
    pub fn bin_width_secs(&self) -> Option<u32> {
        match self {
            ChartPeriod::Day => None,
            ChartPeriod::Week => Some(1_800),
            ChartPeriod::Month => Some(7_200),
            ChartPeriod::Year => Some(86_400),
        }
    }
}

impl FromStr for ChartPeriod {
    type Err = NodemeterError;

    fn from_str(s: &str) -> Result<Self> {
        ChartPeriod::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                NodemeterError::validation(format!(
                    "Invalid period: {:?}. Must be one of day, week, month, year",
                    s
                ))
            })
    }
}

impl fmt::Display for ChartPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[Jan 1, next Jan 1)` of a UTC calendar year, for padding yearly charts.
pub fn calendar_year_bounds(year: i32) -> Result<(Timestamp, Timestamp)> {
    let start = |y: i32| {
        NaiveDate::from_ymd_opt(y, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Utc.from_utc_datetime(&dt).timestamp())
            .ok_or_else(|| NodemeterError::validation(format!("Year out of range: {}", y)))
    };
    Ok((start(year)?, start(year + 1)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parameters() {
        assert_eq!(ChartPeriod::Day.bin_width_secs(), None);
        assert_eq!(ChartPeriod::Week.bin_width_secs(), Some(1_800));
        assert_eq!(ChartPeriod::Month.bin_width_secs(), Some(7_200));
        assert_eq!(ChartPeriod::Year.bin_width_secs(), Some(86_400));
        assert_eq!(ChartPeriod::Month.lookback_secs(), 31 * 86_400);
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("week".parse::<ChartPeriod>().unwrap(), ChartPeriod::Week);
        assert!("fortnight".parse::<ChartPeriod>().is_err());
    }

    #[test]
    fn test_leap_year_bounds() {
        let (start, end) = calendar_year_bounds(2024).unwrap();
        assert_eq!(start, 1_704_067_200);
        assert_eq!(end - start, 366 * 86_400);
    }
}
