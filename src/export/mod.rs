//! JSON export of reports and chart statistics.
//!
//! Documents borrow the summaries they wrap, so exporting never clones the
//! statistics.

use crate::charts::{ChartStatsTable, RoleCharts};
use crate::core::{Config, Result, Role, Timestamp};
use crate::reports::{MonthlySummary, YearlySummary};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where the monitored node is installed
#[derive(Debug, Clone, Serialize)]
pub struct NodeInfo<'a> {
    /// Display name
    pub name: &'a str,
    /// Node role
    pub role: Role,
    /// Installation site
    pub location: &'a str,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Elevation in meters
    pub elevation_m: f64,
}

impl<'a> NodeInfo<'a> {
    /// Node details from the report configuration
    pub fn from_config(config: &'a Config, role: Role) -> Self {
        Self {
            name: config.display_name(role),
            role,
            location: &config.report.location_name,
            latitude: config.report.latitude,
            longitude: config.report.longitude,
            elevation_m: config.report.elevation_m,
        }
    }
}

/// Report kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    /// One calendar month
    Monthly,
    /// One calendar year
    Yearly,
}

/// Envelope written for a monthly or yearly report
#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument<'a, T: Serialize> {
    /// Period covered
    pub report_type: ReportType,
    /// When the document was produced
    pub generated_at: DateTime<Utc>,
    /// Node the report describes
    pub node: NodeInfo<'a>,
    /// Days holding at least one snapshot
    pub days_with_data: usize,
    /// The summary itself, flattened into the envelope
    #[serde(flatten)]
    pub body: &'a T,
}

impl<'a> ReportDocument<'a, MonthlySummary> {
    /// Wraps a monthly summary
    pub fn monthly(
        summary: &'a MonthlySummary,
        config: &'a Config,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            report_type: ReportType::Monthly,
            generated_at,
            node: NodeInfo::from_config(config, summary.role),
            days_with_data: summary.days_with_data(),
            body: summary,
        }
    }
}

impl<'a> ReportDocument<'a, YearlySummary> {
    /// Wraps a yearly summary
    pub fn yearly(
        summary: &'a YearlySummary,
        config: &'a Config,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            report_type: ReportType::Yearly,
            generated_at,
            node: NodeInfo::from_config(config, summary.role),
            days_with_data: summary.days_with_data(),
            body: summary,
        }
    }
}

/// Chart statistics sidecar for one role
#[derive(Debug, Clone, Serialize)]
pub struct ChartStatsDocument {
    /// Node role
    pub role: Role,
    /// Exclusive end of every chart window
    pub end: Timestamp,
    /// Statistics keyed by metric then period
    pub stats: ChartStatsTable,
}

impl From<&RoleCharts> for ChartStatsDocument {
    fn from(charts: &RoleCharts) -> Self {
        Self {
            role: charts.role,
            end: charts.end,
            stats: charts.stats_table(),
        }
    }
}

/// Pretty-printed JSON for any exportable document
pub fn to_json<T: Serialize + ?Sized>(document: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::{MetricSummary, SummaryMap};
    use chrono::TimeZone;
    use serde_json::Value;

    fn empty_month() -> MonthlySummary {
        MonthlySummary {
            role: Role::Repeater,
            year: 2024,
            month: 2,
            daily: Vec::new(),
            summary: SummaryMap::from([("nb_recv".to_string(), MetricSummary::Counter(None))]),
        }
    }

    #[test]
    fn test_monthly_document_shape() {
        let config = Config::default();
        let month = empty_month();
        let generated_at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let json = to_json(&ReportDocument::monthly(&month, &config, generated_at)).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["report_type"], "monthly");
        assert_eq!(value["node"]["name"], "Repeater Node");
        assert_eq!(value["node"]["role"], "repeater");
        assert_eq!(value["year"], 2024);
        assert_eq!(value["month"], 2);
        assert_eq!(value["days_with_data"], 0);
        assert_eq!(value["summary"]["nb_recv"]["kind"], "counter");
        assert!(value["summary"]["nb_recv"]["stats"].is_null());
    }

    #[test]
    fn test_yearly_document_counts_days() {
        let config = Config::default();
        let year = YearlySummary {
            role: Role::Companion,
            year: 2024,
            monthly: vec![empty_month()],
            summary: SummaryMap::new(),
        };

        let json = to_json(&ReportDocument::yearly(&year, &config, Utc::now())).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["report_type"], "yearly");
        assert_eq!(value["monthly"].as_array().map(Vec::len), Some(1));
    }
}
