//! Process-wide metric classification and display metadata.
//!
//! The registry is built once on first use and is read-only afterwards, so
//! every stage dispatches on [`MetricKind`] through the same lookup instead of
//! scattering per-metric conditionals.

use crate::core::Role;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a metric's raw value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Meaningful on its own at any instant (voltage, RSSI)
    Gauge,
    /// Monotonically non-decreasing since boot, meaningful only as a delta
    Counter,
}

/// Value transform applied before any statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Millivolts to volts
    MillivoltsToVolts,
}

impl Transform {
    /// Applies the transform to a raw value
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Transform::MillivoltsToVolts => value / 1000.0,
        }
    }
}

/// Display and interpretation metadata for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricDef {
    /// Human readable name
    pub label: &'static str,
    /// Display unit after scaling
    pub unit: &'static str,
    /// Gauge or counter
    pub kind: MetricKind,
    /// Multiplier applied to the display value (rates are per second before scaling)
    pub scale: f64,
    /// Conversion applied to raw values before anything else
    pub transform: Option<Transform>,
    /// Fixed chart y-axis range, in display units
    pub y_range: Option<(f64, f64)>,
}

impl MetricDef {
    fn gauge(label: &'static str, unit: &'static str) -> Self {
        Self {
            label,
            unit,
            kind: MetricKind::Gauge,
            scale: 1.0,
            transform: None,
            y_range: None,
        }
    }

    fn per_minute(label: &'static str, unit: &'static str) -> Self {
        Self {
            label,
            unit,
            kind: MetricKind::Counter,
            scale: 60.0,
            transform: None,
            y_range: None,
        }
    }

    fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    fn millivolts(mut self) -> Self {
        self.transform = Some(Transform::MillivoltsToVolts);
        self
    }

    fn y_range(mut self, min: f64, max: f64) -> Self {
        self.y_range = Some((min, max));
        self
    }

    /// Applies the configured transform, if any
    pub fn transform_value(&self, value: f64) -> f64 {
        match self.transform {
            Some(t) => t.apply(value),
            None => value,
        }
    }
}

/// Name of the battery charge metric derived from voltage at query time
pub const BATTERY_PERCENT: &str = "bat_pct";

const SECONDS_PER_DAY: f64 = 86_400.0;

static REGISTRY: Lazy<HashMap<&'static str, MetricDef>> = Lazy::new(|| {
    HashMap::from([
        // Companion
        ("battery_mv", MetricDef::gauge("Battery Voltage", "V").millivolts().y_range(3.0, 4.2)),
        ("uptime_secs", MetricDef::gauge("System Uptime", "days").scaled(1.0 / SECONDS_PER_DAY)),
        ("contacts", MetricDef::gauge("Known Contacts", "")),
        ("recv", MetricDef::per_minute("Total Packets Received", "/min")),
        ("sent", MetricDef::per_minute("Total Packets Sent", "/min")),
        // Repeater
        ("bat", MetricDef::gauge("Battery Voltage", "V").millivolts().y_range(3.0, 4.2)),
        ("uptime", MetricDef::gauge("System Uptime", "days").scaled(1.0 / SECONDS_PER_DAY)),
        ("last_rssi", MetricDef::gauge("Signal Strength (RSSI)", "dBm")),
        ("last_snr", MetricDef::gauge("Signal-to-Noise Ratio", "dB")),
        ("noise_floor", MetricDef::gauge("RF Noise Floor", "dBm")),
        ("tx_queue_len", MetricDef::gauge("Transmit Queue Depth", "")),
        ("nb_recv", MetricDef::per_minute("Total Packets Received", "/min")),
        ("nb_sent", MetricDef::per_minute("Total Packets Sent", "/min")),
        ("airtime", MetricDef::per_minute("Transmit Airtime", "s/min")),
        ("rx_airtime", MetricDef::per_minute("Receive Airtime", "s/min")),
        ("flood_dups", MetricDef::per_minute("Flood Duplicates Dropped", "/min")),
        ("direct_dups", MetricDef::per_minute("Direct Duplicates Dropped", "/min")),
        ("sent_flood", MetricDef::per_minute("Flood Packets Sent", "/min")),
        ("recv_flood", MetricDef::per_minute("Flood Packets Received", "/min")),
        ("sent_direct", MetricDef::per_minute("Direct Packets Sent", "/min")),
        ("recv_direct", MetricDef::per_minute("Direct Packets Received", "/min")),
        // Derived
        (BATTERY_PERCENT, MetricDef::gauge("Charge Level", "%").y_range(0.0, 100.0)),
    ])
});

const COMPANION_CHART_METRICS: &[&str] =
    &["battery_mv", BATTERY_PERCENT, "uptime_secs", "contacts", "recv", "sent"];

const REPEATER_CHART_METRICS: &[&str] = &[
    "bat",
    BATTERY_PERCENT,
    "last_rssi",
    "last_snr",
    "noise_floor",
    "uptime",
    "tx_queue_len",
    "nb_recv",
    "nb_sent",
    "airtime",
    "rx_airtime",
    "flood_dups",
    "direct_dups",
    "sent_flood",
    "recv_flood",
    "sent_direct",
    "recv_direct",
];

const COMPANION_REPORT_METRICS: &[&str] =
    &["battery_mv", BATTERY_PERCENT, "contacts", "uptime_secs", "recv", "sent"];

const REPEATER_REPORT_METRICS: &[&str] = &[
    "bat",
    BATTERY_PERCENT,
    "last_rssi",
    "last_snr",
    "uptime",
    "noise_floor",
    "tx_queue_len",
    "nb_recv",
    "nb_sent",
    "airtime",
    "rx_airtime",
    "flood_dups",
    "direct_dups",
    "sent_flood",
    "recv_flood",
    "sent_direct",
    "recv_direct",
];

/// Looks up a metric definition
pub fn metric_def(metric: &str) -> Option<&'static MetricDef> {
    REGISTRY.get(metric)
}

/// Classification of a metric; unregistered metrics are gauges
pub fn metric_kind(metric: &str) -> MetricKind {
    metric_def(metric).map_or(MetricKind::Gauge, |def| def.kind)
}

/// True for counter metrics
pub fn is_counter(metric: &str) -> bool {
    metric_kind(metric) == MetricKind::Counter
}

/// Display scale factor, 1.0 when unregistered
pub fn metric_scale(metric: &str) -> f64 {
    metric_def(metric).map_or(1.0, |def| def.scale)
}

/// Applies the metric's transform to a raw value
pub fn transform_value(metric: &str, value: f64) -> f64 {
    metric_def(metric).map_or(value, |def| def.transform_value(value))
}

/// Human readable label, falling back to the metric name
pub fn metric_label(metric: &str) -> &str {
    metric_def(metric).map_or(metric, |def| def.label)
}

/// Metrics charted for a role, in display order
pub fn chart_metrics(role: Role) -> &'static [&'static str] {
    match role {
        Role::Companion => COMPANION_CHART_METRICS,
        Role::Repeater => REPEATER_CHART_METRICS,
    }
}

/// Metrics summarized in reports for a role
pub fn report_metrics(role: Role) -> &'static [&'static str] {
    match role {
        Role::Companion => COMPANION_REPORT_METRICS,
        Role::Repeater => REPEATER_REPORT_METRICS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_classification() {
        assert!(is_counter("nb_recv"));
        assert!(is_counter("airtime"));
        assert!(is_counter("recv"));
        assert!(!is_counter("bat"));
        assert!(!is_counter(BATTERY_PERCENT));
        assert_eq!(metric_kind("not_registered"), MetricKind::Gauge);
    }

    #[test]
    fn test_scale_and_transform() {
        assert_eq!(metric_scale("nb_sent"), 60.0);
        assert_eq!(metric_scale("bat"), 1.0);
        assert_eq!(metric_scale("unknown"), 1.0);
        assert_eq!(transform_value("bat", 3850.0), 3.85);
        assert_eq!(transform_value("last_rssi", -92.0), -92.0);
        assert!((metric_scale("uptime") * 86_400.0 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_labels() {
        assert_eq!(metric_label("noise_floor"), "RF Noise Floor");
        assert_eq!(metric_label("mystery"), "mystery");
    }

    #[test]
    fn test_every_listed_metric_is_registered() {
        for role in Role::ALL {
            for metric in chart_metrics(role).iter().chain(report_metrics(role)) {
                assert!(metric_def(metric).is_some(), "{metric} missing from registry");
            }
            assert!(chart_metrics(role).contains(&role.battery_field()));
        }
    }
}
