//! Roles, points and metric identifiers.

use crate::core::error::{NodemeterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unix timestamp in whole seconds.
pub type Timestamp = i64;

/// Maximum length of a metric identifier in bytes
pub const MAX_METRIC_NAME_LEN: usize = 64;

/// One of the two monitored devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The locally attached node
    Companion,
    /// The remote repeater queried over the mesh
    Repeater,
}

impl Role {
    /// All roles in a stable order
    pub const ALL: [Role; 2] = [Role::Companion, Role::Repeater];

    /// Returns the string representation stored alongside each fact
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Companion => "companion",
            Role::Repeater => "repeater",
        }
    }

    /// Firmware field carrying the battery voltage in millivolts
    pub fn battery_field(&self) -> &'static str {
        match self {
            Role::Companion => "battery_mv",
            Role::Repeater => "bat",
        }
    }
}

impl FromStr for Role {
    type Err = NodemeterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "companion" => Ok(Role::Companion),
            "repeater" => Ok(Role::Repeater),
            other => Err(NodemeterError::validation(format!(
                "Invalid role: {:?}. Must be one of companion, repeater",
                other
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates a metric identifier.
///
/// Identifiers are firmware field names or flattened sensor keys such as
/// `telemetry.temperature.0`: dot-separated segments of lowercase ASCII
/// letters, digits and underscores. No segment may be empty.
pub fn validate_metric_name(name: &str) -> Result<&str> {
    if name.is_empty() {
        return Err(NodemeterError::validation("Metric name cannot be empty"));
    }
    if name.len() > MAX_METRIC_NAME_LEN {
        return Err(NodemeterError::validation(format!(
            "Metric name cannot exceed {} characters, got {}",
            MAX_METRIC_NAME_LEN,
            name.len()
        )));
    }
    let well_formed = name.split('.').all(|segment| {
        !segment.is_empty()
            && segment
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    });
    if !well_formed {
        return Err(NodemeterError::validation(format!("Malformed metric name: {:?}", name)));
    }
    Ok(name)
}

/// A (timestamp, value) pair flowing through normalization, binning and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Seconds since the Unix epoch
    pub ts: Timestamp,
    /// Sample, rate or bin mean depending on the producing stage
    pub value: f64,
}

impl Point {
    /// Creates a point
    pub fn new(ts: Timestamp, value: f64) -> Self {
        Self { ts, value }
    }
}

impl From<(Timestamp, f64)> for Point {
    fn from((ts, value): (Timestamp, f64)) -> Self {
        Self { ts, value }
    }
}

/// Sorts points by timestamp unless they already are.
///
/// The sort is stable, so equal timestamps keep their relative order.
pub(crate) fn ensure_ascending(points: &mut [Point]) {
    if points.windows(2).any(|w| w[0].ts > w[1].ts) {
        points.sort_by_key(|p| p.ts);
    }
}
