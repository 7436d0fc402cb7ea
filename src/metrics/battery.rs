//! Battery charge derived from cell voltage.
//!
//! Devices only report voltage; the charge level is interpolated on the
//! typical 18650 Li-ion discharge curve (4.20 V full, 3.00 V empty).

use crate::core::{Point, Role};
use crate::metrics::registry::BATTERY_PERCENT;
use std::collections::BTreeMap;

/// (volts, percent), ordered from full to empty
const DISCHARGE_CURVE: [(f64, f64); 12] = [
    (4.20, 100.0),
    (4.06, 90.0),
    (3.98, 80.0),
    (3.92, 70.0),
    (3.87, 60.0),
    (3.82, 50.0),
    (3.79, 40.0),
    (3.77, 30.0),
    (3.74, 20.0),
    (3.68, 10.0),
    (3.45, 5.0),
    (3.00, 0.0),
];

/// Converts a cell voltage to an estimated charge percentage (0-100).
pub fn voltage_to_percentage(voltage: f64) -> f64 {
    if voltage >= DISCHARGE_CURVE[0].0 {
        return 100.0;
    }
    if voltage <= DISCHARGE_CURVE[DISCHARGE_CURVE.len() - 1].0 {
        return 0.0;
    }

    DISCHARGE_CURVE
        .windows(2)
        .find(|w| w[1].0 <= voltage && voltage <= w[0].0)
        .map_or(0.0, |w| {
            let (v_high, p_high) = w[0];
            let (v_low, p_low) = w[1];
            p_low + (voltage - v_low) / (v_high - v_low) * (p_high - p_low)
        })
}

/// Adds the derived charge series next to the role's raw battery series.
///
/// The raw series is in millivolts. Nothing is added when the role has no
/// battery readings in the window.
pub fn derive_battery_percentage(role: Role, series: &mut BTreeMap<String, Vec<Point>>) {
    let derived: Vec<Point> = match series.get(role.battery_field()) {
        Some(raw) if !raw.is_empty() => raw
            .iter()
            .map(|p| Point::new(p.ts, voltage_to_percentage(p.value / 1000.0)))
            .collect(),
        _ => return,
    };
    series.insert(BATTERY_PERCENT.to_string(), derived);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_endpoints() {
        assert_eq!(voltage_to_percentage(4.35), 100.0);
        assert_eq!(voltage_to_percentage(4.20), 100.0);
        assert_eq!(voltage_to_percentage(3.00), 0.0);
        assert_eq!(voltage_to_percentage(2.5), 0.0);
    }

    #[test]
    fn test_curve_knots_and_interpolation() {
        assert!((voltage_to_percentage(3.82) - 50.0).abs() < 1e-9);
        // Halfway between 3.82 (50%) and 3.87 (60%)
        assert!((voltage_to_percentage(3.845) - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_derive_for_repeater() {
        let mut series = BTreeMap::new();
        series.insert("bat".to_string(), vec![Point::new(10, 4200.0), Point::new(20, 3820.0)]);

        derive_battery_percentage(Role::Repeater, &mut series);

        let pct = &series[BATTERY_PERCENT];
        assert_eq!(pct.len(), 2);
        assert_eq!(pct[0], Point::new(10, 100.0));
        assert_eq!(pct[1].ts, 20);
        assert!((pct[1].value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_derive_without_battery_data() {
        let mut series = BTreeMap::new();
        series.insert("battery_mv".to_string(), Vec::new());

        derive_battery_percentage(Role::Companion, &mut series);
        assert!(!series.contains_key(BATTERY_PERCENT));

        // Companion readings are ignored for the repeater
        series.insert("battery_mv".to_string(), vec![Point::new(1, 4000.0)]);
        derive_battery_percentage(Role::Repeater, &mut series);
        assert!(!series.contains_key(BATTERY_PERCENT));
    }
}
