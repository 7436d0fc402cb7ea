//! Flattening of collected device payloads into facts.
//!
//! A payload is a JSON object of firmware fields. Sensor readings arrive as a
//! Cayenne LPP list, either under `telemetry` (as returned by the device, a
//! bare list or an object carrying `lpp`) or directly under `lpp`, and are
//! stored as `telemetry.{type}.{channel}[.{field}]`.

use super::backend::MetricStore;
use crate::core::{validate_metric_name, NodemeterError, Result, Role, Timestamp};
use serde_json::Value;
use std::collections::BTreeMap;

/// First segment of every flattened sensor key
pub const TELEMETRY_PREFIX: &str = "telemetry";

/// Extracts the numeric top-level fields of a payload.
///
/// Strings, booleans, nulls and nested structures are skipped. Field names
/// must be valid metric identifiers.
pub fn numeric_fields(payload: &Value) -> Result<Vec<(&str, f64)>> {
    let object = payload
        .as_object()
        .ok_or_else(|| NodemeterError::validation("Payload must be a JSON object"))?;

    let mut facts = Vec::with_capacity(object.len());
    for (key, value) in object {
        if let Some(number) = value.as_f64() {
            facts.push((validate_metric_name(key)?, number));
        }
    }
    Ok(facts)
}

/// Finds the LPP reading list in a telemetry response.
///
/// Accepts a bare list or an object whose `lpp` member is a list.
pub fn lpp_readings(telemetry: &Value) -> Option<&[Value]> {
    match telemetry {
        Value::Array(readings) => Some(readings.as_slice()),
        Value::Object(object) => object.get("lpp").and_then(Value::as_array).map(Vec::as_slice),
        _ => None,
    }
}

/// Flattens LPP readings into `telemetry.*` metrics.
///
/// Booleans become 0/1 and compound values (GPS, accelerometer) get one
/// metric per numeric field. Readings without a usable type, with
/// non-numeric values, or that would not form a valid identifier are
/// skipped. A later reading for the same key wins.
pub fn telemetry_fields(readings: &[Value]) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();

    for reading in readings.iter().filter_map(Value::as_object) {
        let Some(sensor) = reading.get("type").and_then(Value::as_str).and_then(key_segment) else {
            continue;
        };
        let channel = reading.get("channel").and_then(Value::as_i64).unwrap_or(0);
        let base = format!("{TELEMETRY_PREFIX}.{sensor}.{channel}");

        match reading.get("value") {
            Some(Value::Object(fields)) => {
                for (field, value) in fields {
                    if let (Some(field), Some(number)) = (key_segment(field), sensor_number(value)) {
                        insert_valid(&mut metrics, format!("{base}.{field}"), number);
                    }
                }
            },
            Some(value) => {
                if let Some(number) = sensor_number(value) {
                    insert_valid(&mut metrics, base, number);
                }
            },
            None => {},
        }
    }

    metrics
}

/// Trimmed, lowercased, spaces to underscores; `None` when blank.
fn key_segment(raw: &str) -> Option<String> {
    let cleaned = raw.trim().to_lowercase().replace(' ', "_");
    (!cleaned.is_empty()).then_some(cleaned)
}

fn sensor_number(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(on) => Some(if *on { 1.0 } else { 0.0 }),
        other => other.as_f64(),
    }
}

fn insert_valid(metrics: &mut BTreeMap<String, f64>, key: String, value: f64) {
    if validate_metric_name(&key).is_ok() {
        metrics.insert(key, value);
    }
}

/// Writes one collection snapshot. Returns how many facts were new.
///
/// Top-level numeric fields and any LPP sensor readings are written in a
/// single batch at `ts`.
pub fn ingest_payload(
    store: &dyn MetricStore,
    role: Role,
    ts: Timestamp,
    payload: &Value,
) -> Result<usize> {
    let mut facts = numeric_fields(payload)?;

    let telemetry = payload.get(TELEMETRY_PREFIX).unwrap_or(payload);
    let sensors = lpp_readings(telemetry).map(telemetry_fields).unwrap_or_default();
    facts.extend(sensors.iter().map(|(key, value)| (key.as_str(), *value)));

    store.insert_facts(role, ts, &facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryMetricStore, MetricSelector};
    use serde_json::json;

    #[test]
    fn test_only_numeric_leaves_are_stored() {
        let store = InMemoryMetricStore::new();
        let payload = json!({
            "bat": 3912,
            "last_rssi": -97.5,
            "name": "hilltop",
            "online": true,
            "nested": { "x": 1 },
            "missing": null
        });

        let inserted = ingest_payload(&store, Role::Repeater, 1_000, &payload).unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(
            store.available_metrics(Role::Repeater).unwrap(),
            vec!["bat".to_string(), "last_rssi".to_string()]
        );
    }

    #[test]
    fn test_reingest_inserts_nothing() {
        let store = InMemoryMetricStore::new();
        let payload = json!({ "nb_recv": 10, "nb_sent": 4 });

        assert_eq!(ingest_payload(&store, Role::Repeater, 60, &payload).unwrap(), 2);
        assert_eq!(ingest_payload(&store, Role::Repeater, 60, &json!({ "nb_recv": 99 })).unwrap(), 0);

        let series = store
            .query_range(Role::Repeater, MetricSelector::Names(&["nb_recv"]), 0, 61)
            .unwrap();
        assert_eq!(series["nb_recv"][0].value, 10.0);
    }

    #[test]
    fn test_rejects_non_object_and_bad_keys() {
        let store = InMemoryMetricStore::new();
        assert!(ingest_payload(&store, Role::Companion, 1, &json!([1, 2])).is_err());
        assert!(ingest_payload(&store, Role::Companion, 1, &json!({ "Bad Key": 1 })).is_err());
        // Non-numeric fields are never validated
        assert_eq!(ingest_payload(&store, Role::Companion, 1, &json!({ "Bad Key": "x" })).unwrap(), 0);
    }

    #[test]
    fn test_lpp_scalars_and_compounds() {
        let readings = json!([
            { "type": "temperature", "channel": 0, "value": 23.5 },
            { "type": " Analog Input ", "channel": 2, "value": 1.25 },
            { "type": "digital_input", "channel": 3, "value": true },
            { "type": "gps", "channel": 1, "value": { "latitude": 51.5, "longitude": -0.1, "fix": false, "name": "x" } },
            { "type": "humidity", "value": 65 }
        ]);

        let metrics = telemetry_fields(lpp_readings(&readings).unwrap());
        let expected: BTreeMap<String, f64> = [
            ("telemetry.analog_input.2", 1.25),
            ("telemetry.digital_input.3", 1.0),
            ("telemetry.gps.1.fix", 0.0),
            ("telemetry.gps.1.latitude", 51.5),
            ("telemetry.gps.1.longitude", -0.1),
            ("telemetry.humidity.0", 65.0),
            ("telemetry.temperature.0", 23.5),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        assert_eq!(metrics, expected);
    }

    #[test]
    fn test_lpp_skips_unusable_readings() {
        let readings = json!([
            "not a reading",
            { "channel": 0, "value": 1.0 },
            { "type": "   ", "value": 1.0 },
            { "type": 7, "value": 1.0 },
            { "type": "temperature", "value": "warm" },
            { "type": "temperature", "channel": "two", "value": 19.0 },
            { "type": "bad-type", "value": 3.0 }
        ]);

        let metrics = telemetry_fields(lpp_readings(&readings).unwrap());
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics["telemetry.temperature.0"], 19.0);
    }

    #[test]
    fn test_lpp_payload_shapes() {
        assert!(lpp_readings(&json!({ "pubkey_pre": "ab12", "lpp": [] })).unwrap().is_empty());
        assert_eq!(lpp_readings(&json!([{ "type": "humidity" }])).map(<[Value]>::len), Some(1));
        assert!(lpp_readings(&json!({ "pubkey_pre": "ab12" })).is_none());
        assert!(lpp_readings(&json!({ "lpp": "nope" })).is_none());
        assert!(lpp_readings(&json!(12.5)).is_none());
    }

    #[test]
    fn test_ingest_merges_telemetry_with_firmware_fields() {
        let store = InMemoryMetricStore::new();
        let payload = json!({
            "battery_mv": 3850,
            "recv": 1234,
            "telemetry": {
                "pubkey_pre": "a1b2c3",
                "lpp": [
                    { "type": "temperature", "channel": 0, "value": 23.5 },
                    { "type": "barometer", "channel": 0, "value": 1013.25 }
                ]
            }
        });

        assert_eq!(ingest_payload(&store, Role::Companion, 1_000, &payload).unwrap(), 4);
        let latest = store.latest(Role::Companion).unwrap().unwrap();
        assert_eq!(latest.values["telemetry.temperature.0"], 23.5);
        assert_eq!(latest.values["telemetry.barometer.0"], 1013.25);
        assert_eq!(latest.values["battery_mv"], 3850.0);

        let bare = json!({ "bat": 3700, "lpp": [{ "type": "humidity", "channel": 1, "value": 40 }] });
        assert_eq!(ingest_payload(&store, Role::Repeater, 1_000, &bare).unwrap(), 2);
        assert_eq!(store.latest(Role::Repeater).unwrap().unwrap().values["telemetry.humidity.1"], 40.0);
    }
}
