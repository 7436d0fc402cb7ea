//! Chart series built from stored facts.

mod common;

use common::{all_backends, utc, Seeder};
use nodemeter_lib::charts::{calendar_year_bounds, ChartPeriod, ChartSeriesBuilder, SeriesRequest};
use nodemeter_lib::core::{ConfigBuilder, Role};
use nodemeter_lib::metrics::registry::chart_metrics;
use nodemeter_lib::metrics::BATTERY_PERCENT;
use nodemeter_lib::storage::InMemoryMetricStore;
use pretty_assertions::assert_eq;
use std::time::Duration;

#[test]
fn test_week_view_bins_sixty_one_minutes_into_three_points() {
    let store = InMemoryMetricStore::new();
    // Starts on a 30 minute boundary
    let start = utc(2024, 5, 6, 10, 0);
    Seeder::new(&store, Role::Companion).series("contacts", start, 60, 62, |i| i as f64);

    let request = SeriesRequest::new(Role::Companion, "contacts", ChartPeriod::Week, start + 86_400);
    let series = ChartSeriesBuilder::new(&store).build_series(&request).unwrap();

    let ts: Vec<_> = series.points.iter().map(|p| p.ts).collect();
    assert_eq!(ts, vec![start + 900, start + 2_700, start + 4_500]);

    let stats = series.stats.unwrap();
    assert_eq!(stats.min, 14.5);
    assert_eq!(stats.max, 60.5);
    assert_eq!(stats.current, 60.5);
}

#[test]
fn test_counter_reset_is_dropped_not_negative() {
    for backend in all_backends() {
        let store = backend.store.as_ref();
        let start = utc(2024, 5, 6, 0, 0);
        Seeder::new(store, Role::Companion).series("recv", start, 60, 5, |i| {
            [100.0, 150.0, 200.0, 50.0, 90.0][i]
        });

        let request = SeriesRequest::new(Role::Companion, "recv", ChartPeriod::Day, start + 3_600);
        let series = ChartSeriesBuilder::new(store).build_series(&request).unwrap();

        let ts: Vec<_> = series.points.iter().map(|p| p.ts).collect();
        assert_eq!(ts, vec![start + 60, start + 120, start + 240], "{}", backend.name);
        assert_eq!(series.reboot_count, 1);
        // Per-minute scale with one-minute spacing gives the raw deltas
        let values: Vec<_> = series.points.iter().map(|p| p.value.round()).collect();
        assert_eq!(values, vec![50.0, 50.0, 40.0]);
    }
}

#[test]
fn test_counter_rates_never_negative() {
    let store = InMemoryMetricStore::new();
    let start = utc(2024, 8, 1, 0, 0);
    // Sawtooth with a reboot every 13 samples
    Seeder::new(&store, Role::Repeater).series("nb_sent", start, 900, 400, |i| ((i % 13) * 7) as f64);

    for period in ChartPeriod::ALL {
        let request = SeriesRequest::new(Role::Repeater, "nb_sent", period, start + 400 * 900);
        let series = ChartSeriesBuilder::new(&store).build_series(&request).unwrap();
        assert!(series.points.iter().all(|p| p.value >= 0.0), "{period}");
    }
}

#[test]
fn test_jittered_counter_samples_are_ignored() {
    let store = InMemoryMetricStore::new();
    let start = utc(2024, 8, 1, 0, 0);
    Seeder::new(&store, Role::Companion).points(
        "sent",
        &[(start, 0.0), (start + 5, 100.0), (start + 60, 60.0), (start + 120, 120.0)],
    );

    let config = ConfigBuilder::new().companion_step(Duration::from_secs(60)).build().unwrap();
    let request = SeriesRequest::new(Role::Companion, "sent", ChartPeriod::Day, start + 3_600);
    let series = ChartSeriesBuilder::with_config(&store, &config).build_series(&request).unwrap();

    // The sample 5 s in is jitter, so no reboot is seen
    assert_eq!(series.reboot_count, 0);
    let values: Vec<_> = series.points.iter().map(|p| p.value.round()).collect();
    assert_eq!(values, vec![60.0, 60.0]);
}

#[test]
fn test_role_charts_cover_every_metric_and_period() {
    let store = InMemoryMetricStore::new();
    let end = utc(2024, 9, 1, 0, 0);
    Seeder::new(&store, Role::Repeater)
        .series("bat", end - 7_200, 900, 8, |_| 3_820.0)
        .series("nb_recv", end - 7_200, 900, 8, |i| (i * 30) as f64);

    let charts = ChartSeriesBuilder::new(&store).build_role_charts(Role::Repeater, end).unwrap();
    let metrics = chart_metrics(Role::Repeater);
    assert_eq!(charts.series.len(), metrics.len() * ChartPeriod::ALL.len());

    let table = charts.stats_table();
    assert_eq!(table.len(), metrics.len());

    let pct = table[BATTERY_PERCENT][&ChartPeriod::Day].unwrap();
    assert!((pct.current - 50.0).abs() < 1e-9);
    assert_eq!(table["last_snr"][&ChartPeriod::Month], None);

    let recv = charts.get("nb_recv", ChartPeriod::Day).unwrap();
    assert_eq!(recv.points.len(), 7);
    assert!(recv.points.iter().all(|p| (p.value - 2.0).abs() < 1e-9));
    assert!(charts.get("flood_dups", ChartPeriod::Year).unwrap().is_empty());
}

#[test]
fn test_year_view_padded_to_calendar_year() {
    let store = InMemoryMetricStore::new();
    let end = utc(2024, 3, 1, 0, 0);
    Seeder::new(&store, Role::Repeater)
        .points("last_rssi", &[(utc(2024, 1, 10, 12, 0), -90.0), (utc(2024, 2, 10, 12, 0), -100.0)]);

    let (year_start, year_end) = calendar_year_bounds(2024).unwrap();
    let request = SeriesRequest::new(Role::Repeater, "last_rssi", ChartPeriod::Year, end)
        .with_x_range(year_start, year_end);
    let series = ChartSeriesBuilder::new(&store).build_series(&request).unwrap();

    // Daily bins stamped at noon
    assert_eq!(series.points[0].ts, utc(2024, 1, 10, 12, 0));
    let bounds = series.bounds.unwrap();
    assert_eq!((bounds.x_start, bounds.x_end), (year_start, year_end));
    assert_eq!((bounds.y_min, bounds.y_max), (-101.0, -89.0));
}
