use chrono::{Duration, TimeZone, Utc};
use farescore::baseline::{BaselineTracker, RouteKey, StopsBucket};
use farescore::model::Offer;

fn priced(prices: &[f64]) -> Vec<Offer> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &price)| Offer {
            id: i.to_string(),
            price,
            currency: "USD".into(),
            segments: Vec::new(),
            total_duration_minutes: 0,
            stops: 0,
            cabin: "ECONOMY".into(),
            airlines: Vec::new(),
            deep_link: None,
        })
        .collect()
}

fn key() -> RouteKey {
    RouteKey::new("LAX", "NRT", "ECONOMY", StopsBucket::Direct)
}

#[test]
fn route_key_is_uppercased() {
    let k = RouteKey::new("lax", "nrt", "premium_economy", StopsBucket::One);
    assert_eq!(k.as_str(), "LAX-NRT-PREMIUM_ECONOMY-ONE");
    assert_eq!(k.to_string(), "LAX-NRT-PREMIUM_ECONOMY-ONE");
}

#[test]
fn stops_bucket_from_count() {
    assert_eq!(StopsBucket::from_stops(0), StopsBucket::Direct);
    assert_eq!(StopsBucket::from_stops(1), StopsBucket::One);
    assert_eq!(StopsBucket::from_stops(2), StopsBucket::Any);
    assert_eq!(StopsBucket::from_stops(5), StopsBucket::Any);
    assert!(StopsBucket::from_str_loose("Direct").is_ok());
    assert!(StopsBucket::from_str_loose("two").is_err());
}

#[test]
fn empty_route_has_no_baseline() {
    let tracker = BaselineTracker::default();
    assert_eq!(tracker.median_baseline(&key()), None);
    assert!(tracker.read_price_history(&key(), 60, Utc::now()).is_empty());
}

#[test]
fn median_of_odd_window() {
    let tracker = BaselineTracker::default();
    tracker.record_snapshots(&key(), &priced(&[300.0, 100.0, 200.0]), Utc::now());
    assert_eq!(tracker.median_baseline(&key()), Some(200.0));
}

#[test]
fn median_of_even_window_is_mean_of_middle_pair() {
    let tracker = BaselineTracker::default();
    tracker.record_snapshots(&key(), &priced(&[100.0, 200.0]), Utc::now());
    assert_eq!(tracker.median_baseline(&key()), Some(150.0));
}

#[test]
fn zero_prices_are_recorded() {
    let tracker = BaselineTracker::default();
    tracker.record_snapshots(&key(), &priced(&[0.0, 0.0, 90.0]), Utc::now());
    assert_eq!(tracker.median_baseline(&key()), Some(0.0));
}

#[test]
fn window_keeps_the_newest_entries() {
    let tracker = BaselineTracker::default();
    assert_eq!(tracker.capacity(), 200);

    let first: Vec<f64> = (0..150).map(|i| i as f64).collect();
    let second: Vec<f64> = (150..250).map(|i| i as f64).collect();
    let now = Utc::now();
    tracker.record_snapshots(&key(), &priced(&first), now);
    tracker.record_snapshots(&key(), &priced(&second), now);

    let rows = tracker.read_price_history(&key(), 1, now);
    assert_eq!(rows.len(), 200);
    assert_eq!(rows.first().map(|s| s.price), Some(50.0));
    assert_eq!(rows.last().map(|s| s.price), Some(249.0));
}

#[test]
fn record_returns_the_appended_batch() {
    let tracker = BaselineTracker::new(2);
    let now = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
    let batch = tracker.record_snapshots(&key(), &priced(&[1.0, 2.0, 3.0]), now);
    assert_eq!(batch.len(), 3);
    assert!(batch.iter().all(|s| s.collected_at == now));
    assert_eq!(tracker.read_price_history(&key(), 1, now).len(), 2);
}

#[test]
fn routes_are_independent() {
    let tracker = BaselineTracker::default();
    let other = RouteKey::new("LAX", "NRT", "ECONOMY", StopsBucket::One);
    tracker.record_snapshots(&key(), &priced(&[100.0]), Utc::now());
    tracker.record_snapshots(&other, &priced(&[900.0]), Utc::now());
    assert_eq!(tracker.median_baseline(&key()), Some(100.0));
    assert_eq!(tracker.median_baseline(&other), Some(900.0));
    assert_eq!(tracker.route_count(), 2);
}

#[test]
fn history_respects_day_cutoff() {
    let tracker = BaselineTracker::default();
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
    tracker.record_snapshots(&key(), &priced(&[100.0]), now - Duration::days(90));
    tracker.record_snapshots(&key(), &priced(&[200.0]), now - Duration::days(10));
    tracker.record_snapshots(&key(), &priced(&[300.0]), now);

    let recent = tracker.read_price_history(&key(), 30, now);
    let prices: Vec<f64> = recent.iter().map(|s| s.price).collect();
    assert_eq!(prices, vec![200.0, 300.0]);

    let all = tracker.read_price_history(&key(), u32::MAX, now);
    assert_eq!(all.len(), 3);
}

#[test]
fn concurrent_records_keep_batches_whole() {
    let tracker = std::sync::Arc::new(BaselineTracker::new(1_000));
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let tracker = std::sync::Arc::clone(&tracker);
            std::thread::spawn(move || {
                for _ in 0..10 {
                    tracker.record_snapshots(&key(), &priced(&[t as f64; 5]), Utc::now());
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let rows = tracker.read_price_history(&key(), 1, Utc::now());
    assert_eq!(rows.len(), 400);
    for chunk in rows.chunks(5) {
        assert!(chunk.iter().all(|s| s.price == chunk[0].price));
    }
}
