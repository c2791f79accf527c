use std::fmt;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

/// Point-in-time copy of a metric's aggregate fields.
///
/// Field names are the state-file keys, so this struct serialises directly
/// into the persisted layout.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub current: f64,
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub count: u64,
}

#[derive(Debug, Default)]
struct Aggregate {
    current: f64,
    min: f64,
    max: f64,
    average: f64,
    count: u64,
}

/// A named, thread-safe running aggregate over a series of samples.
///
/// One mutex guards all five fields, so a reader never observes a torn
/// update and [`Metric::snapshot`] always returns a consistent tuple.
/// The average folds incrementally (`avg += (v - avg) / count`), keeping
/// memory constant regardless of sample count.
#[derive(Debug)]
pub struct Metric {
    name: String,
    inner: Mutex<Aggregate>,
}

impl Metric {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Aggregate::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fold one sample into the aggregate.
    ///
    /// The first sample seeds `min`, `max` and `current` unconditionally;
    /// later samples only move the extrema outward.
    pub fn record(&self, value: f64) {
        let mut agg = self.lock();
        agg.current = value;
        agg.count += 1;
        if value < agg.min || agg.count == 1 {
            agg.min = value;
        }
        if value > agg.max || agg.count == 1 {
            agg.max = value;
        }
        agg.average += (value - agg.average) / agg.count as f64;
    }

    /// Most recently recorded sample.
    pub fn value(&self) -> f64 {
        self.lock().current
    }

    pub fn min(&self) -> f64 {
        self.lock().min
    }

    pub fn max(&self) -> f64 {
        self.lock().max
    }

    pub fn average(&self) -> f64 {
        self.lock().average
    }

    pub fn count(&self) -> u64 {
        self.lock().count
    }

    /// Copy all five fields under a single lock acquisition.
    pub fn snapshot(&self) -> MetricSnapshot {
        let agg = self.lock();
        MetricSnapshot {
            current: agg.current,
            min: agg.min,
            max: agg.max,
            average: agg.average,
            count: agg.count,
        }
    }

    /// Overwrite the whole aggregate with a previously captured snapshot.
    pub fn restore(&self, snapshot: &MetricSnapshot) {
        let mut agg = self.lock();
        agg.current = snapshot.current;
        agg.min = snapshot.min;
        agg.max = snapshot.max;
        agg.average = snapshot.average;
        agg.count = snapshot.count;
    }

    fn lock(&self) -> MutexGuard<'_, Aggregate> {
        self.inner.lock().expect("metric mutex poisoned")
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let agg = self.lock();
        write!(
            f,
            "{}: current={:.2} min={:.2} max={:.2} average={:.2} count={}",
            self.name, agg.current, agg.min, agg.max, agg.average, agg.count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn record_sequence_tracks_extrema_and_mean() {
        let m = Metric::new("latency");
        for v in [12.0, 4.0, 30.0, 9.0] {
            m.record(v);
        }
        assert_eq!(m.value(), 9.0);
        assert_eq!(m.min(), 4.0);
        assert_eq!(m.max(), 30.0);
        assert_eq!(m.count(), 4);
        assert!((m.average() - 13.75).abs() < 1e-9);
    }

    #[test]
    fn first_sample_seeds_extrema() {
        // A first sample above zero must become the min even though the
        // aggregate starts at 0.0.
        let m = Metric::new("latency");
        m.record(42.0);
        assert_eq!(m.min(), 42.0);
        assert_eq!(m.max(), 42.0);
        assert_eq!(m.value(), 42.0);
        assert_eq!(m.average(), 42.0);
        assert_eq!(m.count(), 1);
    }

    #[test]
    fn negative_first_sample_seeds_max() {
        let m = Metric::new("drift");
        m.record(-5.0);
        assert_eq!(m.max(), -5.0);
        assert_eq!(m.min(), -5.0);
    }

    #[test]
    fn snapshot_restore_round_trip_is_exact() {
        let a = Metric::new("latency");
        for v in [3.5, 1.25, 8.0] {
            a.record(v);
        }

        let b = Metric::new("latency");
        b.restore(&a.snapshot());

        assert_eq!(a.snapshot(), b.snapshot());
        // Further recording continues from the restored aggregate.
        a.record(2.0);
        b.record(2.0);
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn snapshot_serialises_with_state_file_keys() {
        let m = Metric::new("connect-time(ms)");
        m.record(10.0);
        let json = serde_json::to_string(&m.snapshot()).expect("serialize");
        for key in ["current", "min", "max", "average", "count"] {
            assert!(json.contains(key), "missing key {key} in {json}");
        }
    }

    #[test]
    fn concurrent_recording_keeps_count_consistent() {
        let m = Arc::new(Metric::new("latency"));
        let mut handles = Vec::new();
        for t in 0..4 {
            let m = Arc::clone(&m);
            handles.push(std::thread::spawn(move || {
                for i in 0..250 {
                    m.record((t * 250 + i) as f64);
                }
            }));
        }
        for h in handles {
            h.join().expect("recorder thread panicked");
        }
        assert_eq!(m.count(), 1000);
        assert_eq!(m.min(), 0.0);
        assert_eq!(m.max(), 999.0);
    }

    #[test]
    fn display_includes_name_and_fields() {
        let m = Metric::new("connect-time(ms)");
        m.record(12.5);
        let s = m.to_string();
        assert!(s.starts_with("connect-time(ms):"));
        assert!(s.contains("count=1"));
    }
}
