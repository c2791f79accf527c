use std::collections::BTreeMap;
use std::sync::Arc;

use crate::metric::{Metric, MetricSnapshot};

/// The fixed set of named metrics owned by one task.
///
/// Membership is decided when the task is constructed and never changes
/// afterwards; recording stays thread-safe through the individual
/// [`Metric`]s. A `BTreeMap` keeps iteration (and therefore persisted
/// output) in stable name order.
#[derive(Debug, Default)]
pub struct MetricSet {
    metrics: BTreeMap<String, Arc<Metric>>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set containing one zeroed metric per name.
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for name in names {
            let name = name.into();
            set.metrics
                .insert(name.clone(), Arc::new(Metric::new(name)));
        }
        set
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Metric>> {
        self.metrics.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Metric>)> {
        self.metrics.iter().map(|(name, m)| (name.as_str(), m))
    }

    /// Snapshot every metric, keyed by name.
    pub fn snapshot(&self) -> BTreeMap<String, MetricSnapshot> {
        self.metrics
            .iter()
            .map(|(name, m)| (name.clone(), m.snapshot()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_names_builds_zeroed_metrics() {
        let set = MetricSet::with_names(["a", "b"]);
        assert_eq!(set.len(), 2);
        let a = set.get("a").expect("metric a");
        assert_eq!(a.count(), 0);
        assert!(set.get("missing").is_none());
    }

    #[test]
    fn snapshot_keys_follow_name_order() {
        let set = MetricSet::with_names(["zeta", "alpha"]);
        set.get("zeta").expect("metric zeta").record(1.0);
        let snaps = set.snapshot();
        let keys: Vec<_> = snaps.keys().cloned().collect();
        assert_eq!(keys, vec!["alpha".to_string(), "zeta".to_string()]);
        assert_eq!(snaps["zeta"].count, 1);
        assert_eq!(snaps["alpha"].count, 0);
    }
}
