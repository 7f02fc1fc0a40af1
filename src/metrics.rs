//! Counters of which execution path each vectorizable operation took.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathUsage {
    pub operation: &'static str,
    pub element_type: &'static str,
    /// `scalar` or a vector level label such as `avx2`.
    pub path: &'static str,
    pub count: u64,
}

type PathKey = (&'static str, &'static str, &'static str);

fn usage_map() -> &'static Mutex<HashMap<PathKey, u64>> {
    static COUNTS: OnceLock<Mutex<HashMap<PathKey, u64>>> = OnceLock::new();
    COUNTS.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn record_path(operation: &'static str, element_type: &'static str, path: &'static str) {
    if let Ok(mut guard) = usage_map().lock() {
        let entry = guard.entry((operation, element_type, path)).or_insert(0);
        *entry = entry.saturating_add(1);
    }
}

/// Current counters, sorted for stable output.
pub fn snapshot() -> Vec<PathUsage> {
    let mut usage: Vec<PathUsage> = usage_map()
        .lock()
        .map(|guard| {
            guard
                .iter()
                .map(|(&(operation, element_type, path), &count)| PathUsage {
                    operation,
                    element_type,
                    path,
                    count,
                })
                .collect()
        })
        .unwrap_or_default();
    usage.sort_by_key(|entry| (entry.operation, entry.element_type, entry.path));
    usage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_per_key() {
        record_path("metrics_sample", "float64", "scalar");
        record_path("metrics_sample", "float64", "scalar");
        record_path("metrics_sample", "float32", "scalar");
        let usage = snapshot();
        let f64_count = usage
            .iter()
            .find(|entry| entry.operation == "metrics_sample" && entry.element_type == "float64")
            .map(|entry| entry.count);
        assert_eq!(f64_count, Some(2));
        assert!(usage
            .iter()
            .any(|entry| entry.operation == "metrics_sample" && entry.element_type == "float32"));
    }
}
