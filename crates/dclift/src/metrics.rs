//! Translation counters recorded through the `metrics` facade.
//!
//! Recording is a no-op until a recorder is installed. The CLI installs
//! [`CounterRecorder`] when asked for a summary.

use std::sync::Arc;

use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    describe_counter,
};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Initialize metric descriptions.
///
/// Call this once at startup to register metric descriptions.
pub fn init() {
    describe_counter!(
        "dclift_functions_translated_total",
        Unit::Count,
        "Functions translated and committed"
    );
    describe_counter!(
        "dclift_functions_failed_total",
        Unit::Count,
        "Functions whose translation was aborted"
    );
    describe_counter!(
        "dclift_instructions_translated_total",
        Unit::Count,
        "Native instructions translated"
    );
    describe_counter!(
        "dclift_instructions_trapped_total",
        Unit::Count,
        "Untranslatable instructions replaced by a trap"
    );
    describe_counter!(
        "dclift_call_sites_total",
        Unit::Count,
        "Call sites split into their own block"
    );
}

type CounterStorage = RwLock<FxHashMap<String, u64>>;

struct StoredCounter {
    key: String,
    storage: Arc<CounterStorage>,
}

impl metrics::CounterFn for StoredCounter {
    fn increment(&self, value: u64) {
        *self.storage.write().entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        self.storage.write().insert(self.key.clone(), value);
    }
}

/// In-memory recorder for counters. Gauges and histograms are dropped.
#[derive(Default)]
pub struct CounterRecorder {
    counters: Arc<CounterStorage>,
}

impl CounterRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install as the global recorder. `None` if one is already installed.
    pub fn install(self) -> Option<CounterHandle> {
        let counters = Arc::clone(&self.counters);
        metrics::set_global_recorder(self).ok()?;
        Some(CounterHandle { counters })
    }
}

fn key_to_string(key: &Key) -> String {
    let labels: Vec<String> = key
        .labels()
        .map(|l| format!("{}={}", l.key(), l.value()))
        .collect();
    if labels.is_empty() {
        key.name().to_string()
    } else {
        format!("{}{{{}}}", key.name(), labels.join(","))
    }
}

impl Recorder for CounterRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(StoredCounter {
            key: key_to_string(key),
            storage: Arc::clone(&self.counters),
        }))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

/// Read access to the counters of an installed [`CounterRecorder`].
pub struct CounterHandle {
    counters: Arc<CounterStorage>,
}

impl CounterHandle {
    pub fn get(&self, key: &str) -> Option<u64> {
        self.counters.read().get(key).copied()
    }

    /// Counters sorted by key.
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        let mut all: Vec<_> = self
            .counters
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        all.sort();
        all
    }

    pub fn print_summary(&self) {
        let all = self.snapshot();
        if all.is_empty() {
            println!("No metrics collected.");
            return;
        }
        println!();
        println!("## Metrics Summary");
        println!();
        for (key, value) in all {
            println!("  {key}: {value}");
        }
    }
}
