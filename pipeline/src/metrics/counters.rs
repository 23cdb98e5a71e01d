use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub cycles: Arc<AtomicU64>,
    pub cycles_all_failed: Arc<AtomicU64>,
    pub cycles_timed_out: Arc<AtomicU64>,

    pub source_failures: Arc<AtomicU64>,
    pub parse_failures: Arc<AtomicU64>,
    pub validation_rejections: Arc<AtomicU64>,

    // composites that could not be priced
    pub composites_unavailable: Arc<AtomicU64>,

    pub history_inserted: Arc<AtomicU64>,
    pub history_replaced: Arc<AtomicU64>,
    pub history_write_failures: Arc<AtomicU64>,
}

impl Counters {
    pub fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
