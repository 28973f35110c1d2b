use serde::Serialize;
use std::cell::RefCell;

thread_local! {
    static STATE: RefCell<MetricsReport> = RefCell::new(MetricsReport::default());
}

///
/// MetricsReport
///
/// Process-local engine counters. Counters saturate instead of wrapping.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct MetricsReport {
    pub items_loaded: u64,
    pub revisions_loaded: u64,
    pub items_created: u64,
    pub fields_set: u64,
    pub relations_added: u64,
    pub save_calls: u64,
    pub items_saved: u64,
    pub items_rejected: u64,
}

pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut MetricsReport) -> R) -> R {
    STATE.with_borrow_mut(f)
}

pub(crate) fn report() -> MetricsReport {
    STATE.with_borrow(|state| *state)
}

pub(crate) fn reset() {
    STATE.with_borrow_mut(|state| *state = MetricsReport::default());
}
