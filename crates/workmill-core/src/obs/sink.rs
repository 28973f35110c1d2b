//! Event sink boundary.
//!
//! Engine code MUST NOT depend on `obs::metrics` directly.
//! All instrumentation flows through [`EngineEvent`] and [`EventSink`];
//! this module is the only bridge into the global counter state.

use crate::obs::metrics;

///
/// EngineEvent
///
/// One instrumentation event emitted by the engine.
///

#[derive(Clone, Copy, Debug)]
pub enum EngineEvent<'a> {
    ItemLoaded { id: i64 },
    RevisionLoaded { id: i64, rev: u32 },
    ItemCreated,
    FieldSet { field: &'a str },
    RelationAdded { rel: &'a str },
    SaveStart { pending: usize },
    SaveFinish { saved: usize, rejected: usize },
}

///
/// EventSink
///

pub trait EventSink {
    fn record(&self, event: EngineEvent<'_>);
}

///
/// GlobalEventSink
/// Default process-local sink that writes into the global counter state.
/// Used when a run has no sink installed on its context.
///

pub(crate) struct GlobalEventSink;

impl EventSink for GlobalEventSink {
    fn record(&self, event: EngineEvent<'_>) {
        metrics::with_state_mut(|m| match event {
            EngineEvent::ItemLoaded { .. } => {
                m.items_loaded = m.items_loaded.saturating_add(1);
            }
            EngineEvent::RevisionLoaded { .. } => {
                m.revisions_loaded = m.revisions_loaded.saturating_add(1);
            }
            EngineEvent::ItemCreated => {
                m.items_created = m.items_created.saturating_add(1);
            }
            EngineEvent::FieldSet { .. } => {
                m.fields_set = m.fields_set.saturating_add(1);
            }
            EngineEvent::RelationAdded { .. } => {
                m.relations_added = m.relations_added.saturating_add(1);
            }
            EngineEvent::SaveStart { .. } => {
                m.save_calls = m.save_calls.saturating_add(1);
            }
            EngineEvent::SaveFinish { saved, rejected } => {
                m.items_saved = m.items_saved.saturating_add(saved as u64);
                m.items_rejected = m.items_rejected.saturating_add(rejected as u64);
            }
        });
    }
}

///
/// TESTS
///
