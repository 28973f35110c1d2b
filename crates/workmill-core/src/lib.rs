//! Core runtime for workmill: the work-item wrapper, the unit-of-work
//! tracker, patch generation, and the ergonomics exported via the
//! `prelude`.
//!
//! A run wraps remote work items behind mutable façades, records every
//! mutation as a patch operation, and persists exactly those mutations in
//! one ordered batch through a narrow client trait.
#![warn(unreachable_pub)]

pub mod client;
pub mod engine;
pub mod error;
pub mod fields;
pub mod identity;
pub mod obs;
pub mod patch;
pub mod types;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, clients, sinks, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        engine::{Relation, RelationKind, WorkItem},
        identity::WorkItemId,
        types::Timestamp,
        value::FieldValue,
    };
}
