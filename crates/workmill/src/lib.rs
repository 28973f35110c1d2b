//! workmill: a change-tracking rule engine for remote work-item services.
//!
//! ## Crate layout
//! - `core`: the engine runtime. The wrapper records mutations as patch
//!   operations, the tracker batches and orders saves, the store resolves
//!   identities and relations, and revisions walk history lazily.
//!
//! The `prelude` module mirrors the surface rule code uses.
//!
//! ```no_run
//! use workmill::prelude::*;
//! # fn demo(client: impl workmill::core::client::WorkItemClient + 'static)
//! #     -> Result<(), workmill::Error> {
//! let ctx = EngineContext::new(client);
//! let item = ctx.store().get(WorkItemId::permanent(42))?;
//! item.set_title("Fix bug")?;
//! ctx.save_changes()?.require_complete()?;
//! # Ok(())
//! # }
//! ```

pub use workmill_core as core;

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use workmill_core::error::EngineError as Error;

///
/// Rule Prelude
///

pub mod prelude {
    pub use workmill_core::{
        engine::{EngineContext, SaveReport, WorkItemStore},
        prelude::*,
    };
}

///
/// TESTS
///
