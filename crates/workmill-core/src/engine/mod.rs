pub mod item;
pub mod relation;
pub mod revisions;
pub mod store;
pub mod tracker;


use crate::{
    client::WorkItemClient,
    error::EngineError,
    obs::sink::{EngineEvent, EventSink, GlobalEventSink},
};
use self::tracker::Tracker;
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

// re-exports
pub use item::WorkItem;
pub use relation::{Relation, RelationKind, RelationTarget, Relations};
pub use revisions::Revisions;
pub use store::WorkItemStore;
pub use tracker::{FailedEntry, SaveReport, SavedEntry};

///
/// EngineContext
///
/// Run-scoped engine handle: the client collaborator, the unit-of-work
/// tracker, and session policy (debug tracing, event sink).
///
/// One context serves exactly one logically-sequential rule execution;
/// handles are cheap to clone and share the same run.
///

#[derive(Clone)]
pub struct EngineContext {
    inner: Rc<ContextInner>,
}

pub(crate) struct ContextInner {
    pub(crate) client: Box<dyn WorkItemClient>,
    pub(crate) tracker: RefCell<Tracker>,
    pub(crate) verbose: Cell<bool>,
    pub(crate) sink: RefCell<Option<Rc<dyn EventSink>>>,
}

impl ContextInner {
    pub(crate) fn emit(&self, event: EngineEvent<'_>) {
        match &*self.sink.borrow() {
            Some(sink) => sink.record(event),
            None => GlobalEventSink.record(event),
        }
    }

    pub(crate) fn trace(&self, message: impl FnOnce() -> String) {
        if self.verbose.get() {
            eprintln!("[workmill] {}", message());
        }
    }
}

impl EngineContext {
    #[must_use]
    pub fn new(client: impl WorkItemClient + 'static) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                client: Box::new(client),
                tracker: RefCell::new(Tracker::new()),
                verbose: Cell::new(false),
                sink: RefCell::new(None),
            }),
        }
    }

    /// Enable verbose stderr tracing for this run.
    #[must_use]
    pub fn debug(self) -> Self {
        self.inner.verbose.set(true);
        self
    }

    /// Route engine events to `sink` instead of the process-local
    /// counters.
    #[must_use]
    pub fn event_sink(self, sink: Rc<dyn EventSink>) -> Self {
        *self.inner.sink.borrow_mut() = Some(sink);
        self
    }

    /// Store handle resolving ids and relations inside this run.
    #[must_use]
    pub fn store(&self) -> WorkItemStore {
        WorkItemStore::from_inner(Rc::clone(&self.inner))
    }

    /// Create a brand-new work item for `project` with the given type.
    pub fn new_work_item(
        &self,
        project: impl Into<String>,
        work_item_type: impl Into<String>,
    ) -> Result<WorkItem, EngineError> {
        WorkItem::new_item(&self.inner, project.into(), work_item_type.into())
    }

    /// Create a brand-new work item in the same project as `template`.
    pub fn new_work_item_from(
        &self,
        template: &WorkItem,
        work_item_type: impl Into<String>,
    ) -> Result<WorkItem, EngineError> {
        WorkItem::new_item(&self.inner, template.team_project(), work_item_type.into())
    }

    /// Number of entities the next save would submit.
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.inner.tracker.borrow().pending_count()
    }

    /// Persist every tracked mutation of this run in one batch.
    ///
    /// Full success closes the run. A partial failure or a transport
    /// error leaves the run open with every patch log intact so the
    /// caller can retry.
    pub fn save_changes(&self) -> Result<SaveReport, EngineError> {
        tracker::save_changes(&self.inner)
    }
}
