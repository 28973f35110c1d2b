use crate::{
    engine::{ContextInner, EngineContext, item::WorkItem, relation::Relation},
    error::EngineError,
    identity::WorkItemId,
};
use std::rc::Rc;

///
/// WorkItemStore
///
/// Stateless resolver turning identities and relations into materialized
/// wrappers through the client collaborator. Every wrapper it produces
/// registers with the run's tracker.
///
/// The store performs no caching: repeated resolution of the same id
/// re-fetches. Consistency over cleverness; the collaborator may batch
/// underneath as long as observable results are unchanged.
///

pub struct WorkItemStore {
    ctx: Rc<ContextInner>,
}

impl WorkItemStore {
    #[must_use]
    pub fn new(ctx: &EngineContext) -> Self {
        ctx.store()
    }

    pub(crate) const fn from_inner(ctx: Rc<ContextInner>) -> Self {
        Self { ctx }
    }

    /// Resolve an identity into a tracked wrapper.
    ///
    /// Temporary identities resolve to the already-registered sibling of
    /// this run; permanent identities fetch the current record.
    pub fn get(&self, id: WorkItemId) -> Result<WorkItem, EngineError> {
        match id {
            WorkItemId::Temporary(_) => {
                let state = self
                    .ctx
                    .tracker
                    .borrow()
                    .find_registered(id)
                    .ok_or_else(|| EngineError::store_not_found(id))?;

                Ok(WorkItem::from_state(&self.ctx, state))
            }
            WorkItemId::Permanent(raw) => {
                self.ctx.trace(|| format!("store fetch id={raw}"));
                let record = self.ctx.client.fetch(raw)?;

                WorkItem::from_record(&self.ctx, record)
            }
        }
    }

    /// Resolve the work item a relation points at.
    pub fn get_relation(&self, relation: &Relation) -> Result<WorkItem, EngineError> {
        let id = relation.target_id().ok_or_else(|| {
            EngineError::store_unresolvable(format!(
                "relation '{}' has no work item target",
                relation.kind
            ))
        })?;

        self.get(id)
    }

    /// Resolve a set of relations into the corresponding work items.
    pub fn get_many<'a>(
        &self,
        relations: impl IntoIterator<Item = &'a Relation>,
    ) -> Result<Vec<WorkItem>, EngineError> {
        relations
            .into_iter()
            .map(|relation| self.get_relation(relation))
            .collect()
    }

    /// Resolve one historical revision as a read-only wrapper.
    pub(crate) fn get_revision(&self, id: i64, rev: u32) -> Result<WorkItem, EngineError> {
        self.ctx.trace(|| format!("store fetch id={id} rev={rev}"));
        let record = self.ctx.client.fetch_revision(id, rev, true)?;

        WorkItem::from_revision_record(&self.ctx, record)
    }
}
