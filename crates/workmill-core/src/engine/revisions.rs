use crate::{
    engine::{item::WorkItem, store::WorkItemStore},
    error::EngineError,
};

///
/// Revisions
///
/// Lazy backward walk over an item's history: revisions N-1 down to 0,
/// one resolution per step, nothing pre-fetched or cached. Single-pass;
/// call `WorkItem::revisions` again to restart.
///
/// A resolution failure yields one `Err` element and terminates the walk.
///

pub struct Revisions {
    store: WorkItemStore,
    id: Option<i64>,
    remaining: u32,
    failed: bool,
}

impl Revisions {
    pub(crate) const fn new(store: WorkItemStore, id: Option<i64>, rev: u32) -> Self {
        Self {
            store,
            id,
            remaining: rev,
            failed: false,
        }
    }
}

impl Iterator for Revisions {
    type Item = Result<WorkItem, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            return None;
        }
        let id = self.id?;

        self.remaining -= 1;
        match self.store.get_revision(id, self.remaining) {
            Ok(item) => Some(Ok(item)),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed || self.id.is_none() {
            return (0, Some(0));
        }
        let len = self.remaining as usize;

        (len, Some(len))
    }
}
