use crate::{
    client::{SaveFailure, SaveOutcome, SaveRequest},
    engine::{
        ContextInner,
        item::ItemState,
        relation::{RelationKind, RelationTarget},
    },
    error::{EngineError, ErrorClass, ErrorOrigin},
    fields,
    identity::WorkItemId,
    obs::sink::EngineEvent,
    patch::{PatchDocument, PatchOperation},
    value::FieldValue,
};
use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

type StateCell = Rc<RefCell<ItemState>>;

///
/// Phase
///
/// Run lifecycle: Open accepts registrations and mutations, Saving admits
/// neither, Closed means the run is complete and the registry discarded.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Phase {
    Open,
    Saving,
    Closed,
}

///
/// Tracker
///
/// Run-scoped unit of work. Every wrapper registers here on construction;
/// the registry is consulted once at save time and discarded with the
/// run.
///

pub(crate) struct Tracker {
    pub(crate) phase: Phase,
    counter: u32,
    pub(crate) new_items: Vec<StateCell>,
    pub(crate) existing: Vec<StateCell>,
    revisions: Vec<StateCell>,
}

impl Tracker {
    pub(crate) const fn new() -> Self {
        Self {
            phase: Phase::Open,
            counter: 0,
            new_items: Vec::new(),
            existing: Vec::new(),
            revisions: Vec::new(),
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<(), EngineError> {
        match self.phase {
            Phase::Open => Ok(()),
            Phase::Saving => Err(EngineError::phase(
                "run is saving; no new registrations are permitted",
            )),
            Phase::Closed => Err(EngineError::phase("run is closed")),
        }
    }

    /// Next temporary identity; the counter is scoped to this run.
    pub(crate) fn next_temporary(&mut self) -> WorkItemId {
        self.counter += 1;

        WorkItemId::temporary(self.counter)
    }

    pub(crate) fn track_new(&mut self, state: StateCell) {
        self.new_items.push(state);
    }

    pub(crate) fn track_existing(&mut self, state: StateCell) {
        self.existing.push(state);
    }

    pub(crate) fn track_revision(&mut self, state: StateCell) {
        self.revisions.push(state);
    }

    /// Look up a registered entity by identity value. Revision wrappers
    /// are excluded; they are invisible to resolution and save alike.
    pub(crate) fn find_registered(&self, id: WorkItemId) -> Option<StateCell> {
        self.new_items
            .iter()
            .chain(&self.existing)
            .find(|cell| cell.borrow().id == id)
            .cloned()
    }

    /// Number of entities the next save would submit.
    pub(crate) fn pending_count(&self) -> usize {
        if self.phase != Phase::Open {
            return 0;
        }

        self.new_items.len()
            + self
                .existing
                .iter()
                .filter(|cell| cell.borrow().dirty)
                .count()
    }

    fn close(&mut self) {
        self.phase = Phase::Closed;
        self.new_items.clear();
        self.existing.clear();
        self.revisions.clear();
    }
}

///
/// SavedEntry
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SavedEntry {
    /// Identity the entity was submitted under.
    pub submitted: WorkItemId,
    /// Server-assigned permanent id.
    pub assigned: i64,
    /// Revision after the save.
    pub rev: u32,
}

///
/// FailedEntry
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FailedEntry {
    pub id: WorkItemId,
    pub reason: SaveFailure,
}

impl FailedEntry {
    /// Per-entity error form of this rejection.
    #[must_use]
    pub fn to_error(&self) -> EngineError {
        let class = match self.reason {
            SaveFailure::ConcurrencyConflict => ErrorClass::Conflict,
            SaveFailure::Validation(_) => ErrorClass::Validation,
            SaveFailure::NotFound => ErrorClass::NotFound,
        };

        EngineError::new(
            class,
            ErrorOrigin::Tracker,
            format!("work item {}: {}", self.id, self.reason),
        )
    }
}

///
/// SaveReport
///
/// Per-entity outcome of one save batch. Rejections do not abort the
/// batch; callers decide whether to retry or abandon the failed entities.
///

#[derive(Debug, Default)]
pub struct SaveReport {
    pub saved: Vec<SavedEntry>,
    pub failed: Vec<FailedEntry>,
}

impl SaveReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Convert a partial outcome into an error carrying this report.
    pub fn require_complete(self) -> Result<Self, EngineError> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(EngineError::partial_failure(self))
        }
    }
}

/// Persist every pending entity of the run in one batch.
///
/// New entities are submitted parents-first; the collaborator resolves
/// temporary ids inside the batch. On success the returned mapping is
/// applied to each entity's identity slot and to every still-pending
/// relation target in the run. A transport error restores the pre-save
/// state so the whole save can be retried.
pub(crate) fn save_changes(ctx: &Rc<ContextInner>) -> Result<SaveReport, EngineError> {
    let pending = {
        let mut tracker = ctx.tracker.borrow_mut();
        tracker.ensure_open()?;
        tracker.phase = Phase::Saving;

        let mut pending = order_new(&tracker.new_items);
        pending.extend(
            tracker
                .existing
                .iter()
                .filter(|cell| cell.borrow().dirty)
                .cloned(),
        );
        pending
    };

    if pending.is_empty() {
        ctx.tracker.borrow_mut().close();
        return Ok(SaveReport::default());
    }

    let requests = match build_requests(&pending) {
        Ok(requests) => requests,
        Err(err) => {
            ctx.tracker.borrow_mut().phase = Phase::Open;
            return Err(err);
        }
    };

    ctx.emit(EngineEvent::SaveStart {
        pending: requests.len(),
    });
    ctx.trace(|| format!("save start: {} pending entities", requests.len()));

    let outcomes = match ctx.client.save_batch(&requests) {
        Ok(outcomes) => outcomes,
        Err(err) => {
            // Nothing was applied; reopen so the caller can retry the
            // whole save with every patch log intact.
            ctx.tracker.borrow_mut().phase = Phase::Open;
            return Err(err.into());
        }
    };

    if outcomes.len() != requests.len() {
        ctx.tracker.borrow_mut().phase = Phase::Open;
        return Err(EngineError::client_invariant(format!(
            "save batch returned {} outcomes for {} requests",
            outcomes.len(),
            requests.len()
        )));
    }

    let mut report = SaveReport::default();
    let mut rewrites: BTreeMap<WorkItemId, i64> = BTreeMap::new();
    let mut graduated: Vec<StateCell> = Vec::new();

    for (cell, outcome) in pending.iter().zip(&outcomes) {
        let submitted = cell.borrow().id;
        if outcome.id() != submitted {
            ctx.tracker.borrow_mut().phase = Phase::Open;
            return Err(EngineError::client_invariant(format!(
                "save outcome for {} does not match submitted identity {submitted}",
                outcome.id()
            )));
        }

        match outcome {
            SaveOutcome::Saved { assigned, rev, .. } => {
                if submitted.is_temporary() {
                    rewrites.insert(submitted, *assigned);
                    graduated.push(Rc::clone(cell));
                }

                let mut state = cell.borrow_mut();
                state.id = WorkItemId::permanent(*assigned);
                state.rev = *rev;
                state.dirty = false;
                state.persisted_relations = state.relations.len();
                state
                    .fields
                    .insert(fields::ID.to_string(), FieldValue::Int(*assigned));

                // The entity is persisted now; restart the log with a
                // fresh revision guard.
                state.document = PatchDocument::new();
                state
                    .document
                    .push(PatchOperation::test(fields::REV_PATH, i64::from(*rev)));

                report.saved.push(SavedEntry {
                    submitted,
                    assigned: *assigned,
                    rev: *rev,
                });
            }
            SaveOutcome::Rejected { reason, .. } => {
                report.failed.push(FailedEntry {
                    id: submitted,
                    reason: reason.clone(),
                });
            }
        }
    }

    apply_rewrites(ctx, &rewrites);

    {
        let mut tracker = ctx.tracker.borrow_mut();
        if report.is_complete() {
            tracker.close();
        } else {
            // Reopen for retry: failed entities stay where they are,
            // saved new entities graduate to the existing set.
            tracker.phase = Phase::Open;
            tracker
                .new_items
                .retain(|cell| !graduated.iter().any(|saved| Rc::ptr_eq(saved, cell)));
            tracker.existing.extend(graduated);
        }
    }

    ctx.emit(EngineEvent::SaveFinish {
        saved: report.saved.len(),
        rejected: report.failed.len(),
    });
    ctx.trace(|| {
        format!(
            "save finish: {} saved, {} rejected",
            report.saved.len(),
            report.failed.len()
        )
    });

    Ok(report)
}

// Rewrite formerly-temporary relation targets everywhere in the run so
// subsequent reads observe permanent ids.
fn apply_rewrites(ctx: &Rc<ContextInner>, rewrites: &BTreeMap<WorkItemId, i64>) {
    if rewrites.is_empty() {
        return;
    }

    let tracker = ctx.tracker.borrow();
    for cell in tracker.new_items.iter().chain(&tracker.existing) {
        let mut state = cell.borrow_mut();
        for relation in &mut state.relations {
            if let RelationTarget::Item(id) = &mut relation.target {
                if let Some(assigned) = rewrites.get(id) {
                    *id = WorkItemId::permanent(*assigned);
                }
            }
        }
    }
}

// One request per pending entity: the field log as accumulated, followed
// by one append operation per not-yet-persisted relation. Creation
// requests carry project and type for endpoint routing.
fn build_requests(pending: &[StateCell]) -> Result<Vec<SaveRequest>, EngineError> {
    let mut requests = Vec::with_capacity(pending.len());

    for cell in pending {
        let state = cell.borrow();

        let mut document = state.document.clone();
        for relation in &state.relations[state.persisted_relations..] {
            let payload = serde_json::to_value(relation.to_record()).map_err(|err| {
                EngineError::tracker_invariant(format!(
                    "relation payload serialization failed: {err}"
                ))
            })?;
            document.push(PatchOperation::add(
                fields::RELATIONS_APPEND_PATH,
                FieldValue::Opaque(payload),
            ));
        }

        let (project, work_item_type) = if state.id.is_temporary() {
            (
                state
                    .fields
                    .get(fields::TEAM_PROJECT)
                    .and_then(|value| value.as_text().map(str::to_string)),
                state
                    .fields
                    .get(fields::WORK_ITEM_TYPE)
                    .and_then(|value| value.as_text().map(str::to_string)),
            )
        } else {
            (None, None)
        };

        requests.push(SaveRequest {
            id: state.id,
            project,
            work_item_type,
            document,
        });
    }

    Ok(requests)
}

// Deterministic parents-first ordering over Parent/Child edges between
// new entities. Registration order breaks ties; a cycle falls back to
// registration order for the remainder.
fn order_new(new_items: &[StateCell]) -> Vec<StateCell> {
    let index_of: BTreeMap<WorkItemId, usize> = new_items
        .iter()
        .enumerate()
        .map(|(index, cell)| (cell.borrow().id, index))
        .collect();

    let n = new_items.len();
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut indegree = vec![0usize; n];

    for (holder, cell) in new_items.iter().enumerate() {
        let state = cell.borrow();
        for relation in &state.relations {
            let Some(target_id) = relation.target_id() else {
                continue;
            };
            let Some(&target) = index_of.get(&target_id) else {
                continue;
            };
            if target == holder {
                continue;
            }

            // Both edge kinds point the same way: the parent side of the
            // hierarchy precedes the child side.
            let (first, second) = match relation.kind {
                RelationKind::Parent => (target, holder),
                RelationKind::Child => (holder, target),
                _ => continue,
            };
            successors[first].push(second);
            indegree[second] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&index| indegree[index] == 0).collect();
    let mut order = Vec::with_capacity(n);
    let mut placed = vec![false; n];

    while let Some(index) = ready.pop_first() {
        placed[index] = true;
        order.push(index);
        for &next in &successors[index] {
            indegree[next] -= 1;
            if indegree[next] == 0 && !placed[next] {
                ready.insert(next);
            }
        }
    }

    for index in 0..n {
        if !placed[index] {
            order.push(index);
        }
    }

    order
        .into_iter()
        .map(|index| Rc::clone(&new_items[index]))
        .collect()
}
