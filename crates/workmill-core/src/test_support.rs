//! In-memory fake of the remote work-item service for engine tests.
//!
//! The fake applies patch documents the way the real service does:
//! revision guards, sequential operation application, and negative-id
//! resolution inside one creation batch.

use crate::{
    client::{
        ClientError, RelationRecord, SaveFailure, SaveOutcome, SaveRequest, WorkItemClient,
        WorkItemRecord,
    },
    fields,
    identity::WorkItemId,
    patch::{PatchOp, PatchOperation},
    value::FieldValue,
};
use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

///
/// UnreachableClient
///
/// Client stub for tests that never touch the network paths.
///

pub(crate) struct UnreachableClient;

impl WorkItemClient for UnreachableClient {
    fn fetch(&self, id: i64) -> Result<WorkItemRecord, ClientError> {
        panic!("unexpected fetch of id {id}");
    }

    fn fetch_revision(
        &self,
        id: i64,
        rev: u32,
        _expand_relations: bool,
    ) -> Result<WorkItemRecord, ClientError> {
        panic!("unexpected revision fetch of id {id} rev {rev}");
    }

    fn save_batch(&self, _requests: &[SaveRequest]) -> Result<Vec<SaveOutcome>, ClientError> {
        panic!("unexpected save batch");
    }
}

///
/// RemoteFake
///
/// Stateful fake: full revision history per id, patch application, and
/// failure injection (per-field validation rejection, transport outage).
///

#[derive(Default)]
pub(crate) struct RemoteFake {
    state: RefCell<FakeState>,
}

struct FakeState {
    history: BTreeMap<i64, Vec<WorkItemRecord>>,
    next_id: i64,
    reject_field: Option<String>,
    fail_transport: bool,
    fetch_count: u64,
    last_batch: Vec<SaveRequest>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            history: BTreeMap::new(),
            next_id: 42,
            reject_field: None,
            fail_transport: false,
            fetch_count: 0,
            last_batch: Vec::new(),
        }
    }
}

impl RemoteFake {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reject any request whose document touches `name`.
    pub(crate) fn reject_field(&self, name: &str) {
        self.state.borrow_mut().reject_field = Some(name.to_string());
    }

    pub(crate) fn clear_rejection(&self) {
        self.state.borrow_mut().reject_field = None;
    }

    /// Fail the next save batches at the transport level.
    pub(crate) fn fail_transport(&self, fail: bool) {
        self.state.borrow_mut().fail_transport = fail;
    }

    /// Seed an item whose history is the given field maps, rev 0 first.
    /// Returns the assigned id.
    pub(crate) fn seed_history(&self, revisions: Vec<BTreeMap<String, FieldValue>>) -> i64 {
        assert!(!revisions.is_empty(), "history must hold at least rev 0");

        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;

        let records = revisions
            .into_iter()
            .enumerate()
            .map(|(rev, fields)| WorkItemRecord {
                id,
                rev: u32::try_from(rev).unwrap(),
                url: Some(format!("fake://items/{id}")),
                fields,
                relations: Vec::new(),
            })
            .collect();
        state.history.insert(id, records);

        id
    }

    /// Seed a single-revision item.
    pub(crate) fn seed(&self, fields: BTreeMap<String, FieldValue>) -> i64 {
        self.seed_history(vec![fields])
    }

    /// Attach relations to the current revision of `id`.
    pub(crate) fn seed_relations(&self, id: i64, relations: Vec<RelationRecord>) {
        let mut state = self.state.borrow_mut();
        let records = state.history.get_mut(&id).expect("seeded id");
        records.last_mut().expect("at least rev 0").relations = relations;
    }

    /// Append a revision out-of-band, as a concurrent editor would.
    pub(crate) fn bump(&self, id: i64) {
        let mut state = self.state.borrow_mut();
        let records = state.history.get_mut(&id).expect("seeded id");
        let mut next = records.last().expect("at least rev 0").clone();
        next.rev += 1;
        records.push(next);
    }

    /// Current record for assertions.
    pub(crate) fn record(&self, id: i64) -> WorkItemRecord {
        self.state.borrow().history[&id].last().unwrap().clone()
    }

    pub(crate) fn fetch_count(&self) -> u64 {
        self.state.borrow().fetch_count
    }

    /// Requests of the most recent save batch, in submission order.
    pub(crate) fn last_batch(&self) -> Vec<SaveRequest> {
        self.state.borrow().last_batch.clone()
    }
}

// Tests keep a handle on the fake while the context owns the client.
impl WorkItemClient for Rc<RemoteFake> {
    fn fetch(&self, id: i64) -> Result<WorkItemRecord, ClientError> {
        (**self).fetch(id)
    }

    fn fetch_revision(
        &self,
        id: i64,
        rev: u32,
        expand_relations: bool,
    ) -> Result<WorkItemRecord, ClientError> {
        (**self).fetch_revision(id, rev, expand_relations)
    }

    fn save_batch(&self, requests: &[SaveRequest]) -> Result<Vec<SaveOutcome>, ClientError> {
        (**self).save_batch(requests)
    }
}

fn rejects(reject_field: Option<&str>, document: &[PatchOperation]) -> bool {
    let Some(name) = reject_field else {
        return false;
    };
    let path = fields::field_path(name);

    document.iter().any(|op| op.path == path)
}

// Apply one document to a field/relation pair the way the service does:
// sequentially, last writer wins per path.
fn apply_document(
    document: &[PatchOperation],
    item_fields: &mut BTreeMap<String, FieldValue>,
    relations: &mut Vec<RelationRecord>,
    assigned: &BTreeMap<i64, i64>,
) {
    for op in document {
        if op.path == fields::RELATIONS_APPEND_PATH {
            if let Some(FieldValue::Opaque(payload)) = &op.value {
                if let Ok(mut record) = serde_json::from_value::<RelationRecord>(payload.clone()) {
                    // Negative targets resolve inside the batch.
                    if let Some(raw) = record.target {
                        if raw < 0 {
                            if let Some(resolved) = assigned.get(&raw) {
                                record.target = Some(*resolved);
                            }
                        }
                    }
                    relations.push(record);
                }
            }
            continue;
        }

        let Some(name) = op.path.strip_prefix("/fields/") else {
            continue;
        };
        match op.op {
            PatchOp::Add | PatchOp::Replace => {
                if let Some(value) = &op.value {
                    item_fields.insert(name.to_string(), value.clone());
                }
            }
            PatchOp::Remove => {
                item_fields.remove(name);
            }
            PatchOp::Test => {}
        }
    }
}

fn revision_guard_passes(document: &[PatchOperation], current_rev: u32) -> bool {
    document
        .iter()
        .filter(|op| op.op == PatchOp::Test && op.path == fields::REV_PATH)
        .all(|op| {
            op.value
                .as_ref()
                .and_then(FieldValue::as_int)
                .is_some_and(|rev| rev == i64::from(current_rev))
        })
}

impl WorkItemClient for RemoteFake {
    fn fetch(&self, id: i64) -> Result<WorkItemRecord, ClientError> {
        let mut state = self.state.borrow_mut();
        state.fetch_count += 1;

        state
            .history
            .get(&id)
            .and_then(|records| records.last())
            .cloned()
            .ok_or(ClientError::NotFound { id, rev: None })
    }

    fn fetch_revision(
        &self,
        id: i64,
        rev: u32,
        _expand_relations: bool,
    ) -> Result<WorkItemRecord, ClientError> {
        let mut state = self.state.borrow_mut();
        state.fetch_count += 1;

        state
            .history
            .get(&id)
            .and_then(|records| records.iter().find(|record| record.rev == rev))
            .cloned()
            .ok_or(ClientError::NotFound { id, rev: Some(rev) })
    }

    fn save_batch(&self, requests: &[SaveRequest]) -> Result<Vec<SaveOutcome>, ClientError> {
        let mut state = self.state.borrow_mut();
        if state.fail_transport {
            return Err(ClientError::Transport("remote unavailable".to_string()));
        }
        state.last_batch = requests.to_vec();

        // Phase 1: validate each request and assign ids to accepted
        // creations so later requests can resolve in-batch references.
        let reject_field = state.reject_field.clone();
        let mut assigned: BTreeMap<i64, i64> = BTreeMap::new();
        let mut accepted: Vec<Option<SaveFailure>> = Vec::with_capacity(requests.len());

        for request in requests {
            let failure = match request.id {
                WorkItemId::Temporary(_) => {
                    if rejects(reject_field.as_deref(), request.document.ops()) {
                        Some(SaveFailure::Validation(format!(
                            "field rejected: {}",
                            reject_field.clone().unwrap_or_default()
                        )))
                    } else {
                        let id = state.next_id;
                        state.next_id += 1;
                        assigned.insert(request.id.as_wire(), id);
                        None
                    }
                }
                WorkItemId::Permanent(id) => {
                    let current = state.history.get(&id).and_then(|records| records.last());
                    match current {
                        None => Some(SaveFailure::NotFound),
                        Some(record)
                            if !revision_guard_passes(request.document.ops(), record.rev) =>
                        {
                            Some(SaveFailure::ConcurrencyConflict)
                        }
                        Some(_) if rejects(reject_field.as_deref(), request.document.ops()) => {
                            Some(SaveFailure::Validation(format!(
                                "field rejected: {}",
                                reject_field.clone().unwrap_or_default()
                            )))
                        }
                        Some(_) => None,
                    }
                }
            };
            accepted.push(failure);
        }

        // Phase 2: materialize accepted requests in submission order.
        let mut outcomes = Vec::with_capacity(requests.len());
        for (request, failure) in requests.iter().zip(accepted) {
            if let Some(reason) = failure {
                outcomes.push(SaveOutcome::Rejected {
                    id: request.id,
                    reason,
                });
                continue;
            }

            match request.id {
                WorkItemId::Temporary(_) => {
                    let id = assigned[&request.id.as_wire()];
                    let mut item_fields = BTreeMap::new();
                    if let Some(project) = &request.project {
                        item_fields.insert(
                            fields::TEAM_PROJECT.to_string(),
                            FieldValue::Text(project.clone()),
                        );
                    }
                    if let Some(work_item_type) = &request.work_item_type {
                        item_fields.insert(
                            fields::WORK_ITEM_TYPE.to_string(),
                            FieldValue::Text(work_item_type.clone()),
                        );
                    }
                    item_fields.insert(fields::ID.to_string(), FieldValue::Int(id));

                    let mut relations = Vec::new();
                    apply_document(
                        request.document.ops(),
                        &mut item_fields,
                        &mut relations,
                        &assigned,
                    );

                    let record = WorkItemRecord {
                        id,
                        rev: 1,
                        url: Some(format!("fake://items/{id}")),
                        fields: item_fields,
                        relations,
                    };
                    // Creation yields rev 1; rev 0 is the initial snapshot.
                    let mut initial = record.clone();
                    initial.rev = 0;
                    state.history.insert(id, vec![initial, record]);

                    outcomes.push(SaveOutcome::Saved {
                        id: request.id,
                        assigned: id,
                        rev: 1,
                    });
                }
                WorkItemId::Permanent(id) => {
                    let mut next = state.history[&id].last().unwrap().clone();
                    next.rev += 1;
                    {
                        let mut relations = std::mem::take(&mut next.relations);
                        apply_document(
                            request.document.ops(),
                            &mut next.fields,
                            &mut relations,
                            &assigned,
                        );
                        next.relations = relations;
                    }
                    let rev = next.rev;
                    state.history.get_mut(&id).unwrap().push(next);

                    outcomes.push(SaveOutcome::Saved {
                        id: request.id,
                        assigned: id,
                        rev,
                    });
                }
            }
        }

        Ok(outcomes)
    }
}
