use crate::{
    error::{EngineError, ErrorClass, ErrorOrigin},
    identity::WorkItemId,
    patch::PatchDocument,
    value::FieldValue,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// RelationRecord
///
/// Wire shape of one link entry. Item links carry a signed work-item id
/// (negative inside a creation batch); hyperlinks carry a URL.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RelationRecord {
    pub rel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

///
/// WorkItemRecord
///
/// Raw entity record as served by the remote system: loosely-typed field
/// map, link list, and the revision the snapshot was taken at.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct WorkItemRecord {
    pub id: i64,
    pub rev: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default)]
    pub relations: Vec<RelationRecord>,
}

///
/// SaveRequest
///
/// One entity's accumulated patch log, ready for submission. Requests for
/// temporary identities carry the project and work-item type so the
/// collaborator can route them to the creation endpoint.
///

#[derive(Clone, Debug, PartialEq)]
pub struct SaveRequest {
    pub id: WorkItemId,
    pub project: Option<String>,
    pub work_item_type: Option<String>,
    pub document: PatchDocument,
}

///
/// SaveFailure
///
/// Per-entity rejection reasons a save batch can return.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SaveFailure {
    #[error("revision guard failed: the remote revision moved")]
    ConcurrencyConflict,

    #[error("rejected by the remote service: {0}")]
    Validation(String),

    #[error("target no longer exists")]
    NotFound,
}

///
/// SaveOutcome
///
/// Per-submitted-identity result of a save batch.
///

#[derive(Clone, Debug, PartialEq)]
pub enum SaveOutcome {
    Saved {
        /// Identity the request was submitted under.
        id: WorkItemId,
        /// Server-assigned permanent id (echoes the submitted id for
        /// already-persisted entities).
        assigned: i64,
        /// Revision after the save.
        rev: u32,
    },
    Rejected {
        id: WorkItemId,
        reason: SaveFailure,
    },
}

impl SaveOutcome {
    /// Identity the outcome refers to, as submitted.
    #[must_use]
    pub const fn id(&self) -> WorkItemId {
        match self {
            Self::Saved { id, .. } | Self::Rejected { id, .. } => *id,
        }
    }
}

///
/// ClientError
///
/// Failures of the collaborator itself, as opposed to per-entity save
/// rejections. The engine never retries; callers own retry policy.
///

#[derive(Debug, ThisError)]
pub enum ClientError {
    #[error("work item not found: id={id} rev={rev:?}")]
    NotFound { id: i64, rev: Option<u32> },

    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<ClientError> for EngineError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound { .. } => {
                Self::new(ErrorClass::NotFound, ErrorOrigin::Store, err.to_string())
            }
            ClientError::Transport(_) => Self::client(err.to_string()),
        }
    }
}

///
/// WorkItemClient
///
/// Narrow contract to the remote work-item service. The engine calls this
/// for explicit resolution points only; field reads never reach the
/// network.
///

pub trait WorkItemClient {
    /// Fetch the current record for a persisted work item.
    fn fetch(&self, id: i64) -> Result<WorkItemRecord, ClientError>;

    /// Fetch the record pinned to a specific historical revision.
    fn fetch_revision(
        &self,
        id: i64,
        rev: u32,
        expand_relations: bool,
    ) -> Result<WorkItemRecord, ClientError>;

    /// Persist a batch of patch logs, one outcome per request, in request
    /// order. A transport-level error means nothing was applied.
    fn save_batch(&self, requests: &[SaveRequest]) -> Result<Vec<SaveOutcome>, ClientError>;
}

///
/// TESTS
///
