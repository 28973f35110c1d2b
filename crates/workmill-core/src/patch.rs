use crate::value::FieldValue;
use derive_more::{Deref, DerefMut, IntoIterator};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// PatchOp
///
/// Operation kinds of the JSON Patch subset the remote service accepts.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Test,
    Add,
    Replace,
    Remove,
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Test => "test",
            Self::Add => "add",
            Self::Replace => "replace",
            Self::Remove => "remove",
        };
        f.write_str(label)
    }
}

///
/// PatchOperation
///
/// One atomic instruction against an entity's representation.
/// `Remove` carries no value; every other kind does.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
}

impl PatchOperation {
    #[must_use]
    pub fn test(path: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            op: PatchOp::Test,
            path: path.into(),
            value: Some(value.into()),
        }
    }

    #[must_use]
    pub fn add(path: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.into(),
            value: Some(value.into()),
        }
    }

    #[must_use]
    pub fn replace(path: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.into(),
            value: Some(value.into()),
        }
    }

    #[must_use]
    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: path.into(),
            value: None,
        }
    }
}

///
/// PatchDocument
///
/// Ordered log of patch operations, serialized as a JSON Patch array.
/// The log is append-only during a run; order carries meaning because the
/// remote service applies operations sequentially (last writer wins per
/// path).
///

#[derive(
    Clone, Debug, Default, Deref, DerefMut, Deserialize, IntoIterator, PartialEq, Serialize,
)]
#[serde(transparent)]
pub struct PatchDocument(Vec<PatchOperation>);

impl PatchDocument {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn ops(&self) -> &[PatchOperation] {
        &self.0
    }

    /// Byte-stable JSON Patch rendering.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

///
/// TESTS
///
