use crate::{client::RelationRecord, error::EngineError, identity::WorkItemId};
use derive_more::{Deref, IntoIterator};
use std::fmt;

///
/// RelationKind
///
/// The four link-type tokens the remote schema interprets, matched
/// case-sensitively. Any other token is preserved but not specially
/// interpreted.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum RelationKind {
    Parent,
    Child,
    Related,
    Hyperlink,
    Other(String),
}

impl RelationKind {
    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            Self::Parent => "parent",
            Self::Child => "child",
            Self::Related => "related",
            Self::Hyperlink => "hyperlink",
            Self::Other(token) => token,
        }
    }

    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token {
            "parent" => Self::Parent,
            "child" => Self::Child,
            "related" => Self::Related,
            "hyperlink" => Self::Hyperlink,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

///
/// RelationTarget
///
/// Item links point at a work item (possibly one that only holds a
/// temporary identity before save); hyperlinks point at a URL.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum RelationTarget {
    Item(WorkItemId),
    Url(String),
}

///
/// Relation
///
/// One directed link edge on a work item.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Relation {
    pub kind: RelationKind,
    pub target: RelationTarget,
}

impl Relation {
    #[must_use]
    pub const fn new(kind: RelationKind, target: RelationTarget) -> Self {
        Self { kind, target }
    }

    #[must_use]
    pub fn to_item(kind: RelationKind, id: WorkItemId) -> Self {
        Self::new(kind, RelationTarget::Item(id))
    }

    /// The linked work item's identity, when the target is an item.
    #[must_use]
    pub const fn target_id(&self) -> Option<WorkItemId> {
        match &self.target {
            RelationTarget::Item(id) => Some(*id),
            RelationTarget::Url(_) => None,
        }
    }

    pub(crate) fn from_record(record: &RelationRecord) -> Result<Self, EngineError> {
        let kind = RelationKind::from_token(&record.rel);
        let target = match (&record.target, &record.url) {
            (Some(raw), _) => RelationTarget::Item(WorkItemId::from_wire(*raw)),
            (None, Some(url)) => RelationTarget::Url(url.clone()),
            (None, None) => {
                return Err(EngineError::relation_invariant(format!(
                    "relation '{}' carries neither target nor url",
                    record.rel
                )));
            }
        };

        Ok(Self { kind, target })
    }

    #[must_use]
    pub(crate) fn to_record(&self) -> RelationRecord {
        match &self.target {
            RelationTarget::Item(id) => RelationRecord {
                rel: self.kind.token().to_string(),
                target: Some(id.as_wire()),
                url: None,
            },
            RelationTarget::Url(url) => RelationRecord {
                rel: self.kind.token().to_string(),
                target: None,
                url: Some(url.clone()),
            },
        }
    }
}

///
/// Relations
///
/// Point-in-time snapshot of one item's link list with typed, pure
/// projections. Per-kind insertion order is preserved.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator, PartialEq)]
pub struct Relations(pub(crate) Vec<Relation>);

impl Relations {
    fn of_kind_inner<'a>(
        &'a self,
        kind: &'a RelationKind,
    ) -> impl Iterator<Item = &'a Relation> + 'a {
        self.0.iter().filter(move |rel| rel.kind == *kind)
    }

    /// All relations of one kind, in insertion order.
    #[must_use]
    pub fn of_kind(&self, kind: &RelationKind) -> Vec<Relation> {
        self.of_kind_inner(kind).cloned().collect()
    }

    #[must_use]
    pub fn children(&self) -> Vec<Relation> {
        self.of_kind(&RelationKind::Child)
    }

    #[must_use]
    pub fn related(&self) -> Vec<Relation> {
        self.of_kind(&RelationKind::Related)
    }

    #[must_use]
    pub fn hyperlinks(&self) -> Vec<Relation> {
        self.of_kind(&RelationKind::Hyperlink)
    }

    /// The single Parent relation, if any.
    ///
    /// More than one Parent edge signals upstream data corruption and is
    /// surfaced as an invariant violation rather than silently picking
    /// one.
    pub fn parent(&self) -> Result<Option<Relation>, EngineError> {
        let kind = RelationKind::Parent;
        let mut matches = self.of_kind_inner(&kind);
        let first = matches.next().cloned();
        if matches.next().is_some() {
            return Err(EngineError::relation_invariant(
                "more than one parent relation on a single work item",
            ));
        }

        Ok(first)
    }
}

///
/// TESTS
///
