use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

///
/// WorkItemId
///
/// Identity of one tracked work item.
///
/// Invariants:
/// - A `Temporary` id is assigned from a per-run counter starting at 1 and
///   is unique only within that run.
/// - A `Permanent` id is server-assigned, non-negative, and stable.
/// - The kind never mutates in place; the tracker records the
///   temporary-to-permanent mapping after a save and swaps the identity
///   slot wholesale.
///
/// Wire form is a signed integer: permanent ids as-is, temporary ids
/// negated. The remote service resolves negative ids inside one creation
/// batch.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum WorkItemId {
    Temporary(u32),
    Permanent(i64),
}

impl WorkItemId {
    #[must_use]
    pub const fn permanent(id: i64) -> Self {
        Self::Permanent(id)
    }

    #[must_use]
    pub const fn temporary(seq: u32) -> Self {
        Self::Temporary(seq)
    }

    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    /// The server-assigned id, when this identity is permanent.
    #[must_use]
    pub const fn as_permanent(&self) -> Option<i64> {
        match self {
            Self::Permanent(id) => Some(*id),
            Self::Temporary(_) => None,
        }
    }

    /// Signed wire rendering; temporary ids are negated.
    #[must_use]
    pub const fn as_wire(&self) -> i64 {
        match self {
            Self::Permanent(id) => *id,
            Self::Temporary(seq) => -(*seq as i64),
        }
    }

    /// Decode the signed wire rendering.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn from_wire(raw: i64) -> Self {
        if raw < 0 {
            // Counter values fit u32 by construction; saturate on overflow
            // rather than wrapping into a colliding sequence number.
            let magnitude = raw.unsigned_abs();
            if magnitude > u32::MAX as u64 {
                Self::Temporary(u32::MAX)
            } else {
                Self::Temporary(magnitude as u32)
            }
        } else {
            Self::Permanent(raw)
        }
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permanent(id) => write!(f, "{id}"),
            Self::Temporary(seq) => write!(f, "tmp-{seq}"),
        }
    }
}

impl Serialize for WorkItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for WorkItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;

        Ok(Self::from_wire(raw))
    }
}

///
/// TESTS
///
