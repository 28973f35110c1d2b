use crate::engine::SaveReport;
use std::fmt;
use thiserror::Error as ThisError;

///
/// EngineError
///
/// Structured engine error with a stable internal classification.
/// Constructed through the named helpers so every call site carries a
/// class and an origin.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct EngineError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `class`.
    pub detail: Option<ErrorDetail>,
}

impl EngineError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct an item-origin read-only violation.
    pub(crate) fn read_only(what: impl fmt::Display) -> Self {
        Self::new(
            ErrorClass::InvalidState,
            ErrorOrigin::Item,
            format!("work item {what} is read-only"),
        )
    }

    /// Construct a tracker-origin phase violation.
    pub(crate) fn phase(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidState, ErrorOrigin::Tracker, message)
    }

    /// Construct a relation-origin invariant violation.
    pub(crate) fn relation_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Relation,
            message,
        )
    }

    /// Construct a tracker-origin invariant violation.
    pub(crate) fn tracker_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Tracker, message)
    }

    /// Construct a store-origin not-found error.
    pub(crate) fn store_not_found(what: impl fmt::Display) -> Self {
        Self::new(
            ErrorClass::NotFound,
            ErrorOrigin::Store,
            format!("work item not found: {what}"),
        )
    }

    /// Construct a store-origin unsupported-resolution error.
    pub(crate) fn store_unresolvable(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidState, ErrorOrigin::Store, message)
    }

    /// Construct a client-origin transport error.
    pub(crate) fn client(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Client, message)
    }

    /// Construct a client-origin response-shape invariant violation.
    pub(crate) fn client_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Client, message)
    }

    /// Wrap a per-entity save report where at least one entity failed.
    pub(crate) fn partial_failure(report: SaveReport) -> Self {
        Self {
            class: ErrorClass::PartialFailure,
            origin: ErrorOrigin::Tracker,
            message: format!(
                "save batch partially failed: {} saved, {} rejected",
                report.saved.len(),
                report.failed.len()
            ),
            detail: Some(ErrorDetail::Save(report)),
        }
    }

    #[must_use]
    pub const fn is_invalid_state(&self) -> bool {
        matches!(self.class, ErrorClass::InvalidState)
    }

    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(self.class, ErrorClass::InvariantViolation)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self.class, ErrorClass::Conflict)
    }

    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self.class, ErrorClass::Validation)
    }

    #[must_use]
    pub const fn is_partial_failure(&self) -> bool {
        matches!(self.class, ErrorClass::PartialFailure)
    }

    /// The save report carried by a partial batch failure, if any.
    #[must_use]
    pub const fn save_report(&self) -> Option<&SaveReport> {
        match &self.detail {
            Some(ErrorDetail::Save(report)) => Some(report),
            None => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, class-specific error detail carried by [`EngineError`].
/// This enum is intentionally extensible.
///

#[derive(Debug)]
pub enum ErrorDetail {
    Save(SaveReport),
}

///
/// ErrorClass
/// Engine error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    InvalidState,
    InvariantViolation,
    NotFound,
    Conflict,
    Validation,
    PartialFailure,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InvalidState => "invalid_state",
            Self::InvariantViolation => "invariant_violation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Validation => "validation",
            Self::PartialFailure => "partial_failure",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Engine origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Item,
    Relation,
    Store,
    Tracker,
    Client,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Item => "item",
            Self::Relation => "relation",
            Self::Store => "store",
            Self::Tracker => "tracker",
            Self::Client => "client",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
