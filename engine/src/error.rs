//! Validation diagnostics (SPEC_FULL §4.1.2).

use thiserror::Error;

/// Why a single action within a batch was rejected. The whole batch fails
/// atomically if any action fails (SPEC_FULL §4.1.2): the engine returns
/// the unchanged state together with one or more of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("action references unknown unit {0}")]
    UnknownUnit(u64),

    #[error("unit {0} is not owned by the acting player")]
    ForeignUnit(u64),

    #[error("'{0}' is not one of the eight valid directions")]
    BadDirection(String),

    #[error("unit {0} appears more than once in the action batch")]
    DuplicateAction(u64),

    #[error("action batch contains a null entry")]
    NullAction,

    #[error("unit {0} is a {1:?} and cannot be moved")]
    NotMovable(u64, protocol::UnitKind),
}

impl ActionError {
    /// A short, stable reason code, useful for `INVALID_OPERATION.reason`
    /// alongside the human-readable `Display` text.
    pub fn code(&self) -> &'static str {
        match self {
            ActionError::UnknownUnit(_) => "UNKNOWN_UNIT",
            ActionError::ForeignUnit(_) => "FOREIGN_UNIT",
            ActionError::BadDirection(_) => "BAD_DIRECTION",
            ActionError::DuplicateAction(_) => "DUPLICATE_ACTION",
            ActionError::NullAction => "NULL_ACTION",
            ActionError::NotMovable(..) => "NOT_MOVABLE",
        }
    }
}

/// Renders a batch of diagnostics into the single `reason` string carried
/// by `INVALID_OPERATION`.
pub fn format_reasons(errors: &[ActionError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.code(), e))
        .collect::<Vec<_>>()
        .join("; ")
}
