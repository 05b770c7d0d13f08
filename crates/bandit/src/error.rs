use rotator_core::{RotatorError, SlotId};
use thiserror::Error;

pub type SelectionResult<T> = Result<T, SelectionError>;

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("slot {slot} has no eligible banners")]
    NoCandidates { slot: SlotId },

    #[error("lookup failed: {0}")]
    Lookup(#[source] RotatorError),

    #[error("accounting write failed: {0}")]
    Accounting(#[source] RotatorError),

    #[error("selection cancelled")]
    Cancelled,
}

impl SelectionError {
    /// Short label used for metrics and API error codes.
    pub fn kind(&self) -> &'static str {
        match self {
            SelectionError::NoCandidates { .. } => "no_candidates",
            SelectionError::Lookup(_) => "lookup",
            SelectionError::Accounting(_) => "accounting",
            SelectionError::Cancelled => "cancelled",
        }
    }
}
