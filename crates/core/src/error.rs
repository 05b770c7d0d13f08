use thiserror::Error;

pub type RotatorResult<T> = Result<T, RotatorError>;

#[derive(Error, Debug)]
pub enum RotatorError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl RotatorError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        RotatorError::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RotatorError::NotFound { .. })
    }
}
