use thiserror::Error;

use crate::database::DatabaseError;

/// Typed failures returned by the stores and services
#[derive(Debug, Error)]
pub enum RbacError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Cycle(String),

    #[error("{0}")]
    HasChildren(String),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

impl RbacError {
    pub fn menu_not_found(id: impl Into<String>) -> Self {
        RbacError::NotFound { entity: "menu", id: id.into() }
    }

    pub fn role_not_found(id: impl Into<String>) -> Self {
        RbacError::NotFound { entity: "role", id: id.into() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        RbacError::Invalid(message.into())
    }

    /// Uniqueness, cycle, has-children and malformed-input failures
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RbacError::Duplicate(_)
                | RbacError::Cycle(_)
                | RbacError::HasChildren(_)
                | RbacError::Invalid(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RbacError::NotFound { .. })
    }
}

impl From<sqlx::Error> for RbacError {
    fn from(err: sqlx::Error) -> Self {
        RbacError::Storage(DatabaseError::Sqlx(err))
    }
}

pub type RbacResult<T> = Result<T, RbacError>;
