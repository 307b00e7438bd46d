//! Renewal domain errors

use thiserror::Error;

use domain_directory::DirectoryError;

#[derive(Debug, Error)]
pub enum RenewalError {
    #[error("Renewal record not found: {0}")]
    NotFound(String),

    #[error("Renewal {id} is {status} and can no longer be changed")]
    Terminal { id: String, status: String },

    #[error("Decision {0} requires a new package")]
    MissingPackage(String),

    #[error("A postponed decision requires a follow-up date")]
    MissingFollowUp,

    #[error("Renewal {0} is not assigned to this agent")]
    NotAssigned(String),

    #[error("Not permitted: {0}")]
    Forbidden(String),

    #[error("Invalid renewal data: {0}")]
    Invalid(String),

    /// Failure reported by a `RenewalStore` implementation
    #[error("Renewal store error: {0}")]
    Store(String),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl RenewalError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        RenewalError::Store(err.to_string())
    }
}
