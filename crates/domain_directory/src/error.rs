//! Directory domain errors

use thiserror::Error;

use core_kernel::MoneyError;

/// Errors that can occur in the directory domain
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Package is inactive: {0}")]
    PackageInactive(String),

    #[error("Business package {id} cannot be renewed from status {status}")]
    NotRenewable { id: String, status: String },

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Invalid package: {0}")]
    InvalidPackage(String),

    #[error(transparent)]
    Money(#[from] MoneyError),
}
