//! Settlement domain errors

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::MoneyError;

/// Errors that can occur in the settlement domain
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Settlement not found: {0}")]
    NotFound(String),

    /// An open (draft or pending) settlement already exists for the party
    #[error("{party} already has an open settlement {settlement}")]
    OpenSettlementExists { party: String, settlement: String },

    #[error("Nothing to settle: {0}")]
    NothingToSettle(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Settlement {0} is confirmed and can no longer be changed")]
    AlreadyConfirmed(String),

    #[error("Not permitted: {0}")]
    NotOwner(String),

    #[error("Agent {0} has no governorate manager assigned")]
    NoManagerAssigned(String),

    #[error("Item already settled: {0}")]
    ItemAlreadySettled(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unbalanced transaction: debits={debits}, credits={credits}")]
    UnbalancedTransaction {
        debits: Decimal,
        credits: Decimal,
    },

    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl SettlementError {
    pub fn not_owner(message: impl Into<String>) -> Self {
        SettlementError::NotOwner(message.into())
    }
}
