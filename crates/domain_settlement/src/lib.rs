//! Settlement Domain - layered money reconciliation
//!
//! Money moves up a three-level chain:
//!
//! ```text
//! business --(collection)--> agent --(agent settlement)--> governorate manager
//!                                                 --(manager settlement)--> admin
//! ```
//!
//! - An agent records each **collection** and is owed a **commission** on it.
//! - The agent batches unsettled collections and commissions into an
//!   **agent settlement** which their manager confirms; confirming verifies
//!   the collections, pays the commissions and credits the agent.
//! - The manager batches confirmed agent settlements into a **manager
//!   settlement**, splitting revenue with the company at the manager's
//!   commission rate; the admin confirms it.
//!
//! # Settlement states
//!
//! ```text
//! DRAFT -> PENDING_MANAGER | PENDING_ADMIN -> CONFIRMED
//!    \__________________________/
//!                 |
//!             CANCELLED
//! ```
//!
//! CONFIRMED and CANCELLED are terminal; a confirmed settlement is immutable.

pub mod status;
pub mod collection;
pub mod commission;
pub mod agent_settlement;
pub mod manager_settlement;
pub mod ledger;
pub mod error;

pub use status::{SettlementStatus, SettlementLevel};
pub use collection::{AgentCollection, CollectionStatus};
pub use commission::{AgentCommission, CommissionStatus};
pub use agent_settlement::{
    AgentFinancialSettlement, AgentSettlementSnapshot, AgentConfirmation, AgentCancellation,
};
pub use manager_settlement::{
    ManagerFinancialSettlement, ManagerSettlementSnapshot, ManagerConfirmation,
};
pub use ledger::{Ledger, LedgerAccount, TrialBalance, TrialBalanceEntry, BALANCE_TOLERANCE};
pub use error::SettlementError;
