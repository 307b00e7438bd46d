//! Core Kernel - Foundational types shared by every GreenPages crate
//!
//! This crate provides the building blocks used across the domain modules:
//! - Money and rate types with precise decimal arithmetic
//! - Business-date handling in the platform's local timezone
//! - Strongly-typed identifiers for every persisted entity

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod error;

pub use money::{Money, Currency, MoneyError, Rate};
pub use temporal::{Timezone, TemporalError, days_between};
pub use identifiers::{
    UserId, GovernorateId, BusinessId, PackageId, BusinessPackageId,
    CollectionId, CommissionId, AgentSettlementId, ManagerSettlementId,
    RenewalId, RenewalContactId,
};
pub use error::CoreError;
