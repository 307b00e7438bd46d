//! Test Utilities Crate
//!
//! Shared test infrastructure, fixtures, and helpers for the GreenPages
//! settlement and renewal test suites.
//!
//! # Modules
//!
//! - `fixtures`: Fixed reference data (amounts, dates, identifiers)
//! - `builders`: Builders for staff, packages, and a seeded governorate
//! - `database`: PostgreSQL testcontainer with migrations applied
//! - `assertions`: Assertion helpers for money, settlements, and ledgers
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
