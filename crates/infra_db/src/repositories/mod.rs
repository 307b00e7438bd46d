//! Repository implementations
//!
//! Each repository owns a pool and the application currency. Queries use
//! runtime-checked `sqlx::query`/`query_as` with `FromRow` row structs; rows
//! are converted into domain types at the repository boundary. Statuses are
//! stored as TEXT guarded by CHECK constraints and parsed with the domain
//! `FromStr` impls.

pub mod directory;
pub mod settlement;
pub mod renewal;
pub mod accounting;

pub use directory::DirectoryRepository;
pub use settlement::SettlementRepository;
pub use renewal::RenewalRepository;
pub use accounting::AccountingRepository;

use std::fmt::Display;
use std::str::FromStr;

use core_kernel::Rate;
use rust_decimal::Decimal;

use crate::error::DatabaseError;

/// Limit/offset pagination, clamped to 1..=200 rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Reads a stored percentage, rejecting values outside 0..=100
pub(crate) fn parse_rate(column: &str, percentage: Decimal) -> Result<Rate, DatabaseError> {
    Rate::try_from_percentage(percentage).map_err(|e| DatabaseError::corrupt(column, e))
}

/// Parses a TEXT column into its domain enum
pub(crate) fn parse_column<T>(column: &str, value: &str) -> Result<T, DatabaseError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e: T::Err| DatabaseError::corrupt(column, e))
}
