//! Request/response bodies
//!
//! All JSON field names are camelCase. Identifiers are plain UUIDs and
//! amounts are decimals in the configured currency.

pub mod finance;
pub mod renewal;
pub mod accounting;

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use infra_db::Page;

use crate::error::ApiError;

/// Query string accepted by every list endpoint
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
    #[validate(range(min = 1, max = 200))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub offset: Option<i64>,
}

impl ListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }

    /// Parses the `status` filter into the listed entity's status enum
    pub fn status<S>(&self) -> Result<Option<S>, ApiError>
    where
        S: FromStr,
        S::Err: std::fmt::Display,
    {
        self.status
            .as_deref()
            .map(|s| {
                s.parse::<S>()
                    .map_err(|e| ApiError::BadRequest(format!("status: {}", e)))
            })
            .transpose()
    }
}

pub(crate) fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("amount_not_positive"))
    }
}
