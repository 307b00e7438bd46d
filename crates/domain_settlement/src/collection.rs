//! Money an agent collected from a business

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{AgentSettlementId, BusinessId, BusinessPackageId, CollectionId, Money, UserId};
use crate::error::SettlementError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionStatus {
    /// Cash is with the agent, not yet handed over
    Collected,
    /// Manager confirmed receipt through a settlement
    Verified,
}

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Collected => "COLLECTED",
            CollectionStatus::Verified => "VERIFIED",
        }
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COLLECTED" => Ok(CollectionStatus::Collected),
            "VERIFIED" => Ok(CollectionStatus::Verified),
            other => Err(format!("unknown collection status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCollection {
    pub id: CollectionId,
    pub agent_id: UserId,
    pub business_id: BusinessId,
    /// Subscription period the money paid for, when known
    pub business_package_id: Option<BusinessPackageId>,
    pub amount: Money,
    pub status: CollectionStatus,
    /// Settlement currently holding this collection
    pub settlement_id: Option<AgentSettlementId>,
    pub notes: Option<String>,
    pub collected_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl AgentCollection {
    /// Records a new collection; the amount must be positive
    pub fn record(
        agent_id: UserId,
        business_id: BusinessId,
        amount: Money,
    ) -> Result<Self, SettlementError> {
        if !amount.is_positive() {
            return Err(SettlementError::InvalidAmount(format!(
                "collected amount {} must be positive",
                amount
            )));
        }

        Ok(Self {
            id: CollectionId::new_v7(),
            agent_id,
            business_id,
            business_package_id: None,
            amount,
            status: CollectionStatus::Collected,
            settlement_id: None,
            notes: None,
            collected_at: Utc::now(),
            verified_at: None,
        })
    }

    pub fn for_package(mut self, business_package_id: BusinessPackageId) -> Self {
        self.business_package_id = Some(business_package_id);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Still with the agent and not reserved by any settlement
    pub fn is_unsettled(&self) -> bool {
        self.status == CollectionStatus::Collected && self.settlement_id.is_none()
    }

    pub fn verify(&mut self, at: DateTime<Utc>) -> Result<(), SettlementError> {
        if self.status != CollectionStatus::Collected {
            return Err(SettlementError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: CollectionStatus::Verified.to_string(),
            });
        }
        self.status = CollectionStatus::Verified;
        self.verified_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_record_requires_positive_amount() {
        let result = AgentCollection::record(
            UserId::new(),
            BusinessId::new(),
            Money::zero(Currency::IQD),
        );
        assert!(matches!(result, Err(SettlementError::InvalidAmount(_))));
    }

    #[test]
    fn test_verify_once() {
        let mut c = AgentCollection::record(
            UserId::new(),
            BusinessId::new(),
            Money::new(dec!(50000), Currency::IQD),
        )
        .unwrap();

        assert!(c.is_unsettled());
        c.verify(Utc::now()).unwrap();
        assert!(!c.is_unsettled());
        assert!(c.verify(Utc::now()).is_err());
    }
}
