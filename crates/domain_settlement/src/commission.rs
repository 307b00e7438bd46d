//! Commission owed to an agent on a collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{AgentSettlementId, BusinessId, CollectionId, CommissionId, Money, Rate, UserId};
use crate::collection::AgentCollection;
use crate::error::SettlementError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Paid,
}

impl CommissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "PENDING",
            CommissionStatus::Approved => "APPROVED",
            CommissionStatus::Paid => "PAID",
        }
    }
}

impl fmt::Display for CommissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(CommissionStatus::Pending),
            "APPROVED" => Ok(CommissionStatus::Approved),
            "PAID" => Ok(CommissionStatus::Paid),
            other => Err(format!("unknown commission status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCommission {
    pub id: CommissionId,
    pub agent_id: UserId,
    pub collection_id: Option<CollectionId>,
    pub business_id: BusinessId,
    pub amount: Money,
    /// Rate the amount was computed at, kept for audit
    pub rate: Rate,
    pub status: CommissionStatus,
    pub settlement_id: Option<AgentSettlementId>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl AgentCommission {
    /// Commission earned on a collection at the agent's current rate
    pub fn for_collection(collection: &AgentCollection, rate: Rate) -> Self {
        Self {
            id: CommissionId::new_v7(),
            agent_id: collection.agent_id,
            collection_id: Some(collection.id),
            business_id: collection.business_id,
            amount: rate.apply(&collection.amount),
            rate,
            status: CommissionStatus::Pending,
            settlement_id: None,
            created_at: Utc::now(),
            approved_at: None,
            paid_at: None,
        }
    }

    /// Unpaid and not reserved by any settlement
    pub fn is_unsettled(&self) -> bool {
        matches!(self.status, CommissionStatus::Pending | CommissionStatus::Approved)
            && self.settlement_id.is_none()
    }

    pub fn approve(&mut self, at: DateTime<Utc>) -> Result<(), SettlementError> {
        if self.status != CommissionStatus::Pending {
            return Err(SettlementError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: CommissionStatus::Approved.to_string(),
            });
        }
        self.status = CommissionStatus::Approved;
        self.approved_at = Some(at);
        Ok(())
    }

    pub fn pay(&mut self, at: DateTime<Utc>) -> Result<(), SettlementError> {
        if self.status == CommissionStatus::Paid {
            return Err(SettlementError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: CommissionStatus::Paid.to_string(),
            });
        }
        self.status = CommissionStatus::Paid;
        self.paid_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn commission() -> AgentCommission {
        let collection = AgentCollection::record(
            UserId::new(),
            BusinessId::new(),
            Money::new(dec!(120000), Currency::IQD),
        )
        .unwrap();
        AgentCommission::for_collection(&collection, Rate::from_percentage(dec!(10)))
    }

    #[test]
    fn test_amount_follows_rate() {
        assert_eq!(commission().amount.amount(), dec!(12000));
    }

    #[test]
    fn test_approve_then_pay() {
        let mut c = commission();
        c.approve(Utc::now()).unwrap();
        assert!(c.is_unsettled());
        c.pay(Utc::now()).unwrap();
        assert!(!c.is_unsettled());
    }

    #[test]
    fn test_pending_can_be_paid_directly() {
        let mut c = commission();
        c.pay(Utc::now()).unwrap();
        assert_eq!(c.status, CommissionStatus::Paid);
    }

    #[test]
    fn test_cannot_pay_twice_or_approve_paid() {
        let mut c = commission();
        c.pay(Utc::now()).unwrap();
        assert!(c.pay(Utc::now()).is_err());
        assert!(c.approve(Utc::now()).is_err());
    }
}
