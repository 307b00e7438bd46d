//! Collection, commission and settlement DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_settlement::{
    AgentCollection, AgentCommission, AgentFinancialSettlement, AgentSettlementSnapshot,
    ManagerFinancialSettlement, ManagerSettlementSnapshot,
};

use super::positive_amount;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    pub business_id: Uuid,
    pub business_package_id: Option<Uuid>,
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSettlementRequest {
    /// Keep the settlement as a DRAFT instead of submitting it
    #[serde(default)]
    pub save_as_draft: bool,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelSettlementRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResponse {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub business_id: Uuid,
    pub business_package_id: Option<Uuid>,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub settlement_id: Option<Uuid>,
    pub notes: Option<String>,
    pub collected_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl From<&AgentCollection> for CollectionResponse {
    fn from(c: &AgentCollection) -> Self {
        Self {
            id: c.id.into(),
            agent_id: c.agent_id.into(),
            business_id: c.business_id.into(),
            business_package_id: c.business_package_id.map(Uuid::from),
            amount: c.amount.amount(),
            currency: c.amount.currency().code().to_string(),
            status: c.status.as_str().to_string(),
            settlement_id: c.settlement_id.map(Uuid::from),
            notes: c.notes.clone(),
            collected_at: c.collected_at,
            verified_at: c.verified_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionResponse {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub collection_id: Option<Uuid>,
    pub business_id: Uuid,
    pub amount: Decimal,
    /// Percentage, e.g. 10 for 10%
    pub rate: Decimal,
    pub status: String,
    pub settlement_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<&AgentCommission> for CommissionResponse {
    fn from(c: &AgentCommission) -> Self {
        Self {
            id: c.id.into(),
            agent_id: c.agent_id.into(),
            collection_id: c.collection_id.map(Uuid::from),
            business_id: c.business_id.into(),
            amount: c.amount.amount(),
            rate: c.rate.as_percentage(),
            status: c.status.as_str().to_string(),
            settlement_id: c.settlement_id.map(Uuid::from),
            created_at: c.created_at,
            approved_at: c.approved_at,
            paid_at: c.paid_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedCollectionResponse {
    pub collection: CollectionResponse,
    pub commission: CommissionResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSettlementPreview {
    pub currency: String,
    pub total_collected: Decimal,
    pub total_commissions: Decimal,
    pub net_amount: Decimal,
    pub collection_count: usize,
    pub commission_count: usize,
    pub collection_ids: Vec<Uuid>,
    pub commission_ids: Vec<Uuid>,
}

impl From<&AgentSettlementSnapshot> for AgentSettlementPreview {
    fn from(s: &AgentSettlementSnapshot) -> Self {
        Self {
            currency: s.currency.code().to_string(),
            total_collected: s.total_collected.amount(),
            total_commissions: s.total_commissions.amount(),
            net_amount: s.net_amount.amount(),
            collection_count: s.collection_ids.len(),
            commission_count: s.commission_ids.len(),
            collection_ids: s.collection_ids.iter().map(|id| Uuid::from(*id)).collect(),
            commission_ids: s.commission_ids.iter().map(|id| Uuid::from(*id)).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSettlementResponse {
    pub id: Uuid,
    pub settlement_number: String,
    pub agent_id: Uuid,
    pub manager_id: Uuid,
    pub governorate_id: Uuid,
    pub status: String,
    pub currency: String,
    pub total_collected: Decimal,
    /// Commissions paid to the agent on confirmation
    pub total_commissions: Decimal,
    /// Cash the agent hands over
    pub net_amount: Decimal,
    pub collection_ids: Vec<Uuid>,
    pub commission_ids: Vec<Uuid>,
    pub manager_settlement_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,
}

impl From<&AgentFinancialSettlement> for AgentSettlementResponse {
    fn from(s: &AgentFinancialSettlement) -> Self {
        Self {
            id: s.id.into(),
            settlement_number: s.settlement_number.clone(),
            agent_id: s.agent_id.into(),
            manager_id: s.manager_id.into(),
            governorate_id: s.governorate_id.into(),
            status: s.status.as_str().to_string(),
            currency: s.currency.code().to_string(),
            total_collected: s.total_collected.amount(),
            total_commissions: s.total_commissions.amount(),
            net_amount: s.net_amount.amount(),
            collection_ids: s.collection_ids.iter().map(|id| Uuid::from(*id)).collect(),
            commission_ids: s.commission_ids.iter().map(|id| Uuid::from(*id)).collect(),
            manager_settlement_id: s.manager_settlement_id.map(Uuid::from),
            notes: s.notes.clone(),
            created_at: s.created_at,
            submitted_at: s.submitted_at,
            confirmed_at: s.confirmed_at,
            confirmed_by: s.confirmed_by.map(Uuid::from),
            cancelled_at: s.cancelled_at,
            cancelled_by: s.cancelled_by.map(Uuid::from),
            cancellation_reason: s.cancellation_reason.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSettlementPreview {
    pub currency: String,
    pub total_revenue: Decimal,
    pub total_agent_commissions: Decimal,
    pub commission_rate: Decimal,
    pub company_share_amount: Decimal,
    pub manager_share_amount: Decimal,
    pub agent_settlement_ids: Vec<Uuid>,
}

impl From<&ManagerSettlementSnapshot> for ManagerSettlementPreview {
    fn from(s: &ManagerSettlementSnapshot) -> Self {
        Self {
            currency: s.currency.code().to_string(),
            total_revenue: s.total_revenue.amount(),
            total_agent_commissions: s.total_agent_commissions.amount(),
            commission_rate: s.commission_rate.as_percentage(),
            company_share_amount: s.company_share_amount.amount(),
            manager_share_amount: s.manager_share_amount.amount(),
            agent_settlement_ids: s.agent_settlement_ids.iter().map(|id| Uuid::from(*id)).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSettlementResponse {
    pub id: Uuid,
    pub settlement_number: String,
    pub manager_id: Uuid,
    pub governorate_id: Uuid,
    pub status: String,
    pub currency: String,
    pub total_revenue: Decimal,
    pub total_agent_commissions: Decimal,
    pub commission_rate: Decimal,
    pub company_share_amount: Decimal,
    pub manager_share_amount: Decimal,
    pub agent_settlement_ids: Vec<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,
}

impl From<&ManagerFinancialSettlement> for ManagerSettlementResponse {
    fn from(s: &ManagerFinancialSettlement) -> Self {
        Self {
            id: s.id.into(),
            settlement_number: s.settlement_number.clone(),
            manager_id: s.manager_id.into(),
            governorate_id: s.governorate_id.into(),
            status: s.status.as_str().to_string(),
            currency: s.currency.code().to_string(),
            total_revenue: s.total_revenue.amount(),
            total_agent_commissions: s.total_agent_commissions.amount(),
            commission_rate: s.commission_rate.as_percentage(),
            company_share_amount: s.company_share_amount.amount(),
            manager_share_amount: s.manager_share_amount.amount(),
            agent_settlement_ids: s.agent_settlement_ids.iter().map(|id| Uuid::from(*id)).collect(),
            notes: s.notes.clone(),
            created_at: s.created_at,
            submitted_at: s.submitted_at,
            confirmed_at: s.confirmed_at,
            confirmed_by: s.confirmed_by.map(Uuid::from),
            cancelled_at: s.cancelled_at,
            cancelled_by: s.cancelled_by.map(Uuid::from),
            cancellation_reason: s.cancellation_reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_collection_request_validation() {
        let request: CreateCollectionRequest = serde_json::from_value(serde_json::json!({
            "businessId": Uuid::new_v4(),
            "amount": "0",
        }))
        .unwrap();
        assert!(request.validate().is_err());

        let request: CreateCollectionRequest = serde_json::from_value(serde_json::json!({
            "businessId": Uuid::new_v4(),
            "amount": "25000",
            "notes": "cash",
        }))
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.amount, dec!(25000));
    }

    #[test]
    fn test_create_settlement_defaults_to_submit() {
        let request: CreateSettlementRequest = serde_json::from_str("{}").unwrap();
        assert!(!request.save_as_draft);
    }

    #[test]
    fn test_cancel_requires_reason() {
        let request = CancelSettlementRequest { reason: String::new() };
        assert!(request.validate().is_err());
    }
}
