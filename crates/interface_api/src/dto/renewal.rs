//! Renewal DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_renewal::{ContactType, RenewalContact, RenewalDecision, RenewalRecord};
use infra_db::DecisionResult;

use super::finance::{CollectionResponse, CommissionResponse};
use super::positive_amount;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LogContactRequest {
    pub contact_type: ContactType,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 500))]
    pub outcome: Option<String>,
    pub next_follow_up: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub decision: RenewalDecision,
    pub new_package_id: Option<Uuid>,
    pub next_follow_up: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Cash taken for the new period, recorded as a collection
    #[validate(custom(function = "positive_amount"))]
    pub collected_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub agent_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalResponse {
    pub id: Uuid,
    pub business_package_id: Uuid,
    pub business_id: Uuid,
    pub package_id: Uuid,
    pub governorate_id: Uuid,
    pub assigned_agent_id: Option<Uuid>,
    pub status: String,
    pub priority: u8,
    pub end_date: NaiveDate,
    pub days_remaining: i64,
    pub contact_count: u32,
    pub last_contact_at: Option<DateTime<Utc>>,
    pub next_follow_up: Option<NaiveDate>,
    pub decision: Option<RenewalDecision>,
    pub new_package_id: Option<Uuid>,
    pub new_business_package_id: Option<Uuid>,
    pub notes: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&RenewalRecord> for RenewalResponse {
    fn from(r: &RenewalRecord) -> Self {
        Self {
            id: r.id.into(),
            business_package_id: r.business_package_id.into(),
            business_id: r.business_id.into(),
            package_id: r.package_id.into(),
            governorate_id: r.governorate_id.into(),
            assigned_agent_id: r.assigned_agent_id.map(Uuid::from),
            status: r.status.as_str().to_string(),
            priority: r.priority,
            end_date: r.end_date,
            days_remaining: r.days_remaining,
            contact_count: r.contact_count,
            last_contact_at: r.last_contact_at,
            next_follow_up: r.next_follow_up,
            decision: r.decision,
            new_package_id: r.new_package_id.map(Uuid::from),
            new_business_package_id: r.new_business_package_id.map(Uuid::from),
            notes: r.notes.clone(),
            decided_at: r.decided_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub id: Uuid,
    pub renewal_id: Uuid,
    pub agent_id: Uuid,
    pub contact_type: ContactType,
    pub notes: Option<String>,
    pub outcome: Option<String>,
    pub next_follow_up: Option<NaiveDate>,
    pub contacted_at: DateTime<Utc>,
}

impl From<&RenewalContact> for ContactResponse {
    fn from(c: &RenewalContact) -> Self {
        Self {
            id: c.id.into(),
            renewal_id: c.renewal_id.into(),
            agent_id: c.agent_id.into(),
            contact_type: c.contact_type,
            notes: c.notes.clone(),
            outcome: c.outcome.clone(),
            next_follow_up: c.next_follow_up,
            contacted_at: c.contacted_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedContactResponse {
    pub renewal: RenewalResponse,
    pub contact: ContactResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub renewal: RenewalResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<CommissionResponse>,
}

impl From<&DecisionResult> for DecisionResponse {
    fn from(result: &DecisionResult) -> Self {
        Self {
            renewal: (&result.record).into(),
            collection: result.collection.as_ref().map(|(c, _)| c.into()),
            commission: result.collection.as_ref().map(|(_, c)| c.into()),
        }
    }
}
