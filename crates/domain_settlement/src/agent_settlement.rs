//! Agent → governorate manager settlement

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{
    AgentSettlementId, CollectionId, CommissionId, Currency, GovernorateId,
    ManagerSettlementId, Money, UserId,
};
use domain_directory::{Actor, AgentProfile, Role};

use crate::collection::AgentCollection;
use crate::commission::AgentCommission;
use crate::error::SettlementError;
use crate::status::{SettlementLevel, SettlementStatus};

/// Totals and item IDs frozen into a settlement when it is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSettlementSnapshot {
    pub currency: Currency,
    pub total_collected: Money,
    pub total_commissions: Money,
    /// Cash the agent hands over: collected minus commissions kept
    pub net_amount: Money,
    pub collection_ids: Vec<CollectionId>,
    pub commission_ids: Vec<CommissionId>,
}

impl AgentSettlementSnapshot {
    /// Aggregates an agent's unsettled collections and commissions
    pub fn build(
        agent_id: UserId,
        collections: &[AgentCollection],
        commissions: &[AgentCommission],
        currency: Currency,
    ) -> Result<Self, SettlementError> {
        if collections.is_empty() && commissions.is_empty() {
            return Err(SettlementError::NothingToSettle(format!(
                "agent {} has no unsettled collections or commissions",
                agent_id
            )));
        }

        for c in collections {
            if c.agent_id != agent_id {
                return Err(SettlementError::not_owner(format!(
                    "collection {} belongs to another agent",
                    c.id
                )));
            }
            if !c.is_unsettled() {
                return Err(SettlementError::ItemAlreadySettled(c.id.to_string()));
            }
        }
        for c in commissions {
            if c.agent_id != agent_id {
                return Err(SettlementError::not_owner(format!(
                    "commission {} belongs to another agent",
                    c.id
                )));
            }
            if !c.is_unsettled() {
                return Err(SettlementError::ItemAlreadySettled(c.id.to_string()));
            }
        }

        let total_collected = Money::sum(collections.iter().map(|c| &c.amount), currency)?;
        let total_commissions = Money::sum(commissions.iter().map(|c| &c.amount), currency)?;
        let net_amount = total_collected.checked_sub(&total_commissions)?;

        Ok(Self {
            currency,
            total_collected,
            total_commissions,
            net_amount,
            collection_ids: collections.iter().map(|c| c.id).collect(),
            commission_ids: commissions.iter().map(|c| c.id).collect(),
        })
    }
}

/// What the persistence layer must apply when a settlement is confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfirmation {
    pub settlement_id: AgentSettlementId,
    pub agent_id: UserId,
    pub verified_collections: Vec<CollectionId>,
    pub paid_commissions: Vec<CommissionId>,
    /// Added to the agent's lifetime earnings; equals the commissions paid
    pub earnings_credit: Money,
    pub confirmed_at: DateTime<Utc>,
}

impl AgentConfirmation {
    /// Applies the confirmation to loaded items and the agent profile
    pub fn apply(
        &self,
        collections: &mut [AgentCollection],
        commissions: &mut [AgentCommission],
        agent: &mut AgentProfile,
    ) -> Result<(), SettlementError> {
        for c in collections
            .iter_mut()
            .filter(|c| self.verified_collections.contains(&c.id))
        {
            c.verify(self.confirmed_at)?;
        }
        for c in commissions
            .iter_mut()
            .filter(|c| self.paid_commissions.contains(&c.id))
        {
            c.pay(self.confirmed_at)?;
        }
        agent.credit_earnings(&self.earnings_credit)?;
        Ok(())
    }
}

/// Items released back to the agent when a settlement is cancelled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCancellation {
    pub settlement_id: AgentSettlementId,
    pub released_collections: Vec<CollectionId>,
    pub released_commissions: Vec<CommissionId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFinancialSettlement {
    pub id: AgentSettlementId,
    pub settlement_number: String,
    pub agent_id: UserId,
    pub manager_id: UserId,
    pub governorate_id: GovernorateId,
    pub status: SettlementStatus,
    pub currency: Currency,
    pub total_collected: Money,
    pub total_commissions: Money,
    pub net_amount: Money,
    pub collection_ids: Vec<CollectionId>,
    pub commission_ids: Vec<CommissionId>,
    /// Manager settlement this one was rolled into, once confirmed
    pub manager_settlement_id: Option<ManagerSettlementId>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<UserId>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<UserId>,
    pub cancellation_reason: Option<String>,
}

impl AgentFinancialSettlement {
    /// Opens a settlement for `agent` from a snapshot
    ///
    /// Fails when the agent still has an open settlement or no manager.
    /// With `submit` the settlement goes straight to PENDING_MANAGER,
    /// otherwise it stays a DRAFT.
    pub fn create(
        agent: &AgentProfile,
        snapshot: AgentSettlementSnapshot,
        open_settlement: Option<AgentSettlementId>,
        submit: bool,
    ) -> Result<Self, SettlementError> {
        if let Some(existing) = open_settlement {
            return Err(SettlementError::OpenSettlementExists {
                party: format!("Agent {}", agent.user_id),
                settlement: existing.to_string(),
            });
        }
        let manager_id = agent
            .manager_id
            .ok_or_else(|| SettlementError::NoManagerAssigned(agent.user_id.to_string()))?;

        let id = AgentSettlementId::new_v7();
        let now = Utc::now();
        let status = if submit {
            SettlementLevel::Agent.pending_status()
        } else {
            SettlementStatus::Draft
        };

        debug!(
            settlement = %id,
            agent = %agent.user_id,
            collected = %snapshot.total_collected,
            commissions = %snapshot.total_commissions,
            "Opening agent settlement"
        );

        Ok(Self {
            id,
            settlement_number: settlement_number("AS", &id.as_uuid().simple().to_string(), now),
            agent_id: agent.user_id,
            manager_id,
            governorate_id: agent.governorate_id,
            status,
            currency: snapshot.currency,
            total_collected: snapshot.total_collected,
            total_commissions: snapshot.total_commissions,
            net_amount: snapshot.net_amount,
            collection_ids: snapshot.collection_ids,
            commission_ids: snapshot.commission_ids,
            manager_settlement_id: None,
            notes: None,
            created_at: now,
            submitted_at: submit.then_some(now),
            confirmed_at: None,
            confirmed_by: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
        })
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    fn is_owner_agent(&self, actor: &Actor) -> bool {
        actor.role == Role::Agent && actor.user_id == self.agent_id
    }

    fn is_owner_manager(&self, actor: &Actor) -> bool {
        actor.role == Role::GovernorateManager && actor.user_id == self.manager_id
    }

    /// Whether `actor` may read this settlement
    pub fn can_view(&self, actor: &Actor) -> bool {
        self.is_owner_agent(actor)
            || self.is_owner_manager(actor)
            || matches!(actor.role, Role::Admin | Role::Supervisor | Role::Accountant)
    }

    /// Sends a draft to the manager; only the owning agent may submit
    pub fn submit(&mut self, actor: &Actor, at: DateTime<Utc>) -> Result<(), SettlementError> {
        if !self.is_owner_agent(actor) {
            return Err(SettlementError::not_owner(format!(
                "only the owning agent may submit settlement {}",
                self.settlement_number
            )));
        }
        self.status = self.status.transition(
            SettlementLevel::Agent,
            SettlementLevel::Agent.pending_status(),
            &self.settlement_number,
        )?;
        self.submitted_at = Some(at);
        Ok(())
    }

    /// Confirms receipt of the cash; the owning manager or an admin only
    pub fn confirm(
        &mut self,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<AgentConfirmation, SettlementError> {
        if !(self.is_owner_manager(actor) || actor.is_admin()) {
            return Err(SettlementError::not_owner(format!(
                "settlement {} is not addressed to this manager",
                self.settlement_number
            )));
        }
        self.status = self.status.transition(
            SettlementLevel::Agent,
            SettlementStatus::Confirmed,
            &self.settlement_number,
        )?;
        self.confirmed_at = Some(at);
        self.confirmed_by = Some(actor.user_id);

        Ok(AgentConfirmation {
            settlement_id: self.id,
            agent_id: self.agent_id,
            verified_collections: self.collection_ids.clone(),
            paid_commissions: self.commission_ids.clone(),
            earnings_credit: self.total_commissions,
            confirmed_at: at,
        })
    }

    /// Cancels an open settlement and releases its items
    pub fn cancel(
        &mut self,
        actor: &Actor,
        reason: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<AgentCancellation, SettlementError> {
        if !(self.is_owner_agent(actor) || self.is_owner_manager(actor) || actor.is_admin()) {
            return Err(SettlementError::not_owner(format!(
                "cannot cancel settlement {}",
                self.settlement_number
            )));
        }
        self.status = self.status.transition(
            SettlementLevel::Agent,
            SettlementStatus::Cancelled,
            &self.settlement_number,
        )?;
        self.cancelled_at = Some(at);
        self.cancelled_by = Some(actor.user_id);
        self.cancellation_reason = Some(reason.into());

        Ok(AgentCancellation {
            settlement_id: self.id,
            released_collections: self.collection_ids.clone(),
            released_commissions: self.commission_ids.clone(),
        })
    }
}

/// Human-readable number such as `AS-20250310-0193A4F2`
pub(crate) fn settlement_number(prefix: &str, id_hex: &str, at: DateTime<Utc>) -> String {
    let short = &id_hex[id_hex.len().saturating_sub(8)..];
    format!("{}-{}-{}", prefix, at.format("%Y%m%d"), short.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{BusinessId, Rate};
    use rust_decimal_macros::dec;

    fn agent() -> AgentProfile {
        AgentProfile {
            user_id: UserId::new(),
            full_name: "Ali".to_string(),
            governorate_id: GovernorateId::new(),
            manager_id: Some(UserId::new()),
            commission_rate: Rate::from_percentage(dec!(10)),
            lifetime_earnings: Money::zero(Currency::IQD),
        }
    }

    #[test]
    fn test_settlement_number_format() {
        let at = DateTime::parse_from_rfc3339("2025-03-10T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let n = settlement_number("AS", "0193a4f2e1b07c55aa10bc9d3e4f5a6b", at);
        assert_eq!(n, "AS-20250310-3E4F5A6B");
    }

    #[test]
    fn test_snapshot_rejects_foreign_items() {
        let a = agent();
        let other = AgentCollection::record(
            UserId::new(),
            BusinessId::new(),
            Money::new(dec!(1000), Currency::IQD),
        )
        .unwrap();

        let result = AgentSettlementSnapshot::build(a.user_id, &[other], &[], Currency::IQD);
        assert!(matches!(result, Err(SettlementError::NotOwner(_))));
    }

    #[test]
    fn test_draft_has_no_submitted_at() {
        let a = agent();
        let c = AgentCollection::record(
            a.user_id,
            BusinessId::new(),
            Money::new(dec!(1000), Currency::IQD),
        )
        .unwrap();
        let snapshot = AgentSettlementSnapshot::build(a.user_id, &[c], &[], Currency::IQD).unwrap();
        let s = AgentFinancialSettlement::create(&a, snapshot, None, false).unwrap();

        assert_eq!(s.status, SettlementStatus::Draft);
        assert!(s.submitted_at.is_none());
    }
}
