//! Governorate manager → admin settlement
//!
//! A manager settlement rolls up the manager's confirmed agent settlements
//! and splits the revenue three ways:
//!
//! ```text
//! total_revenue = agent commissions + company share + manager share
//! company share = total_revenue * company_commission_rate
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{AgentSettlementId, Currency, GovernorateId, ManagerSettlementId, Money, Rate, UserId};
use domain_directory::{Actor, ManagerProfile, Role};

use crate::agent_settlement::{settlement_number, AgentFinancialSettlement};
use crate::error::SettlementError;
use crate::status::{SettlementLevel, SettlementStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerSettlementSnapshot {
    pub currency: Currency,
    /// Sum of the agent settlements' collected totals
    pub total_revenue: Money,
    pub total_agent_commissions: Money,
    pub commission_rate: Rate,
    pub company_share_amount: Money,
    pub manager_share_amount: Money,
    pub agent_settlement_ids: Vec<AgentSettlementId>,
}

impl ManagerSettlementSnapshot {
    /// Aggregates confirmed agent settlements not yet rolled up
    pub fn build(
        manager_id: UserId,
        agent_settlements: &[AgentFinancialSettlement],
        commission_rate: Rate,
        currency: Currency,
    ) -> Result<Self, SettlementError> {
        if agent_settlements.is_empty() {
            return Err(SettlementError::NothingToSettle(format!(
                "manager {} has no confirmed agent settlements to roll up",
                manager_id
            )));
        }

        for s in agent_settlements {
            if s.manager_id != manager_id {
                return Err(SettlementError::not_owner(format!(
                    "agent settlement {} belongs to another manager",
                    s.settlement_number
                )));
            }
            if s.status != SettlementStatus::Confirmed || s.manager_settlement_id.is_some() {
                return Err(SettlementError::ItemAlreadySettled(s.settlement_number.clone()));
            }
        }

        let total_revenue =
            Money::sum(agent_settlements.iter().map(|s| &s.total_collected), currency)?;
        let total_agent_commissions =
            Money::sum(agent_settlements.iter().map(|s| &s.total_commissions), currency)?;
        let company_share_amount = commission_rate.apply(&total_revenue);
        let manager_share_amount = total_revenue
            .checked_sub(&total_agent_commissions)?
            .checked_sub(&company_share_amount)?;

        if manager_share_amount.is_negative() {
            return Err(SettlementError::InvalidAmount(format!(
                "commissions {} and company share {} exceed revenue {}",
                total_agent_commissions, company_share_amount, total_revenue
            )));
        }

        Ok(Self {
            currency,
            total_revenue,
            total_agent_commissions,
            commission_rate,
            company_share_amount,
            manager_share_amount,
            agent_settlement_ids: agent_settlements.iter().map(|s| s.id).collect(),
        })
    }
}

/// Effects of an admin confirming a manager settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfirmation {
    pub settlement_id: ManagerSettlementId,
    pub manager_id: UserId,
    pub agent_settlement_ids: Vec<AgentSettlementId>,
    /// Added to the manager's lifetime earnings
    pub earnings_credit: Money,
    pub confirmed_at: DateTime<Utc>,
}

impl ManagerConfirmation {
    pub fn apply(&self, manager: &mut ManagerProfile) -> Result<(), SettlementError> {
        manager.credit_earnings(&self.earnings_credit)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerFinancialSettlement {
    pub id: ManagerSettlementId,
    pub settlement_number: String,
    pub manager_id: UserId,
    pub governorate_id: GovernorateId,
    pub status: SettlementStatus,
    pub currency: Currency,
    pub total_revenue: Money,
    pub total_agent_commissions: Money,
    pub commission_rate: Rate,
    pub company_share_amount: Money,
    pub manager_share_amount: Money,
    pub agent_settlement_ids: Vec<AgentSettlementId>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<UserId>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<UserId>,
    pub cancellation_reason: Option<String>,
}

impl ManagerFinancialSettlement {
    pub fn create(
        manager: &ManagerProfile,
        snapshot: ManagerSettlementSnapshot,
        open_settlement: Option<ManagerSettlementId>,
        submit: bool,
    ) -> Result<Self, SettlementError> {
        if let Some(existing) = open_settlement {
            return Err(SettlementError::OpenSettlementExists {
                party: format!("Manager {}", manager.user_id),
                settlement: existing.to_string(),
            });
        }

        let id = ManagerSettlementId::new_v7();
        let now = Utc::now();
        let status = if submit {
            SettlementLevel::Manager.pending_status()
        } else {
            SettlementStatus::Draft
        };

        debug!(
            settlement = %id,
            manager = %manager.user_id,
            revenue = %snapshot.total_revenue,
            manager_share = %snapshot.manager_share_amount,
            "Opening manager settlement"
        );

        Ok(Self {
            id,
            settlement_number: settlement_number("MS", &id.as_uuid().simple().to_string(), now),
            manager_id: manager.user_id,
            governorate_id: manager.governorate_id,
            status,
            currency: snapshot.currency,
            total_revenue: snapshot.total_revenue,
            total_agent_commissions: snapshot.total_agent_commissions,
            commission_rate: snapshot.commission_rate,
            company_share_amount: snapshot.company_share_amount,
            manager_share_amount: snapshot.manager_share_amount,
            agent_settlement_ids: snapshot.agent_settlement_ids,
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

    fn is_owner(&self, actor: &Actor) -> bool {
        actor.role == Role::GovernorateManager && actor.user_id == self.manager_id
    }

    pub fn can_view(&self, actor: &Actor) -> bool {
        self.is_owner(actor) || matches!(actor.role, Role::Admin | Role::Accountant)
    }

    pub fn submit(&mut self, actor: &Actor, at: DateTime<Utc>) -> Result<(), SettlementError> {
        if !self.is_owner(actor) {
            return Err(SettlementError::not_owner(format!(
                "only the owning manager may submit settlement {}",
                self.settlement_number
            )));
        }
        self.status = self.status.transition(
            SettlementLevel::Manager,
            SettlementLevel::Manager.pending_status(),
            &self.settlement_number,
        )?;
        self.submitted_at = Some(at);
        Ok(())
    }

    /// Admin acknowledges receipt of the company share
    pub fn confirm(
        &mut self,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<ManagerConfirmation, SettlementError> {
        if !actor.is_admin() {
            return Err(SettlementError::not_owner(
                "only an admin may confirm a manager settlement",
            ));
        }
        self.status = self.status.transition(
            SettlementLevel::Manager,
            SettlementStatus::Confirmed,
            &self.settlement_number,
        )?;
        self.confirmed_at = Some(at);
        self.confirmed_by = Some(actor.user_id);

        Ok(ManagerConfirmation {
            settlement_id: self.id,
            manager_id: self.manager_id,
            agent_settlement_ids: self.agent_settlement_ids.clone(),
            earnings_credit: self.manager_share_amount,
            confirmed_at: at,
        })
    }

    /// Cancels and returns the agent settlements released for a later batch
    pub fn cancel(
        &mut self,
        actor: &Actor,
        reason: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<Vec<AgentSettlementId>, SettlementError> {
        if !(self.is_owner(actor) || actor.is_admin()) {
            return Err(SettlementError::not_owner(format!(
                "cannot cancel settlement {}",
                self.settlement_number
            )));
        }
        self.status = self.status.transition(
            SettlementLevel::Manager,
            SettlementStatus::Cancelled,
            &self.settlement_number,
        )?;
        self.cancelled_at = Some(at);
        self.cancelled_by = Some(actor.user_id);
        self.cancellation_reason = Some(reason.into());

        Ok(self.agent_settlement_ids.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_rollup_is_nothing_to_settle() {
        let result = ManagerSettlementSnapshot::build(
            UserId::new(),
            &[],
            Rate::from_percentage(dec!(40)),
            Currency::IQD,
        );
        assert!(matches!(result, Err(SettlementError::NothingToSettle(_))));
    }
}
