//! Renewal record aggregate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{
    days_between, BusinessId, BusinessPackageId, GovernorateId, PackageId, RenewalContactId,
    RenewalId, UserId,
};
use domain_directory::{Actor, BusinessPackage, Role};

use crate::contact::{ContactType, RenewalContact, RenewalDecision};
use crate::error::RenewalError;
use crate::status::{priority_for, RenewalStatus};

/// Follow-up of one expiring business package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalRecord {
    pub id: RenewalId,
    pub business_package_id: BusinessPackageId,
    pub business_id: BusinessId,
    pub package_id: PackageId,
    pub governorate_id: GovernorateId,
    pub assigned_agent_id: Option<UserId>,
    pub status: RenewalStatus,
    pub priority: u8,
    pub end_date: NaiveDate,
    pub days_remaining: i64,
    pub contact_count: u32,
    pub last_contact_at: Option<DateTime<Utc>>,
    pub next_follow_up: Option<NaiveDate>,
    pub decision: Option<RenewalDecision>,
    pub new_package_id: Option<PackageId>,
    /// Period created when the record renewed
    pub new_business_package_id: Option<BusinessPackageId>,
    pub notes: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of refreshing a record against the business date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Terminal records are left alone
    Skipped,
    Refreshed,
    Expired,
}

/// Result of recording a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub status: RenewalStatus,
    /// Package the successor period is created on, for renewing decisions
    pub renew_into: Option<PackageId>,
}

impl RenewalRecord {
    /// Opens a PENDING record for an expiring business package
    pub fn open(
        business_package: &BusinessPackage,
        governorate_id: GovernorateId,
        assigned_agent_id: Option<UserId>,
        today: NaiveDate,
    ) -> Self {
        let days_remaining = business_package.days_remaining(today);
        let now = Utc::now();

        Self {
            id: RenewalId::new_v7(),
            business_package_id: business_package.id,
            business_id: business_package.business_id,
            package_id: business_package.package_id,
            governorate_id,
            assigned_agent_id,
            status: RenewalStatus::Pending,
            priority: priority_for(days_remaining),
            end_date: business_package.end_date,
            days_remaining,
            contact_count: 0,
            last_contact_at: None,
            next_follow_up: None,
            decision: None,
            new_package_id: None,
            new_business_package_id: None,
            notes: None,
            decided_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn ensure_open(&self) -> Result<(), RenewalError> {
        if self.is_terminal() {
            return Err(RenewalError::Terminal {
                id: self.id.to_string(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Checks that `actor` may work this record
    ///
    /// Admins and supervisors may act on any record; agents only on
    /// records assigned to them.
    pub fn authorize(&self, actor: &Actor) -> Result<(), RenewalError> {
        if actor.is_back_office() {
            return Ok(());
        }
        match actor.role {
            Role::Agent if self.assigned_agent_id == Some(actor.user_id) => Ok(()),
            Role::Agent => Err(RenewalError::NotAssigned(self.id.to_string())),
            other => Err(RenewalError::Forbidden(format!(
                "role {} cannot work renewals",
                other
            ))),
        }
    }

    /// Recomputes days remaining and priority; expires lapsed records
    ///
    /// The end date itself (zero days remaining) is still renewable, so a
    /// record only expires from the following day.
    pub fn refresh(&mut self, today: NaiveDate) -> RefreshOutcome {
        if self.is_terminal() {
            return RefreshOutcome::Skipped;
        }

        self.days_remaining = days_between(today, self.end_date);
        self.priority = priority_for(self.days_remaining);
        self.updated_at = Utc::now();

        if self.days_remaining < 0 {
            self.status = RenewalStatus::Expired;
            RefreshOutcome::Expired
        } else {
            RefreshOutcome::Refreshed
        }
    }

    /// Logs a contact attempt and advances the status
    ///
    /// A visit always lands on VISITED. Remote contact moves PENDING or
    /// POSTPONED records to CONTACTED and leaves VISITED records as they are.
    pub fn log_contact(
        &mut self,
        agent_id: UserId,
        contact_type: ContactType,
        notes: Option<String>,
        outcome: Option<String>,
        next_follow_up: Option<NaiveDate>,
        at: DateTime<Utc>,
    ) -> Result<RenewalContact, RenewalError> {
        self.ensure_open()?;

        self.status = match (contact_type, self.status) {
            (ContactType::Visit, _) => RenewalStatus::Visited,
            (_, RenewalStatus::Pending | RenewalStatus::Postponed) => RenewalStatus::Contacted,
            (_, current) => current,
        };
        self.contact_count += 1;
        self.last_contact_at = Some(at);
        if next_follow_up.is_some() {
            self.next_follow_up = next_follow_up;
        }
        self.updated_at = at;

        Ok(RenewalContact {
            id: RenewalContactId::new_v7(),
            renewal_id: self.id,
            agent_id,
            contact_type,
            notes,
            outcome,
            next_follow_up,
            contacted_at: at,
        })
    }

    /// Records the owner's decision
    ///
    /// Accepting without a package renews on the current one. Upgrades and
    /// downgrades must name the new package, and THINKING needs a follow-up.
    pub fn decide(
        &mut self,
        decision: RenewalDecision,
        new_package_id: Option<PackageId>,
        follow_up: Option<NaiveDate>,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<DecisionOutcome, RenewalError> {
        self.ensure_open()?;

        if decision.requires_package() && new_package_id.is_none() {
            return Err(RenewalError::MissingPackage(decision.to_string()));
        }
        if decision == RenewalDecision::Thinking && follow_up.is_none() {
            return Err(RenewalError::MissingFollowUp);
        }

        let renew_into = decision
            .is_renewing()
            .then(|| new_package_id.unwrap_or(self.package_id));

        self.status = decision.target_status();
        self.decision = Some(decision);
        self.new_package_id = renew_into;
        if decision == RenewalDecision::Thinking {
            self.next_follow_up = follow_up;
        }
        if notes.is_some() {
            self.notes = notes;
        }
        self.decided_at = Some(at);
        self.updated_at = at;

        Ok(DecisionOutcome {
            status: self.status,
            renew_into,
        })
    }

    /// Links the successor period created by a renewing decision
    pub fn link_successor(&mut self, successor: BusinessPackageId) {
        self.new_business_package_id = Some(successor);
    }

    pub fn assign(&mut self, agent_id: UserId) -> Result<(), RenewalError> {
        self.ensure_open()?;
        self.assigned_agent_id = Some(agent_id);
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;
    use core_kernel::{Currency, Money};
    use domain_directory::Package;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record_ending_in(days: u64, today: NaiveDate) -> RenewalRecord {
        let package = Package::new("Silver", Money::new(dec!(75000), Currency::IQD), 30).unwrap();
        let start = today
            .checked_add_days(Days::new(days))
            .unwrap()
            .checked_sub_days(Days::new(30))
            .unwrap();
        let bp = BusinessPackage::start(BusinessId::new(), &package, start);
        RenewalRecord::open(&bp, GovernorateId::new(), Some(UserId::new()), today)
    }

    #[test]
    fn test_open_computes_priority() {
        let today = date(2025, 6, 1);
        let record = record_ending_in(5, today);
        assert_eq!(record.days_remaining, 5);
        assert_eq!(record.priority, 2);
        assert_eq!(record.status, RenewalStatus::Pending);
    }

    #[test]
    fn test_refresh_expires_lapsed_record() {
        let today = date(2025, 6, 1);
        let mut record = record_ending_in(2, today);

        assert_eq!(record.refresh(date(2025, 6, 3)), RefreshOutcome::Refreshed);
        assert_eq!(record.days_remaining, 0);
        assert_eq!(record.refresh(date(2025, 6, 4)), RefreshOutcome::Expired);
        assert_eq!(record.status, RenewalStatus::Expired);
        assert_eq!(record.refresh(date(2025, 6, 5)), RefreshOutcome::Skipped);
    }

    #[test]
    fn test_postponed_record_still_refreshes() {
        let today = date(2025, 6, 1);
        let mut record = record_ending_in(20, today);
        record
            .decide(RenewalDecision::Thinking, None, Some(date(2025, 6, 10)), None, Utc::now())
            .unwrap();

        assert_eq!(record.refresh(date(2025, 6, 15)), RefreshOutcome::Refreshed);
        assert_eq!(record.priority, 2);
    }

    #[test]
    fn test_authorize() {
        let record = record_ending_in(10, date(2025, 6, 1));
        let assigned = record.assigned_agent_id.unwrap();

        assert!(record.authorize(&Actor::new(assigned, Role::Agent)).is_ok());
        assert!(record.authorize(&Actor::new(UserId::new(), Role::Supervisor)).is_ok());
        assert!(matches!(
            record.authorize(&Actor::new(UserId::new(), Role::Agent)),
            Err(RenewalError::NotAssigned(_))
        ));
        assert!(matches!(
            record.authorize(&Actor::new(UserId::new(), Role::Accountant)),
            Err(RenewalError::Forbidden(_))
        ));
    }
}
