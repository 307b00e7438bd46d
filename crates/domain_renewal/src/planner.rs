//! Planning for the daily record-creation job

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{GovernorateId, UserId};
use domain_directory::{BusinessPackage, BusinessPackageStatus};

use crate::record::RenewalRecord;

/// An active business package close to its end date, with the facts the
/// planner needs to decide whether to follow it up
#[derive(Debug, Clone)]
pub struct ExpiringPackage {
    pub business_package: BusinessPackage,
    pub governorate_id: GovernorateId,
    pub package_is_default: bool,
    /// A renewal record already exists for this business package
    pub has_renewal: bool,
    /// Agents working the business's governorate
    pub governorate_agents: Vec<UserId>,
}

/// Counters reported by the daily jobs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub created: u32,
    pub skipped_default: u32,
    pub skipped_duplicate: u32,
    pub refreshed: u32,
    pub expired: u32,
}

impl JobSummary {
    pub fn merge(self, other: JobSummary) -> JobSummary {
        JobSummary {
            created: self.created + other.created,
            skipped_default: self.skipped_default + other.skipped_default,
            skipped_duplicate: self.skipped_duplicate + other.skipped_duplicate,
            refreshed: self.refreshed + other.refreshed,
            expired: self.expired + other.expired,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreationPlan {
    pub records: Vec<RenewalRecord>,
    pub summary: JobSummary,
}

/// Chooses which expiring packages get a new PENDING record
///
/// Only ACTIVE packages ending between `today` and `today + horizon_days`
/// (inclusive) are considered. Default-tier packages and packages that
/// already have a record are counted and skipped. The record is assigned
/// when exactly one agent covers the governorate.
pub fn plan_new_records(
    candidates: &[ExpiringPackage],
    today: NaiveDate,
    horizon_days: u32,
) -> CreationPlan {
    let mut plan = CreationPlan::default();

    for candidate in candidates {
        let bp = &candidate.business_package;
        let days = bp.days_remaining(today);
        if bp.status != BusinessPackageStatus::Active || days < 0 || days > i64::from(horizon_days) {
            continue;
        }
        if candidate.package_is_default {
            plan.summary.skipped_default += 1;
            continue;
        }
        if candidate.has_renewal {
            plan.summary.skipped_duplicate += 1;
            continue;
        }

        let assignee = match candidate.governorate_agents.as_slice() {
            [only] => Some(*only),
            _ => None,
        };
        plan.records
            .push(RenewalRecord::open(bp, candidate.governorate_id, assignee, today));
        plan.summary.created += 1;
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;
    use core_kernel::{BusinessId, Currency, Money};
    use domain_directory::Package;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn candidate(ends_in: u64, agents: Vec<UserId>) -> ExpiringPackage {
        let package = Package::new("Gold", Money::new(dec!(150000), Currency::IQD), 365).unwrap();
        let start = today()
            .checked_add_days(Days::new(ends_in))
            .unwrap()
            .checked_sub_days(Days::new(365))
            .unwrap();
        ExpiringPackage {
            business_package: BusinessPackage::start(BusinessId::new(), &package, start),
            governorate_id: GovernorateId::new(),
            package_is_default: false,
            has_renewal: false,
            governorate_agents: agents,
        }
    }

    #[test]
    fn test_single_agent_is_assigned() {
        let agent = UserId::new();
        let plan = plan_new_records(&[candidate(10, vec![agent])], today(), 30);

        assert_eq!(plan.summary.created, 1);
        assert_eq!(plan.records[0].assigned_agent_id, Some(agent));
        assert_eq!(plan.records[0].priority, 1);
    }

    #[test]
    fn test_ambiguous_agents_leave_record_unassigned() {
        let plan = plan_new_records(
            &[candidate(10, vec![UserId::new(), UserId::new()]), candidate(12, vec![])],
            today(),
            30,
        );
        assert_eq!(plan.summary.created, 2);
        assert!(plan.records.iter().all(|r| r.assigned_agent_id.is_none()));
    }

    #[test]
    fn test_skips_default_and_duplicates() {
        let mut default = candidate(5, vec![]);
        default.package_is_default = true;
        let mut duplicate = candidate(5, vec![]);
        duplicate.has_renewal = true;

        let plan = plan_new_records(&[default, duplicate, candidate(5, vec![])], today(), 30);
        assert_eq!(plan.summary.created, 1);
        assert_eq!(plan.summary.skipped_default, 1);
        assert_eq!(plan.summary.skipped_duplicate, 1);
    }

    #[test]
    fn test_horizon_is_inclusive() {
        let plan = plan_new_records(
            &[candidate(0, vec![]), candidate(30, vec![]), candidate(31, vec![])],
            today(),
            30,
        );
        assert_eq!(plan.summary.created, 2);
    }
}
