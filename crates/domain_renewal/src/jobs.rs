//! The two daily renewal jobs

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use tracing::{debug, info};

use crate::error::RenewalError;
use crate::planner::{plan_new_records, JobSummary};
use crate::ports::RenewalStore;
use crate::record::RefreshOutcome;

/// Runs record creation and refresh against a `RenewalStore`
#[derive(Clone)]
pub struct RenewalJobs {
    store: Arc<dyn RenewalStore>,
    horizon_days: u32,
}

impl RenewalJobs {
    pub fn new(store: Arc<dyn RenewalStore>, horizon_days: u32) -> Self {
        Self { store, horizon_days }
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    /// Opens records for packages expiring within the horizon
    pub async fn create_records(&self, today: NaiveDate) -> Result<JobSummary, RenewalError> {
        let until = today
            .checked_add_days(Days::new(u64::from(self.horizon_days)))
            .ok_or_else(|| RenewalError::Invalid(format!("horizon overflows from {}", today)))?;

        let candidates = self.store.expiring_packages(today, until).await?;
        let plan = plan_new_records(&candidates, today, self.horizon_days);

        let mut summary = plan.summary;
        if !plan.records.is_empty() {
            let inserted = self.store.insert_records(&plan.records).await?;
            // lost a race with a concurrent run
            summary.skipped_duplicate += summary.created.saturating_sub(inserted);
            summary.created = inserted;
        }

        info!(
            created = summary.created,
            skipped_default = summary.skipped_default,
            skipped_duplicate = summary.skipped_duplicate,
            %today,
            "Renewal records created"
        );
        Ok(summary)
    }

    /// Recomputes priority on open records and expires lapsed ones
    pub async fn refresh_records(&self, today: NaiveDate) -> Result<JobSummary, RenewalError> {
        let mut records = self.store.open_records().await?;
        let mut summary = JobSummary::default();

        for record in records.iter_mut() {
            match record.refresh(today) {
                RefreshOutcome::Refreshed => summary.refreshed += 1,
                RefreshOutcome::Expired => {
                    debug!(renewal = %record.id, end_date = %record.end_date, "Renewal expired");
                    summary.expired += 1;
                }
                RefreshOutcome::Skipped => {}
            }
        }
        self.store.save_refreshed(&records, today).await?;

        info!(
            refreshed = summary.refreshed,
            expired = summary.expired,
            %today,
            "Renewal records refreshed"
        );
        Ok(summary)
    }

    /// Runs creation then refresh, one after the other
    pub async fn run_daily(&self, today: NaiveDate) -> Result<JobSummary, RenewalError> {
        let created = self.create_records(today).await?;
        let refreshed = self.refresh_records(today).await?;
        Ok(created.merge(refreshed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::ExpiringPackage;
    use crate::ports::mock::MockRenewalStore;
    use crate::contact::ContactType;
    use crate::status::RenewalStatus;
    use chrono::Utc;
    use core_kernel::{BusinessId, Currency, GovernorateId, Money, UserId};
    use domain_directory::{BusinessPackage, BusinessPackageStatus, Package};
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn expiring(ends_in: u64) -> ExpiringPackage {
        let package = Package::new("Gold", Money::new(dec!(150000), Currency::IQD), 30).unwrap();
        let start = today()
            .checked_add_days(Days::new(ends_in))
            .unwrap()
            .checked_sub_days(Days::new(30))
            .unwrap();
        ExpiringPackage {
            business_package: BusinessPackage::start(BusinessId::new(), &package, start),
            governorate_id: GovernorateId::new(),
            package_is_default: false,
            has_renewal: false,
            governorate_agents: vec![UserId::new()],
        }
    }

    #[tokio::test]
    async fn test_second_run_skips_duplicates() {
        let store = MockRenewalStore::with_packages(vec![expiring(3), expiring(20), expiring(45)]).await;
        let jobs = RenewalJobs::new(Arc::new(store.clone()), 30);

        let first = jobs.create_records(today()).await.unwrap();
        assert_eq!(first.created, 2);

        let second = jobs.create_records(today()).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped_duplicate, 2);
        assert_eq!(store.records().await.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_expires_after_end_date() {
        let soon = expiring(2);
        let bp_id = soon.business_package.id;
        let store = MockRenewalStore::with_packages(vec![soon, expiring(20)]).await;
        let jobs = RenewalJobs::new(Arc::new(store.clone()), 30);
        jobs.create_records(today()).await.unwrap();

        let later = today().checked_add_days(Days::new(3)).unwrap();
        let summary = jobs.refresh_records(later).await.unwrap();

        assert_eq!(summary.expired, 1);
        assert_eq!(summary.refreshed, 1);
        let record = store.record_for(bp_id).await.unwrap();
        assert_eq!(record.status, RenewalStatus::Expired);
        assert_eq!(record.priority, 3);
        let period = store.package(bp_id).await.unwrap().business_package;
        assert_eq!(period.status, BusinessPackageStatus::Expired);
    }

    #[tokio::test]
    async fn test_refresh_keeps_record_open_on_end_date() {
        let soon = expiring(2);
        let bp_id = soon.business_package.id;
        let store = MockRenewalStore::with_packages(vec![soon]).await;
        let jobs = RenewalJobs::new(Arc::new(store.clone()), 30);
        jobs.create_records(today()).await.unwrap();

        let end_date = today().checked_add_days(Days::new(2)).unwrap();
        let summary = jobs.refresh_records(end_date).await.unwrap();

        assert_eq!(summary.expired, 0);
        let record = store.record_for(bp_id).await.unwrap();
        assert_eq!(record.status, RenewalStatus::Pending);
        assert_eq!(record.days_remaining, 0);
        let period = store.package(bp_id).await.unwrap().business_package;
        assert_eq!(period.status, BusinessPackageStatus::Active);
    }

    #[tokio::test]
    async fn test_save_refreshed_keeps_contact_logged_after_load() {
        let store = MockRenewalStore::with_packages(vec![expiring(10)]).await;
        let jobs = RenewalJobs::new(Arc::new(store.clone()), 30);
        jobs.create_records(today()).await.unwrap();

        let mut loaded = store.open_records().await.unwrap();
        for record in loaded.iter_mut() {
            record.refresh(today());
        }

        let mut visited = loaded[0].clone();
        visited
            .log_contact(UserId::new(), ContactType::Visit, None, None, None, Utc::now())
            .unwrap();
        store.replace_record(visited).await;

        store.save_refreshed(&loaded, today()).await.unwrap();

        let record = store.records().await.remove(0);
        assert_eq!(record.status, RenewalStatus::Visited);
        assert_eq!(record.contact_count, 1);
        assert_eq!(record.days_remaining, 10);
    }

    #[tokio::test]
    async fn test_run_daily_merges_summaries() {
        let store = MockRenewalStore::with_packages(vec![expiring(5)]).await;
        let jobs = RenewalJobs::new(Arc::new(store), 30);

        let summary = jobs.run_daily(today()).await.unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.refreshed, 1);
        assert_eq!(summary.expired, 0);
    }
}
