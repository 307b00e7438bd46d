//! Storage port for the daily renewal jobs
//!
//! The jobs only need a handful of queries, so they depend on this trait
//! rather than on the database crate. `infra_db` provides the PostgreSQL
//! implementation; the in-memory `mock` backs unit tests.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::RenewalError;
use crate::planner::ExpiringPackage;
use crate::record::RenewalRecord;

#[async_trait]
pub trait RenewalStore: Send + Sync {
    /// ACTIVE business packages ending between `from` and `until` inclusive
    async fn expiring_packages(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<ExpiringPackage>, RenewalError>;

    /// Inserts new records, ignoring any whose business package already has
    /// one; returns how many were inserted
    async fn insert_records(&self, records: &[RenewalRecord]) -> Result<u32, RenewalError>;

    /// All non-terminal records
    async fn open_records(&self) -> Result<Vec<RenewalRecord>, RenewalError>;

    /// Persists refreshed days remaining and priority
    ///
    /// Status is written only for records the refresh expired, so contacts
    /// and decisions made since `open_records` are kept. Expiring a record
    /// also expires its business package once it has lapsed on `today`.
    async fn save_refreshed(
        &self,
        records: &[RenewalRecord],
        today: NaiveDate,
    ) -> Result<(), RenewalError>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::{BusinessPackageId, RenewalId};

    use crate::status::RenewalStatus;

    /// In-memory store for job tests
    #[derive(Debug, Default, Clone)]
    pub struct MockRenewalStore {
        packages: Arc<RwLock<Vec<ExpiringPackage>>>,
        records: Arc<RwLock<HashMap<RenewalId, RenewalRecord>>>,
    }

    impl MockRenewalStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn with_packages(packages: Vec<ExpiringPackage>) -> Self {
            let store = Self::new();
            *store.packages.write().await = packages;
            store
        }

        pub async fn records(&self) -> Vec<RenewalRecord> {
            self.records.read().await.values().cloned().collect()
        }

        pub async fn record_for(&self, bp: BusinessPackageId) -> Option<RenewalRecord> {
            self.records
                .read()
                .await
                .values()
                .find(|r| r.business_package_id == bp)
                .cloned()
        }

        /// Stands in for a contact or decision committed while a refresh runs
        pub async fn replace_record(&self, record: RenewalRecord) {
            self.records.write().await.insert(record.id, record);
        }

        pub async fn package(&self, bp: BusinessPackageId) -> Option<ExpiringPackage> {
            self.packages
                .read()
                .await
                .iter()
                .find(|p| p.business_package.id == bp)
                .cloned()
        }
    }

    #[async_trait]
    impl RenewalStore for MockRenewalStore {
        async fn expiring_packages(
            &self,
            from: NaiveDate,
            until: NaiveDate,
        ) -> Result<Vec<ExpiringPackage>, RenewalError> {
            let records = self.records.read().await;
            Ok(self
                .packages
                .read()
                .await
                .iter()
                .filter(|p| {
                    p.business_package.end_date >= from && p.business_package.end_date <= until
                })
                .cloned()
                .map(|mut p| {
                    p.has_renewal |= records
                        .values()
                        .any(|r| r.business_package_id == p.business_package.id);
                    p
                })
                .collect())
        }

        async fn insert_records(&self, records: &[RenewalRecord]) -> Result<u32, RenewalError> {
            let mut stored = self.records.write().await;
            let mut inserted = 0;
            for record in records {
                if stored
                    .values()
                    .any(|r| r.business_package_id == record.business_package_id)
                {
                    continue;
                }
                stored.insert(record.id, record.clone());
                inserted += 1;
            }
            Ok(inserted)
        }

        async fn open_records(&self) -> Result<Vec<RenewalRecord>, RenewalError> {
            Ok(self
                .records
                .read()
                .await
                .values()
                .filter(|r| !r.is_terminal())
                .cloned()
                .collect())
        }

        async fn save_refreshed(
            &self,
            records: &[RenewalRecord],
            today: NaiveDate,
        ) -> Result<(), RenewalError> {
            let mut stored = self.records.write().await;
            let mut packages = self.packages.write().await;
            for record in records {
                let Some(current) = stored.get_mut(&record.id) else {
                    continue;
                };
                if current.is_terminal() {
                    continue;
                }
                current.days_remaining = record.days_remaining;
                current.priority = record.priority;
                current.updated_at = record.updated_at;
                if record.status == RenewalStatus::Expired {
                    current.status = RenewalStatus::Expired;
                    if let Some(p) = packages
                        .iter_mut()
                        .find(|p| p.business_package.id == record.business_package_id)
                    {
                        p.business_package.expire(today);
                    }
                }
            }
            Ok(())
        }
    }
}
