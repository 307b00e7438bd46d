//! Accountant reports built from confirmed settlements

use sqlx::PgPool;
use tracing::{debug, warn};

use core_kernel::Currency;
use domain_settlement::{Ledger, TrialBalance};

use super::settlement::{confirmed_manager_settlements, confirmed_settlements};
use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct AccountingRepository {
    pool: PgPool,
    currency: Currency,
}

impl AccountingRepository {
    pub fn new(pool: PgPool, currency: Currency) -> Self {
        Self { pool, currency }
    }

    /// Rebuilds the ledger and returns its trial balance
    ///
    /// Both reads run in one transaction so a settlement confirmed mid-report
    /// cannot appear on one side only.
    pub async fn trial_balance(&self) -> Result<TrialBalance, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;
        let agent_settlements = confirmed_settlements(&mut *tx, self.currency).await?;
        let manager_settlements = confirmed_manager_settlements(&mut *tx, self.currency).await?;
        tx.commit().await?;

        let ledger = Ledger::from_confirmed(&agent_settlements, &manager_settlements, self.currency)?;
        let report = ledger.trial_balance();

        debug!(
            agent_settlements = agent_settlements.len(),
            manager_settlements = manager_settlements.len(),
            entries = ledger.entries().len(),
            "Trial balance built"
        );
        if !report.is_balanced {
            warn!(difference = %report.difference, "Trial balance does not balance");
        }
        Ok(report)
    }
}
