//! Settlement repository: collections, commissions and both settlement levels
//!
//! Every mutation runs in one transaction. Rows touched by a workflow are
//! locked with `FOR UPDATE`, and the partial unique indexes on open
//! settlements turn a concurrent second create into a duplicate-entry error.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

use core_kernel::{
    AgentSettlementId, BusinessId, BusinessPackageId, CollectionId, CommissionId, Currency,
    GovernorateId, ManagerSettlementId, Money, UserId,
};
use domain_directory::{Actor, AgentProfile};
use domain_settlement::{
    AgentCollection, AgentCommission, AgentFinancialSettlement, AgentSettlementSnapshot,
    CollectionStatus, CommissionStatus, ManagerFinancialSettlement, ManagerSettlementSnapshot,
    SettlementError, SettlementStatus,
};

use super::directory::{
    fetch_agent, fetch_manager, lock_agent, lock_manager, save_agent_earnings,
    save_manager_earnings,
};
use super::{parse_column, parse_rate, Page};
use crate::error::DatabaseError;

/// Who and what a list query is restricted to
#[derive(Debug, Clone, Copy)]
pub struct ListFilter<S> {
    pub agent_id: Option<UserId>,
    /// Restricts to the agents reporting to this manager
    pub manager_id: Option<UserId>,
    pub status: Option<S>,
    pub page: Page,
}

impl<S> Default for ListFilter<S> {
    fn default() -> Self {
        Self {
            agent_id: None,
            manager_id: None,
            status: None,
            page: Page::default(),
        }
    }
}

/// A collection to record for an agent
#[derive(Debug, Clone)]
pub struct NewCollection {
    pub business_id: BusinessId,
    pub business_package_id: Option<BusinessPackageId>,
    pub amount: Money,
    pub notes: Option<String>,
}

const COLLECTION_COLUMNS: &str = "id, agent_id, business_id, business_package_id, amount, status, \
     settlement_id, notes, collected_at, verified_at";

const COMMISSION_COLUMNS: &str = "id, agent_id, collection_id, business_id, amount, rate, status, \
     settlement_id, created_at, approved_at, paid_at";

pub(crate) const AGENT_SETTLEMENT_COLUMNS: &str = "id, settlement_number, agent_id, manager_id, \
     governorate_id, status, total_collected, total_commissions, net_amount, collection_ids, \
     commission_ids, manager_settlement_id, notes, created_at, submitted_at, confirmed_at, \
     confirmed_by, cancelled_at, cancelled_by, cancellation_reason";

pub(crate) const MANAGER_SETTLEMENT_COLUMNS: &str = "id, settlement_number, manager_id, \
     governorate_id, status, total_revenue, total_agent_commissions, commission_rate, \
     company_share_amount, manager_share_amount, agent_settlement_ids, notes, created_at, \
     submitted_at, confirmed_at, confirmed_by, cancelled_at, cancelled_by, cancellation_reason";

#[derive(Debug, Clone)]
pub struct SettlementRepository {
    pool: PgPool,
    currency: Currency,
}

impl SettlementRepository {
    pub fn new(pool: PgPool, currency: Currency) -> Self {
        Self { pool, currency }
    }

    // ------------------------------------------------------------------
    // Collections and commissions
    // ------------------------------------------------------------------

    /// Records a collection and the commission the agent earns on it
    pub async fn record_collection(
        &self,
        agent_id: UserId,
        input: NewCollection,
    ) -> Result<(AgentCollection, AgentCommission), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let agent = fetch_agent(&mut *tx, agent_id, self.currency).await?;
        let recorded = record_collection_in(&mut *tx, &agent, input).await?;
        tx.commit().await?;

        info!(
            collection = %recorded.0.id,
            agent = %agent_id,
            amount = %recorded.0.amount,
            commission = %recorded.1.amount,
            "Collection recorded"
        );
        Ok(recorded)
    }

    pub async fn list_collections(
        &self,
        filter: ListFilter<CollectionStatus>,
    ) -> Result<Vec<AgentCollection>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {COLLECTION_COLUMNS}
            FROM agent_collections
            WHERE ($1::uuid IS NULL OR agent_id = $1)
              AND ($2::uuid IS NULL OR agent_id IN
                    (SELECT user_id FROM agent_profiles WHERE manager_id = $2))
              AND ($3::text IS NULL OR status = $3)
            ORDER BY collected_at DESC
            LIMIT $4 OFFSET $5
            "#
        );
        let rows = sqlx::query_as::<_, CollectionRow>(&sql)
            .bind(filter.agent_id.map(Uuid::from))
            .bind(filter.manager_id.map(Uuid::from))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.page.limit)
            .bind(filter.page.offset)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_domain(self.currency)).collect()
    }

    pub async fn list_commissions(
        &self,
        filter: ListFilter<CommissionStatus>,
    ) -> Result<Vec<AgentCommission>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {COMMISSION_COLUMNS}
            FROM agent_commissions
            WHERE ($1::uuid IS NULL OR agent_id = $1)
              AND ($2::uuid IS NULL OR agent_id IN
                    (SELECT user_id FROM agent_profiles WHERE manager_id = $2))
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        );
        let rows = sqlx::query_as::<_, CommissionRow>(&sql)
            .bind(filter.agent_id.map(Uuid::from))
            .bind(filter.manager_id.map(Uuid::from))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.page.limit)
            .bind(filter.page.offset)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_domain(self.currency)).collect()
    }

    /// PENDING → APPROVED
    pub async fn approve_commission(&self, id: CommissionId) -> Result<AgentCommission, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("SELECT {COMMISSION_COLUMNS} FROM agent_commissions WHERE id = $1 FOR UPDATE");
        let mut commission = sqlx::query_as::<_, CommissionRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Commission", id))?
            .into_domain(self.currency)?;

        commission.approve(Utc::now())?;

        sqlx::query("UPDATE agent_commissions SET status = $2, approved_at = $3 WHERE id = $1")
            .bind(Uuid::from(id))
            .bind(commission.status.as_str())
            .bind(commission.approved_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(commission = %id, "Commission approved");
        Ok(commission)
    }

    // ------------------------------------------------------------------
    // Agent settlements
    // ------------------------------------------------------------------

    /// The snapshot a new settlement would take, without reserving anything
    pub async fn preview_agent_settlement(
        &self,
        agent_id: UserId,
    ) -> Result<AgentSettlementSnapshot, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let collections = unsettled_collections(&mut *conn, agent_id, self.currency, false).await?;
        let commissions = unsettled_commissions(&mut *conn, agent_id, self.currency, false).await?;

        Ok(AgentSettlementSnapshot::build(
            agent_id,
            &collections,
            &commissions,
            self.currency,
        )?)
    }

    /// Snapshots and reserves the agent's unsettled items
    pub async fn create_agent_settlement(
        &self,
        agent_id: UserId,
        submit: bool,
        notes: Option<String>,
    ) -> Result<AgentFinancialSettlement, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let agent = fetch_agent(&mut *tx, agent_id, self.currency).await?;

        let open: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM agent_financial_settlements
            WHERE agent_id = $1 AND status IN ('DRAFT', 'PENDING_MANAGER')
            "#,
        )
        .bind(Uuid::from(agent_id))
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(existing) = open {
            return Err(SettlementError::OpenSettlementExists {
                party: format!("Agent {}", agent_id),
                settlement: AgentSettlementId::from_uuid(existing).to_string(),
            }
            .into());
        }

        let collections = unsettled_collections(&mut *tx, agent_id, self.currency, true).await?;
        let commissions = unsettled_commissions(&mut *tx, agent_id, self.currency, true).await?;
        let snapshot =
            AgentSettlementSnapshot::build(agent_id, &collections, &commissions, self.currency)?;
        let settlement =
            AgentFinancialSettlement::create(&agent, snapshot, None, submit)?.with_notes(notes);

        let sql = format!(
            r#"
            INSERT INTO agent_financial_settlements ({AGENT_SETTLEMENT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#
        );
        let row = AgentSettlementRow::from_domain(&settlement);
        sqlx::query(&sql)
            .bind(row.id)
            .bind(&row.settlement_number)
            .bind(row.agent_id)
            .bind(row.manager_id)
            .bind(row.governorate_id)
            .bind(&row.status)
            .bind(row.total_collected)
            .bind(row.total_commissions)
            .bind(row.net_amount)
            .bind(&row.collection_ids)
            .bind(&row.commission_ids)
            .bind(row.manager_settlement_id)
            .bind(&row.notes)
            .bind(row.created_at)
            .bind(row.submitted_at)
            .bind(row.confirmed_at)
            .bind(row.confirmed_by)
            .bind(row.cancelled_at)
            .bind(row.cancelled_by)
            .bind(&row.cancellation_reason)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE agent_collections SET settlement_id = $1 WHERE id = ANY($2)")
            .bind(row.id)
            .bind(&row.collection_ids)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE agent_commissions SET settlement_id = $1 WHERE id = ANY($2)")
            .bind(row.id)
            .bind(&row.commission_ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            settlement = %settlement.settlement_number,
            agent = %agent_id,
            status = %settlement.status,
            net = %settlement.net_amount,
            "Agent settlement created"
        );
        Ok(settlement)
    }

    pub async fn find_agent_settlement(
        &self,
        id: AgentSettlementId,
    ) -> Result<AgentFinancialSettlement, DatabaseError> {
        let sql = format!("SELECT {AGENT_SETTLEMENT_COLUMNS} FROM agent_financial_settlements WHERE id = $1");
        sqlx::query_as::<_, AgentSettlementRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("AgentSettlement", id))?
            .into_domain(self.currency)
    }

    pub async fn list_agent_settlements(
        &self,
        filter: ListFilter<SettlementStatus>,
    ) -> Result<Vec<AgentFinancialSettlement>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {AGENT_SETTLEMENT_COLUMNS}
            FROM agent_financial_settlements
            WHERE ($1::uuid IS NULL OR agent_id = $1)
              AND ($2::uuid IS NULL OR manager_id = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        );
        let rows = sqlx::query_as::<_, AgentSettlementRow>(&sql)
            .bind(filter.agent_id.map(Uuid::from))
            .bind(filter.manager_id.map(Uuid::from))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.page.limit)
            .bind(filter.page.offset)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_domain(self.currency)).collect()
    }

    /// DRAFT → PENDING_MANAGER
    pub async fn submit_agent_settlement(
        &self,
        id: AgentSettlementId,
        actor: &Actor,
    ) -> Result<AgentFinancialSettlement, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut settlement = lock_agent_settlement(&mut *tx, id, self.currency).await?;
        settlement.submit(actor, Utc::now())?;
        save_agent_settlement_state(&mut *tx, &settlement).await?;
        tx.commit().await?;

        info!(settlement = %settlement.settlement_number, "Agent settlement submitted");
        Ok(settlement)
    }

    /// Verifies the collections, pays the commissions and credits the agent
    pub async fn confirm_agent_settlement(
        &self,
        id: AgentSettlementId,
        actor: &Actor,
    ) -> Result<AgentFinancialSettlement, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut settlement = lock_agent_settlement(&mut *tx, id, self.currency).await?;
        let confirmation = settlement.confirm(actor, Utc::now())?;
        save_agent_settlement_state(&mut *tx, &settlement).await?;

        let mut collections =
            lock_collections(&mut *tx, &confirmation.verified_collections, self.currency).await?;
        let mut commissions =
            lock_commissions(&mut *tx, &confirmation.paid_commissions, self.currency).await?;
        let mut agent = lock_agent(&mut *tx, confirmation.agent_id, self.currency).await?;
        confirmation.apply(&mut collections, &mut commissions, &mut agent)?;

        save_collection_states(&mut *tx, &collections).await?;
        save_commission_states(&mut *tx, &commissions).await?;
        save_agent_earnings(&mut *tx, &agent).await?;

        tx.commit().await?;

        info!(
            settlement = %settlement.settlement_number,
            confirmed_by = %actor.user_id,
            earnings_credit = %confirmation.earnings_credit,
            "Agent settlement confirmed"
        );
        Ok(settlement)
    }

    /// Cancels an open settlement and releases its items
    pub async fn cancel_agent_settlement(
        &self,
        id: AgentSettlementId,
        actor: &Actor,
        reason: String,
    ) -> Result<AgentFinancialSettlement, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut settlement = lock_agent_settlement(&mut *tx, id, self.currency).await?;
        let cancellation = settlement.cancel(actor, reason, Utc::now())?;
        save_agent_settlement_state(&mut *tx, &settlement).await?;

        sqlx::query("UPDATE agent_collections SET settlement_id = NULL WHERE settlement_id = $1")
            .bind(Uuid::from(cancellation.settlement_id))
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE agent_commissions SET settlement_id = NULL WHERE settlement_id = $1")
            .bind(Uuid::from(cancellation.settlement_id))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            settlement = %settlement.settlement_number,
            released_collections = cancellation.released_collections.len(),
            released_commissions = cancellation.released_commissions.len(),
            "Agent settlement cancelled"
        );
        Ok(settlement)
    }

    // ------------------------------------------------------------------
    // Manager settlements
    // ------------------------------------------------------------------

    pub async fn preview_manager_settlement(
        &self,
        manager_id: UserId,
    ) -> Result<ManagerSettlementSnapshot, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let manager = fetch_manager(&mut *conn, manager_id, self.currency).await?;
        let agent_settlements =
            unrolled_agent_settlements(&mut *conn, manager_id, self.currency, false).await?;

        Ok(ManagerSettlementSnapshot::build(
            manager_id,
            &agent_settlements,
            manager.company_commission_rate,
            self.currency,
        )?)
    }

    /// Rolls the manager's confirmed agent settlements into a new batch
    pub async fn create_manager_settlement(
        &self,
        manager_id: UserId,
        submit: bool,
        notes: Option<String>,
    ) -> Result<ManagerFinancialSettlement, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let manager = fetch_manager(&mut *tx, manager_id, self.currency).await?;

        let open: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM manager_financial_settlements
            WHERE manager_id = $1 AND status IN ('DRAFT', 'PENDING_ADMIN')
            "#,
        )
        .bind(Uuid::from(manager_id))
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(existing) = open {
            return Err(SettlementError::OpenSettlementExists {
                party: format!("Manager {}", manager_id),
                settlement: ManagerSettlementId::from_uuid(existing).to_string(),
            }
            .into());
        }

        let agent_settlements =
            unrolled_agent_settlements(&mut *tx, manager_id, self.currency, true).await?;
        let snapshot = ManagerSettlementSnapshot::build(
            manager_id,
            &agent_settlements,
            manager.company_commission_rate,
            self.currency,
        )?;
        let settlement =
            ManagerFinancialSettlement::create(&manager, snapshot, None, submit)?.with_notes(notes);

        let sql = format!(
            r#"
            INSERT INTO manager_financial_settlements ({MANAGER_SETTLEMENT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#
        );
        let row = ManagerSettlementRow::from_domain(&settlement);
        sqlx::query(&sql)
            .bind(row.id)
            .bind(&row.settlement_number)
            .bind(row.manager_id)
            .bind(row.governorate_id)
            .bind(&row.status)
            .bind(row.total_revenue)
            .bind(row.total_agent_commissions)
            .bind(row.commission_rate)
            .bind(row.company_share_amount)
            .bind(row.manager_share_amount)
            .bind(&row.agent_settlement_ids)
            .bind(&row.notes)
            .bind(row.created_at)
            .bind(row.submitted_at)
            .bind(row.confirmed_at)
            .bind(row.confirmed_by)
            .bind(row.cancelled_at)
            .bind(row.cancelled_by)
            .bind(&row.cancellation_reason)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE agent_financial_settlements SET manager_settlement_id = $1 WHERE id = ANY($2)",
        )
        .bind(row.id)
        .bind(&row.agent_settlement_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            settlement = %settlement.settlement_number,
            manager = %manager_id,
            revenue = %settlement.total_revenue,
            company_share = %settlement.company_share_amount,
            manager_share = %settlement.manager_share_amount,
            "Manager settlement created"
        );
        Ok(settlement)
    }

    pub async fn find_manager_settlement(
        &self,
        id: ManagerSettlementId,
    ) -> Result<ManagerFinancialSettlement, DatabaseError> {
        let sql = format!("SELECT {MANAGER_SETTLEMENT_COLUMNS} FROM manager_financial_settlements WHERE id = $1");
        sqlx::query_as::<_, ManagerSettlementRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("ManagerSettlement", id))?
            .into_domain(self.currency)
    }

    pub async fn list_manager_settlements(
        &self,
        filter: ListFilter<SettlementStatus>,
    ) -> Result<Vec<ManagerFinancialSettlement>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {MANAGER_SETTLEMENT_COLUMNS}
            FROM manager_financial_settlements
            WHERE ($1::uuid IS NULL OR manager_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        );
        let rows = sqlx::query_as::<_, ManagerSettlementRow>(&sql)
            .bind(filter.manager_id.map(Uuid::from))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.page.limit)
            .bind(filter.page.offset)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_domain(self.currency)).collect()
    }

    /// DRAFT → PENDING_ADMIN
    pub async fn submit_manager_settlement(
        &self,
        id: ManagerSettlementId,
        actor: &Actor,
    ) -> Result<ManagerFinancialSettlement, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut settlement = lock_manager_settlement(&mut *tx, id, self.currency).await?;
        settlement.submit(actor, Utc::now())?;
        save_manager_settlement_state(&mut *tx, &settlement).await?;
        tx.commit().await?;

        info!(settlement = %settlement.settlement_number, "Manager settlement submitted");
        Ok(settlement)
    }

    /// Admin confirmation; credits the manager's share
    pub async fn confirm_manager_settlement(
        &self,
        id: ManagerSettlementId,
        actor: &Actor,
    ) -> Result<ManagerFinancialSettlement, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut settlement = lock_manager_settlement(&mut *tx, id, self.currency).await?;
        let confirmation = settlement.confirm(actor, Utc::now())?;
        save_manager_settlement_state(&mut *tx, &settlement).await?;

        let mut manager = lock_manager(&mut *tx, confirmation.manager_id, self.currency).await?;
        confirmation.apply(&mut manager)?;
        save_manager_earnings(&mut *tx, &manager).await?;

        tx.commit().await?;

        info!(
            settlement = %settlement.settlement_number,
            confirmed_by = %actor.user_id,
            agent_settlements = confirmation.agent_settlement_ids.len(),
            earnings_credit = %confirmation.earnings_credit,
            "Manager settlement confirmed"
        );
        Ok(settlement)
    }

    /// Cancels and frees the agent settlements for a later batch
    pub async fn cancel_manager_settlement(
        &self,
        id: ManagerSettlementId,
        actor: &Actor,
        reason: String,
    ) -> Result<ManagerFinancialSettlement, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut settlement = lock_manager_settlement(&mut *tx, id, self.currency).await?;
        let released = settlement.cancel(actor, reason, Utc::now())?;
        save_manager_settlement_state(&mut *tx, &settlement).await?;

        sqlx::query(
            "UPDATE agent_financial_settlements SET manager_settlement_id = NULL WHERE manager_settlement_id = $1",
        )
        .bind(Uuid::from(id))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            settlement = %settlement.settlement_number,
            released = released.len(),
            "Manager settlement cancelled"
        );
        Ok(settlement)
    }
}

// ----------------------------------------------------------------------
// Transaction helpers
// ----------------------------------------------------------------------

/// Inserts a collection and its commission on an open connection
pub(crate) async fn record_collection_in(
    conn: &mut PgConnection,
    agent: &AgentProfile,
    input: NewCollection,
) -> Result<(AgentCollection, AgentCommission), DatabaseError> {
    let mut collection = AgentCollection::record(agent.user_id, input.business_id, input.amount)?;
    if let Some(bp) = input.business_package_id {
        collection = collection.for_package(bp);
    }
    if let Some(notes) = input.notes {
        collection = collection.with_notes(notes);
    }
    let commission = AgentCommission::for_collection(&collection, agent.commission_rate);

    let sql = format!(
        "INSERT INTO agent_collections ({COLLECTION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
    );
    sqlx::query(&sql)
        .bind(Uuid::from(collection.id))
        .bind(Uuid::from(collection.agent_id))
        .bind(Uuid::from(collection.business_id))
        .bind(collection.business_package_id.map(Uuid::from))
        .bind(collection.amount.amount())
        .bind(collection.status.as_str())
        .bind(collection.settlement_id.map(Uuid::from))
        .bind(&collection.notes)
        .bind(collection.collected_at)
        .bind(collection.verified_at)
        .execute(&mut *conn)
        .await?;

    let sql = format!(
        "INSERT INTO agent_commissions ({COMMISSION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
    );
    sqlx::query(&sql)
        .bind(Uuid::from(commission.id))
        .bind(Uuid::from(commission.agent_id))
        .bind(commission.collection_id.map(Uuid::from))
        .bind(Uuid::from(commission.business_id))
        .bind(commission.amount.amount())
        .bind(commission.rate.as_percentage())
        .bind(commission.status.as_str())
        .bind(commission.settlement_id.map(Uuid::from))
        .bind(commission.created_at)
        .bind(commission.approved_at)
        .bind(commission.paid_at)
        .execute(&mut *conn)
        .await?;

    Ok((collection, commission))
}

async fn unsettled_collections(
    conn: &mut PgConnection,
    agent_id: UserId,
    currency: Currency,
    lock: bool,
) -> Result<Vec<AgentCollection>, DatabaseError> {
    let sql = format!(
        r#"
        SELECT {COLLECTION_COLUMNS}
        FROM agent_collections
        WHERE agent_id = $1 AND status = 'COLLECTED' AND settlement_id IS NULL
        ORDER BY collected_at
        {}
        "#,
        if lock { "FOR UPDATE" } else { "" }
    );
    let rows = sqlx::query_as::<_, CollectionRow>(&sql)
        .bind(Uuid::from(agent_id))
        .fetch_all(&mut *conn)
        .await?;
    rows.into_iter().map(|r| r.into_domain(currency)).collect()
}

async fn unsettled_commissions(
    conn: &mut PgConnection,
    agent_id: UserId,
    currency: Currency,
    lock: bool,
) -> Result<Vec<AgentCommission>, DatabaseError> {
    let sql = format!(
        r#"
        SELECT {COMMISSION_COLUMNS}
        FROM agent_commissions
        WHERE agent_id = $1 AND status IN ('PENDING', 'APPROVED') AND settlement_id IS NULL
        ORDER BY created_at
        {}
        "#,
        if lock { "FOR UPDATE" } else { "" }
    );
    let rows = sqlx::query_as::<_, CommissionRow>(&sql)
        .bind(Uuid::from(agent_id))
        .fetch_all(&mut *conn)
        .await?;
    rows.into_iter().map(|r| r.into_domain(currency)).collect()
}

/// Locks the given collections; errors if any is missing
async fn lock_collections(
    conn: &mut PgConnection,
    ids: &[CollectionId],
    currency: Currency,
) -> Result<Vec<AgentCollection>, DatabaseError> {
    let ids: Vec<Uuid> = ids.iter().map(|id| Uuid::from(*id)).collect();
    let sql = format!(
        "SELECT {COLLECTION_COLUMNS} FROM agent_collections WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    );
    let rows = sqlx::query_as::<_, CollectionRow>(&sql)
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;
    if rows.len() != ids.len() {
        return Err(DatabaseError::not_found(
            "AgentCollection",
            format!("{} of {} settled collections", ids.len() - rows.len(), ids.len()),
        ));
    }
    rows.into_iter().map(|r| r.into_domain(currency)).collect()
}

/// Locks the given commissions; errors if any is missing
async fn lock_commissions(
    conn: &mut PgConnection,
    ids: &[CommissionId],
    currency: Currency,
) -> Result<Vec<AgentCommission>, DatabaseError> {
    let ids: Vec<Uuid> = ids.iter().map(|id| Uuid::from(*id)).collect();
    let sql = format!(
        "SELECT {COMMISSION_COLUMNS} FROM agent_commissions WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    );
    let rows = sqlx::query_as::<_, CommissionRow>(&sql)
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;
    if rows.len() != ids.len() {
        return Err(DatabaseError::not_found(
            "AgentCommission",
            format!("{} of {} settled commissions", ids.len() - rows.len(), ids.len()),
        ));
    }
    rows.into_iter().map(|r| r.into_domain(currency)).collect()
}

async fn save_collection_states(
    conn: &mut PgConnection,
    collections: &[AgentCollection],
) -> Result<(), DatabaseError> {
    for c in collections {
        sqlx::query("UPDATE agent_collections SET status = $2, verified_at = $3 WHERE id = $1")
            .bind(Uuid::from(c.id))
            .bind(c.status.as_str())
            .bind(c.verified_at)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn save_commission_states(
    conn: &mut PgConnection,
    commissions: &[AgentCommission],
) -> Result<(), DatabaseError> {
    for c in commissions {
        sqlx::query(
            "UPDATE agent_commissions SET status = $2, approved_at = $3, paid_at = $4 WHERE id = $1",
        )
        .bind(Uuid::from(c.id))
        .bind(c.status.as_str())
        .bind(c.approved_at)
        .bind(c.paid_at)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn unrolled_agent_settlements(
    conn: &mut PgConnection,
    manager_id: UserId,
    currency: Currency,
    lock: bool,
) -> Result<Vec<AgentFinancialSettlement>, DatabaseError> {
    let sql = format!(
        r#"
        SELECT {AGENT_SETTLEMENT_COLUMNS}
        FROM agent_financial_settlements
        WHERE manager_id = $1 AND status = 'CONFIRMED' AND manager_settlement_id IS NULL
        ORDER BY confirmed_at
        {}
        "#,
        if lock { "FOR UPDATE" } else { "" }
    );
    let rows = sqlx::query_as::<_, AgentSettlementRow>(&sql)
        .bind(Uuid::from(manager_id))
        .fetch_all(&mut *conn)
        .await?;
    rows.into_iter().map(|r| r.into_domain(currency)).collect()
}

async fn lock_agent_settlement(
    conn: &mut PgConnection,
    id: AgentSettlementId,
    currency: Currency,
) -> Result<AgentFinancialSettlement, DatabaseError> {
    let sql = format!(
        "SELECT {AGENT_SETTLEMENT_COLUMNS} FROM agent_financial_settlements WHERE id = $1 FOR UPDATE"
    );
    sqlx::query_as::<_, AgentSettlementRow>(&sql)
        .bind(Uuid::from(id))
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::not_found("AgentSettlement", id))?
        .into_domain(currency)
}

async fn lock_manager_settlement(
    conn: &mut PgConnection,
    id: ManagerSettlementId,
    currency: Currency,
) -> Result<ManagerFinancialSettlement, DatabaseError> {
    let sql = format!(
        "SELECT {MANAGER_SETTLEMENT_COLUMNS} FROM manager_financial_settlements WHERE id = $1 FOR UPDATE"
    );
    sqlx::query_as::<_, ManagerSettlementRow>(&sql)
        .bind(Uuid::from(id))
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::not_found("ManagerSettlement", id))?
        .into_domain(currency)
}

async fn save_agent_settlement_state(
    conn: &mut PgConnection,
    s: &AgentFinancialSettlement,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        UPDATE agent_financial_settlements
        SET status = $2, submitted_at = $3, confirmed_at = $4, confirmed_by = $5,
            cancelled_at = $6, cancelled_by = $7, cancellation_reason = $8
        WHERE id = $1
        "#,
    )
    .bind(Uuid::from(s.id))
    .bind(s.status.as_str())
    .bind(s.submitted_at)
    .bind(s.confirmed_at)
    .bind(s.confirmed_by.map(Uuid::from))
    .bind(s.cancelled_at)
    .bind(s.cancelled_by.map(Uuid::from))
    .bind(&s.cancellation_reason)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn save_manager_settlement_state(
    conn: &mut PgConnection,
    s: &ManagerFinancialSettlement,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        UPDATE manager_financial_settlements
        SET status = $2, submitted_at = $3, confirmed_at = $4, confirmed_by = $5,
            cancelled_at = $6, cancelled_by = $7, cancellation_reason = $8
        WHERE id = $1
        "#,
    )
    .bind(Uuid::from(s.id))
    .bind(s.status.as_str())
    .bind(s.submitted_at)
    .bind(s.confirmed_at)
    .bind(s.confirmed_by.map(Uuid::from))
    .bind(s.cancelled_at)
    .bind(s.cancelled_by.map(Uuid::from))
    .bind(&s.cancellation_reason)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Confirmed settlements of both levels, for the trial balance
pub(crate) async fn confirmed_settlements<'e, E>(
    executor: E,
    currency: Currency,
) -> Result<Vec<AgentFinancialSettlement>, DatabaseError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "SELECT {AGENT_SETTLEMENT_COLUMNS} FROM agent_financial_settlements WHERE status = 'CONFIRMED' ORDER BY confirmed_at"
    );
    let rows = sqlx::query_as::<_, AgentSettlementRow>(&sql)
        .fetch_all(executor)
        .await?;
    rows.into_iter().map(|r| r.into_domain(currency)).collect()
}

pub(crate) async fn confirmed_manager_settlements<'e, E>(
    executor: E,
    currency: Currency,
) -> Result<Vec<ManagerFinancialSettlement>, DatabaseError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "SELECT {MANAGER_SETTLEMENT_COLUMNS} FROM manager_financial_settlements WHERE status = 'CONFIRMED' ORDER BY confirmed_at"
    );
    let rows = sqlx::query_as::<_, ManagerSettlementRow>(&sql)
        .fetch_all(executor)
        .await?;
    rows.into_iter().map(|r| r.into_domain(currency)).collect()
}

// ----------------------------------------------------------------------
// Rows
// ----------------------------------------------------------------------

#[derive(Debug, FromRow)]
pub struct CollectionRow {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub business_id: Uuid,
    pub business_package_id: Option<Uuid>,
    pub amount: Decimal,
    pub status: String,
    pub settlement_id: Option<Uuid>,
    pub notes: Option<String>,
    pub collected_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl CollectionRow {
    pub fn into_domain(self, currency: Currency) -> Result<AgentCollection, DatabaseError> {
        Ok(AgentCollection {
            id: CollectionId::from_uuid(self.id),
            agent_id: UserId::from_uuid(self.agent_id),
            business_id: BusinessId::from_uuid(self.business_id),
            business_package_id: self.business_package_id.map(BusinessPackageId::from_uuid),
            amount: Money::new(self.amount, currency),
            status: parse_column("agent_collections.status", &self.status)?,
            settlement_id: self.settlement_id.map(AgentSettlementId::from_uuid),
            notes: self.notes,
            collected_at: self.collected_at,
            verified_at: self.verified_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct CommissionRow {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub collection_id: Option<Uuid>,
    pub business_id: Uuid,
    pub amount: Decimal,
    pub rate: Decimal,
    pub status: String,
    pub settlement_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl CommissionRow {
    pub fn into_domain(self, currency: Currency) -> Result<AgentCommission, DatabaseError> {
        Ok(AgentCommission {
            id: CommissionId::from_uuid(self.id),
            agent_id: UserId::from_uuid(self.agent_id),
            collection_id: self.collection_id.map(CollectionId::from_uuid),
            business_id: BusinessId::from_uuid(self.business_id),
            amount: Money::new(self.amount, currency),
            rate: parse_rate("agent_commissions.rate", self.rate)?,
            status: parse_column("agent_commissions.status", &self.status)?,
            settlement_id: self.settlement_id.map(AgentSettlementId::from_uuid),
            created_at: self.created_at,
            approved_at: self.approved_at,
            paid_at: self.paid_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct AgentSettlementRow {
    pub id: Uuid,
    pub settlement_number: String,
    pub agent_id: Uuid,
    pub manager_id: Uuid,
    pub governorate_id: Uuid,
    pub status: String,
    pub total_collected: Decimal,
    pub total_commissions: Decimal,
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

impl AgentSettlementRow {
    pub fn from_domain(s: &AgentFinancialSettlement) -> Self {
        Self {
            id: Uuid::from(s.id),
            settlement_number: s.settlement_number.clone(),
            agent_id: Uuid::from(s.agent_id),
            manager_id: Uuid::from(s.manager_id),
            governorate_id: Uuid::from(s.governorate_id),
            status: s.status.as_str().to_string(),
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

    pub fn into_domain(self, currency: Currency) -> Result<AgentFinancialSettlement, DatabaseError> {
        Ok(AgentFinancialSettlement {
            id: AgentSettlementId::from_uuid(self.id),
            settlement_number: self.settlement_number,
            agent_id: UserId::from_uuid(self.agent_id),
            manager_id: UserId::from_uuid(self.manager_id),
            governorate_id: GovernorateId::from_uuid(self.governorate_id),
            status: parse_column("agent_financial_settlements.status", &self.status)?,
            currency,
            total_collected: Money::new(self.total_collected, currency),
            total_commissions: Money::new(self.total_commissions, currency),
            net_amount: Money::new(self.net_amount, currency),
            collection_ids: self.collection_ids.into_iter().map(CollectionId::from_uuid).collect(),
            commission_ids: self.commission_ids.into_iter().map(CommissionId::from_uuid).collect(),
            manager_settlement_id: self.manager_settlement_id.map(ManagerSettlementId::from_uuid),
            notes: self.notes,
            created_at: self.created_at,
            submitted_at: self.submitted_at,
            confirmed_at: self.confirmed_at,
            confirmed_by: self.confirmed_by.map(UserId::from_uuid),
            cancelled_at: self.cancelled_at,
            cancelled_by: self.cancelled_by.map(UserId::from_uuid),
            cancellation_reason: self.cancellation_reason,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ManagerSettlementRow {
    pub id: Uuid,
    pub settlement_number: String,
    pub manager_id: Uuid,
    pub governorate_id: Uuid,
    pub status: String,
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

impl ManagerSettlementRow {
    pub fn from_domain(s: &ManagerFinancialSettlement) -> Self {
        Self {
            id: Uuid::from(s.id),
            settlement_number: s.settlement_number.clone(),
            manager_id: Uuid::from(s.manager_id),
            governorate_id: Uuid::from(s.governorate_id),
            status: s.status.as_str().to_string(),
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

    pub fn into_domain(
        self,
        currency: Currency,
    ) -> Result<ManagerFinancialSettlement, DatabaseError> {
        Ok(ManagerFinancialSettlement {
            id: ManagerSettlementId::from_uuid(self.id),
            settlement_number: self.settlement_number,
            manager_id: UserId::from_uuid(self.manager_id),
            governorate_id: GovernorateId::from_uuid(self.governorate_id),
            status: parse_column("manager_financial_settlements.status", &self.status)?,
            currency,
            total_revenue: Money::new(self.total_revenue, currency),
            total_agent_commissions: Money::new(self.total_agent_commissions, currency),
            commission_rate: parse_rate(
                "manager_financial_settlements.commission_rate",
                self.commission_rate,
            )?,
            company_share_amount: Money::new(self.company_share_amount, currency),
            manager_share_amount: Money::new(self.manager_share_amount, currency),
            agent_settlement_ids: self
                .agent_settlement_ids
                .into_iter()
                .map(AgentSettlementId::from_uuid)
                .collect(),
            notes: self.notes,
            created_at: self.created_at,
            submitted_at: self.submitted_at,
            confirmed_at: self.confirmed_at,
            confirmed_by: self.confirmed_by.map(UserId::from_uuid),
            cancelled_at: self.cancelled_at,
            cancelled_by: self.cancelled_by.map(UserId::from_uuid),
            cancellation_reason: self.cancellation_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Rate;
    use domain_directory::AgentProfile;
    use rust_decimal_macros::dec;

    fn settlement() -> AgentFinancialSettlement {
        let agent = AgentProfile {
            user_id: UserId::new(),
            full_name: "Agent".into(),
            governorate_id: GovernorateId::new(),
            manager_id: Some(UserId::new()),
            commission_rate: Rate::from_percentage(dec!(10)),
            lifetime_earnings: Money::zero(Currency::IQD),
        };
        let collection =
            AgentCollection::record(agent.user_id, BusinessId::new(), Money::new(dec!(90000), Currency::IQD))
                .unwrap();
        let commission = AgentCommission::for_collection(&collection, agent.commission_rate);
        let snapshot =
            AgentSettlementSnapshot::build(agent.user_id, &[collection], &[commission], Currency::IQD)
                .unwrap();
        AgentFinancialSettlement::create(&agent, snapshot, None, true).unwrap()
    }

    #[test]
    fn test_agent_settlement_row_mapping_keeps_totals() {
        let original = settlement();
        let row = AgentSettlementRow::from_domain(&original);
        assert_eq!(row.status, "PENDING_MANAGER");
        assert_eq!(row.collection_ids.len(), 1);

        let back = row.into_domain(Currency::IQD).unwrap();
        assert_eq!(back.id, original.id);
        assert_eq!(back.net_amount.amount(), dec!(81000));
        assert_eq!(back.status, SettlementStatus::PendingManager);
    }

    #[test]
    fn test_commission_row_rate_round_trip() {
        let row = CommissionRow {
            id: Uuid::new_v4(),
            agent_id: Uuid::new_v4(),
            collection_id: None,
            business_id: Uuid::new_v4(),
            amount: dec!(1500),
            rate: dec!(7.5),
            status: "APPROVED".into(),
            settlement_id: None,
            created_at: Utc::now(),
            approved_at: Some(Utc::now()),
            paid_at: None,
        };
        let commission = row.into_domain(Currency::IQD).unwrap();
        assert_eq!(commission.rate.as_percentage(), dec!(7.5));
        assert!(commission.is_unsettled());
    }
}
