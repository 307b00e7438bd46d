//! Renewal repository and the PostgreSQL `RenewalStore`

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use core_kernel::{
    BusinessId, BusinessPackageId, Currency, GovernorateId, Money, PackageId, RenewalContactId,
    RenewalId, UserId,
};
use domain_directory::{Actor, Role};
use domain_renewal::{
    ContactType, ExpiringPackage, RenewalContact, RenewalDecision, RenewalError, RenewalRecord,
    RenewalStats, RenewalStatus, RenewalStore,
};
use domain_settlement::{AgentCollection, AgentCommission};

use super::directory::{
    fetch_agent, fetch_package, insert_business_package, lock_business_package, BusinessPackageRow,
};
use super::settlement::{record_collection_in, NewCollection};
use super::{parse_column, Page};
use crate::error::DatabaseError;

const RECORD_COLUMNS: &str = "id, business_package_id, business_id, package_id, governorate_id, \
     assigned_agent_id, status, priority, end_date, days_remaining, contact_count, \
     last_contact_at, next_follow_up, decision, new_package_id, new_business_package_id, notes, \
     decided_at, created_at, updated_at";

const CONTACT_COLUMNS: &str =
    "id, renewal_id, agent_id, contact_type, notes, outcome, next_follow_up, contacted_at";

#[derive(Debug, Clone, Copy, Default)]
pub struct RenewalFilter {
    pub assigned_agent_id: Option<UserId>,
    pub status: Option<RenewalStatus>,
    pub page: Page,
}

impl RenewalFilter {
    /// Agents only see records assigned to them
    pub fn visible_to(actor: &Actor, status: Option<RenewalStatus>, page: Page) -> Self {
        Self {
            assigned_agent_id: (actor.role == Role::Agent).then_some(actor.user_id),
            status,
            page,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewContact {
    pub contact_type: ContactType,
    pub notes: Option<String>,
    pub outcome: Option<String>,
    pub next_follow_up: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct NewDecision {
    pub decision: RenewalDecision,
    pub new_package_id: Option<PackageId>,
    pub next_follow_up: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Cash taken on the spot for the new period
    pub collected_amount: Option<Money>,
}

/// What a decision changed
#[derive(Debug, Clone)]
pub struct DecisionResult {
    pub record: RenewalRecord,
    pub collection: Option<(AgentCollection, AgentCommission)>,
}

#[derive(Debug, Clone)]
pub struct RenewalRepository {
    pool: PgPool,
    currency: Currency,
}

impl RenewalRepository {
    pub fn new(pool: PgPool, currency: Currency) -> Self {
        Self { pool, currency }
    }

    pub async fn find(&self, id: RenewalId) -> Result<RenewalRecord, DatabaseError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM renewal_records WHERE id = $1");
        sqlx::query_as::<_, RenewalRecordRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Renewal", id))?
            .into_domain()
    }

    /// Highest priority first, then soonest end date
    pub async fn list(&self, filter: RenewalFilter) -> Result<Vec<RenewalRecord>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM renewal_records
            WHERE ($1::uuid IS NULL OR assigned_agent_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY priority DESC, end_date, created_at
            LIMIT $3 OFFSET $4
            "#
        );
        let rows = sqlx::query_as::<_, RenewalRecordRow>(&sql)
            .bind(filter.assigned_agent_id.map(Uuid::from))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.page.limit)
            .bind(filter.page.offset)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(RenewalRecordRow::into_domain).collect()
    }

    pub async fn contacts(&self, id: RenewalId) -> Result<Vec<RenewalContact>, DatabaseError> {
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM renewal_contacts WHERE renewal_id = $1 ORDER BY contacted_at DESC"
        );
        let rows = sqlx::query_as::<_, RenewalContactRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(RenewalContactRow::into_domain).collect()
    }

    pub async fn log_contact(
        &self,
        id: RenewalId,
        actor: &Actor,
        contact: NewContact,
    ) -> Result<(RenewalRecord, RenewalContact), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut record = lock_record(&mut *tx, id).await?;
        record.authorize(actor)?;

        let logged = record.log_contact(
            actor.user_id,
            contact.contact_type,
            contact.notes,
            contact.outcome,
            contact.next_follow_up,
            Utc::now(),
        )?;

        let sql = format!(
            "INSERT INTO renewal_contacts ({CONTACT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        sqlx::query(&sql)
            .bind(Uuid::from(logged.id))
            .bind(Uuid::from(logged.renewal_id))
            .bind(Uuid::from(logged.agent_id))
            .bind(logged.contact_type.as_str())
            .bind(&logged.notes)
            .bind(&logged.outcome)
            .bind(logged.next_follow_up)
            .bind(logged.contacted_at)
            .execute(&mut *tx)
            .await?;
        save_record(&mut *tx, &record).await?;
        tx.commit().await?;

        info!(
            renewal = %id,
            agent = %actor.user_id,
            contact_type = %logged.contact_type,
            status = %record.status,
            "Renewal contact logged"
        );
        Ok((record, logged))
    }

    /// Records the owner's decision
    ///
    /// A renewing decision closes the old business package, starts its
    /// successor and, when cash was taken, records the collection and
    /// commission, all in one transaction.
    pub async fn decide(
        &self,
        id: RenewalId,
        actor: &Actor,
        input: NewDecision,
        today: NaiveDate,
    ) -> Result<DecisionResult, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut record = lock_record(&mut *tx, id).await?;
        record.authorize(actor)?;

        let outcome = record.decide(
            input.decision,
            input.new_package_id,
            input.next_follow_up,
            input.notes,
            Utc::now(),
        )?;

        let mut collection = None;
        if let Some(package_id) = outcome.renew_into {
            let package = fetch_package(&mut *tx, package_id, self.currency).await?;
            let mut current = lock_business_package(&mut *tx, record.business_package_id).await?;
            let successor = current.renew_with(&package, today)?;

            sqlx::query("UPDATE business_packages SET status = $2 WHERE id = $1")
                .bind(Uuid::from(current.id))
                .bind(current.status.as_str())
                .execute(&mut *tx)
                .await?;
            insert_business_package(&mut *tx, &successor).await?;
            record.link_successor(successor.id);

            if let Some(amount) = input.collected_amount {
                let collector = collecting_agent(actor, &record)?;
                let agent = fetch_agent(&mut *tx, collector, self.currency).await?;
                collection = Some(
                    record_collection_in(
                        &mut *tx,
                        &agent,
                        NewCollection {
                            business_id: record.business_id,
                            business_package_id: Some(successor.id),
                            amount,
                            notes: Some(format!("Renewal {}", record.id)),
                        },
                    )
                    .await?,
                );
            }
        } else if input.collected_amount.is_some() {
            return Err(RenewalError::Invalid(format!(
                "decision {} does not take a payment",
                input.decision
            ))
            .into());
        }

        save_record(&mut *tx, &record).await?;
        tx.commit().await?;

        info!(
            renewal = %id,
            decision = %input.decision,
            status = %outcome.status,
            successor = ?record.new_business_package_id,
            collected = collection.is_some(),
            "Renewal decision recorded"
        );
        Ok(DecisionResult { record, collection })
    }

    pub async fn assign(&self, id: RenewalId, agent_id: UserId) -> Result<RenewalRecord, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut record = lock_record(&mut *tx, id).await?;
        // the agent must exist
        fetch_agent(&mut *tx, agent_id, self.currency).await?;
        record.assign(agent_id)?;
        save_record(&mut *tx, &record).await?;
        tx.commit().await?;

        info!(renewal = %id, agent = %agent_id, "Renewal assigned");
        Ok(record)
    }

    pub async fn stats(&self) -> Result<RenewalStats, DatabaseError> {
        let counts: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM renewal_records GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut stats = RenewalStats::default();
        for (status, count) in counts {
            stats.add(parse_column("renewal_records.status", &status)?, count);
        }

        let (urgent, unassigned): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE priority = 3),
                   COUNT(*) FILTER (WHERE assigned_agent_id IS NULL)
            FROM renewal_records
            WHERE status NOT IN ('RENEWED', 'DECLINED', 'EXPIRED')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        stats.urgent = urgent;
        stats.unassigned = unassigned;

        Ok(stats)
    }

    async fn fetch_expiring(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<ExpiringPackage>, DatabaseError> {
        let rows = sqlx::query_as::<_, ExpiringPackageRow>(
            r#"
            SELECT bp.id, bp.business_id, bp.package_id, bp.start_date, bp.end_date, bp.status,
                   bp.created_at,
                   b.governorate_id,
                   p.is_default AS package_is_default,
                   EXISTS (SELECT 1 FROM renewal_records r WHERE r.business_package_id = bp.id)
                       AS has_renewal,
                   ARRAY(SELECT a.user_id FROM agent_profiles a
                         WHERE a.governorate_id = b.governorate_id
                         ORDER BY a.user_id) AS governorate_agents
            FROM business_packages bp
            JOIN businesses b ON b.id = bp.business_id
            JOIN packages p ON p.id = bp.package_id
            WHERE bp.status = 'ACTIVE'
              AND bp.end_date BETWEEN $1 AND $2
            ORDER BY bp.end_date
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ExpiringPackageRow::into_domain).collect()
    }

    async fn insert_all(&self, records: &[RenewalRecord]) -> Result<u32, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            r#"
            INSERT INTO renewal_records ({RECORD_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            ON CONFLICT (business_package_id) DO NOTHING
            "#
        );

        let mut inserted = 0u32;
        for r in records {
            let result = sqlx::query(&sql)
                .bind(Uuid::from(r.id))
                .bind(Uuid::from(r.business_package_id))
                .bind(Uuid::from(r.business_id))
                .bind(Uuid::from(r.package_id))
                .bind(Uuid::from(r.governorate_id))
                .bind(r.assigned_agent_id.map(Uuid::from))
                .bind(r.status.as_str())
                .bind(i16::from(r.priority))
                .bind(r.end_date)
                .bind(days_column(r.days_remaining))
                .bind(count_column(r.contact_count))
                .bind(r.last_contact_at)
                .bind(r.next_follow_up)
                .bind(r.decision.map(|d| d.as_str()))
                .bind(r.new_package_id.map(Uuid::from))
                .bind(r.new_business_package_id.map(Uuid::from))
                .bind(&r.notes)
                .bind(r.decided_at)
                .bind(r.created_at)
                .bind(r.updated_at)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn fetch_open(&self) -> Result<Vec<RenewalRecord>, DatabaseError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM renewal_records WHERE status NOT IN ('RENEWED', 'DECLINED', 'EXPIRED')"
        );
        let rows = sqlx::query_as::<_, RenewalRecordRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(RenewalRecordRow::into_domain).collect()
    }

    async fn save_all_refreshed(
        &self,
        records: &[RenewalRecord],
        today: NaiveDate,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        for r in records {
            // status is only written for an expiry; contacts and decisions
            // logged since the load keep their progress
            sqlx::query(
                r#"
                UPDATE renewal_records
                SET days_remaining = $2,
                    priority = $3,
                    status = CASE WHEN $4 = 'EXPIRED' THEN 'EXPIRED' ELSE status END,
                    updated_at = $5
                WHERE id = $1 AND status NOT IN ('RENEWED', 'DECLINED', 'EXPIRED')
                "#,
            )
            .bind(Uuid::from(r.id))
            .bind(days_column(r.days_remaining))
            .bind(i16::from(r.priority))
            .bind(r.status.as_str())
            .bind(r.updated_at)
            .execute(&mut *tx)
            .await?;

            if r.status == RenewalStatus::Expired {
                let mut period = lock_business_package(&mut *tx, r.business_package_id).await?;
                if period.expire(today) {
                    sqlx::query("UPDATE business_packages SET status = $2 WHERE id = $1")
                        .bind(Uuid::from(period.id))
                        .bind(period.status.as_str())
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl RenewalStore for RenewalRepository {
    async fn expiring_packages(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<ExpiringPackage>, RenewalError> {
        self.fetch_expiring(from, until).await.map_err(RenewalError::store)
    }

    async fn insert_records(&self, records: &[RenewalRecord]) -> Result<u32, RenewalError> {
        self.insert_all(records).await.map_err(RenewalError::store)
    }

    async fn open_records(&self) -> Result<Vec<RenewalRecord>, RenewalError> {
        self.fetch_open().await.map_err(RenewalError::store)
    }

    async fn save_refreshed(
        &self,
        records: &[RenewalRecord],
        today: NaiveDate,
    ) -> Result<(), RenewalError> {
        self.save_all_refreshed(records, today)
            .await
            .map_err(RenewalError::store)
    }
}

/// The agent credited with cash taken during a renewal decision
///
/// An agent acting on their own record collects for themselves; back-office
/// users collect on behalf of the assigned agent.
fn collecting_agent(actor: &Actor, record: &RenewalRecord) -> Result<UserId, RenewalError> {
    if actor.role == Role::Agent {
        return Ok(actor.user_id);
    }
    record.assigned_agent_id.ok_or_else(|| {
        RenewalError::Invalid(format!(
            "renewal {} has no assigned agent to credit the collection to",
            record.id
        ))
    })
}

fn days_column(days: i64) -> i32 {
    days.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn count_column(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

async fn lock_record(conn: &mut PgConnection, id: RenewalId) -> Result<RenewalRecord, DatabaseError> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM renewal_records WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, RenewalRecordRow>(&sql)
        .bind(Uuid::from(id))
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Renewal", id))?
        .into_domain()
}

async fn save_record(conn: &mut PgConnection, r: &RenewalRecord) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        UPDATE renewal_records
        SET assigned_agent_id = $2, status = $3, priority = $4, days_remaining = $5,
            contact_count = $6, last_contact_at = $7, next_follow_up = $8, decision = $9,
            new_package_id = $10, new_business_package_id = $11, notes = $12,
            decided_at = $13, updated_at = $14
        WHERE id = $1
        "#,
    )
    .bind(Uuid::from(r.id))
    .bind(r.assigned_agent_id.map(Uuid::from))
    .bind(r.status.as_str())
    .bind(i16::from(r.priority))
    .bind(days_column(r.days_remaining))
    .bind(count_column(r.contact_count))
    .bind(r.last_contact_at)
    .bind(r.next_follow_up)
    .bind(r.decision.map(|d| d.as_str()))
    .bind(r.new_package_id.map(Uuid::from))
    .bind(r.new_business_package_id.map(Uuid::from))
    .bind(&r.notes)
    .bind(r.decided_at)
    .bind(r.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[derive(Debug, FromRow)]
pub struct RenewalRecordRow {
    pub id: Uuid,
    pub business_package_id: Uuid,
    pub business_id: Uuid,
    pub package_id: Uuid,
    pub governorate_id: Uuid,
    pub assigned_agent_id: Option<Uuid>,
    pub status: String,
    pub priority: i16,
    pub end_date: NaiveDate,
    pub days_remaining: i32,
    pub contact_count: i32,
    pub last_contact_at: Option<DateTime<Utc>>,
    pub next_follow_up: Option<NaiveDate>,
    pub decision: Option<String>,
    pub new_package_id: Option<Uuid>,
    pub new_business_package_id: Option<Uuid>,
    pub notes: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RenewalRecordRow {
    pub fn into_domain(self) -> Result<RenewalRecord, DatabaseError> {
        let priority = u8::try_from(self.priority)
            .map_err(|_| DatabaseError::corrupt("renewal_records.priority", self.priority))?;
        let contact_count = u32::try_from(self.contact_count)
            .map_err(|_| DatabaseError::corrupt("renewal_records.contact_count", self.contact_count))?;
        let decision = self
            .decision
            .as_deref()
            .map(|d| parse_column("renewal_records.decision", d))
            .transpose()?;

        Ok(RenewalRecord {
            id: RenewalId::from_uuid(self.id),
            business_package_id: BusinessPackageId::from_uuid(self.business_package_id),
            business_id: BusinessId::from_uuid(self.business_id),
            package_id: PackageId::from_uuid(self.package_id),
            governorate_id: GovernorateId::from_uuid(self.governorate_id),
            assigned_agent_id: self.assigned_agent_id.map(UserId::from_uuid),
            status: parse_column("renewal_records.status", &self.status)?,
            priority,
            end_date: self.end_date,
            days_remaining: i64::from(self.days_remaining),
            contact_count,
            last_contact_at: self.last_contact_at,
            next_follow_up: self.next_follow_up,
            decision,
            new_package_id: self.new_package_id.map(PackageId::from_uuid),
            new_business_package_id: self.new_business_package_id.map(BusinessPackageId::from_uuid),
            notes: self.notes,
            decided_at: self.decided_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct RenewalContactRow {
    pub id: Uuid,
    pub renewal_id: Uuid,
    pub agent_id: Uuid,
    pub contact_type: String,
    pub notes: Option<String>,
    pub outcome: Option<String>,
    pub next_follow_up: Option<NaiveDate>,
    pub contacted_at: DateTime<Utc>,
}

impl RenewalContactRow {
    pub fn into_domain(self) -> Result<RenewalContact, DatabaseError> {
        Ok(RenewalContact {
            id: RenewalContactId::from_uuid(self.id),
            renewal_id: RenewalId::from_uuid(self.renewal_id),
            agent_id: UserId::from_uuid(self.agent_id),
            contact_type: parse_column("renewal_contacts.contact_type", &self.contact_type)?,
            notes: self.notes,
            outcome: self.outcome,
            next_follow_up: self.next_follow_up,
            contacted_at: self.contacted_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ExpiringPackageRow {
    #[sqlx(flatten)]
    business_package: BusinessPackageRow,
    governorate_id: Uuid,
    package_is_default: bool,
    has_renewal: bool,
    governorate_agents: Vec<Uuid>,
}

impl ExpiringPackageRow {
    fn into_domain(self) -> Result<ExpiringPackage, DatabaseError> {
        Ok(ExpiringPackage {
            business_package: self.business_package.into_domain()?,
            governorate_id: GovernorateId::from_uuid(self.governorate_id),
            package_is_default: self.package_is_default,
            has_renewal: self.has_renewal,
            governorate_agents: self
                .governorate_agents
                .into_iter()
                .map(UserId::from_uuid)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, priority: i16, decision: Option<&str>) -> RenewalRecordRow {
        RenewalRecordRow {
            id: Uuid::new_v4(),
            business_package_id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            package_id: Uuid::new_v4(),
            governorate_id: Uuid::new_v4(),
            assigned_agent_id: None,
            status: status.into(),
            priority,
            end_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            days_remaining: 5,
            contact_count: 2,
            last_contact_at: None,
            next_follow_up: None,
            decision: decision.map(String::from),
            new_package_id: None,
            new_business_package_id: None,
            notes: None,
            decided_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_row_maps_enums() {
        let record = row("POSTPONED", 2, Some("THINKING")).into_domain().unwrap();
        assert_eq!(record.status, RenewalStatus::Postponed);
        assert_eq!(record.decision, Some(RenewalDecision::Thinking));
        assert_eq!(record.priority, 2);
        assert_eq!(record.contact_count, 2);
    }

    #[test]
    fn test_record_row_rejects_bad_columns() {
        assert!(row("LOST", 0, None).into_domain().is_err());
        assert!(row("PENDING", -1, None).into_domain().is_err());
        assert!(row("PENDING", 0, Some("MAYBE")).into_domain().is_err());
    }

    #[test]
    fn test_agents_filter_to_their_own_records() {
        let agent = Actor::new(UserId::new(), Role::Agent);
        let admin = Actor::new(UserId::new(), Role::Admin);

        let filter = RenewalFilter::visible_to(&agent, None, Page::default());
        assert_eq!(filter.assigned_agent_id, Some(agent.user_id));
        assert!(RenewalFilter::visible_to(&admin, None, Page::default())
            .assigned_agent_id
            .is_none());
    }

    #[test]
    fn test_collecting_agent() {
        let mut record = row("PENDING", 1, None).into_domain().unwrap();
        let agent = Actor::new(UserId::new(), Role::Agent);
        let supervisor = Actor::new(UserId::new(), Role::Supervisor);

        assert_eq!(collecting_agent(&agent, &record).unwrap(), agent.user_id);
        assert!(collecting_agent(&supervisor, &record).is_err());

        let assigned = UserId::new();
        record.assign(assigned).unwrap();
        assert_eq!(collecting_agent(&supervisor, &record).unwrap(), assigned);
    }

    #[test]
    fn test_column_conversions_saturate() {
        assert_eq!(days_column(-4), -4);
        assert_eq!(days_column(i64::MAX), i32::MAX);
        assert_eq!(count_column(u32::MAX), i32::MAX);
    }
}
