//! Directory repository: geography, staff, packages and subscription periods

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use core_kernel::{
    BusinessId, BusinessPackageId, Currency, GovernorateId, Money, PackageId, UserId,
};
use domain_directory::{
    AgentProfile, Business, BusinessPackage, Governorate, ManagerProfile, Package, Role,
};

use super::{parse_column, parse_rate};
use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    pool: PgPool,
    currency: Currency,
}

impl DirectoryRepository {
    pub fn new(pool: PgPool, currency: Currency) -> Self {
        Self { pool, currency }
    }

    pub async fn insert_governorate(&self, governorate: &Governorate) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO governorates (id, name, code) VALUES ($1, $2, $3)")
            .bind(Uuid::from(governorate.id))
            .bind(&governorate.name)
            .bind(&governorate.code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_user(
        &self,
        id: UserId,
        full_name: &str,
        role: Role,
    ) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO users (id, full_name, role) VALUES ($1, $2, $3)")
            .bind(Uuid::from(id))
            .bind(full_name)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Inserts the user row and the manager profile
    pub async fn insert_manager(&self, manager: &ManagerProfile) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO users (id, full_name, role) VALUES ($1, $2, 'GOVERNORATE_MANAGER')")
            .bind(Uuid::from(manager.user_id))
            .bind(&manager.full_name)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO manager_profiles (user_id, governorate_id, company_commission_rate, lifetime_earnings)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::from(manager.user_id))
        .bind(Uuid::from(manager.governorate_id))
        .bind(manager.company_commission_rate.as_percentage())
        .bind(manager.lifetime_earnings.amount())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Inserts the user row and the agent profile
    pub async fn insert_agent(&self, agent: &AgentProfile) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO users (id, full_name, role) VALUES ($1, $2, 'AGENT')")
            .bind(Uuid::from(agent.user_id))
            .bind(&agent.full_name)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO agent_profiles (user_id, governorate_id, manager_id, commission_rate, lifetime_earnings)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::from(agent.user_id))
        .bind(Uuid::from(agent.governorate_id))
        .bind(agent.manager_id.map(Uuid::from))
        .bind(agent.commission_rate.as_percentage())
        .bind(agent.lifetime_earnings.amount())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn insert_business(&self, business: &Business) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO businesses (id, name, governorate_id, owner_phone, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::from(business.id))
        .bind(&business.name)
        .bind(Uuid::from(business.governorate_id))
        .bind(&business.owner_phone)
        .bind(business.is_active)
        .bind(business.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_package(&self, package: &Package) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO packages (id, name, price, duration_days, is_default, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::from(package.id))
        .bind(&package.name)
        .bind(package.price.amount())
        .bind(i32::try_from(package.duration_days).unwrap_or(i32::MAX))
        .bind(package.is_default)
        .bind(package.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_business_package(&self, bp: &BusinessPackage) -> Result<(), DatabaseError> {
        insert_business_package(&self.pool, bp).await
    }

    pub async fn find_agent(&self, user_id: UserId) -> Result<AgentProfile, DatabaseError> {
        fetch_agent(&self.pool, user_id, self.currency).await
    }

    pub async fn find_manager(&self, user_id: UserId) -> Result<ManagerProfile, DatabaseError> {
        fetch_manager(&self.pool, user_id, self.currency).await
    }

    pub async fn find_package(&self, id: PackageId) -> Result<Package, DatabaseError> {
        fetch_package(&self.pool, id, self.currency).await
    }

    pub async fn find_business_package(
        &self,
        id: BusinessPackageId,
    ) -> Result<BusinessPackage, DatabaseError> {
        let row = sqlx::query_as::<_, BusinessPackageRow>(
            r#"
            SELECT id, business_id, package_id, start_date, end_date, status, created_at
            FROM business_packages
            WHERE id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("BusinessPackage", id))?;

        row.into_domain()
    }

    /// Agents currently working a governorate
    pub async fn agents_in_governorate(
        &self,
        governorate_id: GovernorateId,
    ) -> Result<Vec<UserId>, DatabaseError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT ap.user_id
            FROM agent_profiles ap
            JOIN users u ON u.id = ap.user_id
            WHERE ap.governorate_id = $1 AND u.is_active
            ORDER BY ap.user_id
            "#,
        )
        .bind(Uuid::from(governorate_id))
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(UserId::from_uuid).collect())
    }

    /// IDs of the agents reporting to a manager
    pub async fn agents_of_manager(&self, manager_id: UserId) -> Result<Vec<UserId>, DatabaseError> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM agent_profiles WHERE manager_id = $1")
                .bind(Uuid::from(manager_id))
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().map(UserId::from_uuid).collect())
    }
}

pub(crate) async fn insert_business_package<'e, E>(
    executor: E,
    bp: &BusinessPackage,
) -> Result<(), DatabaseError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO business_packages (id, business_id, package_id, start_date, end_date, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::from(bp.id))
    .bind(Uuid::from(bp.business_id))
    .bind(Uuid::from(bp.package_id))
    .bind(bp.start_date)
    .bind(bp.end_date)
    .bind(bp.status.as_str())
    .bind(bp.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

const AGENT_PROFILE_QUERY: &str = r#"
    SELECT ap.user_id, u.full_name, ap.governorate_id, ap.manager_id,
           ap.commission_rate, ap.lifetime_earnings
    FROM agent_profiles ap
    JOIN users u ON u.id = ap.user_id
    WHERE ap.user_id = $1
"#;

const MANAGER_PROFILE_QUERY: &str = r#"
    SELECT mp.user_id, u.full_name, mp.governorate_id,
           mp.company_commission_rate, mp.lifetime_earnings
    FROM manager_profiles mp
    JOIN users u ON u.id = mp.user_id
    WHERE mp.user_id = $1
"#;

pub(crate) async fn fetch_agent<'e, E>(
    executor: E,
    user_id: UserId,
    currency: Currency,
) -> Result<AgentProfile, DatabaseError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, AgentProfileRow>(AGENT_PROFILE_QUERY)
        .bind(Uuid::from(user_id))
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Agent", user_id))?
        .into_domain(currency)
}

/// Locks the agent's profile row for the rest of the transaction
pub(crate) async fn lock_agent<'e, E>(
    executor: E,
    user_id: UserId,
    currency: Currency,
) -> Result<AgentProfile, DatabaseError>
where
    E: PgExecutor<'e>,
{
    let sql = format!("{AGENT_PROFILE_QUERY} FOR UPDATE OF ap");
    sqlx::query_as::<_, AgentProfileRow>(&sql)
        .bind(Uuid::from(user_id))
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Agent", user_id))?
        .into_domain(currency)
}

pub(crate) async fn fetch_manager<'e, E>(
    executor: E,
    user_id: UserId,
    currency: Currency,
) -> Result<ManagerProfile, DatabaseError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ManagerProfileRow>(MANAGER_PROFILE_QUERY)
        .bind(Uuid::from(user_id))
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Manager", user_id))?
        .into_domain(currency)
}

/// Locks the manager's profile row for the rest of the transaction
pub(crate) async fn lock_manager<'e, E>(
    executor: E,
    user_id: UserId,
    currency: Currency,
) -> Result<ManagerProfile, DatabaseError>
where
    E: PgExecutor<'e>,
{
    let sql = format!("{MANAGER_PROFILE_QUERY} FOR UPDATE OF mp");
    sqlx::query_as::<_, ManagerProfileRow>(&sql)
        .bind(Uuid::from(user_id))
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Manager", user_id))?
        .into_domain(currency)
}

pub(crate) async fn save_agent_earnings<'e, E>(
    executor: E,
    agent: &AgentProfile,
) -> Result<(), DatabaseError>
where
    E: PgExecutor<'e>,
{
    sqlx::query("UPDATE agent_profiles SET lifetime_earnings = $2 WHERE user_id = $1")
        .bind(Uuid::from(agent.user_id))
        .bind(agent.lifetime_earnings.amount())
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn save_manager_earnings<'e, E>(
    executor: E,
    manager: &ManagerProfile,
) -> Result<(), DatabaseError>
where
    E: PgExecutor<'e>,
{
    sqlx::query("UPDATE manager_profiles SET lifetime_earnings = $2 WHERE user_id = $1")
        .bind(Uuid::from(manager.user_id))
        .bind(manager.lifetime_earnings.amount())
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn fetch_package<'e, E>(
    executor: E,
    id: PackageId,
    currency: Currency,
) -> Result<Package, DatabaseError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, PackageRow>(
        "SELECT id, name, price, duration_days, is_default, is_active FROM packages WHERE id = $1",
    )
    .bind(Uuid::from(id))
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Package", id))?;

    row.into_domain(currency)
}

/// Locks a business package row for the rest of the transaction
pub(crate) async fn lock_business_package<'e, E>(
    executor: E,
    id: BusinessPackageId,
) -> Result<BusinessPackage, DatabaseError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, BusinessPackageRow>(
        r#"
        SELECT id, business_id, package_id, start_date, end_date, status, created_at
        FROM business_packages
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(Uuid::from(id))
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| DatabaseError::not_found("BusinessPackage", id))?;

    row.into_domain()
}

#[derive(Debug, FromRow)]
pub struct AgentProfileRow {
    pub user_id: Uuid,
    pub full_name: String,
    pub governorate_id: Uuid,
    pub manager_id: Option<Uuid>,
    pub commission_rate: Decimal,
    pub lifetime_earnings: Decimal,
}

impl AgentProfileRow {
    pub fn into_domain(self, currency: Currency) -> Result<AgentProfile, DatabaseError> {
        Ok(AgentProfile {
            user_id: UserId::from_uuid(self.user_id),
            full_name: self.full_name,
            governorate_id: GovernorateId::from_uuid(self.governorate_id),
            manager_id: self.manager_id.map(UserId::from_uuid),
            commission_rate: parse_rate("agent_profiles.commission_rate", self.commission_rate)?,
            lifetime_earnings: Money::new(self.lifetime_earnings, currency),
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ManagerProfileRow {
    pub user_id: Uuid,
    pub full_name: String,
    pub governorate_id: Uuid,
    pub company_commission_rate: Decimal,
    pub lifetime_earnings: Decimal,
}

impl ManagerProfileRow {
    pub fn into_domain(self, currency: Currency) -> Result<ManagerProfile, DatabaseError> {
        Ok(ManagerProfile {
            user_id: UserId::from_uuid(self.user_id),
            full_name: self.full_name,
            governorate_id: GovernorateId::from_uuid(self.governorate_id),
            company_commission_rate: parse_rate(
                "manager_profiles.company_commission_rate",
                self.company_commission_rate,
            )?,
            lifetime_earnings: Money::new(self.lifetime_earnings, currency),
        })
    }
}

#[derive(Debug, FromRow)]
pub struct PackageRow {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub duration_days: i32,
    pub is_default: bool,
    pub is_active: bool,
}

impl PackageRow {
    pub fn into_domain(self, currency: Currency) -> Result<Package, DatabaseError> {
        let duration_days = u32::try_from(self.duration_days)
            .map_err(|e| DatabaseError::corrupt("packages.duration_days", e))?;
        Ok(Package {
            id: PackageId::from_uuid(self.id),
            name: self.name,
            price: Money::new(self.price, currency),
            duration_days,
            is_default: self.is_default,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct BusinessPackageRow {
    pub id: Uuid,
    pub business_id: Uuid,
    pub package_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl BusinessPackageRow {
    pub fn into_domain(self) -> Result<BusinessPackage, DatabaseError> {
        Ok(BusinessPackage {
            id: BusinessPackageId::from_uuid(self.id),
            business_id: BusinessId::from_uuid(self.business_id),
            package_id: PackageId::from_uuid(self.package_id),
            start_date: self.start_date,
            end_date: self.end_date,
            status: parse_column("business_packages.status", &self.status)?,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_directory::BusinessPackageStatus;
    use rust_decimal_macros::dec;

    #[test]
    fn test_agent_row_rate_is_percentage() {
        let row = AgentProfileRow {
            user_id: Uuid::new_v4(),
            full_name: "Agent".into(),
            governorate_id: Uuid::new_v4(),
            manager_id: None,
            commission_rate: dec!(12.5),
            lifetime_earnings: dec!(0),
        };
        let agent = row.into_domain(Currency::IQD).unwrap();
        assert_eq!(agent.commission_rate.as_decimal(), dec!(0.125));
        assert!(agent.manager_id.is_none());
    }

    #[test]
    fn test_business_package_row_status() {
        let row = BusinessPackageRow {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            package_id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            status: "RENEWED".into(),
            created_at: Utc::now(),
        };
        assert_eq!(row.into_domain().unwrap().status, BusinessPackageStatus::Renewed);
    }
}
