//! Test Data Builders
//!
//! Builders with sensible defaults so tests only spell out the fields they
//! care about. `TestGovernorate` assembles a whole reporting chain and can
//! seed it into a database.

use chrono::NaiveDate;
use core_kernel::{Currency, GovernorateId, Money, Rate, UserId};
use domain_directory::{
    AgentProfile, Business, BusinessPackage, Governorate, ManagerProfile, Package,
};
use fake::faker::company::en::CompanyName;
use fake::faker::name::en::Name;
use fake::Fake;
use infra_db::{DatabaseError, DirectoryRepository};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::fixtures::{MoneyFixtures, RateFixtures, StringFixtures, TemporalFixtures};

/// Builder for governorate managers
pub struct TestManagerBuilder {
    user_id: UserId,
    full_name: String,
    governorate_id: GovernorateId,
    company_commission_rate: Rate,
    lifetime_earnings: Money,
}

impl Default for TestManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestManagerBuilder {
    pub fn new() -> Self {
        Self {
            user_id: UserId::new(),
            full_name: Name().fake(),
            governorate_id: GovernorateId::new(),
            company_commission_rate: RateFixtures::company_share(),
            lifetime_earnings: MoneyFixtures::zero(),
        }
    }

    pub fn with_user_id(mut self, id: UserId) -> Self {
        self.user_id = id;
        self
    }

    pub fn in_governorate(mut self, id: GovernorateId) -> Self {
        self.governorate_id = id;
        self
    }

    /// Company share as a percentage, e.g. `dec!(40)`
    pub fn with_company_share(mut self, percentage: Decimal) -> Self {
        self.company_commission_rate = Rate::from_percentage(percentage);
        self
    }

    pub fn build(self) -> ManagerProfile {
        ManagerProfile {
            user_id: self.user_id,
            full_name: self.full_name,
            governorate_id: self.governorate_id,
            company_commission_rate: self.company_commission_rate,
            lifetime_earnings: self.lifetime_earnings,
        }
    }
}

/// Builder for field agents
pub struct TestAgentBuilder {
    user_id: UserId,
    full_name: String,
    governorate_id: GovernorateId,
    manager_id: Option<UserId>,
    commission_rate: Rate,
    lifetime_earnings: Money,
}

impl Default for TestAgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAgentBuilder {
    pub fn new() -> Self {
        Self {
            user_id: UserId::new(),
            full_name: Name().fake(),
            governorate_id: GovernorateId::new(),
            manager_id: None,
            commission_rate: RateFixtures::agent_commission(),
            lifetime_earnings: MoneyFixtures::zero(),
        }
    }

    pub fn with_user_id(mut self, id: UserId) -> Self {
        self.user_id = id;
        self
    }

    /// Places the agent in the manager's governorate, reporting to them
    pub fn under(mut self, manager: &ManagerProfile) -> Self {
        self.governorate_id = manager.governorate_id;
        self.manager_id = Some(manager.user_id);
        self
    }

    /// Agent with no manager assigned
    pub fn unmanaged_in(mut self, id: GovernorateId) -> Self {
        self.governorate_id = id;
        self.manager_id = None;
        self
    }

    /// Commission as a percentage, e.g. `dec!(10)`
    pub fn with_commission(mut self, percentage: Decimal) -> Self {
        self.commission_rate = Rate::from_percentage(percentage);
        self
    }

    pub fn build(self) -> AgentProfile {
        AgentProfile {
            user_id: self.user_id,
            full_name: self.full_name,
            governorate_id: self.governorate_id,
            manager_id: self.manager_id,
            commission_rate: self.commission_rate,
            lifetime_earnings: self.lifetime_earnings,
        }
    }
}

/// Builder for subscription packages
pub struct TestPackageBuilder {
    name: String,
    price: Money,
    duration_days: u32,
    is_default: bool,
    is_active: bool,
}

impl Default for TestPackageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPackageBuilder {
    pub fn new() -> Self {
        Self {
            name: StringFixtures::package_name().to_string(),
            price: MoneyFixtures::package_price(),
            duration_days: 30,
            is_default: false,
            is_active: true,
        }
    }

    pub fn with_price(mut self, amount: Decimal) -> Self {
        self.price = Money::new(amount, Currency::IQD);
        self
    }

    pub fn with_duration_days(mut self, days: u32) -> Self {
        self.duration_days = days;
        self
    }

    /// The free fallback tier
    pub fn default_tier(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// # Panics
    ///
    /// Panics on a zero duration or negative price
    pub fn build(self) -> Package {
        let mut package = Package::new(self.name, self.price, self.duration_days)
            .expect("Invalid test package");
        package.is_default = self.is_default;
        package.is_active = self.is_active;
        package
    }
}

/// A business package that ends `days_remaining` days after `today`
pub fn business_package_ending_in(
    business: &Business,
    package: &Package,
    today: NaiveDate,
    days_remaining: i64,
) -> BusinessPackage {
    let offset = i64::from(package.duration_days) - days_remaining;
    let start = today - chrono::Duration::days(offset);
    BusinessPackage::start(business.id, package, start)
}

/// One governorate with a manager, an agent, and a subscribed business
#[derive(Debug, Clone)]
pub struct TestGovernorate {
    pub governorate: Governorate,
    pub manager: ManagerProfile,
    pub agent: AgentProfile,
    pub business: Business,
    pub package: Package,
    pub business_package: BusinessPackage,
}

impl TestGovernorate {
    /// Chain whose business package ends `days_remaining` days after the reference day
    pub fn expiring_in(days_remaining: i64) -> Self {
        // Codes are unique per database; keep them distinct across tests
        let code = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
        let governorate = Governorate::new(StringFixtures::governorate_name(), code);
        let manager = TestManagerBuilder::new().in_governorate(governorate.id).build();
        let agent = TestAgentBuilder::new().under(&manager).build();
        let business = Business::new(CompanyName().fake::<String>(), governorate.id)
            .with_owner_phone(StringFixtures::owner_phone());
        let package = TestPackageBuilder::new().build();
        let business_package = business_package_ending_in(
            &business,
            &package,
            TemporalFixtures::today(),
            days_remaining,
        );

        Self {
            governorate,
            manager,
            agent,
            business,
            package,
            business_package,
        }
    }

    /// Writes every row of the chain
    pub async fn seed(&self, directory: &DirectoryRepository) -> Result<(), DatabaseError> {
        directory.insert_governorate(&self.governorate).await?;
        directory.insert_manager(&self.manager).await?;
        directory.insert_agent(&self.agent).await?;
        directory.insert_business(&self.business).await?;
        directory.insert_package(&self.package).await?;
        directory.insert_business_package(&self.business_package).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_agent_under_manager_shares_governorate() {
        let manager = TestManagerBuilder::new().build();
        let agent = TestAgentBuilder::new().under(&manager).with_commission(dec!(12)).build();

        assert_eq!(agent.governorate_id, manager.governorate_id);
        assert_eq!(agent.manager_id, Some(manager.user_id));
        assert_eq!(agent.commission_rate.as_percentage(), dec!(12));
    }

    #[test]
    fn test_business_package_ending_in() {
        let chain = TestGovernorate::expiring_in(5);
        assert_eq!(chain.business_package.days_remaining(TemporalFixtures::today()), 5);
    }

    #[test]
    fn test_package_builder_flags() {
        let package = TestPackageBuilder::new().default_tier().inactive().build();
        assert!(package.is_default);
        assert!(!package.is_active);
    }
}
