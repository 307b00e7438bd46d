//! Pre-built Test Fixtures
//!
//! Ready-to-use reference data for the settlement and renewal suites.
//! Values are fixed so assertions stay predictable.

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use core_kernel::{
    BusinessId, Currency, GovernorateId, Money, PackageId, Rate, Timezone, UserId,
};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Business day every temporal fixture is anchored to
static REFERENCE_DAY: Lazy<NaiveDate> =
    Lazy::new(|| NaiveDate::from_ymd_opt(2025, 3, 1).unwrap_or(NaiveDate::MIN));

/// Fixture for Money test data, in the ledger currency
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn iqd(amount: Decimal) -> Money {
        Money::new(amount, Currency::IQD)
    }

    /// Typical single collection from a business
    pub fn collection() -> Money {
        Self::iqd(dec!(100000))
    }

    /// Monthly price of the standard listing package
    pub fn package_price() -> Money {
        Self::iqd(dec!(250000))
    }

    pub fn zero() -> Money {
        Money::zero(Currency::IQD)
    }

    /// Amount in a second currency for mismatch tests
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }
}

/// Commission rates used across the suites
pub struct RateFixtures;

impl RateFixtures {
    /// Agent commission, 10%
    pub fn agent_commission() -> Rate {
        Rate::from_percentage(dec!(10))
    }

    /// Company share of a manager's governorate revenue, 40%
    pub fn company_share() -> Rate {
        Rate::from_percentage(dec!(40))
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Business day the renewal tests run on
    pub fn today() -> NaiveDate {
        *REFERENCE_DAY
    }

    /// `today` shifted forward; saturates instead of panicking
    pub fn days_from_today(days: u64) -> NaiveDate {
        Self::today()
            .checked_add_days(Days::new(days))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn days_before_today(days: u64) -> NaiveDate {
        Self::today()
            .checked_sub_days(Days::new(days))
            .unwrap_or(NaiveDate::MIN)
    }

    /// 09:00 UTC on the reference day (noon in Baghdad)
    pub fn morning() -> DateTime<Utc> {
        Utc.from_utc_datetime(&Self::today().and_hms_opt(9, 0, 0).unwrap_or_default())
    }

    pub fn baghdad() -> Timezone {
        Timezone::default()
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    fn uuid(suffix: u128) -> Uuid {
        Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440000 + suffix)
    }

    pub fn governorate_id() -> GovernorateId {
        GovernorateId::from_uuid(Self::uuid(1))
    }

    pub fn manager_id() -> UserId {
        UserId::from_uuid(Self::uuid(2))
    }

    pub fn agent_id() -> UserId {
        UserId::from_uuid(Self::uuid(3))
    }

    pub fn business_id() -> BusinessId {
        BusinessId::from_uuid(Self::uuid(4))
    }

    pub fn package_id() -> PackageId {
        PackageId::from_uuid(Self::uuid(5))
    }

    pub fn admin_id() -> UserId {
        UserId::from_uuid(Self::uuid(6))
    }
}

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    pub fn governorate_name() -> &'static str {
        "Basra"
    }

    pub fn governorate_code() -> &'static str {
        "BSR"
    }

    pub fn package_name() -> &'static str {
        "Gold Listing"
    }

    pub fn owner_phone() -> &'static str {
        "+964-770-123-4567"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_fixtures_currencies() {
        assert_eq!(MoneyFixtures::collection().currency(), Currency::IQD);
        assert_eq!(MoneyFixtures::usd_100().currency(), Currency::USD);
    }

    #[test]
    fn test_temporal_fixtures_ordering() {
        let before = TemporalFixtures::days_before_today(3);
        let today = TemporalFixtures::today();
        let after = TemporalFixtures::days_from_today(3);

        assert!(before < today);
        assert!(today < after);
    }

    #[test]
    fn test_id_fixtures_are_deterministic_and_distinct() {
        assert_eq!(IdFixtures::agent_id(), IdFixtures::agent_id());
        assert_ne!(IdFixtures::agent_id(), IdFixtures::manager_id());
    }
}
