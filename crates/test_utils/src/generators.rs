//! Property-Based Test Generators
//!
//! Proptest strategies that produce data satisfying domain invariants.

use chrono::{Days, NaiveDate};
use core_kernel::{Currency, Money, Rate, UserId};
use domain_renewal::{ContactType, RenewalDecision, RenewalStatus};
use domain_settlement::SettlementStatus;
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::fixtures::TemporalFixtures;

/// Whole-dinar amounts, 1 to 10 million
pub fn iqd_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(Decimal::from)
}

pub fn iqd_money_strategy() -> impl Strategy<Value = Money> {
    iqd_amount_strategy().prop_map(|amount| Money::new(amount, Currency::IQD))
}

/// Between 1 and `max` collection amounts
pub fn collection_amounts_strategy(max: usize) -> impl Strategy<Value = Vec<Decimal>> {
    proptest::collection::vec(iqd_amount_strategy(), 1..=max)
}

/// Percentages with two decimals, 0% to 100%
pub fn percentage_strategy() -> impl Strategy<Value = Decimal> {
    (0u32..=10_000u32).prop_map(|n| Decimal::new(i64::from(n), 2))
}

/// Agent commission and company share whose sum never exceeds 100%
pub fn rate_pair_strategy() -> impl Strategy<Value = (Rate, Rate)> {
    (0u32..=5_000u32, 0u32..=5_000u32).prop_map(|(agent, company)| {
        (
            Rate::from_percentage(Decimal::new(i64::from(agent), 2)),
            Rate::from_percentage(Decimal::new(i64::from(company), 2)),
        )
    })
}

/// Days left on a package, from a month lapsed to two months ahead
pub fn days_remaining_strategy() -> impl Strategy<Value = i64> {
    -30i64..=60i64
}

/// Dates within 60 days after the reference day
pub fn follow_up_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (1u64..=60u64).prop_map(|days| {
        TemporalFixtures::today()
            .checked_add_days(Days::new(days))
            .unwrap_or(NaiveDate::MAX)
    })
}

pub fn renewal_status_strategy() -> impl Strategy<Value = RenewalStatus> {
    proptest::sample::select(RenewalStatus::ALL.to_vec())
}

pub fn settlement_status_strategy() -> impl Strategy<Value = SettlementStatus> {
    prop_oneof![
        Just(SettlementStatus::Draft),
        Just(SettlementStatus::PendingManager),
        Just(SettlementStatus::PendingAdmin),
        Just(SettlementStatus::Confirmed),
        Just(SettlementStatus::Cancelled),
    ]
}

pub fn contact_type_strategy() -> impl Strategy<Value = ContactType> {
    prop_oneof![
        Just(ContactType::Call),
        Just(ContactType::Visit),
        Just(ContactType::Whatsapp),
        Just(ContactType::Sms),
        Just(ContactType::Email),
    ]
}

pub fn decision_strategy() -> impl Strategy<Value = RenewalDecision> {
    prop_oneof![
        Just(RenewalDecision::Accepted),
        Just(RenewalDecision::Declined),
        Just(RenewalDecision::Thinking),
        Just(RenewalDecision::Upgrade),
        Just(RenewalDecision::Downgrade),
    ]
}

pub fn user_id_strategy() -> impl Strategy<Value = UserId> {
    any::<[u8; 16]>().prop_map(|bytes| UserId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}

/// Owner phone numbers in the local format
pub fn phone_strategy() -> impl Strategy<Value = String> {
    (770u32..=790u32, 100u32..999u32, 1000u32..9999u32)
        .prop_map(|(operator, block, line)| format!("+964-{}-{}-{}", operator, block, line))
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn iqd_money_is_positive_and_whole(money in iqd_money_strategy()) {
            prop_assert!(money.is_positive());
            prop_assert_eq!(money.amount().fract(), Decimal::ZERO);
        }

        #[test]
        fn rate_pairs_leave_a_share(pair in rate_pair_strategy()) {
            let (agent, company) = pair;
            prop_assert!(agent.as_percentage() + company.as_percentage() <= Decimal::ONE_HUNDRED);
        }

        #[test]
        fn follow_ups_are_in_the_future(date in follow_up_date_strategy()) {
            prop_assert!(date > TemporalFixtures::today());
        }

        #[test]
        fn collection_amounts_not_empty(amounts in collection_amounts_strategy(8)) {
            prop_assert!(!amounts.is_empty());
            prop_assert!(amounts.len() <= 8);
        }
    }
}
