//! Renewal workflow tests for domain_renewal

use chrono::{Days, NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal_macros::dec;

use core_kernel::{BusinessId, Currency, GovernorateId, Money, UserId};
use domain_directory::{BusinessPackage, BusinessPackageStatus, Package};
use domain_renewal::{
    priority_for, ContactType, RenewalDecision, RenewalError, RenewalRecord, RenewalStatus,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
}

fn gold() -> Package {
    Package::new("Gold", Money::new(dec!(150000), Currency::IQD), 365).unwrap()
}

fn business_package(ends_in: u64) -> BusinessPackage {
    let start = today()
        .checked_add_days(Days::new(ends_in))
        .unwrap()
        .checked_sub_days(Days::new(365))
        .unwrap();
    BusinessPackage::start(BusinessId::new(), &gold(), start)
}

fn record(ends_in: u64) -> RenewalRecord {
    RenewalRecord::open(
        &business_package(ends_in),
        GovernorateId::new(),
        Some(UserId::new()),
        today(),
    )
}

mod contacts {
    use super::*;

    #[test]
    fn test_call_moves_pending_to_contacted() {
        let mut r = record(10);
        let agent = r.assigned_agent_id.unwrap();
        let contact = r
            .log_contact(agent, ContactType::Call, Some("no answer".into()), None, None, Utc::now())
            .unwrap();

        assert_eq!(r.status, RenewalStatus::Contacted);
        assert_eq!(r.contact_count, 1);
        assert!(r.last_contact_at.is_some());
        assert_eq!(contact.renewal_id, r.id);
    }

    #[test]
    fn test_visit_always_lands_on_visited() {
        let mut r = record(10);
        let agent = r.assigned_agent_id.unwrap();
        r.log_contact(agent, ContactType::Sms, None, None, None, Utc::now())
            .unwrap();
        r.log_contact(agent, ContactType::Visit, None, None, None, Utc::now())
            .unwrap();

        assert_eq!(r.status, RenewalStatus::Visited);
        assert_eq!(r.contact_count, 2);
    }

    #[test]
    fn test_remote_contact_after_visit_keeps_visited() {
        let mut r = record(10);
        let agent = r.assigned_agent_id.unwrap();
        r.log_contact(agent, ContactType::Visit, None, None, None, Utc::now())
            .unwrap();
        r.log_contact(agent, ContactType::Whatsapp, None, None, None, Utc::now())
            .unwrap();

        assert_eq!(r.status, RenewalStatus::Visited);
    }

    #[test]
    fn test_follow_up_is_recorded() {
        let mut r = record(10);
        let agent = r.assigned_agent_id.unwrap();
        let follow_up = today().checked_add_days(Days::new(3)).unwrap();
        r.log_contact(agent, ContactType::Call, None, Some("call back".into()), Some(follow_up), Utc::now())
            .unwrap();

        assert_eq!(r.next_follow_up, Some(follow_up));
    }

    #[test]
    fn test_contact_on_terminal_record_rejected() {
        let mut r = record(10);
        let agent = r.assigned_agent_id.unwrap();
        r.decide(RenewalDecision::Declined, None, None, None, Utc::now())
            .unwrap();

        let result = r.log_contact(agent, ContactType::Call, None, None, None, Utc::now());
        assert!(matches!(result, Err(RenewalError::Terminal { .. })));
    }
}

mod decisions {
    use super::*;

    #[test]
    fn test_accept_renews_on_same_package() {
        let mut r = record(10);
        let outcome = r
            .decide(RenewalDecision::Accepted, None, None, None, Utc::now())
            .unwrap();

        assert_eq!(outcome.status, RenewalStatus::Renewed);
        assert_eq!(outcome.renew_into, Some(r.package_id));
        assert!(r.decided_at.is_some());
    }

    #[test]
    fn test_upgrade_requires_package() {
        let mut r = record(10);
        let result = r.decide(RenewalDecision::Upgrade, None, None, None, Utc::now());
        assert!(matches!(result, Err(RenewalError::MissingPackage(_))));
        assert_eq!(r.status, RenewalStatus::Pending);

        let platinum = Package::new("Platinum", Money::new(dec!(300000), Currency::IQD), 365).unwrap();
        let outcome = r
            .decide(RenewalDecision::Upgrade, Some(platinum.id), None, None, Utc::now())
            .unwrap();
        assert_eq!(outcome.renew_into, Some(platinum.id));
    }

    #[test]
    fn test_thinking_requires_follow_up_and_postpones() {
        let mut r = record(10);
        assert!(matches!(
            r.decide(RenewalDecision::Thinking, None, None, None, Utc::now()),
            Err(RenewalError::MissingFollowUp)
        ));

        let follow_up = today().checked_add_days(Days::new(5)).unwrap();
        let outcome = r
            .decide(RenewalDecision::Thinking, None, Some(follow_up), None, Utc::now())
            .unwrap();
        assert_eq!(outcome.status, RenewalStatus::Postponed);
        assert_eq!(outcome.renew_into, None);
        assert_eq!(r.next_follow_up, Some(follow_up));

        // postponed is not terminal
        let again = r.decide(RenewalDecision::Accepted, None, None, None, Utc::now());
        assert!(again.is_ok());
    }

    #[test]
    fn test_decline_is_terminal() {
        let mut r = record(10);
        r.decide(RenewalDecision::Declined, None, None, Some("closed shop".into()), Utc::now())
            .unwrap();

        assert_eq!(r.status, RenewalStatus::Declined);
        assert!(matches!(
            r.decide(RenewalDecision::Accepted, None, None, None, Utc::now()),
            Err(RenewalError::Terminal { .. })
        ));
        assert!(r.assign(UserId::new()).is_err());
    }

    #[test]
    fn test_renewal_successor_period() {
        let mut bp = business_package(10);
        let mut r = RenewalRecord::open(&bp, GovernorateId::new(), None, today());
        let outcome = r
            .decide(RenewalDecision::Accepted, None, None, None, Utc::now())
            .unwrap();
        assert_eq!(outcome.renew_into, Some(bp.package_id));

        let successor = bp.renew_with(&gold(), today()).unwrap();
        r.link_successor(successor.id);

        assert_eq!(bp.status, BusinessPackageStatus::Renewed);
        assert_eq!(successor.start_date, bp.end_date);
        assert_eq!(r.new_business_package_id, Some(successor.id));
    }
}

mod properties {
    use super::*;

    proptest! {
        #[test]
        fn prop_priority_matches_bands(days in -400i64..400) {
            let p = priority_for(days);
            let expected = if days <= 3 { 3 } else if days <= 7 { 2 } else if days <= 14 { 1 } else { 0 };
            prop_assert_eq!(p, expected);
        }

        #[test]
        fn prop_priority_never_decreases_as_expiry_nears(days in -100i64..100) {
            prop_assert!(priority_for(days) >= priority_for(days + 1));
        }

        #[test]
        fn prop_refresh_expires_only_after_end(ends_in in 0u64..60, elapsed in 0u64..90) {
            let mut r = record(ends_in);
            let later = today().checked_add_days(Days::new(elapsed)).unwrap();
            r.refresh(later);

            let lapsed = elapsed > ends_in;
            prop_assert_eq!(r.status == RenewalStatus::Expired, lapsed);
            prop_assert_eq!(r.priority, priority_for(ends_in as i64 - elapsed as i64));
        }
    }
}
