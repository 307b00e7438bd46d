//! Settlement lifecycle tests for domain_settlement

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{BusinessId, Currency, GovernorateId, Money, Rate, UserId};
use domain_directory::{Actor, AgentProfile, ManagerProfile, Role};
use domain_settlement::{
    AgentCollection, AgentCommission, AgentFinancialSettlement, AgentSettlementSnapshot,
    CollectionStatus, CommissionStatus, Ledger, LedgerAccount, ManagerFinancialSettlement,
    ManagerSettlementSnapshot, SettlementError, SettlementStatus,
};

fn iqd(amount: Decimal) -> Money {
    Money::new(amount, Currency::IQD)
}

fn manager(rate: Decimal) -> ManagerProfile {
    ManagerProfile {
        user_id: UserId::new(),
        full_name: "Basra Manager".to_string(),
        governorate_id: GovernorateId::new(),
        company_commission_rate: Rate::from_percentage(rate),
        lifetime_earnings: Money::zero(Currency::IQD),
    }
}

fn agent_under(manager: &ManagerProfile, rate: Decimal) -> AgentProfile {
    AgentProfile {
        user_id: UserId::new(),
        full_name: "Field Agent".to_string(),
        governorate_id: manager.governorate_id,
        manager_id: Some(manager.user_id),
        commission_rate: Rate::from_percentage(rate),
        lifetime_earnings: Money::zero(Currency::IQD),
    }
}

/// Collections of the given amounts with their commissions
fn items(agent: &AgentProfile, amounts: &[Decimal]) -> (Vec<AgentCollection>, Vec<AgentCommission>) {
    let collections: Vec<_> = amounts
        .iter()
        .map(|a| AgentCollection::record(agent.user_id, BusinessId::new(), iqd(*a)).unwrap())
        .collect();
    let commissions = collections
        .iter()
        .map(|c| AgentCommission::for_collection(c, agent.commission_rate))
        .collect();
    (collections, commissions)
}

fn pending_settlement(agent: &AgentProfile, amounts: &[Decimal]) -> AgentFinancialSettlement {
    let (collections, commissions) = items(agent, amounts);
    let snapshot =
        AgentSettlementSnapshot::build(agent.user_id, &collections, &commissions, Currency::IQD)
            .unwrap();
    AgentFinancialSettlement::create(agent, snapshot, None, true).unwrap()
}

fn confirmed_settlement(agent: &AgentProfile, amounts: &[Decimal]) -> AgentFinancialSettlement {
    let mut s = pending_settlement(agent, amounts);
    let admin = Actor::new(UserId::new(), Role::Admin);
    s.confirm(&admin, Utc::now()).unwrap();
    s
}

mod agent_settlement {
    use super::*;

    #[test]
    fn test_snapshot_totals() {
        let m = manager(dec!(40));
        let a = agent_under(&m, dec!(10));
        let s = pending_settlement(&a, &[dec!(100000), dec!(50000)]);

        assert_eq!(s.status, SettlementStatus::PendingManager);
        assert_eq!(s.total_collected.amount(), dec!(150000));
        assert_eq!(s.total_commissions.amount(), dec!(15000));
        assert_eq!(s.net_amount.amount(), dec!(135000));
        assert_eq!(s.collection_ids.len(), 2);
        assert_eq!(s.commission_ids.len(), 2);
        assert!(s.settlement_number.starts_with("AS-"));
    }

    #[test]
    fn test_nothing_to_settle() {
        let m = manager(dec!(40));
        let a = agent_under(&m, dec!(10));
        let result = AgentSettlementSnapshot::build(a.user_id, &[], &[], Currency::IQD);
        assert!(matches!(result, Err(SettlementError::NothingToSettle(_))));
    }

    #[test]
    fn test_reserved_collection_cannot_be_settled_again() {
        let m = manager(dec!(40));
        let a = agent_under(&m, dec!(10));
        let (mut collections, commissions) = items(&a, &[dec!(10000)]);
        let first = pending_settlement(&a, &[dec!(1)]);
        collections[0].settlement_id = Some(first.id);

        let result =
            AgentSettlementSnapshot::build(a.user_id, &collections, &commissions, Currency::IQD);
        assert!(matches!(result, Err(SettlementError::ItemAlreadySettled(_))));
    }

    #[test]
    fn test_open_settlement_blocks_new_one() {
        let m = manager(dec!(40));
        let a = agent_under(&m, dec!(10));
        let existing = pending_settlement(&a, &[dec!(1000)]);
        let (collections, commissions) = items(&a, &[dec!(2000)]);
        let snapshot =
            AgentSettlementSnapshot::build(a.user_id, &collections, &commissions, Currency::IQD)
                .unwrap();

        let result = AgentFinancialSettlement::create(&a, snapshot, Some(existing.id), true);
        assert!(matches!(result, Err(SettlementError::OpenSettlementExists { .. })));
    }

    #[test]
    fn test_agent_without_manager_rejected() {
        let m = manager(dec!(40));
        let mut a = agent_under(&m, dec!(10));
        a.manager_id = None;
        let (collections, commissions) = items(&a, &[dec!(2000)]);
        let snapshot =
            AgentSettlementSnapshot::build(a.user_id, &collections, &commissions, Currency::IQD)
                .unwrap();

        let result = AgentFinancialSettlement::create(&a, snapshot, None, true);
        assert!(matches!(result, Err(SettlementError::NoManagerAssigned(_))));
    }

    #[test]
    fn test_draft_submit_by_owner_only() {
        let m = manager(dec!(40));
        let a = agent_under(&m, dec!(10));
        let (collections, commissions) = items(&a, &[dec!(5000)]);
        let snapshot =
            AgentSettlementSnapshot::build(a.user_id, &collections, &commissions, Currency::IQD)
                .unwrap();
        let mut s = AgentFinancialSettlement::create(&a, snapshot, None, false).unwrap();

        let stranger = Actor::new(UserId::new(), Role::Agent);
        assert!(matches!(
            s.submit(&stranger, Utc::now()),
            Err(SettlementError::NotOwner(_))
        ));

        let owner = Actor::new(a.user_id, Role::Agent);
        s.submit(&owner, Utc::now()).unwrap();
        assert_eq!(s.status, SettlementStatus::PendingManager);
        assert!(s.submitted_at.is_some());

        // already pending
        assert!(s.submit(&owner, Utc::now()).is_err());
    }

    #[test]
    fn test_confirm_by_owning_manager_applies_effects() {
        let m = manager(dec!(40));
        let mut a = agent_under(&m, dec!(10));
        let (mut collections, mut commissions) = items(&a, &[dec!(100000), dec!(20000)]);
        let snapshot =
            AgentSettlementSnapshot::build(a.user_id, &collections, &commissions, Currency::IQD)
                .unwrap();
        let mut s = AgentFinancialSettlement::create(&a, snapshot, None, true).unwrap();

        let manager_actor = Actor::new(m.user_id, Role::GovernorateManager);
        let confirmation = s.confirm(&manager_actor, Utc::now()).unwrap();
        confirmation
            .apply(&mut collections, &mut commissions, &mut a)
            .unwrap();

        assert_eq!(s.status, SettlementStatus::Confirmed);
        assert_eq!(s.confirmed_by, Some(m.user_id));
        assert!(collections.iter().all(|c| c.status == CollectionStatus::Verified));
        assert!(commissions.iter().all(|c| c.status == CommissionStatus::Paid));
        assert_eq!(a.lifetime_earnings, s.total_commissions);
        assert_eq!(a.lifetime_earnings.amount(), dec!(12000));
    }

    #[test]
    fn test_confirm_by_other_manager_forbidden() {
        let m = manager(dec!(40));
        let a = agent_under(&m, dec!(10));
        let mut s = pending_settlement(&a, &[dec!(1000)]);

        let other = Actor::new(UserId::new(), Role::GovernorateManager);
        assert!(matches!(
            s.confirm(&other, Utc::now()),
            Err(SettlementError::NotOwner(_))
        ));
        assert_eq!(s.status, SettlementStatus::PendingManager);
    }

    #[test]
    fn test_cannot_confirm_twice() {
        let m = manager(dec!(40));
        let a = agent_under(&m, dec!(10));
        let mut s = confirmed_settlement(&a, &[dec!(1000)]);

        let admin = Actor::new(UserId::new(), Role::Admin);
        assert!(matches!(
            s.confirm(&admin, Utc::now()),
            Err(SettlementError::AlreadyConfirmed(_))
        ));
    }

    #[test]
    fn test_cannot_cancel_after_confirm() {
        let m = manager(dec!(40));
        let a = agent_under(&m, dec!(10));
        let mut s = confirmed_settlement(&a, &[dec!(1000)]);

        let owner = Actor::new(a.user_id, Role::Agent);
        assert!(matches!(
            s.cancel(&owner, "changed my mind", Utc::now()),
            Err(SettlementError::AlreadyConfirmed(_))
        ));
        assert_eq!(s.status, SettlementStatus::Confirmed);
    }

    #[test]
    fn test_cancel_releases_items() {
        let m = manager(dec!(40));
        let a = agent_under(&m, dec!(10));
        let mut s = pending_settlement(&a, &[dec!(1000), dec!(2000)]);

        let owner = Actor::new(a.user_id, Role::Agent);
        let released = s.cancel(&owner, "wrong amount", Utc::now()).unwrap();

        assert_eq!(s.status, SettlementStatus::Cancelled);
        assert_eq!(s.cancellation_reason.as_deref(), Some("wrong amount"));
        assert_eq!(released.released_collections.len(), 2);
        assert_eq!(released.released_commissions.len(), 2);

        // cancelled is terminal
        assert!(s.cancel(&owner, "again", Utc::now()).is_err());
    }

    #[test]
    fn test_visibility() {
        let m = manager(dec!(40));
        let a = agent_under(&m, dec!(10));
        let s = pending_settlement(&a, &[dec!(1000)]);

        assert!(s.can_view(&Actor::new(a.user_id, Role::Agent)));
        assert!(s.can_view(&Actor::new(m.user_id, Role::GovernorateManager)));
        assert!(s.can_view(&Actor::new(UserId::new(), Role::Accountant)));
        assert!(!s.can_view(&Actor::new(UserId::new(), Role::Agent)));
        assert!(!s.can_view(&Actor::new(UserId::new(), Role::GovernorateManager)));
    }
}

mod manager_settlement {
    use super::*;

    #[test]
    fn test_revenue_split() {
        let m = manager(dec!(40));
        let a = agent_under(&m, dec!(10));
        let confirmed = vec![
            confirmed_settlement(&a, &[dec!(100000)]),
            confirmed_settlement(&a, &[dec!(150000)]),
        ];

        let snapshot = ManagerSettlementSnapshot::build(
            m.user_id,
            &confirmed,
            m.company_commission_rate,
            Currency::IQD,
        )
        .unwrap();

        assert_eq!(snapshot.total_revenue.amount(), dec!(250000));
        assert_eq!(snapshot.total_agent_commissions.amount(), dec!(25000));
        assert_eq!(snapshot.company_share_amount.amount(), dec!(100000));
        assert_eq!(snapshot.manager_share_amount.amount(), dec!(125000));
        assert_eq!(snapshot.agent_settlement_ids.len(), 2);
    }

    #[test]
    fn test_unconfirmed_agent_settlement_rejected() {
        let m = manager(dec!(40));
        let a = agent_under(&m, dec!(10));
        let pending = vec![pending_settlement(&a, &[dec!(1000)])];

        let result = ManagerSettlementSnapshot::build(
            m.user_id,
            &pending,
            m.company_commission_rate,
            Currency::IQD,
        );
        assert!(matches!(result, Err(SettlementError::ItemAlreadySettled(_))));
    }

    #[test]
    fn test_shares_exceeding_revenue_rejected() {
        let m = manager(dec!(95));
        let a = agent_under(&m, dec!(10));
        let confirmed = vec![confirmed_settlement(&a, &[dec!(1000)])];

        let result = ManagerSettlementSnapshot::build(
            m.user_id,
            &confirmed,
            m.company_commission_rate,
            Currency::IQD,
        );
        assert!(matches!(result, Err(SettlementError::InvalidAmount(_))));
    }

    #[test]
    fn test_admin_only_confirmation_credits_manager() {
        let mut m = manager(dec!(40));
        let a = agent_under(&m, dec!(10));
        let confirmed = vec![confirmed_settlement(&a, &[dec!(100000)])];
        let snapshot = ManagerSettlementSnapshot::build(
            m.user_id,
            &confirmed,
            m.company_commission_rate,
            Currency::IQD,
        )
        .unwrap();
        let mut s = ManagerFinancialSettlement::create(&m, snapshot, None, true).unwrap();
        assert_eq!(s.status, SettlementStatus::PendingAdmin);

        let owner = Actor::new(m.user_id, Role::GovernorateManager);
        assert!(matches!(
            s.confirm(&owner, Utc::now()),
            Err(SettlementError::NotOwner(_))
        ));

        let admin = Actor::new(UserId::new(), Role::Admin);
        let confirmation = s.confirm(&admin, Utc::now()).unwrap();
        confirmation.apply(&mut m).unwrap();

        assert_eq!(m.lifetime_earnings.amount(), dec!(50000));
        assert_eq!(s.status, SettlementStatus::Confirmed);
    }

    #[test]
    fn test_second_open_manager_settlement_blocked() {
        let m = manager(dec!(40));
        let a = agent_under(&m, dec!(10));
        let confirmed = vec![confirmed_settlement(&a, &[dec!(1000)])];
        let snapshot = ManagerSettlementSnapshot::build(
            m.user_id,
            &confirmed,
            m.company_commission_rate,
            Currency::IQD,
        )
        .unwrap();
        let first = ManagerFinancialSettlement::create(&m, snapshot.clone(), None, true).unwrap();

        let result = ManagerFinancialSettlement::create(&m, snapshot, Some(first.id), true);
        assert!(matches!(result, Err(SettlementError::OpenSettlementExists { .. })));
    }
}

mod trial_balance {
    use super::*;

    #[test]
    fn test_postings_from_confirmed_settlements() {
        let m = manager(dec!(40));
        let a = agent_under(&m, dec!(10));
        let agent_settlements = vec![
            confirmed_settlement(&a, &[dec!(100000)]),
            pending_settlement(&a, &[dec!(999999)]),
        ];
        let snapshot = ManagerSettlementSnapshot::build(
            m.user_id,
            &agent_settlements[..1],
            m.company_commission_rate,
            Currency::IQD,
        )
        .unwrap();
        let mut ms = ManagerFinancialSettlement::create(&m, snapshot, None, true).unwrap();
        ms.confirm(&Actor::new(UserId::new(), Role::Admin), Utc::now())
            .unwrap();

        let ledger = Ledger::from_confirmed(&agent_settlements, &[ms], Currency::IQD).unwrap();
        let tb = ledger.trial_balance();

        assert!(tb.is_balanced);
        assert_eq!(ledger.entries().len(), 3);
        // 100000 in, 10000 commissions out, 50000 manager share out
        assert_eq!(ledger.balance(LedgerAccount::Cash).amount(), dec!(40000));
        assert_eq!(
            ledger.balance(LedgerAccount::SubscriptionRevenue).amount(),
            dec!(100000)
        );
        assert_eq!(
            ledger.balance(LedgerAccount::ManagerShareExpense).amount(),
            dec!(50000)
        );
    }

    #[test]
    fn test_empty_ledger_is_balanced() {
        let tb = Ledger::from_confirmed(&[], &[], Currency::IQD)
            .unwrap()
            .trial_balance();
        assert!(tb.is_balanced);
        assert!(tb.entries.is_empty());
    }
}

mod properties {
    use super::*;

    proptest! {
        #[test]
        fn prop_revenue_split_sums_to_total(
            amounts in prop::collection::vec(1_000i64..5_000_000, 1..6),
            agent_rate in 0i64..=20,
            company_rate in 0i64..=60,
        ) {
            let m = manager(Decimal::from(company_rate));
            let a = agent_under(&m, Decimal::from(agent_rate));
            let amounts: Vec<Decimal> = amounts.into_iter().map(Decimal::from).collect();
            let confirmed = vec![confirmed_settlement(&a, &amounts)];

            let snapshot = ManagerSettlementSnapshot::build(
                m.user_id,
                &confirmed,
                m.company_commission_rate,
                Currency::IQD,
            ).unwrap();

            let sum = snapshot.company_share_amount.amount()
                + snapshot.manager_share_amount.amount()
                + snapshot.total_agent_commissions.amount();
            prop_assert_eq!(sum, snapshot.total_revenue.amount());
        }

        #[test]
        fn prop_trial_balance_always_balanced(
            batches in prop::collection::vec(prop::collection::vec(1_000i64..2_000_000, 1..4), 0..5),
            agent_rate in 0i64..=20,
        ) {
            let m = manager(dec!(30));
            let a = agent_under(&m, Decimal::from(agent_rate));
            let settlements: Vec<_> = batches
                .into_iter()
                .map(|b| {
                    let amounts: Vec<Decimal> = b.into_iter().map(Decimal::from).collect();
                    confirmed_settlement(&a, &amounts)
                })
                .collect();

            let tb = Ledger::from_confirmed(&settlements, &[], Currency::IQD)
                .unwrap()
                .trial_balance();
            prop_assert!(tb.is_balanced);
        }
    }
}
