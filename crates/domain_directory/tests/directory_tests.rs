//! Directory domain tests

use rust_decimal_macros::dec;

use core_kernel::{Currency, GovernorateId, Money, Rate, UserId};
use domain_directory::{Actor, AgentProfile, Governorate, ManagerProfile, Role};

mod roles {
    use super::*;

    #[test]
    fn test_role_parse_and_display_agree() {
        for role in [
            Role::Admin,
            Role::Supervisor,
            Role::Agent,
            Role::GovernorateManager,
            Role::Accountant,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_unknown_role() {
        assert!("OWNER".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_matches_token_format() {
        let json = serde_json::to_string(&Role::GovernorateManager).unwrap();
        assert_eq!(json, "\"GOVERNORATE_MANAGER\"");
    }

    #[test]
    fn test_back_office() {
        assert!(Actor::new(UserId::new(), Role::Admin).is_back_office());
        assert!(Actor::new(UserId::new(), Role::Supervisor).is_back_office());
        assert!(!Actor::new(UserId::new(), Role::Agent).is_back_office());
        assert!(!Actor::new(UserId::new(), Role::Accountant).is_back_office());
    }
}

mod profiles {
    use super::*;

    fn agent(rate: rust_decimal::Decimal) -> AgentProfile {
        AgentProfile {
            user_id: UserId::new(),
            full_name: "Ali Hassan".to_string(),
            governorate_id: GovernorateId::new(),
            manager_id: Some(UserId::new()),
            commission_rate: Rate::from_percentage(rate),
            lifetime_earnings: Money::zero(Currency::IQD),
        }
    }

    #[test]
    fn test_credit_earnings_accumulates() {
        let mut a = agent(dec!(10));
        a.credit_earnings(&Money::new(dec!(5000), Currency::IQD)).unwrap();
        a.credit_earnings(&Money::new(dec!(2500), Currency::IQD)).unwrap();
        assert_eq!(a.lifetime_earnings.amount(), dec!(7500));
    }

    #[test]
    fn test_credit_earnings_rejects_other_currency() {
        let mut m = ManagerProfile {
            user_id: UserId::new(),
            full_name: "Sara Karim".to_string(),
            governorate_id: GovernorateId::new(),
            company_commission_rate: Rate::from_percentage(dec!(40)),
            lifetime_earnings: Money::zero(Currency::IQD),
        };
        assert!(m.credit_earnings(&Money::new(dec!(1), Currency::USD)).is_err());
        assert!(m.lifetime_earnings.is_zero());
    }

    #[test]
    fn test_governorate_code_uppercased() {
        let g = Governorate::new("Basra", "bsr");
        assert_eq!(g.code, "BSR");
    }
}
