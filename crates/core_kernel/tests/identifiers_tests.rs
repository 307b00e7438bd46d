//! Identifier behaviour shared by every entity type

use core_kernel::{
    AgentSettlementId, BusinessPackageId, CollectionId, CommissionId,
    ManagerSettlementId, RenewalContactId, RenewalId, UserId,
};
use uuid::Uuid;

mod generation {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        assert_ne!(CollectionId::new(), CollectionId::new());
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = RenewalId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = RenewalId::new_v7();
        let uuid1: Uuid = id1.into();
        let uuid2: Uuid = id2.into();
        assert!(uuid1 < uuid2);
    }
}

mod formatting {
    use super::*;

    #[test]
    fn test_prefixes() {
        assert_eq!(UserId::prefix(), "USR");
        assert_eq!(BusinessPackageId::prefix(), "BPK");
        assert_eq!(CommissionId::prefix(), "CMS");
        assert_eq!(AgentSettlementId::prefix(), "AST");
        assert_eq!(ManagerSettlementId::prefix(), "MST");
        assert_eq!(RenewalContactId::prefix(), "RNC");
    }

    #[test]
    fn test_display_and_parse() {
        let original = ManagerSettlementId::new();
        let string = original.to_string();
        assert!(string.starts_with("MST-"));

        let parsed: ManagerSettlementId = string.parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("MST-not-a-uuid".parse::<ManagerSettlementId>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let uuid = Uuid::new_v4();
        let id = UserId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
    }
}
