//! Unit tests for the Identifiers module
//!
//! Tests cover creation, parsing, conversion, and display formatting
//! of the aggregate and catalogue identifiers.

use core_kernel::{
    ClientId, DepositId, CreditProgramId, CurrencyId,
    ClerkId, StorekeeperId, PeriodId,
};
use std::collections::HashSet;
use uuid::Uuid;

mod client_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let id1 = ClientId::new();
        let id2 = ClientId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = ClientId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = ClientId::new_v7();
        let uuid1: Uuid = id1.into();
        let uuid2: Uuid = id2.into();
        assert!(uuid1 < uuid2);
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = ClientId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_display_format() {
        let id = ClientId::new();
        assert!(id.to_string().starts_with("CLI-"));
    }

    #[test]
    fn test_from_str_with_prefix() {
        let original = ClientId::new();
        let parsed: ClientId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_from_str_without_prefix() {
        let uuid = Uuid::new_v4();
        let parsed: ClientId = uuid.to_string().parse().unwrap();
        assert_eq!(*parsed.as_uuid(), uuid);
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("CLI-not-a-uuid".parse::<ClientId>().is_err());
        assert!("+7 900 000 00 00".parse::<ClientId>().is_err());
    }

    #[test]
    fn test_json_is_transparent() {
        let uuid = Uuid::new_v4();
        let id = ClientId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
        let back: ClientId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}

mod nil_tests {
    use super::*;

    #[test]
    fn test_nil_detection() {
        assert!(DepositId::from_uuid(Uuid::nil()).is_nil());
        assert!(!DepositId::new().is_nil());
    }
}

mod prefix_tests {
    use super::*;

    #[test]
    fn test_all_prefixes_are_distinct() {
        let prefixes = [
            ClientId::prefix(),
            DepositId::prefix(),
            CreditProgramId::prefix(),
            CurrencyId::prefix(),
            ClerkId::prefix(),
            StorekeeperId::prefix(),
            PeriodId::prefix(),
        ];
        let unique: HashSet<_> = prefixes.iter().collect();
        assert_eq!(unique.len(), prefixes.len());
    }

    #[test]
    fn test_ids_are_hashable_and_ordered_by_uuid() {
        let a = CurrencyId::from_uuid(Uuid::from_u128(1));
        let b = CurrencyId::from_uuid(Uuid::from_u128(2));
        assert!(a < b);

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(a);
        assert_eq!(set.len(), 1);
    }
}
