//! Unit tests for the Temporal module
//!
//! Tests cover DateRange construction, ordering rules, and formatting.

use chrono::NaiveDate;
use core_kernel::temporal::{DateRange, TemporalError};
use proptest::prelude::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

mod construction {
    use super::*;

    #[test]
    fn test_ordered_range() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 12, 31)).unwrap();
        assert_eq!(range.start(), date(2024, 1, 1));
        assert_eq!(range.end(), date(2024, 12, 31));
    }

    #[test]
    fn test_reversed_range_fails() {
        let result = DateRange::new(date(2024, 12, 31), date(2024, 1, 1));
        assert!(matches!(result, Err(TemporalError::InvalidRange { .. })));
    }

    #[test]
    fn test_error_message_names_both_dates() {
        let err = DateRange::new(date(2024, 5, 2), date(2024, 5, 1)).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("2024-05-02"));
        assert!(message.contains("2024-05-01"));
    }
}

proptest! {
    #[test]
    fn prop_construction_matches_ordering(a in 0i64..20_000, b in 0i64..20_000) {
        let base = date(1990, 1, 1);
        let start = base + chrono::Duration::days(a);
        let end = base + chrono::Duration::days(b);
        let result = DateRange::new(start, end);
        prop_assert_eq!(result.is_ok(), start <= end);
        if let Ok(range) = result {
            prop_assert_eq!((range.start(), range.end()), (start, end));
        }
    }
}
