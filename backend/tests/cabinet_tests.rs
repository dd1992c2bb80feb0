//! Cabinet registry tests
//!
//! Tests for cabinet registration including:
//! - Code generation from prefix, department and sequence
//! - Stock id sequencing
//! - Input validation

use std::collections::HashSet;

use proptest::prelude::*;
use shared::{
    generate_cabinet_code, next_free_cabinet_code, next_stock_sequence, normalize_optional,
    validate_note, Department, MAX_NOTE_LENGTH, MAX_STOCK_ID,
};

fn department(ref_code: Option<&str>) -> Department {
    Department {
        id: 1,
        name: "Intensive Care".to_string(),
        ref_code: ref_code.map(str::to_string),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Department code is normalized before it becomes a code segment
    #[test]
    fn test_department_segment() {
        assert_eq!(department(Some(" icu ")).code_segment().as_deref(), Some("ICU"));
        assert_eq!(department(Some("   ")).code_segment(), None);
        assert_eq!(department(None).code_segment(), None);
    }

    /// Code for a cabinet registered straight into a department
    #[test]
    fn test_code_for_department_cabinet() {
        let segment = department(Some("er")).code_segment();
        let code = generate_cabinet_code("HOSP", segment.as_deref(), next_stock_sequence(Some(6)).unwrap(), 4);
        assert_eq!(code, "HOSP-ER-0007");
    }

    /// First cabinet starts the sequence at one
    #[test]
    fn test_first_cabinet_sequence() {
        assert_eq!(generate_cabinet_code("HOSP", None, next_stock_sequence(None).unwrap(), 4), "HOSP-0001");
    }

    /// Notes are trimmed to nothing when blank and bounded in length
    #[test]
    fn test_note_handling() {
        assert_eq!(normalize_optional(Some("  ".to_string())), None);
        assert_eq!(normalize_optional(Some(" spare ".to_string())).as_deref(), Some("spare"));
        assert!(validate_note(Some("ok")).is_ok());
        assert!(validate_note(Some(&"x".repeat(MAX_NOTE_LENGTH + 1))).is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The trailing segment always parses back to the sequence
        #[test]
        fn prop_code_ends_with_sequence(
            prefix in "[A-Z]{2,6}",
            dept in proptest::option::of("[A-Z]{2,4}"),
            sequence in 1i64..1_000_000,
            width in 1usize..8,
        ) {
            let code = generate_cabinet_code(&prefix, dept.as_deref(), sequence, width);
            let tail = code.rsplit('-').next().unwrap();
            prop_assert!(tail.len() >= width);
            prop_assert_eq!(tail.parse::<i64>().unwrap(), sequence);
            prop_assert!(code.starts_with(&prefix));
        }

        /// Distinct sequences give distinct codes
        #[test]
        fn prop_codes_unique_per_sequence(a in 1i64..10_000, b in 1i64..10_000) {
            prop_assume!(a != b);
            prop_assert_ne!(
                generate_cabinet_code("HOSP", Some("ICU"), a, 4),
                generate_cabinet_code("HOSP", Some("ICU"), b, 4)
            );
        }

        /// Sequences strictly increase
        #[test]
        fn prop_next_sequence_increases(max in 0i64..MAX_STOCK_ID) {
            prop_assert!(next_stock_sequence(Some(max)).unwrap() > max);
        }

        /// Sequences past the upper bound are refused, never wrapped
        #[test]
        fn prop_next_sequence_bounded(max in MAX_STOCK_ID..=i64::MAX) {
            prop_assert!(next_stock_sequence(Some(max)).is_err());
        }

        /// A free code is never one already taken, and never before `start`
        #[test]
        fn prop_free_code_avoids_taken(start in 1i64..50, taken in proptest::collection::hash_set(1i64..60, 0..20)) {
            let codes: HashSet<String> = taken
                .iter()
                .map(|seq| generate_cabinet_code("HOSP", None, *seq, 4))
                .collect();
            let (sequence, code) = next_free_cabinet_code("HOSP", None, start, 4, &codes).unwrap();
            prop_assert!(sequence >= start);
            prop_assert!(!codes.contains(&code));
            prop_assert_eq!(code, generate_cabinet_code("HOSP", None, sequence, 4));
        }
    }
}
