//! Cabinet assignment tests
//!
//! Tests for cabinet-department mappings including:
//! - Cabinet status is USED iff a mapping references it
//! - No two mappings ever reference the same cabinet
//! - Cabinet swaps free the old cabinet and occupy the new one

use proptest::prelude::*;
use shared::{
    ensure_cabinet_free, CabinetStatus, DomainError, MappingFilter, MappingStatus,
    MappingUpdatePlan,
};
use std::collections::HashMap;
use uuid::Uuid;

/// In-memory board applying the same rules the assignment service applies
/// inside its transactions
#[derive(Debug, Default)]
struct Board {
    cabinets: HashMap<Uuid, CabinetStatus>,
    mappings: HashMap<Uuid, Uuid>,
}

impl Board {
    fn add_cabinet(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        self.cabinets.insert(id, CabinetStatus::Available);
        id
    }

    fn count(&self, cabinet: Uuid, excluding: Option<Uuid>) -> i64 {
        self.mappings
            .iter()
            .filter(|(id, c)| **c == cabinet && Some(**id) != excluding)
            .count() as i64
    }

    fn sync(&mut self, cabinet: Uuid) {
        let status = CabinetStatus::derive(self.count(cabinet, None));
        self.cabinets.insert(cabinet, status);
    }

    fn create(&mut self, cabinet: Uuid) -> Result<Uuid, DomainError> {
        if !self.cabinets.contains_key(&cabinet) {
            return Err(DomainError::not_found("Cabinet"));
        }
        ensure_cabinet_free(self.count(cabinet, None))?;
        let id = Uuid::new_v4();
        self.mappings.insert(id, cabinet);
        self.sync(cabinet);
        Ok(id)
    }

    fn update(&mut self, mapping: Uuid, target: Uuid) -> Result<MappingUpdatePlan, DomainError> {
        let current = *self
            .mappings
            .get(&mapping)
            .ok_or_else(|| DomainError::not_found("Mapping"))?;
        if !self.cabinets.contains_key(&target) {
            return Err(DomainError::not_found("Cabinet"));
        }
        let plan = MappingUpdatePlan::decide(current, target, self.count(target, Some(mapping)))?;
        self.mappings.insert(mapping, target);
        match plan {
            MappingUpdatePlan::SameCabinet { cabinet_id } => self.sync(cabinet_id),
            MappingUpdatePlan::Swap { from, to } => {
                self.sync(to);
                self.sync(from);
            }
        }
        Ok(plan)
    }

    fn delete(&mut self, mapping: Uuid) -> Result<(), DomainError> {
        let cabinet = self
            .mappings
            .remove(&mapping)
            .ok_or_else(|| DomainError::not_found("Mapping"))?;
        self.sync(cabinet);
        Ok(())
    }

    fn status(&self, cabinet: Uuid) -> CabinetStatus {
        self.cabinets[&cabinet]
    }

    fn assert_invariants(&self) {
        for (cabinet, status) in &self.cabinets {
            let count = self.count(*cabinet, None);
            assert!(count <= 1, "cabinet {} held by {} mappings", cabinet, count);
            assert_eq!(*status == CabinetStatus::Used, count > 0);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Create, reject, then swap a cabinet
    #[test]
    fn test_assignment_scenario() {
        let mut board = Board::default();
        let c = board.add_cabinet();
        let d = board.add_cabinet();
        assert_eq!(board.status(c), CabinetStatus::Available);

        let mapping = board.create(c).unwrap();
        assert_eq!(board.status(c), CabinetStatus::Used);

        assert_eq!(board.create(c), Err(DomainError::CabinetAlreadyUsed));
        assert_eq!(DomainError::CabinetAlreadyUsed.to_string(), "cabinet already used");

        let plan = board.update(mapping, d).unwrap();
        assert!(plan.is_swap());
        assert_eq!(board.status(c), CabinetStatus::Available);
        assert_eq!(board.status(d), CabinetStatus::Used);
        board.assert_invariants();
    }

    /// Swapping onto a cabinet held by another mapping is rejected without side effects
    #[test]
    fn test_swap_onto_used_cabinet_rejected() {
        let mut board = Board::default();
        let a = board.add_cabinet();
        let b = board.add_cabinet();
        let first = board.create(a).unwrap();
        board.create(b).unwrap();

        assert_eq!(board.update(first, b), Err(DomainError::CabinetAlreadyUsed));
        assert_eq!(board.mappings[&first], a);
        assert_eq!(board.status(a), CabinetStatus::Used);
        assert_eq!(board.status(b), CabinetStatus::Used);
    }

    /// Same-cabinet updates keep the cabinet used
    #[test]
    fn test_same_cabinet_update() {
        let mut board = Board::default();
        let a = board.add_cabinet();
        let mapping = board.create(a).unwrap();

        let plan = board.update(mapping, a).unwrap();
        assert_eq!(plan, MappingUpdatePlan::SameCabinet { cabinet_id: a });
        assert_eq!(board.status(a), CabinetStatus::Used);
    }

    /// Deleting the last mapping frees the cabinet
    #[test]
    fn test_delete_frees_cabinet() {
        let mut board = Board::default();
        let a = board.add_cabinet();
        let mapping = board.create(a).unwrap();
        board.delete(mapping).unwrap();
        assert_eq!(board.status(a), CabinetStatus::Available);
        assert!(board.delete(mapping).is_err());
        // Freed cabinet can be assigned again
        board.create(a).unwrap();
        assert_eq!(board.status(a), CabinetStatus::Used);
    }

    /// Missing references are reported as not found
    #[test]
    fn test_missing_references() {
        let mut board = Board::default();
        assert_eq!(
            board.create(Uuid::new_v4()),
            Err(DomainError::NotFound("Cabinet".to_string()))
        );
        assert_eq!(
            board.update(Uuid::new_v4(), Uuid::new_v4()),
            Err(DomainError::NotFound("Mapping".to_string()))
        );
    }

    /// Mapping status defaults to active and does not affect exclusivity
    #[test]
    fn test_mapping_status_default() {
        assert_eq!(MappingStatus::default(), MappingStatus::Active);
        assert_eq!(MappingStatus::parse("inactive").unwrap(), MappingStatus::Inactive);
    }

    /// Filters deserialize from query-string shaped JSON
    #[test]
    fn test_mapping_filter_deserialize() {
        let filter: MappingFilter =
            serde_json::from_str(r#"{"department_id": 4, "status": "active", "keyword": "icu"}"#)
                .unwrap();
        assert_eq!(filter.department_id, Some(4));
        assert_eq!(filter.status, Some(MappingStatus::Active));
        assert_eq!(filter.keyword_pattern().as_deref(), Some("%icu%"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    #[derive(Debug, Clone)]
    enum Op {
        Create(usize),
        Update(usize, usize),
        Delete(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..4).prop_map(Op::Create),
            (0usize..8, 0usize..4).prop_map(|(m, c)| Op::Update(m, c)),
            (0usize..8).prop_map(Op::Delete),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Status is derived from mapping presence and cabinets are never shared,
        /// whatever sequence of operations is applied
        #[test]
        fn prop_status_tracks_mappings(ops in prop::collection::vec(op_strategy(), 1..40)) {
            let mut board = Board::default();
            let cabinets: Vec<Uuid> = (0..4).map(|_| board.add_cabinet()).collect();
            let mut mappings: Vec<Uuid> = Vec::new();

            for op in ops {
                match op {
                    Op::Create(c) => {
                        if let Ok(id) = board.create(cabinets[c]) {
                            mappings.push(id);
                        }
                    }
                    Op::Update(m, c) => {
                        if let Some(id) = mappings.get(m).copied() {
                            let _ = board.update(id, cabinets[c]);
                        }
                    }
                    Op::Delete(m) => {
                        if m < mappings.len() {
                            let id = mappings.remove(m);
                            board.delete(id).unwrap();
                        }
                    }
                }
                board.assert_invariants();
            }
        }

        /// A successful swap never leaves both cabinets in the same state
        #[test]
        fn prop_swap_flips_both_cabinets(extra in 0usize..3) {
            let mut board = Board::default();
            let a = board.add_cabinet();
            let b = board.add_cabinet();
            for _ in 0..extra {
                let other = board.add_cabinet();
                board.create(other).unwrap();
            }
            let mapping = board.create(a).unwrap();
            board.update(mapping, b).unwrap();
            prop_assert_eq!(board.status(a), CabinetStatus::Available);
            prop_assert_eq!(board.status(b), CabinetStatus::Used);
        }

        /// Derived status depends only on whether the count is positive
        #[test]
        fn prop_derive_status(count in 0i64..1000) {
            let status = CabinetStatus::derive(count);
            prop_assert_eq!(status == CabinetStatus::Used, count > 0);
        }
    }
}
