//! Assignment service tests
//!
//! Runs `AssignmentService` against a migrated database:
//! - Create, reject and swap scenario
//! - Concurrent assignment of one cabinet
//! - Listing with stock counts

mod common;

use common::*;
use medsupply_backend::services::assignment::{CreateMappingInput, UpdateMappingInput};
use medsupply_backend::services::AssignmentService;
use shared::{CabinetStatus, DomainError, MappingFilter, MappingStatus, StockState};
use sqlx::PgPool;
use uuid::Uuid;

fn assign(cabinet_id: Uuid, department_id: i64) -> CreateMappingInput {
    CreateMappingInput {
        cabinet_id,
        department_id,
        status: None,
        note: None,
    }
}

async fn status_of(pool: &PgPool, cabinet_id: Uuid) -> CabinetStatus {
    cabinet_service(pool).get_cabinet(cabinet_id).await.unwrap().status
}

#[sqlx::test(migrations = "./migrations")]
async fn test_assign_reject_and_swap(pool: PgPool) {
    seed_department(&pool, 1, "Ward 1", None).await;
    seed_department(&pool, 2, "Ward 2", None).await;
    let service = AssignmentService::new(pool.clone());
    let c = new_cabinet(&pool).await;
    let d = new_cabinet(&pool).await;
    assert_eq!(c.status, CabinetStatus::Available);

    let mapping = service.create_mapping(assign(c.id, 1)).await.unwrap();
    assert_eq!(mapping.status, MappingStatus::Active);
    assert_eq!(status_of(&pool, c.id).await, CabinetStatus::Used);

    let err = service.create_mapping(assign(c.id, 2)).await.unwrap_err();
    assert_eq!(domain_error(err), DomainError::CabinetAlreadyUsed);

    let moved = service
        .update_mapping(
            mapping.id,
            UpdateMappingInput {
                cabinet_id: d.id,
                department_id: 1,
                status: None,
                note: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.cabinet_id, d.id);
    assert_eq!(status_of(&pool, c.id).await, CabinetStatus::Available);
    assert_eq!(status_of(&pool, d.id).await, CabinetStatus::Used);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_swap_onto_used_cabinet_changes_nothing(pool: PgPool) {
    seed_department(&pool, 1, "Ward 1", None).await;
    let service = AssignmentService::new(pool.clone());
    let a = new_cabinet(&pool).await;
    let b = new_cabinet(&pool).await;
    let first = service.create_mapping(assign(a.id, 1)).await.unwrap();
    service.create_mapping(assign(b.id, 1)).await.unwrap();

    let err = service
        .update_mapping(
            first.id,
            UpdateMappingInput {
                cabinet_id: b.id,
                department_id: 1,
                status: Some(MappingStatus::Inactive),
                note: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(domain_error(err), DomainError::CabinetAlreadyUsed);

    let current = service.get_mapping(first.id).await.unwrap();
    assert_eq!(current.mapping.cabinet_id, a.id);
    assert_eq!(current.mapping.status, MappingStatus::Active);
    assert_eq!(status_of(&pool, a.id).await, CabinetStatus::Used);
    assert_eq!(status_of(&pool, b.id).await, CabinetStatus::Used);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_frees_cabinet(pool: PgPool) {
    seed_department(&pool, 1, "Ward 1", None).await;
    let service = AssignmentService::new(pool.clone());
    let cabinet = new_cabinet(&pool).await;
    let mapping = service.create_mapping(assign(cabinet.id, 1)).await.unwrap();

    service.delete_mapping(mapping.id).await.unwrap();
    assert_eq!(status_of(&pool, cabinet.id).await, CabinetStatus::Available);

    let err = service.delete_mapping(mapping.id).await.unwrap_err();
    assert_eq!(domain_error(err).code(), "NOT_FOUND");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_assignment_of_one_cabinet(pool: PgPool) {
    seed_department(&pool, 1, "Ward 1", None).await;
    seed_department(&pool, 2, "Ward 2", None).await;
    let cabinet = new_cabinet(&pool).await;
    let first = AssignmentService::new(pool.clone());
    let second = AssignmentService::new(pool.clone());

    let (a, b) = tokio::join!(
        first.create_mapping(assign(cabinet.id, 1)),
        second.create_mapping(assign(cabinet.id, 2)),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    assert_eq!(mapping_count(&pool, cabinet.id).await, 1);
    assert_eq!(status_of(&pool, cabinet.id).await, CabinetStatus::Used);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_swap_and_assign_to_same_target(pool: PgPool) {
    seed_department(&pool, 1, "Ward 1", None).await;
    let a = new_cabinet(&pool).await;
    let target = new_cabinet(&pool).await;
    let service = AssignmentService::new(pool.clone());
    let mapping = service.create_mapping(assign(a.id, 1)).await.unwrap();

    let other = service.clone();
    let (swap, create) = tokio::join!(
        service.update_mapping(
            mapping.id,
            UpdateMappingInput {
                cabinet_id: target.id,
                department_id: 1,
                status: None,
                note: None,
            },
        ),
        other.create_mapping(assign(target.id, 1)),
    );

    assert_eq!(swap.is_ok() as u8 + create.is_ok() as u8, 1);
    assert_eq!(mapping_count(&pool, target.id).await, 1);
    assert_eq!(status_of(&pool, target.id).await, CabinetStatus::Used);
    let a_status = status_of(&pool, a.id).await;
    assert_eq!(a_status == CabinetStatus::Used, mapping_count(&pool, a.id).await > 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_listing_counts_stock_and_is_stable(pool: PgPool) {
    seed_department(&pool, 1, "Intensive Care", Some("icu")).await;
    let service = AssignmentService::new(pool.clone());
    let cabinet = new_cabinet(&pool).await;
    let empty = new_cabinet(&pool).await;
    service.create_mapping(assign(cabinet.id, 1)).await.unwrap();
    service.create_mapping(assign(empty.id, 1)).await.unwrap();
    seed_stock_units(
        &pool,
        cabinet.stock_id,
        &[StockState::InCabinet, StockState::InCabinet, StockState::Dispensed, StockState::Returned],
    )
    .await;

    let first = service.list_mappings(MappingFilter::default()).await.unwrap();
    let second = service.list_mappings(MappingFilter::default()).await.unwrap();
    let ids: Vec<Uuid> = first.iter().map(|m| m.mapping.id).collect();
    assert_eq!(ids, second.iter().map(|m| m.mapping.id).collect::<Vec<_>>());

    let row = first.iter().find(|m| m.mapping.cabinet_id == cabinet.id).unwrap();
    assert_eq!(row.in_cabinet_count, 2);
    assert_eq!(row.dispensed_count, 1);
    assert_eq!(row.department_name, "Intensive Care");

    let filtered = service
        .list_mappings(MappingFilter {
            cabinet_id: Some(empty.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].in_cabinet_count, 0);
}
