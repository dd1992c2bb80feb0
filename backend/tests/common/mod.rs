//! Fixtures shared by the database-backed service tests
#![allow(dead_code)]

use chrono::{NaiveDate, TimeZone, Utc};
use medsupply_backend::config::CabinetConfig;
use medsupply_backend::error::AppError;
use medsupply_backend::services::cabinet::CreateCabinetInput;
use medsupply_backend::services::ledger::RecordDispensedInput;
use medsupply_backend::services::{CabinetService, LedgerService};
use shared::{Cabinet, DomainError, Encounter, NewSupplyLine, StockState, SupplyUsageItem};
use sqlx::PgPool;
use uuid::Uuid;

pub fn cabinet_service(pool: &PgPool) -> CabinetService {
    CabinetService::new(
        pool.clone(),
        CabinetConfig {
            hospital_prefix: "HOSP".to_string(),
            sequence_width: 4,
        },
    )
}

/// Create an unassigned cabinet with a generated code and stock id
pub async fn new_cabinet(pool: &PgPool) -> Cabinet {
    cabinet_service(pool)
        .create_cabinet(CreateCabinetInput::default())
        .await
        .unwrap()
}

pub async fn seed_department(pool: &PgPool, id: i64, name: &str, ref_code: Option<&str>) {
    sqlx::query("INSERT INTO departments (id, name, ref_code) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(ref_code)
        .execute(pool)
        .await
        .unwrap();
}

/// Insert physical stock rows into a cabinet, returning their ids in order
pub async fn seed_stock_units(pool: &PgPool, stock_id: i64, states: &[StockState]) -> Vec<i64> {
    let mut ids = Vec::with_capacity(states.len());
    for (i, state) in states.iter().enumerate() {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO stock_units (stock_id, item_code, state) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(stock_id)
        .bind(format!("ITEM-{}", i))
        .bind(state.as_str())
        .fetch_one(pool)
        .await
        .unwrap();
        ids.push(id);
    }
    ids
}

pub async fn unit_state(pool: &PgPool, id: i64) -> StockState {
    let state = sqlx::query_scalar::<_, String>("SELECT state FROM stock_units WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap();
    StockState::parse(&state).unwrap()
}

pub async fn mapping_count(pool: &PgPool, cabinet_id: Uuid) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM cabinet_department_mappings WHERE cabinet_id = $1",
    )
    .bind(cabinet_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

pub fn encounter() -> Encounter {
    Encounter {
        patient_id: "HN-0001".to_string(),
        episode_id: "EN-0001".to_string(),
        department_code: "ICU".to_string(),
        encounter_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap(),
    }
}

pub fn supply_line(code: &str, qty: i32) -> NewSupplyLine {
    NewSupplyLine {
        item_code: code.to_string(),
        item_description: None,
        requested_accession: None,
        qty,
    }
}

/// Dispense lines under a fresh usage id
pub async fn dispense(pool: &PgPool, print_date: NaiveDate, lines: Vec<NewSupplyLine>) -> Vec<SupplyUsageItem> {
    LedgerService::new(pool.clone())
        .record_dispensed_items(RecordDispensedInput {
            usage_id: None,
            encounter: encounter(),
            print_date,
            items: lines,
        })
        .await
        .unwrap()
}

/// Unwrap a rule violation, failing on infrastructure errors
pub fn domain_error(err: AppError) -> DomainError {
    match err {
        AppError::Domain(err) => err,
        other => panic!("expected a rule violation, got {:?}", other),
    }
}
