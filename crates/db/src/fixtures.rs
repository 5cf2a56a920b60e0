//! Deterministic demo-tenant seed used by the operator CLI and tests.
//!
//! Seeds the built-in catalog literals as real tenant rows: the three service
//! tiers, the four default service areas, and pickup slots for two fixed demo
//! dates. Seeding is skipped entirely when the tenant already has services.

use chrono::NaiveDate;
use uuid::Uuid;

use washline_core::catalog::{default_service_descriptors, default_slot_descriptors, DEFAULT_AREAS};
use washline_core::domain::conversation::TenantId;

use crate::repositories::RepositoryError;
use crate::DbPool;

pub const DEMO_SLOT_DATES: &[&str] = &["2025-06-02", "2025-06-03"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub already_seeded: bool,
    pub services_inserted: u32,
    pub areas_inserted: u32,
    pub slots_inserted: u32,
}

pub async fn seed_demo_tenant(
    pool: &DbPool,
    tenant_id: &TenantId,
) -> Result<SeedResult, RepositoryError> {
    let existing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM services WHERE tenant_id = ?")
            .bind(&tenant_id.0)
            .fetch_one(pool)
            .await?;
    if existing > 0 {
        return Ok(SeedResult { already_seeded: true, ..SeedResult::default() });
    }

    let mut result = SeedResult::default();

    for descriptor in default_service_descriptors() {
        sqlx::query(
            "INSERT INTO services (
                id, tenant_id, service_type, service_name, base_price,
                price_per_load, turnaround_hours, is_active
             ) VALUES (?, ?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&tenant_id.0)
        .bind(descriptor.service_type.as_str())
        .bind(&descriptor.service_name)
        .bind(descriptor.base_price)
        .bind(descriptor.price_per_load)
        .bind(descriptor.turnaround_hours)
        .execute(pool)
        .await?;
        result.services_inserted += 1;
    }

    for area in DEFAULT_AREAS {
        sqlx::query(
            "INSERT INTO service_areas (id, tenant_id, postal_code_prefix, city, province, is_active)
             VALUES (?, ?, ?, ?, ?, 1)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&tenant_id.0)
        .bind(area.prefix)
        .bind(area.city)
        .bind(area.province)
        .execute(pool)
        .await?;
        result.areas_inserted += 1;
    }

    for date in DEMO_SLOT_DATES {
        let slot_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|error| RepositoryError::Decode(format!("invalid demo date `{date}`: {error}")))?;
        for slot in default_slot_descriptors() {
            sqlx::query(
                "INSERT INTO availability_slots (id, tenant_id, slot_date, slot_time, is_available)
                 VALUES (?, ?, ?, ?, 1)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&tenant_id.0)
            .bind(slot_date.format("%Y-%m-%d").to_string())
            .bind(&slot.time)
            .execute(pool)
            .await?;
            result.slots_inserted += 1;
        }
    }

    Ok(result)
}
