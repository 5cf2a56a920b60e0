use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, Row};

use washline_core::domain::area::{ServiceArea, ServiceAreaId};
use washline_core::domain::conversation::TenantId;
use washline_core::domain::service::{
    AvailabilitySlot, ServiceId, ServiceOffering, ServiceType, SlotId,
};

use super::{parse_date, parse_uuid, CatalogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SERVICE_COLUMNS: &str = "id, tenant_id, service_type, service_name, base_price, \
     price_per_load, turnaround_hours, is_active";

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn list_services(
        &self,
        tenant_id: &TenantId,
        service_type: Option<ServiceType>,
    ) -> Result<Vec<ServiceOffering>, RepositoryError> {
        let rows = if let Some(service_type) = service_type {
            sqlx::query(&format!(
                "SELECT {SERVICE_COLUMNS} FROM services
                 WHERE tenant_id = ? AND is_active = 1 AND service_type = ?
                 ORDER BY base_price ASC"
            ))
            .bind(&tenant_id.0)
            .bind(service_type.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {SERVICE_COLUMNS} FROM services
                 WHERE tenant_id = ? AND is_active = 1
                 ORDER BY base_price ASC"
            ))
            .bind(&tenant_id.0)
            .fetch_all(&self.pool)
            .await?
        };

        rows.into_iter().map(service_from_row).collect()
    }

    async fn find_service(
        &self,
        tenant_id: &TenantId,
        service_type: ServiceType,
    ) -> Result<Option<ServiceOffering>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services
             WHERE tenant_id = ? AND service_type = ? AND is_active = 1"
        ))
        .bind(&tenant_id.0)
        .bind(service_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(service_from_row).transpose()
    }

    async fn find_service_by_id(
        &self,
        id: &ServiceId,
    ) -> Result<Option<ServiceOffering>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?"))
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(service_from_row).transpose()
    }

    async fn list_areas(&self, tenant_id: &TenantId) -> Result<Vec<ServiceArea>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, postal_code_prefix, city, province, is_active
             FROM service_areas
             WHERE tenant_id = ? AND is_active = 1
             ORDER BY postal_code_prefix ASC",
        )
        .bind(&tenant_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(area_from_row).collect()
    }

    async fn list_slots(
        &self,
        tenant_id: &TenantId,
        slot_date: NaiveDate,
    ) -> Result<Vec<AvailabilitySlot>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, slot_date, slot_time, is_available
             FROM availability_slots
             WHERE tenant_id = ? AND slot_date = ? AND is_available = 1
             ORDER BY slot_time ASC",
        )
        .bind(&tenant_id.0)
        .bind(slot_date.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(slot_from_row).collect()
    }
}

fn service_from_row(row: SqliteRow) -> Result<ServiceOffering, RepositoryError> {
    let service_type_raw: String = row.get("service_type");
    let service_type = ServiceType::parse(&service_type_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("invalid service type `{service_type_raw}`"))
    })?;

    Ok(ServiceOffering {
        id: ServiceId(parse_uuid(&row.get::<String, _>("id"))?),
        tenant_id: TenantId(row.get("tenant_id")),
        service_type,
        service_name: row.get("service_name"),
        base_price: row.get("base_price"),
        price_per_load: row.get("price_per_load"),
        turnaround_hours: row.get("turnaround_hours"),
        active: row.get::<i64, _>("is_active") != 0,
    })
}

fn area_from_row(row: SqliteRow) -> Result<ServiceArea, RepositoryError> {
    Ok(ServiceArea {
        id: ServiceAreaId(parse_uuid(&row.get::<String, _>("id"))?),
        tenant_id: TenantId(row.get("tenant_id")),
        postal_code_prefix: row.get("postal_code_prefix"),
        city: row.get("city"),
        province: row.get("province"),
        active: row.get::<i64, _>("is_active") != 0,
    })
}

fn slot_from_row(row: SqliteRow) -> Result<AvailabilitySlot, RepositoryError> {
    Ok(AvailabilitySlot {
        id: SlotId(parse_uuid(&row.get::<String, _>("id"))?),
        tenant_id: TenantId(row.get("tenant_id")),
        slot_date: parse_date(&row.get::<String, _>("slot_date"))?,
        slot_time: row.get("slot_time"),
        available: row.get::<i64, _>("is_available") != 0,
    })
}
