use sqlx::{sqlite::SqliteRow, Row};

use washline_core::domain::booking::{
    Appointment, AppointmentId, AppointmentStatus, PaymentStatus,
};
use washline_core::domain::conversation::TenantId;
use washline_core::domain::customer::CustomerId;
use washline_core::domain::service::ServiceId;

use super::{parse_timestamp, parse_uuid, AppointmentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAppointmentRepository {
    pool: DbPool,
}

impl SqlAppointmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AppointmentRepository for SqlAppointmentRepository {
    async fn find_by_id(&self, id: &AppointmentId) -> Result<Option<Appointment>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                tenant_id,
                customer_id,
                service_id,
                scheduled_at,
                number_of_loads,
                pickup_address,
                payment_amount,
                payment_status,
                status,
                created_at,
                updated_at
             FROM appointments
             WHERE id = ?",
        )
        .bind(id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(appointment_from_row).transpose()
    }

    async fn save(&self, appointment: &Appointment) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO appointments (
                id,
                tenant_id,
                customer_id,
                service_id,
                scheduled_at,
                number_of_loads,
                pickup_address,
                payment_amount,
                payment_status,
                status,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                scheduled_at = excluded.scheduled_at,
                number_of_loads = excluded.number_of_loads,
                pickup_address = excluded.pickup_address,
                payment_amount = excluded.payment_amount,
                payment_status = excluded.payment_status,
                status = excluded.status,
                updated_at = excluded.updated_at",
        )
        .bind(appointment.id.0.to_string())
        .bind(&appointment.tenant_id.0)
        .bind(appointment.customer_id.0.to_string())
        .bind(appointment.service_id.0.to_string())
        .bind(appointment.scheduled_at.to_rfc3339())
        .bind(i64::from(appointment.number_of_loads))
        .bind(&appointment.pickup_address)
        .bind(appointment.payment_amount)
        .bind(appointment.payment_status.as_str())
        .bind(appointment.status.as_str())
        .bind(appointment.created_at.to_rfc3339())
        .bind(appointment.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn appointment_from_row(row: SqliteRow) -> Result<Appointment, RepositoryError> {
    let payment_status_raw: String = row.get("payment_status");
    let payment_status = PaymentStatus::parse(&payment_status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("invalid payment status `{payment_status_raw}`"))
    })?;

    let status_raw: String = row.get("status");
    let status = AppointmentStatus::parse(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("invalid appointment status `{status_raw}`"))
    })?;

    let loads: i64 = row.get("number_of_loads");
    let number_of_loads = u32::try_from(loads).map_err(|_| {
        RepositoryError::Decode(format!("invalid number_of_loads `{loads}`"))
    })?;

    Ok(Appointment {
        id: AppointmentId(parse_uuid(&row.get::<String, _>("id"))?),
        tenant_id: TenantId(row.get("tenant_id")),
        customer_id: CustomerId(parse_uuid(&row.get::<String, _>("customer_id"))?),
        service_id: ServiceId(parse_uuid(&row.get::<String, _>("service_id"))?),
        scheduled_at: parse_timestamp(&row.get::<String, _>("scheduled_at"))?,
        number_of_loads,
        pickup_address: row.get("pickup_address"),
        payment_amount: row.get("payment_amount"),
        payment_status,
        status,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}
