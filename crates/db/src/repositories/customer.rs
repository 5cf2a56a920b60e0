use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use washline_core::domain::conversation::TenantId;
use washline_core::domain::customer::{Customer, CustomerId};

use super::{parse_timestamp, parse_uuid, CustomerRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn find_by_phone(
        &self,
        tenant_id: &TenantId,
        phone: &str,
    ) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                tenant_id,
                phone,
                name,
                email,
                address,
                postal_code,
                total_bookings,
                created_at,
                updated_at
             FROM customers
             WHERE tenant_id = ? AND phone = ?",
        )
        .bind(&tenant_id.0)
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        row.map(customer_from_row).transpose()
    }

    async fn insert(&self, customer: &Customer) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO customers (
                id,
                tenant_id,
                phone,
                name,
                email,
                address,
                postal_code,
                total_bookings,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(customer.id.0.to_string())
        .bind(&customer.tenant_id.0)
        .bind(&customer.phone)
        .bind(&customer.name)
        .bind(customer.email.as_deref())
        .bind(customer.address.as_deref())
        .bind(customer.postal_code.as_deref())
        .bind(customer.total_bookings)
        .bind(customer.created_at.to_rfc3339())
        .bind(customer.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_address(
        &self,
        id: &CustomerId,
        address: &str,
        postal_code: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE customers SET address = ?, postal_code = ?, updated_at = ? WHERE id = ?",
        )
        .bind(address)
        .bind(postal_code)
        .bind(Utc::now().to_rfc3339())
        .bind(id.0.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn increment_bookings(&self, id: &CustomerId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE customers SET total_bookings = total_bookings + 1, updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.0.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn customer_from_row(row: SqliteRow) -> Result<Customer, RepositoryError> {
    Ok(Customer {
        id: CustomerId(parse_uuid(&row.get::<String, _>("id"))?),
        tenant_id: TenantId(row.get("tenant_id")),
        phone: row.get("phone"),
        name: row.get("name"),
        email: row.get("email"),
        address: row.get("address"),
        postal_code: row.get("postal_code"),
        total_bookings: row.get("total_bookings"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}
