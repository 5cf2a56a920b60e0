use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use washline_core::domain::booking::{Appointment, AppointmentId};
use washline_core::domain::conversation::{
    BookingOutcome, ConversationId, ConversationState, ConversationThread, DeliveryStatus, Message,
    TenantId,
};
use washline_core::domain::customer::{Customer, CustomerId};
use washline_core::domain::area::ServiceArea;
use washline_core::domain::service::{AvailabilitySlot, ServiceId, ServiceOffering, ServiceType};

pub mod appointment;
pub mod catalog;
pub mod conversation;
pub mod customer;
pub mod memory;

pub use appointment::SqlAppointmentRepository;
pub use catalog::SqlCatalogRepository;
pub use conversation::SqlConversationRepository;
pub use customer::SqlCustomerRepository;
pub use memory::{
    InMemoryAppointmentRepository, InMemoryCatalogRepository, InMemoryConversationRepository,
    InMemoryCustomerRepository,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Conversation threads plus their ordered message log and mutable
/// state/outcome/delivery fields.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_open(
        &self,
        tenant_id: &TenantId,
        customer_phone: &str,
    ) -> Result<Option<ConversationThread>, RepositoryError>;

    async fn insert(&self, thread: &ConversationThread) -> Result<(), RepositoryError>;

    async fn append_message(&self, message: &Message) -> Result<(), RepositoryError>;

    /// Messages in conversation order (creation order), oldest first.
    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, RepositoryError>;

    async fn touch_activity(
        &self,
        conversation_id: &ConversationId,
        message_count: i64,
        last_message_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn update_state(
        &self,
        conversation_id: &ConversationId,
        state: ConversationState,
    ) -> Result<(), RepositoryError>;

    async fn record_outcome(
        &self,
        conversation_id: &ConversationId,
        outcome: BookingOutcome,
    ) -> Result<(), RepositoryError>;

    async fn update_delivery_status(
        &self,
        provider_sid: &str,
        status: DeliveryStatus,
        error_code: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_phone(
        &self,
        tenant_id: &TenantId,
        phone: &str,
    ) -> Result<Option<Customer>, RepositoryError>;

    async fn insert(&self, customer: &Customer) -> Result<(), RepositoryError>;

    async fn update_address(
        &self,
        id: &CustomerId,
        address: &str,
        postal_code: Option<&str>,
    ) -> Result<(), RepositoryError>;

    async fn increment_bookings(&self, id: &CustomerId) -> Result<(), RepositoryError>;
}

/// Tenant catalog reads: service tiers, serviceable areas, pickup slots.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_services(
        &self,
        tenant_id: &TenantId,
        service_type: Option<ServiceType>,
    ) -> Result<Vec<ServiceOffering>, RepositoryError>;

    async fn find_service(
        &self,
        tenant_id: &TenantId,
        service_type: ServiceType,
    ) -> Result<Option<ServiceOffering>, RepositoryError>;

    async fn find_service_by_id(
        &self,
        id: &ServiceId,
    ) -> Result<Option<ServiceOffering>, RepositoryError>;

    async fn list_areas(&self, tenant_id: &TenantId) -> Result<Vec<ServiceArea>, RepositoryError>;

    async fn list_slots(
        &self,
        tenant_id: &TenantId,
        slot_date: NaiveDate,
    ) -> Result<Vec<AvailabilitySlot>, RepositoryError>;
}

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn find_by_id(&self, id: &AppointmentId) -> Result<Option<Appointment>, RepositoryError>;

    /// Insert or fully replace by id.
    async fn save(&self, appointment: &Appointment) -> Result<(), RepositoryError>;
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp `{raw}`: {error}")))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|error| RepositoryError::Decode(format!("invalid date `{raw}`: {error}")))
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid uuid `{raw}`: {error}")))
}
