//! In-memory repository implementations for tests and offline tooling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use washline_core::domain::area::ServiceArea;
use washline_core::domain::booking::{Appointment, AppointmentId};
use washline_core::domain::conversation::{
    BookingOutcome, ConversationId, ConversationState, ConversationStatus, ConversationThread,
    DeliveryStatus, Message, TenantId,
};
use washline_core::domain::customer::{Customer, CustomerId};
use washline_core::domain::service::{AvailabilitySlot, ServiceId, ServiceOffering, ServiceType};

use super::{
    AppointmentRepository, CatalogRepository, ConversationRepository, CustomerRepository,
    RepositoryError,
};

fn injected_failure(context: &str) -> RepositoryError {
    RepositoryError::Decode(format!("injected failure: {context}"))
}

#[derive(Default)]
pub struct InMemoryConversationRepository {
    threads: RwLock<HashMap<ConversationId, ConversationThread>>,
    messages: RwLock<Vec<Message>>,
    fail_state_updates: AtomicBool,
}

impl InMemoryConversationRepository {
    /// Make subsequent `update_state` calls fail, for exercising the
    /// log-and-swallow path.
    pub fn set_fail_state_updates(&self, fail: bool) {
        self.fail_state_updates.store(fail, Ordering::SeqCst);
    }

    pub async fn thread(&self, id: &ConversationId) -> Option<ConversationThread> {
        self.threads.read().await.get(id).cloned()
    }
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn find_open(
        &self,
        tenant_id: &TenantId,
        customer_phone: &str,
    ) -> Result<Option<ConversationThread>, RepositoryError> {
        let threads = self.threads.read().await;
        let mut open: Vec<&ConversationThread> = threads
            .values()
            .filter(|thread| {
                thread.tenant_id == *tenant_id
                    && thread.customer_phone == customer_phone
                    && thread.status == ConversationStatus::Active
            })
            .collect();
        open.sort_by_key(|thread| thread.created_at);
        Ok(open.last().map(|thread| (*thread).clone()))
    }

    async fn insert(&self, thread: &ConversationThread) -> Result<(), RepositoryError> {
        self.threads.write().await.insert(thread.id.clone(), thread.clone());
        Ok(())
    }

    async fn append_message(&self, message: &Message) -> Result<(), RepositoryError> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.read().await;
        Ok(messages
            .iter()
            .filter(|message| message.conversation_id == *conversation_id)
            .cloned()
            .collect())
    }

    async fn touch_activity(
        &self,
        conversation_id: &ConversationId,
        message_count: i64,
        last_message_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut threads = self.threads.write().await;
        if let Some(thread) = threads.get_mut(conversation_id) {
            thread.message_count = message_count;
            thread.last_message_at = last_message_at;
        }
        Ok(())
    }

    async fn update_state(
        &self,
        conversation_id: &ConversationId,
        state: ConversationState,
    ) -> Result<(), RepositoryError> {
        if self.fail_state_updates.load(Ordering::SeqCst) {
            return Err(injected_failure("update_state"));
        }
        let mut threads = self.threads.write().await;
        if let Some(thread) = threads.get_mut(conversation_id) {
            thread.state = state;
        }
        Ok(())
    }

    async fn record_outcome(
        &self,
        conversation_id: &ConversationId,
        outcome: BookingOutcome,
    ) -> Result<(), RepositoryError> {
        let mut threads = self.threads.write().await;
        if let Some(thread) = threads.get_mut(conversation_id) {
            thread.booking_outcome = outcome;
        }
        Ok(())
    }

    async fn update_delivery_status(
        &self,
        provider_sid: &str,
        status: DeliveryStatus,
        error_code: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut messages = self.messages.write().await;
        for message in messages.iter_mut() {
            if message.provider_sid.as_deref() == Some(provider_sid) {
                message.status = status;
                message.error_code = error_code.map(str::to_string);
                message.error_message = error_message.map(str::to_string);
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<CustomerId, Customer>>,
}

impl InMemoryCustomerRepository {
    pub async fn customer(&self, id: &CustomerId) -> Option<Customer> {
        self.customers.read().await.get(id).cloned()
    }
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_phone(
        &self,
        tenant_id: &TenantId,
        phone: &str,
    ) -> Result<Option<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        Ok(customers
            .values()
            .find(|customer| customer.tenant_id == *tenant_id && customer.phone == phone)
            .cloned())
    }

    async fn insert(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let mut customers = self.customers.write().await;
        let duplicate = customers
            .values()
            .any(|existing| existing.tenant_id == customer.tenant_id && existing.phone == customer.phone);
        if duplicate {
            return Err(RepositoryError::Decode(format!(
                "customer with phone `{}` already exists for tenant",
                customer.phone
            )));
        }
        customers.insert(customer.id.clone(), customer.clone());
        Ok(())
    }

    async fn update_address(
        &self,
        id: &CustomerId,
        address: &str,
        postal_code: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut customers = self.customers.write().await;
        if let Some(customer) = customers.get_mut(id) {
            customer.address = Some(address.to_string());
            customer.postal_code = postal_code.map(str::to_string);
            customer.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn increment_bookings(&self, id: &CustomerId) -> Result<(), RepositoryError> {
        let mut customers = self.customers.write().await;
        if let Some(customer) = customers.get_mut(id) {
            customer.total_bookings += 1;
            customer.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    services: RwLock<Vec<ServiceOffering>>,
    areas: RwLock<Vec<ServiceArea>>,
    slots: RwLock<Vec<AvailabilitySlot>>,
}

impl InMemoryCatalogRepository {
    pub async fn push_service(&self, service: ServiceOffering) {
        self.services.write().await.push(service);
    }

    pub async fn push_area(&self, area: ServiceArea) {
        self.areas.write().await.push(area);
    }

    pub async fn push_slot(&self, slot: AvailabilitySlot) {
        self.slots.write().await.push(slot);
    }
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list_services(
        &self,
        tenant_id: &TenantId,
        service_type: Option<ServiceType>,
    ) -> Result<Vec<ServiceOffering>, RepositoryError> {
        let services = self.services.read().await;
        Ok(services
            .iter()
            .filter(|service| {
                service.tenant_id == *tenant_id
                    && service.active
                    && service_type.map_or(true, |wanted| service.service_type == wanted)
            })
            .cloned()
            .collect())
    }

    async fn find_service(
        &self,
        tenant_id: &TenantId,
        service_type: ServiceType,
    ) -> Result<Option<ServiceOffering>, RepositoryError> {
        let services = self.services.read().await;
        Ok(services
            .iter()
            .find(|service| {
                service.tenant_id == *tenant_id
                    && service.service_type == service_type
                    && service.active
            })
            .cloned())
    }

    async fn find_service_by_id(
        &self,
        id: &ServiceId,
    ) -> Result<Option<ServiceOffering>, RepositoryError> {
        let services = self.services.read().await;
        Ok(services.iter().find(|service| service.id == *id).cloned())
    }

    async fn list_areas(&self, tenant_id: &TenantId) -> Result<Vec<ServiceArea>, RepositoryError> {
        let areas = self.areas.read().await;
        Ok(areas
            .iter()
            .filter(|area| area.tenant_id == *tenant_id && area.active)
            .cloned()
            .collect())
    }

    async fn list_slots(
        &self,
        tenant_id: &TenantId,
        slot_date: NaiveDate,
    ) -> Result<Vec<AvailabilitySlot>, RepositoryError> {
        let slots = self.slots.read().await;
        Ok(slots
            .iter()
            .filter(|slot| {
                slot.tenant_id == *tenant_id && slot.slot_date == slot_date && slot.available
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    appointments: RwLock<HashMap<AppointmentId, Appointment>>,
}

impl InMemoryAppointmentRepository {
    pub async fn all(&self) -> Vec<Appointment> {
        self.appointments.read().await.values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn find_by_id(&self, id: &AppointmentId) -> Result<Option<Appointment>, RepositoryError> {
        Ok(self.appointments.read().await.get(id).cloned())
    }

    async fn save(&self, appointment: &Appointment) -> Result<(), RepositoryError> {
        self.appointments.write().await.insert(appointment.id.clone(), appointment.clone());
        Ok(())
    }
}
