use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::conversation::TenantId;
use crate::domain::customer::CustomerId;
use crate::domain::service::ServiceId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppointmentId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Some(Self::Scheduled),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

/// A confirmed pickup commitment. Created exclusively by the booking tool
/// once every required field has been collected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub service_id: ServiceId,
    pub scheduled_at: DateTime<Utc>,
    pub number_of_loads: u32,
    pub pickup_address: String,
    pub payment_amount: f64,
    pub payment_status: PaymentStatus,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self.status, next),
            (AppointmentStatus::Scheduled, AppointmentStatus::Completed)
                | (AppointmentStatus::Scheduled, AppointmentStatus::Cancelled)
        )
    }

    pub fn transition_to(&mut self, next: AppointmentStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidAppointmentTransition { from: self.status, to: next })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::domain::conversation::TenantId;
    use crate::domain::customer::CustomerId;
    use crate::domain::service::ServiceId;
    use crate::errors::DomainError;

    use super::{Appointment, AppointmentId, AppointmentStatus, PaymentStatus};

    fn appointment(status: AppointmentStatus) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: AppointmentId(Uuid::new_v4()),
            tenant_id: TenantId("tenant-1".to_string()),
            customer_id: CustomerId(Uuid::new_v4()),
            service_id: ServiceId(Uuid::new_v4()),
            scheduled_at: now,
            number_of_loads: 2,
            pickup_address: "123 Main St, Toronto M5V 2T6".to_string(),
            payment_amount: 44.0,
            payment_status: PaymentStatus::Pending,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn scheduled_can_complete_or_cancel() {
        let mut booking = appointment(AppointmentStatus::Scheduled);
        booking.transition_to(AppointmentStatus::Completed).expect("scheduled->completed");
        assert_eq!(booking.status, AppointmentStatus::Completed);

        let mut booking = appointment(AppointmentStatus::Scheduled);
        booking.transition_to(AppointmentStatus::Cancelled).expect("scheduled->cancelled");
        assert_eq!(booking.status, AppointmentStatus::Cancelled);
    }

    #[test]
    fn terminal_statuses_reject_transitions() {
        let mut booking = appointment(AppointmentStatus::Cancelled);
        let error = booking
            .transition_to(AppointmentStatus::Completed)
            .expect_err("cancelled->completed should fail");
        assert!(matches!(error, DomainError::InvalidAppointmentTransition { .. }));
    }
}
