//! Domain foundation for the Washline booking platform.
//!
//! Everything the other crates agree on lives here: conversation, customer,
//! catalog, and appointment types; the conversation-state flow and its reply
//! classifier; the built-in service catalog; configuration loading; and the
//! layered error taxonomy. This crate has no I/O.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;

pub use catalog::{
    booking_total, default_service_descriptors, default_slot_descriptors, ServiceDescriptor,
    SlotDescriptor, DEFAULT_AREAS,
};
pub use domain::area::{extract_postal_code, forward_sortation_area, ServiceArea, ServiceAreaId};
pub use domain::booking::{
    Appointment, AppointmentId, AppointmentStatus, PaymentStatus,
};
pub use domain::conversation::{
    BookingOutcome, ConversationId, ConversationState, ConversationStatus, ConversationThread,
    DeliveryStatus, Direction, Message, MessageId, TenantId,
};
pub use domain::customer::{Customer, CustomerId};
pub use domain::service::{AvailabilitySlot, ServiceId, ServiceOffering, ServiceType, SlotId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{HeuristicStateClassifier, StateClassifier};

pub use chrono;
