//! Built-in catalog defaults.
//!
//! Tenants that have not configured services, slots, or areas fall back to
//! these literals. The conversation prompt and the address-rejection copy
//! both quote them, so the values here are load-bearing: change them and the
//! customer-facing text changes with them.

use serde::{Deserialize, Serialize};

use crate::domain::service::ServiceType;

/// Flattened, model-facing description of a service tier. Tenant rows and
/// the built-in defaults both render to this shape before being handed to
/// the language model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub service_type: ServiceType,
    pub service_name: String,
    pub base_price: f64,
    pub price_per_load: f64,
    pub turnaround_hours: i64,
    pub description: String,
}

pub fn default_service_descriptors() -> Vec<ServiceDescriptor> {
    vec![
        ServiceDescriptor {
            service_type: ServiceType::Regular,
            service_name: "Regular Service".to_string(),
            base_price: 15.0,
            price_per_load: 8.0,
            turnaround_hours: 48,
            description: "48-hour turnaround".to_string(),
        },
        ServiceDescriptor {
            service_type: ServiceType::Express,
            service_name: "Express Service".to_string(),
            base_price: 20.0,
            price_per_load: 12.0,
            turnaround_hours: 24,
            description: "24-hour turnaround".to_string(),
        },
        ServiceDescriptor {
            service_type: ServiceType::Premium,
            service_name: "Premium Service".to_string(),
            base_price: 30.0,
            price_per_load: 18.0,
            turnaround_hours: 8,
            description: "Same-day service".to_string(),
        },
    ]
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDescriptor {
    pub time: String,
    pub label: String,
    pub available: bool,
}

/// The four fallback pickup times offered when a tenant has no slots for a
/// date.
pub fn default_slot_descriptors() -> Vec<SlotDescriptor> {
    ["09:00", "11:00", "14:00", "16:00"]
        .into_iter()
        .map(|time| SlotDescriptor {
            time: time.to_string(),
            label: format_slot_label(time),
            available: true,
        })
        .collect()
}

/// `HH:MM` (24h) to a customer-facing 12-hour label. Unparseable input is
/// passed through untouched rather than dropped.
pub fn format_slot_label(time: &str) -> String {
    let mut parts = time.splitn(2, ':');
    let (Some(hour_raw), Some(minute)) = (parts.next(), parts.next()) else {
        return time.to_string();
    };
    let Ok(hour) = hour_raw.parse::<u8>() else {
        return time.to_string();
    };

    let period = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{display_hour}:{minute} {period}")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DefaultArea {
    pub prefix: &'static str,
    pub city: &'static str,
    pub province: &'static str,
}

/// Serviceable postal prefixes quoted in rejection messages when a tenant has
/// no configured areas.
pub const DEFAULT_AREAS: &[DefaultArea] = &[
    DefaultArea { prefix: "M4", city: "Toronto", province: "ON" },
    DefaultArea { prefix: "M5", city: "Toronto", province: "ON" },
    DefaultArea { prefix: "L5", city: "Mississauga", province: "ON" },
    DefaultArea { prefix: "V6", city: "Vancouver", province: "BC" },
];

/// Booking price: flat base plus a per-load rate.
pub fn booking_total(base_price: f64, price_per_load: f64, number_of_loads: u32) -> f64 {
    base_price + price_per_load * f64::from(number_of_loads)
}
