use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::conversation::TenantId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Regular,
    Express,
    Premium,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Express => "express",
            Self::Premium => "premium",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "regular" => Some(Self::Regular),
            "express" => Some(Self::Express),
            "premium" => Some(Self::Premium),
            _ => None,
        }
    }
}

/// A tenant-configured service tier. Read-only from the conversation engine's
/// perspective; bookings reference these rows by id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub id: ServiceId,
    pub tenant_id: TenantId,
    pub service_type: ServiceType,
    pub service_name: String,
    pub base_price: f64,
    pub price_per_load: f64,
    pub turnaround_hours: i64,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId(pub Uuid);

/// One tenant-defined pickup slot on a calendar date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: SlotId,
    pub tenant_id: TenantId,
    pub slot_date: NaiveDate,
    pub slot_time: String,
    pub available: bool,
}
