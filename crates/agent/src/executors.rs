//! The seven business-data tools the model may call.
//!
//! Every executor is scoped to one turn: it carries the turn's tenant (and,
//! for booking, the sender's phone number) plus injected repositories, so a
//! registry is cheap to build per inbound message. Storage failures come back
//! as structured failure JSON the model can relay; nothing here panics or
//! leaks an error past the tool boundary.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use washline_core::catalog::{
    booking_total, default_service_descriptors, default_slot_descriptors, ServiceDescriptor,
    DEFAULT_AREAS,
};
use washline_core::domain::area::{extract_postal_code, forward_sortation_area, ServiceArea};
use washline_core::domain::booking::{Appointment, AppointmentId, AppointmentStatus, PaymentStatus};
use washline_core::domain::conversation::TenantId;
use washline_core::domain::customer::{Customer, CustomerId};
use washline_core::domain::service::{ServiceOffering, ServiceType};
use washline_db::repositories::{
    AppointmentRepository, CatalogRepository, CustomerRepository,
};

use crate::tools::{Tool, ToolError, ToolRegistry};

/// The storage collaborators every turn's tool set is built from.
#[derive(Clone)]
pub struct ToolDeps {
    pub customers: Arc<dyn CustomerRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
}

/// Build the full seven-tool registry for one turn.
pub fn registry_for_turn(
    deps: &ToolDeps,
    tenant_id: &TenantId,
    customer_phone: &str,
) -> ToolRegistry {
    let mut registry = ToolRegistry::default();
    registry.register(LookupCustomerTool {
        customers: deps.customers.clone(),
        tenant_id: tenant_id.clone(),
    });
    registry.register(ListServicesTool {
        catalog: deps.catalog.clone(),
        tenant_id: tenant_id.clone(),
    });
    registry.register(ListAvailabilityTool {
        catalog: deps.catalog.clone(),
        tenant_id: tenant_id.clone(),
    });
    registry.register(ValidateAddressTool {
        customers: deps.customers.clone(),
        catalog: deps.catalog.clone(),
        tenant_id: tenant_id.clone(),
    });
    registry.register(CreateCustomerTool {
        customers: deps.customers.clone(),
        tenant_id: tenant_id.clone(),
    });
    registry.register(CreateBookingTool {
        customers: deps.customers.clone(),
        catalog: deps.catalog.clone(),
        appointments: deps.appointments.clone(),
        tenant_id: tenant_id.clone(),
        customer_phone: customer_phone.to_string(),
    });
    registry.register(UpdateBookingTool {
        catalog: deps.catalog.clone(),
        appointments: deps.appointments.clone(),
    });
    registry
}

fn decode_args<T: for<'de> Deserialize<'de>>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments)
        .map_err(|error| ToolError::InvalidArguments(format!("{tool}: {error}")))
}

fn descriptor_for(offering: &ServiceOffering) -> ServiceDescriptor {
    let description = if offering.turnaround_hours <= 8 {
        "Same-day service".to_string()
    } else {
        format!("{}-hour turnaround", offering.turnaround_hours)
    };
    ServiceDescriptor {
        service_type: offering.service_type,
        service_name: offering.service_name.clone(),
        base_price: offering.base_price,
        price_per_load: offering.price_per_load,
        turnaround_hours: offering.turnaround_hours,
        description,
    }
}

/// Tool 1: exact-match customer lookup by phone, scoped to the tenant.
struct LookupCustomerTool {
    customers: Arc<dyn CustomerRepository>,
    tenant_id: TenantId,
}

#[derive(Deserialize)]
struct LookupCustomerArgs {
    phone: String,
}

#[async_trait]
impl Tool for LookupCustomerTool {
    fn name(&self) -> &'static str {
        "lookup_customer"
    }

    fn description(&self) -> &'static str {
        "Verify if a customer exists in the system by phone number. Use this FIRST when a conversation starts."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "phone": {"type": "string", "description": "Customer phone number"}
            },
            "required": ["phone"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: LookupCustomerArgs = decode_args(self.name(), arguments)?;

        match self.customers.find_by_phone(&self.tenant_id, &args.phone).await {
            Ok(Some(customer)) => Ok(json!({
                "exists": true,
                "customer_id": customer.id.0,
                "name": customer.name,
                "email": customer.email,
                "address": customer.address,
                "total_bookings": customer.total_bookings,
            })),
            Ok(None) => Ok(json!({"exists": false})),
            Err(error) => {
                warn!(event_name = "agent.tool.lookup_customer_failed", error = %error, "customer lookup failed");
                Ok(json!({"exists": false, "error": "Could not check customer"}))
            }
        }
    }
}

/// Tool 2: tenant service tiers, with the literal built-in defaults when the
/// tenant has none configured.
struct ListServicesTool {
    catalog: Arc<dyn CatalogRepository>,
    tenant_id: TenantId,
}

#[derive(Deserialize)]
struct ListServicesArgs {
    #[serde(default)]
    service_type: Option<String>,
}

#[async_trait]
impl Tool for ListServicesTool {
    fn name(&self) -> &'static str {
        "list_services"
    }

    fn description(&self) -> &'static str {
        "Get available service tiers and pricing information"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "service_type": {
                    "type": "string",
                    "enum": ["all", "regular", "express", "premium"],
                    "description": "Specific service type or \"all\" for all services"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: ListServicesArgs = decode_args(self.name(), arguments)?;

        let filter = match args.service_type.as_deref() {
            None | Some("all") => None,
            Some(raw) => match ServiceType::parse(raw) {
                Some(service_type) => Some(service_type),
                // Unknown tier names match nothing, which lands on the
                // default catalog just like an unconfigured tenant.
                None => return Ok(json!({"services": default_service_descriptors()})),
            },
        };

        match self.catalog.list_services(&self.tenant_id, filter).await {
            Ok(offerings) if offerings.is_empty() => {
                Ok(json!({"services": default_service_descriptors()}))
            }
            Ok(offerings) => {
                let services: Vec<ServiceDescriptor> =
                    offerings.iter().map(descriptor_for).collect();
                Ok(json!({"services": services}))
            }
            Err(error) => {
                warn!(event_name = "agent.tool.list_services_failed", error = %error, "service listing failed");
                Ok(json!({"error": "Could not fetch services"}))
            }
        }
    }
}

/// Tool 3: pickup slots for a calendar date, with the four default times when
/// the tenant has none.
struct ListAvailabilityTool {
    catalog: Arc<dyn CatalogRepository>,
    tenant_id: TenantId,
}

#[derive(Deserialize)]
struct ListAvailabilityArgs {
    date: String,
}

#[async_trait]
impl Tool for ListAvailabilityTool {
    fn name(&self) -> &'static str {
        "list_availability"
    }

    fn description(&self) -> &'static str {
        "Get available pickup time slots for a specific date"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "date": {"type": "string", "description": "Date in YYYY-MM-DD format"}
            },
            "required": ["date"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: ListAvailabilityArgs = decode_args(self.name(), arguments)?;

        let Ok(date) = NaiveDate::parse_from_str(args.date.trim(), "%Y-%m-%d") else {
            return Ok(json!({
                "error": format!("Invalid date `{}`, expected YYYY-MM-DD", args.date)
            }));
        };

        match self.catalog.list_slots(&self.tenant_id, date).await {
            Ok(slots) if slots.is_empty() => Ok(json!({
                "date": args.date.trim(),
                "available_slots": default_slot_descriptors(),
            })),
            Ok(slots) => {
                let available: Vec<Value> = slots
                    .iter()
                    .map(|slot| {
                        json!({
                            "time": slot.slot_time,
                            "label": washline_core::catalog::format_slot_label(&slot.slot_time),
                            "available": slot.available,
                        })
                    })
                    .collect();
                Ok(json!({"date": args.date.trim(), "available_slots": available}))
            }
            Err(error) => {
                warn!(event_name = "agent.tool.list_availability_failed", error = %error, "slot listing failed");
                Ok(json!({"error": "Could not fetch availability"}))
            }
        }
    }
}

/// Tool 4: service-area check for a free-text address, persisting the address
/// onto the customer when one is identified.
struct ValidateAddressTool {
    customers: Arc<dyn CustomerRepository>,
    catalog: Arc<dyn CatalogRepository>,
    tenant_id: TenantId,
}

#[derive(Deserialize)]
struct ValidateAddressArgs {
    address: String,
    #[serde(default)]
    customer_id: Option<String>,
}

fn coverage_summary(areas: &[ServiceArea]) -> String {
    if areas.is_empty() {
        return DEFAULT_AREAS
            .iter()
            .map(|area| format!("{} ({})", area.prefix, area.city))
            .collect::<Vec<_>>()
            .join(", ");
    }
    areas
        .iter()
        .map(|area| format!("{} ({})", area.postal_code_prefix, area.city))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl Tool for ValidateAddressTool {
    fn name(&self) -> &'static str {
        "validate_address"
    }

    fn description(&self) -> &'static str {
        "Validate a customer address against the serviceable areas and save it to the customer profile"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "address": {"type": "string", "description": "Full customer address"},
                "customer_id": {
                    "type": "string",
                    "description": "Customer ID if updating an existing customer"
                }
            },
            "required": ["address"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: ValidateAddressArgs = decode_args(self.name(), arguments)?;

        let Some(postal_code) = extract_postal_code(&args.address) else {
            return Ok(json!({
                "valid": false,
                "reason": "Could not determine postal code from address",
            }));
        };
        let fsa = forward_sortation_area(&postal_code);

        let areas = match self.catalog.list_areas(&self.tenant_id).await {
            Ok(areas) => areas,
            Err(error) => {
                warn!(event_name = "agent.tool.validate_address_failed", error = %error, "area listing failed");
                return Ok(json!({"valid": false, "error": "Could not validate address"}));
            }
        };

        let Some(matched) =
            areas.iter().find(|area| fsa.starts_with(area.postal_code_prefix.as_str()))
        else {
            return Ok(json!({
                "valid": false,
                "in_service_area": false,
                "postal_code": postal_code,
                "reason": format!(
                    "Sorry, we don't serve {fsa} yet. We cover: {}",
                    coverage_summary(&areas)
                ),
            }));
        };

        if let Some(raw_id) = &args.customer_id {
            match Uuid::parse_str(raw_id) {
                Ok(id) => {
                    if let Err(error) = self
                        .customers
                        .update_address(&CustomerId(id), args.address.trim(), Some(&postal_code))
                        .await
                    {
                        warn!(event_name = "agent.tool.validate_address_failed", error = %error, "address persist failed");
                        return Ok(json!({
                            "valid": false,
                            "error": "Could not update customer address",
                        }));
                    }
                }
                Err(_) => {
                    warn!(
                        event_name = "agent.tool.validate_address_bad_customer_id",
                        customer_id = %raw_id,
                        "skipping address persist for unparseable customer id"
                    );
                }
            }
        }

        Ok(json!({
            "valid": true,
            "in_service_area": true,
            "postal_code": postal_code,
            "city": matched.city,
            "province": matched.province,
            "formatted_address": args.address.trim(),
        }))
    }
}

/// Tool 5: first-time customer insert.
struct CreateCustomerTool {
    customers: Arc<dyn CustomerRepository>,
    tenant_id: TenantId,
}

#[derive(Deserialize)]
struct CreateCustomerArgs {
    name: String,
    phone: String,
    #[serde(default)]
    email: Option<String>,
    address: String,
}

#[async_trait]
impl Tool for CreateCustomerTool {
    fn name(&self) -> &'static str {
        "create_customer"
    }

    fn description(&self) -> &'static str {
        "Add a new customer to the system"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "phone": {"type": "string"},
                "email": {"type": "string"},
                "address": {"type": "string"}
            },
            "required": ["name", "phone", "address"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: CreateCustomerArgs = decode_args(self.name(), arguments)?;

        let customer = Customer::new(self.tenant_id.clone(), args.phone.trim(), args.name.trim(), Utc::now())
            .with_email(args.email.clone())
            .with_address(args.address.trim());

        match self.customers.insert(&customer).await {
            Ok(()) => Ok(json!({
                "success": true,
                "customer_id": customer.id.0,
                "name": customer.name,
                "phone": customer.phone,
            })),
            Err(error) => {
                warn!(event_name = "agent.tool.create_customer_failed", error = %error, "customer insert failed");
                Ok(json!({"success": false, "error": "Could not create customer"}))
            }
        }
    }
}

/// Tool 6: the booking insert. Resolves or creates the customer, resolves the
/// service tier, prices the job, and persists the appointment; a booking id
/// is only ever reported after the row exists.
struct CreateBookingTool {
    customers: Arc<dyn CustomerRepository>,
    catalog: Arc<dyn CatalogRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    tenant_id: TenantId,
    customer_phone: String,
}

#[derive(Deserialize)]
struct CreateBookingArgs {
    customer_name: String,
    #[serde(default)]
    customer_email: Option<String>,
    address: String,
    service_type: String,
    #[serde(default = "default_loads")]
    number_of_loads: u32,
    scheduled_date: String,
    scheduled_time: String,
}

fn default_loads() -> u32 {
    1
}

fn parse_schedule(date: &str, time: &str) -> Option<chrono::DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M").ok()?;
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

#[async_trait]
impl Tool for CreateBookingTool {
    fn name(&self) -> &'static str {
        "create_booking"
    }

    fn description(&self) -> &'static str {
        "Create a confirmed laundry pickup booking. Only call this after confirming ALL details with the customer."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "customer_name": {"type": "string"},
                "customer_phone": {"type": "string"},
                "customer_email": {"type": "string"},
                "address": {"type": "string"},
                "service_type": {"type": "string", "enum": ["regular", "express", "premium"]},
                "number_of_loads": {"type": "number"},
                "scheduled_date": {"type": "string", "description": "YYYY-MM-DD"},
                "scheduled_time": {"type": "string", "description": "HH:MM, 24-hour"}
            },
            "required": ["customer_name", "address", "service_type", "scheduled_date", "scheduled_time"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: CreateBookingArgs = decode_args(self.name(), arguments)?;

        let Some(service_type) = ServiceType::parse(&args.service_type) else {
            return Ok(json!({
                "success": false,
                "error": format!("Unknown service type `{}`", args.service_type),
            }));
        };

        let Some(scheduled_at) = parse_schedule(&args.scheduled_date, &args.scheduled_time) else {
            return Ok(json!({
                "success": false,
                "error": "Invalid date or time, expected YYYY-MM-DD and HH:MM",
            }));
        };

        // The sender's number from the turn is authoritative for identity;
        // the model-provided fields only fill in a brand-new profile.
        let customer = match self
            .customers
            .find_by_phone(&self.tenant_id, &self.customer_phone)
            .await
        {
            Ok(Some(customer)) => customer,
            Ok(None) => {
                let customer = Customer::new(
                    self.tenant_id.clone(),
                    self.customer_phone.clone(),
                    args.customer_name.trim(),
                    Utc::now(),
                )
                .with_email(args.customer_email.clone())
                .with_address(args.address.trim());
                if let Err(error) = self.customers.insert(&customer).await {
                    warn!(event_name = "agent.tool.create_booking_failed", error = %error, "customer insert failed");
                    return Ok(json!({"success": false, "error": "Could not create customer"}));
                }
                customer
            }
            Err(error) => {
                warn!(event_name = "agent.tool.create_booking_failed", error = %error, "customer lookup failed");
                return Ok(json!({"success": false, "error": "Could not look up customer"}));
            }
        };

        let service = match self.catalog.find_service(&self.tenant_id, service_type).await {
            Ok(Some(service)) => service,
            Ok(None) => {
                return Ok(json!({"success": false, "error": "Service not found"}));
            }
            Err(error) => {
                warn!(event_name = "agent.tool.create_booking_failed", error = %error, "service lookup failed");
                return Ok(json!({"success": false, "error": "Could not look up service"}));
            }
        };

        let total_amount =
            booking_total(service.base_price, service.price_per_load, args.number_of_loads);

        let now = Utc::now();
        let appointment = Appointment {
            id: AppointmentId(Uuid::new_v4()),
            tenant_id: self.tenant_id.clone(),
            customer_id: customer.id.clone(),
            service_id: service.id.clone(),
            scheduled_at,
            number_of_loads: args.number_of_loads,
            pickup_address: args.address.trim().to_string(),
            payment_amount: total_amount,
            payment_status: PaymentStatus::Pending,
            status: AppointmentStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };

        if let Err(error) = self.appointments.save(&appointment).await {
            warn!(event_name = "agent.tool.create_booking_failed", error = %error, "appointment insert failed");
            return Ok(json!({"success": false, "error": "Could not save booking"}));
        }

        if let Err(error) = self.customers.increment_bookings(&customer.id).await {
            warn!(event_name = "agent.tool.create_booking_count_failed", error = %error, "booking count update failed");
        }

        Ok(json!({
            "success": true,
            "booking_id": appointment.id.0,
            "scheduled_time": appointment.scheduled_at.to_rfc3339(),
            "total_amount": total_amount,
            "service_name": service.service_name,
            "number_of_loads": args.number_of_loads,
        }))
    }
}

/// Tool 7: patch an existing booking, repricing when the load count changes.
struct UpdateBookingTool {
    catalog: Arc<dyn CatalogRepository>,
    appointments: Arc<dyn AppointmentRepository>,
}

#[derive(Deserialize)]
struct UpdateBookingArgs {
    booking_id: String,
    #[serde(default)]
    scheduled_date: Option<String>,
    #[serde(default)]
    scheduled_time: Option<String>,
    #[serde(default)]
    number_of_loads: Option<u32>,
}

#[async_trait]
impl Tool for UpdateBookingTool {
    fn name(&self) -> &'static str {
        "update_booking"
    }

    fn description(&self) -> &'static str {
        "Modify an existing booking"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "booking_id": {"type": "string"},
                "scheduled_date": {"type": "string", "description": "YYYY-MM-DD"},
                "scheduled_time": {"type": "string", "description": "HH:MM, 24-hour"},
                "number_of_loads": {"type": "number"}
            },
            "required": ["booking_id"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: UpdateBookingArgs = decode_args(self.name(), arguments)?;

        let Ok(booking_id) = Uuid::parse_str(args.booking_id.trim()) else {
            return Ok(json!({"success": false, "error": "Invalid booking id"}));
        };
        let booking_id = AppointmentId(booking_id);

        let mut appointment = match self.appointments.find_by_id(&booking_id).await {
            Ok(Some(appointment)) => appointment,
            Ok(None) => return Ok(json!({"success": false, "error": "Booking not found"})),
            Err(error) => {
                warn!(event_name = "agent.tool.update_booking_failed", error = %error, "booking lookup failed");
                return Ok(json!({"success": false, "error": "Could not look up booking"}));
            }
        };

        if let (Some(date), Some(time)) = (&args.scheduled_date, &args.scheduled_time) {
            let Some(scheduled_at) = parse_schedule(date, time) else {
                return Ok(json!({
                    "success": false,
                    "error": "Invalid date or time, expected YYYY-MM-DD and HH:MM",
                }));
            };
            appointment.scheduled_at = scheduled_at;
        }

        if let Some(number_of_loads) = args.number_of_loads {
            appointment.number_of_loads = number_of_loads;
            match self.catalog.find_service_by_id(&appointment.service_id).await {
                Ok(Some(service)) => {
                    appointment.payment_amount = booking_total(
                        service.base_price,
                        service.price_per_load,
                        number_of_loads,
                    );
                }
                Ok(None) => {
                    warn!(
                        event_name = "agent.tool.update_booking_stale_service",
                        booking_id = %appointment.id.0,
                        "service row missing, keeping previous amount"
                    );
                }
                Err(error) => {
                    warn!(event_name = "agent.tool.update_booking_failed", error = %error, "service lookup failed");
                    return Ok(json!({"success": false, "error": "Could not reprice booking"}));
                }
            }
        }

        appointment.updated_at = Utc::now();
        if let Err(error) = self.appointments.save(&appointment).await {
            warn!(event_name = "agent.tool.update_booking_failed", error = %error, "booking update failed");
            return Ok(json!({"success": false, "error": "Could not update booking"}));
        }

        Ok(json!({
            "success": true,
            "booking_id": appointment.id.0,
            "scheduled_at": appointment.scheduled_at.to_rfc3339(),
            "number_of_loads": appointment.number_of_loads,
            "total_amount": appointment.payment_amount,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::{json, Value};
    use uuid::Uuid;

    use washline_core::domain::area::{ServiceArea, ServiceAreaId};
    use washline_core::domain::conversation::TenantId;
    use washline_core::domain::customer::Customer;
    use washline_core::domain::service::{ServiceId, ServiceOffering, ServiceType};
    use washline_db::repositories::{
        CustomerRepository, InMemoryAppointmentRepository, InMemoryCatalogRepository,
        InMemoryCustomerRepository,
    };

    use super::{registry_for_turn, ToolDeps};

    const PHONE: &str = "+14165550100";

    fn tenant() -> TenantId {
        TenantId("tenant-test".to_string())
    }

    struct Fixture {
        deps: ToolDeps,
        customers: Arc<InMemoryCustomerRepository>,
        catalog: Arc<InMemoryCatalogRepository>,
        appointments: Arc<InMemoryAppointmentRepository>,
    }

    fn fixture() -> Fixture {
        let customers = Arc::new(InMemoryCustomerRepository::default());
        let catalog = Arc::new(InMemoryCatalogRepository::default());
        let appointments = Arc::new(InMemoryAppointmentRepository::default());
        let deps = ToolDeps {
            customers: customers.clone(),
            catalog: catalog.clone(),
            appointments: appointments.clone(),
        };
        Fixture { deps, customers, catalog, appointments }
    }

    fn offering(service_type: ServiceType, base: f64, per_load: f64, hours: i64) -> ServiceOffering {
        ServiceOffering {
            id: ServiceId(Uuid::new_v4()),
            tenant_id: tenant(),
            service_type,
            service_name: format!("{} Service", service_type.as_str()),
            base_price: base,
            price_per_load: per_load,
            turnaround_hours: hours,
            active: true,
        }
    }

    async fn seed_catalog(fixture: &Fixture) {
        fixture.catalog.push_service(offering(ServiceType::Regular, 15.0, 8.0, 48)).await;
        fixture.catalog.push_service(offering(ServiceType::Express, 20.0, 12.0, 24)).await;
        fixture.catalog.push_service(offering(ServiceType::Premium, 30.0, 18.0, 8)).await;
        fixture
            .catalog
            .push_area(ServiceArea {
                id: ServiceAreaId(Uuid::new_v4()),
                tenant_id: tenant(),
                postal_code_prefix: "M5".to_string(),
                city: "Toronto".to_string(),
                province: "ON".to_string(),
                active: true,
            })
            .await;
    }

    async fn run_tool(fixture: &Fixture, name: &str, arguments: Value) -> Value {
        let registry = registry_for_turn(&fixture.deps, &tenant(), PHONE);
        registry
            .get(name)
            .unwrap_or_else(|| panic!("tool `{name}` registered"))
            .execute(arguments)
            .await
            .expect("tool execution")
    }

    #[tokio::test]
    async fn registry_exposes_all_seven_tools() {
        let fixture = fixture();
        let registry = registry_for_turn(&fixture.deps, &tenant(), PHONE);
        let names: Vec<String> = registry.specs().into_iter().map(|spec| spec.name).collect();
        assert_eq!(
            names,
            vec![
                "create_booking",
                "create_customer",
                "list_availability",
                "list_services",
                "lookup_customer",
                "update_booking",
                "validate_address",
            ]
        );
    }

    #[tokio::test]
    async fn lookup_reports_missing_then_existing_customer() {
        let fixture = fixture();
        let result = run_tool(&fixture, "lookup_customer", json!({"phone": PHONE})).await;
        assert_eq!(result, json!({"exists": false}));

        let customer = Customer::new(tenant(), PHONE, "Dana Moss", Utc::now())
            .with_address("123 Main St, Toronto M5V 2T6");
        fixture.customers.insert(&customer).await.expect("insert customer");

        let result = run_tool(&fixture, "lookup_customer", json!({"phone": PHONE})).await;
        assert_eq!(result["exists"], true);
        assert_eq!(result["name"], "Dana Moss");
        assert_eq!(result["total_bookings"], 0);
    }

    #[tokio::test]
    async fn list_services_falls_back_to_the_three_literal_defaults() {
        let fixture = fixture();
        let result = run_tool(&fixture, "list_services", json!({})).await;

        let services = result["services"].as_array().expect("services array");
        assert_eq!(services.len(), 3);
        assert_eq!(services[0]["service_type"], "regular");
        assert_eq!(services[0]["base_price"], 15.0);
        assert_eq!(services[0]["price_per_load"], 8.0);
        assert_eq!(services[1]["service_type"], "express");
        assert_eq!(services[1]["base_price"], 20.0);
        assert_eq!(services[1]["price_per_load"], 12.0);
        assert_eq!(services[2]["service_type"], "premium");
        assert_eq!(services[2]["base_price"], 30.0);
        assert_eq!(services[2]["price_per_load"], 18.0);
    }

    #[tokio::test]
    async fn list_services_prefers_tenant_rows_and_honors_filter() {
        let fixture = fixture();
        seed_catalog(&fixture).await;

        let result = run_tool(&fixture, "list_services", json!({"service_type": "express"})).await;
        let services = result["services"].as_array().expect("services array");
        assert_eq!(services.len(), 1);
        assert_eq!(services[0]["service_type"], "express");
        assert_eq!(services[0]["description"], "24-hour turnaround");
    }

    #[tokio::test]
    async fn availability_defaults_to_the_four_literal_slots() {
        let fixture = fixture();
        let result =
            run_tool(&fixture, "list_availability", json!({"date": "2025-06-02"})).await;

        let slots = result["available_slots"].as_array().expect("slots array");
        let times: Vec<&str> =
            slots.iter().map(|slot| slot["time"].as_str().expect("time")).collect();
        assert_eq!(times, vec!["09:00", "11:00", "14:00", "16:00"]);
        assert!(slots.iter().all(|slot| slot["available"] == true));
    }

    #[tokio::test]
    async fn availability_rejects_malformed_dates() {
        let fixture = fixture();
        let result = run_tool(&fixture, "list_availability", json!({"date": "tomorrow"})).await;
        assert!(result["error"].as_str().expect("error").contains("Invalid date"));
    }

    #[tokio::test]
    async fn address_in_service_area_validates_and_persists() {
        let fixture = fixture();
        seed_catalog(&fixture).await;

        let customer = Customer::new(tenant(), PHONE, "Dana Moss", Utc::now());
        fixture.customers.insert(&customer).await.expect("insert customer");

        let result = run_tool(
            &fixture,
            "validate_address",
            json!({
                "address": "123 Main St, Toronto M5V 2T6",
                "customer_id": customer.id.0.to_string(),
            }),
        )
        .await;

        assert_eq!(result["valid"], true);
        assert_eq!(result["in_service_area"], true);
        assert_eq!(result["city"], "Toronto");
        assert_eq!(result["postal_code"], "M5V 2T6");

        let stored = fixture.customers.customer(&customer.id).await.expect("customer");
        assert_eq!(stored.address.as_deref(), Some("123 Main St, Toronto M5V 2T6"));
        assert_eq!(stored.postal_code.as_deref(), Some("M5V 2T6"));
    }

    #[tokio::test]
    async fn address_outside_service_area_names_the_covered_prefixes() {
        let fixture = fixture();
        seed_catalog(&fixture).await;

        let result = run_tool(
            &fixture,
            "validate_address",
            json!({"address": "800 Centre St, Calgary T2P 3B5"}),
        )
        .await;

        assert_eq!(result["valid"], false);
        assert_eq!(result["in_service_area"], false);
        let reason = result["reason"].as_str().expect("reason");
        assert!(reason.contains("T2P"));
        assert!(reason.contains("M5 (Toronto)"));
    }

    #[tokio::test]
    async fn address_without_postal_code_is_rejected_not_fabricated() {
        let fixture = fixture();
        seed_catalog(&fixture).await;

        let result =
            run_tool(&fixture, "validate_address", json!({"address": "somewhere downtown"})).await;
        assert_eq!(result["valid"], false);
        assert!(result["reason"].as_str().expect("reason").contains("postal code"));
    }

    #[tokio::test]
    async fn create_customer_inserts_then_rejects_duplicates() {
        let fixture = fixture();
        let args = json!({
            "name": "Dana Moss",
            "phone": PHONE,
            "address": "123 Main St, Toronto M5V 2T6",
        });

        let result = run_tool(&fixture, "create_customer", args.clone()).await;
        assert_eq!(result["success"], true);
        assert!(result["customer_id"].as_str().is_some());

        let result = run_tool(&fixture, "create_customer", args).await;
        assert_eq!(result["success"], false);
    }

    #[tokio::test]
    async fn create_booking_prices_and_persists_the_appointment() {
        let fixture = fixture();
        seed_catalog(&fixture).await;

        let result = run_tool(
            &fixture,
            "create_booking",
            json!({
                "customer_name": "Dana Moss",
                "address": "123 Main St, Toronto M5V 2T6",
                "service_type": "express",
                "number_of_loads": 2,
                "scheduled_date": "2025-06-02",
                "scheduled_time": "11:00",
            }),
        )
        .await;

        assert_eq!(result["success"], true);
        assert_eq!(result["total_amount"], 44.0);

        let appointments = fixture.appointments.all().await;
        assert_eq!(appointments.len(), 1);
        assert_eq!(appointments[0].payment_amount, 44.0);
        assert_eq!(appointments[0].number_of_loads, 2);
        assert_eq!(
            result["booking_id"].as_str().expect("booking id"),
            appointments[0].id.0.to_string()
        );

        // The sender was unknown, so the booking created their profile too.
        let customer = fixture
            .customers
            .find_by_phone(&tenant(), PHONE)
            .await
            .expect("find")
            .expect("customer created");
        assert_eq!(customer.name, "Dana Moss");
        assert_eq!(customer.total_bookings, 1);
    }

    #[tokio::test]
    async fn create_booking_without_configured_service_fails_without_a_row() {
        let fixture = fixture();

        let result = run_tool(
            &fixture,
            "create_booking",
            json!({
                "customer_name": "Dana Moss",
                "address": "123 Main St, Toronto M5V 2T6",
                "service_type": "express",
                "scheduled_date": "2025-06-02",
                "scheduled_time": "11:00",
            }),
        )
        .await;

        assert_eq!(result["success"], false);
        assert_eq!(result["error"], "Service not found");
        assert!(result.get("booking_id").is_none());
        assert!(fixture.appointments.all().await.is_empty());
    }

    #[tokio::test]
    async fn create_booking_rejects_bad_schedule_input() {
        let fixture = fixture();
        seed_catalog(&fixture).await;

        let result = run_tool(
            &fixture,
            "create_booking",
            json!({
                "customer_name": "Dana Moss",
                "address": "123 Main St, Toronto M5V 2T6",
                "service_type": "express",
                "scheduled_date": "June 2nd",
                "scheduled_time": "11am",
            }),
        )
        .await;

        assert_eq!(result["success"], false);
        assert!(fixture.appointments.all().await.is_empty());
    }

    #[tokio::test]
    async fn update_booking_reprices_when_loads_change() {
        let fixture = fixture();
        seed_catalog(&fixture).await;

        let created = run_tool(
            &fixture,
            "create_booking",
            json!({
                "customer_name": "Dana Moss",
                "address": "123 Main St, Toronto M5V 2T6",
                "service_type": "express",
                "number_of_loads": 2,
                "scheduled_date": "2025-06-02",
                "scheduled_time": "11:00",
            }),
        )
        .await;
        let booking_id = created["booking_id"].as_str().expect("booking id").to_string();

        let result = run_tool(
            &fixture,
            "update_booking",
            json!({
                "booking_id": booking_id,
                "number_of_loads": 3,
                "scheduled_date": "2025-06-03",
                "scheduled_time": "14:00",
            }),
        )
        .await;

        assert_eq!(result["success"], true);
        assert_eq!(result["number_of_loads"], 3);
        assert_eq!(result["total_amount"], 56.0);

        let appointments = fixture.appointments.all().await;
        assert_eq!(appointments[0].payment_amount, 56.0);
        assert!(appointments[0].scheduled_at.to_rfc3339().starts_with("2025-06-03T14:00"));
    }

    #[tokio::test]
    async fn update_booking_reports_unknown_and_invalid_ids() {
        let fixture = fixture();

        let result = run_tool(
            &fixture,
            "update_booking",
            json!({"booking_id": Uuid::new_v4().to_string(), "number_of_loads": 2}),
        )
        .await;
        assert_eq!(result, json!({"success": false, "error": "Booking not found"}));

        let result =
            run_tool(&fixture, "update_booking", json!({"booking_id": "not-a-uuid"})).await;
        assert_eq!(result, json!({"success": false, "error": "Invalid booking id"}));
    }
}
