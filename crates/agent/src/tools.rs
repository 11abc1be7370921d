use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::service::BookingService;

pub const GET_BOOKING_DETAILS: &str = "get_booking_details";
pub const GET_BOOKINGS_FOR_CUSTOMER: &str = "get_bookings_for_customer";
pub const CANCEL_BOOKING: &str = "cancel_booking";

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: Value) -> Result<Value>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
}

/// Tools keyed by name. Iteration and descriptor listing are name-ordered.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    pub async fn call(&self, name: &str, input: Value) -> Result<Value> {
        let tool = self.get(name).ok_or_else(|| anyhow!("unknown tool `{name}`"))?;
        debug!(event_name = "tool.invoked", tool = name, "invoking tool");
        tool.execute(input).await
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| ToolDescriptor { name: tool.name(), description: tool.description() })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Registry holding the three booking tools over one service.
pub fn booking_tools(service: BookingService) -> ToolRegistry {
    let service = Arc::new(service);
    let mut registry = ToolRegistry::default();
    registry.register(GetBookingDetailsTool { service: service.clone() });
    registry.register(GetBookingsForCustomerTool { service: service.clone() });
    registry.register(CancelBookingTool { service });
    registry
}

#[derive(Debug, Deserialize)]
struct BookingLookupInput {
    booking_number: String,
    name: String,
    surname: String,
}

#[derive(Debug, Deserialize)]
struct CustomerInput {
    name: String,
    surname: String,
}

fn parse_input<T>(tool: &str, input: Value) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(input).with_context(|| format!("invalid input for tool `{tool}`"))
}

pub struct GetBookingDetailsTool {
    service: Arc<BookingService>,
}

#[async_trait]
impl Tool for GetBookingDetailsTool {
    fn name(&self) -> &'static str {
        GET_BOOKING_DETAILS
    }

    fn description(&self) -> &'static str {
        "Get booking details given a booking number and customer name and surname"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: BookingLookupInput = parse_input(self.name(), input)?;
        let booking = self
            .service
            .get_booking_details(&input.booking_number, &input.name, &input.surname)
            .await?;
        Ok(serde_json::to_value(booking)?)
    }
}

pub struct GetBookingsForCustomerTool {
    service: Arc<BookingService>,
}

#[async_trait]
impl Tool for GetBookingsForCustomerTool {
    fn name(&self) -> &'static str {
        GET_BOOKINGS_FOR_CUSTOMER
    }

    fn description(&self) -> &'static str {
        "Get all booking ids for a customer given his name and surname"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: CustomerInput = parse_input(self.name(), input)?;
        let numbers = self.service.get_bookings_for_customer(&input.name, &input.surname).await?;
        Ok(serde_json::to_value(numbers)?)
    }
}

pub struct CancelBookingTool {
    service: Arc<BookingService>,
}

#[async_trait]
impl Tool for CancelBookingTool {
    fn name(&self) -> &'static str {
        CANCEL_BOOKING
    }

    fn description(&self) -> &'static str {
        "Cancel a booking given its booking number and customer name and surname"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: BookingLookupInput = parse_input(self.name(), input)?;
        let booking = self
            .service
            .cancel_booking(&input.booking_number, &input.name, &input.surname)
            .await?;
        Ok(serde_json::to_value(booking)?)
    }
}
