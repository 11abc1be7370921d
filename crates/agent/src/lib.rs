//! Booking service and the agent-facing tools built on it.
//!
//! The language model only chooses which tool to call and with what
//! arguments. Lookups, the cancellation policy, and the database update are
//! decided here.

pub mod service;
pub mod tools;

pub use service::BookingService;
pub use tools::{booking_tools, Tool, ToolDescriptor, ToolRegistry};
