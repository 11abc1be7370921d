use std::sync::Arc;

use smiles_agent::{booking_tools, BookingService, ToolRegistry};
use smiles_core::clock::SystemClock;
use smiles_core::config::AppConfig;
use smiles_db::{DataSourceResolver, SqlBookingRepository};

use crate::commands::CommandResult;

/// Tool registry over the configured data source. Nothing connects until a
/// tool is called.
pub fn registry(config: &AppConfig) -> ToolRegistry {
    let resolver = Arc::new(DataSourceResolver::from_config(config));
    let service = BookingService::new(
        Arc::new(SqlBookingRepository::new(resolver)),
        config.policy.cancellation_policy(),
        Arc::new(SystemClock),
    );
    booking_tools(service)
}

pub fn run() -> CommandResult {
    let (config, _runtime) = match crate::commands::prepare("tools") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    match serde_json::to_value(registry(&config).descriptors()) {
        Ok(value) => CommandResult::json("tools", &value),
        Err(error) => CommandResult::failure("tools", "serialization", error.to_string(), 1),
    }
}
