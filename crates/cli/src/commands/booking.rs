use clap::Subcommand;
use serde_json::{json, Value};

use smiles_agent::tools::{CANCEL_BOOKING, GET_BOOKINGS_FOR_CUSTOMER, GET_BOOKING_DETAILS};
use smiles_core::errors::BookingError;

use crate::commands::tools::registry;
use crate::commands::{prepare, CommandResult};

#[derive(Debug, Clone, Subcommand)]
pub enum BookingCommand {
    #[command(about = "Show one booking for a customer")]
    Get {
        #[arg(long = "number", help = "Booking number")]
        booking_number: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        surname: String,
    },
    #[command(about = "List booking numbers for a customer")]
    List {
        #[arg(long)]
        name: String,
        #[arg(long)]
        surname: String,
    },
    #[command(about = "Cancel a booking, subject to the cancellation policy")]
    Cancel {
        #[arg(long = "number", help = "Booking number")]
        booking_number: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        surname: String,
    },
}

impl BookingCommand {
    fn command_name(&self) -> &'static str {
        match self {
            Self::Get { .. } => "booking get",
            Self::List { .. } => "booking list",
            Self::Cancel { .. } => "booking cancel",
        }
    }

    fn tool_call(&self) -> (&'static str, Value) {
        match self {
            Self::Get { booking_number, name, surname } => (
                GET_BOOKING_DETAILS,
                json!({"booking_number": booking_number, "name": name, "surname": surname}),
            ),
            Self::List { name, surname } => {
                (GET_BOOKINGS_FOR_CUSTOMER, json!({"name": name, "surname": surname}))
            }
            Self::Cancel { booking_number, name, surname } => (
                CANCEL_BOOKING,
                json!({"booking_number": booking_number, "name": name, "surname": surname}),
            ),
        }
    }
}

pub fn run(command: BookingCommand) -> CommandResult {
    let command_name = command.command_name();
    let (config, runtime) = match prepare(command_name) {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let (tool, input) = command.tool_call();
    let tools = registry(&config);

    match runtime.block_on(tools.call(tool, input)) {
        Ok(value) => CommandResult::json(command_name, &value),
        Err(error) => match error.downcast_ref::<BookingError>() {
            Some(booking_error) => CommandResult::failure(
                command_name,
                booking_error.error_class(),
                booking_error.to_string(),
                exit_code(booking_error),
            ),
            None => CommandResult::failure(command_name, "tool_input", format!("{error:#}"), 10),
        },
    }
}

fn exit_code(error: &BookingError) -> u8 {
    match error {
        BookingError::Configuration(_) => 4,
        BookingError::NotFound { .. } => 7,
        BookingError::CannotBeCanceled { .. } => 8,
        BookingError::Storage(_) => 9,
    }
}
