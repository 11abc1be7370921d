use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Business reason a cancellation was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelRefusal {
    TooLate,
    TooShort,
    AlreadyCanceled,
}

impl CancelRefusal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooLate => "too late",
            Self::TooShort => "too short",
            Self::AlreadyCanceled => "already canceled",
        }
    }
}

impl std::fmt::Display for CancelRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("booking {booking_number} not found")]
    NotFound { booking_number: String },
    #[error("booking {booking_number} cannot be canceled: {reason}")]
    CannotBeCanceled { booking_number: String, reason: CancelRefusal },
}

impl BookingError {
    pub fn not_found(booking_number: impl Into<String>) -> Self {
        Self::NotFound { booking_number: booking_number.into() }
    }

    pub fn cannot_be_canceled(booking_number: impl Into<String>, reason: CancelRefusal) -> Self {
        Self::CannotBeCanceled { booking_number: booking_number.into(), reason }
    }

    /// Stable machine-readable class used by command and tool output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Storage(_) => "storage",
            Self::NotFound { .. } => "booking_not_found",
            Self::CannotBeCanceled { .. } => "booking_cannot_be_canceled",
        }
    }
}
