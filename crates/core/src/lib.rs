pub mod cancellation;
pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;

pub use cancellation::CancellationPolicy;
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::booking::Booking;
pub use domain::customer::Customer;
pub use errors::{BookingError, CancelRefusal};
