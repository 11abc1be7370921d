pub mod connection;
pub mod datasource;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect_with_settings, DbPool};
pub use datasource::{
    ConfiguredRegistry, DataSourceRegistry, DataSourceResolver, LookupError, PoolRegistry,
    ResolveError,
};
pub use fixtures::{BookingSeedInfo, DemoDataset, SeedResult, VerificationResult};
pub use repositories::{
    BookingRepository, InMemoryBookingRepository, RepositoryError, SqlBookingRepository,
};
