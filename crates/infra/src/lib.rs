//! Infrastructure and application services for FleetRent.
//!
//! - [`store`]: the record store seam plus in-memory and Postgres backends
//! - [`ledger`]: atomic reserve/release/restock of vehicle units
//! - [`coordinator`]: rental create/edit/delete kept consistent with the ledger
//! - [`directory`]: customer and vehicle record management
//! - [`config`]: environment-driven configuration

pub mod config;
pub mod coordinator;
pub mod deadline;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use coordinator::{RentalCoordinator, RentalDetails};
pub use directory::{Directory, VehicleFilter};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use ledger::InventoryLedger;
