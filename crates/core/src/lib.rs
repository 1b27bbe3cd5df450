//! `fleetrent-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod validation;
pub mod value_object;

pub use entity::{Entity, IdOrder, sort_by_id};
pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, RentalId, VehicleId};
pub use validation::FieldErrors;
pub use value_object::ValueObject;
