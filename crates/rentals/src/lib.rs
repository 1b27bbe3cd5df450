//! Rentals domain module.
//!
//! A rental books one vehicle for one customer over an inclusive date range.
//! This crate holds the record types and the date-range rules; reserving and
//! releasing stock is orchestrated by the infrastructure layer.

pub mod period;
pub mod rental;

pub use period::{RentalPeriod, RentalPhase};
pub use rental::{NewRental, Rental, RentalPatch};
