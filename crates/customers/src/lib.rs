//! Customers domain module.
//!
//! Customer records and the rules their fields must satisfy, implemented as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod customer;

pub use customer::{Customer, CustomerPatch, NewCustomer, is_valid_email};
