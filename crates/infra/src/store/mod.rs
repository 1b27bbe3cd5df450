//! Record store boundary.
//!
//! This module defines the infrastructure-facing abstraction over the three
//! related tables (customers, vehicles, rentals) without making storage
//! assumptions, plus an in-memory and a Postgres implementation.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{Fault, InMemoryRecordStore, StoreOp};
pub use postgres::PostgresRecordStore;
pub use r#trait::{RecordKind, RecordStore, StoreCounts, StoreError};
