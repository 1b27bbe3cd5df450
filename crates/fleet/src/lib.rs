//! Fleet domain module.
//!
//! Vehicle inventory records and the stock arithmetic the inventory ledger
//! relies on, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage).

pub mod vehicle;

pub use vehicle::{
    MAX_MODEL_YEAR, MAX_QUANTITY, MIN_MODEL_YEAR, NewVehicle, StockChange, Vehicle, VehiclePatch,
    apply_stock_delta, ensure_nonzero_delta,
};
