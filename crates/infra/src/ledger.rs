//! Inventory ledger: the only writer of vehicle quantity.
//!
//! A vehicle's on-hand quantity is its nominal stock minus its outstanding
//! rentals. The ledger keeps that true by turning every change into one
//! atomic store update:
//!
//! - `reserve` → `conditional_decrement_quantity` (fails with `OutOfStock` at 0)
//! - `release` → `increment_quantity`
//! - `restock` → `adjust_quantity` (refuses results below zero)
//!
//! It never reads the quantity, computes, and writes it back; concurrent
//! reservations against the same vehicle are linearized by the store.

use std::time::Duration;

use tracing::{debug, instrument};

use fleetrent_core::VehicleId;
use fleetrent_fleet::ensure_nonzero_delta;

use crate::deadline::bounded;
use crate::error::ServiceResult;
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub struct InventoryLedger<S> {
    store: S,
    call_timeout: Duration,
}

impl<S: RecordStore> InventoryLedger<S> {
    pub fn new(store: S, call_timeout: Duration) -> Self {
        Self { store, call_timeout }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Take one unit of `vehicle_id`, returning the quantity left.
    ///
    /// `OutOfStock` when nothing is left; `NotFound` when the vehicle is gone.
    #[instrument(skip(self), fields(vehicle_id = %vehicle_id), err)]
    pub async fn reserve(&self, vehicle_id: VehicleId) -> ServiceResult<u32> {
        let vehicle = bounded(
            "reserve",
            self.call_timeout,
            self.store.conditional_decrement_quantity(vehicle_id),
        )
        .await?;
        debug!(quantity = vehicle.quantity, "unit reserved");
        Ok(vehicle.quantity)
    }

    /// Give one unit of `vehicle_id` back, returning the new quantity.
    #[instrument(skip(self), fields(vehicle_id = %vehicle_id), err)]
    pub async fn release(&self, vehicle_id: VehicleId) -> ServiceResult<u32> {
        let vehicle = bounded(
            "release",
            self.call_timeout,
            self.store.increment_quantity(vehicle_id),
        )
        .await?;
        debug!(quantity = vehicle.quantity, "unit released");
        Ok(vehicle.quantity)
    }

    /// Apply a manual stock correction of `delta` units.
    ///
    /// A zero delta is rejected before the store is contacted.
    #[instrument(skip(self), fields(vehicle_id = %vehicle_id), err)]
    pub async fn restock(&self, vehicle_id: VehicleId, delta: i64) -> ServiceResult<u32> {
        ensure_nonzero_delta(delta)?;
        let vehicle = bounded(
            "restock",
            self.call_timeout,
            self.store.adjust_quantity(vehicle_id, delta),
        )
        .await?;
        Ok(vehicle.quantity)
    }

    /// Current on-hand quantity of `vehicle_id`.
    pub async fn available(&self, vehicle_id: VehicleId) -> ServiceResult<u32> {
        let vehicle = bounded("available", self.call_timeout, self.store.get_vehicle(vehicle_id)).await?;
        Ok(vehicle.quantity)
    }
}
