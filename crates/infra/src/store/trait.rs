use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use fleetrent_core::{CustomerId, RentalId, VehicleId};
use fleetrent_customers::{Customer, NewCustomer};
use fleetrent_fleet::{NewVehicle, Vehicle};
use fleetrent_rentals::{NewRental, Rental, RentalPatch};

/// The three tables the record store holds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Customer,
    Vehicle,
    Rental,
}

impl core::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            RecordKind::Customer => "customer",
            RecordKind::Vehicle => "vehicle",
            RecordKind::Rental => "rental",
        })
    }
}

/// Record store operation error.
///
/// These are **infrastructure errors** as seen by the store; the application
/// layer folds them into its own named error kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: String },

    /// A conditional decrement (or negative adjustment) found too little stock.
    #[error("vehicle {0} is out of stock")]
    OutOfStock(VehicleId),

    /// A referential constraint failed: a missing referenced record on
    /// insert/update, or a still-referenced record on delete.
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    /// A check or uniqueness constraint rejected the row.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A stored row could not be turned back into a domain record.
    #[error("corrupt record: {0}")]
    Decode(String),

    /// Network, pool or backend failure.
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(kind: RecordKind, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Row counts for the dashboard.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub customers: u64,
    pub vehicles: u64,
    pub rentals: u64,
    /// Sum of on-hand quantity over all vehicles.
    pub units_available: u64,
}

/// Table-style CRUD over customers, vehicles and rentals.
///
/// The store is the only shared state in the system. Implementations must
/// make every quantity mutation (`conditional_decrement_quantity`,
/// `increment_quantity`, `adjust_quantity`) a single atomic step: two
/// concurrent decrements against a quantity of 1 must see exactly one
/// success. Identifiers for new records are assigned by the store.
///
/// Deleting a customer or vehicle that a rental still references fails with
/// `ForeignKey`; inserting or updating a rental that references a missing
/// record fails the same way.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError>;
    async fn get_customer(&self, id: CustomerId) -> Result<Customer, StoreError>;
    /// Overwrite every field of an existing customer.
    async fn update_customer(&self, customer: Customer) -> Result<Customer, StoreError>;
    async fn delete_customer(&self, id: CustomerId) -> Result<(), StoreError>;
    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError>;

    async fn insert_vehicle(&self, vehicle: NewVehicle) -> Result<Vehicle, StoreError>;
    async fn get_vehicle(&self, id: VehicleId) -> Result<Vehicle, StoreError>;
    /// Overwrite the descriptive fields of an existing vehicle.
    ///
    /// `vehicle.quantity` is ignored; the stored quantity is returned.
    async fn update_vehicle_details(&self, vehicle: Vehicle) -> Result<Vehicle, StoreError>;
    async fn delete_vehicle(&self, id: VehicleId) -> Result<(), StoreError>;
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, StoreError>;

    /// Atomically decrement quantity by one where it is above zero.
    async fn conditional_decrement_quantity(&self, id: VehicleId) -> Result<Vehicle, StoreError>;
    /// Atomically increment quantity by one.
    async fn increment_quantity(&self, id: VehicleId) -> Result<Vehicle, StoreError>;
    /// Atomically add `delta`, refusing results below zero with `OutOfStock`
    /// and results past `MAX_QUANTITY` with `Constraint`.
    async fn adjust_quantity(&self, id: VehicleId, delta: i64) -> Result<Vehicle, StoreError>;

    async fn insert_rental(&self, rental: NewRental) -> Result<Rental, StoreError>;
    async fn get_rental(&self, id: RentalId) -> Result<Rental, StoreError>;
    /// Apply `patch` to an existing rental; the merged date range must hold.
    async fn update_rental(&self, id: RentalId, patch: RentalPatch) -> Result<Rental, StoreError>;
    async fn delete_rental(&self, id: RentalId) -> Result<(), StoreError>;
    async fn list_rentals(&self) -> Result<Vec<Rental>, StoreError>;

    async fn counts(&self) -> Result<StoreCounts, StoreError>;
}

#[async_trait]
impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        (**self).insert_customer(customer).await
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Customer, StoreError> {
        (**self).get_customer(id).await
    }

    async fn update_customer(&self, customer: Customer) -> Result<Customer, StoreError> {
        (**self).update_customer(customer).await
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<(), StoreError> {
        (**self).delete_customer(id).await
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        (**self).list_customers().await
    }

    async fn insert_vehicle(&self, vehicle: NewVehicle) -> Result<Vehicle, StoreError> {
        (**self).insert_vehicle(vehicle).await
    }

    async fn get_vehicle(&self, id: VehicleId) -> Result<Vehicle, StoreError> {
        (**self).get_vehicle(id).await
    }

    async fn update_vehicle_details(&self, vehicle: Vehicle) -> Result<Vehicle, StoreError> {
        (**self).update_vehicle_details(vehicle).await
    }

    async fn delete_vehicle(&self, id: VehicleId) -> Result<(), StoreError> {
        (**self).delete_vehicle(id).await
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, StoreError> {
        (**self).list_vehicles().await
    }

    async fn conditional_decrement_quantity(&self, id: VehicleId) -> Result<Vehicle, StoreError> {
        (**self).conditional_decrement_quantity(id).await
    }

    async fn increment_quantity(&self, id: VehicleId) -> Result<Vehicle, StoreError> {
        (**self).increment_quantity(id).await
    }

    async fn adjust_quantity(&self, id: VehicleId, delta: i64) -> Result<Vehicle, StoreError> {
        (**self).adjust_quantity(id, delta).await
    }

    async fn insert_rental(&self, rental: NewRental) -> Result<Rental, StoreError> {
        (**self).insert_rental(rental).await
    }

    async fn get_rental(&self, id: RentalId) -> Result<Rental, StoreError> {
        (**self).get_rental(id).await
    }

    async fn update_rental(&self, id: RentalId, patch: RentalPatch) -> Result<Rental, StoreError> {
        (**self).update_rental(id, patch).await
    }

    async fn delete_rental(&self, id: RentalId) -> Result<(), StoreError> {
        (**self).delete_rental(id).await
    }

    async fn list_rentals(&self) -> Result<Vec<Rental>, StoreError> {
        (**self).list_rentals().await
    }

    async fn counts(&self) -> Result<StoreCounts, StoreError> {
        (**self).counts().await
    }
}
