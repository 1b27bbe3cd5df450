//! Customer and vehicle record management.
//!
//! Field rules are checked here before the store sees a write. Vehicle
//! quantity is not editable through this module; it changes only through
//! the [`InventoryLedger`](crate::ledger::InventoryLedger).

use std::time::Duration;

use tracing::{info, instrument};

use fleetrent_core::{CustomerId, IdOrder, VehicleId, sort_by_id};
use fleetrent_customers::{Customer, CustomerPatch, NewCustomer};
use fleetrent_fleet::{NewVehicle, Vehicle, VehiclePatch};

use crate::deadline::bounded;
use crate::error::ServiceResult;
use crate::store::{RecordStore, StoreCounts};

/// Filters for [`Directory::list_vehicles`].
#[derive(Debug, Clone, Default)]
pub struct VehicleFilter {
    pub search: Option<String>,
    /// Only vehicles with at least one unit on hand (the rental picker).
    pub available_only: bool,
}

pub struct Directory<S> {
    store: S,
    call_timeout: Duration,
}

impl<S: RecordStore> Directory<S> {
    pub fn new(store: S, call_timeout: Duration) -> Self {
        Self { store, call_timeout }
    }

    #[instrument(skip(self, input), err)]
    pub async fn create_customer(&self, input: NewCustomer) -> ServiceResult<Customer> {
        let input = input.validated()?;
        let customer = bounded("insert_customer", self.call_timeout, self.store.insert_customer(input)).await?;
        info!(customer_id = %customer.id, "customer created");
        Ok(customer)
    }

    pub async fn get_customer(&self, id: CustomerId) -> ServiceResult<Customer> {
        bounded("get_customer", self.call_timeout, self.store.get_customer(id)).await
    }

    #[instrument(skip(self, patch), fields(customer_id = %id), err)]
    pub async fn update_customer(&self, id: CustomerId, patch: CustomerPatch) -> ServiceResult<Customer> {
        let current = self.get_customer(id).await?;
        let updated = current.patched(&patch)?;
        bounded("update_customer", self.call_timeout, self.store.update_customer(updated)).await
    }

    /// Fails with `Conflict` while a rental still references the customer.
    #[instrument(skip(self), fields(customer_id = %id), err)]
    pub async fn delete_customer(&self, id: CustomerId) -> ServiceResult<()> {
        bounded("delete_customer", self.call_timeout, self.store.delete_customer(id)).await
    }

    /// Customers in creation order, optionally filtered on names and email.
    pub async fn list_customers(&self, search: Option<&str>) -> ServiceResult<Vec<Customer>> {
        let mut customers = bounded("list_customers", self.call_timeout, self.store.list_customers()).await?;
        if let Some(term) = search {
            customers.retain(|c| c.matches(term));
        }
        sort_by_id(&mut customers, IdOrder::OldestFirst);
        Ok(customers)
    }

    #[instrument(skip(self, input), err)]
    pub async fn create_vehicle(&self, input: NewVehicle) -> ServiceResult<Vehicle> {
        let input = input.validated()?;
        let vehicle = bounded("insert_vehicle", self.call_timeout, self.store.insert_vehicle(input)).await?;
        info!(vehicle_id = %vehicle.id, quantity = vehicle.quantity, "vehicle created");
        Ok(vehicle)
    }

    pub async fn get_vehicle(&self, id: VehicleId) -> ServiceResult<Vehicle> {
        bounded("get_vehicle", self.call_timeout, self.store.get_vehicle(id)).await
    }

    /// Edit descriptive fields. The returned record carries the stored quantity.
    #[instrument(skip(self, patch), fields(vehicle_id = %id), err)]
    pub async fn update_vehicle(&self, id: VehicleId, patch: VehiclePatch) -> ServiceResult<Vehicle> {
        let current = self.get_vehicle(id).await?;
        let updated = current.patched(&patch)?;
        bounded(
            "update_vehicle_details",
            self.call_timeout,
            self.store.update_vehicle_details(updated),
        )
        .await
    }

    /// Fails with `Conflict` while a rental still references the vehicle.
    #[instrument(skip(self), fields(vehicle_id = %id), err)]
    pub async fn delete_vehicle(&self, id: VehicleId) -> ServiceResult<()> {
        bounded("delete_vehicle", self.call_timeout, self.store.delete_vehicle(id)).await
    }

    /// Vehicles, newest first.
    pub async fn list_vehicles(&self, filter: &VehicleFilter) -> ServiceResult<Vec<Vehicle>> {
        let mut vehicles = bounded("list_vehicles", self.call_timeout, self.store.list_vehicles()).await?;
        vehicles.retain(|v| {
            (!filter.available_only || v.is_available())
                && filter.search.as_deref().is_none_or(|term| v.matches(term))
        });
        sort_by_id(&mut vehicles, IdOrder::NewestFirst);
        Ok(vehicles)
    }

    /// Dashboard counts.
    pub async fn stats(&self) -> ServiceResult<StoreCounts> {
        bounded("counts", self.call_timeout, self.store.counts()).await
    }
}
