use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use fleetrent_core::{CustomerId, RentalId, VehicleId};
use fleetrent_customers::{Customer, NewCustomer};
use fleetrent_fleet::{MAX_QUANTITY, NewVehicle, StockChange, Vehicle, apply_stock_delta};
use fleetrent_rentals::{NewRental, Rental, RentalPatch};

use super::r#trait::{RecordKind, RecordStore, StoreCounts, StoreError};

/// Store operations that can have a fault injected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetCustomer,
    GetVehicle,
    DecrementQuantity,
    IncrementQuantity,
    AdjustQuantity,
    InsertRental,
    GetRental,
    UpdateRental,
    DeleteRental,
    ListRentals,
}

/// A one-shot failure consumed by the next call of the targeted operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Fail with `StoreError::Unavailable`.
    Unavailable(String),
    /// Sleep before running the operation normally.
    Delay(Duration),
    /// Fail with the given error without touching the tables.
    Fail(StoreError),
}

#[derive(Debug, Default)]
struct Tables {
    customers: BTreeMap<CustomerId, Customer>,
    vehicles: BTreeMap<VehicleId, Vehicle>,
    rentals: BTreeMap<RentalId, Rental>,
}

impl Tables {
    fn vehicle_mut(&mut self, id: VehicleId) -> Result<&mut Vehicle, StoreError> {
        self.vehicles
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Vehicle, id))
    }

    fn check_references(&self, customer_id: CustomerId, vehicle_id: VehicleId) -> Result<(), StoreError> {
        if !self.customers.contains_key(&customer_id) {
            return Err(StoreError::ForeignKey(format!(
                "rental references missing customer {customer_id}"
            )));
        }
        if !self.vehicles.contains_key(&vehicle_id) {
            return Err(StoreError::ForeignKey(format!(
                "rental references missing vehicle {vehicle_id}"
            )));
        }
        Ok(())
    }
}

/// In-memory record store.
///
/// Intended for tests/dev. Every operation runs under one table lock, so each
/// quantity mutation is atomic and concurrent callers are linearized.
///
/// Faults can be queued per operation with [`InMemoryRecordStore::inject`] to
/// exercise timeout and compensation paths.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<Tables>,
    faults: Mutex<HashMap<StoreOp, VecDeque<Fault>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `fault` for the next call of `op`.
    pub fn inject(&self, op: StoreOp, fault: Fault) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.entry(op).or_default().push_back(fault);
        }
    }

    async fn fault(&self, op: StoreOp) -> Result<(), StoreError> {
        let next = match self.faults.lock() {
            Ok(mut faults) => faults.get_mut(&op).and_then(VecDeque::pop_front),
            Err(_) => return Err(poisoned()),
        };
        match next {
            Some(Fault::Unavailable(msg)) => Err(StoreError::Unavailable(msg)),
            Some(Fault::Fail(err)) => Err(err),
            Some(Fault::Delay(d)) => {
                tokio::time::sleep(d).await;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        f(&tables)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        f(&mut tables)
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        self.write(|t| {
            let customer = customer.into_customer(CustomerId::new());
            t.customers.insert(customer.id, customer.clone());
            Ok(customer)
        })
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Customer, StoreError> {
        self.fault(StoreOp::GetCustomer).await?;
        self.read(|t| {
            t.customers
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::not_found(RecordKind::Customer, id))
        })
    }

    async fn update_customer(&self, customer: Customer) -> Result<Customer, StoreError> {
        self.write(|t| match t.customers.get_mut(&customer.id) {
            Some(existing) => {
                *existing = customer.clone();
                Ok(customer)
            }
            None => Err(StoreError::not_found(RecordKind::Customer, customer.id)),
        })
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<(), StoreError> {
        self.write(|t| {
            if !t.customers.contains_key(&id) {
                return Err(StoreError::not_found(RecordKind::Customer, id));
            }
            if t.rentals.values().any(|r| r.customer_id == id) {
                return Err(StoreError::ForeignKey(format!(
                    "customer {id} is referenced by a rental"
                )));
            }
            t.customers.remove(&id);
            Ok(())
        })
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        self.read(|t| Ok(t.customers.values().cloned().collect()))
    }

    async fn insert_vehicle(&self, vehicle: NewVehicle) -> Result<Vehicle, StoreError> {
        self.write(|t| {
            let vehicle = vehicle.into_vehicle(VehicleId::new());
            t.vehicles.insert(vehicle.id, vehicle.clone());
            Ok(vehicle)
        })
    }

    async fn get_vehicle(&self, id: VehicleId) -> Result<Vehicle, StoreError> {
        self.fault(StoreOp::GetVehicle).await?;
        self.read(|t| {
            t.vehicles
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::not_found(RecordKind::Vehicle, id))
        })
    }

    async fn update_vehicle_details(&self, vehicle: Vehicle) -> Result<Vehicle, StoreError> {
        self.write(|t| {
            let existing = t.vehicle_mut(vehicle.id)?;
            existing.make = vehicle.make;
            existing.model = vehicle.model;
            existing.year = vehicle.year;
            existing.unit_price = vehicle.unit_price;
            existing.photo = vehicle.photo;
            Ok(existing.clone())
        })
    }

    async fn delete_vehicle(&self, id: VehicleId) -> Result<(), StoreError> {
        self.write(|t| {
            if !t.vehicles.contains_key(&id) {
                return Err(StoreError::not_found(RecordKind::Vehicle, id));
            }
            if t.rentals.values().any(|r| r.vehicle_id == id) {
                return Err(StoreError::ForeignKey(format!(
                    "vehicle {id} is referenced by a rental"
                )));
            }
            t.vehicles.remove(&id);
            Ok(())
        })
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, StoreError> {
        self.read(|t| Ok(t.vehicles.values().cloned().collect()))
    }

    async fn conditional_decrement_quantity(&self, id: VehicleId) -> Result<Vehicle, StoreError> {
        self.fault(StoreOp::DecrementQuantity).await?;
        self.write(|t| {
            let vehicle = t.vehicle_mut(id)?;
            if vehicle.quantity == 0 {
                return Err(StoreError::OutOfStock(id));
            }
            vehicle.quantity -= 1;
            Ok(vehicle.clone())
        })
    }

    async fn increment_quantity(&self, id: VehicleId) -> Result<Vehicle, StoreError> {
        self.fault(StoreOp::IncrementQuantity).await?;
        self.adjust(id, 1)
    }

    async fn adjust_quantity(&self, id: VehicleId, delta: i64) -> Result<Vehicle, StoreError> {
        self.fault(StoreOp::AdjustQuantity).await?;
        self.adjust(id, delta)
    }

    async fn insert_rental(&self, rental: NewRental) -> Result<Rental, StoreError> {
        self.fault(StoreOp::InsertRental).await?;
        self.write(|t| {
            t.check_references(rental.customer_id, rental.vehicle_id)?;
            let rental = rental.into_rental(RentalId::new());
            t.rentals.insert(rental.id, rental.clone());
            Ok(rental)
        })
    }

    async fn get_rental(&self, id: RentalId) -> Result<Rental, StoreError> {
        self.fault(StoreOp::GetRental).await?;
        self.read(|t| {
            t.rentals
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::not_found(RecordKind::Rental, id))
        })
    }

    async fn update_rental(&self, id: RentalId, patch: RentalPatch) -> Result<Rental, StoreError> {
        self.fault(StoreOp::UpdateRental).await?;
        self.write(|t| {
            let current = t
                .rentals
                .get(&id)
                .ok_or_else(|| StoreError::not_found(RecordKind::Rental, id))?;
            let updated = current
                .patched(&patch)
                .map_err(|e| StoreError::Constraint(e.to_string()))?;
            t.check_references(updated.customer_id, updated.vehicle_id)?;
            t.rentals.insert(id, updated.clone());
            Ok(updated)
        })
    }

    async fn delete_rental(&self, id: RentalId) -> Result<(), StoreError> {
        self.fault(StoreOp::DeleteRental).await?;
        self.write(|t| match t.rentals.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(RecordKind::Rental, id)),
        })
    }

    async fn list_rentals(&self) -> Result<Vec<Rental>, StoreError> {
        self.fault(StoreOp::ListRentals).await?;
        self.read(|t| Ok(t.rentals.values().cloned().collect()))
    }

    async fn counts(&self) -> Result<StoreCounts, StoreError> {
        self.read(|t| {
            Ok(StoreCounts {
                customers: t.customers.len() as u64,
                vehicles: t.vehicles.len() as u64,
                rentals: t.rentals.len() as u64,
                units_available: t.vehicles.values().map(|v| u64::from(v.quantity)).sum(),
            })
        })
    }
}

impl InMemoryRecordStore {
    fn adjust(&self, id: VehicleId, delta: i64) -> Result<Vehicle, StoreError> {
        self.write(|t| {
            let vehicle = t.vehicle_mut(id)?;
            match apply_stock_delta(vehicle.quantity, delta) {
                StockChange::Applied(q) => {
                    vehicle.quantity = q;
                    Ok(vehicle.clone())
                }
                StockChange::Rejected if delta > 0 => Err(StoreError::Constraint(format!(
                    "quantity of vehicle {id} cannot exceed {MAX_QUANTITY}"
                ))),
                StockChange::Rejected => Err(StoreError::OutOfStock(id)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fleetrent_rentals::RentalPeriod;

    fn customer() -> NewCustomer {
        NewCustomer {
            last_name: "Martin".to_string(),
            first_name: "Paul".to_string(),
            email: "paul@example.com".to_string(),
            phone: "0601".to_string(),
        }
    }

    fn vehicle(quantity: u32) -> NewVehicle {
        NewVehicle {
            make: "Peugeot".to_string(),
            model: "208".to_string(),
            year: 2022,
            unit_price: 3_900,
            quantity,
            photo: None,
        }
    }

    fn period() -> RentalPeriod {
        let d = |s: &str| s.parse::<NaiveDate>().unwrap();
        RentalPeriod::new(d("2024-01-01"), d("2024-01-05")).unwrap()
    }

    #[tokio::test]
    async fn conditional_decrement_stops_at_zero() {
        let store = InMemoryRecordStore::new();
        let v = store.insert_vehicle(vehicle(1)).await.unwrap();

        let after = store.conditional_decrement_quantity(v.id).await.unwrap();
        assert_eq!(after.quantity, 0);

        let err = store.conditional_decrement_quantity(v.id).await.unwrap_err();
        assert_eq!(err, StoreError::OutOfStock(v.id));
        assert_eq!(store.get_vehicle(v.id).await.unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn quantity_ops_on_missing_vehicle_are_not_found() {
        let store = InMemoryRecordStore::new();
        let id = VehicleId::new();

        assert!(matches!(
            store.conditional_decrement_quantity(id).await,
            Err(StoreError::NotFound { kind: RecordKind::Vehicle, .. })
        ));
        assert!(matches!(
            store.increment_quantity(id).await,
            Err(StoreError::NotFound { kind: RecordKind::Vehicle, .. })
        ));
    }

    #[tokio::test]
    async fn adjust_refuses_negative_results() {
        let store = InMemoryRecordStore::new();
        let v = store.insert_vehicle(vehicle(2)).await.unwrap();

        assert_eq!(store.adjust_quantity(v.id, 3).await.unwrap().quantity, 5);
        assert_eq!(store.adjust_quantity(v.id, -6).await, Err(StoreError::OutOfStock(v.id)));
        assert_eq!(store.adjust_quantity(v.id, -5).await.unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn oversized_increments_are_constraint_errors_and_leave_store_usable() {
        let store = InMemoryRecordStore::new();
        let v = store.insert_vehicle(vehicle(MAX_QUANTITY)).await.unwrap();

        assert!(matches!(store.increment_quantity(v.id).await, Err(StoreError::Constraint(_))));
        assert!(matches!(
            store.adjust_quantity(v.id, i64::MAX).await,
            Err(StoreError::Constraint(_))
        ));
        assert_eq!(
            store.adjust_quantity(v.id, i64::MIN).await,
            Err(StoreError::OutOfStock(v.id))
        );

        let after = store.conditional_decrement_quantity(v.id).await.unwrap();
        assert_eq!(after.quantity, MAX_QUANTITY - 1);
    }

    #[tokio::test]
    async fn update_vehicle_details_keeps_stored_quantity() {
        let store = InMemoryRecordStore::new();
        let mut v = store.insert_vehicle(vehicle(4)).await.unwrap();
        v.model = "2008".to_string();
        v.quantity = 99;

        let updated = store.update_vehicle_details(v).await.unwrap();
        assert_eq!(updated.model, "2008");
        assert_eq!(updated.quantity, 4);
    }

    #[tokio::test]
    async fn referenced_records_cannot_be_deleted() {
        let store = InMemoryRecordStore::new();
        let c = store.insert_customer(customer()).await.unwrap();
        let v = store.insert_vehicle(vehicle(1)).await.unwrap();
        let r = store
            .insert_rental(NewRental {
                customer_id: c.id,
                vehicle_id: v.id,
                period: period(),
            })
            .await
            .unwrap();

        assert!(matches!(store.delete_customer(c.id).await, Err(StoreError::ForeignKey(_))));
        assert!(matches!(store.delete_vehicle(v.id).await, Err(StoreError::ForeignKey(_))));

        store.delete_rental(r.id).await.unwrap();
        store.delete_customer(c.id).await.unwrap();
        store.delete_vehicle(v.id).await.unwrap();
    }

    #[tokio::test]
    async fn rental_insert_requires_existing_references() {
        let store = InMemoryRecordStore::new();
        let v = store.insert_vehicle(vehicle(1)).await.unwrap();

        let err = store
            .insert_rental(NewRental {
                customer_id: CustomerId::new(),
                vehicle_id: v.id,
                period: period(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKey(_)));
    }

    #[tokio::test]
    async fn update_rental_enforces_date_range() {
        let store = InMemoryRecordStore::new();
        let c = store.insert_customer(customer()).await.unwrap();
        let v = store.insert_vehicle(vehicle(1)).await.unwrap();
        let r = store
            .insert_rental(NewRental {
                customer_id: c.id,
                vehicle_id: v.id,
                period: period(),
            })
            .await
            .unwrap();

        let patch = RentalPatch {
            end: Some("2023-12-01".parse().unwrap()),
            ..RentalPatch::default()
        };
        assert!(matches!(store.update_rental(r.id, patch).await, Err(StoreError::Constraint(_))));
        assert_eq!(store.get_rental(r.id).await.unwrap(), r);
    }

    #[tokio::test]
    async fn injected_fault_fires_once() {
        let store = InMemoryRecordStore::new();
        let v = store.insert_vehicle(vehicle(1)).await.unwrap();
        store.inject(StoreOp::GetVehicle, Fault::Unavailable("connection reset".to_string()));

        assert_eq!(
            store.get_vehicle(v.id).await,
            Err(StoreError::Unavailable("connection reset".to_string()))
        );
        assert!(store.get_vehicle(v.id).await.is_ok());
    }

    #[tokio::test]
    async fn injected_error_is_returned_verbatim() {
        let store = InMemoryRecordStore::new();
        let v = store.insert_vehicle(vehicle(1)).await.unwrap();
        let gone = StoreError::not_found(RecordKind::Vehicle, v.id);
        store.inject(StoreOp::IncrementQuantity, Fault::Fail(gone.clone()));

        assert_eq!(store.increment_quantity(v.id).await, Err(gone));
        assert_eq!(store.get_vehicle(v.id).await.unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn counts_cover_all_tables() {
        let store = InMemoryRecordStore::new();
        store.insert_customer(customer()).await.unwrap();
        store.insert_vehicle(vehicle(2)).await.unwrap();
        store.insert_vehicle(vehicle(3)).await.unwrap();

        let counts = store.counts().await.unwrap();
        assert_eq!(
            counts,
            StoreCounts {
                customers: 1,
                vehicles: 2,
                rentals: 0,
                units_available: 5,
            }
        );
    }
}
