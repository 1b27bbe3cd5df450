//! Rental coordinator: creates, edits and deletes rentals while keeping the
//! inventory ledger consistent with them.
//!
//! ## Create
//!
//! ```text
//! validate period (no store contact)
//!   ↓
//! customer exists? vehicle exists?
//!   ↓
//! ledger.reserve(vehicle)          ── OutOfStock stops here
//!   ↓
//! insert rental ── fails ──> ledger.release(vehicle)  (compensation)
//!   ↓
//! rental
//! ```
//!
//! ## Delete
//!
//! The rental record goes first and the unit is released afterwards, so a
//! failed delete can never hand out a unit that is still rented. If the
//! release then fails the caller gets `ReleaseFailed` naming both records.
//!
//! ## Edit
//!
//! Moving a rental to another vehicle does not touch either vehicle's
//! quantity. The change is logged at `warn` so it can be reconciled with
//! `restock`.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use fleetrent_core::{CustomerId, IdOrder, RentalId, VehicleId, sort_by_id};
use fleetrent_customers::Customer;
use fleetrent_fleet::Vehicle;
use fleetrent_rentals::{NewRental, Rental, RentalPatch, RentalPeriod, RentalPhase};

use crate::deadline::bounded;
use crate::error::{ServiceError, ServiceResult};
use crate::ledger::InventoryLedger;
use crate::store::RecordStore;

/// A rental joined with the records it references, as shown in listings.
///
/// A reference that could not be resolved is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RentalDetails {
    #[serde(flatten)]
    pub rental: Rental,
    pub customer: Option<Customer>,
    pub vehicle: Option<Vehicle>,
    pub phase: RentalPhase,
}

impl RentalDetails {
    /// Case-insensitive match on vehicle make/model and customer names.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        let vehicle_hit = self.vehicle.as_ref().is_some_and(|v| v.matches(&term));
        let customer_hit = self.customer.as_ref().is_some_and(|c| {
            c.last_name.to_lowercase().contains(&term) || c.first_name.to_lowercase().contains(&term)
        });
        vehicle_hit || customer_hit
    }
}

pub struct RentalCoordinator<S> {
    ledger: InventoryLedger<S>,
}

impl<S: RecordStore> RentalCoordinator<S> {
    pub fn new(ledger: InventoryLedger<S>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &InventoryLedger<S> {
        &self.ledger
    }

    fn store(&self) -> &S {
        self.ledger.store()
    }

    /// Book `vehicle_id` for `customer_id` from `start` to `end` inclusive.
    #[instrument(
        skip(self),
        fields(customer_id = %customer_id, vehicle_id = %vehicle_id),
        err
    )]
    pub async fn create_rental(
        &self,
        customer_id: CustomerId,
        vehicle_id: VehicleId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ServiceResult<Rental> {
        let period = RentalPeriod::new(start, end)?;
        let timeout = self.ledger.call_timeout();

        bounded("get_customer", timeout, self.store().get_customer(customer_id)).await?;
        bounded("get_vehicle", timeout, self.store().get_vehicle(vehicle_id)).await?;

        self.ledger.reserve(vehicle_id).await?;

        let inserted = bounded(
            "insert_rental",
            timeout,
            self.store().insert_rental(NewRental {
                customer_id,
                vehicle_id,
                period,
            }),
        )
        .await;

        match inserted {
            Ok(rental) => {
                info!(rental_id = %rental.id, "rental created");
                Ok(rental)
            }
            Err(original) => Err(self.compensate(vehicle_id, original).await),
        }
    }

    /// Undo a reservation after a later step failed.
    async fn compensate(&self, vehicle_id: VehicleId, original: ServiceError) -> ServiceError {
        match self.ledger.release(vehicle_id).await {
            Ok(quantity) => {
                warn!(%vehicle_id, quantity, error = %original, "rental insert failed; reservation released");
                original
            }
            Err(compensation) => {
                error!(
                    %vehicle_id,
                    error = %original,
                    compensation_error = %compensation,
                    "rental insert failed and the reservation could not be released"
                );
                ServiceError::CompensationFailed {
                    original: Box::new(original),
                    compensation: Box::new(compensation),
                }
            }
        }
    }

    /// Edit the customer, vehicle or dates of a rental.
    ///
    /// The merged date range is checked before anything is written. Quantity
    /// is left alone even when the vehicle changes.
    #[instrument(skip(self, patch), fields(rental_id = %rental_id), err)]
    pub async fn update_rental(&self, rental_id: RentalId, patch: RentalPatch) -> ServiceResult<Rental> {
        let timeout = self.ledger.call_timeout();
        let current = bounded("get_rental", timeout, self.store().get_rental(rental_id)).await?;
        if patch.is_empty() {
            return Ok(current);
        }

        current.patched(&patch)?;

        if let Some(customer_id) = patch.customer_id.filter(|c| *c != current.customer_id) {
            bounded("get_customer", timeout, self.store().get_customer(customer_id)).await?;
        }
        if let Some(vehicle_id) = patch.vehicle_id.filter(|_| patch.changes_vehicle(&current)) {
            bounded("get_vehicle", timeout, self.store().get_vehicle(vehicle_id)).await?;
            warn!(
                from_vehicle = %current.vehicle_id,
                to_vehicle = %vehicle_id,
                "rental moved to another vehicle; quantities not adjusted"
            );
        }

        bounded("update_rental", timeout, self.store().update_rental(rental_id, patch)).await
    }

    /// Delete a rental and give its unit back.
    #[instrument(skip(self), fields(rental_id = %rental_id), err)]
    pub async fn delete_rental(&self, rental_id: RentalId) -> ServiceResult<()> {
        let timeout = self.ledger.call_timeout();
        let rental = bounded("get_rental", timeout, self.store().get_rental(rental_id)).await?;

        bounded("delete_rental", timeout, self.store().delete_rental(rental_id)).await?;

        match self.ledger.release(rental.vehicle_id).await {
            Ok(_) => {
                info!(vehicle_id = %rental.vehicle_id, "rental deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!(vehicle_id = %rental.vehicle_id, "rental deleted; its vehicle no longer exists");
                Ok(())
            }
            Err(e) => {
                error!(vehicle_id = %rental.vehicle_id, error = %e, "rental deleted but unit not released");
                Err(ServiceError::ReleaseFailed {
                    rental_id,
                    vehicle_id: rental.vehicle_id,
                    source: Box::new(e),
                })
            }
        }
    }

    pub async fn get_rental(&self, rental_id: RentalId) -> ServiceResult<Rental> {
        bounded(
            "get_rental",
            self.ledger.call_timeout(),
            self.store().get_rental(rental_id),
        )
        .await
    }

    /// All rentals, newest first, joined with their customer and vehicle.
    ///
    /// `search` filters case-insensitively on vehicle make/model and customer
    /// last/first name; `today` decides each rental's phase.
    #[instrument(skip(self), err)]
    pub async fn list_rentals(&self, search: Option<&str>, today: NaiveDate) -> ServiceResult<Vec<RentalDetails>> {
        let timeout = self.ledger.call_timeout();
        let mut rentals = bounded("list_rentals", timeout, self.store().list_rentals()).await?;
        let customers = bounded("list_customers", timeout, self.store().list_customers()).await?;
        let vehicles = bounded("list_vehicles", timeout, self.store().list_vehicles()).await?;

        sort_by_id(&mut rentals, IdOrder::NewestFirst);

        let details = rentals
            .into_iter()
            .map(|rental| RentalDetails {
                customer: customers.iter().find(|c| c.id == rental.customer_id).cloned(),
                vehicle: vehicles.iter().find(|v| v.id == rental.vehicle_id).cloned(),
                phase: rental.period.phase(today),
                rental,
            })
            .filter(|d| search.is_none_or(|term| d.matches(term)))
            .collect();
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use fleetrent_customers::NewCustomer;
    use fleetrent_fleet::NewVehicle;

    use super::*;
    use crate::error::ErrorKind;
    use crate::store::{Fault, InMemoryRecordStore, RecordKind, StoreError, StoreOp};

    struct Fixture {
        store: Arc<InMemoryRecordStore>,
        coordinator: RentalCoordinator<Arc<InMemoryRecordStore>>,
        customer: CustomerId,
        vehicle: VehicleId,
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    async fn fixture(quantity: u32) -> Fixture {
        let store = Arc::new(InMemoryRecordStore::new());
        let customer = store
            .insert_customer(NewCustomer {
                last_name: "Durand".into(),
                first_name: "Alice".into(),
                email: "alice@example.com".into(),
                phone: "0600000000".into(),
            })
            .await
            .unwrap();
        let vehicle = store
            .insert_vehicle(NewVehicle {
                make: "Peugeot".into(),
                model: "208".into(),
                year: 2022,
                unit_price: 1_800_000,
                quantity,
                photo: None,
            })
            .await
            .unwrap();
        let ledger = InventoryLedger::new(Arc::clone(&store), Duration::from_secs(1));
        Fixture {
            coordinator: RentalCoordinator::new(ledger),
            store,
            customer: customer.id,
            vehicle: vehicle.id,
        }
    }

    impl Fixture {
        async fn quantity(&self) -> u32 {
            self.store.get_vehicle(self.vehicle).await.unwrap().quantity
        }

        async fn create(&self) -> ServiceResult<Rental> {
            self.coordinator
                .create_rental(self.customer, self.vehicle, day("2024-06-01"), day("2024-06-07"))
                .await
        }
    }

    #[tokio::test]
    async fn create_reserves_and_delete_releases() {
        let f = fixture(2).await;
        let rental = f.create().await.unwrap();
        assert_eq!(f.quantity().await, 1);
        assert_eq!(rental.period.days(), 7);

        f.coordinator.delete_rental(rental.id).await.unwrap();
        assert_eq!(f.quantity().await, 2);
        let err = f.coordinator.get_rental(rental.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn reversed_dates_touch_nothing() {
        let f = fixture(1).await;
        // Any store contact would consume this fault and fail differently.
        f.store.inject(StoreOp::GetCustomer, Fault::Unavailable("contacted".into()));
        let err = f
            .coordinator
            .create_rental(f.customer, f.vehicle, day("2024-06-07"), day("2024-06-01"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDateRange);
        f.store.get_customer(f.customer).await.unwrap_err();
        assert_eq!(f.quantity().await, 1);
        assert_eq!(f.store.counts().await.unwrap().rentals, 0);
    }

    #[tokio::test]
    async fn unknown_references_are_not_found() {
        let f = fixture(1).await;
        let err = f
            .coordinator
            .create_rental(CustomerId::new(), f.vehicle, day("2024-06-01"), day("2024-06-01"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = f
            .coordinator
            .create_rental(f.customer, VehicleId::new(), day("2024-06-01"), day("2024-06-01"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(f.quantity().await, 1);
    }

    #[tokio::test]
    async fn failed_insert_releases_the_reservation() {
        let f = fixture(1).await;
        f.store.inject(StoreOp::InsertRental, Fault::Unavailable("insert lost".into()));
        let err = f.create().await.unwrap_err();
        assert_eq!(err, ServiceError::StoreUnavailable("insert lost".into()));
        assert_eq!(f.quantity().await, 1);
    }

    #[tokio::test]
    async fn failed_compensation_reports_both_failures() {
        let f = fixture(1).await;
        f.store.inject(StoreOp::InsertRental, Fault::Unavailable("insert lost".into()));
        f.store.inject(StoreOp::IncrementQuantity, Fault::Unavailable("release lost".into()));
        let err = f.create().await.unwrap_err();
        match &err {
            ServiceError::CompensationFailed { original, compensation } => {
                assert_eq!(**original, ServiceError::StoreUnavailable("insert lost".into()));
                assert_eq!(**compensation, ServiceError::StoreUnavailable("release lost".into()));
            }
            other => panic!("expected CompensationFailed, got {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert_eq!(f.quantity().await, 0);
    }

    #[tokio::test]
    async fn delete_unknown_rental_is_not_found() {
        let f = fixture(1).await;
        let err = f.coordinator.delete_rental(RentalId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(f.quantity().await, 1);
    }

    #[tokio::test]
    async fn failed_record_delete_keeps_the_unit_out() {
        let f = fixture(1).await;
        let rental = f.create().await.unwrap();
        f.store.inject(StoreOp::DeleteRental, Fault::Unavailable("down".into()));
        let err = f.coordinator.delete_rental(rental.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert_eq!(f.quantity().await, 0);
        assert!(f.coordinator.get_rental(rental.id).await.is_ok());
    }

    #[tokio::test]
    async fn failed_release_after_delete_names_both_records() {
        let f = fixture(1).await;
        let rental = f.create().await.unwrap();
        f.store.inject(StoreOp::IncrementQuantity, Fault::Unavailable("down".into()));
        let err = f.coordinator.delete_rental(rental.id).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::ReleaseFailed {
                rental_id: rental.id,
                vehicle_id: f.vehicle,
                source: Box::new(ServiceError::StoreUnavailable("down".into())),
            }
        );
    }

    #[tokio::test]
    async fn release_of_vanished_vehicle_still_deletes() {
        let f = fixture(1).await;
        let rental = f.create().await.unwrap();
        f.store.inject(
            StoreOp::IncrementQuantity,
            Fault::Fail(StoreError::not_found(RecordKind::Vehicle, f.vehicle)),
        );

        assert_eq!(f.coordinator.delete_rental(rental.id).await, Ok(()));
        let err = f.coordinator.get_rental(rental.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        // The unit was never returned.
        assert_eq!(f.quantity().await, 0);
    }

    #[tokio::test]
    async fn update_revalidates_merged_dates() {
        let f = fixture(1).await;
        let rental = f.create().await.unwrap();
        let err = f
            .coordinator
            .update_rental(
                rental.id,
                RentalPatch {
                    end: Some(day("2024-05-01")),
                    ..RentalPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDateRange);

        let updated = f
            .coordinator
            .update_rental(
                rental.id,
                RentalPatch {
                    end: Some(day("2024-06-10")),
                    ..RentalPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.period.end(), day("2024-06-10"));
        assert_eq!(updated.period.start(), day("2024-06-01"));
    }

    #[tokio::test]
    async fn changing_vehicle_leaves_quantities_alone() {
        let f = fixture(1).await;
        let other = f
            .store
            .insert_vehicle(NewVehicle {
                make: "Citroen".into(),
                model: "C3".into(),
                year: 2020,
                unit_price: 1_200_000,
                quantity: 3,
                photo: None,
            })
            .await
            .unwrap();
        let rental = f.create().await.unwrap();

        let moved = f
            .coordinator
            .update_rental(
                rental.id,
                RentalPatch {
                    vehicle_id: Some(other.id),
                    ..RentalPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.vehicle_id, other.id);
        assert_eq!(f.quantity().await, 0);
        assert_eq!(f.store.get_vehicle(other.id).await.unwrap().quantity, 3);

        let err = f
            .coordinator
            .update_rental(
                rental.id,
                RentalPatch {
                    vehicle_id: Some(VehicleId::new()),
                    ..RentalPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn listing_joins_records_and_filters() {
        let f = fixture(2).await;
        let rental = f.create().await.unwrap();

        let all = f.coordinator.list_rentals(None, day("2024-06-03")).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].rental, rental);
        assert_eq!(all[0].phase, RentalPhase::Ongoing);
        assert_eq!(all[0].customer.as_ref().map(|c| c.last_name.as_str()), Some("Durand"));
        assert_eq!(all[0].vehicle.as_ref().map(|v| v.model.as_str()), Some("208"));

        let by_make = f.coordinator.list_rentals(Some("peug"), day("2024-07-01")).await.unwrap();
        assert_eq!(by_make.len(), 1);
        assert_eq!(by_make[0].phase, RentalPhase::Ended);

        let by_name = f.coordinator.list_rentals(Some("ALICE"), day("2024-07-01")).await.unwrap();
        assert_eq!(by_name.len(), 1);

        let none = f.coordinator.list_rentals(Some("tesla"), day("2024-07-01")).await.unwrap();
        assert!(none.is_empty());
    }
}
