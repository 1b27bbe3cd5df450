use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use fleetrent_core::{CustomerId, DomainResult, Entity, RentalId, VehicleId};

use crate::period::RentalPeriod;

/// A rental record as held by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rental {
    pub id: RentalId,
    pub customer_id: CustomerId,
    pub vehicle_id: VehicleId,
    pub period: RentalPeriod,
}

impl Entity for Rental {
    type Id = RentalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Rental {
    /// Apply `patch`, re-checking the date range of the merged result.
    pub fn patched(&self, patch: &RentalPatch) -> DomainResult<Rental> {
        let period = self.period.with_bounds(patch.start, patch.end)?;
        Ok(Rental {
            id: self.id,
            customer_id: patch.customer_id.unwrap_or(self.customer_id),
            vehicle_id: patch.vehicle_id.unwrap_or(self.vehicle_id),
            period,
        })
    }
}

/// Input for inserting a rental (identifier assigned by the store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRental {
    pub customer_id: CustomerId,
    pub vehicle_id: VehicleId,
    pub period: RentalPeriod,
}

impl NewRental {
    pub fn into_rental(self, id: RentalId) -> Rental {
        Rental {
            id,
            customer_id: self.customer_id,
            vehicle_id: self.vehicle_id,
            period: self.period,
        }
    }
}

/// Partial update of a rental; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalPatch {
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub vehicle_id: Option<VehicleId>,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl RentalPatch {
    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none()
            && self.vehicle_id.is_none()
            && self.start.is_none()
            && self.end.is_none()
    }

    /// Whether applying this patch to `rental` moves it to another vehicle.
    pub fn changes_vehicle(&self, rental: &Rental) -> bool {
        self.vehicle_id.is_some_and(|v| v != rental.vehicle_id)
    }
}
