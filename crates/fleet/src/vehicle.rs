use serde::{Deserialize, Serialize};

use fleetrent_core::{DomainError, DomainResult, Entity, FieldErrors, VehicleId};

/// Oldest accepted model year.
pub const MIN_MODEL_YEAR: u16 = 1886;
/// Newest accepted model year.
pub const MAX_MODEL_YEAR: u16 = 9999;
/// Largest on-hand count any record store accepts (a Postgres `INTEGER`).
pub const MAX_QUANTITY: u32 = i32::MAX as u32;

/// A vehicle record as held by the record store.
///
/// `quantity` is the number of units currently on hand (not rented out). Only
/// the inventory ledger changes it once the record exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub make: String,
    pub model: String,
    pub year: u16,
    /// Price per rental unit, in minor currency units.
    pub unit_price: u64,
    pub quantity: u32,
    pub photo: Option<String>,
}

impl Entity for Vehicle {
    type Id = VehicleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Vehicle {
    /// "Make Model", the label used in rental pickers and listings.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.make, self.model)
    }

    pub fn is_available(&self) -> bool {
        self.quantity > 0
    }

    /// Case-insensitive match of `term` against make and model.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.make.to_lowercase().contains(&term)
            || self.model.to_lowercase().contains(&term)
    }

    /// Merge descriptive fields from `patch`; quantity is left untouched.
    pub fn patched(&self, patch: &VehiclePatch) -> DomainResult<Vehicle> {
        let photo = match &patch.photo {
            Some(p) => normalize_photo(p.clone()),
            None => self.photo.clone(),
        };
        let merged = NewVehicle {
            make: patch.make.clone().unwrap_or_else(|| self.make.clone()),
            model: patch.model.clone().unwrap_or_else(|| self.model.clone()),
            year: patch.year.unwrap_or(self.year),
            unit_price: patch.unit_price.unwrap_or(self.unit_price),
            quantity: self.quantity,
            photo,
        }
        .validated()?;

        Ok(merged.into_vehicle(self.id))
    }
}

/// Input for creating a vehicle (identifier assigned by the store).
///
/// `quantity` is the nominal stock the vehicle enters the fleet with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVehicle {
    pub make: String,
    pub model: String,
    pub year: u16,
    #[serde(default)]
    pub unit_price: u64,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub photo: Option<String>,
}

impl NewVehicle {
    /// Check every field and return a trimmed copy.
    pub fn validated(self) -> DomainResult<NewVehicle> {
        let candidate = NewVehicle {
            make: self.make.trim().to_string(),
            model: self.model.trim().to_string(),
            year: self.year,
            unit_price: self.unit_price,
            quantity: self.quantity,
            photo: self.photo.and_then(normalize_photo),
        };

        let mut errors = FieldErrors::new();
        errors.require("make", &candidate.make);
        errors.require("model", &candidate.model);
        if !(MIN_MODEL_YEAR..=MAX_MODEL_YEAR).contains(&candidate.year) {
            errors.push(
                "year",
                format!("must be between {MIN_MODEL_YEAR} and {MAX_MODEL_YEAR}"),
            );
        }
        if candidate.quantity > MAX_QUANTITY {
            errors.push("quantity", format!("cannot exceed {MAX_QUANTITY}"));
        }
        errors.into_result()?;

        Ok(candidate)
    }

    pub fn into_vehicle(self, id: VehicleId) -> Vehicle {
        Vehicle {
            id,
            make: self.make,
            model: self.model,
            year: self.year,
            unit_price: self.unit_price,
            quantity: self.quantity,
            photo: self.photo,
        }
    }
}

/// Partial update of a vehicle's descriptive fields.
///
/// There is deliberately no quantity field: stock only moves through the
/// ledger. An empty `photo` string clears the photo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehiclePatch {
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub unit_price: Option<u64>,
    #[serde(default)]
    pub photo: Option<String>,
}

fn normalize_photo(photo: String) -> Option<String> {
    let trimmed = photo.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Outcome of applying a signed delta to a quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StockChange {
    Applied(u32),
    /// The delta would take the quantity below zero or past `MAX_QUANTITY`.
    Rejected,
}

/// Stock arithmetic shared by every record store: the new quantity, or
/// `Rejected` when the result would not be a valid on-hand count.
pub fn apply_stock_delta(quantity: u32, delta: i64) -> StockChange {
    let next = i64::from(quantity)
        .checked_add(delta)
        .and_then(|next| u32::try_from(next).ok());
    match next {
        Some(q) if q <= MAX_QUANTITY => StockChange::Applied(q),
        _ => StockChange::Rejected,
    }
}

/// Validate a manual stock correction before it reaches the store.
pub fn ensure_nonzero_delta(delta: i64) -> DomainResult<()> {
    if delta == 0 {
        return Err(DomainError::validation("delta cannot be zero"));
    }
    Ok(())
}
