use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use fleetrent_core::{CustomerId, VehicleId};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRentalRequest {
    pub customer_id: CustomerId,
    pub vehicle_id: VehicleId,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestockRequest {
    pub delta: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehicleListQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub available: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RentalListQuery {
    pub search: Option<String>,
    /// Reference day for each rental's phase; defaults to today (UTC).
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuantityResponse {
    pub vehicle_id: VehicleId,
    pub quantity: u32,
}

/// Wrap a listing the way every list endpoint answers: `{ "items": [...] }`.
pub fn items<T: Serialize>(items: Vec<T>) -> serde_json::Value {
    serde_json::json!({ "items": items })
}
