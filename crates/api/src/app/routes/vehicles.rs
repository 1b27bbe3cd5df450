use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use fleetrent_core::VehicleId;
use fleetrent_fleet::{NewVehicle, VehiclePatch};
use fleetrent_infra::VehicleFilter;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_vehicle).get(list_vehicles))
        .route("/:id", get(get_vehicle).patch(update_vehicle).delete(delete_vehicle))
        .route("/:id/availability", get(availability))
        .route("/:id/restock", post(restock))
}

pub async fn create_vehicle(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewVehicle>, JsonRejection>,
) -> axum::response::Response {
    let body = match errors::json_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    match services.directory.create_vehicle(body).await {
        Ok(vehicle) => (StatusCode::CREATED, Json(vehicle)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// `?search=` filters on make/model; `?available=true` keeps vehicles with
/// units on hand.
pub async fn list_vehicles(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::VehicleListQuery>,
) -> axum::response::Response {
    let filter = VehicleFilter {
        search: query.search,
        available_only: query.available,
    };
    match services.directory.list_vehicles(&filter).await {
        Ok(vehicles) => (StatusCode::OK, Json(dto::items(vehicles))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_vehicle(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: VehicleId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match services.directory.get_vehicle(id).await {
        Ok(vehicle) => (StatusCode::OK, Json(vehicle)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_vehicle(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<VehiclePatch>, JsonRejection>,
) -> axum::response::Response {
    let id: VehicleId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let body = match errors::json_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    match services.directory.update_vehicle(id, body).await {
        Ok(vehicle) => (StatusCode::OK, Json(vehicle)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_vehicle(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: VehicleId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match services.directory.delete_vehicle(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn availability(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let vehicle_id: VehicleId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match services.ledger().available(vehicle_id).await {
        Ok(quantity) => (StatusCode::OK, Json(dto::QuantityResponse { vehicle_id, quantity })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Signed stock correction: `{ "delta": 2 }` adds two units, `-1` removes one.
pub async fn restock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::RestockRequest>, JsonRejection>,
) -> axum::response::Response {
    let vehicle_id: VehicleId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let body = match errors::json_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    match services.ledger().restock(vehicle_id, body.delta).await {
        Ok(quantity) => (StatusCode::OK, Json(dto::QuantityResponse { vehicle_id, quantity })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
