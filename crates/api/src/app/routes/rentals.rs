use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use fleetrent_core::RentalId;
use fleetrent_rentals::RentalPatch;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_rental).get(list_rentals))
        .route("/:id", get(get_rental).patch(update_rental).delete(delete_rental))
}

/// Reserve a unit and record the rental. `409 out_of_stock` when none is left.
pub async fn create_rental(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateRentalRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match errors::json_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    match services
        .coordinator
        .create_rental(body.customer_id, body.vehicle_id, body.start, body.end)
        .await
    {
        Ok(rental) => (StatusCode::CREATED, Json(rental)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_rentals(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::RentalListQuery>,
) -> axum::response::Response {
    let today = query.today.unwrap_or_else(|| Utc::now().date_naive());
    match services.coordinator.list_rentals(query.search.as_deref(), today).await {
        Ok(rentals) => (StatusCode::OK, Json(dto::items(rentals))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_rental(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: RentalId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match services.coordinator.get_rental(id).await {
        Ok(rental) => (StatusCode::OK, Json(rental)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_rental(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<RentalPatch>, JsonRejection>,
) -> axum::response::Response {
    let id: RentalId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let body = match errors::json_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    match services.coordinator.update_rental(id, body).await {
        Ok(rental) => (StatusCode::OK, Json(rental)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Delete the rental and give its unit back.
pub async fn delete_rental(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: RentalId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match services.coordinator.delete_rental(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
