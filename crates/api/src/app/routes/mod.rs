use axum::{Router, routing::get};

pub mod customers;
pub mod rentals;
pub mod system;
pub mod vehicles;

/// Router for every record endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/stats", get(system::stats))
        .nest("/customers", customers::router())
        .nest("/vehicles", vehicles::router())
        .nest("/rentals", rentals::router())
}
