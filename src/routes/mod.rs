use crate::models::AppState;
use axum::Router;

pub mod appointment_routes;
pub mod patient_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api", appointment_routes::router())
        .nest("/api", patient_routes::router())
        .with_state(state)
}
