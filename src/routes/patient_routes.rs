// src/routes/patient_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::ApiError,
    models::{ApiOk, AppState, NewPatient, PatientRecord},
    store::PatientDirectory,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients", get(search_patients).post(create_patient))
        .route("/patients/{patient_id}", get(get_patient))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

pub async fn search_patients(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<ApiOk<Vec<PatientRecord>>>, ApiError> {
    let query = q.query.unwrap_or_default();
    let rows = state.store.search_patients(&query).await;
    Ok(Json(ApiOk { data: rows }))
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<i64>,
) -> Result<Json<ApiOk<PatientRecord>>, ApiError> {
    let row = state.store.get_patient(patient_id).await?;
    Ok(Json(ApiOk { data: row }))
}

pub async fn create_patient(
    State(state): State<AppState>,
    Json(req): Json<NewPatient>,
) -> Result<Json<ApiOk<PatientRecord>>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::validation("name is required"));
    }
    let row = state.store.create_patient(req).await?;
    Ok(Json(ApiOk { data: row }))
}
