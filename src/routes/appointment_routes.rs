// src/routes/appointment_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    error::ApiError,
    models::{
        validate_span, ApiOk, AppState, AppointmentEvent, AppointmentPatch, EventId,
        NewAppointment, OkData, Practitioner, PractitionerInfo,
    },
    store::AppointmentStore,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments).post(create_appointment))
        .route(
            "/appointments/{appointment_id}",
            get(get_appointment)
                .put(replace_appointment)
                .patch(patch_appointment)
                .delete(delete_appointment),
        )
        .route("/practitioners", get(list_practitioners))
}

/* ============================================================
   Query params
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub practitioner: Option<String>,
}

fn validate_fields(req: &NewAppointment) -> Result<(), ApiError> {
    validate_span(req.start, req.end).map_err(|e| ApiError::validation(e.to_string()))
}

/* ============================================================
   GET /appointments
   ============================================================ */

pub async fn list_appointments(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiOk<Vec<AppointmentEvent>>>, ApiError> {
    if let (Some(from), Some(to)) = (q.from, q.to) {
        if to < from {
            return Err(ApiError::validation("to must not be before from"));
        }
    }

    let practitioner = match q.practitioner.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(p) if p.eq_ignore_ascii_case("all") => None,
        Some(p) => Some(
            p.parse::<Practitioner>()
                .map_err(|e| ApiError::validation(e.to_string()))?,
        ),
    };

    let rows = state.store.list_range(q.from, q.to, practitioner).await;
    Ok(Json(ApiOk { data: rows }))
}

/* ============================================================
   GET /appointments/{id}
   ============================================================ */

pub async fn get_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<ApiOk<AppointmentEvent>>, ApiError> {
    let row = state.store.get(EventId(appointment_id)).await?;
    Ok(Json(ApiOk { data: row }))
}

/* ============================================================
   POST /appointments (create)
   ============================================================ */

pub async fn create_appointment(
    State(state): State<AppState>,
    Json(req): Json<NewAppointment>,
) -> Result<Json<ApiOk<AppointmentEvent>>, ApiError> {
    validate_fields(&req)?;
    let row = state.store.create(req).await?;
    Ok(Json(ApiOk { data: row }))
}

/* ============================================================
   PUT /appointments/{id} (replace all fields)
   ============================================================ */

pub async fn replace_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<i64>,
    Json(req): Json<NewAppointment>,
) -> Result<Json<ApiOk<AppointmentEvent>>, ApiError> {
    validate_fields(&req)?;
    let row = state.store.replace(EventId(appointment_id), req).await?;
    Ok(Json(ApiOk { data: row }))
}

/* ============================================================
   PATCH /appointments/{id}
   ============================================================ */

pub async fn patch_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<i64>,
    Json(req): Json<AppointmentPatch>,
) -> Result<Json<ApiOk<AppointmentEvent>>, ApiError> {
    let row = state.store.patch(EventId(appointment_id), req).await?;
    Ok(Json(ApiOk { data: row }))
}

/* ============================================================
   DELETE /appointments/{id}
   ============================================================ */

pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<ApiOk<OkData>>, ApiError> {
    state.store.delete(EventId(appointment_id)).await?;
    Ok(Json(ApiOk {
        data: OkData { ok: true },
    }))
}

/* ============================================================
   GET /practitioners
   ============================================================ */

pub async fn list_practitioners() -> Json<ApiOk<Vec<PractitionerInfo>>> {
    Json(ApiOk {
        data: Practitioner::ALL.into_iter().map(Practitioner::info).collect(),
    })
}
