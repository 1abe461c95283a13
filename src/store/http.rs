//! Client for a remote store service speaking the `/api` JSON routes.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{not_found_appointment, not_found_patient, AppointmentStore, PatientDirectory};
use crate::error::{ErrorResponse, StoreError};
use crate::models::{
    ApiOk, AppointmentEvent, AppointmentPatch, EventId, NewAppointment, NewPatient, OkData,
    PatientRecord,
};

#[derive(Clone)]
pub struct HttpStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let resp = self.client.get(self.url(path)).send().await?;
        decode(resp).await
    }

    async fn send_json<B, T>(&self, method: reqwest::Method, path: &str, body: &B) -> Result<T, StoreError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .client
            .request(method, self.url(path))
            .json(body)
            .send()
            .await?;
        decode(resp).await
    }
}

/// Unwraps the `{ "data": ... }` envelope, or turns an error envelope into
/// `StoreError::Rejected`.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, StoreError> {
    let status = resp.status();
    if status.is_success() {
        let body: ApiOk<T> = resp.json().await?;
        return Ok(body.data);
    }

    let bytes = resp.bytes().await?;
    let (code, message) = match serde_json::from_slice::<ErrorResponse>(&bytes) {
        Ok(err) => (err.error.code, err.error.message),
        Err(_) => (
            "HTTP_ERROR".to_string(),
            String::from_utf8_lossy(&bytes).into_owned(),
        ),
    };
    Err(StoreError::Rejected {
        status: status.as_u16(),
        code,
        message,
    })
}

fn is_not_found(e: &StoreError) -> bool {
    matches!(e, StoreError::Rejected { status, .. } if *status == StatusCode::NOT_FOUND.as_u16())
}

fn on_appointment(id: EventId) -> impl FnOnce(StoreError) -> StoreError {
    move |e| if is_not_found(&e) { not_found_appointment(id) } else { e }
}

#[async_trait]
impl AppointmentStore for HttpStore {
    async fn list(&self) -> Result<Vec<AppointmentEvent>, StoreError> {
        self.get_json("/appointments").await
    }

    async fn get(&self, id: EventId) -> Result<AppointmentEvent, StoreError> {
        self.get_json(&format!("/appointments/{id}"))
            .await
            .map_err(on_appointment(id))
    }

    async fn create(&self, new: NewAppointment) -> Result<AppointmentEvent, StoreError> {
        self.send_json(reqwest::Method::POST, "/appointments", &new).await
    }

    async fn replace(&self, id: EventId, fields: NewAppointment) -> Result<AppointmentEvent, StoreError> {
        self.send_json(reqwest::Method::PUT, &format!("/appointments/{id}"), &fields)
            .await
            .map_err(on_appointment(id))
    }

    async fn patch(&self, id: EventId, patch: AppointmentPatch) -> Result<AppointmentEvent, StoreError> {
        self.send_json(reqwest::Method::PATCH, &format!("/appointments/{id}"), &patch)
            .await
            .map_err(on_appointment(id))
    }

    async fn delete(&self, id: EventId) -> Result<(), StoreError> {
        let resp = self
            .client
            .delete(self.url(&format!("/appointments/{id}")))
            .send()
            .await?;
        let _: OkData = decode(resp).await.map_err(on_appointment(id))?;
        Ok(())
    }
}

#[async_trait]
impl PatientDirectory for HttpStore {
    async fn list_patients(&self) -> Result<Vec<PatientRecord>, StoreError> {
        self.get_json("/patients").await
    }

    async fn get_patient(&self, id: i64) -> Result<PatientRecord, StoreError> {
        self.get_json(&format!("/patients/{id}"))
            .await
            .map_err(|e| if is_not_found(&e) { not_found_patient(id) } else { e })
    }

    async fn create_patient(&self, new: NewPatient) -> Result<PatientRecord, StoreError> {
        self.send_json(reqwest::Method::POST, "/patients", &new).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppState, AppointmentType, Practitioner};
    use crate::routes;
    use crate::store::JsonFileStore;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    async fn spawn_service() -> (HttpStore, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(tmp.path()).await.unwrap();
        let app = routes::router(AppState {
            store: Arc::new(store),
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (HttpStore::new(&format!("http://{addr}/")), tmp)
    }

    fn new_appt() -> NewAppointment {
        let start = Utc.with_ymd_and_hms(2025, 3, 5, 10, 0, 0).unwrap();
        NewAppointment {
            title: "Untitled — Procedure".into(),
            start,
            end: start + Duration::minutes(30),
            patient_name: String::new(),
            patient_id: None,
            practitioner: Practitioner::NurseKim,
            appointment_type: AppointmentType::Procedure,
            reception_notes: None,
            clinical_notes: Some("sutures".into()),
        }
    }

    #[tokio::test]
    async fn test_crud_over_http() {
        let (store, _tmp) = spawn_service().await;
        assert!(!store.base_url().ends_with('/'));

        let created = store.create(new_appt()).await.unwrap();
        assert_eq!(created.id, EventId(1));

        let moved = store
            .patch(
                created.id,
                AppointmentPatch::timing(created.start + Duration::hours(4), created.end + Duration::hours(4)),
            )
            .await
            .unwrap();
        assert_eq!(moved.clinical_notes.as_deref(), Some("sutures"));
        assert_eq!(store.get(created.id).await.unwrap(), moved);

        let mut fields = moved.to_new();
        fields.practitioner = Practitioner::DrLee;
        let replaced = store.replace(created.id, fields).await.unwrap();
        assert_eq!(replaced.practitioner, Practitioner::DrLee);

        assert_eq!(store.list().await.unwrap().len(), 1);
        store.delete(created.id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_errors_are_mapped() {
        let (store, _tmp) = spawn_service().await;
        assert!(matches!(
            store.patch(EventId(42), AppointmentPatch::default()).await,
            Err(StoreError::NotFound { id: 42, .. })
        ));
        assert!(matches!(
            store.get_patient(3).await,
            Err(StoreError::NotFound { entity: "patient", id: 3 })
        ));

        let mut bad = new_appt();
        bad.end = bad.start;
        match store.create(bad).await {
            Err(StoreError::Rejected { status, code, .. }) => {
                assert_eq!(status, 400);
                assert_eq!(code, "VALIDATION_ERROR");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_patients_over_http() {
        let (store, _tmp) = spawn_service().await;
        let p = store
            .create_patient(NewPatient {
                name: "Hannah Wu".into(),
                phone: Some("0400 000 000".into()),
                email: None,
            })
            .await
            .unwrap();
        assert_eq!(store.get_patient(p.id).await.unwrap(), p);
        assert_eq!(store.list_patients().await.unwrap(), vec![p]);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        // nothing listens on the discard port
        let store = HttpStore::new("http://127.0.0.1:9");
        assert!(matches!(store.list().await, Err(StoreError::Http(_))));
    }
}
