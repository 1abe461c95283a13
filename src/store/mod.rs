//! Persistence seam for appointments and patients.
//!
//! The calendar only ever talks to these traits; the service binary backs
//! them with JSON files and remote clients reach it through [`HttpStore`].

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{AppointmentEvent, AppointmentPatch, EventId, NewAppointment, NewPatient, PatientRecord};

pub mod http;
pub mod json_file;

pub use http::HttpStore;
pub use json_file::JsonFileStore;

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn list(&self) -> Result<Vec<AppointmentEvent>, StoreError>;

    async fn get(&self, id: EventId) -> Result<AppointmentEvent, StoreError>;

    async fn create(&self, new: NewAppointment) -> Result<AppointmentEvent, StoreError>;

    /// Overwrites every field of an existing appointment.
    async fn replace(&self, id: EventId, fields: NewAppointment) -> Result<AppointmentEvent, StoreError>;

    async fn patch(&self, id: EventId, patch: AppointmentPatch) -> Result<AppointmentEvent, StoreError>;

    async fn delete(&self, id: EventId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn list_patients(&self) -> Result<Vec<PatientRecord>, StoreError>;

    async fn get_patient(&self, id: i64) -> Result<PatientRecord, StoreError>;

    async fn create_patient(&self, new: NewPatient) -> Result<PatientRecord, StoreError>;
}

/// Both halves of the backing service.
pub trait ClinicStore: AppointmentStore + PatientDirectory {}

impl<T: AppointmentStore + PatientDirectory> ClinicStore for T {}

pub(crate) fn not_found_appointment(id: EventId) -> StoreError {
    StoreError::NotFound {
        entity: "appointment",
        id: id.0,
    }
}

pub(crate) fn not_found_patient(id: i64) -> StoreError {
    StoreError::NotFound { entity: "patient", id }
}
