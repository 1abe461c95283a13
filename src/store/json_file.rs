//! JSON-file persistence: one file per record kind, rewritten whole on every
//! mutation. Last write wins.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use super::{not_found_appointment, not_found_patient, AppointmentStore, PatientDirectory};
use crate::error::StoreError;
use crate::models::{
    validate_span, AppointmentEvent, AppointmentPatch, EventId, NewAppointment, NewPatient,
    PatientRecord, Practitioner,
};

const APPOINTMENTS_FILE: &str = "appointments.json";
const PATIENTS_FILE: &str = "patients.json";

pub struct JsonFileStore {
    dir: PathBuf,
    appointments: RwLock<Vec<AppointmentEvent>>,
    patients: RwLock<Vec<PatientRecord>>,
}

impl JsonFileStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let appointments: Vec<AppointmentEvent> = read_json(&dir.join(APPOINTMENTS_FILE)).await?;
        let patients: Vec<PatientRecord> = read_json(&dir.join(PATIENTS_FILE)).await?;

        tracing::info!(
            dir = %dir.display(),
            appointments = appointments.len(),
            patients = patients.len(),
            "json store opened"
        );

        Ok(Self {
            dir,
            appointments: RwLock::new(appointments),
            patients: RwLock::new(patients),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Appointments starting inside `[from, to]`, optionally for one practitioner.
    pub async fn list_range(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        practitioner: Option<Practitioner>,
    ) -> Vec<AppointmentEvent> {
        self.appointments
            .read()
            .await
            .iter()
            .filter(|a| from.is_none_or(|f| a.start >= f))
            .filter(|a| to.is_none_or(|t| a.start <= t))
            .filter(|a| practitioner.is_none_or(|p| a.practitioner == p))
            .cloned()
            .collect()
    }

    /// Case-insensitive substring search over patient names. Blank query
    /// returns everyone.
    pub async fn search_patients(&self, query: &str) -> Vec<PatientRecord> {
        let needle = query.trim().to_lowercase();
        self.patients
            .read()
            .await
            .iter()
            .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    async fn commit_appointments(
        &self,
        rows: &mut Vec<AppointmentEvent>,
        next: Vec<AppointmentEvent>,
    ) -> Result<(), StoreError> {
        write_json(&self.dir.join(APPOINTMENTS_FILE), &next).await?;
        *rows = next;
        Ok(())
    }
}

fn check_span(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), StoreError> {
    validate_span(start, end).map_err(|e| StoreError::Validation(e.to_string()))
}

async fn read_json<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(T::default()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl AppointmentStore for JsonFileStore {
    async fn list(&self) -> Result<Vec<AppointmentEvent>, StoreError> {
        Ok(self.appointments.read().await.clone())
    }

    async fn get(&self, id: EventId) -> Result<AppointmentEvent, StoreError> {
        self.appointments
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| not_found_appointment(id))
    }

    async fn create(&self, new: NewAppointment) -> Result<AppointmentEvent, StoreError> {
        check_span(new.start, new.end)?;

        let mut rows = self.appointments.write().await;
        let id = EventId(rows.iter().map(|a| a.id.0).max().unwrap_or(0).max(0) + 1);
        let created = AppointmentEvent::from_new(id, new);

        let mut next = rows.clone();
        next.push(created.clone());
        self.commit_appointments(&mut rows, next).await?;

        tracing::info!(appointment_id = %id, start = %created.start, "appointment created");
        Ok(created)
    }

    async fn replace(&self, id: EventId, fields: NewAppointment) -> Result<AppointmentEvent, StoreError> {
        check_span(fields.start, fields.end)?;

        let mut rows = self.appointments.write().await;
        let idx = rows
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| not_found_appointment(id))?;
        let replaced = AppointmentEvent::from_new(id, fields);

        let mut next = rows.clone();
        next[idx] = replaced.clone();
        self.commit_appointments(&mut rows, next).await?;

        tracing::info!(appointment_id = %id, "appointment replaced");
        Ok(replaced)
    }

    async fn patch(&self, id: EventId, patch: AppointmentPatch) -> Result<AppointmentEvent, StoreError> {
        let mut rows = self.appointments.write().await;
        let idx = rows
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| not_found_appointment(id))?;

        let mut updated = rows[idx].clone();
        updated
            .apply_patch(patch)
            .map_err(|e| StoreError::Validation(e.to_string()))?;

        let mut next = rows.clone();
        next[idx] = updated.clone();
        self.commit_appointments(&mut rows, next).await?;

        tracing::info!(appointment_id = %id, "appointment patched");
        Ok(updated)
    }

    async fn delete(&self, id: EventId) -> Result<(), StoreError> {
        let mut rows = self.appointments.write().await;
        let idx = rows
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| not_found_appointment(id))?;

        let mut next = rows.clone();
        next.remove(idx);
        self.commit_appointments(&mut rows, next).await?;

        tracing::info!(appointment_id = %id, "appointment deleted");
        Ok(())
    }
}

#[async_trait]
impl PatientDirectory for JsonFileStore {
    async fn list_patients(&self) -> Result<Vec<PatientRecord>, StoreError> {
        Ok(self.patients.read().await.clone())
    }

    async fn get_patient(&self, id: i64) -> Result<PatientRecord, StoreError> {
        self.patients
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| not_found_patient(id))
    }

    async fn create_patient(&self, new: NewPatient) -> Result<PatientRecord, StoreError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("patient name is required".into()));
        }

        let mut rows = self.patients.write().await;
        let id = rows.iter().map(|p| p.id).max().unwrap_or(0).max(0) + 1;
        let created = PatientRecord {
            id,
            name: name.to_string(),
            phone: new.phone.filter(|s| !s.trim().is_empty()),
            email: new.email.filter(|s| !s.trim().is_empty()),
        };

        let mut next = rows.clone();
        next.push(created.clone());
        write_json(&self.dir.join(PATIENTS_FILE), &next).await?;
        *rows = next;

        tracing::info!(patient_id = id, "patient created");
        Ok(created)
    }
}
