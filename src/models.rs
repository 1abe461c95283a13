use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;
use crate::store::JsonFileStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JsonFileStore>,
}

/* -------------------------
   Identifiers & enumerations
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value: {}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Practitioners the clinic books against. The set is closed, so an "All"
/// facet always covers every appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Practitioner {
    DrLee,
    DrSingh,
    NurseKim,
}

impl Practitioner {
    pub const ALL: [Practitioner; 3] = [Practitioner::DrLee, Practitioner::DrSingh, Practitioner::NurseKim];

    pub fn id(self) -> &'static str {
        match self {
            Practitioner::DrLee => "dr_lee",
            Practitioner::DrSingh => "dr_singh",
            Practitioner::NurseKim => "nurse_kim",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Practitioner::DrLee => "Dr Lee",
            Practitioner::DrSingh => "Dr Singh",
            Practitioner::NurseKim => "Nurse Kim",
        }
    }

    /// Hex colour used to paint this practitioner's blocks on the grid.
    pub fn color(self) -> &'static str {
        match self {
            Practitioner::DrLee => "#2563eb",
            Practitioner::DrSingh => "#16a34a",
            Practitioner::NurseKim => "#d97706",
        }
    }

    pub fn info(self) -> PractitionerInfo {
        PractitionerInfo {
            id: self,
            name: self.display_name(),
            color: self.color(),
        }
    }
}

/// Practitioner as listed to calendar front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PractitionerInfo {
    pub id: Practitioner,
    pub name: &'static str,
    pub color: &'static str,
}

impl Default for Practitioner {
    fn default() -> Self {
        Practitioner::ALL[0]
    }
}

impl FromStr for Practitioner {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Practitioner::ALL
            .into_iter()
            .find(|p| p.id().eq_ignore_ascii_case(s) || p.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    InitialConsultation,
    FullBodyCheck,
    LesionReview,
    FollowUp,
    Procedure,
}

impl AppointmentType {
    pub const ALL: [AppointmentType; 5] = [
        AppointmentType::InitialConsultation,
        AppointmentType::FullBodyCheck,
        AppointmentType::LesionReview,
        AppointmentType::FollowUp,
        AppointmentType::Procedure,
    ];

    pub fn id(self) -> &'static str {
        match self {
            AppointmentType::InitialConsultation => "initial_consultation",
            AppointmentType::FullBodyCheck => "full_body_check",
            AppointmentType::LesionReview => "lesion_review",
            AppointmentType::FollowUp => "follow_up",
            AppointmentType::Procedure => "procedure",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AppointmentType::InitialConsultation => "Initial Consultation",
            AppointmentType::FullBodyCheck => "Full Body Check",
            AppointmentType::LesionReview => "Lesion Review",
            AppointmentType::FollowUp => "Follow-up",
            AppointmentType::Procedure => "Procedure",
        }
    }
}

impl Default for AppointmentType {
    fn default() -> Self {
        AppointmentType::ALL[0]
    }
}

impl FromStr for AppointmentType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        AppointmentType::ALL
            .into_iter()
            .find(|t| t.id().eq_ignore_ascii_case(s) || t.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/* -------------------------
   Appointments
--------------------------*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentEvent {
    pub id: EventId,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub patient_name: String,
    #[serde(default)]
    pub patient_id: Option<i64>,
    pub practitioner: Practitioner,
    pub appointment_type: AppointmentType,
    #[serde(default)]
    pub reception_notes: Option<String>,
    #[serde(default)]
    pub clinical_notes: Option<String>,
}

/// Appointment fields without an id, as sent on create and replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub patient_name: String,
    #[serde(default)]
    pub patient_id: Option<i64>,
    pub practitioner: Practitioner,
    pub appointment_type: AppointmentType,
    #[serde(default)]
    pub reception_notes: Option<String>,
    #[serde(default)]
    pub clinical_notes: Option<String>,
}

fn deserialize_double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    // only called when the field is present: null => Some(None)
    let inner = Option::<T>::deserialize(deserializer)?;
    Ok(Some(inner))
}

/// Partial update. Nullable fields use `Option<Option<T>>` so that an absent
/// field leaves the value alone while an explicit `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub patient_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practitioner: Option<Practitioner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_type: Option<AppointmentType>,
    #[serde(
        default,
        deserialize_with = "deserialize_double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub reception_notes: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub clinical_notes: Option<Option<String>>,
}

impl AppointmentPatch {
    pub fn timing(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }
}

pub fn validate_span(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), CalendarError> {
    if end > start {
        Ok(())
    } else {
        Err(CalendarError::InvalidSpan { start, end })
    }
}

impl AppointmentEvent {
    pub fn from_new(id: EventId, new: NewAppointment) -> Self {
        Self {
            id,
            title: new.title,
            start: new.start,
            end: new.end,
            patient_name: new.patient_name,
            patient_id: new.patient_id,
            practitioner: new.practitioner,
            appointment_type: new.appointment_type,
            reception_notes: new.reception_notes,
            clinical_notes: new.clinical_notes,
        }
    }

    pub fn to_new(&self) -> NewAppointment {
        NewAppointment {
            title: self.title.clone(),
            start: self.start,
            end: self.end,
            patient_name: self.patient_name.clone(),
            patient_id: self.patient_id,
            practitioner: self.practitioner,
            appointment_type: self.appointment_type,
            reception_notes: self.reception_notes.clone(),
            clinical_notes: self.clinical_notes.clone(),
        }
    }

    /// Patch carrying every field, used to push a local edit to the store.
    pub fn to_full_patch(&self) -> AppointmentPatch {
        AppointmentPatch {
            title: Some(self.title.clone()),
            start: Some(self.start),
            end: Some(self.end),
            patient_name: Some(self.patient_name.clone()),
            patient_id: Some(self.patient_id),
            practitioner: Some(self.practitioner),
            appointment_type: Some(self.appointment_type),
            reception_notes: Some(self.reception_notes.clone()),
            clinical_notes: Some(self.clinical_notes.clone()),
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Applies `patch` and checks the resulting span; `self` is untouched on error.
    pub fn apply_patch(&mut self, patch: AppointmentPatch) -> Result<(), CalendarError> {
        let start = patch.start.unwrap_or(self.start);
        let end = patch.end.unwrap_or(self.end);
        validate_span(start, end)?;

        self.start = start;
        self.end = end;
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(name) = patch.patient_name {
            self.patient_name = name;
        }
        if let Some(pid) = patch.patient_id {
            self.patient_id = pid;
        }
        if let Some(p) = patch.practitioner {
            self.practitioner = p;
        }
        if let Some(t) = patch.appointment_type {
            self.appointment_type = t;
        }
        if let Some(n) = patch.reception_notes {
            self.reception_notes = n;
        }
        if let Some(n) = patch.clinical_notes {
            self.clinical_notes = n;
        }
        Ok(())
    }
}

/* -------------------------
   Patients
--------------------------*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/* -------------------------
   API envelopes
--------------------------*/

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkData {
    pub ok: bool,
}
