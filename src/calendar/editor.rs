//! Create/edit dialog lifecycle for a single appointment.
//!
//! The draft keeps one canonical start instant plus a duration. The 12-hour
//! date/hour/minute/meridiem parts shown in the dialog are derived from that
//! instant on every read, and a write to any part recomputes the instant once.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

use crate::calendar::events::EventSet;
use crate::calendar::patients;
use crate::calendar::time_grid::{localize, TimeSlot};
use crate::error::EditorError;
use crate::models::{
    AppointmentEvent, AppointmentType, EventId, NewAppointment, PatientRecord, Practitioner,
};

pub const MIN_DURATION_MINUTES: i64 = 5;
pub const MAX_DURATION_MINUTES: i64 = 480;
/// Floor for the default span of an appointment created from a slot.
pub const MIN_SLOT_DURATION_MINUTES: i64 = 15;
pub const MINUTE_STEP: u32 = 5;

pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

pub fn to_hour24(hour12: u32, meridiem: Meridiem) -> u32 {
    let base = hour12 % 12;
    match meridiem {
        Meridiem::Am => base,
        Meridiem::Pm => base + 12,
    }
}

pub fn to_hour12(hour24: u32) -> (u32, Meridiem) {
    let meridiem = if hour24 >= 12 { Meridiem::Pm } else { Meridiem::Am };
    match hour24 % 12 {
        0 => (12, meridiem),
        h => (h, meridiem),
    }
}

/// Minute choices offered by the picker: 0, 5, ..., 55.
pub fn minute_options() -> impl Iterator<Item = u32> {
    (0..60).step_by(MINUTE_STEP as usize)
}

fn clamp_duration(minutes: i64, floor: i64) -> i64 {
    minutes.clamp(floor, MAX_DURATION_MINUTES)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartParts {
    pub date: NaiveDate,
    pub hour12: u32,
    pub minute: u32,
    pub meridiem: Meridiem,
}

impl StartParts {
    pub fn from_local(t: NaiveDateTime) -> Self {
        let (hour12, meridiem) = to_hour12(t.hour());
        Self {
            date: t.date(),
            hour12,
            minute: t.minute(),
            meridiem,
        }
    }

    pub fn hour24(&self) -> u32 {
        to_hour24(self.hour12, self.meridiem)
    }

    fn to_local(self) -> Option<NaiveDateTime> {
        NaiveTime::from_hms_opt(self.hour24(), self.minute, 0).map(|t| self.date.and_time(t))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorDraft {
    start: DateTime<Utc>,
    duration_minutes: i64,
    duration_input: String,
    offset: FixedOffset,
    patient_name: String,
    patient_id: Option<i64>,
    pub practitioner: Practitioner,
    pub appointment_type: AppointmentType,
    pub reception_notes: Option<String>,
    pub clinical_notes: Option<String>,
}

impl EditorDraft {
    fn for_slot(slot: &TimeSlot, offset: FixedOffset) -> Self {
        let duration = clamp_duration(slot.length().num_minutes(), MIN_SLOT_DURATION_MINUTES);
        Self {
            start: slot.start,
            duration_minutes: duration,
            duration_input: duration.to_string(),
            offset,
            patient_name: String::new(),
            patient_id: None,
            practitioner: Practitioner::ALL[0],
            appointment_type: AppointmentType::ALL[0],
            reception_notes: None,
            clinical_notes: None,
        }
    }

    fn from_event(event: &AppointmentEvent, offset: FixedOffset) -> Self {
        let duration = clamp_duration(event.duration().num_minutes(), MIN_DURATION_MINUTES);
        Self {
            start: event.start,
            duration_minutes: duration,
            duration_input: duration.to_string(),
            offset,
            patient_name: event.patient_name.clone(),
            patient_id: event.patient_id,
            practitioner: event.practitioner,
            appointment_type: event.appointment_type,
            reception_notes: event.reception_notes.clone(),
            clinical_notes: event.clinical_notes.clone(),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(self.duration_minutes)
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration_minutes
    }

    /// Text currently shown in the duration field.
    pub fn duration_input(&self) -> &str {
        &self.duration_input
    }

    pub fn start_parts(&self) -> StartParts {
        StartParts::from_local(self.start.with_timezone(&self.offset).naive_local())
    }

    pub fn patient_name(&self) -> &str {
        &self.patient_name
    }

    pub fn patient_id(&self) -> Option<i64> {
        self.patient_id
    }

    /// Returns false and leaves the draft alone when `minutes` is outside
    /// the allowed range.
    pub fn set_duration_minutes(&mut self, minutes: i64) -> bool {
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
            return false;
        }
        self.duration_minutes = minutes;
        self.duration_input = minutes.to_string();
        true
    }

    /// Mirrors raw keyboard input. Unparseable or out-of-range text is kept
    /// for display but the numeric duration keeps its last valid value.
    pub fn set_duration_input(&mut self, text: &str) -> bool {
        let accepted = text
            .trim()
            .parse::<i64>()
            .is_ok_and(|m| self.set_duration_minutes(m));
        self.duration_input = text.to_string();
        accepted
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        let parts = StartParts {
            date,
            ..self.start_parts()
        };
        self.write_parts(parts);
    }

    pub fn set_hour(&mut self, hour12: u32) -> Result<(), EditorError> {
        if !(1..=12).contains(&hour12) {
            return Err(EditorError::InvalidHour(hour12));
        }
        let parts = StartParts {
            hour12,
            ..self.start_parts()
        };
        self.write_parts(parts);
        Ok(())
    }

    pub fn set_minute(&mut self, minute: u32) -> Result<(), EditorError> {
        if !minute_options().any(|m| m == minute) {
            return Err(EditorError::InvalidMinute(minute));
        }
        let parts = StartParts {
            minute,
            ..self.start_parts()
        };
        self.write_parts(parts);
        Ok(())
    }

    pub fn set_meridiem(&mut self, meridiem: Meridiem) {
        let parts = StartParts {
            meridiem,
            ..self.start_parts()
        };
        self.write_parts(parts);
    }

    fn write_parts(&mut self, parts: StartParts) {
        // setters range-check hour and minute before getting here
        if let Some(local) = parts.to_local() {
            self.start = localize(self.offset, local).with_timezone(&Utc);
        }
    }

    /// Typing a name drops any previously selected patient reference.
    pub fn set_patient_name(&mut self, name: &str) {
        self.patient_name = name.to_string();
        self.patient_id = None;
    }

    pub fn select_patient(&mut self, patient: &PatientRecord) {
        self.patient_name = patient.name.clone();
        self.patient_id = Some(patient.id);
    }

    /// Re-derives timing after the event moved underneath the dialog.
    pub(crate) fn retime(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.start = start;
        self.duration_minutes = clamp_duration((end - start).num_minutes(), MIN_DURATION_MINUTES);
        self.duration_input = self.duration_minutes.to_string();
    }

    pub fn title(&self) -> String {
        synthesize_title(&self.patient_name, self.appointment_type)
    }
}

pub fn synthesize_title(patient_name: &str, appointment_type: AppointmentType) -> String {
    let name = patient_name.trim();
    let name = if name.is_empty() { UNTITLED } else { name };
    format!("{name} — {}", appointment_type.display_name())
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditorState {
    #[default]
    Closed,
    Creating {
        slot: TimeSlot,
        draft: EditorDraft,
    },
    Editing {
        id: EventId,
        draft: EditorDraft,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    Created,
    Updated,
}

#[derive(Debug, Clone)]
pub struct Saved {
    pub events: EventSet,
    pub event: AppointmentEvent,
    pub kind: SaveKind,
}

#[derive(Debug, Clone)]
pub struct AppointmentEditor {
    state: EditorState,
    offset: FixedOffset,
}

impl AppointmentEditor {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            state: EditorState::Closed,
            offset,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, EditorState::Closed)
    }

    pub fn editing_id(&self) -> Option<EventId> {
        match self.state {
            EditorState::Editing { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&EditorDraft> {
        match &self.state {
            EditorState::Closed => None,
            EditorState::Creating { draft, .. } | EditorState::Editing { draft, .. } => Some(draft),
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut EditorDraft> {
        match &mut self.state {
            EditorState::Closed => None,
            EditorState::Creating { draft, .. } | EditorState::Editing { draft, .. } => Some(draft),
        }
    }

    pub fn open_slot(&mut self, slot: TimeSlot) -> Result<&mut EditorDraft, EditorError> {
        if self.is_open() {
            return Err(EditorError::AlreadyOpen);
        }
        tracing::debug!(start = %slot.start, "editor: creating from slot");
        let draft = EditorDraft::for_slot(&slot, self.offset);
        self.state = EditorState::Creating { slot, draft };
        self.draft_mut().ok_or(EditorError::NotOpen)
    }

    pub fn open_event(&mut self, event: &AppointmentEvent) -> Result<&mut EditorDraft, EditorError> {
        if self.is_open() {
            return Err(EditorError::AlreadyOpen);
        }
        tracing::debug!(appointment_id = %event.id, "editor: editing");
        self.state = EditorState::Editing {
            id: event.id,
            draft: EditorDraft::from_event(event, self.offset),
        };
        self.draft_mut().ok_or(EditorError::NotOpen)
    }

    /// Commits the draft into `events` and closes the editor. On error the
    /// editor stays open with the draft untouched.
    ///
    /// `directory` is `None` when the patient list could not be loaded; the
    /// typed name and any existing patient reference are then kept as they are.
    pub fn save(&mut self, events: &EventSet, directory: Option<&[PatientRecord]>) -> Result<Saved, EditorError> {
        let (draft, existing) = match &self.state {
            EditorState::Closed => return Err(EditorError::NotOpen),
            EditorState::Creating { draft, .. } => (draft, None),
            EditorState::Editing { id, draft } => (draft, Some(*id)),
        };

        let typed = draft.patient_name.trim();
        let (patient_name, patient_id) = match directory {
            _ if typed.is_empty() => (String::new(), None),
            None => (typed.to_string(), draft.patient_id),
            Some(directory) => {
                let patient = patients::resolve(directory, draft.patient_id, typed)
                    .ok_or_else(|| EditorError::UnknownPatient(typed.to_string()))?;
                (patient.name.clone(), Some(patient.id))
            }
        };

        let fields = NewAppointment {
            title: synthesize_title(&patient_name, draft.appointment_type),
            start: draft.start(),
            end: draft.end(),
            patient_name,
            patient_id,
            practitioner: draft.practitioner,
            appointment_type: draft.appointment_type,
            reception_notes: draft.reception_notes.clone(),
            clinical_notes: draft.clinical_notes.clone(),
        };

        let (next, event, kind) = match existing {
            None => {
                let event = AppointmentEvent::from_new(events.next_id(), fields);
                (events.with_inserted(event.clone())?, event, SaveKind::Created)
            }
            Some(id) => {
                let event = AppointmentEvent::from_new(id, fields);
                (events.with_replaced(event.clone())?, event, SaveKind::Updated)
            }
        };

        tracing::debug!(appointment_id = %event.id, ?kind, "editor: saved");
        self.state = EditorState::Closed;
        Ok(Saved {
            events: next,
            event,
            kind,
        })
    }

    pub fn delete(&mut self, events: &EventSet) -> Result<(EventSet, EventId), EditorError> {
        let id = match &self.state {
            EditorState::Closed => return Err(EditorError::NotOpen),
            EditorState::Creating { .. } => return Err(EditorError::NotEditing),
            EditorState::Editing { id, .. } => *id,
        };
        let next = events.without(id)?;
        tracing::debug!(appointment_id = %id, "editor: deleted");
        self.state = EditorState::Closed;
        Ok((next, id))
    }

    /// Discards the draft. Returns whether anything was open.
    pub fn cancel(&mut self) -> bool {
        let was_open = self.is_open();
        self.state = EditorState::Closed;
        was_open
    }

    /// Keeps an open dialog on `id` in step with a move made elsewhere.
    pub fn sync_timing(&mut self, id: EventId, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        match &mut self.state {
            EditorState::Editing { id: open, draft } if *open == id => {
                draft.retime(start, end);
                true
            }
            _ => false,
        }
    }

    /// Follows an appointment whose provisional id was replaced by the store's.
    pub(crate) fn rename(&mut self, from: EventId, to: EventId) {
        if let EditorState::Editing { id, .. } = &mut self.state {
            if *id == from {
                *id = to;
            }
        }
    }
}
