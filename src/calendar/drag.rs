use chrono::{DateTime, Utc};

use crate::calendar::editor::AppointmentEditor;
use crate::calendar::events::EventSet;
use crate::error::CalendarError;
use crate::models::EventId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Drop,
    Resize,
}

/// Result of reconciling one gesture.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub events: EventSet,
    /// Whether an open editor draft was retimed to match.
    pub editor_synced: bool,
}

/// Writes a drag or resize back into the event set and keeps an editor that
/// is open on the same appointment showing the new times. Other events are
/// never shifted.
pub fn reconcile(
    events: &EventSet,
    editor: &mut AppointmentEditor,
    kind: DragKind,
    id: EventId,
    new_start: DateTime<Utc>,
    new_end: DateTime<Utc>,
) -> Result<Reconciled, CalendarError> {
    let next = events.with_retimed(id, new_start, new_end)?;
    let editor_synced = editor.sync_timing(id, new_start, new_end);
    tracing::debug!(appointment_id = %id, ?kind, editor_synced, "calendar: reconciled gesture");
    Ok(Reconciled {
        events: next,
        editor_synced,
    })
}

pub fn on_drop(
    events: &EventSet,
    editor: &mut AppointmentEditor,
    id: EventId,
    new_start: DateTime<Utc>,
    new_end: DateTime<Utc>,
) -> Result<Reconciled, CalendarError> {
    reconcile(events, editor, DragKind::Drop, id, new_start, new_end)
}

pub fn on_resize(
    events: &EventSet,
    editor: &mut AppointmentEditor,
    id: EventId,
    new_start: DateTime<Utc>,
    new_end: DateTime<Utc>,
) -> Result<Reconciled, CalendarError> {
    reconcile(events, editor, DragKind::Resize, id, new_start, new_end)
}
