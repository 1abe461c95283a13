//! One operator's calendar: the loaded appointments, where the view is
//! pointed, the facets applied, and the open editor.
//!
//! Every interaction changes local state first. The matching store call runs
//! afterwards and a failure is logged and dropped, leaving local state as the
//! record. A successful response is folded back in.
//!
//! Appointments created while the store is unreachable carry a negative
//! provisional id until a later `create` succeeds. The store is never asked
//! to patch or delete an id it did not issue.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::calendar::debounce::{ClickDebouncer, ClickOutcome};
use crate::calendar::drag::{self, Reconciled};
use crate::calendar::editor::{AppointmentEditor, EditorDraft, SaveKind};
use crate::calendar::events::EventSet;
use crate::calendar::filter::{self, Facet, FilterState, WindowPolicy};
use crate::calendar::patients::{self, SUGGESTION_LIMIT};
use crate::calendar::time_grid::{
    day_slots, slot_ticks, CalendarView, SlotSpec, TimeSlot, TimeWindow, ViewGranularity,
};
use crate::config::CalendarConfig;
use crate::error::{CalendarError, EditorError};
use crate::models::{AppointmentEvent, AppointmentPatch, AppointmentType, EventId, PatientRecord, Practitioner};
use crate::store::{AppointmentStore, ClinicStore, PatientDirectory};

pub struct CalendarSession {
    store: Arc<dyn ClinicStore>,
    events: EventSet,
    /// Provisional ids the store has not confirmed yet.
    unsaved: HashSet<EventId>,
    view: CalendarView,
    filters: FilterState,
    policy: WindowPolicy,
    slots: SlotSpec,
    offset: FixedOffset,
    editor: AppointmentEditor,
    patients: Vec<PatientRecord>,
    directory_loaded: bool,
    clicks: ClickDebouncer<EventId>,
    notes_view: Option<EventId>,
}

impl CalendarSession {
    pub fn new(store: Arc<dyn ClinicStore>, config: &CalendarConfig, now: DateTime<Utc>) -> Self {
        Self {
            store,
            events: EventSet::default(),
            unsaved: HashSet::new(),
            view: CalendarView::new(now, config.utc_offset, config.week_start),
            filters: FilterState::default(),
            policy: config.filter_policy,
            slots: config.slots,
            offset: config.utc_offset,
            editor: AppointmentEditor::new(config.utc_offset),
            patients: Vec::new(),
            directory_loaded: false,
            clicks: ClickDebouncer::new(Duration::from_millis(config.click_delay_ms)),
            notes_view: None,
        }
    }

    /* ============================================================
       Loading
       ============================================================ */

    /// Replaces the local set with the store's, keeping appointments that
    /// are still waiting to be created. Returns false, keeping the current
    /// set, when the store can't be reached.
    pub async fn load(&mut self) -> bool {
        match self.store.list().await {
            Ok(mut rows) => {
                tracing::info!(count = rows.len(), pending = self.unsaved.len(), "calendar: loaded appointments");
                rows.extend(
                    self.events
                        .iter()
                        .filter(|e| self.unsaved.contains(&e.id))
                        .cloned(),
                );
                self.events = self.events.replaced_all(rows);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "calendar: list failed, keeping local appointments");
                false
            }
        }
    }

    pub async fn load_patients(&mut self) -> bool {
        match self.store.list_patients().await {
            Ok(rows) => {
                self.patients = rows;
                self.directory_loaded = true;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "calendar: patient list failed");
                false
            }
        }
    }

    /* ============================================================
       Reading
       ============================================================ */

    pub fn events(&self) -> &EventSet {
        &self.events
    }

    /// Whether `id` exists only locally so far.
    pub fn is_unsaved(&self, id: EventId) -> bool {
        self.unsaved.contains(&id)
    }

    pub fn patients(&self) -> &[PatientRecord] {
        &self.patients
    }

    pub fn view(&self) -> &CalendarView {
        &self.view
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn policy(&self) -> WindowPolicy {
        self.policy
    }

    pub fn window(&self) -> Result<TimeWindow, CalendarError> {
        self.view.window()
    }

    /// What the grid draws for the current view and facets.
    pub fn visible_events(&self) -> Result<Vec<&AppointmentEvent>, CalendarError> {
        let window = self.view.window()?;
        Ok(filter::filter(self.events.as_slice(), &window, &self.filters, self.policy))
    }

    pub fn slots(&self, day: NaiveDate) -> Vec<TimeSlot> {
        day_slots(day, self.offset, self.slots)
    }

    /// Sub-step cells of one grid slot.
    pub fn ticks(&self, slot: &TimeSlot) -> Vec<TimeSlot> {
        slot_ticks(slot, self.slots)
    }

    /* ============================================================
       View and facets
       ============================================================ */

    pub fn set_granularity(&mut self, granularity: ViewGranularity) {
        self.view.set_granularity(granularity);
    }

    pub fn go_to(&mut self, date: NaiveDate) {
        self.view.go_to(date);
    }

    pub fn next(&mut self) -> Result<(), CalendarError> {
        self.view.next()
    }

    pub fn prev(&mut self) -> Result<(), CalendarError> {
        self.view.prev()
    }

    pub fn today(&mut self) {
        self.view.today(Utc::now());
    }

    pub fn set_practitioner_filter(&mut self, facet: Facet<Practitioner>) {
        self.filters.practitioner = facet;
    }

    pub fn set_type_filter(&mut self, facet: Facet<AppointmentType>) {
        self.filters.appointment_type = facet;
    }

    pub fn set_policy(&mut self, policy: WindowPolicy) {
        self.policy = policy;
    }

    /* ============================================================
       Selection and clicks
       ============================================================ */

    pub fn select_slot(&mut self, slot: TimeSlot) -> Result<&mut EditorDraft, EditorError> {
        self.editor.open_slot(slot)
    }

    pub fn select_event(&mut self, id: EventId) -> Result<&mut EditorDraft, EditorError> {
        let event = self.events.get(id).ok_or(CalendarError::EventNotFound(id))?;
        self.editor.open_event(event)
    }

    /// Feeds a click on an event through the debouncer and acts on whatever
    /// it settles.
    pub fn click_event(&mut self, id: EventId, at: Instant) -> Result<Option<ClickOutcome<EventId>>, EditorError> {
        let outcome = self.clicks.click(id, at);
        if let Some(outcome) = outcome {
            self.apply_click(outcome)?;
        }
        Ok(outcome)
    }

    /// Resolves a held single click once its delay has passed.
    pub fn poll_clicks(&mut self, now: Instant) -> Result<Option<ClickOutcome<EventId>>, EditorError> {
        let outcome = self.clicks.poll(now);
        if let Some(outcome) = outcome {
            self.apply_click(outcome)?;
        }
        Ok(outcome)
    }

    /// Single click opens the editor, double click opens the notes view.
    fn apply_click(&mut self, outcome: ClickOutcome<EventId>) -> Result<(), EditorError> {
        match outcome {
            ClickOutcome::Single(id) => self.select_event(id).map(|_| ()),
            ClickOutcome::Double(id) => {
                if !self.events.contains(id) {
                    return Err(CalendarError::EventNotFound(id).into());
                }
                self.notes_view = Some(id);
                Ok(())
            }
        }
    }

    /// Event whose notes are open, if any.
    pub fn notes_view(&self) -> Option<&AppointmentEvent> {
        self.notes_view.and_then(|id| self.events.get(id))
    }

    pub fn close_notes(&mut self) {
        self.notes_view = None;
    }

    /* ============================================================
       Editor
       ============================================================ */

    pub fn editor(&self) -> &AppointmentEditor {
        &self.editor
    }

    pub fn draft(&self) -> Option<&EditorDraft> {
        self.editor.draft()
    }

    pub fn draft_mut(&mut self) -> Option<&mut EditorDraft> {
        self.editor.draft_mut()
    }

    /// Known patients matching what has been typed into the name field.
    pub fn suggest_patients(&self, query: &str) -> Vec<&PatientRecord> {
        patients::suggest(&self.patients, query, SUGGESTION_LIMIT)
    }

    pub fn cancel(&mut self) -> bool {
        self.editor.cancel()
    }

    /// Commits the open draft locally, then mirrors it to the store. Returns
    /// the event as it stands locally afterwards.
    pub async fn save(&mut self) -> Result<AppointmentEvent, EditorError> {
        let directory = self.directory_loaded.then_some(self.patients.as_slice());
        let saved = self.editor.save(&self.events, directory)?;

        match saved.kind {
            SaveKind::Created => {
                let id = saved.events.provisional_id();
                self.events = saved.events.with_reassigned_id(saved.event.id, id)?;
                self.unsaved.insert(id);
                let local = AppointmentEvent { id, ..saved.event };
                Ok(self.persist_new(local).await)
            }
            SaveKind::Updated if self.unsaved.contains(&saved.event.id) => {
                self.events = saved.events;
                Ok(self.persist_new(saved.event).await)
            }
            SaveKind::Updated => {
                self.events = saved.events;
                let local = saved.event;
                match self.store.patch(local.id, local.to_full_patch()).await {
                    Ok(remote) => Ok(self.adopt(local, remote)),
                    Err(e) => {
                        tracing::warn!(appointment_id = %local.id, error = %e, "calendar: save not persisted");
                        Ok(local)
                    }
                }
            }
        }
    }

    /// Asks the store to create an appointment that so far exists only
    /// locally, and swaps in the id it hands back.
    async fn persist_new(&mut self, local: AppointmentEvent) -> AppointmentEvent {
        match self.store.create(local.to_new()).await {
            Ok(remote) => self.adopt(local, remote),
            Err(e) => {
                tracing::warn!(appointment_id = %local.id, error = %e, "calendar: create not persisted");
                local
            }
        }
    }

    /// Folds the store's copy of a saved event into the local set.
    fn adopt(&mut self, local: AppointmentEvent, remote: AppointmentEvent) -> AppointmentEvent {
        let mut events = self.events.clone();
        if remote.id != local.id && events.contains(remote.id) {
            // the store just issued this id, so the local row holding it is stale
            tracing::warn!(appointment_id = %remote.id, "calendar: dropping stale local copy");
            if let Ok(set) = events.without(remote.id) {
                events = set;
            }
        }

        let adopted = events
            .with_reassigned_id(local.id, remote.id)
            .and_then(|set| set.with_replaced(remote.clone()));
        match adopted {
            Ok(set) => {
                self.events = set;
                self.unsaved.remove(&local.id);
                self.editor.rename(local.id, remote.id);
                if self.notes_view == Some(local.id) {
                    self.notes_view = Some(remote.id);
                }
                remote
            }
            Err(e) => {
                tracing::warn!(local = %local.id, remote = %remote.id, error = %e, "calendar: rejected store copy");
                local
            }
        }
    }

    pub async fn delete(&mut self) -> Result<EventId, EditorError> {
        let (next, id) = self.editor.delete(&self.events)?;
        self.events = next;
        if self.notes_view == Some(id) {
            self.notes_view = None;
        }
        if self.unsaved.remove(&id) {
            return Ok(id);
        }
        if let Err(e) = self.store.delete(id).await {
            tracing::warn!(appointment_id = %id, error = %e, "calendar: delete not persisted");
        }
        Ok(id)
    }

    /* ============================================================
       Drag and resize
       ============================================================ */

    pub async fn drop_event(
        &mut self,
        id: EventId,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<bool, CalendarError> {
        let reconciled = drag::on_drop(&self.events, &mut self.editor, id, new_start, new_end)?;
        Ok(self.persist_timing(id, reconciled).await)
    }

    pub async fn resize_event(
        &mut self,
        id: EventId,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<bool, CalendarError> {
        let reconciled = drag::on_resize(&self.events, &mut self.editor, id, new_start, new_end)?;
        Ok(self.persist_timing(id, reconciled).await)
    }

    async fn persist_timing(&mut self, id: EventId, reconciled: Reconciled) -> bool {
        // a drag is not a click
        self.clicks.reset();
        self.events = reconciled.events;
        let Some(event) = self.events.get(id).cloned() else {
            return reconciled.editor_synced;
        };

        if self.unsaved.contains(&id) {
            self.persist_new(event).await;
            return reconciled.editor_synced;
        }

        let patch = AppointmentPatch::timing(event.start, event.end);
        if let Err(e) = self.store.patch(id, patch).await {
            tracing::warn!(appointment_id = %id, error = %e, "calendar: move not persisted");
        }
        reconciled.editor_synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::editor::Meridiem;
    use crate::error::StoreError;
    use crate::models::{NewAppointment, NewPatient};
    use crate::store::{AppointmentStore, JsonFileStore, PatientDirectory};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store that refuses everything.
    struct Offline;

    fn offline() -> StoreError {
        StoreError::Rejected {
            status: 503,
            code: "UNAVAILABLE".into(),
            message: "offline".into(),
        }
    }

    #[async_trait]
    impl AppointmentStore for Offline {
        async fn list(&self) -> Result<Vec<AppointmentEvent>, StoreError> {
            Err(offline())
        }
        async fn get(&self, _id: EventId) -> Result<AppointmentEvent, StoreError> {
            Err(offline())
        }
        async fn create(&self, _new: NewAppointment) -> Result<AppointmentEvent, StoreError> {
            Err(offline())
        }
        async fn replace(&self, _id: EventId, _fields: NewAppointment) -> Result<AppointmentEvent, StoreError> {
            Err(offline())
        }
        async fn patch(&self, _id: EventId, _patch: AppointmentPatch) -> Result<AppointmentEvent, StoreError> {
            Err(offline())
        }
        async fn delete(&self, _id: EventId) -> Result<(), StoreError> {
            Err(offline())
        }
    }

    #[async_trait]
    impl PatientDirectory for Offline {
        async fn list_patients(&self) -> Result<Vec<PatientRecord>, StoreError> {
            Err(offline())
        }
        async fn get_patient(&self, id: i64) -> Result<PatientRecord, StoreError> {
            Err(StoreError::NotFound { entity: "patient", id })
        }
        async fn create_patient(&self, _new: NewPatient) -> Result<PatientRecord, StoreError> {
            Err(offline())
        }
    }

    /// File store behind a switch that can take it offline.
    struct Flaky {
        inner: JsonFileStore,
        online: AtomicBool,
    }

    impl Flaky {
        fn set_online(&self, online: bool) {
            self.online.store(online, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.online.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(offline())
            }
        }
    }

    #[async_trait]
    impl AppointmentStore for Flaky {
        async fn list(&self) -> Result<Vec<AppointmentEvent>, StoreError> {
            self.check()?;
            self.inner.list().await
        }
        async fn get(&self, id: EventId) -> Result<AppointmentEvent, StoreError> {
            self.check()?;
            self.inner.get(id).await
        }
        async fn create(&self, new: NewAppointment) -> Result<AppointmentEvent, StoreError> {
            self.check()?;
            self.inner.create(new).await
        }
        async fn replace(&self, id: EventId, fields: NewAppointment) -> Result<AppointmentEvent, StoreError> {
            self.check()?;
            self.inner.replace(id, fields).await
        }
        async fn patch(&self, id: EventId, patch: AppointmentPatch) -> Result<AppointmentEvent, StoreError> {
            self.check()?;
            self.inner.patch(id, patch).await
        }
        async fn delete(&self, id: EventId) -> Result<(), StoreError> {
            self.check()?;
            self.inner.delete(id).await
        }
    }

    #[async_trait]
    impl PatientDirectory for Flaky {
        async fn list_patients(&self) -> Result<Vec<PatientRecord>, StoreError> {
            self.check()?;
            self.inner.list_patients().await
        }
        async fn get_patient(&self, id: i64) -> Result<PatientRecord, StoreError> {
            self.check()?;
            self.inner.get_patient(id).await
        }
        async fn create_patient(&self, new: NewPatient) -> Result<PatientRecord, StoreError> {
            self.check()?;
            self.inner.create_patient(new).await
        }
    }

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, h, m, 0).unwrap()
    }

    fn fields(start: DateTime<Utc>, minutes: i64, practitioner: Practitioner) -> NewAppointment {
        NewAppointment {
            title: "Untitled — Follow-up".into(),
            start,
            end: start + ChronoDuration::minutes(minutes),
            patient_name: String::new(),
            patient_id: None,
            practitioner,
            appointment_type: AppointmentType::FollowUp,
            reception_notes: None,
            clinical_notes: None,
        }
    }

    fn slot(h: u32) -> TimeSlot {
        TimeSlot {
            start: t(h, 0),
            end: t(h + 1, 0),
        }
    }

    fn offline_session() -> CalendarSession {
        CalendarSession::new(Arc::new(Offline), &CalendarConfig::default(), t(8, 0))
    }

    async fn flaky_session() -> (CalendarSession, Arc<Flaky>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(Flaky {
            inner: JsonFileStore::open(tmp.path()).await.unwrap(),
            online: AtomicBool::new(true),
        });
        let session = CalendarSession::new(store.clone(), &CalendarConfig::default(), t(8, 0));
        (session, store, tmp)
    }

    async fn file_session() -> (CalendarSession, Arc<JsonFileStore>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(tmp.path()).await.unwrap());
        let session = CalendarSession::new(store.clone(), &CalendarConfig::default(), t(8, 0));
        (session, store, tmp)
    }

    #[tokio::test]
    async fn test_offline_save_keeps_local_event() {
        let mut s = offline_session();
        assert!(!s.load().await);

        s.select_slot(slot(9)).unwrap();
        let saved = s.save().await.unwrap();

        assert_eq!(saved.id, EventId(-1));
        assert!(s.is_unsaved(saved.id));
        assert_eq!(s.events().len(), 1);
        assert!(!s.editor().is_open());
        assert_eq!(s.visible_events().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_offline_drag_and_delete_stay_local() {
        let mut s = offline_session();
        s.select_slot(slot(10)).unwrap();
        let saved = s.save().await.unwrap();

        assert!(!s.drop_event(saved.id, t(14, 0), t(15, 0)).await.unwrap());
        assert_eq!(s.events().get(saved.id).unwrap().start, t(14, 0));

        s.select_event(saved.id).unwrap();
        assert_eq!(s.delete().await.unwrap(), saved.id);
        assert!(s.events().is_empty());
    }

    #[tokio::test]
    async fn test_save_adopts_store_id() {
        let (mut s, store, _tmp) = file_session().await;
        // the store already holds rows this session never loaded
        store.create(fields(t(7, 0), 30, Practitioner::DrLee)).await.unwrap();
        store.create(fields(t(7, 30), 30, Practitioner::DrLee)).await.unwrap();

        s.select_slot(slot(9)).unwrap();
        let saved = s.save().await.unwrap();

        assert_eq!(saved.id, EventId(3));
        assert!(s.events().contains(EventId(3)));
        assert!(!s.events().contains(EventId(-1)));
        assert!(!s.is_unsaved(EventId(3)));
        assert_eq!(store.get(EventId(3)).await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_edit_and_resize_reach_store() {
        let (mut s, store, _tmp) = file_session().await;
        let created = store.create(fields(t(10, 0), 30, Practitioner::DrLee)).await.unwrap();
        assert!(s.load().await);

        let draft = s.select_event(created.id).unwrap();
        draft.practitioner = Practitioner::DrSingh;
        s.save().await.unwrap();
        assert_eq!(store.get(created.id).await.unwrap().practitioner, Practitioner::DrSingh);

        s.select_event(created.id).unwrap();
        assert!(s.resize_event(created.id, t(10, 0), t(11, 0)).await.unwrap());
        assert_eq!(s.draft().unwrap().duration_minutes(), 60);

        let stored = store.get(created.id).await.unwrap();
        assert_eq!(stored.end, t(11, 0));
        assert_eq!(stored.practitioner, Practitioner::DrSingh);
    }

    #[tokio::test]
    async fn test_drop_syncs_open_editor() {
        let (mut s, store, _tmp) = file_session().await;
        let x = store.create(fields(t(10, 0), 30, Practitioner::DrLee)).await.unwrap();
        let y = store.create(fields(t(11, 0), 30, Practitioner::DrLee)).await.unwrap();
        s.load().await;

        s.select_event(x.id).unwrap();
        assert!(s.drop_event(x.id, t(14, 0), t(14, 30)).await.unwrap());

        let parts = s.draft().unwrap().start_parts();
        assert_eq!((parts.hour12, parts.minute, parts.meridiem), (2, 0, Meridiem::Pm));
        assert_eq!(s.events().get(y.id).unwrap().start, t(11, 0));
        assert_eq!(store.get(x.id).await.unwrap().start, t(14, 0));
    }

    #[tokio::test]
    async fn test_unknown_patient_keeps_editor_open() {
        let (mut s, store, _tmp) = file_session().await;
        store
            .create_patient(NewPatient {
                name: "Michael Brown".into(),
                phone: None,
                email: None,
            })
            .await
            .unwrap();
        assert!(s.load_patients().await);
        assert_eq!(s.suggest_patients("brow").len(), 1);

        s.select_slot(slot(9)).unwrap();
        s.draft_mut().unwrap().set_patient_name("Nobody Known");
        assert_eq!(
            s.save().await,
            Err(EditorError::UnknownPatient("Nobody Known".into()))
        );
        assert!(s.editor().is_open());

        s.draft_mut().unwrap().set_patient_name("michael brown");
        let saved = s.save().await.unwrap();
        assert_eq!(saved.patient_name, "Michael Brown");
        assert_eq!(saved.title, "Michael Brown — Initial Consultation");
    }

    #[tokio::test]
    async fn test_clicks_open_editor_or_notes() {
        let (mut s, store, _tmp) = file_session().await;
        let e = store.create(fields(t(10, 0), 30, Practitioner::DrLee)).await.unwrap();
        s.load().await;

        let t0 = Instant::now();
        assert_eq!(s.click_event(e.id, t0).unwrap(), None);
        assert_eq!(
            s.click_event(e.id, t0 + Duration::from_millis(100)).unwrap(),
            Some(ClickOutcome::Double(e.id))
        );
        assert_eq!(s.notes_view().map(|n| n.id), Some(e.id));
        assert!(!s.editor().is_open());
        s.close_notes();

        s.click_event(e.id, t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(s.poll_clicks(t0 + Duration::from_millis(1100)).unwrap(), None);
        assert_eq!(
            s.poll_clicks(t0 + Duration::from_millis(1300)).unwrap(),
            Some(ClickOutcome::Single(e.id))
        );
        assert_eq!(s.editor().editing_id(), Some(e.id));
    }

    #[tokio::test]
    async fn test_facets_and_navigation() {
        let (mut s, store, _tmp) = file_session().await;
        store.create(fields(t(9, 0), 30, Practitioner::DrLee)).await.unwrap();
        store.create(fields(t(13, 0), 30, Practitioner::NurseKim)).await.unwrap();
        s.load().await;

        assert_eq!(s.visible_events().unwrap().len(), 2);
        s.set_practitioner_filter(Facet::Only(Practitioner::NurseKim));
        assert_eq!(s.visible_events().unwrap().len(), 1);
        assert_eq!(s.events().len(), 2);

        s.next().unwrap();
        assert!(s.visible_events().unwrap().is_empty());
        s.set_granularity(ViewGranularity::Week);
        assert_eq!(s.visible_events().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_offline_created_event_never_moves_a_stored_one() {
        let (mut s, store, _tmp) = flaky_session().await;
        let mut alice = fields(t(9, 0), 30, Practitioner::DrLee);
        alice.patient_name = "Alice Moore".into();
        let alice = store.create(alice).await.unwrap();
        assert_eq!(alice.id, EventId(1));

        store.set_online(false);
        assert!(!s.load().await);
        s.select_slot(slot(10)).unwrap();
        let local = s.save().await.unwrap();
        assert!(s.is_unsaved(local.id));
        assert!(local.id.0 < 0);

        store.set_online(true);
        s.select_event(local.id).unwrap();
        assert!(s.drop_event(local.id, t(20, 0), t(21, 0)).await.unwrap());

        let stored_alice = store.get(alice.id).await.unwrap();
        assert_eq!(stored_alice.start, t(9, 0));
        assert_eq!(stored_alice.patient_name, "Alice Moore");

        let created = store.get(EventId(2)).await.unwrap();
        assert_eq!(created.start, t(20, 0));
        assert!(!s.is_unsaved(EventId(2)));
        assert!(!s.events().contains(local.id));
        assert_eq!(s.editor().editing_id(), Some(EventId(2)));
    }

    #[tokio::test]
    async fn test_pending_events_are_created_not_patched() {
        let (mut s, store, _tmp) = flaky_session().await;
        store.create(fields(t(9, 0), 30, Practitioner::DrLee)).await.unwrap();

        store.set_online(false);
        s.select_slot(slot(10)).unwrap();
        let first = s.save().await.unwrap();
        s.select_slot(slot(12)).unwrap();
        let second = s.save().await.unwrap();
        assert_ne!(first.id, second.id);

        store.set_online(true);
        assert!(s.load().await);
        assert_eq!(s.events().len(), 3);

        let draft = s.select_event(first.id).unwrap();
        draft.practitioner = Practitioner::NurseKim;
        let saved = s.save().await.unwrap();
        assert_eq!(saved.id, EventId(2));
        assert_eq!(store.get(EventId(1)).await.unwrap().practitioner, Practitioner::DrLee);
        assert_eq!(store.get(EventId(2)).await.unwrap().practitioner, Practitioner::NurseKim);

        s.select_event(second.id).unwrap();
        s.delete().await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 2);
        assert!(!s.is_unsaved(second.id));
    }

    #[tokio::test]
    async fn test_patient_outage_does_not_block_edit_save() {
        let (mut s, store, _tmp) = flaky_session().await;
        let patient = store
            .create_patient(NewPatient {
                name: "David Kim".into(),
                phone: None,
                email: None,
            })
            .await
            .unwrap();
        let mut booked = fields(t(10, 0), 30, Practitioner::DrLee);
        booked.patient_name = patient.name.clone();
        booked.patient_id = Some(patient.id);
        let booked = store.create(booked).await.unwrap();
        assert!(s.load().await);

        store.set_online(false);
        assert!(!s.load_patients().await);
        store.set_online(true);

        s.select_event(booked.id).unwrap().practitioner = Practitioner::DrSingh;
        let saved = s.save().await.unwrap();
        assert_eq!(saved.patient_name, "David Kim");
        assert_eq!(saved.patient_id, Some(patient.id));
        assert_eq!(store.get(booked.id).await.unwrap().practitioner, Practitioner::DrSingh);
    }

    #[tokio::test]
    async fn test_slots_ticks_and_today() {
        let mut s = offline_session();
        let day = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        let slots = s.slots(day);
        assert_eq!(slots.len(), 24);
        assert_eq!(slots[9].start, t(9, 0));
        let ticks = s.ticks(&slots[9]);
        assert_eq!(ticks.len(), 4);
        assert_eq!(ticks[1].start, t(9, 15));

        s.go_to(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        s.today();
        let drift = s.view().reference().with_timezone(&Utc) - Utc::now();
        assert!(drift.num_seconds().abs() < 5);
    }

    #[tokio::test]
    async fn test_policy_switch_hides_events_crossing_midnight() {
        let (mut s, store, _tmp) = file_session().await;
        store.create(fields(t(23, 30), 45, Practitioner::DrLee)).await.unwrap();
        s.load().await;

        assert_eq!(s.visible_events().unwrap().len(), 1);
        s.set_policy(WindowPolicy::StartAndEndWithin);
        assert_eq!(s.policy(), WindowPolicy::StartAndEndWithin);
        assert!(s.visible_events().unwrap().is_empty());
    }
}
