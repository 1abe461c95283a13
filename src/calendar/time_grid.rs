//! Day/week/month boundaries and hour-slot partitioning.
//!
//! All boundaries are computed on the wall clock of a fixed display offset and
//! handed back as UTC instants, so comparisons against stored appointments
//! never depend on the host time zone.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc,
};

use crate::error::CalendarError;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl FromStr for WeekStart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(WeekStart::Monday),
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            other => Err(format!("expected monday or sunday, got {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewGranularity {
    #[default]
    Day,
    Week,
    Month,
}

impl FromStr for ViewGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(ViewGranularity::Day),
            "week" => Ok(ViewGranularity::Week),
            "month" => Ok(ViewGranularity::Month),
            other => Err(format!("expected day, week or month, got {other:?}")),
        }
    }
}

/// Inclusive `[start, end]` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Half-open `[start, end)` grid cell. Also the default span of a new
/// appointment created by clicking empty space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpec {
    step_minutes: u32,
    sub_step_minutes: u32,
}

impl Default for SlotSpec {
    fn default() -> Self {
        Self {
            step_minutes: 60,
            sub_step_minutes: 15,
        }
    }
}

impl SlotSpec {
    pub fn new(step_minutes: u32, sub_step_minutes: u32) -> Result<Self, CalendarError> {
        if step_minutes == 0 || step_minutes > MINUTES_PER_DAY {
            return Err(CalendarError::InvalidSlotSpec(format!(
                "step must be between 1 and {MINUTES_PER_DAY} minutes, got {step_minutes}"
            )));
        }
        if sub_step_minutes == 0 || step_minutes % sub_step_minutes != 0 {
            return Err(CalendarError::InvalidSlotSpec(format!(
                "sub-step {sub_step_minutes} must evenly divide step {step_minutes}"
            )));
        }
        Ok(Self {
            step_minutes,
            sub_step_minutes,
        })
    }

    pub fn step_minutes(&self) -> u32 {
        self.step_minutes
    }

    pub fn sub_step_minutes(&self) -> u32 {
        self.sub_step_minutes
    }

    pub fn ticks_per_slot(&self) -> u32 {
        self.step_minutes / self.sub_step_minutes
    }
}

/// Interprets `naive` as wall-clock time at `offset`.
pub fn localize(offset: FixedOffset, naive: NaiveDateTime) -> DateTime<FixedOffset> {
    let utc = naive - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

pub fn start_of_day(d: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    localize(*d.offset(), d.date_naive().and_time(NaiveTime::MIN))
}

pub fn end_of_day(d: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    start_of_day(d) + Duration::days(1) - Duration::milliseconds(1)
}

pub fn start_of_week(d: DateTime<FixedOffset>, week_start: WeekStart) -> DateTime<FixedOffset> {
    let back = match week_start {
        WeekStart::Monday => d.weekday().num_days_from_monday(),
        WeekStart::Sunday => d.weekday().num_days_from_sunday(),
    };
    start_of_day(d) - Duration::days(i64::from(back))
}

pub fn end_of_week(d: DateTime<FixedOffset>, week_start: WeekStart) -> DateTime<FixedOffset> {
    end_of_day(start_of_week(d, week_start) + Duration::days(6))
}

pub fn start_of_month(d: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    start_of_day(d) - Duration::days(i64::from(d.day0()))
}

pub fn end_of_month(d: DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>, CalendarError> {
    let next = start_of_month(d)
        .checked_add_months(Months::new(1))
        .ok_or(CalendarError::OutOfRange)?;
    Ok(next - Duration::milliseconds(1))
}

pub fn window(
    reference: DateTime<FixedOffset>,
    granularity: ViewGranularity,
    week_start: WeekStart,
) -> Result<TimeWindow, CalendarError> {
    let (start, end) = match granularity {
        ViewGranularity::Day => (start_of_day(reference), end_of_day(reference)),
        ViewGranularity::Week => (
            start_of_week(reference, week_start),
            end_of_week(reference, week_start),
        ),
        ViewGranularity::Month => (start_of_month(reference), end_of_month(reference)?),
    };
    Ok(TimeWindow {
        start: start.with_timezone(&Utc),
        end: end.with_timezone(&Utc),
    })
}

/// Slots covering 00:00 to 23:59 of `day`; the last one is cut at midnight
/// when the step does not divide the day.
pub fn day_slots(day: NaiveDate, offset: FixedOffset, grid: SlotSpec) -> Vec<TimeSlot> {
    let midnight = localize(offset, day.and_time(NaiveTime::MIN)).with_timezone(&Utc);
    let day_end = midnight + Duration::days(1);
    let step = Duration::minutes(i64::from(grid.step_minutes));

    let mut slots = Vec::with_capacity((MINUTES_PER_DAY / grid.step_minutes) as usize + 1);
    let mut cursor = midnight;
    while cursor < day_end {
        let end = (cursor + step).min(day_end);
        slots.push(TimeSlot { start: cursor, end });
        cursor = end;
    }
    slots
}

/// Sub-step cells inside `slot`, for the finer grid lines. A slot cut short
/// at midnight gets a short last tick.
pub fn slot_ticks(slot: &TimeSlot, grid: SlotSpec) -> Vec<TimeSlot> {
    let step = Duration::minutes(i64::from(grid.sub_step_minutes));
    let mut ticks = Vec::with_capacity(grid.ticks_per_slot() as usize);
    let mut cursor = slot.start;
    while cursor < slot.end {
        let end = (cursor + step).min(slot.end);
        ticks.push(TimeSlot { start: cursor, end });
        cursor = end;
    }
    ticks
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

pub fn shift(
    reference: DateTime<FixedOffset>,
    granularity: ViewGranularity,
    direction: Direction,
) -> Result<DateTime<FixedOffset>, CalendarError> {
    let shifted = match (granularity, direction) {
        (ViewGranularity::Day, Direction::Next) => reference.checked_add_signed(Duration::days(1)),
        (ViewGranularity::Day, Direction::Prev) => reference.checked_sub_signed(Duration::days(1)),
        (ViewGranularity::Week, Direction::Next) => reference.checked_add_signed(Duration::days(7)),
        (ViewGranularity::Week, Direction::Prev) => reference.checked_sub_signed(Duration::days(7)),
        (ViewGranularity::Month, Direction::Next) => reference.checked_add_months(Months::new(1)),
        (ViewGranularity::Month, Direction::Prev) => reference.checked_sub_months(Months::new(1)),
    };
    shifted.ok_or(CalendarError::OutOfRange)
}

/// Navigable view position: a reference instant plus the zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarView {
    reference: DateTime<FixedOffset>,
    granularity: ViewGranularity,
    week_start: WeekStart,
}

impl CalendarView {
    pub fn new(reference: DateTime<Utc>, offset: FixedOffset, week_start: WeekStart) -> Self {
        Self {
            reference: reference.with_timezone(&offset),
            granularity: ViewGranularity::Day,
            week_start,
        }
    }

    pub fn reference(&self) -> DateTime<FixedOffset> {
        self.reference
    }

    pub fn granularity(&self) -> ViewGranularity {
        self.granularity
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    pub fn set_granularity(&mut self, granularity: ViewGranularity) {
        self.granularity = granularity;
    }

    pub fn go_to(&mut self, date: NaiveDate) {
        let time = self.reference.time();
        self.reference = localize(*self.reference.offset(), date.and_time(time));
    }

    pub fn next(&mut self) -> Result<(), CalendarError> {
        self.reference = shift(self.reference, self.granularity, Direction::Next)?;
        Ok(())
    }

    pub fn prev(&mut self) -> Result<(), CalendarError> {
        self.reference = shift(self.reference, self.granularity, Direction::Prev)?;
        Ok(())
    }

    pub fn today(&mut self, now: DateTime<Utc>) {
        self.reference = now.with_timezone(self.reference.offset());
    }

    pub fn window(&self) -> Result<TimeWindow, CalendarError> {
        window(self.reference, self.granularity, self.week_start)
    }

    /// Calendar days shown as columns in the current view.
    pub fn days(&self) -> Result<Vec<NaiveDate>, CalendarError> {
        let first = match self.granularity {
            ViewGranularity::Day => return Ok(vec![self.reference.date_naive()]),
            ViewGranularity::Week => start_of_week(self.reference, self.week_start),
            ViewGranularity::Month => start_of_month(self.reference),
        };
        let last = match self.granularity {
            ViewGranularity::Month => end_of_month(self.reference)?,
            _ => end_of_week(self.reference, self.week_start),
        };
        Ok(first
            .date_naive()
            .iter_days()
            .take_while(|d| *d <= last.date_naive())
            .collect())
    }
}
