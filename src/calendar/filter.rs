use std::fmt;
use std::str::FromStr;

use crate::calendar::time_grid::{TimeSlot, TimeWindow};
use crate::models::{AppointmentEvent, AppointmentType, Practitioner};

/// A filter dimension: either everything, or exactly one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facet<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Facet<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Facet::All => true,
            Facet::Only(wanted) => wanted == value,
        }
    }
}

impl<T: FromStr> FromStr for Facet<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Facet::All)
        } else {
            s.parse().map(Facet::Only)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterState {
    pub practitioner: Facet<Practitioner>,
    pub appointment_type: Facet<AppointmentType>,
}

impl FilterState {
    pub fn matches(&self, event: &AppointmentEvent) -> bool {
        self.practitioner.matches(&event.practitioner)
            && self.appointment_type.matches(&event.appointment_type)
    }
}

/// How an appointment is tested against the visible window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowPolicy {
    /// Included when `start` falls inside the window, whatever its end.
    #[default]
    StartWithin,
    /// Included only when both `start` and `end` fall inside the window.
    StartAndEndWithin,
}

impl WindowPolicy {
    pub fn admits(self, window: &TimeWindow, event: &AppointmentEvent) -> bool {
        match self {
            WindowPolicy::StartWithin => window.contains(event.start),
            WindowPolicy::StartAndEndWithin => {
                event.start >= window.start && event.end <= window.end
            }
        }
    }
}

impl FromStr for WindowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start_within" => Ok(WindowPolicy::StartWithin),
            "start_and_end_within" => Ok(WindowPolicy::StartAndEndWithin),
            other => Err(format!(
                "expected start_within or start_and_end_within, got {other:?}"
            )),
        }
    }
}

impl fmt::Display for WindowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowPolicy::StartWithin => f.write_str("start_within"),
            WindowPolicy::StartAndEndWithin => f.write_str("start_and_end_within"),
        }
    }
}

/// Events visible in `window` under `facets`, in input order.
pub fn filter<'a>(
    events: &'a [AppointmentEvent],
    window: &TimeWindow,
    facets: &FilterState,
    policy: WindowPolicy,
) -> Vec<&'a AppointmentEvent> {
    events
        .iter()
        .filter(|e| policy.admits(window, e) && facets.matches(e))
        .collect()
}

/// Events whose start falls in `slot`, for placing blocks on the grid.
pub fn starting_in<'a, 'e>(
    events: &'a [&'e AppointmentEvent],
    slot: &TimeSlot,
) -> Vec<&'e AppointmentEvent> {
    events
        .iter()
        .copied()
        .filter(|e| slot.contains(e.start))
        .collect()
}
