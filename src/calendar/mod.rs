//! Calendar core: time grid, filtering, the appointment editor and the
//! gestures that feed it.

pub mod debounce;
pub mod drag;
pub mod editor;
pub mod events;
pub mod filter;
pub mod patients;
pub mod session;
pub mod time_grid;

pub use session::CalendarSession;
