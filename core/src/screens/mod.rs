//! Per-screen controllers.
//!
//! Each controller owns the store for its screen and a handle to the shared
//! `Gateway`. Local preconditions (required fields) are checked here and fail
//! with `ErrorKind::Validation` before any request is made. Every failure
//! comes back as one `GatewayError` whose message is fit for an alert.
//!
//! Controllers are created on mount and consumed by `unmount`, which drops
//! the screen's local state.

mod calendar;
mod notes;
mod reminders;
mod weather;

pub use calendar::CalendarScreen;
pub use notes::NotesScreen;
pub use reminders::RemindersScreen;
pub use weather::{WeatherScreen, DEFAULT_CITY};

use crate::error::GatewayError;

pub trait Screen {
    /// Loads the screen's initial state.
    fn mount(&mut self) -> Result<(), GatewayError> {
        self.refresh()
    }

    /// Pull-to-refresh: reloads from the server.
    fn refresh(&mut self) -> Result<(), GatewayError>;
}

fn require(value: &str, message: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        return Err(GatewayError::validation(message));
    }
    Ok(())
}
