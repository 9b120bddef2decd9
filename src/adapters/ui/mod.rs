//! Terminal presentation: load spinner, status line, day overview.

pub mod progress;
pub mod status;

pub use progress::LoadSpinner;
pub use status::{print_day_overview, status_message, StatusLine};
