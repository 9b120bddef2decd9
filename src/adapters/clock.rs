//! Implements Clock with the local system time.

use crate::ports::Clock;
use chrono::{Local, NaiveDate};

/// Wall clock in the local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
