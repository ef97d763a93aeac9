use chrono::{Local, NaiveTime};

use crate::application::ports::ClockPort;

/// Local wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn time_of_day(&self) -> NaiveTime {
        Local::now().time()
    }
}
