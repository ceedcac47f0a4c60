use std::fmt::Display;
use std::time::Duration;

#[derive(Default)]
pub(crate) struct Timer {
    pub(crate) submitting: Duration,
    pub(crate) polling: Duration,
    pub(crate) sleeping: Duration,
}

impl Display for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.1} s submitting, {:.1} s polling, {:.1} s sleeping",
            self.submitting.as_millis() as f64 / 1000.0,
            self.polling.as_millis() as f64 / 1000.0,
            self.sleeping.as_millis() as f64 / 1000.0,
        )
    }
}
