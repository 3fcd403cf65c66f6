use crate::{
    line::{Report, LINE_TERMINATOR},
    TimeMillis, MONITORED_PINS, REPORT_PERIOD,
};

/// Electrical level of a digital input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

impl Level {
    /// Inputs are pulled up, so a pin driven low is the active state and reports `1`.
    pub fn reported_value(self) -> u8 {
        match self {
            Level::High => 0,
            Level::Low => 1,
        }
    }
}

impl From<bool> for Level {
    fn from(is_high: bool) -> Self {
        if is_high {
            Level::High
        } else {
            Level::Low
        }
    }
}

pub trait ReadPins {
    /// Levels of [`MONITORED_PINS`], in that order.
    fn read(&self) -> [Level; MONITORED_PINS.len()];
}

pub trait Clock {
    /// Milliseconds since boot.
    fn now(&self) -> TimeMillis;
}

/// Samples the monitored pins and writes a report line at most once per period.
#[derive(Debug, Clone)]
pub struct Reporter {
    period: TimeMillis,
    last_report: Option<TimeMillis>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(REPORT_PERIOD)
    }
}

impl Reporter {
    pub const fn new(period: TimeMillis) -> Self {
        Self {
            period,
            last_report: None,
        }
    }

    pub fn last_report(&self) -> Option<TimeMillis> {
        self.last_report
    }

    /// A reporter that has never reported is always due.
    pub fn due(&self, now: TimeMillis) -> bool {
        match self.last_report {
            None => true,
            Some(last) => now.wrapping_sub(last) >= self.period,
        }
    }

    /// Reports if due, returning what was written.
    ///
    /// Write errors are ignored, the next report goes out on schedule regardless.
    pub fn tick<P, W>(&mut self, now: TimeMillis, pins: &P, serial: &mut W) -> Option<Report>
    where
        P: ReadPins + ?Sized,
        W: ufmt::uWrite + ?Sized,
    {
        if !self.due(now) {
            return None;
        }
        self.last_report = Some(now);

        let report = Report::from_levels(pins.read());
        let _ = ufmt::uwrite!(serial, "{}", report);
        let _ = serial.write_str(LINE_TERMINATOR);

        Some(report)
    }

    pub fn poll<C, P, W>(&mut self, clock: &C, pins: &P, serial: &mut W) -> Option<Report>
    where
        C: Clock + ?Sized,
        P: ReadPins + ?Sized,
        W: ufmt::uWrite + ?Sized,
    {
        self.tick(clock.now(), pins, serial)
    }
}
