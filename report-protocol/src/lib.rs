#![cfg_attr(not(feature = "std"), no_std)]

pub mod line;
pub mod sampler;

pub use self::{
    line::{PinValue, Report, LINE_TERMINATOR},
    sampler::{Clock, Level, ReadPins, Reporter},
};

#[cfg(feature = "std")]
pub use self::line::{parse_line, ParseError, PinStates};

pub type TimeMillis = u32;

/// Digital pin number as printed on the board.
pub type PinId = u8;

/// Pins sampled each cycle, in reporting order.
pub const MONITORED_PINS: [PinId; 4] = [4, 5, 6, 7];

pub const BAUD_RATE: u32 = 115_200;

/// Minimum time in milliseconds between two reports.
pub const REPORT_PERIOD: TimeMillis = 250;
