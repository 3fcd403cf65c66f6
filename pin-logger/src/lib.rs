pub mod error;
pub mod json_log;
pub mod menu;
pub mod plot;
pub mod serial_reader;
pub mod service;

pub use self::error::Error;
