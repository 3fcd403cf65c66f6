use crate::Error;
use chrono::{DateTime, SecondsFormat, Utc};
use pinwatch_protocol::PinStates;
use serde::{Deserialize, Serialize};
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::PathBuf,
};

pub const DEFAULT_LOG_PATH: &str = "pin_samples.ndjson";

#[derive(Debug, Clone)]
pub struct JsonLogConfig {
    pub path: PathBuf,

    /// Flush after this many records, `0` leaves flushing to the buffer.
    pub flush_every: u32,
}

impl Default for JsonLogConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_LOG_PATH.into(),
            flush_every: 1,
        }
    }
}

/// One line of the sample log, e.g.
/// `{"ts_utc":"2026-01-13T04:32:10.123456Z","d4":0,"d5":1,"d6":0,"d7":0}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub ts_utc: String,
    pub d4: Option<u8>,
    pub d5: Option<u8>,
    pub d6: Option<u8>,
    pub d7: Option<u8>,
}

impl SampleRecord {
    pub fn new(states: &PinStates, time: DateTime<Utc>) -> Self {
        let [d4, d5, d6, d7] = states.for_monitored_pins();
        Self {
            ts_utc: format_timestamp(&time),
            d4,
            d5,
            d6,
            d7,
        }
    }

    pub fn time(&self) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(&self.ts_utc).map(|t| t.with_timezone(&Utc))
    }

    pub fn values(&self) -> [Option<u8>; 4] {
        [self.d4, self.d5, self.d6, self.d7]
    }
}

pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Appends samples to a newline delimited JSON log.
pub struct SampleLogger<W: Write> {
    writer: W,
    flush_every: u32,
    since_flush: u32,
}

impl SampleLogger<BufWriter<File>> {
    pub fn open(config: &JsonLogConfig) -> Result<Self, Error> {
        if let Some(dir) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self::new(BufWriter::new(file), config.flush_every))
    }
}

impl<W: Write> SampleLogger<W> {
    pub fn new(writer: W, flush_every: u32) -> Self {
        Self {
            writer,
            flush_every,
            since_flush: 0,
        }
    }

    /// Writes one record, timestamped now unless `time` is given.
    pub fn write_sample(
        &mut self,
        states: &PinStates,
        time: Option<DateTime<Utc>>,
    ) -> Result<(), Error> {
        let record = SampleRecord::new(states, time.unwrap_or_else(Utc::now));

        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;

        self.since_flush += 1;
        if self.flush_every > 0 && self.since_flush >= self.flush_every {
            self.writer.flush()?;
            self.since_flush = 0;
        }

        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn close(mut self) -> Result<(), Error> {
        self.writer.flush()?;
        Ok(())
    }
}
