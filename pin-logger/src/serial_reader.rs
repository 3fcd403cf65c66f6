use crate::Error;
use pinwatch_protocol::{parse_line, PinStates, BAUD_RATE};
use serialport::{ClearBuffer, SerialPort};
use std::{
    io::{BufRead, BufReader, ErrorKind},
    time::Duration,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port: String,
    pub baud: u32,

    /// Read timeout, also bounds how long a stop request can go unnoticed.
    /// Keep it below the service's stop timeout.
    pub timeout: Duration,

    /// Opening the port resets the board, nothing useful arrives until it has booted.
    pub startup_delay: Duration,

    /// Discard whatever was received before the startup delay elapsed.
    pub reset_input_buffer: bool,
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud: BAUD_RATE,
            timeout: Duration::from_secs(1),
            startup_delay: Duration::from_secs(2),
            reset_input_buffer: true,
        }
    }
}

/// Anything that yields pin samples, one line at a time.
pub trait SampleSource {
    /// `Ok(None)` means nothing usable was received this time.
    fn read_states(&mut self) -> Result<Option<PinStates>, Error>;
}

pub type SerialPortReader = BufReader<Box<dyn SerialPort>>;

pub struct PinMonitor<R> {
    reader: R,
    pending: Vec<u8>,
}

impl PinMonitor<SerialPortReader> {
    pub fn open(config: &SerialConfig) -> Result<Self, Error> {
        info!("Opening {} at {} baud", config.port, config.baud);

        let port = serialport::new(&config.port, config.baud)
            .timeout(config.timeout)
            .open()?;

        if !config.startup_delay.is_zero() {
            std::thread::sleep(config.startup_delay);
        }

        if config.reset_input_buffer {
            if let Err(e) = port.clear(ClearBuffer::Input) {
                warn!("Failed to discard pending input: {e}");
            }
        }

        Ok(Self::new(BufReader::new(port)))
    }
}

impl<R: BufRead> PinMonitor<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
        }
    }

    pub fn read_states(&mut self) -> Result<Option<PinStates>, Error> {
        // A timeout leaves any partial line in `pending` for the next call
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) if self.pending.is_empty() => return Err(Error::Disconnected),
            Ok(_) => {}
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        }

        let line = String::from_utf8_lossy(&self.pending).trim().to_owned();
        self.pending.clear();

        if line.is_empty() {
            return Ok(None);
        }

        match parse_line(&line) {
            Ok(states) if states.is_empty() => {
                debug!("Discarding line {line:?}: no pin values");
                Ok(None)
            }
            Ok(states) => Ok(Some(states)),
            Err(e) => {
                debug!("Discarding line {line:?}: {e}");
                Ok(None)
            }
        }
    }
}

impl<R: BufRead> SampleSource for PinMonitor<R> {
    fn read_states(&mut self) -> Result<Option<PinStates>, Error> {
        PinMonitor::read_states(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{collections::VecDeque, io::Read};

    /// Replays chunks of bytes, with `None` standing in for a read timeout.
    struct Chunks(VecDeque<Option<&'static [u8]>>);

    impl Read for Chunks {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.pop_front() {
                None => Ok(0),
                Some(None) => Err(ErrorKind::TimedOut.into()),
                Some(Some(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(chunk);
                    Ok(chunk.len())
                }
            }
        }
    }

    fn monitor(chunks: &[Option<&'static [u8]>]) -> PinMonitor<BufReader<Chunks>> {
        PinMonitor::new(BufReader::new(Chunks(chunks.iter().copied().collect())))
    }

    #[test]
    fn reads_report_lines() {
        let mut m = PinMonitor::new("4,0,5,1,6,0,7,0\r\n4,1,5,1,6,1,7,1\r\n".as_bytes());

        let states = m.read_states().unwrap().unwrap();
        assert_eq!(states.for_monitored_pins(), [Some(0), Some(1), Some(0), Some(0)]);

        let states = m.read_states().unwrap().unwrap();
        assert_eq!(states.for_monitored_pins(), [Some(1); 4]);

        assert!(matches!(m.read_states(), Err(Error::Disconnected)));
    }

    #[test]
    fn blank_and_garbled_lines_are_not_samples() {
        let mut m = PinMonitor::new(&b"\r\n4,0,5\r\n\xff\xfe\r\n,,\r\n4,1\r\n"[..]);

        assert!(m.read_states().unwrap().is_none());
        assert!(m.read_states().unwrap().is_none());
        assert!(m.read_states().unwrap().is_none());
        assert!(m.read_states().unwrap().is_none());
        assert_eq!(m.read_states().unwrap().unwrap().get(4), Some(1));
    }

    #[test]
    fn timeout_is_not_an_error() {
        let mut m = monitor(&[None, Some(&b"4,1,5,0,6,0,7,0\n"[..])]);

        assert!(m.read_states().unwrap().is_none());
        assert_eq!(m.read_states().unwrap().unwrap().get(4), Some(1));
    }

    #[test]
    fn partial_line_survives_timeout() {
        let mut m = monitor(&[Some(&b"4,1,5,"[..]), None, Some(&b"1,6,0,7,1\r\n"[..])]);

        assert!(m.read_states().unwrap().is_none());
        let states = m.read_states().unwrap().unwrap();
        assert_eq!(states.for_monitored_pins(), [Some(1), Some(1), Some(0), Some(1)]);
    }

    #[test]
    fn unterminated_final_line_is_still_read() {
        let mut m = monitor(&[Some(&b"4,0,5,0"[..]), None]);

        assert!(m.read_states().unwrap().is_none());
        assert_eq!(m.read_states().unwrap().unwrap().get(5), Some(0));
        assert!(matches!(m.read_states(), Err(Error::Disconnected)));
    }

    #[test]
    fn default_config() {
        let config = SerialConfig::new("/dev/ttyACM0");
        assert_eq!(config.baud, 115_200);
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert!(config.reset_input_buffer);
    }
}
