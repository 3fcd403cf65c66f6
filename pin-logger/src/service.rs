use crate::{
    json_log::{JsonLogConfig, SampleLogger},
    serial_reader::{PinMonitor, SampleSource, SerialConfig},
    Error,
};
use pinwatch_protocol::PinStates;
use std::{
    io::Write,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub serial: SerialConfig,
    pub log: JsonLogConfig,

    /// Pause after every read attempt.
    pub poll_sleep: Duration,

    /// Log worker errors at error level rather than debug.
    pub print_errors: bool,

    /// How long `stop` waits for the worker before leaving it to finish alone.
    pub stop_timeout: Duration,
}

impl ServiceConfig {
    pub fn new(serial: SerialConfig) -> Self {
        Self {
            serial,
            log: JsonLogConfig::default(),
            poll_sleep: Duration::ZERO,
            print_errors: false,
            stop_timeout: Duration::from_secs(2),
        }
    }
}

/// Snapshot of the service for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub running: bool,
    pub port: String,
    pub baud: u32,
    pub json_path: PathBuf,
    pub uptime: Option<Duration>,
    pub last_sample_age: Option<Duration>,
    pub samples_written: u64,
    pub bad_reads: u64,
    pub last_error: Option<String>,

    /// Last values of D4 to D7.
    pub pins: [Option<u8>; 4],
}

#[derive(Default)]
struct Shared {
    started_at: Option<Instant>,
    last_sample_at: Option<Instant>,
    last_states: Option<PinStates>,
    samples_written: u64,
    bad_reads: u64,
    last_error: Option<String>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Copies pin samples from a serial port into the sample log on a background thread.
pub struct LoggingService {
    config: ServiceConfig,
    stop: Arc<AtomicBool>,
    shared: Arc<Mutex<Shared>>,
    thread: Option<JoinHandle<()>>,
}

impl LoggingService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            stop: Arc::new(AtomicBool::new(false)),
            shared: Default::default(),
            thread: None,
        }
    }

    pub fn start(&mut self) -> Result<(), Error> {
        let serial = self.config.serial.clone();
        self.start_with(move || PinMonitor::open(&serial))
    }

    /// Starts the worker reading from whatever `open_source` returns.
    ///
    /// Does nothing if the worker is already running.
    pub fn start_with<S, F>(&mut self, open_source: F) -> Result<(), Error>
    where
        S: SampleSource + 'static,
        F: FnOnce() -> Result<S, Error> + Send + 'static,
    {
        if self.is_running() {
            return Ok(());
        }

        // Reap a worker that ended on its own
        self.join();

        // A worker left behind by `stop` keeps its own, already set, flag
        self.stop = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            config: self.config.clone(),
            stop: self.stop.clone(),
            shared: self.shared.clone(),
        };

        let handle = std::thread::Builder::new()
            .name("pin-logging-service".into())
            .spawn(move || worker.run(open_source))?;
        self.thread = Some(handle);

        Ok(())
    }

    /// Signals the worker and waits up to `stop_timeout` for it to end.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);

        let deadline = Instant::now() + self.config.stop_timeout;
        while self.is_running() {
            if Instant::now() >= deadline {
                warn!(
                    "Logging worker still busy after {:?}, not waiting for it",
                    self.config.stop_timeout
                );
                self.thread = None;
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        self.join();
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn status(&self) -> Status {
        let shared = lock(&self.shared);
        let last = shared.last_states.as_ref();

        Status {
            running: self.is_running(),
            port: self.config.serial.port.clone(),
            baud: self.config.serial.baud,
            json_path: self.config.log.path.clone(),
            uptime: shared.started_at.map(|t| t.elapsed()),
            last_sample_age: shared.last_sample_at.map(|t| t.elapsed()),
            samples_written: shared.samples_written,
            bad_reads: shared.bad_reads,
            last_error: shared.last_error.clone(),
            pins: last.map(PinStates::for_monitored_pins).unwrap_or_default(),
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("Logging worker panicked");
            }
        }
    }
}

impl Drop for LoggingService {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    config: ServiceConfig,
    stop: Arc<AtomicBool>,
    shared: Arc<Mutex<Shared>>,
}

impl Worker {
    fn run<S, F>(self, open_source: F)
    where
        S: SampleSource,
        F: FnOnce() -> Result<S, Error>,
    {
        {
            let mut shared = lock(&self.shared);
            shared.started_at = Some(Instant::now());
            shared.last_error = None;
        }

        info!("Logging samples to {}", self.config.log.path.display());

        let result = SampleLogger::open(&self.config.log).and_then(|mut logger| {
            let result = open_source().and_then(|mut source| self.pump(&mut source, &mut logger));

            if let Err(e) = logger.close() {
                warn!("Failed to close sample log: {e}");
            }

            result
        });

        if let Err(e) = result {
            self.record_error(format!("fatal: {e}"));
        }

        info!("Logging worker stopped");
    }

    fn pump<S: SampleSource, W: Write>(
        &self,
        source: &mut S,
        logger: &mut SampleLogger<W>,
    ) -> Result<(), Error> {
        while !self.stop.load(Ordering::Relaxed) {
            match source.read_states()? {
                None => lock(&self.shared).bad_reads += 1,
                Some(states) => {
                    {
                        let mut shared = lock(&self.shared);
                        shared.last_states = Some(states.clone());
                        shared.last_sample_at = Some(Instant::now());
                    }

                    match logger.write_sample(&states, None) {
                        Ok(()) => lock(&self.shared).samples_written += 1,
                        Err(e) => self.record_error(format!("JSON write error: {e}")),
                    }
                }
            }

            if !self.config.poll_sleep.is_zero() {
                std::thread::sleep(self.config.poll_sleep);
            }
        }

        Ok(())
    }

    fn record_error(&self, msg: String) {
        if self.config.print_errors {
            error!("{msg}");
        } else {
            debug!("{msg}");
        }
        lock(&self.shared).last_error = Some(msg);
    }
}
