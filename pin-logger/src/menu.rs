use crate::service::{LoggingService, Status};
use std::{
    fmt::Write as _,
    io::{BufRead, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

/// What the menu needs from the thing it controls.
pub trait MenuTarget {
    fn status(&self) -> Status;
    fn shutdown(&mut self);
}

impl MenuTarget for LoggingService {
    fn status(&self) -> Status {
        LoggingService::status(self)
    }

    fn shutdown(&mut self) {
        self.stop();
    }
}

/// Ctrl+C handling: ends auto-refresh while it runs, ends the process otherwise.
#[derive(Clone, Default)]
pub struct Interrupt {
    refreshing: Arc<AtomicBool>,
    requested: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn install() -> Result<Self, ctrlc::Error> {
        let interrupt = Self::default();

        let handler = interrupt.clone();
        ctrlc::set_handler(move || {
            if handler.is_refreshing() {
                handler.trigger();
            } else {
                std::process::exit(130);
            }
        })?;

        Ok(interrupt)
    }

    pub fn trigger(&self) {
        self.requested.store(true, Ordering::Relaxed);
    }

    fn begin(&self) {
        self.requested.store(false, Ordering::Relaxed);
        self.refreshing.store(true, Ordering::Relaxed);
    }

    fn end(&self) {
        self.refreshing.store(false, Ordering::Relaxed);
    }

    fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Relaxed)
    }

    /// Sleeps for `period` or until triggered, returns `true` if triggered.
    fn wait(&self, period: Duration) -> bool {
        const SLICE: Duration = Duration::from_millis(20);

        let mut remaining = period;
        while !remaining.is_zero() {
            if self.requested.load(Ordering::Relaxed) {
                return true;
            }
            let step = remaining.min(SLICE);
            std::thread::sleep(step);
            remaining -= step;
        }
        self.requested.load(Ordering::Relaxed)
    }
}

pub struct Menu {
    interrupt: Interrupt,
    refresh_interval: Duration,
}

impl Menu {
    pub fn new(interrupt: Interrupt) -> Self {
        Self {
            interrupt,
            refresh_interval: Duration::from_secs(1),
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Runs until the user shuts down, which also shuts down `target`.
    ///
    /// End of input counts as a shutdown request.
    pub fn run<T, R, W>(&self, target: &mut T, mut input: R, output: &mut W) -> std::io::Result<()>
    where
        T: MenuTarget,
        R: BufRead,
        W: Write,
    {
        let mut choice = String::new();

        loop {
            writeln!(output, "\n==== MENU ====")?;
            writeln!(output, "1) Show status")?;
            writeln!(output, "2) Show status (auto-refresh)")?;
            writeln!(output, "3) Shut down")?;
            write!(output, "Select: ")?;
            output.flush()?;

            choice.clear();
            let eof = input.read_line(&mut choice)? == 0;

            match choice.trim() {
                "1" => write!(output, "{}", format_status(&target.status()))?,
                "2" => self.auto_refresh(target, output)?,
                "3" => {
                    target.shutdown();
                    writeln!(output, "Service stopped. Exiting.")?;
                    return Ok(());
                }
                _ if eof => {
                    writeln!(output)?;
                    target.shutdown();
                    writeln!(output, "Service stopped. Exiting.")?;
                    return Ok(());
                }
                _ => writeln!(output, "Unknown choice.")?,
            }
        }
    }

    fn auto_refresh<T: MenuTarget, W: Write>(
        &self,
        target: &T,
        output: &mut W,
    ) -> std::io::Result<()> {
        writeln!(output, "Auto-refreshing. Press Ctrl+C to return to menu.")?;

        self.interrupt.begin();
        let result = (|| -> std::io::Result<()> {
            loop {
                write!(output, "{}", format_status(&target.status()))?;
                output.flush()?;

                if self.interrupt.wait(self.refresh_interval) {
                    break;
                }
            }
            Ok(())
        })();
        self.interrupt.end();

        result
    }
}

fn format_seconds(d: Option<Duration>) -> String {
    match d {
        Some(d) => format!("{:.1}s", d.as_secs_f64()),
        None => "n/a".to_owned(),
    }
}

fn format_value(v: Option<u8>) -> String {
    match v {
        Some(v) => v.to_string(),
        None => "n/a".to_owned(),
    }
}

pub fn format_status(status: &Status) -> String {
    let mut s = String::new();
    let [d4, d5, d6, d7] = status.pins.map(format_value);

    // Writing to a String cannot fail
    let _ = writeln!(s, "\n--- STATUS ---");
    let _ = writeln!(s, "Running:         {}", status.running);
    let _ = writeln!(s, "Serial:          {} @ {}", status.port, status.baud);
    let _ = writeln!(s, "Log file:        {}", status.json_path.display());
    let _ = writeln!(s, "Uptime:          {}", format_seconds(status.uptime));
    let _ = writeln!(s, "Last sample age: {}", format_seconds(status.last_sample_age));
    let _ = writeln!(s, "Samples written: {}", status.samples_written);
    let _ = writeln!(s, "Bad reads:       {}", status.bad_reads);
    let _ = writeln!(
        s,
        "Last error:      {}",
        status.last_error.as_deref().unwrap_or("none")
    );
    let _ = writeln!(s, "Pins:            D4={d4} D5={d5} D6={d6} D7={d7}");

    s
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{path::PathBuf, sync::atomic::AtomicUsize};

    fn status() -> Status {
        Status {
            running: true,
            port: "/dev/ttyACM0".to_owned(),
            baud: 115_200,
            json_path: PathBuf::from("pin_samples.ndjson"),
            uptime: Some(Duration::from_millis(12_340)),
            last_sample_age: None,
            samples_written: 42,
            bad_reads: 3,
            last_error: None,
            pins: [Some(0), Some(1), None, Some(0)],
        }
    }

    #[derive(Default)]
    struct FakeTarget {
        status_calls: AtomicUsize,
        shut_down: bool,
    }

    impl MenuTarget for FakeTarget {
        fn status(&self) -> Status {
            self.status_calls.fetch_add(1, Ordering::Relaxed);
            status()
        }

        fn shutdown(&mut self) {
            self.shut_down = true;
        }
    }

    fn run_menu(input: &str, target: &mut FakeTarget) -> String {
        let mut output = Vec::new();
        Menu::new(Interrupt::default())
            .run(target, input.as_bytes(), &mut output)
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn status_rendering() {
        let text = format_status(&status());

        assert!(text.starts_with("\n--- STATUS ---\n"));
        assert!(text.contains("Serial:          /dev/ttyACM0 @ 115200\n"));
        assert!(text.contains("Uptime:          12.3s\n"));
        assert!(text.contains("Last sample age: n/a\n"));
        assert!(text.contains("Samples written: 42\n"));
        assert!(text.contains("Last error:      none\n"));
        assert!(text.contains("Pins:            D4=0 D5=1 D6=n/a D7=0\n"));
    }

    #[test]
    fn status_rendering_with_error() {
        let mut status = status();
        status.last_error = Some("fatal: Serial port disconnected".to_owned());

        assert!(format_status(&status).contains("Last error:      fatal: Serial port disconnected\n"));
    }

    #[test]
    fn show_status_then_shut_down() {
        let mut target = FakeTarget::default();
        let output = run_menu("1\n3\n", &mut target);

        assert_eq!(target.status_calls.load(Ordering::Relaxed), 1);
        assert!(target.shut_down);
        assert!(output.contains("--- STATUS ---"));
        assert!(output.ends_with("Service stopped. Exiting.\n"));
    }

    #[test]
    fn unknown_choice() {
        let mut target = FakeTarget::default();
        let output = run_menu("7\n 3 \n", &mut target);

        assert!(output.contains("Unknown choice.\n"));
        assert!(target.shut_down);
    }

    #[test]
    fn end_of_input_shuts_down() {
        let mut target = FakeTarget::default();
        let output = run_menu("1\n", &mut target);

        assert!(target.shut_down);
        assert!(output.ends_with("Service stopped. Exiting.\n"));
    }

    #[test]
    fn auto_refresh_until_interrupted() {
        let interrupt = Interrupt::default();
        let menu = Menu::new(interrupt.clone()).with_refresh_interval(Duration::from_millis(10));

        let trigger = std::thread::spawn({
            let interrupt = interrupt.clone();
            move || {
                while !interrupt.is_refreshing() {
                    std::thread::sleep(Duration::from_millis(5));
                }
                std::thread::sleep(Duration::from_millis(100));
                interrupt.trigger();
            }
        });

        let mut target = FakeTarget::default();
        let mut output = Vec::new();
        menu.run(&mut target, "2\n3\n".as_bytes(), &mut output).unwrap();
        trigger.join().unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Auto-refreshing. Press Ctrl+C to return to menu.\n"));
        assert!(target.status_calls.load(Ordering::Relaxed) >= 2);
        assert!(!interrupt.is_refreshing());
        assert!(target.shut_down);
    }
}
