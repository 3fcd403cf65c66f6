use clap::{Args, Parser, Subcommand};
use pinwatch_logger::{
    json_log::{JsonLogConfig, DEFAULT_LOG_PATH},
    menu::{Interrupt, Menu},
    plot::{self, PlotArgs},
    serial_reader::SerialConfig,
    service::{LoggingService, ServiceConfig},
    Error,
};
use pinwatch_protocol::BAUD_RATE;
use std::{path::PathBuf, time::Duration};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Logs D4 to D7 pin states reported by the sampler board.
#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start logging with an interactive status menu
    Run(RunArgs),

    /// Plot a sample log in the terminal
    Plot(PlotArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Serial port
    #[arg(short, long)]
    port: String,

    /// Serial baud rate
    #[arg(short, long, default_value_t = BAUD_RATE)]
    baud: u32,

    /// Sample log to append to
    #[arg(long, default_value = DEFAULT_LOG_PATH)]
    json_path: PathBuf,

    /// Flush the sample log after this many records (0 to never force a flush)
    #[arg(long, default_value_t = 1)]
    flush_every: u32,

    /// Pause after each read attempt
    #[arg(long, default_value_t = 0)]
    poll_sleep_ms: u64,

    /// Serial read timeout
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Wait after opening the port for the board to reset
    #[arg(long, default_value_t = 2000)]
    startup_delay_ms: u64,

    /// Keep bytes received during the startup delay
    #[arg(long)]
    no_reset_input_buffer: bool,

    /// Report worker errors at error level
    #[arg(long)]
    print_errors: bool,
}

impl From<RunArgs> for ServiceConfig {
    fn from(args: RunArgs) -> Self {
        Self {
            serial: SerialConfig {
                port: args.port,
                baud: args.baud,
                timeout: Duration::from_millis(args.timeout_ms),
                startup_delay: Duration::from_millis(args.startup_delay_ms),
                reset_input_buffer: !args.no_reset_input_buffer,
            },
            log: JsonLogConfig {
                path: args.json_path,
                flush_every: args.flush_every,
            },
            poll_sleep: Duration::from_millis(args.poll_sleep_ms),
            print_errors: args.print_errors,
            stop_timeout: Duration::from_secs(2),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // stdout belongs to the menu
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Run(args) => run(args.into()),
        Command::Plot(args) => plot::run(&args),
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(config: ServiceConfig) -> Result<(), Error> {
    let interrupt = Interrupt::install()?;

    let mut service = LoggingService::new(config);
    service.start()?;
    info!("Logging service started");

    let menu = Menu::new(interrupt);
    menu.run(
        &mut service,
        std::io::stdin().lock(),
        &mut std::io::stdout().lock(),
    )?;

    Ok(())
}
