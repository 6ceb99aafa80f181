//! Buzzfeed
//!
//! Sends hex command data to a serial buzzer/feedback controller.
//!
//! Usage:
//!   buzzfeed -d DEVICE -b BAUDRATE -l DATABITS -s STOPBITS -p PARITY -f FILENAME -i STRING
//!
//! At least one of `-f` or `-i` is required. When both are given the inline
//! data goes first, and a wait directive may continue from one into the other.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use buzzfeed_core::{
    open_port, open_sources, run_streams, FeedError, Parity, PortSettings, RunSummary, Source,
    SpinWait, DEFAULT_BAUD_RATE, DEFAULT_DEVICE,
};
use clap::{ArgAction, ArgGroup, CommandFactory, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "buzzfeed", version)]
#[command(about = "Stream hex command data to a serial buzzer controller", long_about = None)]
#[command(group(ArgGroup::new("data").required(true).multiple(true).args(["file", "inline"])))]
struct Cli {
    /// Serial device, usually COMx on Windows or /dev/ttyUSBx, /dev/ttyACMx elsewhere
    #[arg(short, long, env = "BUZZFEED_DEVICE", default_value = DEFAULT_DEVICE)]
    device: String,

    /// Baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Data bits
    #[arg(short = 'l', long, default_value_t = 8, value_parser = clap::value_parser!(u8).range(5..=8))]
    data_bits: u8,

    /// Stop bits
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    stop_bits: u8,

    /// Parity: N, O or E for none, odd or even
    #[arg(short, long, default_value = "N")]
    parity: Parity,

    /// Read command data from FILE
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Take command data from STRING (quote it if it contains spaces)
    #[arg(short, long, value_name = "STRING")]
    inline: Option<String>,

    /// Pause after opening the port, for boards that reset on open
    #[arg(long, value_name = "MS", default_value_t = 0)]
    reset_delay: u64,

    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn port_settings(&self) -> PortSettings {
        PortSettings {
            device: self.device.clone(),
            baud_rate: self.baud,
            data_bits: self.data_bits,
            stop_bits: self.stop_bits,
            parity: self.parity,
            reset_delay: Duration::from_millis(self.reset_delay),
        }
    }

    /// Inline data first, then the file. Blank inline data counts as absent.
    fn sources(&self) -> Vec<Source> {
        let mut sources = Vec::new();
        if let Some(text) = &self.inline {
            if text.chars().any(|c| !c.is_whitespace()) {
                sources.push(Source::Inline(text.clone()));
            }
        }
        if let Some(path) = &self.file {
            sources.push(Source::File(path.clone()));
        }
        sources
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_usage() {
    if let Err(e) = Cli::command().print_help() {
        debug!("failed to print usage: {}", e);
    }
}

fn feed(cli: &Cli) -> anyhow::Result<RunSummary> {
    let settings = cli.port_settings();
    let sources = cli.sources();

    // Input files are checked before the device is touched
    let streams = open_sources(&sources)?;
    let port = open_port(&settings)?;

    // The port is moved in and closed when the run ends, on success or error
    let summary = run_streams(streams, port, SpinWait)
        .with_context(|| format!("Feeding {} failed", settings.device))?;
    Ok(summary)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.sources().is_empty() {
        print_usage();
        return ExitCode::FAILURE;
    }

    match feed(&cli) {
        Ok(summary) => {
            debug!(?summary, "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            match e.downcast_ref::<FeedError>() {
                Some(FeedError::PortOpen { device, .. }) => {
                    eprintln!(
                        "Could not open serial device {} -- incorrect device, or cable unplugged?",
                        device
                    );
                }
                _ => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
