//! Command-line interface.

use clap::error::ErrorKind;
use clap::Parser;

/// Exit status for missing arguments.
pub const EXIT_USAGE: u8 = 2;

/// Exit status for invalid arguments and runtime errors.
pub const EXIT_INVALID: u8 = 1;

/// Program the Omega2 hardware PWM.
///
/// A frequency of 0 turns the channel off.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Cli {
    /// PWM channel.
    #[arg(value_parser = clap::value_parser!(u8).range(0..=3))]
    pub channel: u8,
    /// Frequency in Hertz.
    pub frequency: u32,
    /// Duty cycle in percent.
    #[arg(default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub duty: u8,
    /// More logging, repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Log level for the given verbosity.
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Exit status for a failed parse, 0 for help and version output.
pub fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        ErrorKind::MissingRequiredArgument
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => EXIT_USAGE,
        _ => EXIT_INVALID,
    }
}
