mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use cli::Cli;
use omega2::devmem::DevMem;
use omega2::pwm::{self, Channel, Pwm};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(cli::exit_code(err.kind()));
        }
    };

    env_logger::Builder::new()
        .filter_module("omega2", cli.log_level())
        .filter_module("omega2_pwm", cli.log_level())
        .parse_default_env()
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            // Bad requests get a usage hint, environment errors do not.
            if let Some(err) = err.downcast_ref::<omega2::Error>() {
                if !err.is_environment() {
                    eprintln!("\n{}", Cli::command().render_usage());
                }
            }
            ExitCode::from(cli::EXIT_INVALID)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let channel = Channel::try_from(cli.channel)?;
    let config = pwm::Config {
        frequency: cli.frequency,
        duty: cli.duty,
    };

    log::debug!(
        "Configuring {} with frequency {}Hz, duty {}%",
        channel,
        config.frequency,
        config.duty
    );

    // Reject unachievable requests before asking for /dev/mem.
    let timing = config.timing()?;

    let mem = DevMem::open().context("Cannot access physical memory")?;
    let mut pwm = Pwm::new(mem);

    let timing = pwm
        .apply(channel, timing)
        .with_context(|| format!("Failed to program {}", channel))?;

    match timing {
        None => log::info!("{} disabled", channel),
        Some(timing) => {
            log::info!(
                "{}: {:?} clock, divider {}, {} ticks ({} high, {} low), {}Hz",
                channel,
                timing.mode,
                timing.divider,
                timing.duration,
                timing.high,
                timing.low,
                timing.actual_frequency()
            );
            let state = pwm.state(channel)?;
            log::debug!("{} read back: {:?}", channel, state);
            if !state.enabled {
                log::warn!("{} did not stay enabled", channel);
            }
        }
    }

    Ok(())
}
