use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::bail;
use chrono::Locale;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;

use pvemon::logging::{self, LocalizedTime};
use pvemon::sampler::{self, Mode, Sampler, DEFAULT_STEP, READ_TEST_INTERVAL};
use pvemon::store::{RoundRobinStore, RrdTool, StoreLayout};
use pvemon::temperature::THERMAL_ZONE_PATH;

/// Samples the CPU temperature into a round robin database.
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Cli {
    /// Round robin database file
    #[clap(default_value = "cputemp.rrd")]
    rrd: PathBuf,

    /// Seconds between samples, between 10 and 300. Must not exceed the step the database
    /// was created with, longer gaps are stored as unknown
    #[clap(short, long, default_value_t = DEFAULT_STEP)]
    step: u64,

    /// Create the database and exit
    #[clap(long, conflicts_with_all = ["continuous", "read_test"])]
    create: bool,

    /// Keep sampling until interrupted
    #[clap(short, long)]
    continuous: bool,

    /// Only read the sensor every few seconds until interrupted, no database needed
    #[clap(long, conflicts_with = "continuous")]
    read_test: bool,

    /// Print nothing per sample, log errors only
    #[clap(short, long)]
    quiet: bool,

    /// More diagnostics on stderr, repeat for more
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Locale of the printed timestamps
    #[clap(long, default_value = "POSIX", value_parser = logging::parse_locale)]
    locale: Locale,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet {
        LevelFilter::ERROR
    } else {
        logging::level_for(cli.verbose)
    };
    let clock = LocalizedTime::new(cli.locale);
    logging::init(level, Some(clock));

    match run(&cli, clock) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, clock: LocalizedTime) -> anyhow::Result<()> {
    if cli.read_test {
        let shutdown = sampler::install_shutdown_handler()?;
        sampler::read_test(
            Path::new(THERMAL_ZONE_PATH),
            Duration::from_secs(READ_TEST_INTERVAL),
            &clock,
            &shutdown,
        );
        return Ok(());
    }

    let store = RrdTool::new(&cli.rrd);
    let (step, clamped) = sampler::clamp_step(cli.step);

    if cli.create {
        if clamped {
            warn!(requested = cli.step, step, "step out of range, clamped");
        }

        store.create(&StoreLayout::for_step(step))?;
        info!(path = %store.path().display(), step, "created round robin database");
        return Ok(());
    }

    if !store.exists() {
        bail!(
            "{} does not exist, create it first with --create",
            store.path().display()
        );
    }

    match store.step() {
        Ok(Some(created)) if step > created => warn!(
            step,
            created,
            "step is longer than the database step, samples beyond its heartbeat are stored as unknown"
        ),
        Ok(_) => {}
        Err(err) => warn!("cannot read the database step: {:#}", anyhow::Error::from(err)),
    }

    let shutdown = sampler::install_shutdown_handler()?;
    let mode = if cli.continuous {
        Mode::Continuous
    } else {
        Mode::Once
    };

    let cycles = Sampler::new(store, cli.step)
        .quiet(cli.quiet)
        .with_clock(clock)
        .run(mode, &shutdown)?;
    info!(cycles, "done");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_read_test_needs_no_database_options() {
        let cli = Cli::try_parse_from(["cputemp", "--read-test"]).unwrap();
        assert!(cli.read_test);

        assert!(Cli::try_parse_from(["cputemp", "--read-test", "--create"]).is_err());
        assert!(Cli::try_parse_from(["cputemp", "--read-test", "-c"]).is_err());
    }
}
