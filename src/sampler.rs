//! The sampling loop: read the temperature, write it to the store, wait one step, repeat.
//!
//! The wait is a `recv_timeout` on a shutdown channel, so an interrupt ends the loop right away
//! but never in the middle of a store write.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::logging::LocalizedTime;
use crate::store::{update_store, RoundRobinStore, StoreError};
use crate::temperature::{read_temperature_from, THERMAL_ZONE_PATH};
use crate::Sample;

pub const MIN_STEP: u64 = 10;
pub const MAX_STEP: u64 = 300;
pub const DEFAULT_STEP: u64 = 100;
/// Seconds between readings in read test mode.
pub const READ_TEST_INTERVAL: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cannot install interrupt handler")]
    Signal(#[from] ctrlc::Error),
}

/// Clamps a step to `[MIN_STEP, MAX_STEP]`. The flag tells whether it had to be changed.
pub fn clamp_step(requested: u64) -> (u64, bool) {
    let step = requested.clamp(MIN_STEP, MAX_STEP);
    (step, step != requested)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One sample, then return.
    Once,
    /// Sample every step until interrupted.
    Continuous,
}

/// Returns a channel that receives a message on SIGINT/SIGTERM.
pub fn install_shutdown_handler() -> Result<Receiver<()>, SamplerError> {
    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;
    Ok(rx)
}

pub struct Sampler<S> {
    store: S,
    step: Duration,
    source: PathBuf,
    quiet: bool,
    clock: LocalizedTime,
}

impl<S: RoundRobinStore> Sampler<S> {
    /// A sampler reading the CPU thermal zone every `step_secs` seconds (clamped).
    pub fn new(store: S, step_secs: u64) -> Self {
        let (step, clamped) = clamp_step(step_secs);
        if clamped {
            warn!(requested = step_secs, step, "step out of range, clamped");
        }

        Sampler {
            store,
            step: Duration::from_secs(step),
            source: PathBuf::from(THERMAL_ZONE_PATH),
            quiet: false,
            clock: LocalizedTime::default(),
        }
    }

    /// Reads from another file than the CPU thermal zone.
    pub fn with_source(mut self, source: impl AsRef<Path>) -> Self {
        self.source = source.as_ref().to_owned();
        self
    }

    /// Suppresses the per-cycle line on stdout.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_clock(mut self, clock: LocalizedTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// One cycle: read, write, report. A failed read is reported and skipped, a failed write is
    /// returned.
    pub fn sample_once(&self) -> Result<Sample, SamplerError> {
        let sample = Sample::now(read_temperature_from(&self.source));
        let written = update_store(&self.store, &sample)?;

        match written {
            Some(_) => {
                debug!(celsius = ?sample.celsius, "sample written");
                if !self.quiet {
                    println!("{} Temp={}", self.clock.now(), sample.metric().display_value());
                }
            }
            None => {
                warn!(source = %self.source.display(), "no temperature reading, nothing written");
                if !self.quiet {
                    println!("{} Error reading CPU temperature", self.clock.now());
                }
            }
        }

        Ok(sample)
    }

    /// Runs the loop and returns the number of completed cycles. Continuous mode ends when
    /// `shutdown` receives a message or its sender is gone.
    pub fn run(&self, mode: Mode, shutdown: &Receiver<()>) -> Result<usize, SamplerError> {
        info!(step = self.step.as_secs(), ?mode, "sampling");

        let mut cycles = 0;
        loop {
            self.sample_once()?;
            cycles += 1;

            if mode == Mode::Once {
                return Ok(cycles);
            }

            if !idle(self.step, shutdown) {
                info!(cycles, "interrupted, stopping");
                return Ok(cycles);
            }
        }
    }
}

/// Waits `step`. False once `shutdown` receives a message or its sender is gone.
fn idle(step: Duration, shutdown: &Receiver<()>) -> bool {
    matches!(shutdown.recv_timeout(step), Err(RecvTimeoutError::Timeout))
}

/// Reads `source` every `interval` and prints the reading until interrupted, without any
/// store. Returns the readings taken.
pub fn read_test(
    source: &Path,
    interval: Duration,
    clock: &LocalizedTime,
    shutdown: &Receiver<()>,
) -> Vec<Option<f64>> {
    info!(source = %source.display(), interval = interval.as_secs(), "read test");
    println!("Start reading...");

    let mut readings = Vec::new();
    loop {
        let sample = Sample::now(read_temperature_from(source));
        match sample.celsius {
            Some(_) => println!("{} {}", clock.now(), sample.metric().display_value()),
            None => println!("{} Error reading CPU temperature", clock.now()),
        }
        readings.push(sample.celsius);

        if !idle(interval, shutdown) {
            debug!(readings = readings.len(), "read test stopped");
            return readings;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_step() {
        assert_eq!(clamp_step(5), (10, true));
        assert_eq!(clamp_step(1000), (300, true));
        assert_eq!(clamp_step(50), (50, false));
        assert_eq!(clamp_step(10), (10, false));
        assert_eq!(clamp_step(300), (300, false));
        assert_eq!(clamp_step(0), (10, true));
    }
}
