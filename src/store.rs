//! The round robin database the temperature samples go to.
//!
//! [`RrdTool`] drives the `rrdtool` command line tool; the file format and its aggregation are
//! entirely rrdtool's business.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::Sample;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("round robin database {} already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("round robin database {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("failed to run {}", .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("rrdtool {action} failed with {status}: {stderr}")]
    Command {
        action: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// A store of timestamped temperature values.
pub trait RoundRobinStore {
    fn exists(&self) -> bool;

    /// Provisions a new store. Never overwrites an existing one.
    fn create(&self, layout: &StoreLayout) -> Result<(), StoreError>;

    /// Appends one value at `timestamp` (seconds since the epoch).
    fn update(&self, timestamp: i64, value: f64) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consolidation {
    Average,
    Min,
    Max,
}

impl fmt::Display for Consolidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Consolidation::Average => "AVERAGE",
            Consolidation::Min => "MIN",
            Consolidation::Max => "MAX",
        })
    }
}

/// One aggregation tier: `steps` primary values consolidate into one of `rows` rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    pub consolidation: Consolidation,
    pub steps: u64,
    pub rows: u64,
}

impl fmt::Display for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RRA:{}:0.5:{}:{}",
            self.consolidation, self.steps, self.rows
        )
    }
}

/// Name of the single data source.
pub const DATA_SOURCE: &str = "temp";

/// Aggregation tiers as (seconds per row, rows kept): 5 minutes for a day, 1 hour for 30 days,
/// 1 day for a year.
const TIERS: [(u64, u64); 3] = [(300, 288), (3600, 720), (86400, 365)];

#[derive(Debug, Clone, PartialEq)]
pub struct StoreLayout {
    pub step: u64,
    pub heartbeat: u64,
    pub archives: Vec<Archive>,
}

impl StoreLayout {
    /// Sizes the tiers so that each row covers the same wall clock time whatever the step.
    pub fn for_step(step: u64) -> Self {
        let step = step.max(1);
        let archives = TIERS
            .iter()
            .flat_map(|&(seconds, rows)| {
                let steps = seconds.div_ceil(step).max(1);
                [Consolidation::Average, Consolidation::Min, Consolidation::Max]
                    .into_iter()
                    .map(move |consolidation| Archive {
                        consolidation,
                        steps,
                        rows,
                    })
            })
            .collect();

        StoreLayout {
            step,
            heartbeat: step * 2,
            archives,
        }
    }

    /// Arguments for `rrdtool create` after the file name.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--step".to_owned(),
            self.step.to_string(),
            format!("DS:{}:GAUGE:{}:U:U", DATA_SOURCE, self.heartbeat),
        ];
        args.extend(self.archives.iter().map(|a| a.to_string()));
        args
    }
}

/// A round robin database file managed through the `rrdtool` binary.
#[derive(Debug, Clone)]
pub struct RrdTool {
    path: PathBuf,
    binary: PathBuf,
}

impl RrdTool {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_binary(path, "rrdtool")
    }

    pub fn with_binary(path: impl AsRef<Path>, binary: impl AsRef<Path>) -> Self {
        RrdTool {
            path: path.as_ref().to_owned(),
            binary: binary.as_ref().to_owned(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The step the database was created with, from `rrdtool info`.
    pub fn step(&self) -> Result<Option<u64>, StoreError> {
        if !self.exists() {
            return Err(StoreError::Missing(self.path.clone()));
        }

        let info = self.run("info", vec![self.path.clone().into()])?;
        Ok(parse_info_step(&info))
    }

    fn run(&self, action: &'static str, args: Vec<OsString>) -> Result<String, StoreError> {
        debug!(binary = %self.binary.display(), ?args, "running rrdtool");

        let output = Command::new(&self.binary)
            .arg(action)
            .args(&args)
            .output()
            .map_err(|source| StoreError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(StoreError::Command {
                action,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Picks `step = <seconds>` out of `rrdtool info` output.
fn parse_info_step(info: &str) -> Option<u64> {
    info.lines()
        .filter_map(|line| line.split_once('='))
        .find(|(key, _)| key.trim() == "step")
        .and_then(|(_, value)| value.trim().parse().ok())
}

impl RoundRobinStore for RrdTool {
    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn create(&self, layout: &StoreLayout) -> Result<(), StoreError> {
        if self.exists() {
            return Err(StoreError::AlreadyExists(self.path.clone()));
        }

        let mut args: Vec<OsString> = vec![self.path.clone().into(), "--no-overwrite".into()];
        args.extend(layout.to_args().into_iter().map(OsString::from));
        self.run("create", args).map(|_| ())
    }

    fn update(&self, timestamp: i64, value: f64) -> Result<(), StoreError> {
        if !self.exists() {
            return Err(StoreError::Missing(self.path.clone()));
        }

        let args: Vec<OsString> = vec![
            self.path.clone().into(),
            format!("{}:{}", timestamp, value).into(),
        ];
        self.run("update", args).map(|_| ())
    }
}

/// Writes a present sample to the store and returns the written value. An absent sample is
/// skipped without touching the store.
pub fn update_store(
    store: &impl RoundRobinStore,
    sample: &Sample,
) -> Result<Option<f64>, StoreError> {
    let celsius = match sample.celsius {
        Some(celsius) => celsius,
        None => return Ok(None),
    };

    store.update(sample.taken_at.timestamp(), celsius)?;
    Ok(Some(celsius))
}
