//! The pvemon crate provides the building blocks of two small monitoring tools: a Proxmox VE
//! status check speaking the nagios/icinga plugin protocol, and a CPU temperature sampler
//! feeding a round robin database.

use std::cmp::Ordering;
use std::fmt;
use std::process;

#[macro_use]
mod macros;

pub mod cluster;
pub mod config_generator;
pub mod evaluate;
pub mod logging;
pub mod metric;
pub mod probe;
pub mod range;
mod runner;
pub mod sampler;
pub mod store;
pub mod temperature;

pub use crate::evaluate::{evaluate, evaluate_all};
pub use crate::metric::{Metric, MetricName, MetricValue, Sample, Unit};
pub use crate::range::{Range, RangeError, Thresholds};
pub use crate::runner::{Runner, RunnerResult};

/// A Resource represents a single service from the perspective of nagios. It collects the
/// evaluated results of one check and renders them as the one line a monitoring system reads.
///
/// If no state is set explicitly, the worst state of the pushed results is used.
///
/// ```rust
/// # use pvemon::{CheckResult, Metric, MetricName, Resource, State};
/// let metric = Metric::new(MetricName::NodeStatus, true);
/// let resource = Resource::new("PROXMOX")
///     .with_description("node pve is online")
///     .with_result(CheckResult::new(State::Ok, "online", metric));
/// assert_eq!(&resource.to_nagios_string(), "PROXMOX OK: node pve is online");
/// ```
#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    state: Option<State>,
    description: Option<String>,
    results: Vec<CheckResult>,
}

impl Resource {
    pub fn new(name: &str) -> Resource {
        Resource {
            name: name.to_owned(),
            state: None,
            description: None,
            results: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }

    /// Forces the state of this resource, ignoring the states of the pushed results.
    pub fn with_state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_result(mut self, result: CheckResult) -> Self {
        self.push(result);
        self
    }

    pub fn with_results(mut self, results: impl IntoIterator<Item = CheckResult>) -> Self {
        self.results.extend(results);
        self
    }

    /// Pushes a single evaluated result into the resource.
    pub fn push(&mut self, result: CheckResult) {
        self.results.push(result)
    }

    /// Returns a slice of the pushed results.
    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = Some(description.to_owned());
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Will determine a State by the pushed results.
    ///
    /// In case a state is manually set for this resource it will return that one instead. A
    /// resource without any result is UNKNOWN.
    pub fn state(&self) -> State {
        if let Some(state) = self.state {
            return state;
        }

        self.results
            .iter()
            .map(|r| r.state)
            .max()
            .unwrap_or(State::Unknown)
    }

    /// Returns a string which nagios understands to determine the service state.
    ///
    /// Only results with a numeric value end up in the performance data section.
    pub fn to_nagios_string(&self) -> String {
        let mut s = format!("{} {}", self.name, self.state());

        if let Some(ref description) = self.description {
            s.push_str(&format!(": {}", description));
        }

        let perfdata: Vec<String> = self
            .results
            .iter()
            .filter_map(|r| r.metric.to_perf_string())
            .collect();

        if !perfdata.is_empty() {
            s.push_str(" | ");
            s.push_str(&perfdata.join(" "));
        }

        s
    }

    /// Will return the exit code of the determined state.
    pub fn exit_code(&self) -> i32 {
        self.state().exit_code()
    }

    /// Will print Self::to_nagios_string and exit with the exit code from Self::exit_code
    pub fn print_and_exit(&self) -> ! {
        println!("{}", self.to_nagios_string());
        process::exit(self.exit_code());
    }
}

/// The verdict for a single metric together with the metric it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub state: State,
    pub message: String,
    pub metric: Metric,
}

impl CheckResult {
    pub fn new(state: State, message: &str, metric: Metric) -> Self {
        CheckResult {
            state,
            message: message.to_owned(),
            metric,
        }
    }
}

/// Represents a service state from nagios.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl State {
    /// Returns the corresponding nagios exit code to signal the service state of self.
    pub fn exit_code(&self) -> i32 {
        match self {
            State::Ok => 0,
            State::Warning => 1,
            State::Critical => 2,
            State::Unknown => 3,
        }
    }

    fn severity(&self) -> u8 {
        match self {
            State::Ok => 0,
            State::Unknown => 1,
            State::Warning => 2,
            State::Critical => 3,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Ok => "OK",
            State::Warning => "WARNING",
            State::Critical => "CRITICAL",
            State::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

impl Ord for State {
    fn cmp(&self, other: &State) -> Ordering {
        self.severity().cmp(&other.severity())
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &State) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The purpose of ToPerfString is only so one can define custom representations of custom types
/// without using the ToString trait so we don't interfere with that.
///
/// Also used internally for generation of the final output.
pub trait ToPerfString {
    fn to_perf_string(&self) -> String;
}

impl_to_perf_string_on_to_string!(u8, u16, u32, u64, i32, i64);
impl_to_perf_string_on_to_string!(f32, f64);

impl<T> ToPerfString for Option<T>
where
    T: ToPerfString,
{
    fn to_perf_string(&self) -> String {
        match self {
            Some(ref s) => s.to_perf_string(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{CheckResult, Metric, MetricName, Range, Resource, State, Thresholds, Unit};

    fn rate(value: f64) -> Metric {
        let thresholds = Thresholds::new(
            "80".parse::<Range>().unwrap(),
            "90".parse::<Range>().unwrap(),
        );
        Metric::new(MetricName::MemUsageRate, value)
            .with_unit(Unit::Percentage)
            .with_min(0.0)
            .with_thresholds(thresholds)
    }

    #[test]
    fn test_resource() {
        let r1 = CheckResult::new(State::Ok, "online", Metric::new(MetricName::NodeStatus, true));
        let resource = resource!["PROXMOX"; r1];
        assert_eq!(&resource.to_nagios_string(), "PROXMOX OK");

        let r1 = CheckResult::new(State::Warning, "high", rate(85.0));
        let mut resource = resource!["PROXMOX"; r1];
        resource.set_description("memory usage of node pve");

        assert_eq!(
            &resource.to_nagios_string(),
            "PROXMOX WARNING: memory usage of node pve | mem_usage_rate=85%;80;90;0"
        );
    }

    #[test]
    fn test_resource_worst_state_wins() {
        let total = Metric::new(MetricName::MemUsageTotal, 512.0).with_unit(Unit::Mebibytes);
        let resource = Resource::new("PROXMOX")
            .with_result(CheckResult::new(State::Ok, "", total))
            .with_result(CheckResult::new(State::Critical, "", rate(95.0)))
            .with_result(CheckResult::new(
                State::Unknown,
                "",
                Metric::absent(MetricName::VmStatus),
            ));
        assert_eq!(resource.state(), State::Critical);
        assert_eq!(resource.exit_code(), 2);
    }

    #[test]
    fn test_resource_without_results_is_unknown() {
        let resource = Resource::new("PROXMOX");
        assert_eq!(resource.state(), State::Unknown);
        assert_eq!(&resource.to_nagios_string(), "PROXMOX UNKNOWN");

        let resource = Resource::new("PROXMOX").with_state(State::Ok);
        assert_eq!(resource.state(), State::Ok);
    }

    #[test]
    fn test_state() {
        assert_eq!(State::Ok.exit_code(), 0);
        assert_eq!(State::Warning.exit_code(), 1);
        assert_eq!(State::Critical.exit_code(), 2);
        assert_eq!(State::Unknown.exit_code(), 3);

        assert_eq!(&State::Ok.to_string(), "OK");
        assert_eq!(&State::Warning.to_string(), "WARNING");
        assert_eq!(&State::Critical.to_string(), "CRITICAL");
        assert_eq!(&State::Unknown.to_string(), "UNKNOWN");

        assert!(State::Ok < State::Unknown);
        assert!(State::Unknown < State::Warning);
        assert!(State::Warning < State::Critical);
    }
}
