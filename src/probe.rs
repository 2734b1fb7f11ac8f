//! Probe dispatch: one query against the cluster per check, turned into metrics.
//!
//! A probe scans the full answer for the requested target and takes the first match. Finding
//! nothing is a legitimate outcome and yields a metric without value; only a failing query is
//! an error.

use std::fmt;

use tracing::{debug, info};

use crate::cluster::{ClusterApi, ClusterError};
use crate::{evaluate_all, Metric, MetricName, Resource, Thresholds, Unit};

/// Name printed in front of every check result.
pub const CHECK_NAME: &str = "PROXMOX";

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq)]
pub enum VmSelector {
    Name(String),
    Id(u32),
}

impl fmt::Display for VmSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmSelector::Name(name) => f.write_str(name),
            VmSelector::Id(id) => write!(f, "{}", id),
        }
    }
}

/// The kinds of checks, each carrying only what it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    Node,
    Service { name: String },
    Vm(VmSelector),
    Memory(Thresholds),
    Subscription,
}

impl Check {
    /// What is being checked, for the summary line.
    pub fn target(&self, node: &str) -> String {
        match self {
            Check::Node => format!("node {}", node),
            Check::Service { name } => format!("service {} on node {}", name, node),
            Check::Vm(selector) => format!("VM {} on node {}", selector, node),
            Check::Memory(_) => format!("memory usage of node {}", node),
            Check::Subscription => format!("subscription of node {}", node),
        }
    }
}

/// Issues the single query `check` needs and builds its metrics.
pub fn probe(
    api: &dyn ClusterApi,
    node: &str,
    check: &Check,
) -> Result<Vec<Metric>, ClusterError> {
    info!(check = %check.target(node), "probing");

    let metrics = match check {
        Check::Node => {
            let online = api
                .cluster_status()?
                .into_iter()
                .filter(|entry| entry.kind == "node")
                .find(|entry| entry.name == node)
                .map(|entry| entry.online.unwrap_or(false));
            vec![Metric::from_option(MetricName::NodeStatus, online)]
        }
        Check::Service { name } => {
            let running = api
                .services(node)?
                .into_iter()
                .find(|service| &service.name == name)
                .map(|service| {
                    debug!(service = %service.name, state = ?service.state, "found service");
                    service.is_running()
                });
            vec![Metric::from_option(MetricName::ServiceStatus, running)]
        }
        Check::Vm(selector) => {
            let status = api
                .vms(node)?
                .into_iter()
                .find(|vm| match selector {
                    VmSelector::Name(name) => vm.name.as_deref() == Some(name.as_str()),
                    VmSelector::Id(id) => vm.vmid == *id,
                })
                .map(|vm| vm.status);
            vec![Metric::from_option(MetricName::VmStatus, status)]
        }
        Check::Subscription => {
            let status = api.subscription(node)?.status;
            debug!(%status, "subscription status");
            vec![Metric::new(MetricName::SubscriptionStatus, status)]
        }
        Check::Memory(thresholds) => {
            let usage = api
                .cluster_resources()?
                .into_iter()
                .filter(|entry| entry.kind == "node")
                .find(|entry| entry.node.as_deref() == Some(node))
                .and_then(|entry| Some((entry.mem?, entry.maxmem?)));

            match usage {
                Some((used, max)) => memory_metrics(used, max, thresholds),
                None => vec![
                    Metric::absent(MetricName::MemUsageTotal),
                    Metric::absent(MetricName::MemUsageRate).with_thresholds(thresholds.clone()),
                ],
            }
        }
    };

    if metrics.iter().all(|m| m.value().is_none()) {
        debug!(check = %check.target(node), "target not found");
    }

    Ok(metrics)
}

/// Total usage in MiB (one decimal) and usage rate in percent (two decimals). The rate has no
/// value if `max` is zero.
pub fn memory_metrics(used: u64, max: u64, thresholds: &Thresholds) -> Vec<Metric> {
    debug!(used, max, "raw memory values");

    let total = round(used as f64 / MIB, 1);
    let rate = (max > 0).then(|| round(used as f64 / max as f64 * 100.0, 2));

    vec![
        Metric::new(MetricName::MemUsageTotal, total)
            .with_unit(Unit::Mebibytes)
            .with_min(0.0),
        Metric::from_option(MetricName::MemUsageRate, rate)
            .with_unit(Unit::Percentage)
            .with_min(0.0)
            .with_thresholds(thresholds.clone()),
    ]
}

fn round(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// A complete check: the node to look at and what to check on it.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckRequest {
    pub node: String,
    pub check: Check,
}

/// Probes, evaluates and assembles the plugin output for one check.
pub fn run_check(api: &dyn ClusterApi, request: &CheckRequest) -> Result<Resource, ClusterError> {
    let metrics = probe(api, &request.node, &request.check)?;
    let results = evaluate_all(metrics);

    let messages: Vec<&str> = results.iter().map(|r| r.message.as_str()).collect();
    let description = format!("{}: {}", request.check.target(&request.node), summary(&messages));

    Ok(Resource::new(CHECK_NAME)
        .with_description(&description)
        .with_results(results))
}

fn summary(messages: &[&str]) -> String {
    let mut unique: Vec<&str> = Vec::with_capacity(messages.len());
    for message in messages {
        if !unique.contains(message) {
            unique.push(message);
        }
    }
    unique.join(", ")
}

/// Validates a node name for use in API paths: a host name label made of ASCII letters,
/// digits and `-`. For use as a clap value parser.
pub fn parse_node_name(name: &str) -> Result<String, String> {
    if name.is_empty() {
        return Err("node name must not be empty".to_owned());
    }
    if let Some(c) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-')) {
        return Err(format!("invalid character '{}' in node name", c));
    }
    Ok(name.to_owned())
}

pub fn list_nodes(api: &dyn ClusterApi) -> Result<Vec<String>, ClusterError> {
    Ok(api.nodes()?.into_iter().map(|n| n.node).collect())
}

pub fn list_services(api: &dyn ClusterApi, node: &str) -> Result<Vec<String>, ClusterError> {
    Ok(api.services(node)?.into_iter().map(|s| s.name).collect())
}

/// VMs as `<vmid> <name> (<status>)`.
pub fn list_vms(api: &dyn ClusterApi, node: &str) -> Result<Vec<String>, ClusterError> {
    Ok(api
        .vms(node)?
        .into_iter()
        .map(|vm| match vm.name {
            Some(name) => format!("{} {} ({})", vm.vmid, name, vm.status),
            None => format!("{} ({})", vm.vmid, vm.status),
        })
        .collect())
}
