//! Access to the Proxmox VE cluster management API.
//!
//! Probes only see the [`ClusterApi`] trait; [`PveClient`] is the HTTP implementation used by
//! the `check_proxmox` binary.

mod client;
mod error;

pub use client::{ConnectOptions, PveClient, DEFAULT_PORT};
pub use error::ClusterError;

use serde::{Deserialize, Deserializer};

/// The queries the checks need from the cluster. All calls are blocking request/response.
pub trait ClusterApi {
    /// `GET /nodes`
    fn nodes(&self) -> Result<Vec<NodeEntry>, ClusterError>;
    /// `GET /nodes/{node}/services`
    fn services(&self, node: &str) -> Result<Vec<ServiceEntry>, ClusterError>;
    /// `GET /nodes/{node}/qemu`
    fn vms(&self, node: &str) -> Result<Vec<VmEntry>, ClusterError>;
    /// `GET /cluster/status`
    fn cluster_status(&self) -> Result<Vec<ClusterStatusEntry>, ClusterError>;
    /// `GET /nodes/{node}/subscription`
    fn subscription(&self, node: &str) -> Result<Subscription, ClusterError>;
    /// `GET /cluster/resources`
    fn cluster_resources(&self) -> Result<Vec<ResourceEntry>, ClusterError>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeEntry {
    pub node: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    /// `running`, `stopped`, ...
    #[serde(default)]
    pub state: Option<String>,
}

impl ServiceEntry {
    pub fn is_running(&self) -> bool {
        self.state.as_deref() == Some("running")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VmEntry {
    pub vmid: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub status: String,
}

/// One entry of `/cluster/status`. Only entries of type `node` carry an online flag.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClusterStatusEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, deserialize_with = "flag")]
    pub online: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Subscription {
    pub status: String,
}

/// One entry of `/cluster/resources`. Memory fields are in bytes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub mem: Option<u64>,
    #[serde(default)]
    pub maxmem: Option<u64>,
}

/// The API reports flags as `0`/`1`, some versions as booleans.
fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(Option::<Flag>::deserialize(deserializer)?.map(|f| match f {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    }))
}
