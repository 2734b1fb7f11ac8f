use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::COOKIE;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use super::{
    ClusterApi, ClusterError, ClusterStatusEntry, NodeEntry, ResourceEntry, ServiceEntry,
    Subscription, VmEntry,
};

/// Port of the Proxmox VE API when the host does not name one.
pub const DEFAULT_PORT: u16 = 8006;

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Host name or address, optionally with `:port` and an `https://` prefix.
    pub host: String,
    pub username: String,
    pub password: String,
    pub verify_ssl: bool,
    /// Passed to every request; enforcing it is up to the HTTP client.
    pub timeout: Duration,
}

/// Every API answer wraps its payload in `{"data": ...}`.
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct Ticket {
    ticket: String,
}

/// Blocking client for the Proxmox VE REST API, authenticated with a ticket.
pub struct PveClient {
    http: Client,
    base_url: String,
    ticket: String,
}

impl PveClient {
    /// Builds the HTTP client and logs in. Any failure here is fatal for a check.
    pub fn connect(options: &ConnectOptions) -> Result<Self, ClusterError> {
        let base_url = base_url(&options.host);
        let connect_error = |source| ClusterError::Connect {
            host: options.host.clone(),
            source,
        };

        debug!(%base_url, user = %options.username, verify_ssl = options.verify_ssl, "connecting");

        let http = Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(!options.verify_ssl)
            .build()
            .map_err(connect_error)?;

        let response = http
            .post(format!("{base_url}/access/ticket"))
            .form(&[
                ("username", options.username.as_str()),
                ("password", options.password.as_str()),
            ])
            .send()
            .map_err(connect_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClusterError::Authentication {
                host: options.host.clone(),
                user: options.username.clone(),
                status: status.as_u16(),
            });
        }

        let ticket: Envelope<Ticket> = response.json().map_err(connect_error)?;
        info!(host = %options.host, user = %options.username, "authenticated");

        Ok(PveClient {
            http,
            base_url,
            ticket: ticket.data.ticket,
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClusterError> {
        let transport_error = |source| ClusterError::Transport {
            path: path.to_owned(),
            source,
        };

        debug!(path, "GET");
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header(COOKIE, format!("PVEAuthCookie={}", self.ticket))
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().map_err(transport_error)?;
        if !status.is_success() {
            return Err(ClusterError::Status {
                path: path.to_owned(),
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|source| ClusterError::Decode {
                path: path.to_owned(),
                source,
            })?;
        Ok(envelope.data)
    }
}

impl ClusterApi for PveClient {
    fn nodes(&self) -> Result<Vec<NodeEntry>, ClusterError> {
        self.get("/nodes")
    }

    fn services(&self, node: &str) -> Result<Vec<ServiceEntry>, ClusterError> {
        self.get(&format!("/nodes/{node}/services"))
    }

    fn vms(&self, node: &str) -> Result<Vec<VmEntry>, ClusterError> {
        self.get(&format!("/nodes/{node}/qemu"))
    }

    fn cluster_status(&self) -> Result<Vec<ClusterStatusEntry>, ClusterError> {
        self.get("/cluster/status")
    }

    fn subscription(&self, node: &str) -> Result<Subscription, ClusterError> {
        self.get(&format!("/nodes/{node}/subscription"))
    }

    fn cluster_resources(&self) -> Result<Vec<ResourceEntry>, ClusterError> {
        self.get("/cluster/resources")
    }
}

/// `pve`, `pve:8007` or `https://pve` to `https://pve:8006/api2/json`.
fn base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    let host = host
        .strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host);

    if has_port(host) {
        format!("https://{host}/api2/json")
    } else {
        format!("https://{host}:{DEFAULT_PORT}/api2/json")
    }
}

fn has_port(host: &str) -> bool {
    if let Some(bracketed) = host.strip_prefix('[') {
        return bracketed.split_once("]:").is_some();
    }

    match host.split_once(':') {
        Some((_, port)) => !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        assert_eq!(base_url("pve"), "https://pve:8006/api2/json");
        assert_eq!(base_url("10.0.0.5"), "https://10.0.0.5:8006/api2/json");
        assert_eq!(base_url("pve:8007"), "https://pve:8007/api2/json");
        assert_eq!(base_url("https://pve.lan/"), "https://pve.lan:8006/api2/json");
        assert_eq!(base_url("[fe80::1]"), "https://[fe80::1]:8006/api2/json");
        assert_eq!(base_url("[fe80::1]:443"), "https://[fe80::1]:443/api2/json");
    }
}
