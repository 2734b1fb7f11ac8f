/// Errors talking to the cluster API. "Target not found" is not one of them.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// The HTTP client could not be built or the login request failed.
    #[error("could not connect to {host}")]
    Connect {
        host: String,
        #[source]
        source: reqwest::Error,
    },

    /// The login request was answered but rejected.
    #[error("authentication as {user} on {host} failed (HTTP {status})")]
    Authentication {
        host: String,
        user: String,
        status: u16,
    },

    /// A query failed on the network level (DNS, TLS, timeout, ...).
    #[error("request to {path} failed")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered a query with a non-2xx status.
    #[error("{path} returned HTTP {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    /// The answer did not have the expected shape.
    #[error("unexpected response from {path}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
