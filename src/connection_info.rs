//! Registry entry describing a connected endpoint.
//!
//! [`RpcConnectionInfo`] identifies a connection in the connection registry by
//! host, port and the services the endpoint offers. Two entries are equal when
//! host and port match and their service lists contain the same descriptors,
//! regardless of order or repetition. The textual form is JSON.

use std::{
    collections::BTreeSet,
    fmt,
    hash::{Hash, Hasher},
    net::SocketAddr,
};

use serde::{Deserialize, Serialize};

/// Descriptor of one service exposed by an endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcServiceInfo {
    /// Fully qualified service name.
    pub service_name: String,
    /// Service version; empty when unversioned.
    #[serde(default)]
    pub version: String,
}

impl RpcServiceInfo {
    /// Create a service descriptor.
    #[must_use]
    pub fn new(service_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            version: version.into(),
        }
    }
}

/// Endpoint identity used as the connection registry key.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcConnectionInfo {
    host: String,
    port: u16,
    #[serde(default, rename = "serviceInfoList")]
    services: Vec<RpcServiceInfo>,
}

impl RpcConnectionInfo {
    /// Create an entry for `host:port` offering `services`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, services: Vec<RpcServiceInfo>) -> Self {
        Self {
            host: host.into(),
            port,
            services,
        }
    }

    /// Entry for a peer address with no service metadata.
    #[must_use]
    pub fn from_addr(addr: SocketAddr) -> Self { Self::new(addr.ip().to_string(), addr.port(), Vec::new()) }

    /// Host name or address.
    #[must_use]
    pub fn host(&self) -> &str { &self.host }

    /// Port number.
    #[must_use]
    pub fn port(&self) -> u16 { self.port }

    /// Services offered by the endpoint, in insertion order.
    #[must_use]
    pub fn services(&self) -> &[RpcServiceInfo] { &self.services }

    /// Render the entry as JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> { serde_json::to_string(self) }

    /// Parse an entry from JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if `json` is not a valid entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use rpclink::connection_info::RpcConnectionInfo;
    ///
    /// let info = RpcConnectionInfo::from_json(r#"{"host":"10.0.0.5","port":9000}"#)
    ///     .expect("valid entry");
    /// assert_eq!(info.port(), 9000);
    /// assert!(info.services().is_empty());
    /// ```
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> { serde_json::from_str(json) }

    fn service_set(&self) -> BTreeSet<&RpcServiceInfo> { self.services.iter().collect() }
}

impl PartialEq for RpcConnectionInfo {
    fn eq(&self, other: &Self) -> bool {
        self.port == other.port
            && self.host == other.host
            && self.service_set() == other.service_set()
    }
}

impl Eq for RpcConnectionInfo {}

impl Hash for RpcConnectionInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.port.hash(state);
        self.service_set().hash(state);
    }
}

impl fmt::Display for RpcConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{}:{}", self.host, self.port),
        }
    }
}
