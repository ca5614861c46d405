//! Node topology parsing.
//!
//! The `hosts` property is a semicolon-delimited list of node URLs. The
//! first node is the primary; any further nodes are read replicas.

use std::fmt;

use crate::error::{StoreError, StoreResult};

const SCHEMES: &[&str] = &["redis://", "rediss://"];

/// One node of the store topology.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeAddress {
    url: String,
    host: String,
}

impl NodeAddress {
    /// Parse a single node URL.
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let url = raw.trim();
        let rest = SCHEMES
            .iter()
            .find_map(|scheme| url.strip_prefix(scheme))
            .ok_or_else(|| {
                StoreError::Config(format!("unsupported scheme in node address {url:?}"))
            })?;

        let authority = rest.split(['/', '?']).next().unwrap_or_default();
        let host_port = authority.rsplit('@').next().unwrap_or_default();
        let (host, port) = split_host_port(host_port);
        if host.is_empty() {
            return Err(StoreError::Config(format!(
                "node address {url:?} has no host"
            )));
        }
        if let Some(port) = port {
            port.parse::<u16>().map_err(|_| {
                StoreError::Config(format!("node address {url:?} has invalid port {port:?}"))
            })?;
        }

        Ok(Self {
            url: url.to_string(),
            host: host_port.to_string(),
        })
    }

    /// The full connection URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// `host[:port]` without credentials, for logging.
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}

fn split_host_port(host_port: &str) -> (&str, Option<&str>) {
    // Bracketed IPv6 literal.
    if host_port.starts_with('[') {
        return match host_port.find(']') {
            Some(end) => {
                let port = host_port[end + 1..].strip_prefix(':');
                (&host_port[..=end], port)
            }
            None => ("", None),
        };
    }
    match host_port.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (host_port, None),
    }
}

/// A primary node plus zero or more read replicas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topology {
    nodes: Vec<NodeAddress>,
}

impl Topology {
    /// Parse a semicolon-delimited node list. Blank entries are skipped.
    pub fn parse(hosts: &str) -> StoreResult<Self> {
        let nodes = hosts
            .split(';')
            .filter(|entry| !entry.trim().is_empty())
            .map(NodeAddress::parse)
            .collect::<StoreResult<Vec<_>>>()?;
        if nodes.is_empty() {
            return Err(StoreError::Config("node list is empty".into()));
        }
        Ok(Self { nodes })
    }

    pub fn primary(&self) -> &NodeAddress {
        &self.nodes[0]
    }

    pub fn replicas(&self) -> &[NodeAddress] {
        &self.nodes[1..]
    }

    /// All nodes, primary first.
    pub fn nodes(&self) -> &[NodeAddress] {
        &self.nodes
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hosts: Vec<&str> = self.nodes.iter().map(NodeAddress::host).collect();
        write!(f, "{}", hosts.join(";"))
    }
}
