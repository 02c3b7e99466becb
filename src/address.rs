//! Ordered list of candidate server addresses with lazy DNS resolution.
//!
//! The list starts with the primary host(s) followed by the backup nodes.
//! Host names are only resolved when they reach the head of the queue; each
//! name expands in place into one resolved candidate per IPv4 address, in
//! resolver order.

use std::collections::VecDeque;
use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use crate::error::{Error, Result};
use crate::opts::{Hosts, Opts, Ports};

/// Resolves a host name to socket addresses.
pub trait Resolve {
    /// Return the addresses for `host:port`, in preference order.
    fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>>;
}

/// Resolver backed by the system DNS (`getaddrinfo`).
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsResolver;

impl Resolve for DnsResolver {
    fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        Ok((host, port).to_socket_addrs()?.collect())
    }
}

/// A (host, port) pair to try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCandidate {
    /// IPv4 literal once resolved, the configured name before.
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Whether `host` is a resolved address
    pub resolved: bool,
    /// The name `host` was resolved from (used for TLS verification).
    pub hostname: String,
}

impl AddressCandidate {
    /// An unresolved candidate.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        Self {
            hostname: host.clone(),
            host,
            port,
            resolved: false,
        }
    }

    /// Socket address of a resolved candidate.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        if !self.resolved {
            return None;
        }
        self.host
            .parse::<IpAddr>()
            .ok()
            .map(|ip| SocketAddr::new(ip, self.port))
    }
}

impl std::fmt::Display for AddressCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Double-ended queue of candidates used for failover.
pub struct AddressList {
    queue: VecDeque<AddressCandidate>,
    resolver: Box<dyn Resolve>,
}

impl std::fmt::Debug for AddressList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressList")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl AddressList {
    /// Create a list over explicit candidates.
    pub fn new<R: Resolve + 'static>(
        candidates: impl IntoIterator<Item = (String, u16)>,
        resolver: R,
    ) -> Self {
        Self {
            queue: candidates
                .into_iter()
                .map(|(host, port)| AddressCandidate::new(host, port))
                .collect(),
            resolver: Box::new(resolver),
        }
    }

    /// Build the list from connection options using the system resolver.
    pub fn from_opts(opts: &Opts) -> Result<Self> {
        Self::from_opts_with_resolver(opts, DnsResolver)
    }

    /// Build the list from connection options.
    ///
    /// Primary candidates come first, then `backup_server_node` in order.
    pub fn from_opts_with_resolver<R: Resolve + 'static>(opts: &Opts, resolver: R) -> Result<Self> {
        let mut candidates: Vec<(String, u16)> = match (&opts.host, &opts.port) {
            (Hosts::One(host), Ports::One(port)) => vec![(host.clone(), *port)],
            (Hosts::Many(hosts), Ports::Many(ports)) => {
                if hosts.is_empty() || hosts.len() != ports.len() {
                    let msg = "Hosts and ports cannot be empty and must be equal in number";
                    tracing::error!("{}", msg);
                    return Err(Error::Connection(msg.into()));
                }
                hosts.iter().cloned().zip(ports.iter().copied()).collect()
            }
            (host, port) => {
                let msg = format!(
                    "Host {:?} and port {:?} must both be single values or both be lists",
                    host, port
                );
                tracing::error!("{}", msg);
                return Err(Error::InvalidUsage(msg));
            }
        };

        for node in &opts.backup_server_node {
            if node.host().is_empty() {
                return Err(Error::InvalidUsage(
                    "backup_server_node entries must have a non-empty host".into(),
                ));
            }
            candidates.push((node.host().to_string(), node.port()));
        }

        Ok(Self::new(candidates, resolver))
    }

    /// Return the first resolved candidate, resolving names at the head of
    /// the queue as needed.
    ///
    /// Names that fail to resolve, or resolve to no IPv4 address, are dropped.
    pub fn peek(&mut self) -> Option<&AddressCandidate> {
        while self.queue.front().is_some_and(|c| !c.resolved) {
            let Some(unresolved) = self.queue.pop_front() else {
                break;
            };
            match self.resolver.resolve(&unresolved.host, unresolved.port) {
                Ok(addrs) => {
                    let resolved: Vec<AddressCandidate> = addrs
                        .into_iter()
                        .filter(SocketAddr::is_ipv4)
                        .map(|addr| AddressCandidate {
                            host: addr.ip().to_string(),
                            port: addr.port(),
                            resolved: true,
                            hostname: unresolved.hostname.clone(),
                        })
                        .collect();
                    if resolved.is_empty() {
                        tracing::warn!(
                            "Host {} resolved to no IPv4 address, skipping",
                            unresolved
                        );
                    }
                    for candidate in resolved.into_iter().rev() {
                        self.queue.push_front(candidate);
                    }
                }
                Err(e) => {
                    tracing::warn!("Error resolving host {}: {}", unresolved, e);
                }
            }
        }
        self.queue.front()
    }

    /// Insert an unresolved candidate at the front (load-balance redirect).
    pub fn push(&mut self, host: impl Into<String>, port: u16) {
        self.queue.push_front(AddressCandidate::new(host, port));
    }

    /// Discard the front candidate (after a failed connect).
    pub fn pop(&mut self) -> Option<AddressCandidate> {
        self.queue.pop_front()
    }

    /// Number of candidates left, resolved or not.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true when no candidate is left.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;
    use crate::opts::BackupServerNode;

    /// Resolver over a fixed table; unknown names fail.
    struct FakeResolver(HashMap<&'static str, Vec<IpAddr>>);

    impl Resolve for FakeResolver {
        fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
            if let Ok(ip) = host.parse::<IpAddr>() {
                return Ok(vec![SocketAddr::new(ip, port)]);
            }
            self.0
                .get(host)
                .map(|ips| ips.iter().map(|ip| SocketAddr::new(*ip, port)).collect())
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such host"))
        }
    }

    fn resolver() -> FakeResolver {
        let mut table = HashMap::new();
        table.insert(
            "multi",
            vec![
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                IpAddr::V6(Ipv6Addr::LOCALHOST),
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            ],
        );
        table.insert("v6only", vec![IpAddr::V6(Ipv6Addr::LOCALHOST)]);
        table.insert("backup", vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9))]);
        FakeResolver(table)
    }

    fn list(hosts: &[(&str, u16)]) -> AddressList {
        AddressList::new(
            hosts.iter().map(|(h, p)| (h.to_string(), *p)),
            resolver(),
        )
    }

    #[test]
    fn test_peek_expands_in_resolver_order() {
        let mut addrs = list(&[("multi", 5433), ("backup", 5433)]);

        let first = addrs.peek().unwrap();
        assert_eq!(first.host, "10.0.0.1");
        assert!(first.resolved);
        assert_eq!(first.hostname, "multi");
        assert_eq!(addrs.len(), 3);

        addrs.pop();
        assert_eq!(addrs.peek().unwrap().host, "10.0.0.2");
        addrs.pop();
        assert_eq!(addrs.peek().unwrap().host, "10.0.0.9");
        addrs.pop();
        assert!(addrs.peek().is_none());
        assert!(addrs.is_empty());
    }

    #[test]
    fn test_peek_skips_unresolvable_hosts() {
        let mut addrs = list(&[("invalidhost", 9999), ("v6only", 5433), ("backup", 6000)]);

        let first = addrs.peek().unwrap();
        assert_eq!(first.to_string(), "10.0.0.9:6000");
        assert_eq!(addrs.len(), 1);
    }

    #[test]
    fn test_peek_on_exhausted_list() {
        let mut addrs = list(&[("invalidhost", 9999)]);
        assert!(addrs.peek().is_none());
        assert!(addrs.is_empty());
    }

    #[test]
    fn test_push_goes_to_front() {
        let mut addrs = list(&[("backup", 5433)]);
        assert_eq!(addrs.peek().unwrap().host, "10.0.0.9");

        addrs.push("10.0.0.5", 5444);
        let head = addrs.peek().unwrap();
        assert_eq!(head.socket_addr(), Some("10.0.0.5:5444".parse().unwrap()));
        assert_eq!(addrs.len(), 2);
    }

    #[test]
    fn test_from_opts_order() {
        let opts = Opts {
            host: "multi".into(),
            port: 5433.into(),
            backup_server_node: vec![
                BackupServerNode::Host("backup".into()),
                BackupServerNode::from(("10.0.0.7", 7000)),
            ],
            ..Opts::default()
        };
        let mut addrs = AddressList::from_opts_with_resolver(&opts, resolver()).unwrap();

        let mut seen = Vec::new();
        while let Some(candidate) = addrs.peek() {
            seen.push(candidate.to_string());
            addrs.pop();
        }
        assert_eq!(
            seen,
            ["10.0.0.1:5433", "10.0.0.2:5433", "10.0.0.9:5433", "10.0.0.7:7000"]
        );
    }

    #[test]
    fn test_from_opts_zips_host_and_port_lists() {
        let opts = Opts {
            host: Hosts::Many(vec!["10.0.0.1".into(), "10.0.0.2".into()]),
            port: Ports::Many(vec![1, 2]),
            ..Opts::default()
        };
        let mut addrs = AddressList::from_opts_with_resolver(&opts, resolver()).unwrap();
        assert_eq!(addrs.peek().unwrap().to_string(), "10.0.0.1:1");
        addrs.pop();
        assert_eq!(addrs.peek().unwrap().to_string(), "10.0.0.2:2");
    }

    #[test]
    fn test_from_opts_rejects_bad_shapes() {
        let empty = Opts {
            host: Hosts::Many(Vec::new()),
            port: Ports::Many(Vec::new()),
            ..Opts::default()
        };
        assert!(matches!(
            AddressList::from_opts_with_resolver(&empty, resolver()),
            Err(Error::Connection(_))
        ));

        let uneven = Opts {
            host: Hosts::Many(vec!["a".into()]),
            port: Ports::Many(vec![1, 2]),
            ..Opts::default()
        };
        assert!(matches!(
            AddressList::from_opts_with_resolver(&uneven, resolver()),
            Err(Error::Connection(_))
        ));

        let mixed = Opts {
            host: "a".into(),
            port: Ports::Many(vec![1]),
            ..Opts::default()
        };
        assert!(matches!(
            AddressList::from_opts_with_resolver(&mixed, resolver()),
            Err(Error::InvalidUsage(_))
        ));

        let empty_backup = Opts {
            host: "a".into(),
            backup_server_node: vec![BackupServerNode::HostPort(String::new(), 1)],
            ..Opts::default()
        };
        assert!(matches!(
            AddressList::from_opts_with_resolver(&empty_backup, resolver()),
            Err(Error::InvalidUsage(_))
        ));
    }
}
