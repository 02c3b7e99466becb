//! Connection options.

use std::time::Duration;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::Error;

/// Default server port.
pub const DEFAULT_PORT: u16 = 5433;

/// SSL connection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Don't use SSL
    #[default]
    Disable,
    /// Require SSL; fail if the server refuses it
    Require,
}

/// Primary host(s).
///
/// `Many` is the legacy way of listing several candidates and must be paired
/// with `Ports::Many` of the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hosts {
    One(String),
    Many(Vec<String>),
}

impl Default for Hosts {
    fn default() -> Self {
        Hosts::One(String::new())
    }
}

impl From<&str> for Hosts {
    fn from(host: &str) -> Self {
        Hosts::One(host.to_string())
    }
}

impl From<String> for Hosts {
    fn from(host: String) -> Self {
        Hosts::One(host)
    }
}

impl<S: Into<String>> From<Vec<S>> for Hosts {
    fn from(hosts: Vec<S>) -> Self {
        Hosts::Many(hosts.into_iter().map(Into::into).collect())
    }
}

/// Primary port(s), see [`Hosts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ports {
    One(u16),
    Many(Vec<u16>),
}

impl Default for Ports {
    fn default() -> Self {
        Ports::One(DEFAULT_PORT)
    }
}

impl From<u16> for Ports {
    fn from(port: u16) -> Self {
        Ports::One(port)
    }
}

impl From<Vec<u16>> for Ports {
    fn from(ports: Vec<u16>) -> Self {
        Ports::Many(ports)
    }
}

/// A fallback node tried when the primary host is unreachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupServerNode {
    /// Host on the default port
    Host(String),
    /// Host and port
    HostPort(String, u16),
}

impl BackupServerNode {
    /// Host of the node.
    pub fn host(&self) -> &str {
        match self {
            BackupServerNode::Host(host) | BackupServerNode::HostPort(host, _) => host,
        }
    }

    /// Port of the node, falling back to [`DEFAULT_PORT`].
    pub fn port(&self) -> u16 {
        match self {
            BackupServerNode::Host(_) => DEFAULT_PORT,
            BackupServerNode::HostPort(_, port) => *port,
        }
    }
}

impl<S: Into<String>> From<(S, u16)> for BackupServerNode {
    fn from((host, port): (S, u16)) -> Self {
        BackupServerNode::HostPort(host.into(), port)
    }
}

impl TryFrom<&str> for BackupServerNode {
    type Error = Error;

    /// Parse `host` or `host:port`.
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let s = s.trim();
        let node = match s.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse().map_err(|_| {
                    Error::InvalidUsage(format!(
                        "backup_server_node entry '{}' must be host or host:port",
                        s
                    ))
                })?;
                BackupServerNode::HostPort(host.to_string(), port)
            }
            None => BackupServerNode::Host(s.to_string()),
        };
        if node.host().is_empty() {
            return Err(Error::InvalidUsage(format!(
                "backup_server_node entry '{}' has an empty host",
                s
            )));
        }
        Ok(node)
    }
}

/// Connection options.
#[derive(Debug, Clone)]
pub struct Opts {
    /// Hostname or IP address of the primary node.
    ///
    /// Default: `""`
    pub host: Hosts,

    /// Port of the primary node.
    ///
    /// Default: `5433`
    pub port: Ports,

    /// Username for authentication.
    ///
    /// Default: `""`
    pub user: String,

    /// Password for authentication.
    ///
    /// Default: `None`
    pub password: Option<String>,

    /// Database name to use.
    ///
    /// Default: `None`
    pub database: Option<String>,

    /// SSL connection mode.
    ///
    /// Default: `SslMode::Disable`
    pub ssl_mode: SslMode,

    /// TLS context used when `ssl_mode` is `Require`.
    ///
    /// Default: `None` (a default `native_tls::TlsConnector`)
    #[cfg(feature = "sync-tls")]
    pub tls_connector: Option<native_tls::TlsConnector>,

    /// Ask the server for a load-balancing redirect before authenticating.
    ///
    /// Default: `false`
    pub connection_load_balance: bool,

    /// Nodes tried, in order, after the primary host.
    ///
    /// Default: `[]`
    pub backup_server_node: Vec<BackupServerNode>,

    /// Timeout for each TCP connect attempt.
    ///
    /// Default: `None` (OS default)
    pub connection_timeout: Option<Duration>,

    /// Socket read timeout once the session is established.
    ///
    /// Default: `600s`
    pub read_timeout: Option<Duration>,

    /// Additional startup parameters.
    ///
    /// Default: `[]`
    pub params: Vec<(String, String)>,

    /// Tracing dispatcher that receives this connection's diagnostics.
    ///
    /// Default: `None` (whatever subscriber is the current default)
    pub log_dispatch: Option<tracing::Dispatch>,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            host: Hosts::default(),
            port: Ports::default(),
            user: String::new(),
            password: None,
            database: None,
            ssl_mode: SslMode::Disable,
            #[cfg(feature = "sync-tls")]
            tls_connector: None,
            connection_load_balance: false,
            backup_server_node: Vec::new(),
            connection_timeout: None,
            read_timeout: Some(Duration::from_secs(600)),
            params: Vec::new(),
            log_dispatch: None,
        }
    }
}

impl Opts {
    /// Check that all mandatory options are present and that credentials
    /// can be sent on the wire.
    pub fn validate(&self) -> Result<(), Error> {
        let host_missing = match &self.host {
            Hosts::One(host) => host.is_empty(),
            Hosts::Many(_) => false,
        };
        if host_missing {
            return Err(Error::Connection("host is required".into()));
        }
        if self.user.is_empty() {
            return Err(Error::Connection("user is required".into()));
        }
        let database = self
            .database
            .as_deref()
            .ok_or_else(|| Error::Connection("database is required".into()))?;
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| Error::Connection("password is required".into()))?;

        for (name, value) in [("user", self.user.as_str()), ("database", database), ("password", password)] {
            if !value.is_ascii() {
                return Err(Error::InvalidUsage(format!("{} must be ASCII", name)));
            }
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Error> {
    match value {
        "true" | "True" | "1" | "yes" | "on" => Ok(true),
        "false" | "False" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidUsage(format!("Invalid {}: {}", key, value))),
    }
}

/// Undo the percent-encoding `Url` keeps in the user info.
fn decode_userinfo(key: &str, value: &str) -> Result<String, Error> {
    percent_decode_str(value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| Error::InvalidUsage(format!("Invalid {} in URL: {}", key, e)))
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration, Error> {
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| Error::InvalidUsage(format!("Invalid {}: {}", key, value)))
}

impl TryFrom<&Url> for Opts {
    type Error = Error;

    /// Parse a connection URL.
    ///
    /// Format: `vertica://[user[:password]@]host[:port][/database][?param1=value1&param2=value2&..]`
    ///
    /// Supported query parameters:
    /// - `ssl`: disable, require (or a boolean)
    /// - `connection_load_balance`: true/True/1/yes/on or false/False/0/no/off
    /// - `backup_server_node`: comma-separated `host` or `host:port` entries
    /// - `connection_timeout`: seconds
    /// - `read_timeout`: seconds
    ///
    /// Any other parameter is sent as a startup parameter.
    fn try_from(url: &Url) -> Result<Self, Self::Error> {
        if url.scheme() != "vertica" {
            return Err(Error::InvalidUsage(format!(
                "Invalid scheme: expected 'vertica://', got '{}://'",
                url.scheme()
            )));
        }

        let mut opts = Opts {
            host: Hosts::One(url.host_str().unwrap_or("localhost").to_string()),
            port: Ports::One(url.port().unwrap_or(DEFAULT_PORT)),
            user: decode_userinfo("user", url.username())?,
            password: url
                .password()
                .map(|s| decode_userinfo("password", s))
                .transpose()?,
            database: url.path().strip_prefix('/').and_then(|s| {
                if s.is_empty() {
                    None
                } else {
                    Some(s.to_string())
                }
            }),
            ..Opts::default()
        };

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "ssl" => {
                    opts.ssl_mode = match value.as_ref() {
                        "disable" => SslMode::Disable,
                        "require" => SslMode::Require,
                        other => {
                            if parse_bool("ssl", other)? {
                                SslMode::Require
                            } else {
                                SslMode::Disable
                            }
                        }
                    };
                }
                "connection_load_balance" => {
                    opts.connection_load_balance = parse_bool(&key, &value)?;
                }
                "backup_server_node" => {
                    for entry in value.split(',').filter(|e| !e.trim().is_empty()) {
                        opts.backup_server_node
                            .push(BackupServerNode::try_from(entry)?);
                    }
                }
                "connection_timeout" => {
                    opts.connection_timeout = Some(parse_seconds(&key, &value)?);
                }
                "read_timeout" => {
                    opts.read_timeout = Some(parse_seconds(&key, &value)?);
                }
                _ => {
                    opts.params.push((key.to_string(), value.to_string()));
                }
            }
        }

        Ok(opts)
    }
}

impl TryFrom<&str> for Opts {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let url = Url::parse(s).map_err(|e| Error::InvalidUsage(format!("Invalid URL: {}", e)))?;
        Self::try_from(&url)
    }
}
