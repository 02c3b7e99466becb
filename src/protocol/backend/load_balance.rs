//! Load balancing redirect message.

use crate::error::{Error, Result};
use crate::protocol::codec::{read_cstr, read_i32};

/// LoadBalanceResponse message - names the node the client should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadBalanceResponse<'a> {
    /// Host of the target node
    pub host: &'a str,
    /// Port of the target node
    pub port: u16,
}

impl<'a> LoadBalanceResponse<'a> {
    /// Parse a LoadBalanceResponse from payload bytes.
    ///
    /// Layout: 32-bit port followed by a null-terminated host.
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (port, rest) = read_i32(payload)?;
        let port = u16::try_from(port)
            .map_err(|_| Error::Message(format!("LoadBalanceResponse: invalid port {}", port)))?;
        let (host, _) = read_cstr(rest)?;
        if host.is_empty() {
            return Err(Error::Message("LoadBalanceResponse: empty host".into()));
        }
        Ok(Self { host, port })
    }
}
