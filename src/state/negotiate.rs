//! Pre-startup negotiation: load-balance redirect and SSL.
//!
//! Both requests are answered by a single byte. The decisions are kept free of
//! I/O so the connection only has to perform the reads and writes.

use std::net::SocketAddr;

use crate::error::{Error, Result};
use crate::protocol::backend::LoadBalanceResponse;

/// Byte the server sends when it will answer a LoadBalanceRequest.
pub const LOAD_BALANCE_ACCEPTED: u8 = b'Y';

/// Byte the server sends when it accepts an SslRequest.
pub const SSL_ACCEPTED: u8 = b'S';

/// What the server said to a LoadBalanceRequest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBalanceReply {
    /// A LoadBalanceResponse message follows.
    Redirect,
    /// Load balancing is off on the server; keep the current socket.
    Declined(u8),
}

impl LoadBalanceReply {
    pub fn from_byte(response: u8) -> Self {
        if response == LOAD_BALANCE_ACCEPTED {
            LoadBalanceReply::Redirect
        } else {
            LoadBalanceReply::Declined(response)
        }
    }
}

/// Returns true when the redirect target is the node we are already talking to.
///
/// The target may name the node by address or by the host name it was
/// reached through.
pub fn is_current_peer(
    target: &LoadBalanceResponse<'_>,
    peer: Option<SocketAddr>,
    hostname: &str,
) -> bool {
    peer.is_some_and(|peer| {
        peer.port() == target.port
            && (peer.ip().to_string() == target.host
                || target.host.eq_ignore_ascii_case(hostname))
    })
}

/// Check the server's answer to an SslRequest.
pub fn check_ssl_reply(response: u8) -> Result<()> {
    if response == SSL_ACCEPTED {
        Ok(())
    } else {
        tracing::error!("SSL requested but not supported by server");
        Err(Error::SslNotSupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_balance_reply() {
        assert_eq!(LoadBalanceReply::from_byte(b'Y'), LoadBalanceReply::Redirect);
        assert_eq!(LoadBalanceReply::from_byte(b'N'), LoadBalanceReply::Declined(b'N'));
    }

    #[test]
    fn test_is_current_peer() {
        let target = LoadBalanceResponse {
            host: "10.0.0.3",
            port: 5433,
        };
        let peer = |s: &str| Some(s.parse().unwrap());
        assert!(is_current_peer(&target, peer("10.0.0.3:5433"), "db1"));
        assert!(!is_current_peer(&target, peer("10.0.0.3:5434"), "db1"));
        assert!(!is_current_peer(&target, peer("10.0.0.4:5433"), "db1"));
        assert!(!is_current_peer(&target, None, "10.0.0.3"));
    }

    #[test]
    fn test_is_current_peer_by_hostname() {
        let target = LoadBalanceResponse {
            host: "DB1.example.com",
            port: 5433,
        };
        let peer = Some("10.0.0.3:5433".parse().unwrap());
        assert!(is_current_peer(&target, peer, "db1.example.com"));
        assert!(!is_current_peer(&target, peer, "db2.example.com"));

        let other_port = Some("10.0.0.3:5434".parse().unwrap());
        assert!(!is_current_peer(&target, other_port, "db1.example.com"));
    }

    #[test]
    fn test_ssl_reply() {
        assert!(check_ssl_reply(b'S').is_ok());
        assert!(matches!(check_ssl_reply(b'N'), Err(Error::SslNotSupported)));
    }
}
