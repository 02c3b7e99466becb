//! TCP establishment with failover across the address list.

use std::net::TcpStream;
use std::time::Duration;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::address::{AddressCandidate, AddressList};
use crate::error::{Error, Result};

fn connect(candidate: &AddressCandidate, timeout: Option<Duration>) -> Result<TcpStream> {
    let addr = candidate
        .socket_addr()
        .ok_or_else(|| Error::Connection(format!("{} is not a resolved address", candidate)))?;

    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_keepalive(true)?;
    let addr = SockAddr::from(addr);
    match timeout {
        Some(timeout) => socket.connect_timeout(&addr, timeout)?,
        None => socket.connect(&addr)?,
    }
    let stream = TcpStream::from(socket);
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Connect to the first reachable candidate.
///
/// Candidates that refuse or time out are popped from the list. Returns the
/// socket together with the candidate it is connected to.
pub fn establish(
    addresses: &mut AddressList,
    timeout: Option<Duration>,
) -> Result<(TcpStream, AddressCandidate)> {
    while let Some(candidate) = addresses.peek() {
        let candidate = candidate.clone();
        tracing::info!(
            "Establishing connection to host '{}' on port {}",
            candidate.hostname,
            candidate.port
        );
        match connect(&candidate, timeout) {
            Ok(stream) => {
                tracing::info!("Connection is established to {}", candidate);
                return Ok((stream, candidate));
            }
            Err(e) => {
                tracing::warn!("Failed to connect to {}: {}", candidate, e);
                addresses.pop();
            }
        }
    }

    let msg = "Failed to establish a connection to the primary server or any backup address.";
    tracing::error!("{}", msg);
    Err(Error::Connection(msg.into()))
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::net::{SocketAddr, TcpListener};

    use super::*;
    use crate::address::Resolve;

    struct Literal;

    impl Resolve for Literal {
        fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
            Ok(vec![SocketAddr::new(
                host.parse().map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?,
                port,
            )])
        }
    }

    fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_fails_over_to_next_candidate() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let open = listener.local_addr().unwrap().port();

        let mut addresses = AddressList::new(
            [
                ("127.0.0.1".to_string(), closed_port()),
                ("127.0.0.1".to_string(), open),
            ],
            Literal,
        );
        let (stream, candidate) =
            establish(&mut addresses, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(candidate.port, open);
        assert_eq!(stream.peer_addr().unwrap().port(), open);
        assert_eq!(addresses.len(), 1);
    }

    #[test]
    fn test_exhausted_list() {
        let mut addresses = AddressList::new([("127.0.0.1".to_string(), closed_port())], Literal);
        let err = establish(&mut addresses, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Connection error: Failed to establish a connection to the primary server or any backup address."
        );
        assert!(addresses.is_empty());
    }
}
