use std::io::{BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

#[cfg(feature = "sync-tls")]
use native_tls::TlsStream;

pub enum Stream {
    Tcp(BufReader<TcpStream>),
    #[cfg(feature = "sync-tls")]
    Tls(BufReader<TlsStream<TcpStream>>),
}

impl Stream {
    pub fn tcp(stream: TcpStream) -> Self {
        Self::Tcp(BufReader::new(stream))
    }

    #[cfg(feature = "sync-tls")]
    pub fn tls(stream: TlsStream<TcpStream>) -> Self {
        Self::Tls(BufReader::new(stream))
    }

    pub fn is_tls(&self) -> bool {
        match self {
            Stream::Tcp(_) => false,
            #[cfg(feature = "sync-tls")]
            Stream::Tls(_) => true,
        }
    }

    fn tcp_ref(&self) -> &TcpStream {
        match self {
            Stream::Tcp(r) => r.get_ref(),
            #[cfg(feature = "sync-tls")]
            Stream::Tls(r) => r.get_ref().get_ref(),
        }
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        match self {
            Stream::Tcp(r) => r.read_exact(buf),
            #[cfg(feature = "sync-tls")]
            Stream::Tls(r) => r.read_exact(buf),
        }
    }

    pub fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Stream::Tcp(r) => r.get_mut().write_all(buf),
            #[cfg(feature = "sync-tls")]
            Stream::Tls(r) => r.get_mut().write_all(buf),
        }
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Tcp(r) => r.get_mut().flush(),
            #[cfg(feature = "sync-tls")]
            Stream::Tls(r) => r.get_mut().flush(),
        }
    }

    pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.tcp_ref().peer_addr()
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        self.tcp_ref().set_read_timeout(timeout)
    }

    pub fn shutdown(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Tcp(r) => r.get_mut().shutdown(Shutdown::Both),
            #[cfg(feature = "sync-tls")]
            Stream::Tls(r) => {
                if let Err(e) = r.get_mut().shutdown() {
                    tracing::debug!("TLS close_notify failed: {}", e);
                }
                r.get_ref().get_ref().shutdown(Shutdown::Both)
            }
        }
    }

    /// Unwrap a plain TCP stream, e.g. for the TLS upgrade.
    ///
    /// Bytes already buffered are discarded; the caller only unwraps right
    /// after a one-byte exchange.
    pub fn into_tcp(self) -> Option<TcpStream> {
        match self {
            Stream::Tcp(r) => Some(r.into_inner()),
            #[cfg(feature = "sync-tls")]
            Stream::Tls(_) => None,
        }
    }
}
