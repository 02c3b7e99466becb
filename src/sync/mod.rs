//! Synchronous Vertica client.

mod conn;
pub mod socket;
mod stream;

pub use conn::Conn;
pub use socket::establish;
