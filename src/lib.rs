//! A blocking client for the Vertica wire protocol.
//!
//! # Features
//!
//! - **Failover**: the primary host and each backup node are tried in order,
//!   every DNS name expanding to all of its IPv4 addresses
//! - **Load balancing**: optional server-side redirect before authentication
//! - **Sans-I/O state machines**: protocol logic is separated from I/O
//! - **Injected logging**: diagnostics go to the `tracing` dispatcher set in
//!   [`Opts::log_dispatch`]
//!
//! # Example
//!
//! ```no_run
//! use zero_vertica::sync::Conn;
//! use zero_vertica::Opts;
//!
//! fn main() -> zero_vertica::error::Result<()> {
//!     let opts = Opts {
//!         host: "localhost".into(),
//!         user: "dbadmin".into(),
//!         database: Some("vmart".into()),
//!         password: Some("secret".into()),
//!         backup_server_node: vec![("10.0.0.2", 5433).into()],
//!         ..Default::default()
//!     };
//!
//!     Conn::run(opts, |conn| {
//!         println!("server version: {:?}", conn.parameter("server_version"));
//!         conn.query_drop("CREATE TABLE IF NOT EXISTS t (a INT)")
//!     })
//! }
//! ```

pub mod address;
pub mod buffer_set;
pub mod error;
pub mod opts;
pub mod protocol;
pub mod state;

#[cfg(feature = "sync")]
pub mod sync;

pub use address::{AddressCandidate, AddressList, DnsResolver, Resolve};
pub use buffer_set::BufferSet;
pub use error::{Error, ErrorFields, Result};
pub use opts::{BackupServerNode, Hosts, Opts, Ports, SslMode};
pub use protocol::types::TransactionStatus;
pub use protocol::{BackendMessage, FrontendMessage};
