//! Vertica wire protocol implementation.
//!
//! The protocol is a derivative of PostgreSQL v3: every backend message is a
//! type byte, a 4-byte big-endian length that counts itself, and a payload.
//!
//! # Structure
//!
//! - `backend`: Server → Client messages (decoding)
//! - `frontend`: Client → Server messages (encoding)
//! - `codec`: Low-level encoding/decoding primitives
//! - `types`: Common protocol types (TransactionStatus)

pub mod backend;
pub mod codec;
pub mod frontend;
pub mod types;

pub use backend::BackendMessage;
pub use frontend::FrontendMessage;
pub use types::TransactionStatus;
