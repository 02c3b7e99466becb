//! Frontend (client → server) messages.

pub mod auth;
pub mod simple;
pub mod startup;

pub use auth::{encode_password, write_password};
pub use simple::write_query;
pub use startup::{
    write_cancel_request, write_load_balance_request, write_ssl_request, write_startup,
    write_terminate,
};

use crate::error::Result;
use crate::protocol::backend::AuthenticationMessage;

/// Frontend message type bytes.
pub mod msg_type {
    /// Password response
    pub const PASSWORD: u8 = b'p';
    /// Query (simple query protocol)
    pub const QUERY: u8 = b'Q';
    /// Terminate
    pub const TERMINATE: u8 = b'X';
}

/// A message sent by the client.
#[derive(Debug, Clone, Copy)]
pub enum FrontendMessage<'a> {
    /// First message of a session, carrying the identity to authenticate.
    Startup {
        user: &'a str,
        database: &'a str,
        params: &'a [(String, String)],
    },
    /// Answer to an authentication challenge.
    Password {
        user: &'a str,
        password: &'a str,
        challenge: &'a AuthenticationMessage<'a>,
    },
    /// Graceful end of session.
    Terminate,
    /// Ask the server to cancel the running statement of a backend.
    CancelRequest { pid: u32, key: u32 },
    /// Untagged preamble asking for TLS.
    SslRequest,
    /// Untagged preamble asking for a load-balancing redirect.
    LoadBalanceRequest,
    /// Simple query.
    Query(&'a str),
}

impl FrontendMessage<'_> {
    /// Append the wire encoding of this message to `buf`.
    ///
    /// Only a Password can fail, when the challenge names a method this
    /// client cannot answer.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        match *self {
            FrontendMessage::Startup {
                user,
                database,
                params,
            } => {
                let mut pairs: Vec<(&str, &str)> = vec![("user", user), ("database", database)];
                pairs.extend(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                write_startup(buf, &pairs);
            }
            FrontendMessage::Password {
                user,
                password,
                challenge,
            } => {
                let encoded = encode_password(challenge, user, password)?;
                write_password(buf, &encoded);
            }
            FrontendMessage::Terminate => write_terminate(buf),
            FrontendMessage::CancelRequest { pid, key } => write_cancel_request(buf, pid, key),
            FrontendMessage::SslRequest => write_ssl_request(buf),
            FrontendMessage::LoadBalanceRequest => write_load_balance_request(buf),
            FrontendMessage::Query(sql) => write_query(buf, sql),
        }
        Ok(())
    }
}

impl std::fmt::Display for FrontendMessage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrontendMessage::Startup { user, database, .. } => {
                write!(f, "Startup(user={}, database={})", user, database)
            }
            FrontendMessage::Password { challenge, .. } => {
                write!(f, "Password(method={})", challenge.code())
            }
            FrontendMessage::Terminate => f.write_str("Terminate"),
            FrontendMessage::CancelRequest { pid, .. } => write!(f, "CancelRequest(pid={})", pid),
            FrontendMessage::SslRequest => f.write_str("SslRequest"),
            FrontendMessage::LoadBalanceRequest => f.write_str("LoadBalanceRequest"),
            FrontendMessage::Query(sql) => write!(f, "Query({})", sql),
        }
    }
}
