//! Authentication and session-setup backend messages.

use zerocopy::byteorder::big_endian::U32 as U32BE;
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::error::{Error, Result};
use crate::protocol::codec::{read_bytes, read_cstr, read_i32, read_u32};
use crate::protocol::types::TransactionStatus;

/// Authentication method constants.
pub mod auth_type {
    pub const OK: i32 = 0;
    pub const KERBEROS_V5: i32 = 2;
    pub const CLEARTEXT_PASSWORD: i32 = 3;
    pub const CRYPT_PASSWORD: i32 = 4;
    pub const MD5_PASSWORD: i32 = 5;
    pub const SCM_CREDENTIAL: i32 = 6;
    pub const GSS: i32 = 7;
    pub const GSS_CONTINUE: i32 = 8;
    pub const SSPI: i32 = 9;
    pub const PASSWORD_CHANGED: i32 = 10;
    pub const PASSWORD_GRACE: i32 = 11;
    pub const HASH: i32 = 65536;
    pub const HASH_MD5: i32 = 65536 + 5;
    pub const HASH_SHA512: i32 = 65536 + 512;
}

/// Authentication message from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationMessage<'a> {
    /// Authentication successful
    Ok,
    /// Cleartext password required
    CleartextPassword,
    /// MD5 password required
    Md5Password { code: i32, salt: [u8; 4] },
    /// SHA-512 password required, optionally with a per-user salt
    Sha512Password {
        code: i32,
        salt: [u8; 4],
        user_salt: Option<&'a [u8]>,
    },
    /// A method this client does not answer (Kerberos, GSS, SSPI, crypt, ...)
    Other { code: i32, data: &'a [u8] },
}

impl<'a> AuthenticationMessage<'a> {
    /// Parse an Authentication message from payload bytes.
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (code, rest) = read_i32(payload)?;

        match code {
            auth_type::OK => Ok(AuthenticationMessage::Ok),
            auth_type::CLEARTEXT_PASSWORD => Ok(AuthenticationMessage::CleartextPassword),
            auth_type::MD5_PASSWORD => Ok(AuthenticationMessage::Md5Password {
                code,
                salt: read_salt(rest)?.0,
            }),
            auth_type::HASH_MD5 => Ok(AuthenticationMessage::Md5Password {
                code,
                salt: read_salt(rest)?.0,
            }),
            auth_type::HASH | auth_type::HASH_SHA512 => {
                let (salt, rest) = read_salt(rest)?;
                let user_salt = if rest.len() >= 4 {
                    let (len, rest) = read_u32(rest)?;
                    let (bytes, _) = read_bytes(rest, len as usize)?;
                    Some(bytes)
                } else {
                    None
                };
                Ok(AuthenticationMessage::Sha512Password {
                    code,
                    salt,
                    user_salt,
                })
            }
            _ => Ok(AuthenticationMessage::Other { code, data: rest }),
        }
    }

    /// The numeric authentication method code.
    pub fn code(&self) -> i32 {
        match *self {
            AuthenticationMessage::Ok => auth_type::OK,
            AuthenticationMessage::CleartextPassword => auth_type::CLEARTEXT_PASSWORD,
            AuthenticationMessage::Md5Password { code, .. }
            | AuthenticationMessage::Sha512Password { code, .. }
            | AuthenticationMessage::Other { code, .. } => code,
        }
    }

    /// Returns true for AuthenticationOk.
    pub fn is_ok(&self) -> bool {
        matches!(self, AuthenticationMessage::Ok)
    }
}

fn read_salt(data: &[u8]) -> Result<([u8; 4], &[u8])> {
    let (bytes, rest) = read_bytes(data, 4)
        .map_err(|_| Error::Message("Authentication: missing salt".into()))?;
    let mut salt = [0u8; 4];
    salt.copy_from_slice(bytes);
    Ok((salt, rest))
}

/// BackendKeyData message - contains process ID and secret key for cancellation.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
pub struct BackendKeyData {
    /// Process ID of the backend
    pub pid: U32BE,
    /// Secret key for cancellation
    pub secret_key: U32BE,
}

impl BackendKeyData {
    /// Parse a BackendKeyData message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<&Self> {
        Ok(Self::ref_from_bytes(payload)?)
    }

    /// Get the process ID.
    pub fn process_id(&self) -> u32 {
        self.pid.get()
    }

    /// Get the secret key.
    pub fn secret(&self) -> u32 {
        self.secret_key.get()
    }
}

/// ParameterStatus message - server parameter name and value.
#[derive(Debug, Clone, Copy)]
pub struct ParameterStatus<'a> {
    /// Parameter name
    pub name: &'a str,
    /// Parameter value
    pub value: &'a str,
}

impl<'a> ParameterStatus<'a> {
    /// Parse a ParameterStatus message from payload bytes.
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (name, rest) = read_cstr(payload)?;
        let (value, _) = read_cstr(rest)?;
        Ok(Self { name, value })
    }
}

/// Parse a ReadyForQuery payload into its transaction status.
pub fn parse_ready_for_query(payload: &[u8]) -> Result<TransactionStatus> {
    match payload {
        [status] => TransactionStatus::from_byte(*status).ok_or_else(|| {
            Error::Message(format!("ReadyForQuery: unknown status '{}'", *status as char))
        }),
        _ => Err(Error::Message(format!(
            "ReadyForQuery: expected 1 byte, got {}",
            payload.len()
        ))),
    }
}
