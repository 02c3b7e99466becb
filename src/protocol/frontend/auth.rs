//! Password messages and password hashing.

use md5::Md5;
use sha2::{Digest, Sha512};

use crate::error::{Error, Result};
use crate::protocol::backend::AuthenticationMessage;
use crate::protocol::codec::MessageBuilder;

/// Write a PasswordMessage carrying an already-encoded password.
pub fn write_password(buf: &mut Vec<u8>, password: &str) {
    let mut msg = MessageBuilder::new(buf, super::msg_type::PASSWORD);
    msg.write_cstr(password);
    msg.finish();
}

/// Hash `password` twice with digest `D`, first against `first_salt` and then
/// against `salt`, returning `prefix` followed by the hex digest.
fn double_hash<D>(prefix: &str, password: &[u8], first_salt: &[u8], salt: &[u8]) -> String
where
    D: Digest,
    sha2::digest::Output<D>: std::fmt::LowerHex,
{
    let mut hasher = D::new();
    hasher.update(password);
    hasher.update(first_salt);
    let first_hex = format!("{:x}", hasher.finalize());

    let mut hasher = D::new();
    hasher.update(first_hex.as_bytes());
    hasher.update(salt);
    format!("{}{:x}", prefix, hasher.finalize())
}

/// Compute MD5 password hash.
///
/// Format: "md5" + md5(md5(password + username) + salt)
pub fn md5_password(username: &str, password: &str, salt: &[u8]) -> String {
    double_hash::<Md5>("md5", password.as_bytes(), username.as_bytes(), salt)
}

/// Compute SHA-512 password hash.
///
/// Format: "sha512" + sha512(sha512(password + user_salt) + salt), where the
/// user salt falls back to the username when the server sent none.
pub fn sha512_password(username: &str, password: &str, salt: &[u8], user_salt: Option<&[u8]>) -> String {
    let first_salt = match user_salt {
        Some(s) if !s.is_empty() => s,
        _ => username.as_bytes(),
    };
    double_hash::<Sha512>("sha512", password.as_bytes(), first_salt, salt)
}

/// Encode the password the way the authentication challenge asks for.
pub fn encode_password(
    challenge: &AuthenticationMessage<'_>,
    username: &str,
    password: &str,
) -> Result<String> {
    match challenge {
        AuthenticationMessage::CleartextPassword => Ok(password.to_string()),
        AuthenticationMessage::Md5Password { salt, .. } => {
            Ok(md5_password(username, password, salt))
        }
        AuthenticationMessage::Sha512Password { salt, user_salt, .. } => {
            Ok(sha512_password(username, password, salt, *user_salt))
        }
        other => Err(Error::Connection(format!(
            "unsupported authentication method: {}",
            other.code()
        ))),
    }
}
