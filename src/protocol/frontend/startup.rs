//! Startup, negotiation preamble and termination messages.

use crate::protocol::codec::MessageBuilder;

/// Protocol version 3.0 (0x00030000)
pub const PROTOCOL_VERSION_3_0: i32 = 3 << 16;

/// SSL request code pair (80877103 when read as one 32-bit integer)
pub const SSL_REQUEST_CODE: (i16, i16) = (1234, 5679);

/// Load balance request code pair
pub const LOAD_BALANCE_REQUEST_CODE: (i16, i16) = (1235, 0);

/// Cancel request code
pub const CANCEL_REQUEST_CODE: i32 = 80877102;

/// Write an SSLRequest preamble.
///
/// Sent before the startup message. The server answers with a single byte:
/// 'S' (accepted) or anything else (rejected).
pub fn write_ssl_request(buf: &mut Vec<u8>) {
    let mut msg = MessageBuilder::new_untagged(buf);
    msg.write_i16(SSL_REQUEST_CODE.0);
    msg.write_i16(SSL_REQUEST_CODE.1);
    msg.finish();
}

/// Write a LoadBalanceRequest preamble.
///
/// The server answers with 'Y' followed by a LoadBalanceResponse naming the
/// node to connect to, or with any other byte when load balancing is off.
pub fn write_load_balance_request(buf: &mut Vec<u8>) {
    let mut msg = MessageBuilder::new_untagged(buf);
    msg.write_i16(LOAD_BALANCE_REQUEST_CODE.0);
    msg.write_i16(LOAD_BALANCE_REQUEST_CODE.1);
    msg.finish();
}

/// Write a StartupMessage.
///
/// Parameters is a list of (name, value) pairs, e.g. "user" and "database".
pub fn write_startup(buf: &mut Vec<u8>, params: &[(&str, &str)]) {
    let mut msg = MessageBuilder::new_untagged(buf);
    msg.write_i32(PROTOCOL_VERSION_3_0);

    for (name, value) in params {
        msg.write_cstr(name);
        msg.write_cstr(value);
    }

    // Terminator
    msg.write_u8(0);
    msg.finish();
}

/// Write a CancelRequest message.
///
/// The server handles it out of band and sends no response.
pub fn write_cancel_request(buf: &mut Vec<u8>, pid: u32, secret_key: u32) {
    let mut msg = MessageBuilder::new_untagged(buf);
    msg.write_i32(CANCEL_REQUEST_CODE);
    msg.write_u32(pid);
    msg.write_u32(secret_key);
    msg.finish();
}

/// Write a Terminate message.
pub fn write_terminate(buf: &mut Vec<u8>) {
    let msg = MessageBuilder::new(buf, super::msg_type::TERMINATE);
    msg.finish();
}
