//! Wire protocol encoding and decoding primitives.
//!
//! All integers are big-endian (network byte order). Readers take a payload
//! slice and return the decoded value together with the unread rest.

use zerocopy::FromBytes;
use zerocopy::byteorder::big_endian::{I32 as I32BE, U16 as U16BE, U32 as U32BE};

use crate::error::{Error, Result};

fn too_short(what: &str, need: usize, have: usize) -> Error {
    Error::Message(format!("{}: buffer too short: {} < {}", what, have, need))
}

/// Read a fixed-size big-endian value off the front of `data`.
#[inline]
fn read_be<'a, T: FromBytes>(data: &'a [u8], what: &str) -> Result<(T, &'a [u8])> {
    T::read_from_prefix(data).map_err(|_| too_short(what, size_of::<T>(), data.len()))
}

#[inline]
pub fn read_u8(data: &[u8]) -> Result<(u8, &[u8])> {
    data.split_first()
        .map(|(byte, rest)| (*byte, rest))
        .ok_or_else(|| too_short("read_u8", 1, 0))
}

#[inline]
pub fn read_u16(data: &[u8]) -> Result<(u16, &[u8])> {
    let (value, rest) = read_be::<U16BE>(data, "read_u16")?;
    Ok((value.get(), rest))
}

#[inline]
pub fn read_i32(data: &[u8]) -> Result<(i32, &[u8])> {
    let (value, rest) = read_be::<I32BE>(data, "read_i32")?;
    Ok((value.get(), rest))
}

#[inline]
pub fn read_u32(data: &[u8]) -> Result<(u32, &[u8])> {
    let (value, rest) = read_be::<U32BE>(data, "read_u32")?;
    Ok((value.get(), rest))
}

/// Split off the first `len` bytes.
#[inline]
pub fn read_bytes(data: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    data.split_at_checked(len)
        .ok_or_else(|| too_short("read_bytes", len, data.len()))
}

/// Read a NUL-terminated byte string, without the terminator.
#[inline]
pub fn read_cstring(data: &[u8]) -> Result<(&[u8], &[u8])> {
    let end = memchr::memchr(0, data)
        .ok_or_else(|| Error::Message("read_cstring: no null terminator found".into()))?;
    Ok((&data[..end], &data[end + 1..]))
}

/// Read a NUL-terminated UTF-8 string.
#[inline]
pub fn read_cstr(data: &[u8]) -> Result<(&str, &[u8])> {
    let (bytes, rest) = read_cstring(data)?;
    let s = simdutf8::compat::from_utf8(bytes)
        .map_err(|e| Error::Message(format!("read_cstr: invalid UTF-8: {e}")))?;
    Ok((s, rest))
}

/// Read the 4-byte length field that follows a type byte and return the
/// payload length it announces.
///
/// The length counts itself, so anything below 4 is malformed.
#[inline]
pub fn payload_len(length_bytes: [u8; 4]) -> Result<usize> {
    let length = u32::from_be_bytes(length_bytes);
    if length < 4 {
        return Err(Error::Message(format!("Bad message size: {}", length)));
    }
    Ok((length - 4) as usize)
}

/// Builds one frontend message in place, patching the length on `finish`.
///
/// Tagged messages start with a type byte that the length does not count;
/// the length always counts itself.
pub struct MessageBuilder<'a> {
    buf: &'a mut Vec<u8>,
    length_at: usize,
}

impl<'a> MessageBuilder<'a> {
    /// Start a tagged message.
    pub fn new(buf: &'a mut Vec<u8>, type_byte: u8) -> Self {
        buf.push(type_byte);
        Self::new_untagged(buf)
    }

    /// Start an untagged message (Startup and the negotiation preambles).
    pub fn new_untagged(buf: &'a mut Vec<u8>) -> Self {
        let length_at = buf.len();
        buf.extend_from_slice(&[0; 4]);
        Self { buf, length_at }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a NUL-terminated string.
    pub fn write_cstr(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    /// Fill in the length field.
    pub fn finish(self) {
        let len = (self.buf.len() - self.length_at) as u32;
        self.buf[self.length_at..self.length_at + 4].copy_from_slice(&len.to_be_bytes());
    }
}
