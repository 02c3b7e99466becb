//! COPY FROM STDIN handshake.

use crate::error::Result;
use crate::protocol::codec::{read_bytes, read_u8, read_u16};

/// The server is ready to receive COPY data.
#[derive(Debug, Clone)]
pub struct CopyInResponse {
    /// 0 for text, 1 for binary
    pub format: u8,
    pub column_formats: Vec<u16>,
}

impl CopyInResponse {
    /// Layout: format byte, column count, one 16-bit format per column.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (format, rest) = read_u8(payload)?;
        let (columns, rest) = read_u16(rest)?;
        let (formats, _) = read_bytes(rest, usize::from(columns) * 2)?;

        Ok(Self {
            format,
            column_formats: formats
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect(),
        })
    }

    pub fn is_binary(&self) -> bool {
        self.format == 1
    }
}
