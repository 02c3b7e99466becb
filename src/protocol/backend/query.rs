//! Query-related backend messages.

use crate::error::Result;
use crate::protocol::codec::read_cstr;

/// CommandComplete message - indicates successful completion of a command.
#[derive(Debug, Clone, Copy)]
pub struct CommandComplete<'a> {
    /// Command tag (e.g., "COMMIT", "INSERT 1")
    pub tag: &'a str,
}

impl<'a> CommandComplete<'a> {
    /// Parse a CommandComplete message from payload bytes.
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (tag, _) = read_cstr(payload)?;
        Ok(Self { tag })
    }

    /// Get the command name from the tag.
    pub fn command(&self) -> Option<&str> {
        self.tag.split_whitespace().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_complete() {
        let complete = CommandComplete::parse(b"COMMIT\0").unwrap();
        assert_eq!(complete.tag, "COMMIT");
        assert_eq!(complete.command(), Some("COMMIT"));
    }
}
