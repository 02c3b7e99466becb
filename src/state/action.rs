//! Action types for state machine I/O requests.

/// Action requested by a state machine.
///
/// The caller performs the requested I/O, reads the next message when asked
/// to, and feeds it back through `step()`.
#[derive(Debug, PartialEq, Eq)]
pub enum Action<'a> {
    /// Write these bytes to the server and flush, then read the next message.
    WritePacket(&'a [u8]),

    /// Nothing to send; read the next message.
    NeedPacket,

    /// Hand the message to the generic session dispatcher, then read the
    /// next message.
    Process,

    /// Hand the message to the generic session dispatcher. The state machine
    /// has finished.
    ProcessAndFinish,
}
