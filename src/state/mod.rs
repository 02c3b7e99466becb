//! Sans-I/O state machines for session setup.
//!
//! These state machines handle the protocol logic without performing any I/O.
//! They produce `Action` values that tell the caller what to do next.

pub mod action;
pub mod connection;
pub mod negotiate;
pub mod startup;

pub use action::Action;
pub use connection::{ConnectionState, NoticeHandler};
pub use startup::{StartupState, StartupStateMachine};
