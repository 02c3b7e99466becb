//! Session state shared by the startup and query paths.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::protocol::backend::{BackendMessage, NoticeResponse};
use crate::protocol::types::TransactionStatus;

/// Callback invoked for every NoticeResponse.
pub type NoticeHandler = Box<dyn FnMut(&NoticeResponse) + Send>;

/// What the server told us about the current session.
#[derive(Default)]
pub struct ConnectionState {
    parameters: HashMap<String, String>,
    backend_pid: Option<u32>,
    backend_key: Option<u32>,
    transaction_status: Option<TransactionStatus>,
    notice_handler: Option<NoticeHandler>,
}

impl std::fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionState")
            .field("parameters", &self.parameters)
            .field("backend_pid", &self.backend_pid)
            .field("transaction_status", &self.transaction_status)
            .field("notice_handler", &self.notice_handler.is_some())
            .finish_non_exhaustive()
    }
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session message.
    ///
    /// ErrorResponse becomes an `Error::Connection` carrying the server text.
    /// Messages with no session meaning here are rejected with
    /// `Error::Message`.
    pub fn process_message(&mut self, message: &BackendMessage<'_>) -> Result<()> {
        match message {
            BackendMessage::ErrorResponse(error) => {
                tracing::debug!("<= ErrorResponse: {}", error.fields);
                return Err(error.to_error());
            }
            BackendMessage::NoticeResponse(notice) => {
                tracing::debug!("<= NoticeResponse: {}", notice.fields);
                if let Some(handler) = self.notice_handler.as_mut() {
                    handler(notice);
                }
            }
            BackendMessage::BackendKeyData(key) => {
                self.backend_pid = Some(key.process_id());
                self.backend_key = Some(key.secret());
            }
            BackendMessage::ParameterStatus(param) => {
                tracing::debug!("<= ParameterStatus: {}={}", param.name, param.value);
                self.parameters
                    .insert(param.name.to_string(), param.value.to_string());
            }
            BackendMessage::ReadyForQuery(status) => {
                self.transaction_status = Some(*status);
            }
            BackendMessage::CommandComplete(_)
            | BackendMessage::EmptyQueryResponse
            | BackendMessage::CopyInResponse(_) => {}
            other => {
                return Err(Error::Message(format!("Unhandled message: {}", other.name())));
            }
        }
        Ok(())
    }

    /// Forget everything learned from the server. The notice handler stays.
    pub fn reset(&mut self) {
        self.parameters.clear();
        self.backend_pid = None;
        self.backend_key = None;
        self.transaction_status = None;
    }

    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    pub fn backend_pid(&self) -> Option<u32> {
        self.backend_pid
    }

    pub fn backend_key(&self) -> Option<u32> {
        self.backend_key
    }

    pub fn transaction_status(&self) -> Option<TransactionStatus> {
        self.transaction_status
    }

    pub fn set_notice_handler(&mut self, handler: Option<NoticeHandler>) {
        self.notice_handler = handler;
    }
}
