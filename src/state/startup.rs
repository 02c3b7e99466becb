//! Session startup and authentication state machine.

use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::backend::auth::auth_type;
use crate::protocol::backend::{AuthenticationMessage, BackendMessage};
use crate::protocol::frontend::FrontendMessage;

use super::action::Action;

/// Startup progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupState {
    Initial,
    SentStartup,
    Authenticating,
    Authenticated,
    Ready,
    Failed,
}

/// Drives Startup → authentication → ReadyForQuery.
///
/// Session messages that are not part of authentication (ParameterStatus,
/// BackendKeyData, NoticeResponse, ReadyForQuery) are returned to the caller
/// as `Action::Process` so a single dispatcher records them.
pub struct StartupStateMachine {
    state: StartupState,
    user: String,
    password: String,
    database: String,
    params: Vec<(String, String)>,
    write_buffer: Vec<u8>,
}

impl StartupStateMachine {
    /// Create a state machine for validated options.
    pub fn new(opts: &Opts) -> Self {
        Self {
            state: StartupState::Initial,
            user: opts.user.clone(),
            password: opts.password.clone().unwrap_or_default(),
            database: opts.database.clone().unwrap_or_default(),
            params: opts.params.clone(),
            write_buffer: Vec::with_capacity(256),
        }
    }

    /// Get the current state.
    pub fn state(&self) -> StartupState {
        self.state
    }

    /// Returns true once ReadyForQuery was seen.
    pub fn is_ready(&self) -> bool {
        self.state == StartupState::Ready
    }

    /// Encode the Startup message.
    pub fn start(&mut self) -> Result<Action<'_>> {
        if self.state != StartupState::Initial {
            return Err(Error::InvalidUsage(format!(
                "startup already started (state {:?})",
                self.state
            )));
        }
        self.write_buffer.clear();
        let message = FrontendMessage::Startup {
            user: &self.user,
            database: &self.database,
            params: &self.params,
        };
        tracing::debug!("=> {}", message);
        message.encode(&mut self.write_buffer)?;
        self.state = StartupState::SentStartup;
        Ok(Action::WritePacket(&self.write_buffer))
    }

    /// Advance with a message read from the server.
    pub fn step(&mut self, message: &BackendMessage<'_>) -> Result<Action<'_>> {
        match self.state {
            StartupState::SentStartup | StartupState::Authenticating | StartupState::Authenticated => {}
            state => {
                return Err(Error::Message(format!(
                    "Unexpected {} in startup state {:?}",
                    message.name(),
                    state
                )));
            }
        }

        match message {
            BackendMessage::ErrorResponse(error) => {
                self.state = StartupState::Failed;
                Err(Error::Connection(error.fields.to_string()))
            }
            BackendMessage::Authentication(AuthenticationMessage::Ok) => {
                self.state = StartupState::Authenticated;
                Ok(Action::NeedPacket)
            }
            BackendMessage::Authentication(challenge) => self.answer(challenge),
            BackendMessage::ReadyForQuery(_) => {
                self.state = StartupState::Ready;
                Ok(Action::ProcessAndFinish)
            }
            _ => Ok(Action::Process),
        }
    }

    fn answer(&mut self, challenge: &AuthenticationMessage<'_>) -> Result<Action<'_>> {
        if challenge.code() == auth_type::SSPI {
            self.state = StartupState::Failed;
            return Err(Error::Connection(
                "Error during authentication. Your password might be expired.".into(),
            ));
        }

        self.write_buffer.clear();
        let message = FrontendMessage::Password {
            user: &self.user,
            password: &self.password,
            challenge,
        };
        tracing::debug!("=> {}", message);
        if let Err(e) = message.encode(&mut self.write_buffer) {
            self.state = StartupState::Failed;
            return Err(e);
        }
        self.state = StartupState::Authenticating;
        Ok(Action::WritePacket(&self.write_buffer))
    }
}
