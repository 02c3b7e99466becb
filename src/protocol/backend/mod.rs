//! Backend (server → client) messages.

pub mod auth;
pub mod copy;
pub mod error;
pub mod load_balance;
pub mod query;

pub use auth::{AuthenticationMessage, BackendKeyData, ParameterStatus};
pub use copy::CopyInResponse;
pub use error::{ErrorResponse, NoticeResponse};
pub use load_balance::LoadBalanceResponse;
pub use query::CommandComplete;

use crate::error::{Error, Result};
use crate::protocol::types::TransactionStatus;

/// Backend message type bytes.
pub mod msg_type {
    /// Authentication message
    pub const AUTHENTICATION: u8 = b'R';
    /// BackendKeyData
    pub const BACKEND_KEY_DATA: u8 = b'K';
    /// ParameterStatus
    pub const PARAMETER_STATUS: u8 = b'S';
    /// ReadyForQuery
    pub const READY_FOR_QUERY: u8 = b'Z';
    /// RowDescription
    pub const ROW_DESCRIPTION: u8 = b'T';
    /// DataRow
    pub const DATA_ROW: u8 = b'D';
    /// CommandComplete
    pub const COMMAND_COMPLETE: u8 = b'C';
    /// EmptyQueryResponse
    pub const EMPTY_QUERY_RESPONSE: u8 = b'I';
    /// ErrorResponse
    pub const ERROR_RESPONSE: u8 = b'E';
    /// NoticeResponse
    pub const NOTICE_RESPONSE: u8 = b'N';
    /// ParseComplete
    pub const PARSE_COMPLETE: u8 = b'1';
    /// BindComplete
    pub const BIND_COMPLETE: u8 = b'2';
    /// CloseComplete
    pub const CLOSE_COMPLETE: u8 = b'3';
    /// ParameterDescription
    pub const PARAMETER_DESCRIPTION: u8 = b't';
    /// NoData
    pub const NO_DATA: u8 = b'n';
    /// PortalSuspended
    pub const PORTAL_SUSPENDED: u8 = b's';
    /// CopyInResponse
    pub const COPY_IN_RESPONSE: u8 = b'G';
    /// CopyData
    pub const COPY_DATA: u8 = b'd';
    /// CopyDone
    pub const COPY_DONE: u8 = b'c';
    /// LoadBalanceResponse
    pub const LOAD_BALANCE_RESPONSE: u8 = b'Y';
}

/// A decoded message from the server.
///
/// Payload slices borrow from the connection's read buffer. Row-level
/// messages are left raw for the cursor layer to interpret.
#[derive(Debug, Clone)]
pub enum BackendMessage<'a> {
    Authentication(AuthenticationMessage<'a>),
    BackendKeyData(BackendKeyData),
    ParameterStatus(ParameterStatus<'a>),
    ReadyForQuery(TransactionStatus),
    RowDescription(&'a [u8]),
    DataRow(&'a [u8]),
    CommandComplete(CommandComplete<'a>),
    EmptyQueryResponse,
    ErrorResponse(ErrorResponse),
    NoticeResponse(NoticeResponse),
    ParseComplete,
    BindComplete,
    CloseComplete,
    ParameterDescription(&'a [u8]),
    NoData,
    PortalSuspended,
    CopyInResponse(CopyInResponse),
    CopyData(&'a [u8]),
    CopyDone,
    LoadBalanceResponse(LoadBalanceResponse<'a>),
}

impl<'a> BackendMessage<'a> {
    /// Decode a message from its type byte and payload.
    ///
    /// An unknown type byte is a fatal protocol error.
    pub fn decode(type_byte: u8, payload: &'a [u8]) -> Result<Self> {
        let message = match type_byte {
            msg_type::AUTHENTICATION => {
                BackendMessage::Authentication(AuthenticationMessage::parse(payload)?)
            }
            msg_type::BACKEND_KEY_DATA => {
                BackendMessage::BackendKeyData(*BackendKeyData::parse(payload)?)
            }
            msg_type::PARAMETER_STATUS => {
                BackendMessage::ParameterStatus(ParameterStatus::parse(payload)?)
            }
            msg_type::READY_FOR_QUERY => {
                BackendMessage::ReadyForQuery(auth::parse_ready_for_query(payload)?)
            }
            msg_type::ROW_DESCRIPTION => BackendMessage::RowDescription(payload),
            msg_type::DATA_ROW => BackendMessage::DataRow(payload),
            msg_type::COMMAND_COMPLETE => {
                BackendMessage::CommandComplete(CommandComplete::parse(payload)?)
            }
            msg_type::EMPTY_QUERY_RESPONSE => BackendMessage::EmptyQueryResponse,
            msg_type::ERROR_RESPONSE => BackendMessage::ErrorResponse(ErrorResponse::parse(payload)?),
            msg_type::NOTICE_RESPONSE => {
                BackendMessage::NoticeResponse(NoticeResponse::parse(payload)?)
            }
            msg_type::PARSE_COMPLETE => BackendMessage::ParseComplete,
            msg_type::BIND_COMPLETE => BackendMessage::BindComplete,
            msg_type::CLOSE_COMPLETE => BackendMessage::CloseComplete,
            msg_type::PARAMETER_DESCRIPTION => BackendMessage::ParameterDescription(payload),
            msg_type::NO_DATA => BackendMessage::NoData,
            msg_type::PORTAL_SUSPENDED => BackendMessage::PortalSuspended,
            msg_type::COPY_IN_RESPONSE => {
                BackendMessage::CopyInResponse(CopyInResponse::parse(payload)?)
            }
            msg_type::COPY_DATA => BackendMessage::CopyData(payload),
            msg_type::COPY_DONE => BackendMessage::CopyDone,
            msg_type::LOAD_BALANCE_RESPONSE => {
                BackendMessage::LoadBalanceResponse(LoadBalanceResponse::parse(payload)?)
            }
            _ => {
                return Err(Error::Message(format!(
                    "Unknown message type: '{}' (0x{:02x})",
                    type_byte as char, type_byte
                )));
            }
        };
        Ok(message)
    }

    /// Name of the message kind, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BackendMessage::Authentication(_) => "Authentication",
            BackendMessage::BackendKeyData(_) => "BackendKeyData",
            BackendMessage::ParameterStatus(_) => "ParameterStatus",
            BackendMessage::ReadyForQuery(_) => "ReadyForQuery",
            BackendMessage::RowDescription(_) => "RowDescription",
            BackendMessage::DataRow(_) => "DataRow",
            BackendMessage::CommandComplete(_) => "CommandComplete",
            BackendMessage::EmptyQueryResponse => "EmptyQueryResponse",
            BackendMessage::ErrorResponse(_) => "ErrorResponse",
            BackendMessage::NoticeResponse(_) => "NoticeResponse",
            BackendMessage::ParseComplete => "ParseComplete",
            BackendMessage::BindComplete => "BindComplete",
            BackendMessage::CloseComplete => "CloseComplete",
            BackendMessage::ParameterDescription(_) => "ParameterDescription",
            BackendMessage::NoData => "NoData",
            BackendMessage::PortalSuspended => "PortalSuspended",
            BackendMessage::CopyInResponse(_) => "CopyInResponse",
            BackendMessage::CopyData(_) => "CopyData",
            BackendMessage::CopyDone => "CopyDone",
            BackendMessage::LoadBalanceResponse(_) => "LoadBalanceResponse",
        }
    }
}
