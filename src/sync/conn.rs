//! Synchronous Vertica connection.

use std::collections::HashMap;
use std::time::Duration;

use crate::address::{AddressCandidate, AddressList};
use crate::buffer_set::BufferSet;
use crate::error::{Error, Result};
use crate::opts::{Opts, SslMode};
use crate::protocol::backend::{BackendMessage, LoadBalanceResponse, NoticeResponse};
use crate::protocol::codec::payload_len;
use crate::protocol::frontend::FrontendMessage;
use crate::protocol::types::TransactionStatus;
use crate::state::action::Action;
use crate::state::connection::ConnectionState;
use crate::state::negotiate::{LoadBalanceReply, check_ssl_reply, is_current_peer};
use crate::state::startup::StartupStateMachine;

use super::socket::establish;
use super::stream::Stream;

fn closed_error() -> Error {
    Error::Connection("Connection is closed".into())
}

/// Encode a message into `buf` and send it.
fn send(stream: &mut Stream, buf: &mut Vec<u8>, message: &FrontendMessage<'_>) -> Result<()> {
    buf.clear();
    message.encode(buf)?;
    tracing::debug!("=> {}", message);
    stream.write_all(buf)?;
    stream.flush()?;
    Ok(())
}

/// Read a message from the stream into the buffer set.
fn read_message_into(stream: &mut Stream, buffer_set: &mut BufferSet) -> Result<()> {
    let mut type_byte = [0u8; 1];
    stream.read_exact(&mut type_byte)?;
    buffer_set.type_byte = type_byte[0];

    let mut length_bytes = [0u8; 4];
    stream.read_exact(&mut length_bytes)?;
    let len = payload_len(length_bytes)?;

    buffer_set.read_buffer.clear();
    buffer_set.read_buffer.resize(len, 0);
    stream.read_exact(&mut buffer_set.read_buffer)?;
    Ok(())
}

fn close_socket(stream: &mut Option<Stream>, state: &mut ConnectionState) {
    if let Some(mut stream) = stream.take() {
        tracing::debug!("Closing socket");
        if let Err(e) = stream.shutdown() {
            tracing::debug!("Socket shutdown failed: {}", e);
        }
    }
    state.reset();
}

fn with_dispatch<T>(dispatch: Option<&tracing::Dispatch>, f: impl FnOnce() -> T) -> T {
    match dispatch {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
        None => f(),
    }
}

/// Outcome of one message while draining a simple query.
enum Drained {
    Continue,
    ServerError(Error),
    Ready,
}

fn drain_one(buffer_set: &BufferSet, state: &mut ConnectionState) -> Result<Drained> {
    let message = BackendMessage::decode(buffer_set.type_byte, &buffer_set.read_buffer)?;
    tracing::debug!("<= {}", message.name());
    match &message {
        BackendMessage::ErrorResponse(error) => Ok(Drained::ServerError(error.to_error())),
        BackendMessage::ReadyForQuery(_) => {
            state.process_message(&message)?;
            Ok(Drained::Ready)
        }
        BackendMessage::RowDescription(_) | BackendMessage::DataRow(_) => Ok(Drained::Continue),
        _ => {
            state.process_message(&message)?;
            Ok(Drained::Continue)
        }
    }
}

/// Synchronous Vertica connection.
///
/// Every public operation runs under `Opts::log_dispatch` when one is set.
pub struct Conn {
    opts: Opts,
    stream: Option<Stream>,
    buffer_set: BufferSet,
    state: ConnectionState,
}

impl std::fmt::Debug for Conn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conn")
            .field("connected", &self.stream.is_some())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Conn {
    /// Connect to a Vertica server.
    ///
    /// Tries the primary host, then each backup node, following a
    /// load-balancing redirect and upgrading to TLS when configured.
    pub fn new<O: TryInto<Opts>>(opts: O) -> Result<Self>
    where
        Error: From<O::Error>,
    {
        let mut conn = Self {
            opts: opts.try_into()?,
            stream: None,
            buffer_set: BufferSet::new(),
            state: ConnectionState::new(),
        };
        conn.traced(Self::connect)?;
        Ok(conn)
    }

    /// Open a connection, hand it to `f`, then leave the session.
    ///
    /// An open transaction is committed when `f` succeeds and rolled back
    /// when it fails. The connection is always closed. The first error wins.
    pub fn run<O, T, F>(opts: O, f: F) -> Result<T>
    where
        O: TryInto<Opts>,
        Error: From<O::Error>,
        F: FnOnce(&mut Conn) -> Result<T>,
    {
        let mut conn = Conn::new(opts)?;
        let result = f(&mut conn);
        let exited = conn.exit(result.is_err());
        let value = result?;
        exited?;
        Ok(value)
    }

    fn traced<'s, T>(&'s mut self, f: impl FnOnce(&'s mut Self) -> T) -> T {
        let dispatch = self.opts.log_dispatch.clone();
        with_dispatch(dispatch.as_ref(), move || f(self))
    }

    fn connect(&mut self) -> Result<()> {
        let result = self.connect_inner();
        if let Err(ref e) = result {
            tracing::debug!("Connect failed: {}", e);
            self.close_socket();
        }
        result
    }

    fn connect_inner(&mut self) -> Result<()> {
        self.opts.validate()?;
        tracing::debug!("Connecting with {}", self);

        let mut addresses = AddressList::from_opts(&self.opts)?;
        let stream = self.open_stream(&mut addresses)?;
        self.stream = Some(stream);
        self.startup()?;

        if let Some(stream) = &self.stream {
            stream.set_read_timeout(self.opts.read_timeout.filter(|t| !t.is_zero()))?;
        }
        Ok(())
    }

    fn connect_timeout(&self) -> Option<Duration> {
        self.opts.connection_timeout.filter(|t| !t.is_zero())
    }

    fn open_stream(&mut self, addresses: &mut AddressList) -> Result<Stream> {
        let (tcp, mut candidate) = establish(addresses, self.connect_timeout())?;
        let mut stream = Stream::tcp(tcp);

        if self.opts.connection_load_balance {
            (stream, candidate) = self.balance_load(stream, candidate, addresses)?;
        }
        if self.opts.ssl_mode == SslMode::Require {
            stream = self.enable_ssl(stream, &candidate)?;
        }
        Ok(stream)
    }

    fn balance_load(
        &mut self,
        mut stream: Stream,
        candidate: AddressCandidate,
        addresses: &mut AddressList,
    ) -> Result<(Stream, AddressCandidate)> {
        send(
            &mut stream,
            &mut self.buffer_set.write_buffer,
            &FrontendMessage::LoadBalanceRequest,
        )?;
        let mut response = [0u8; 1];
        stream.read_exact(&mut response)?;

        match LoadBalanceReply::from_byte(response[0]) {
            LoadBalanceReply::Declined(byte) => {
                tracing::warn!(
                    "Load balancing requested but not supported by server (response {:?})",
                    byte as char
                );
                Ok((stream, candidate))
            }
            LoadBalanceReply::Redirect => {
                let mut length_bytes = [0u8; 4];
                stream.read_exact(&mut length_bytes)?;
                let len = payload_len(length_bytes)?;
                self.buffer_set.read_buffer.clear();
                self.buffer_set.read_buffer.resize(len, 0);
                stream.read_exact(&mut self.buffer_set.read_buffer)?;

                let target = LoadBalanceResponse::parse(&self.buffer_set.read_buffer)?;
                if is_current_peer(&target, stream.peer_addr().ok(), &candidate.hostname) {
                    tracing::info!(
                        "Load balancing kept the connection on {}:{}",
                        target.host,
                        target.port
                    );
                    return Ok((stream, candidate));
                }

                tracing::info!(
                    "Load balancing redirected the connection to {}:{}",
                    target.host,
                    target.port
                );
                addresses.push(target.host, target.port);
                drop(stream);
                let (tcp, candidate) = establish(addresses, self.connect_timeout())?;
                Ok((Stream::tcp(tcp), candidate))
            }
        }
    }

    fn enable_ssl(&mut self, mut stream: Stream, candidate: &AddressCandidate) -> Result<Stream> {
        send(
            &mut stream,
            &mut self.buffer_set.write_buffer,
            &FrontendMessage::SslRequest,
        )?;
        let mut response = [0u8; 1];
        stream.read_exact(&mut response)?;
        check_ssl_reply(response[0])?;

        #[cfg(feature = "sync-tls")]
        {
            let tcp = stream
                .into_tcp()
                .ok_or_else(|| Error::Connection("TLS is already enabled".into()))?;
            let connector = match &self.opts.tls_connector {
                Some(connector) => connector.clone(),
                None => native_tls::TlsConnector::new()
                    .map_err(|e| Error::Connection(format!("TLS setup failed: {}", e)))?,
            };
            let tls = connector
                .connect(&candidate.hostname, tcp)
                .map_err(|e| Error::Connection(format!("TLS handshake failed: {}", e)))?;
            tracing::debug!("TLS established with {}", candidate.hostname);
            return Ok(Stream::tls(tls));
        }
        #[cfg(not(feature = "sync-tls"))]
        {
            let _ = (stream, candidate);
            return Err(Error::Connection(
                "Server accepted SSL but the sync-tls feature is not enabled".into(),
            ));
        }
    }

    fn startup(&mut self) -> Result<()> {
        let mut machine = StartupStateMachine::new(&self.opts);
        let Self {
            stream,
            buffer_set,
            state,
            ..
        } = self;
        let stream = stream.as_mut().ok_or_else(closed_error)?;

        match machine.start()? {
            Action::WritePacket(data) => {
                stream.write_all(data)?;
                stream.flush()?;
            }
            other => {
                return Err(Error::Message(format!(
                    "Unexpected initial startup action: {:?}",
                    other
                )));
            }
        }

        loop {
            read_message_into(stream, buffer_set)?;
            let message = BackendMessage::decode(buffer_set.type_byte, &buffer_set.read_buffer)?;
            tracing::debug!("<= {}", message.name());

            match machine.step(&message)? {
                Action::WritePacket(data) => {
                    stream.write_all(data)?;
                    stream.flush()?;
                }
                Action::NeedPacket => {}
                Action::Process => state.process_message(&message)?,
                Action::ProcessAndFinish => {
                    state.process_message(&message)?;
                    return Ok(());
                }
            }
        }
    }

    fn close_socket(&mut self) {
        close_socket(&mut self.stream, &mut self.state);
    }

    fn fail(&mut self, error: Error) -> Error {
        self.close_socket();
        error
    }

    fn fill_buffer(&mut self) -> Result<()> {
        let result = match self.stream.as_mut() {
            Some(stream) => read_message_into(stream, &mut self.buffer_set),
            None => Err(closed_error()),
        };
        result.map_err(|e| self.fail(e))
    }

    /// Close the session.
    ///
    /// Sends Terminate when possible, then always closes the socket and
    /// clears the session state. Calling it again is a no-op.
    pub fn close(&mut self) {
        self.traced(Self::close_inner)
    }

    fn close_inner(&mut self) {
        if let Some(stream) = self.stream.as_mut() {
            if let Err(e) = send(
                stream,
                &mut self.buffer_set.write_buffer,
                &FrontendMessage::Terminate,
            ) {
                tracing::debug!("Terminate was not delivered: {}", e);
            }
        }
        self.close_socket();
    }

    /// Close and connect again with the same options.
    pub fn reset(&mut self) -> Result<()> {
        self.traced(|conn| {
            conn.close_inner();
            conn.connect()
        })
    }

    /// Ask the server to cancel the statement running on this session.
    pub fn cancel(&mut self) -> Result<()> {
        self.traced(|conn| {
            if conn.closed() {
                return Err(closed_error());
            }
            let (Some(pid), Some(key)) = (conn.state.backend_pid(), conn.state.backend_key())
            else {
                return Err(Error::Connection("Backend key data is not available".into()));
            };
            conn.write_inner(&FrontendMessage::CancelRequest { pid, key })
        })
    }

    /// Commit the current transaction.
    pub fn commit(&mut self) -> Result<()> {
        self.traced(|conn| conn.run_command("COMMIT;"))
    }

    /// Roll back the current transaction.
    pub fn rollback(&mut self) -> Result<()> {
        self.traced(|conn| conn.run_command("ROLLBACK;"))
    }

    fn run_command(&mut self, sql: &str) -> Result<()> {
        if self.closed() {
            return Err(closed_error());
        }
        self.query_drop_inner(sql)
    }

    /// Run a simple query and discard its rows.
    ///
    /// A server error is returned after the session is back at ReadyForQuery.
    pub fn query_drop(&mut self, sql: &str) -> Result<()> {
        self.traced(|conn| conn.query_drop_inner(sql))
    }

    fn query_drop_inner(&mut self, sql: &str) -> Result<()> {
        self.write_inner(&FrontendMessage::Query(sql))?;

        let mut server_error = None;
        loop {
            self.fill_buffer()?;
            match drain_one(&self.buffer_set, &mut self.state) {
                Ok(Drained::Continue) => {}
                Ok(Drained::ServerError(e)) => {
                    tracing::debug!("Query failed: {}", e);
                    server_error.get_or_insert(e);
                }
                Ok(Drained::Ready) => break,
                Err(e) => return Err(self.fail(e)),
            }
        }

        match server_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Leave the session.
    ///
    /// Inside a transaction, commits when `failed` is false and rolls back
    /// otherwise. The connection is closed in every case.
    pub fn exit(&mut self, failed: bool) -> Result<()> {
        self.traced(|conn| {
            let mut result = Ok(());
            if conn.opened() && conn.in_transaction() {
                result = if failed {
                    conn.run_command("ROLLBACK;")
                } else {
                    conn.run_command("COMMIT;")
                };
            }
            conn.close_inner();
            result
        })
    }

    /// Send a frontend message.
    pub fn write(&mut self, message: &FrontendMessage<'_>) -> Result<()> {
        self.traced(|conn| conn.write_inner(message))
    }

    fn write_inner(&mut self, message: &FrontendMessage<'_>) -> Result<()> {
        let result = match self.stream.as_mut() {
            Some(stream) => send(stream, &mut self.buffer_set.write_buffer, message),
            None => Err(closed_error()),
        };
        result.map_err(|e| self.fail(e))
    }

    /// Read the next backend message.
    ///
    /// The message borrows the connection's read buffer.
    pub fn read_message(&mut self) -> Result<BackendMessage<'_>> {
        self.traced(Self::read_message_inner)
    }

    fn read_message_inner(&mut self) -> Result<BackendMessage<'_>> {
        self.fill_buffer()?;
        match BackendMessage::decode(self.buffer_set.type_byte, &self.buffer_set.read_buffer) {
            Ok(message) => {
                tracing::debug!("<= {}", message.name());
                Ok(message)
            }
            Err(e) => {
                close_socket(&mut self.stream, &mut self.state);
                Err(e)
            }
        }
    }

    /// Read exactly `buf.len()` raw bytes.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.traced(|conn| {
            let result = match conn.stream.as_mut() {
                Some(stream) => stream.read_exact(buf).map_err(Error::from),
                None => Err(closed_error()),
            };
            result.map_err(|e| conn.fail(e))
        })
    }

    /// Record the message last returned by `read_message` in the session
    /// state.
    ///
    /// ErrorResponse is returned as `Error::Server`; a message with no
    /// session meaning closes the connection with `Error::Message`.
    pub fn process_message(&mut self) -> Result<()> {
        self.traced(|conn| {
            let Self {
                buffer_set, state, ..
            } = &mut *conn;
            let result = BackendMessage::decode(buffer_set.type_byte, &buffer_set.read_buffer)
                .and_then(|message| state.process_message(&message));
            match result {
                Err(Error::Message(m)) => Err(conn.fail(Error::Message(m))),
                other => other,
            }
        })
    }

    /// Returns true when the session is established and ready.
    pub fn opened(&self) -> bool {
        self.stream.is_some()
            && self.state.backend_pid().is_some()
            && self.state.transaction_status().is_some()
    }

    pub fn closed(&self) -> bool {
        !self.opened()
    }

    /// Returns true if the session runs over TLS.
    pub fn is_ssl(&self) -> bool {
        self.stream.as_ref().is_some_and(Stream::is_tls)
    }

    /// Server parameters reported with ParameterStatus.
    pub fn parameters(&self) -> &HashMap<String, String> {
        self.state.parameters()
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.state.parameters().get(name).map(String::as_str)
    }

    /// Backend process ID, used for cancellation.
    pub fn backend_pid(&self) -> Option<u32> {
        self.state.backend_pid()
    }

    /// Backend secret key, used for cancellation.
    pub fn backend_key(&self) -> Option<u32> {
        self.state.backend_key()
    }

    /// Transaction status from the last ReadyForQuery.
    pub fn transaction_status(&self) -> Option<TransactionStatus> {
        self.state.transaction_status()
    }

    pub fn in_transaction(&self) -> bool {
        self.state
            .transaction_status()
            .is_some_and(TransactionStatus::in_transaction)
    }

    /// Install a callback for NoticeResponse messages.
    pub fn set_notice_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&NoticeResponse) + Send + 'static,
    {
        self.state.set_notice_handler(Some(Box::new(handler)));
    }

    /// Connection options (including the password).
    pub fn opts(&self) -> &Opts {
        &self.opts
    }
}

impl std::fmt::Display for Conn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Conn(host={:?}, port={:?}, user={}, database={}, ssl_mode={:?}, load_balance={}, backup_server_node={:?}, opened={})",
            self.opts.host,
            self.opts.port,
            self.opts.user,
            self.opts.database.as_deref().unwrap_or_default(),
            self.opts.ssl_mode,
            self.opts.connection_load_balance,
            self.opts.backup_server_node,
            self.opened(),
        )
    }
}

impl Drop for Conn {
    fn drop(&mut self) {
        self.close();
    }
}
