//! In-process mock Vertica backend.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use zero_vertica::Opts;

pub const PID: u32 = 4242;
pub const KEY: u32 = 777;

/// Port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Accept `connections` clients in sequence, handing each to `f`.
pub fn spawn<T, F>(connections: usize, f: F) -> (u16, JoinHandle<Vec<T>>)
where
    T: Send + 'static,
    F: Fn(Session) -> T + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        (0..connections)
            .map(|_| {
                let (stream, _) = listener.accept().unwrap();
                stream
                    .set_read_timeout(Some(Duration::from_secs(5)))
                    .unwrap();
                f(Session::new(stream))
            })
            .collect()
    });
    (port, handle)
}

pub fn opts(port: u16) -> Opts {
    Opts {
        host: "127.0.0.1".into(),
        port: port.into(),
        user: "dbadmin".into(),
        password: Some("secret".into()),
        database: Some("vmart".into()),
        read_timeout: Some(Duration::from_secs(5)),
        connection_timeout: Some(Duration::from_secs(5)),
        ..Opts::default()
    }
}

/// Server side of one client connection.
pub struct Session {
    stream: TcpStream,
    status: u8,
    /// Tagged messages received by `serve`
    pub received: Vec<(u8, Vec<u8>)>,
}

impl Session {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            status: b'I',
            received: Vec::new(),
        }
    }

    pub fn local_port(&self) -> u16 {
        self.stream.local_addr().unwrap().port()
    }

    /// Read an untagged packet (Startup, SslRequest, LoadBalanceRequest,
    /// CancelRequest); returns the leading code and the rest.
    pub fn read_untagged(&mut self) -> (u32, Vec<u8>) {
        let mut len = [0u8; 4];
        self.stream.read_exact(&mut len).unwrap();
        let mut body = vec![0u8; u32::from_be_bytes(len) as usize - 4];
        self.stream.read_exact(&mut body).unwrap();
        let code = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
        (code, body[4..].to_vec())
    }

    /// Read a tagged message; `None` on EOF.
    pub fn read_message(&mut self) -> Option<(u8, Vec<u8>)> {
        let mut header = [0u8; 5];
        self.stream.read_exact(&mut header).ok()?;
        let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
        let mut body = vec![0u8; len - 4];
        self.stream.read_exact(&mut body).ok()?;
        Some((header[0], body))
    }

    /// Abort the connection with a TCP reset.
    pub fn reset(self) {
        socket2::SockRef::from(&self.stream)
            .set_linger(Some(Duration::ZERO))
            .unwrap();
    }

    pub fn send(&mut self, tag: u8, payload: &[u8]) {
        let mut msg = vec![tag];
        msg.extend_from_slice(&(payload.len() as u32 + 4).to_be_bytes());
        msg.extend_from_slice(payload);
        self.send_raw(&msg);
    }

    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).unwrap();
        self.stream.flush().unwrap();
    }

    pub fn send_auth(&mut self, code: i32, extra: &[u8]) {
        let mut payload = code.to_be_bytes().to_vec();
        payload.extend_from_slice(extra);
        self.send(b'R', &payload);
    }

    pub fn send_error(&mut self, message: &str) {
        let payload = format!("SERROR\0C42601\0M{}\0\0", message);
        self.send(b'E', payload.as_bytes());
    }

    /// Read the Startup packet and return its key/value pairs.
    pub fn accept_startup(&mut self) -> Vec<(String, String)> {
        let (version, body) = self.read_untagged();
        assert_eq!(version, 3 << 16);
        let mut fields = body
            .split(|b| *b == 0)
            .map(|s| String::from_utf8(s.to_vec()).unwrap());
        let mut pairs = Vec::new();
        while let (Some(k), Some(v)) = (fields.next(), fields.next()) {
            if k.is_empty() {
                break;
            }
            pairs.push((k, v));
        }
        pairs
    }

    /// Ask for an MD5 password and return what the client sent.
    pub fn authenticate_md5(&mut self) -> String {
        self.send_auth(5, &[1, 2, 3, 4]);
        let (tag, body) = self.read_message().unwrap();
        assert_eq!(tag, b'p');
        self.send_auth(0, &[]);
        String::from_utf8(body[..body.len() - 1].to_vec()).unwrap()
    }

    /// Send the post-authentication session messages and ReadyForQuery.
    pub fn send_session(&mut self) {
        let mut key = PID.to_be_bytes().to_vec();
        key.extend_from_slice(&KEY.to_be_bytes());
        self.send(b'K', &key);
        self.send(b'S', b"server_version\0v24.1.0\0");
        self.send(b'Z', b"I");
    }

    /// Startup, MD5 authentication and session setup.
    pub fn handshake(&mut self) {
        self.accept_startup();
        self.authenticate_md5();
        self.send_session();
    }

    /// Answer simple queries until Terminate or EOF.
    ///
    /// `BEGIN` opens a transaction, `COMMIT;`/`ROLLBACK;` close it, a query
    /// starting with `fail` gets an ErrorResponse, `notice` gets a
    /// NoticeResponse, anything else returns one row.
    pub fn serve(mut self) -> Vec<(u8, Vec<u8>)> {
        while let Some((tag, body)) = self.read_message() {
            self.received.push((tag, body.clone()));
            match tag {
                b'X' => break,
                b'Q' => {
                    let sql = String::from_utf8(body[..body.len() - 1].to_vec()).unwrap();
                    self.answer(&sql);
                }
                other => panic!("mock backend got unexpected message {:?}", other as char),
            }
        }
        self.received
    }

    fn answer(&mut self, sql: &str) {
        if sql.starts_with("BEGIN") {
            self.status = b'T';
            self.send(b'C', b"BEGIN\0");
        } else if sql == "COMMIT;" || sql == "ROLLBACK;" {
            self.status = b'I';
            let tag = format!("{}\0", sql.trim_end_matches(';'));
            self.send(b'C', tag.as_bytes());
        } else if sql.starts_with("fail") {
            if self.status == b'T' {
                self.status = b'E';
            }
            self.send_error("Syntax error at or near \"fail\"");
        } else if sql.starts_with("notice") {
            self.send(b'N', b"SNOTICE\0Mjust so you know\0\0");
            self.send(b'C', b"SELECT 0\0");
        } else {
            self.send(b'T', &[0, 1, b'a', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 6, 0, 8, 0, 0, 0, 0, 0, 0]);
            self.send(b'D', &[0, 1, 0, 0, 0, 1, b'1']);
            self.send(b'C', b"SELECT 1\0");
        }
        let status = [self.status];
        self.send(b'Z', &status);
    }
}
