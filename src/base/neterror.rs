use std::io;
use thiserror::Error;

/// Transport-level failures.
///
/// Codes follow Chromium's `net_error_list.h` so they stay stable across
/// releases and can be logged or persisted as plain integers.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum NetError {
    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection aborted")]
    ConnectionAborted,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("SSL protocol error")]
    SslProtocolError,
    #[error("Address unreachable")]
    AddressUnreachable,
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("ALPN negotiation failed")]
    AlpnNegotiationFailed,

    // HTTP Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Invalid response")]
    InvalidResponse,
    #[error("Empty response")]
    EmptyResponse,
    #[error("Response headers too big")]
    ResponseHeadersTooBig,
    #[error("Invalid HTTP response")]
    InvalidHttpResponse,
    #[error("Response body read failed")]
    ResponseBodyReadFailed,

    #[error("Unknown error: {0}")]
    Unknown(i32),
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionAborted => -103,
            NetError::ConnectionFailed => -104,
            NetError::NameNotResolved => -105,
            NetError::SslProtocolError => -107,
            NetError::AddressUnreachable => -109,
            NetError::ConnectionTimedOut => -118,
            NetError::AlpnNegotiationFailed => -122,

            NetError::InvalidUrl => -300,
            NetError::InvalidResponse => -320,
            NetError::EmptyResponse => -324,
            NetError::ResponseHeadersTooBig => -325,
            NetError::InvalidHttpResponse => -370,
            // Custom codes start at -1000 to stay clear of Chromium's ranges
            NetError::ResponseBodyReadFailed => -1000,
            NetError::Unknown(code) => *code,
        }
    }

    /// Whether the failure happened before any request bytes reached the server.
    pub fn is_connect_phase(&self) -> bool {
        matches!(
            self,
            NetError::ConnectionRefused
                | NetError::ConnectionFailed
                | NetError::NameNotResolved
                | NetError::SslProtocolError
                | NetError::AddressUnreachable
                | NetError::AlpnNegotiationFailed
                | NetError::InvalidUrl
        )
    }
}

impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -100 => NetError::ConnectionClosed,
            -101 => NetError::ConnectionReset,
            -102 => NetError::ConnectionRefused,
            -103 => NetError::ConnectionAborted,
            -104 => NetError::ConnectionFailed,
            -105 => NetError::NameNotResolved,
            -107 => NetError::SslProtocolError,
            -109 => NetError::AddressUnreachable,
            -118 => NetError::ConnectionTimedOut,
            -122 => NetError::AlpnNegotiationFailed,

            -300 => NetError::InvalidUrl,
            -320 => NetError::InvalidResponse,
            -324 => NetError::EmptyResponse,
            -325 => NetError::ResponseHeadersTooBig,
            -370 => NetError::InvalidHttpResponse,
            -1000 => NetError::ResponseBodyReadFailed,
            _ => NetError::Unknown(code),
        }
    }
}

impl From<io::Error> for NetError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
            io::ErrorKind::ConnectionReset => NetError::ConnectionReset,
            io::ErrorKind::ConnectionAborted => NetError::ConnectionAborted,
            io::ErrorKind::NotConnected | io::ErrorKind::BrokenPipe => NetError::ConnectionClosed,
            io::ErrorKind::TimedOut => NetError::ConnectionTimedOut,
            io::ErrorKind::UnexpectedEof => NetError::EmptyResponse,
            _ => NetError::ConnectionFailed,
        }
    }
}

impl From<hyper::Error> for NetError {
    fn from(err: hyper::Error) -> Self {
        if err.is_timeout() {
            NetError::ConnectionTimedOut
        } else if err.is_incomplete_message() {
            NetError::EmptyResponse
        } else if err.is_parse() || err.is_parse_status() {
            NetError::InvalidHttpResponse
        } else if err.is_closed() || err.is_canceled() {
            NetError::ConnectionClosed
        } else {
            NetError::ConnectionFailed
        }
    }
}
