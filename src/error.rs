use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RconError>;

/// Possible errors for the package.
#[derive(Error, Debug)]
pub enum RconError {
    /// Returned if we received a packet that does not have a type known to us.
    #[error("unknown rcon packet type: {0}")]
    UnknownPacketType(i32),
    /// Returned if the header is mangled in some way (too short to hold a
    /// size field, or a size that no valid packet can have).
    #[error("packet header malformed (can't parse size, id or type)")]
    MalformedPacketHeader,
    /// The declared size does not match the bytes that actually arrived.
    #[error("packet size mismatch: header declares {declared} bytes, received {received}")]
    SizeMismatch { declared: usize, received: usize },
    /// The body was not followed by the two null bytes.
    #[error("packet is missing its null terminator")]
    MissingTerminator,
    /// Returned if the body is mangled in some way.
    #[error("packet body malformed (not valid utf-8)")]
    MalformedPacketBody(#[from] std::str::Utf8Error),
    /// The server only understands plain ascii without NUL bytes, so
    /// anything else is refused before it hits the wire.
    #[error("byte 0x{byte:02x} at offset {offset} can't be sent (non-ascii or NUL)")]
    EncodingError { offset: usize, byte: u8 },
    /// Returned if the host is down or behind a firewall.
    #[error("host cannot be reached")]
    UnreachableHost(#[source] io::Error),
    /// Internal error used if the stream was successfully established, but
    /// there was a problem writing to the socket.
    #[error("cannot send message to host")]
    SendError(#[source] io::Error),
    /// Internal error used if the stream was successfully established, but
    /// there was a problem reading from the socket.
    #[error("cannot receive response from host")]
    ReceiveError(#[source] io::Error),
    /// The peer closed the connection.
    #[error("connection closed by host")]
    ConnectionClosed,
    /// The session was never connected, failed earlier, or was disconnected.
    #[error("not connected to the server")]
    NotConnected,
    /// Returned if the server did not respond in time.
    #[error("timeout")]
    TimeoutError,
    /// Returned if you can't remember the password.
    #[error("bad password")]
    AuthenticationError,
    /// The response never ended with a newline. `payload` is the body of the
    /// last frame read: the bytes between its id/type fields and its two
    /// terminator bytes, whether or not the frame decoded.
    #[error("response still incomplete after {attempts} attempt(s)")]
    IncompleteMessage { payload: Vec<u8>, attempts: u32 },
    /// A previous command was abandoned before its response was read, so
    /// the next read can't be matched to the next write anymore.
    #[error("session desynchronized by an abandoned command")]
    Desynchronized,
}

impl RconError {
    /// Whether this is a socket-level failure (refused, reset, timed out or
    /// closed). These are never retried by the engine.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            RconError::UnreachableHost(_)
                | RconError::SendError(_)
                | RconError::ReceiveError(_)
                | RconError::ConnectionClosed
                | RconError::NotConnected
                | RconError::TimeoutError
        )
    }

    /// Errors after which the stream can't be trusted anymore: socket
    /// failures, and headers that can't be sized (the rest of that frame
    /// is still in the socket).
    pub fn is_fatal(&self) -> bool {
        self.is_connection_error() || matches!(self, RconError::MalformedPacketHeader)
    }

    /// Decode failures of a single frame. The engine counts them as an
    /// incomplete attempt instead of surfacing them directly.
    pub(crate) fn is_decode_error(&self) -> bool {
        matches!(
            self,
            RconError::UnknownPacketType(_)
                | RconError::MalformedPacketHeader
                | RconError::SizeMismatch { .. }
                | RconError::MissingTerminator
        )
    }

    pub(crate) fn from_send(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => RconError::TimeoutError,
            io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset => {
                RconError::ConnectionClosed
            }
            _ => RconError::SendError(err),
        }
    }

    pub(crate) fn from_receive(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => RconError::TimeoutError,
            io::ErrorKind::UnexpectedEof => RconError::ConnectionClosed,
            _ => RconError::ReceiveError(err),
        }
    }

    pub(crate) fn from_connect(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => RconError::TimeoutError,
            _ => RconError::UnreachableHost(err),
        }
    }
}
