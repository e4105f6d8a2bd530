//! Protocol state machine shared by the async [crate::client::Client] and
//! the [crate::blocking::Client].
//!
//! The engine never touches a socket. The front ends ask it for the bytes
//! to send, feed it whatever they read back, and do what it says next.
//! That keeps the handshake and the retry policy in one place while the
//! two front ends only differ in how they wait for I/O.
//!
//! ## Retrying
//!
//! Every reply of the server is supposed to end with a newline, but the
//! server doesn't always wait for the whole reply before sending it, and
//! the frame's size field only covers what it did send. So once a whole
//! frame is in, a body without a newline (or a frame that doesn't decode)
//! is an incomplete attempt: the request goes out again and the next frame
//! is read, up to `max_attempts` times. Transport failures and unreadable
//! headers are never retried.
use log::{debug, trace};
use serde::Serialize;

use crate::{
    command::Command,
    error::{RconError, Result},
    packet::{Packet, PacketType},
};

/// Id used for the auth packet. The server echoes it back on success and
/// answers `-1` on a bad password.
pub const AUTH_PACKET_ID: i32 = 1;

/// Ids below this are reserved for auth.
pub const FIRST_COMMAND_ID: i32 = 100;

const AUTH_FAILED_ID: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Authenticating,
    Ready,
    /// A command was sent and its reply hasn't been fully read yet.
    Executing,
    Closed,
}

/// Reply to a command.
///
/// The id is whatever the server echoed. For ordinary commands that is
/// usually `0` rather than the id we sent, so don't match on it.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse {
    id: i32,
    message: String,
    successful: bool,
    attempts: u32,
    #[serde(skip)]
    raw: Vec<u8>,
}

impl CommandResponse {
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Reply text without its trailing newline.
    pub fn message(&self) -> &str {
        self.message.as_ref()
    }

    /// Whether the reply starts the way the server phrases a success for
    /// this command. Always true for commands it doesn't know about.
    pub fn is_successful(&self) -> bool {
        self.successful
    }

    /// How many reads it took to get a complete reply.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The full frame as received, header included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// What the front end should do after handing a frame to the engine.
#[derive(Debug)]
pub enum Attempt {
    Complete(CommandResponse),
    /// Send [Exchange::frame] again and read another frame.
    Retry,
}

/// One command in flight.
#[derive(Debug)]
pub struct Exchange {
    command: Command,
    request: Packet,
    frame: Vec<u8>,
    max_attempts: u32,
    attempts: u32,
}

impl Exchange {
    /// Encoded request. The same bytes are sent on every attempt.
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    pub fn id(&self) -> i32 {
        self.request.id()
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

#[derive(Debug)]
pub struct Engine {
    state: State,
    next_packet_id: i32,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            state: State::Idle,
            next_packet_id: FIRST_COMMAND_ID,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Encodes the auth packet for `password`.
    pub fn begin_auth(&mut self, password: &str) -> Result<Vec<u8>> {
        if self.state != State::Idle {
            return Err(RconError::NotConnected);
        }

        match Packet::new(AUTH_PACKET_ID, PacketType::Auth, password) {
            Ok(packet) => {
                self.state = State::Authenticating;
                Ok(packet.pack())
            }
            Err(err) => {
                self.state = State::Closed;
                Err(err)
            }
        }
    }

    /// Checks the single frame the server answers the auth packet with.
    pub fn finish_auth(&mut self, raw: &[u8]) -> Result<()> {
        if self.state != State::Authenticating {
            return Err(RconError::NotConnected);
        }

        let response = match Packet::unpack(raw) {
            Ok(response) => response,
            Err(err) => {
                self.state = State::Closed;
                return Err(err);
            }
        };
        trace!("receive auth response for packet id {}", response.id());

        if response.id() == AUTH_FAILED_ID {
            self.state = State::Closed;
            return Err(RconError::AuthenticationError);
        }
        if response.id() != AUTH_PACKET_ID {
            debug!(
                "auth response echoed id {} instead of {}",
                response.id(),
                AUTH_PACKET_ID
            );
        }

        self.state = State::Ready;
        Ok(())
    }

    /// Starts a command. Only one command can be in flight: the server's
    /// ids can't be used to tell replies apart, only their order can.
    pub fn begin_command(&mut self, command: Command, max_attempts: u32) -> Result<Exchange> {
        match self.state {
            State::Ready => {}
            State::Executing => return Err(RconError::Desynchronized),
            _ => return Err(RconError::NotConnected),
        }

        let request = Packet::new(self.next_packet_id(), PacketType::Exec, command.as_str())?;
        let frame = request.pack();
        self.state = State::Executing;

        Ok(Exchange {
            command,
            request,
            frame,
            max_attempts: max_attempts.max(1),
            attempts: 0,
        })
    }

    /// Feeds the frame read for one attempt of `exchange`.
    pub fn offer(&mut self, exchange: &mut Exchange, raw: &[u8]) -> Result<Attempt> {
        match self.state {
            State::Executing => {}
            State::Closed => return Err(RconError::NotConnected),
            _ => return Err(RconError::Desynchronized),
        }
        exchange.attempts += 1;

        let payload = match Packet::unpack(raw) {
            Ok(response) => {
                trace!("receive response for packet id {}", response.id());
                if response.id() == AUTH_FAILED_ID {
                    self.state = State::Closed;
                    return Err(RconError::AuthenticationError);
                }
                if response.id() != exchange.id() {
                    debug!(
                        "received packet has a different id (sent: {}, received: {})",
                        exchange.id(),
                        response.id()
                    );
                }

                if is_terminated(response.body()) {
                    self.state = State::Ready;
                    return complete(exchange, response, raw).map(Attempt::Complete);
                }
                response.into_body()
            }
            Err(err) if err.is_decode_error() => {
                debug!("undecodable response frame: {}", err);
                Packet::body_region(raw).to_vec()
            }
            Err(err) => {
                self.state = State::Ready;
                return Err(err);
            }
        };

        if exchange.attempts >= exchange.max_attempts {
            self.state = State::Ready;
            return Err(RconError::IncompleteMessage {
                payload,
                attempts: exchange.attempts,
            });
        }

        debug!(
            "response to {:?} incomplete, retrying... {}/{}",
            exchange.command.name(),
            exchange.attempts + 1,
            exchange.max_attempts
        );
        Ok(Attempt::Retry)
    }

    /// Records a transport failure and hands the error back. Connection
    /// errors and unreadable headers close the session for good.
    pub fn fail(&mut self, err: RconError) -> RconError {
        if err.is_fatal() {
            self.state = State::Closed;
        } else if self.state == State::Executing {
            self.state = State::Ready;
        }
        err
    }

    pub fn close(&mut self) {
        self.state = State::Closed;
    }

    fn next_packet_id(&mut self) -> i32 {
        let id = self.next_packet_id;
        self.next_packet_id = id.checked_add(1).unwrap_or(FIRST_COMMAND_ID);
        id
    }
}

/// Empty replies count as complete, some commands don't say anything.
fn is_terminated(body: &[u8]) -> bool {
    body.is_empty() || body.ends_with(b"\n")
}

fn complete(exchange: &Exchange, response: Packet, raw: &[u8]) -> Result<CommandResponse> {
    let id = response.id();
    let body = response.into_body();
    let text = body.strip_suffix(b"\n").unwrap_or(&body);
    let message = std::str::from_utf8(text)?.to_string();
    let successful = message.starts_with(exchange.command.success_prefix());

    Ok(CommandResponse {
        id,
        message,
        successful,
        attempts: exchange.attempts,
        raw: raw.to_vec(),
    })
}
