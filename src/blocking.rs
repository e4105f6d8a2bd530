//! Blocking front end. Same methods and the same retry behavior as
//! [crate::client::Client], but every network call blocks the calling
//! thread.
use std::{fmt, thread, time::Duration};

use log::{debug, trace};

use crate::{
    command::Command,
    config::Config,
    engine::{Attempt, CommandResponse, Engine, State},
    error::{RconError, Result},
    packet::{Packet, HEADER_LEN},
    players::PlayerList,
    transport::BlockingTransport,
};

/// Blocking rcon client. The connection is closed when the client is
/// dropped.
///
/// ## Example
/// ```no_run
/// use palcon::{blocking::Client, config::Config};
///
/// let config = Config::new("127.0.0.1", 25575, "<put rcon password here>");
/// let mut client = Client::connect(&config)?;
/// let players = client.players()?;
/// for player in &players {
///     println!("{} ({})", player.name, player.steam_id);
/// }
/// # Ok::<(), palcon::error::RconError>(())
/// ```
pub struct Client {
    engine: Engine,
    transport: BlockingTransport,
    retry_delay: Duration,
    peer: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("peer", &self.peer)
            .field("state", &self.engine.state())
            .finish()
    }
}

impl Client {
    pub fn connect(config: &Config) -> Result<Self> {
        let transport = BlockingTransport::connect(&config.host, config.port, config.timeout)?;

        trace!("opened tcp stream to {}, attempting auth", config.address());

        let mut client = Client {
            engine: Engine::new(),
            transport,
            retry_delay: config.retry_delay,
            peer: config.address(),
        };
        client.auth(&config.password)?;

        debug!("successful login: {}", client.peer);
        Ok(client)
    }

    fn auth(&mut self, password: &str) -> Result<()> {
        let frame = self.engine.begin_auth(password)?;

        trace!("sending auth packet to server");
        self.transport
            .send(&frame)
            .map_err(|e| self.engine.fail(e))?;

        let raw = read_frame(&mut self.transport).map_err(|e| self.engine.fail(e))?;
        self.engine.finish_auth(&raw)
    }

    /// Closes the connection. Safe to call more than once.
    pub fn disconnect(&mut self) {
        if self.transport.is_open() {
            self.transport.close();
            debug!("disconnected from {}", self.peer);
        }
        self.engine.close();
    }

    pub fn state(&self) -> State {
        self.engine.state()
    }

    pub fn peer(&self) -> &str {
        self.peer.as_ref()
    }

    pub fn execute_command(&mut self, command: impl Into<Command>) -> Result<CommandResponse> {
        let command = command.into();
        let max_attempts = command.default_attempts();
        self.execute_command_with(command, max_attempts)
    }

    pub fn execute_command_with(
        &mut self,
        command: impl Into<Command>,
        max_attempts: u32,
    ) -> Result<CommandResponse> {
        let mut exchange = self.engine.begin_command(command.into(), max_attempts)?;

        loop {
            debug!(
                "sending message: packet_id={}, message={}",
                exchange.id(),
                exchange.command()
            );
            self.transport
                .send(exchange.frame())
                .map_err(|e| self.engine.fail(e))?;

            let raw = read_frame(&mut self.transport).map_err(|e| self.engine.fail(e))?;

            match self.engine.offer(&mut exchange, &raw)? {
                Attempt::Complete(response) => return Ok(response),
                Attempt::Retry => thread::sleep(self.retry_delay),
            }
        }
    }

    pub fn shutdown(&mut self, seconds: u32, message: &str, send_save: bool) -> Result<CommandResponse> {
        let mut seconds = seconds;
        if send_save {
            self.save()?;
            seconds = seconds.max(5);
        }
        self.execute_command(Command::shutdown(seconds, message))
    }

    pub fn exit(&mut self) -> Result<CommandResponse> {
        match self.execute_command(Command::exit()) {
            Err(err) if err.is_connection_error() => {
                self.disconnect();
                Err(err)
            }
            other => other,
        }
    }

    pub fn broadcast(&mut self, message: &str) -> Result<CommandResponse> {
        self.execute_command(Command::broadcast(message))
    }

    pub fn kick_player(&mut self, steam_id: impl fmt::Display) -> Result<CommandResponse> {
        self.execute_command(Command::kick_player(steam_id))
    }

    pub fn ban_player(&mut self, steam_id: impl fmt::Display) -> Result<CommandResponse> {
        self.execute_command(Command::ban_player(steam_id))
    }

    pub fn list_players(&mut self) -> Result<CommandResponse> {
        self.execute_command(Command::list_players())
    }

    pub fn players(&mut self) -> Result<PlayerList> {
        let response = self.list_players()?;
        Ok(PlayerList::from_response(&response))
    }

    pub fn info(&mut self) -> Result<CommandResponse> {
        self.execute_command(Command::info())
    }

    pub fn save(&mut self) -> Result<CommandResponse> {
        self.execute_command(Command::save())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn read_frame(transport: &mut BlockingTransport) -> Result<Vec<u8>> {
    let mut raw = transport.receive_exact(HEADER_LEN)?;
    let len = Packet::declared_len(&raw).ok_or(RconError::MalformedPacketHeader)?;
    raw.extend(transport.receive_exact(len)?);
    Ok(raw)
}
