use std::{fmt, time::Duration};

use log::{debug, trace};

use crate::{
    command::Command,
    config::Config,
    engine::{Attempt, CommandResponse, Engine, State},
    error::{RconError, Result},
    packet::{Packet, HEADER_LEN},
    players::PlayerList,
    transport::Transport,
};

/// Simple asynchronous rcon client. Call `connect()` to establish a connection
/// and authenticate. The client should be `mut` as it keeps a counter used for
/// [Packet] IDs, and only runs one command at a time.
///
/// If a command future is dropped before it resolves, the reply to that
/// command may still be on its way, and every following command fails with
/// [crate::error::RconError::Desynchronized]. Reconnect in that case.
///
/// ## Example
/// ```no_run
/// use palcon::{client::Client, config::Config};
/// use std::error::Error;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn Error>> {
///     let config = Config::new("127.0.0.1", 25575, "<put rcon password here>");
///     // client must be mutable so we can increment packet IDs
///     let mut client = Client::connect(&config).await?;
///     let response = client.broadcast("hi").await?;
///
///     assert_eq!(response.message(), "Broadcasted: hi");
///     client.disconnect().await;
///     Ok(())
/// }
/// ```
pub struct Client {
    engine: Engine,
    transport: Transport,
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
    pub async fn connect(config: &Config) -> Result<Self> {
        let transport = Transport::connect(&config.host, config.port, config.timeout).await?;

        trace!("opened tcp stream to {}, attempting auth", config.address());

        let mut client = Client {
            engine: Engine::new(),
            transport,
            retry_delay: config.retry_delay,
            peer: config.address(),
        };
        // on failure the client is dropped here and takes the socket with it
        client.auth(&config.password).await?;

        debug!("successful login: {}", client.peer);
        Ok(client)
    }

    async fn auth(&mut self, password: &str) -> Result<()> {
        let frame = self.engine.begin_auth(password)?;

        trace!("sending auth packet to server");
        self.transport
            .send(&frame)
            .await
            .map_err(|e| self.engine.fail(e))?;

        let raw = read_frame(&mut self.transport)
            .await
            .map_err(|e| self.engine.fail(e))?;
        self.engine.finish_auth(&raw)
    }

    /// Closes the connection. Safe to call more than once.
    pub async fn disconnect(&mut self) {
        if self.transport.is_open() {
            self.transport.close().await;
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

    /// Run a rcon command with the default attempt budget for its name (see
    /// [crate::command::COMMANDS]).
    pub async fn execute_command(&mut self, command: impl Into<Command>) -> Result<CommandResponse> {
        let command = command.into();
        let max_attempts = command.default_attempts();
        self.execute_command_with(command, max_attempts).await
    }

    /// Run a rcon command. Replies that come back without their closing
    /// newline are asked for again, up to `max_attempts` times in total.
    pub async fn execute_command_with(
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
                .await
                .map_err(|e| self.engine.fail(e))?;

            let raw = read_frame(&mut self.transport)
                .await
                .map_err(|e| self.engine.fail(e))?;

            match self.engine.offer(&mut exchange, &raw)? {
                Attempt::Complete(response) => return Ok(response),
                Attempt::Retry => tokio::time::sleep(self.retry_delay).await,
            }
        }
    }

    /// Shuts the server down after `seconds`, showing `message` to players.
    /// With `send_save` the world is saved first and the delay is at least
    /// five seconds.
    pub async fn shutdown(
        &mut self,
        seconds: u32,
        message: &str,
        send_save: bool,
    ) -> Result<CommandResponse> {
        let mut seconds = seconds;
        if send_save {
            self.save().await?;
            seconds = seconds.max(5);
        }
        self.execute_command(Command::shutdown(seconds, message))
            .await
    }

    /// Stops the server right away. The server tends to drop the connection
    /// instead of answering, in which case the session is closed before the
    /// error is returned.
    pub async fn exit(&mut self) -> Result<CommandResponse> {
        match self.execute_command(Command::exit()).await {
            Err(err) if err.is_connection_error() => {
                self.disconnect().await;
                Err(err)
            }
            other => other,
        }
    }

    pub async fn broadcast(&mut self, message: &str) -> Result<CommandResponse> {
        self.execute_command(Command::broadcast(message)).await
    }

    pub async fn kick_player(&mut self, steam_id: impl fmt::Display) -> Result<CommandResponse> {
        self.execute_command(Command::kick_player(steam_id)).await
    }

    pub async fn ban_player(&mut self, steam_id: impl fmt::Display) -> Result<CommandResponse> {
        self.execute_command(Command::ban_player(steam_id)).await
    }

    pub async fn list_players(&mut self) -> Result<CommandResponse> {
        self.execute_command(Command::list_players()).await
    }

    /// [Client::list_players], parsed.
    pub async fn players(&mut self) -> Result<PlayerList> {
        let response = self.list_players().await?;
        Ok(PlayerList::from_response(&response))
    }

    pub async fn info(&mut self) -> Result<CommandResponse> {
        self.execute_command(Command::info()).await
    }

    pub async fn save(&mut self) -> Result<CommandResponse> {
        self.execute_command(Command::save()).await
    }
}

/// Reads one whole frame, however many reads it takes. A header that can't
/// be sized means the stream is out of step, which nothing can recover from.
async fn read_frame(transport: &mut Transport) -> Result<Vec<u8>> {
    let mut raw = transport.receive_exact(HEADER_LEN).await?;
    let len = Packet::declared_len(&raw).ok_or(RconError::MalformedPacketHeader)?;
    raw.extend(transport.receive_exact(len).await?);
    Ok(raw)
}
