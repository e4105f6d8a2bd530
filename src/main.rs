use clap::Parser;
use log::{Level, LevelFilter, Metadata, Record};
use palcon::{blocking, client, Command, CommandResponse, Config, PlayerList};
use serde::Serialize;
use std::{error::Error, time::Duration};

struct SimpleLogger {
    level: Level,
}

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{} - {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// RCON client for Palworld
#[derive(Parser, Debug)]
#[command(name = "palcon", version)]
struct Cli {
    /// The hostname of the server
    #[arg(short = 'H', long)]
    host: String,

    /// The port of the server
    #[arg(short, long, default_value_t = palcon::config::DEFAULT_PORT)]
    port: u16,

    /// The RCON password
    #[arg(short = 'P', long, env = "RCON_PASSWORD", hide_env_values = true)]
    password: String,

    /// The command to send to the server
    #[arg(short, long)]
    command: String,

    /// Seconds to wait for each network call
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Use the async client
    #[arg(short = 'a', long = "async")]
    use_async: bool,
}

#[derive(Serialize)]
struct Output {
    #[serde(flatten)]
    response: CommandResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    players: Option<PlayerList>,
}

fn run_blocking(config: &Config, command: Command) -> palcon::Result<CommandResponse> {
    let mut client = blocking::Client::connect(config)?;
    client.execute_command(command)
}

async fn run_async(config: &Config, command: Command) -> palcon::Result<CommandResponse> {
    let mut client = client::Client::connect(config).await?;
    let response = client.execute_command(command).await;
    client.disconnect().await;
    response
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = if cli.debug && !cli.json {
        Level::Debug
    } else {
        Level::Info
    };
    let logger = Box::leak(Box::new(SimpleLogger { level }));
    let _ = log::set_logger(logger).map(|()| log::set_max_level(LevelFilter::Debug));

    let mut config = Config::new(cli.host, cli.port, cli.password);
    if let Some(seconds) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(seconds));
    }
    let command = Command::from(cli.command);

    let response = if cli.use_async {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
            .block_on(run_async(&config, command.clone()))?
    } else {
        run_blocking(&config, command.clone())?
    };

    let players = (command.name() == "showplayers").then(|| PlayerList::from_response(&response));

    if cli.json {
        let output = Output { response, players };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if let Some(players) = &players {
        for player in players {
            println!("{}\t{}\t{}", player.name, player.player_uid, player.steam_id);
        }
        for player in &players.invalid_uid_players {
            println!("{}\t(uid pending)\t{}", player.name, player.steam_id);
        }
    } else {
        println!("{}", response.message());
    }
    Ok(())
}
