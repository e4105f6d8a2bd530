//! Pure Rust implementation of the [Source RCON protocol](https://developer.valvesoftware.com/wiki/Source_RCON_Protocol)
//! as spoken by Palworld dedicated servers, quirks included.
//!
//! Use [client::Client] from async code and [blocking::Client] otherwise.
//! Both run on the same [engine::Engine].
pub mod blocking;
pub mod client;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod packet;
pub mod players;
pub mod transport;

pub use command::Command;
pub use config::Config;
pub use engine::CommandResponse;
pub use error::{RconError, Result};
pub use players::{Player, PlayerList};
