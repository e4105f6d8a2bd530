//! Parsing of the `showplayers` reply.
//!
//! ```text
//! name,playeruid,steamid
//! Alice,1234abcd,76561198000000000
//! ```
use std::str::FromStr;

use log::warn;
use serde::Serialize;

use crate::engine::CommandResponse;

const HEADER: &str = "name,playeruid,steamid";

/// Uid the server reports for a player whose join hasn't settled yet.
pub const UNPOPULATED_UID: &str = "00000000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub name: String,
    pub player_uid: String,
    pub steam_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerList {
    pub players: Vec<Player>,
    /// Players listed with [UNPOPULATED_UID]. Asking again a bit later
    /// usually fills them in.
    pub invalid_uid_players: Vec<Player>,
}

impl PlayerList {
    pub fn parse(text: &str) -> Self {
        let mut list = PlayerList::default();

        for line in text.lines() {
            if line.is_empty() || line == HEADER {
                continue;
            }

            // names can contain commas, the two ids never do
            let mut fields = line.rsplitn(3, ',');
            let (Some(steam_id), Some(player_uid), Some(name)) =
                (fields.next(), fields.next(), fields.next())
            else {
                warn!("skipping malformed player line: {:?}", line);
                continue;
            };

            let player = Player {
                name: name.to_string(),
                player_uid: player_uid.to_string(),
                steam_id: steam_id.to_string(),
            };
            if player.player_uid == UNPOPULATED_UID {
                list.invalid_uid_players.push(player);
            } else {
                list.players.push(player);
            }
        }

        list
    }

    pub fn from_response(response: &CommandResponse) -> Self {
        Self::parse(response.message())
    }

    /// True once every listed player has a real uid.
    pub fn is_complete(&self) -> bool {
        self.invalid_uid_players.is_empty()
    }

    pub fn len(&self) -> usize {
        self.players.len() + self.invalid_uid_players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Player> {
        self.players.iter()
    }
}

impl FromStr for PlayerList {
    type Err = std::convert::Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(text))
    }
}

impl<'a> IntoIterator for &'a PlayerList {
    type Item = &'a Player;
    type IntoIter = std::slice::Iter<'a, Player>;

    fn into_iter(self) -> Self::IntoIter {
        self.players.iter()
    }
}
