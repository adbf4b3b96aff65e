//! Find-game requests against the game's HTTP API.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MatchmakingConfig;

#[derive(Debug, Error)]
pub enum MatchmakingError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("matchmaker answered with status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Body(#[from] serde_json::Error),

    #[error("matchmaker returned no games")]
    NoGames,

    #[error("matchmaker refused: {0}")]
    Refused(String),

    #[error("game {0} has no server address")]
    NoAddress(String),
}

/// Where a session should connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTarget {
    pub game_id: String,
    #[serde(default)]
    pub use_https: bool,
    pub addrs: Vec<String>,
}

impl GameTarget {
    /// WebSocket URL of the game, on the first advertised address.
    pub fn play_url(&self) -> String {
        let scheme = if self.use_https { "wss" } else { "ws" };
        let addr = self.addrs.first().map(String::as_str).unwrap_or_default();
        format!("{}://{}/play?gameId={}", scheme, addr, self.game_id)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindGameRequest<'a> {
    region: &'a str,
    game_mode_idx: u8,
}

#[derive(Debug, Deserialize)]
struct FindGameResponse {
    #[serde(default)]
    res: Vec<FindGameResult>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FindGameResult {
    Game(GameTarget),
    Refused { err: String },
}

/// Parse a find-game response body into the first offered game.
pub fn parse_find_game(body: &str) -> Result<GameTarget, MatchmakingError> {
    let response: FindGameResponse = serde_json::from_str(body)?;
    match response.res.into_iter().next() {
        None => Err(MatchmakingError::NoGames),
        Some(FindGameResult::Refused { err }) => Err(MatchmakingError::Refused(err)),
        Some(FindGameResult::Game(target)) if target.addrs.is_empty() => {
            Err(MatchmakingError::NoAddress(target.game_id))
        }
        Some(FindGameResult::Game(target)) => Ok(target),
    }
}

/// Client for `POST {address}/api/find_game`. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Matchmaker {
    client: reqwest::Client,
    url: String,
    region: String,
    game_mode_idx: u8,
}

impl Matchmaker {
    pub fn new(config: &MatchmakingConfig) -> Result<Self, MatchmakingError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            url: format!("{}/api/find_game", config.address.trim_end_matches('/')),
            region: config.region.clone(),
            game_mode_idx: config.game_mode_idx,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ask for a game. Failures are not retried.
    pub async fn find_game(&self) -> Result<GameTarget, MatchmakingError> {
        let request = FindGameRequest {
            region: &self.region,
            game_mode_idx: self.game_mode_idx,
        };
        let response = self.client.post(&self.url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MatchmakingError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        parse_find_game(&body)
    }
}
