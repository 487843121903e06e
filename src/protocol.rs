use serde::Serialize;
use serde_json::Value;

use crate::errors::ProtocolError;
use crate::models::battle::BattlePhase;
use crate::models::board::{PlayerBoard, ShipCells};

// The three things a client may ask for. Payload values stay untyped here;
// whether a shot coordinate is actually an integer is a game rule, not a
// framing rule, and gets its own error.
#[derive(Debug, PartialEq)]
pub enum ClientCommand {
    LoadFleet { ships: Value },
    TakeShot { x: Value, y: Value },
    Surrender,
}

pub fn parse_command(text: &str) -> Result<ClientCommand, ProtocolError> {
    let frame: Value = serde_json::from_str(text).map_err(|_| ProtocolError::MissingType)?;
    let kind = match frame.get("type") {
        Some(kind) => kind.as_str().ok_or(ProtocolError::UnknownType)?,
        None => return Err(ProtocolError::MissingType),
    };

    match kind {
        "load-fleet" => {
            let data = frame.get("data").ok_or(ProtocolError::MissingData)?;
            let ships = data.get("ships").ok_or(ProtocolError::InvalidData)?;
            Ok(ClientCommand::LoadFleet {
                ships: ships.clone(),
            })
        }
        "take-shot" => {
            let data = frame.get("data").ok_or(ProtocolError::MissingData)?;
            let x = data.get("x").ok_or(ProtocolError::InvalidData)?;
            let y = data.get("y").ok_or(ProtocolError::InvalidData)?;
            Ok(ClientCommand::TakeShot {
                x: x.clone(),
                y: y.clone(),
            })
        }
        "surrender" => Ok(ClientCommand::Surrender),
        _ => Err(ProtocolError::UnknownType),
    }
}

// Every frame the server sends. Serializes as {"type": ..., "data": ...},
// with the data member omitted for bare notifications like your-move.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    State {
        phase: BattlePhase,
    },
    Success {
        message: String,
    },
    Error {
        message: String,
    },
    Info {
        message: String,
    },
    ChangedOwnField(PlayerView),
    ChangedOpponentField(PlayerView),
    YourMove,
    ProgressSummary {
        #[serde(rename = "self")]
        own: PlayerView,
        opponent: PlayerView,
    },
    EndGame {
        result: GameResult,
        #[serde(rename = "self")]
        own: PlayerView,
        opponent: PlayerView,
    },
}

impl ClientMessage {
    pub fn success(message: &str) -> ClientMessage {
        ClientMessage::Success {
            message: message.to_string(),
        }
    }

    pub fn error(message: impl ToString) -> ClientMessage {
        ClientMessage::Error {
            message: message.to_string(),
        }
    }

    pub fn info(message: &str) -> ClientMessage {
        ClientMessage::Info {
            message: message.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Win,
    Lose,
}

// One board as a client sees it. The ships member only appears in views of
// the client's own board and in the end-game reveal; everything an opponent
// learns is already burned into the grid.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub grid: Vec<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ships: Option<Vec<ShipCells>>,
    pub live_ship_counts: [u8; 4],
}

impl PlayerView {
    pub fn owned(board: &PlayerBoard) -> PlayerView {
        PlayerView {
            grid: board.field_ints(),
            ships: board.ships.clone(),
            live_ship_counts: board.live_ship_counts(),
        }
    }

    pub fn censored(board: &PlayerBoard) -> PlayerView {
        PlayerView {
            grid: board.field_ints(),
            ships: None,
            live_ship_counts: board.live_ship_counts(),
        }
    }
}
