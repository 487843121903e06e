use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::fmt;

// Errors returned by the HTTP handlers
pub enum CustomError {
    BattleNotFound,
    BattleFull,
}

//implementation of custom errors that are used in handlers
impl IntoResponse for CustomError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            Self::BattleNotFound => (StatusCode::NOT_FOUND, "Battle not found"),
            Self::BattleFull => (StatusCode::CONFLICT, "Battle is full"),
        };
        (status, Json(json!({"error": error_message}))).into_response()
    }
}

// Reasons the store can refuse a connection at join time
#[derive(Debug, PartialEq, Eq)]
pub enum JoinError {
    UnknownBattle,
    BattleFull,
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::UnknownBattle => "Battle not found",
            Self::BattleFull => "Battle is full",
        };
        write!(f, "{}", message)
    }
}

// Reasons a submitted fleet layout gets rejected
#[derive(Debug, PartialEq, Eq)]
pub enum FleetError {
    InvalidInput,
    WrongShipCount,
    OverlappingShips,
    WrongShipSize,
    BadShipCoordinates,
    ShipsTooClose,
    WrongRatio,
}

impl fmt::Display for FleetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::InvalidInput => "incorrect input data",
            Self::WrongShipCount => "incorrect ships count",
            Self::OverlappingShips => "incorrect ships coordinates",
            Self::WrongShipSize => "incorrect ship size",
            Self::BadShipCoordinates => "incorrect ship coordinates",
            Self::ShipsTooClose => "ships can't be nearby",
            Self::WrongRatio => "incorrect ratio of ships",
        };
        write!(f, "{}", message)
    }
}

// Malformed inbound frames. Which variant applies depends on which part of
// the {"type", "data"} envelope is missing or unrecognized.
#[derive(Debug, PartialEq, Eq)]
pub enum ProtocolError {
    MissingType,
    UnknownType,
    MissingData,
    InvalidData,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::MissingType => "message type is missing",
            Self::UnknownType => "unknown message type",
            Self::MissingData => "message data is missing",
            Self::InvalidData => "incorrect message data",
        };
        write!(f, "{}", message)
    }
}

// Everything a client command can be rejected with. The Display text is what
// goes back to the client in the error frame.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandError {
    Fleet(FleetError),
    Protocol(ProtocolError),
    WrongPhase,
    NotYourMove,
    InvalidShot,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fleet(err) => write!(f, "{}", err),
            Self::Protocol(err) => write!(f, "{}", err),
            Self::WrongPhase => write!(f, "not possible at this stage"),
            Self::NotYourMove => write!(f, "not your move"),
            Self::InvalidShot => write!(f, "incorrect shot"),
        }
    }
}

impl From<FleetError> for CommandError {
    fn from(err: FleetError) -> Self {
        Self::Fleet(err)
    }
}

impl From<ProtocolError> for CommandError {
    fn from(err: ProtocolError) -> Self {
        Self::Protocol(err)
    }
}
