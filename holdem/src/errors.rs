//! Error taxonomy shared by the engine, the session, and the wire.
//!
//! Three disjoint categories are carried in a single tagged [`Error`]
//! value so the codec can encode any failure the same way.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised by the session itself rather than a table.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum ServerError {
    #[error("too many clients")]
    TooManyClients,
    #[error("all tables are full")]
    AllTablesFull,
    /// An action arrived on a connection with no associated table.
    #[error("illegal action")]
    IllegalAction,
}

/// Failures raised while advancing a hand.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    /// No hand in progress, or the hand is in the wrong phase.
    #[error("invalid action")]
    InvalidAction,
    #[error("a hand is already in play")]
    HandInPlay,
    #[error("need 2+ players")]
    NotEnoughPlayers,
    #[error("not enough chips")]
    InsufficientFunds,
    #[error("bet is too low")]
    BetTooLow,
    #[error("not your turn")]
    OutOfTurn,
    #[error("no such player")]
    NoSuchPlayer,
}

/// Failures raised by seat management.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum PlayerMgmtError {
    #[error("not enough seats")]
    NotEnoughSeats,
    #[error("invalid player id")]
    InvalidId,
    #[error("player not found")]
    PlayerNotFound,
    #[error("no players")]
    NoPlayers,
}

/// Any failure the server can report to a client.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum Error {
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    PlayerMgmt(#[from] PlayerMgmtError),
}
