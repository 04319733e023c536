//! Table rules and protocol limits.

use super::entities::Chips;

/// Chips handed to every player when they take their seat.
pub const BUY_IN: Chips = 1_000;

/// Forced bet posted left of the button.
pub const SMALL_BLIND: Chips = 5;

/// Forced bet posted left of the small blind. Also the initial
/// minimum raise increment on every street.
pub const BIG_BLIND: Chips = 10;

/// Seats per table.
pub const MAX_PLAYERS: usize = 10;

/// Connections the session accepts before rejecting newcomers.
pub const MAX_CONNECTIONS: usize = 102;

pub const DECK_SIZE: usize = 52;
pub const HOLE_SIZE: usize = 2;
pub const FLOP_SIZE: usize = 3;
pub const BOARD_SIZE: usize = 5;
