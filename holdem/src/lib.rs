//! # Holdem
//!
//! A multi-table no-limit Texas Hold'em game engine and session server.
//!
//! Clients speak a length-prefixed binary protocol over TCP. The
//! session routes each decoded action to the table owning the sender's
//! seat, the table advances its hand state machine deterministically,
//! and the resulting events fan back out to exactly the right audience:
//! hole cards go only to their owner, everything else to the whole
//! table, and errors only to the offender.
//!
//! ## Core Modules
//!
//! - [`game`]: deck, seat management, hand evaluation, and the
//!   per-table hand state machine
//! - [`net`]: wire messages, framing, the session/router, and the
//!   readiness-driven server loop
//! - [`errors`]: the error taxonomy shared by all of the above
//!
//! ## Example
//!
//! ```
//! use holdem::game::table::Table;
//! use rand::{SeedableRng, rngs::StdRng};
//!
//! let mut table = Table::new(StdRng::seed_from_u64(0));
//! table.add_player(1).unwrap();
//! table.add_player(2).unwrap();
//! let events = table.handle_new_hand().unwrap();
//! assert!(!events.is_empty());
//! ```

pub mod errors;
pub mod game;
pub mod net;

pub use errors::{Error, GameError, PlayerMgmtError, ServerError};
pub use game::{
    constants,
    entities::{Card, Chips, Phase, PlayerId, Rank, Suit, TableId},
    hand_eval::rank_best_of_seven,
    players::PlayerManager,
    table::{Action, Event, Table},
};
