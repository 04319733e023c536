//! Core game entities: cards, the deck, chips, players, and hand phases.

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::constants::{BOARD_SIZE, DECK_SIZE, HOLE_SIZE};

/// Type alias for chip amounts. All bets, purses, and pots are whole
/// chips; fractional chips don't exist.
pub type Chips = u64;

/// Opaque player identifier, unique for the lifetime of the server.
pub type PlayerId = u64;

/// Opaque table identifier. `0` is reserved as "unassigned".
pub type TableId = u64;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Ten => 'T',
            Self::Jack => 'J',
            Self::Queen => 'Q',
            Self::King => 'K',
            Self::Ace => 'A',
            other => (b'2' + *other as u8) as char,
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Clubs => 'c',
            Self::Diamonds => 'd',
            Self::Hearts => 'h',
            Self::Spades => 's',
        };
        write!(f, "{repr}")
    }
}

/// One of the 52 distinct playing cards.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    #[must_use]
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum DeckError {
    #[error("not enough cards left in the deck")]
    OutOfCards,
    #[error("requested more cards than remain in the deck")]
    InvalidAmount,
}

const ALL_RANKS: [Rank; 13] = [
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Jack,
    Rank::Queen,
    Rank::King,
    Rank::Ace,
];

const ALL_SUITS: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

/// An ordered 52-card deck with a deal cursor. The card sequence after
/// [`Deck::shuffle`] is a permutation determined solely by the RNG state,
/// and no card is issued twice within one shuffle epoch.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: [Card; DECK_SIZE],
    next: usize,
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards = [Card::new(Rank::Two, Suit::Clubs); DECK_SIZE];
        for (s, suit) in ALL_SUITS.into_iter().enumerate() {
            for (r, rank) in ALL_RANKS.into_iter().enumerate() {
                cards[s * 13 + r] = Card::new(rank, suit);
            }
        }
        Self { cards, next: 0 }
    }
}

impl Deck {
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
        self.next = 0;
    }

    /// Restore the deal cursor without changing the card order.
    pub fn reset(&mut self) {
        self.next = 0;
    }

    pub fn deal_hole(&mut self) -> Result<[Card; HOLE_SIZE], DeckError> {
        self.deal()
    }

    pub fn deal_board(&mut self) -> Result<[Card; BOARD_SIZE], DeckError> {
        self.deal()
    }

    fn deal<const N: usize>(&mut self) -> Result<[Card; N], DeckError> {
        if self.next == DECK_SIZE {
            return Err(DeckError::OutOfCards);
        }
        if self.next + N > DECK_SIZE {
            return Err(DeckError::InvalidAmount);
        }
        let dealt = std::array::from_fn(|i| self.cards[self.next + i]);
        self.next += N;
        Ok(dealt)
    }
}

/// One street of a hand, in play order. `Holding` is a display
/// placeholder for "no hand in progress" and is never the phase of a
/// live hand.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Phase {
    Holding,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Phase {
    /// The next street to deal, if there is one.
    #[must_use]
    pub fn next_street(self) -> Option<Self> {
        match self {
            Self::Preflop => Some(Self::Flop),
            Self::Flop => Some(Self::Turn),
            Self::Turn => Some(Self::River),
            Self::Holding | Self::River | Self::Showdown => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Holding => "holding",
            Self::Preflop => "preflop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Showdown => "showdown",
        };
        write!(f, "{repr}")
    }
}

/// A participant's standing within the current hand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayerState {
    Active,
    AllIn,
    Folded,
    Left,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Active => "active",
            Self::AllIn => "all-in",
            Self::Folded => "folded",
            Self::Left => "left",
        };
        write!(f, "{repr}")
    }
}

/// A seated player and their chip purse. The purse is mutated only
/// through [`super::players::PlayerManager::place_bet`] and
/// [`super::players::PlayerManager::award_chips`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub purse: Chips,
}

impl Player {
    #[must_use]
    pub const fn new(id: PlayerId, purse: Chips) -> Self {
        Self { id, purse }
    }
}
