//! Wire message types: the frozen contract between clients and the
//! server.
//!
//! An inbound frame carries one [`Action`]; an outbound frame carries
//! one [`Response`] whose messages are each either an event or an
//! error. Cards, phases, and error kinds ride along as small serde
//! enums, so encoding followed by decoding yields an equal value for
//! every defined variant.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::Error;
use crate::game::entities::{Chips, PlayerId};
use crate::game::table;

pub use crate::game::table::Event;

/// A client's move. The sender never names itself; the session
/// attributes the action to the connection's player id.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Action {
    Fold,
    Bet { amount: Chips },
}

impl Action {
    /// Attribute this wire action to the player who sent it.
    #[must_use]
    pub fn into_game(self, id: PlayerId) -> table::Action {
        match self {
            Self::Fold => table::Action::Fold { id },
            Self::Bet { amount } => table::Action::Bet { id, amount },
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Fold => write!(f, "fold"),
            Self::Bet { amount } => write!(f, "bet {amount}"),
        }
    }
}

/// One unit of an outbound response.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Message {
    Event(Event),
    Error(Error),
}

/// An ordered batch of messages delivered to one client as a single
/// frame.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Response {
    pub messages: Vec<Message>,
}

impl Response {
    #[must_use]
    pub fn from_events(events: &[Event]) -> Self {
        Self {
            messages: events.iter().cloned().map(Message::Event).collect(),
        }
    }

    #[must_use]
    pub fn from_error(error: Error) -> Self {
        Self {
            messages: vec![Message::Error(error)],
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The events in this response, ignoring errors.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.messages.iter().filter_map(|message| match message {
            Message::Event(event) => Some(event),
            Message::Error(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{GameError, PlayerMgmtError, ServerError};
    use crate::game::entities::{Card, Phase, Rank, Suit};

    fn round_trip<T>(value: &T) -> T
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        let bytes = bincode::serialize(value).unwrap();
        bincode::deserialize(&bytes).unwrap()
    }

    #[test]
    fn actions_round_trip() {
        for action in [Action::Fold, Action::Bet { amount: 0 }, Action::Bet { amount: 1_000 }] {
            assert_eq!(round_trip(&action), action);
        }
    }

    #[test]
    fn events_round_trip() {
        let ace = Card::new(Rank::Ace, Suit::Spades);
        let king = Card::new(Rank::King, Suit::Hearts);
        let two = Card::new(Rank::Two, Suit::Clubs);
        let events = [
            Event::PlayerAdded { who: 3 },
            Event::PlayerRemoved { who: 4 },
            Event::HandStarted,
            Event::DealtHole {
                who: 1,
                hole: [ace, king],
            },
            Event::DealtFlop {
                flop: [ace, king, two],
            },
            Event::DealtStreet { street: two },
            Event::PhaseAdvanced { next: Phase::Flop },
            Event::BetPlaced { who: 2, amount: 10 },
            Event::TurnAdvanced { next: 1 },
            Event::WonPot {
                who: 2,
                amount: 2_000,
            },
        ];
        for event in &events {
            assert_eq!(&round_trip(event), event);
        }
    }

    #[test]
    fn errors_round_trip() {
        let errors: [Error; 3] = [
            ServerError::TooManyClients.into(),
            GameError::OutOfTurn.into(),
            PlayerMgmtError::NotEnoughSeats.into(),
        ];
        for error in &errors {
            assert_eq!(&round_trip(error), error);
        }
    }

    #[test]
    fn mixed_response_round_trips() {
        let response = Response {
            messages: vec![
                Message::Event(Event::HandStarted),
                Message::Error(GameError::BetTooLow.into()),
                Message::Event(Event::TurnAdvanced { next: 9 }),
            ],
        };
        assert_eq!(round_trip(&response), response);
    }

    #[test]
    fn wire_actions_attribute_their_sender() {
        assert_eq!(
            Action::Bet { amount: 25 }.into_game(7),
            table::Action::Bet { id: 7, amount: 25 }
        );
        assert_eq!(Action::Fold.into_game(7), table::Action::Fold { id: 7 });
    }

    #[test]
    fn response_event_accessor_skips_errors() {
        let response = Response {
            messages: vec![
                Message::Error(GameError::BetTooLow.into()),
                Message::Event(Event::HandStarted),
            ],
        };
        assert_eq!(response.events().count(), 1);
        assert!(!response.is_empty());
        assert!(Response::default().is_empty());
    }
}
