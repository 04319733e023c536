//! The per-table hand state machine.
//!
//! A [`Table`] owns its seats, its deck, its RNG, and at most one
//! in-progress [`HandState`]. Mutations happen through
//! [`Table::handle_new_hand`], [`Table::on_action`], and the membership
//! calls; each returns the ordered list of [`Event`]s the mutation
//! produced, and the caller decides who gets to see them.
//!
//! All calls on a table must be serialised by the driver; the engine
//! assumes run-to-completion semantics and keeps no locks.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;

use super::constants::{BIG_BLIND, BOARD_SIZE, FLOP_SIZE, HOLE_SIZE, MAX_PLAYERS, SMALL_BLIND};
use super::entities::{Card, Chips, Deck, Phase, PlayerId, PlayerState};
use super::hand_eval::{HandRank, rank_best_of_seven};
use super::players::PlayerManager;
use crate::errors::{GameError, PlayerMgmtError};

/// Something that happened at a table. Events are emitted in order and
/// broadcast to the whole table, except [`Event::DealtHole`], which only
/// its owner may see.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Event {
    PlayerAdded { who: PlayerId },
    PlayerRemoved { who: PlayerId },
    HandStarted,
    DealtHole { who: PlayerId, hole: [Card; HOLE_SIZE] },
    DealtFlop { flop: [Card; FLOP_SIZE] },
    DealtStreet { street: Card },
    PhaseAdvanced { next: Phase },
    BetPlaced { who: PlayerId, amount: Chips },
    TurnAdvanced { next: PlayerId },
    WonPot { who: PlayerId, amount: Chips },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::PlayerAdded { who } => format!("player {who} joined the table"),
            Self::PlayerRemoved { who } => format!("player {who} left the table"),
            Self::HandStarted => "a new hand started".to_string(),
            Self::DealtHole { who, hole } => {
                format!("dealt {}{} to player {who}", hole[0], hole[1])
            }
            Self::DealtFlop { flop } => {
                format!("flop {} {} {}", flop[0], flop[1], flop[2])
            }
            Self::DealtStreet { street } => format!("dealt {street}"),
            Self::PhaseAdvanced { next } => format!("entering the {next}"),
            Self::BetPlaced { who, amount } => format!("player {who} bet {amount}"),
            Self::TurnAdvanced { next } => format!("player {next} to act"),
            Self::WonPot { who, amount } => format!("player {who} won {amount}"),
        };
        write!(f, "{repr}")
    }
}

/// A player's move, already attributed to a seat by the session.
/// `Bet { amount: 0 }` is a check; a positive amount is a call or a
/// raise. `Timeout` is injected by the driver when a player stalls.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    Fold { id: PlayerId },
    Bet { id: PlayerId, amount: Chips },
    Timeout { id: PlayerId },
}

impl Action {
    #[must_use]
    pub fn id(&self) -> PlayerId {
        match self {
            Self::Fold { id } | Self::Bet { id, .. } | Self::Timeout { id } => *id,
        }
    }
}

/// A disjoint pool of committed chips contested by the participants
/// that covered it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SidePot {
    pub amount: Chips,
    pub eligible: Vec<PlayerId>,
}

/// Bookkeeping for one hand of poker, present only while the hand is in
/// progress.
#[derive(Debug)]
struct HandState {
    phase: Phase,
    button: PlayerId,
    /// Players dealt into this hand, clockwise from the button.
    participants: Vec<PlayerId>,
    player_state: HashMap<PlayerId, PlayerState>,
    player_holes: HashMap<PlayerId, [Card; HOLE_SIZE]>,
    table_cards: [Card; BOARD_SIZE],
    /// Chips committed per player on the current street.
    active_bets: HashMap<PlayerId, Chips>,
    /// Chips committed per player over the whole hand.
    committed: HashMap<PlayerId, Chips>,
    /// Per-street high-water bet to match.
    previous_bet: Chips,
    /// Minimum legal raise increment.
    min_raise: Chips,
    /// Participants still owing an action this street.
    turn_queue: VecDeque<PlayerId>,
}

pub struct Table {
    deck: Deck,
    rng: StdRng,
    players: PlayerManager,
    button: PlayerId,
    hand: Option<HandState>,
}

impl Table {
    #[must_use]
    pub fn new(rng: StdRng) -> Self {
        Self {
            deck: Deck::default(),
            rng,
            players: PlayerManager::default(),
            button: 0,
            hand: None,
        }
    }

    #[must_use]
    pub fn has_open_seat(&self) -> bool {
        self.players.num_players() < MAX_PLAYERS
    }

    #[must_use]
    pub fn hand_in_progress(&self) -> bool {
        self.hand.is_some()
    }

    #[must_use]
    pub fn can_start_hand(&self) -> bool {
        !self.hand_in_progress() && self.players.num_players() >= 2
    }

    #[must_use]
    pub fn players(&self) -> &PlayerManager {
        &self.players
    }

    /// The player currently expected to act, if any.
    #[must_use]
    pub fn current_turn(&self) -> Option<PlayerId> {
        self.hand.as_ref()?.turn_queue.front().copied()
    }

    /// Chips committed to the hand in progress, across all streets.
    #[must_use]
    pub fn total_committed(&self) -> Chips {
        self.hand
            .as_ref()
            .map_or(0, |hand| hand.committed.values().sum())
    }

    pub fn add_player(&mut self, id: PlayerId) -> Result<Event, PlayerMgmtError> {
        self.players.add_player(id)?;
        Ok(Event::PlayerAdded { who: id })
    }

    /// Remove a player, freeing their seat immediately. If they were
    /// part of the hand in progress they are marked as left and spliced
    /// out of the turn queue; if it was their turn, the turn passes on.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<Vec<Event>, PlayerMgmtError> {
        self.players.remove_player(id)?;
        let mut events = vec![Event::PlayerRemoved { who: id }];
        let mut removed_front = false;
        if let Some(hand) = self.hand.as_mut() {
            if hand.player_state.contains_key(&id) {
                hand.player_state.insert(id, PlayerState::Left);
                removed_front = hand.turn_queue.front() == Some(&id);
                hand.turn_queue.retain(|&queued| queued != id);
            }
        }
        if removed_front {
            self.prune_turn_queue();
            if let Some(next) = self.current_turn() {
                events.push(Event::TurnAdvanced { next });
            }
        }
        Ok(events)
    }

    /// Start a new hand: seat held players, advance the button, deal,
    /// post blinds, and queue the first street of betting.
    pub fn handle_new_hand(&mut self) -> Result<Vec<Event>, GameError> {
        if self.hand_in_progress() {
            return Err(GameError::HandInPlay);
        }
        if self.players.num_players() < 2 {
            return Err(GameError::NotEnoughPlayers);
        }
        self.players.seat_held_players();
        self.button = if self.button == 0 {
            self.first_seated()?
        } else {
            // The previous button holder may have left the table; fall
            // back to the first occupied seat.
            match self.players.next_player(self.button) {
                Ok(next) => next,
                Err(_) => self.first_seated()?,
            }
        };
        let participants = self.players.active_cycle_from(self.button);
        if participants.len() < 2 {
            return Err(GameError::NotEnoughPlayers);
        }

        self.deck.shuffle(&mut self.rng);
        let mut player_state = HashMap::with_capacity(participants.len());
        let mut player_holes = HashMap::with_capacity(participants.len());
        let mut active_bets = HashMap::with_capacity(participants.len());
        let mut committed = HashMap::with_capacity(participants.len());
        // Deal two cards to each participant clockwise from the button,
        // then the full board face down.
        for &id in &participants {
            player_state.insert(id, PlayerState::Active);
            active_bets.insert(id, 0);
            committed.insert(id, 0);
            let hole = self
                .deck
                .deal_hole()
                .map_err(|_| GameError::InvalidAction)?;
            player_holes.insert(id, hole);
        }
        let table_cards = self
            .deck
            .deal_board()
            .map_err(|_| GameError::InvalidAction)?;

        let mut events = vec![
            Event::HandStarted,
            Event::PhaseAdvanced {
                next: Phase::Preflop,
            },
        ];
        for &id in &participants {
            if let Some(&hole) = player_holes.get(&id) {
                events.push(Event::DealtHole { who: id, hole });
            }
        }

        self.hand = Some(HandState {
            phase: Phase::Preflop,
            button: self.button,
            participants: participants.clone(),
            player_state,
            player_holes,
            table_cards,
            active_bets,
            committed,
            previous_bet: 0,
            min_raise: BIG_BLIND,
            turn_queue: VecDeque::new(),
        });

        let first_to_act = if participants.len() == 2 {
            // Heads-up: the button posts the small blind and acts first.
            self.post_blind(participants[0], SMALL_BLIND, &mut events);
            self.post_blind(participants[1], BIG_BLIND, &mut events);
            participants[0]
        } else {
            let count = participants.len();
            self.post_blind(participants[1 % count], SMALL_BLIND, &mut events);
            self.post_blind(participants[2 % count], BIG_BLIND, &mut events);
            participants[3 % count]
        };
        if let Some(hand) = self.hand.as_mut() {
            hand.turn_queue = build_turn_queue(&hand.participants, &hand.player_state, first_to_act);
        }

        self.prune_turn_queue();
        match self.current_turn() {
            Some(next) => events.push(Event::TurnAdvanced { next }),
            None => {
                // Everyone went all-in on the blinds.
                self.reveal_remaining_board(&mut events);
                self.distribute_side_pots(&mut events);
                self.hand = None;
            }
        }
        Ok(events)
    }

    /// Apply one player action and resolve its consequences: fold-outs,
    /// street completion, showdown, or just passing the turn.
    pub fn on_action(&mut self, action: Action) -> Result<Vec<Event>, GameError> {
        if self.hand.is_none() {
            return Err(GameError::InvalidAction);
        }
        if !self.players.is_sat(action.id()) {
            return Err(GameError::NoSuchPlayer);
        }
        self.prune_turn_queue();
        let Some(front) = self.current_turn() else {
            return Err(GameError::InvalidAction);
        };
        if action.id() != front {
            return Err(GameError::OutOfTurn);
        }
        let mut events = match action {
            Action::Bet { id, amount } => self.handle_bet(id, amount)?,
            Action::Fold { id } => self.handle_fold(id),
            Action::Timeout { id } => self.handle_timeout(id)?,
        };
        self.resolve_after_action(&mut events)?;
        Ok(events)
    }

    /// A check is a bet of zero, a call matches the previous bet, and a
    /// raise must clear the minimum raise increment. Betting more chips
    /// than the purse holds clamps to the purse and goes all-in.
    fn handle_bet(&mut self, id: PlayerId, amount: Chips) -> Result<Vec<Event>, GameError> {
        let purse = self.players.get_chips(id);
        let bet = {
            let Some(hand) = self.hand.as_mut() else {
                return Err(GameError::InvalidAction);
            };
            let previous = hand.previous_bet;
            let current = hand.active_bets.get(&id).copied().unwrap_or(0);
            let is_all_in = amount > 0 && amount >= purse;
            let bet = if is_all_in { purse } else { amount };
            let total = current + bet;

            if bet == 0 && current < previous {
                // Cannot check while facing a bet.
                return Err(GameError::BetTooLow);
            }
            if bet > 0 {
                if total < previous && !is_all_in {
                    return Err(GameError::BetTooLow);
                }
                if total > previous && total - previous < hand.min_raise && !is_all_in {
                    return Err(GameError::BetTooLow);
                }
            }
            // All-in short raises stay below min_raise and do not
            // re-open the action.
            let is_raise = bet > 0 && total > previous && total - previous >= hand.min_raise;

            hand.turn_queue.pop_front();
            if is_all_in {
                hand.player_state.insert(id, PlayerState::AllIn);
            }
            *hand.committed.entry(id).or_insert(0) += bet;
            hand.previous_bet = previous.max(total);
            hand.active_bets.insert(id, total);
            if is_raise {
                hand.min_raise = total - previous;
                // Everyone still active owes a response to the raise,
                // except the raiser themselves.
                let count = hand.participants.len();
                if let Some(at) = hand.participants.iter().position(|&p| p == id) {
                    let reopened: VecDeque<PlayerId> = (1..count)
                        .map(|step| hand.participants[(at + step) % count])
                        .filter(|p| hand.player_state.get(p) == Some(&PlayerState::Active))
                        .collect();
                    hand.turn_queue = reopened;
                }
            }
            bet
        };
        self.players.place_bet(id, bet);
        Ok(vec![Event::BetPlaced { who: id, amount: bet }])
    }

    fn handle_fold(&mut self, id: PlayerId) -> Vec<Event> {
        if let Some(hand) = self.hand.as_mut() {
            hand.turn_queue.pop_front();
            hand.player_state.insert(id, PlayerState::Folded);
            // Committed chips stay behind for the side pots.
            hand.active_bets.remove(&id);
        }
        Vec::new()
    }

    /// A stalled player folds when facing a bet and checks otherwise.
    fn handle_timeout(&mut self, id: PlayerId) -> Result<Vec<Event>, GameError> {
        let facing_bet = self.hand.as_ref().is_some_and(|hand| {
            hand.active_bets.get(&id).copied().unwrap_or(0) < hand.previous_bet
        });
        if facing_bet {
            Ok(self.handle_fold(id))
        } else {
            self.handle_bet(id, 0)
        }
    }

    /// Runs after every accepted action.
    fn resolve_after_action(&mut self, events: &mut Vec<Event>) -> Result<(), GameError> {
        self.prune_turn_queue();
        let remaining = self.players_in_hand();
        if remaining.len() == 1 {
            // Everyone else folded or left; no showdown.
            let total = self.total_committed();
            self.award_chips(remaining[0], total, events);
            self.hand = None;
            return Ok(());
        }
        let queue_empty = self
            .hand
            .as_ref()
            .map_or(true, |hand| hand.turn_queue.is_empty());
        if !queue_empty {
            self.advance_turn(events);
            return Ok(());
        }
        let any_active = self.hand.as_ref().is_some_and(|hand| {
            remaining
                .iter()
                .any(|id| hand.player_state.get(id) == Some(&PlayerState::Active))
        });
        if !any_active {
            self.reveal_remaining_board(events);
            self.distribute_side_pots(events);
            self.hand = None;
            return Ok(());
        }
        if self.hand.as_ref().is_some_and(|h| h.phase == Phase::River) {
            self.distribute_side_pots(events);
            self.hand = None;
            return Ok(());
        }
        let advance = self.handle_new_street()?;
        events.extend(advance);
        Ok(())
    }

    /// Move to the next street: reveal its cards, reset the per-street
    /// bet tracking, and queue the active players from the seat after
    /// the button.
    fn handle_new_street(&mut self) -> Result<Vec<Event>, GameError> {
        let mut events = Vec::new();
        let button = {
            let Some(hand) = self.hand.as_mut() else {
                return Err(GameError::InvalidAction);
            };
            let next = hand.phase.next_street().ok_or(GameError::InvalidAction)?;
            hand.phase = next;
            events.push(Event::PhaseAdvanced { next });
            if let Some(deal) = street_deal_event(hand, next) {
                events.push(deal);
            }
            for bet in hand.active_bets.values_mut() {
                *bet = 0;
            }
            hand.previous_bet = 0;
            hand.min_raise = BIG_BLIND;
            hand.button
        };
        let start = self.first_active_after(button);
        if let Some(hand) = self.hand.as_mut() {
            hand.turn_queue = match start {
                Some(start) => build_turn_queue(&hand.participants, &hand.player_state, start),
                None => VecDeque::new(),
            };
        }
        self.prune_turn_queue();
        if let Some(next) = self.current_turn() {
            events.push(Event::TurnAdvanced { next });
        }
        Ok(events)
    }

    /// Post a forced bet. A player with an empty purse is marked all-in
    /// without posting; a short purse posts what it can and goes all-in.
    fn post_blind(&mut self, id: PlayerId, amount: Chips, events: &mut Vec<Event>) {
        let purse = self.players.get_chips(id);
        let blind = {
            let Some(hand) = self.hand.as_mut() else {
                return;
            };
            if purse == 0 {
                hand.player_state.insert(id, PlayerState::AllIn);
                return;
            }
            let blind = amount.min(purse);
            if blind >= purse {
                hand.player_state.insert(id, PlayerState::AllIn);
            }
            *hand.committed.entry(id).or_insert(0) += blind;
            let street_total = {
                let entry = hand.active_bets.entry(id).or_insert(0);
                *entry += blind;
                *entry
            };
            hand.previous_bet = hand.previous_bet.max(street_total);
            blind
        };
        self.players.place_bet(id, blind);
        events.push(Event::BetPlaced {
            who: id,
            amount: blind,
        });
    }

    /// Drop non-active players from the front of the turn queue.
    /// Idempotent.
    fn prune_turn_queue(&mut self) {
        let Some(hand) = self.hand.as_mut() else {
            return;
        };
        while let Some(&front) = hand.turn_queue.front() {
            if hand.player_state.get(&front) == Some(&PlayerState::Active) {
                break;
            }
            hand.turn_queue.pop_front();
        }
    }

    /// First active participant strictly after `start`, clockwise.
    fn first_active_after(&self, start: PlayerId) -> Option<PlayerId> {
        let hand = self.hand.as_ref()?;
        let at = hand.participants.iter().position(|&p| p == start)?;
        let count = hand.participants.len();
        (1..=count)
            .map(|step| hand.participants[(at + step) % count])
            .find(|p| hand.player_state.get(p) == Some(&PlayerState::Active))
    }

    /// Participants still contesting the pot: active or all-in.
    fn players_in_hand(&self) -> Vec<PlayerId> {
        let Some(hand) = self.hand.as_ref() else {
            return Vec::new();
        };
        hand.participants
            .iter()
            .copied()
            .filter(|id| {
                matches!(
                    hand.player_state.get(id),
                    Some(PlayerState::Active | PlayerState::AllIn)
                )
            })
            .collect()
    }

    /// Walk the remaining streets to the river, revealing cards as if
    /// everyone checked. Used when no further betting is possible.
    fn reveal_remaining_board(&mut self, events: &mut Vec<Event>) {
        while let Some(hand) = self.hand.as_mut() {
            if hand.phase == Phase::River {
                break;
            }
            let Some(next) = hand.phase.next_street() else {
                break;
            };
            hand.phase = next;
            events.push(Event::PhaseAdvanced { next });
            if let Some(deal) = street_deal_event(hand, next) {
                events.push(deal);
            }
        }
    }

    fn advance_turn(&mut self, events: &mut Vec<Event>) {
        self.prune_turn_queue();
        if let Some(next) = self.current_turn() {
            events.push(Event::TurnAdvanced { next });
        }
    }

    fn hand_rank(&self, id: PlayerId) -> Option<HandRank> {
        let hand = self.hand.as_ref()?;
        let hole = hand.player_holes.get(&id)?;
        let mut cards = [hole[0]; HOLE_SIZE + BOARD_SIZE];
        cards[1] = hole[1];
        cards[HOLE_SIZE..].copy_from_slice(&hand.table_cards);
        Some(rank_best_of_seven(&cards))
    }

    fn award_chips(&mut self, id: PlayerId, amount: Chips, events: &mut Vec<Event>) {
        if amount == 0 {
            return;
        }
        self.players.award_chips(id, amount);
        events.push(Event::WonPot { who: id, amount });
    }

    /// Rank every eligible hand per pot and pay the winners. Ties split
    /// the pot; odd chips go clockwise from the seat after the button.
    fn distribute_side_pots(&mut self, events: &mut Vec<Event>) {
        let pots = match self.hand.as_ref() {
            Some(hand) => build_side_pots(&hand.committed, &hand.player_state),
            None => return,
        };
        for pot in pots {
            let mut best = HandRank::MAX;
            let mut winners: Vec<PlayerId> = Vec::new();
            for &id in &pot.eligible {
                let Some(rank) = self.hand_rank(id) else {
                    continue;
                };
                if winners.is_empty() || rank < best {
                    winners.clear();
                    winners.push(id);
                    best = rank;
                } else if rank == best {
                    winners.push(id);
                }
            }
            if winners.is_empty() {
                continue;
            }
            let ordered: Vec<PlayerId> = self
                .hand
                .as_ref()
                .map(|hand| {
                    hand.participants
                        .iter()
                        .copied()
                        .filter(|id| winners.contains(id))
                        .collect()
                })
                .unwrap_or_default();
            for (id, payout) in split_pot(pot.amount, &ordered) {
                self.award_chips(id, payout, events);
            }
        }
    }

    fn first_seated(&self) -> Result<PlayerId, GameError> {
        self.players
            .get_first_player()
            .map_err(|_| GameError::NotEnoughPlayers)
    }
}

/// Queue of active players clockwise over `participants`, starting at
/// `start` inclusive.
fn build_turn_queue(
    participants: &[PlayerId],
    player_state: &HashMap<PlayerId, PlayerState>,
    start: PlayerId,
) -> VecDeque<PlayerId> {
    let Some(at) = participants.iter().position(|&p| p == start) else {
        return VecDeque::new();
    };
    let count = participants.len();
    (0..count)
        .map(|step| participants[(at + step) % count])
        .filter(|p| player_state.get(p) == Some(&PlayerState::Active))
        .collect()
}

fn street_deal_event(hand: &HandState, next: Phase) -> Option<Event> {
    match next {
        Phase::Flop => Some(Event::DealtFlop {
            flop: [
                hand.table_cards[0],
                hand.table_cards[1],
                hand.table_cards[2],
            ],
        }),
        Phase::Turn => Some(Event::DealtStreet {
            street: hand.table_cards[FLOP_SIZE],
        }),
        Phase::River => Some(Event::DealtStreet {
            street: hand.table_cards[FLOP_SIZE + 1],
        }),
        _ => None,
    }
}

/// Layer the committed chips into disjoint pots. Each distinct
/// contribution level closes a layer covering everyone still at or
/// above it; only contributors still contesting the hand are eligible
/// to win a layer.
#[must_use]
pub fn build_side_pots(
    committed: &HashMap<PlayerId, Chips>,
    player_state: &HashMap<PlayerId, PlayerState>,
) -> Vec<SidePot> {
    let mut contributions: Vec<(PlayerId, Chips)> = committed
        .iter()
        .filter(|&(_, &amount)| amount > 0)
        .map(|(&id, &amount)| (id, amount))
        .collect();
    if contributions.is_empty() {
        return Vec::new();
    }
    contributions.sort_by_key(|&(id, amount)| (amount, id));

    let mut remaining: Vec<PlayerId> = contributions.iter().map(|&(id, _)| id).collect();
    let mut pots = Vec::new();
    let mut previous = 0;
    let mut at = 0;
    while at < contributions.len() {
        let level = contributions[at].1;
        if level > previous {
            let layer = (level - previous) * remaining.len() as Chips;
            let eligible: Vec<PlayerId> = remaining
                .iter()
                .copied()
                .filter(|id| {
                    matches!(
                        player_state.get(id),
                        Some(PlayerState::Active | PlayerState::AllIn)
                    )
                })
                .collect();
            if layer > 0 {
                pots.push(SidePot {
                    amount: layer,
                    eligible,
                });
            }
            previous = level;
        }
        while at < contributions.len() && contributions[at].1 == level {
            let exhausted = contributions[at].0;
            remaining.retain(|&id| id != exhausted);
            at += 1;
        }
    }
    pots
}

/// Split `amount` between winners listed in seat order from the seat
/// after the button. Odd chips are handed out one at a time from the
/// front of that order.
#[must_use]
pub fn split_pot(amount: Chips, winners_in_seat_order: &[PlayerId]) -> Vec<(PlayerId, Chips)> {
    if winners_in_seat_order.is_empty() {
        return Vec::new();
    }
    let share = amount / winners_in_seat_order.len() as Chips;
    let mut remainder = amount % winners_in_seat_order.len() as Chips;
    winners_in_seat_order
        .iter()
        .map(|&id| {
            let mut payout = share;
            if remainder > 0 {
                payout += 1;
                remainder -= 1;
            }
            (id, payout)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::super::constants::BUY_IN;
    use super::*;

    fn table_for(n: u64) -> Table {
        let mut table = Table::new(StdRng::seed_from_u64(0));
        for id in 1..=n {
            table.add_player(id).unwrap();
        }
        table
    }

    #[test]
    fn start_requires_two_players() {
        let mut table = table_for(1);
        assert_eq!(
            table.handle_new_hand(),
            Err(GameError::NotEnoughPlayers)
        );
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut table = table_for(2);
        assert!(table.handle_new_hand().is_ok());
        assert_eq!(table.handle_new_hand(), Err(GameError::HandInPlay));
    }

    #[test]
    fn starts_and_deals_to_each_participant() {
        let mut table = table_for(3);
        let events = table.handle_new_hand().unwrap();

        assert_eq!(events[0], Event::HandStarted);
        assert_eq!(
            events[1],
            Event::PhaseAdvanced {
                next: Phase::Preflop
            }
        );
        let holes: Vec<PlayerId> = events
            .iter()
            .filter_map(|event| match event {
                Event::DealtHole { who, .. } => Some(*who),
                _ => None,
            })
            .collect();
        assert_eq!(holes, vec![1, 2, 3]);
        assert!(table.hand_in_progress());
    }

    #[test]
    fn action_without_hand_is_invalid() {
        let mut table = table_for(2);
        assert_eq!(
            table.on_action(Action::Bet { id: 1, amount: 0 }),
            Err(GameError::InvalidAction)
        );
    }

    #[test]
    fn unknown_player_cannot_act() {
        let mut table = table_for(2);
        table.handle_new_hand().unwrap();
        assert_eq!(
            table.on_action(Action::Fold { id: 99 }),
            Err(GameError::NoSuchPlayer)
        );
    }

    #[test]
    fn acting_out_of_turn_is_rejected() {
        let mut table = table_for(2);
        table.handle_new_hand().unwrap();
        // Heads-up: player 1 is the button and acts first.
        assert_eq!(
            table.on_action(Action::Bet { id: 2, amount: 0 }),
            Err(GameError::OutOfTurn)
        );
    }

    #[test]
    fn cannot_check_facing_a_bet() {
        let mut table = table_for(2);
        table.handle_new_hand().unwrap();
        assert_eq!(
            table.on_action(Action::Bet { id: 1, amount: 0 }),
            Err(GameError::BetTooLow)
        );
    }

    #[test]
    fn undersized_raise_is_rejected() {
        let mut table = table_for(2);
        table.handle_new_hand().unwrap();
        // Small blind holds 5 in; a total of 15 raises by 5, below the
        // big-blind minimum.
        assert_eq!(
            table.on_action(Action::Bet { id: 1, amount: 10 }),
            Err(GameError::BetTooLow)
        );
    }

    #[test]
    fn chip_conservation_across_a_hand() {
        let mut table = table_for(2);
        table.handle_new_hand().unwrap();
        assert_eq!(
            table.players().total_chips() + table.total_committed(),
            2 * BUY_IN
        );

        table.on_action(Action::Timeout { id: 1 }).unwrap();
        assert!(!table.hand_in_progress());
        assert_eq!(table.players().total_chips(), 2 * BUY_IN);
    }

    #[test]
    fn side_pots_layer_by_contribution() {
        let committed = HashMap::from([(1, 50), (2, 100), (3, 100)]);
        let state = HashMap::from([
            (1, PlayerState::AllIn),
            (2, PlayerState::Active),
            (3, PlayerState::Active),
        ]);
        let pots = build_side_pots(&committed, &state);
        assert_eq!(pots.len(), 2);
        assert_eq!(pots[0].amount, 150);
        assert_eq!(pots[0].eligible, vec![1, 2, 3]);
        assert_eq!(pots[1].amount, 100);
        assert_eq!(pots[1].eligible, vec![2, 3]);
    }

    #[test]
    fn folded_players_fund_pots_they_cannot_win() {
        let committed = HashMap::from([(1, 60), (2, 100), (3, 100)]);
        let state = HashMap::from([
            (1, PlayerState::Folded),
            (2, PlayerState::Active),
            (3, PlayerState::Active),
        ]);
        let pots = build_side_pots(&committed, &state);
        let total: Chips = pots.iter().map(|pot| pot.amount).sum();
        assert_eq!(total, 260);
        for pot in &pots {
            assert!(!pot.eligible.contains(&1));
        }
    }

    #[test]
    fn split_pot_hands_odd_chips_clockwise() {
        assert_eq!(split_pot(101, &[4, 7]), vec![(4, 51), (7, 50)]);
        assert_eq!(split_pot(100, &[4, 7]), vec![(4, 50), (7, 50)]);
        assert_eq!(split_pot(11, &[2, 5, 9]), vec![(2, 4), (5, 4), (9, 3)]);
        assert!(split_pot(10, &[]).is_empty());
    }
}
