//! Seat management: allocation, the holding pen, ring traversal, and
//! chip purses.
//!
//! Every write to a seat goes through [`PlayerManager`]; callers never
//! index seats directly. Newly added players wait in a holding pen and
//! only receive their buy-in when a hand starts.

use std::collections::{HashMap, VecDeque};

use super::constants::{BUY_IN, MAX_PLAYERS};
use super::entities::{Chips, Player, PlayerId};
use crate::errors::PlayerMgmtError;

#[derive(Debug)]
pub struct PlayerManager {
    seats: Vec<Option<Player>>,
    open_seats: VecDeque<usize>,
    index: HashMap<PlayerId, usize>,
    holding: VecDeque<PlayerId>,
}

impl Default for PlayerManager {
    fn default() -> Self {
        Self {
            seats: vec![None; MAX_PLAYERS],
            open_seats: (0..MAX_PLAYERS).collect(),
            index: HashMap::with_capacity(MAX_PLAYERS),
            holding: VecDeque::new(),
        }
    }
}

impl PlayerManager {
    /// Reserve a seat for `id` and stage them in the holding pen. The
    /// player is not seated and owns no chips until the next hand
    /// starts.
    pub fn add_player(&mut self, id: PlayerId) -> Result<(), PlayerMgmtError> {
        let Some(seat) = self.open_seats.pop_front() else {
            return Err(PlayerMgmtError::NotEnoughSeats);
        };
        self.holding.push_back(id);
        self.index.insert(id, seat);
        Ok(())
    }

    /// Remove `id` immediately, whether held or seated, and return the
    /// seat to the open pool. The table is responsible for any hand
    /// bookkeeping.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<(), PlayerMgmtError> {
        let Some(&seat) = self.index.get(&id) else {
            return Err(PlayerMgmtError::InvalidId);
        };
        if let Some(held) = self.holding.iter().position(|&h| h == id) {
            self.holding.remove(held);
        } else {
            self.seats[seat] = None;
        }
        self.open_seats.push_back(seat);
        self.index.remove(&id);
        Ok(())
    }

    /// Materialise every held player into their reserved seat with a
    /// fresh buy-in. Called only at hand start.
    pub fn seat_held_players(&mut self) {
        while let Some(id) = self.holding.pop_front() {
            if let Some(&seat) = self.index.get(&id) {
                self.seats[seat] = Some(Player::new(id, BUY_IN));
            }
        }
    }

    /// The lowest-indexed occupied seat.
    pub fn get_first_player(&self) -> Result<PlayerId, PlayerMgmtError> {
        self.seats
            .iter()
            .flatten()
            .next()
            .map(|player| player.id)
            .ok_or(PlayerMgmtError::NoPlayers)
    }

    /// The occupant of the lowest-indexed occupied seat strictly after
    /// `p`'s, with wrap-around. Returns `p` when no other seat is
    /// occupied.
    pub fn next_player(&self, p: PlayerId) -> Result<PlayerId, PlayerMgmtError> {
        let Some(&start) = self.index.get(&p) else {
            return Err(PlayerMgmtError::InvalidId);
        };
        let total = self.seats.len();
        for step in 1..=total {
            if let Some(player) = &self.seats[(start + step) % total] {
                return Ok(player.id);
            }
        }
        Ok(p)
    }

    /// Clockwise seat order beginning at `start`, ending just before
    /// wrapping back to `start`. Empty if `start` is not seated.
    pub fn active_cycle_from(&self, start: PlayerId) -> Vec<PlayerId> {
        if !self.is_sat(start) {
            return Vec::new();
        }
        let mut ordered = vec![start];
        let mut current = start;
        while let Ok(next) = self.next_player(current) {
            if next == start {
                break;
            }
            ordered.push(next);
            current = next;
        }
        ordered
    }

    /// Players known to the table: seated or staged in the holding pen.
    pub fn num_players(&self) -> usize {
        self.index.len()
    }

    pub fn seated_count(&self) -> usize {
        self.seats.iter().flatten().count()
    }

    pub fn is_sat(&self, id: PlayerId) -> bool {
        self.index
            .get(&id)
            .is_some_and(|&seat| self.seats[seat].is_some())
    }

    pub fn get_chips(&self, id: PlayerId) -> Chips {
        self.index
            .get(&id)
            .and_then(|&seat| self.seats[seat].as_ref())
            .map_or(0, |player| player.purse)
    }

    /// Caller is responsible for validating `id`.
    pub fn has_enough_chips(&self, id: PlayerId, bet: Chips) -> bool {
        self.get_chips(id) >= bet
    }

    /// Decrement `id`'s purse. Sufficiency is not validated here; the
    /// table clamps bets to the purse to produce all-in semantics.
    pub fn place_bet(&mut self, id: PlayerId, bet: Chips) {
        if let Some(player) = self.seat_mut(id) {
            player.purse = player.purse.saturating_sub(bet);
        }
    }

    pub fn award_chips(&mut self, id: PlayerId, amount: Chips) {
        if let Some(player) = self.seat_mut(id) {
            player.purse += amount;
        }
    }

    /// Sum of all seated purses.
    pub fn total_chips(&self) -> Chips {
        self.seats
            .iter()
            .flatten()
            .map(|player| player.purse)
            .sum()
    }

    fn seat_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        let &seat = self.index.get(&id)?;
        self.seats[seat].as_mut()
    }
}
