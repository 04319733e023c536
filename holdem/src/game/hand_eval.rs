//! Seven-card hand strength evaluation.
//!
//! [`rank_best_of_seven`] collapses a player's two hole cards and the
//! five board cards into a single scalar where a LOWER value is a
//! STRONGER hand. Ranks are only ever compared against each other; the
//! absolute values carry no meaning.
//!
//! The evaluator works from rank counts and per-suit bitmasks rather
//! than enumerating five-card combinations.

use super::entities::Card;

/// Opaque total order over hands. Lower is stronger.
pub type HandRank = u64;

const STRAIGHT_FLUSH: u64 = 0;
const FOUR_OF_A_KIND: u64 = 1;
const FULL_HOUSE: u64 = 2;
const FLUSH: u64 = 3;
const STRAIGHT: u64 = 4;
const THREE_OF_A_KIND: u64 = 5;
const TWO_PAIR: u64 = 6;
const ONE_PAIR: u64 = 7;
const HIGH_CARD: u64 = 8;

/// Rank a player's best five-card hand out of their hole cards plus the
/// board.
#[must_use]
pub fn rank_best_of_seven(cards: &[Card; 7]) -> HandRank {
    evaluate(cards)
}

/// Rank the best five-card hand found within `cards`. Intended for
/// five to seven cards.
#[must_use]
pub fn evaluate(cards: &[Card]) -> HandRank {
    let mut rank_counts = [0u8; 13];
    let mut suit_counts = [0u8; 4];
    let mut suit_masks = [0u16; 4];
    for card in cards {
        rank_counts[card.rank as usize] += 1;
        suit_counts[card.suit as usize] += 1;
        suit_masks[card.suit as usize] |= 1 << card.rank as usize;
    }
    let rank_mask = suit_masks.iter().fold(0, |acc, mask| acc | mask);
    let flush_suit = suit_counts.iter().position(|&n| n >= 5);

    if let Some(suit) = flush_suit {
        if let Some(high) = straight_high(suit_masks[suit]) {
            return score(STRAIGHT_FLUSH, &[high]);
        }
    }
    if let Some(quad) = highest_with_count(&rank_counts, 4) {
        let kickers = top_ranks(&rank_counts, &[quad], 1);
        return score(FOUR_OF_A_KIND, &[quad, kickers[0]]);
    }
    if let Some(trips) = highest_with_count(&rank_counts, 3) {
        if let Some(pair) = highest_pair_excluding(&rank_counts, trips) {
            return score(FULL_HOUSE, &[trips, pair]);
        }
    }
    if let Some(suit) = flush_suit {
        let tops = top_ranks_of_mask(suit_masks[suit], 5);
        return score(FLUSH, &tops);
    }
    if let Some(high) = straight_high(rank_mask) {
        return score(STRAIGHT, &[high]);
    }
    if let Some(trips) = highest_with_count(&rank_counts, 3) {
        let kickers = top_ranks(&rank_counts, &[trips], 2);
        return score(THREE_OF_A_KIND, &[trips, kickers[0], kickers[1]]);
    }
    let pairs = pairs_descending(&rank_counts);
    match pairs.as_slice() {
        [hi, lo, ..] => {
            let kickers = top_ranks(&rank_counts, &pairs[..2], 1);
            score(TWO_PAIR, &[*hi, *lo, kickers[0]])
        }
        [pair] => {
            let kickers = top_ranks(&rank_counts, &pairs, 3);
            score(ONE_PAIR, &[*pair, kickers[0], kickers[1], kickers[2]])
        }
        [] => {
            let tops = top_ranks(&rank_counts, &[], 5);
            score(HIGH_CARD, &tops)
        }
    }
}

/// Pack a category and its tiebreak ranks (most significant first,
/// each `0..=12` where 12 is an ace) so that the total order holds:
/// stronger category and higher tiebreaks both shrink the score.
fn score(category: u64, tiebreaks: &[u64]) -> HandRank {
    let mut packed = category;
    for i in 0..5 {
        let rank = tiebreaks.get(i).copied().unwrap_or(12);
        packed = (packed << 4) | (12 - rank);
    }
    packed
}

/// Highest rank forming a five-long run in `mask`, the wheel included.
fn straight_high(mask: u16) -> Option<u64> {
    for high in (4..=12u64).rev() {
        let window = 0b1_1111 << (high - 4);
        if mask & window == window {
            return Some(high);
        }
    }
    const WHEEL: u16 = (1 << 12) | 0b1111;
    if mask & WHEEL == WHEEL {
        return Some(3);
    }
    None
}

fn highest_with_count(rank_counts: &[u8; 13], count: u8) -> Option<u64> {
    (0..13u64)
        .rev()
        .find(|&rank| rank_counts[rank as usize] >= count)
}

/// Highest rank other than `exclude` that can fill out a full house.
fn highest_pair_excluding(rank_counts: &[u8; 13], exclude: u64) -> Option<u64> {
    (0..13u64)
        .rev()
        .filter(|&rank| rank != exclude)
        .find(|&rank| rank_counts[rank as usize] >= 2)
}

fn pairs_descending(rank_counts: &[u8; 13]) -> Vec<u64> {
    (0..13u64)
        .rev()
        .filter(|&rank| rank_counts[rank as usize] >= 2)
        .collect()
}

/// The `take` highest ranks present in the hand, excluding the given
/// ranks. Each rank counts once, so these are kickers.
fn top_ranks(rank_counts: &[u8; 13], exclude: &[u64], take: usize) -> Vec<u64> {
    (0..13u64)
        .rev()
        .filter(|&rank| rank_counts[rank as usize] > 0 && !exclude.contains(&rank))
        .take(take)
        .collect()
}

fn top_ranks_of_mask(mask: u16, take: usize) -> Vec<u64> {
    (0..13u64)
        .rev()
        .filter(|&rank| mask & (1 << rank) != 0)
        .take(take)
        .collect()
}
