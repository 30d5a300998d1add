//! Review cards this process has already taken a decision on.
//!
//! A press on a card first claims it here. The claim is kept once the
//! decision went through, so a second press carrying the card's old text
//! (sent before the banner edit landed) is still recognised as decided.
//! A claim that is dropped without being settled is released and the card
//! can be decided again.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::gateway::MessageRef;

/// How many decided cards are remembered before the oldest are forgotten.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Why a card could not be claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Busy {
    /// Another press on the card is being handled.
    InFlight,
    /// A decision on the card already went through.
    Decided,
}

#[derive(Debug, Clone, Copy)]
struct CardClaim {
    seq: u64,
    settled: bool,
}

pub struct DecisionLedger {
    cards: DashMap<MessageRef, CardClaim>,
    next_seq: AtomicU64,
    capacity: usize,
}

impl DecisionLedger {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cards: DashMap::new(),
            next_seq: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    pub fn claim(&self, card: MessageRef) -> Result<Claim<'_>, Busy> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        match self.cards.entry(card) {
            Entry::Occupied(entry) if entry.get().settled => return Err(Busy::Decided),
            Entry::Occupied(_) => return Err(Busy::InFlight),
            Entry::Vacant(entry) => {
                entry.insert(CardClaim { seq, settled: false });
            }
        }

        self.evict(seq);
        Ok(Claim {
            ledger: self,
            card,
            settled: false,
        })
    }

    pub fn is_decided(&self, card: &MessageRef) -> bool {
        self.cards.get(card).is_some_and(|claim| claim.settled)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Drops the older half of the settled cards once over capacity.
    /// Cards still being decided are never evicted.
    fn evict(&self, newest: u64) {
        if self.cards.len() <= self.capacity {
            return;
        }
        let floor = newest.saturating_sub((self.capacity / 2) as u64);
        self.cards.retain(|_, claim| !claim.settled || claim.seq > floor);
        log::debug!("Decision ledger trimmed to {} cards", self.cards.len());
    }
}

impl Default for DecisionLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// A card held for one decision. Released on drop unless settled.
pub struct Claim<'a> {
    ledger: &'a DecisionLedger,
    card: MessageRef,
    settled: bool,
}

impl Claim<'_> {
    /// Keeps the card marked as decided.
    pub fn settle(mut self) {
        if let Some(mut claim) = self.ledger.cards.get_mut(&self.card) {
            claim.settled = true;
        }
        self.settled = true;
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.ledger.cards.remove(&self.card);
        }
    }
}
