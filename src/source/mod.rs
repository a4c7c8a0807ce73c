//! Card sources - the collaborator the pipeline queries for commanders,
//! candidate pools and staple prices.
//!
//! Queries are typed (`CardQuery`) so that each source renders or evaluates
//! them in its own way; the pipeline never builds search strings itself.

pub mod memory;
pub mod scryfall;

use crate::types::{Candidate, ColorSet};
use anyhow::Result;
use async_trait::async_trait;

pub use memory::MemoryCardSource;
pub use scryfall::{ScryfallConfig, ScryfallSource};

/// A typed card search.
#[derive(Debug, Clone, PartialEq)]
pub enum CardQuery {
    /// Nonland, Commander-legal cards within a color identity
    Pool { identity: ColorSet },
    /// Commander-eligible cards whose name contains `name`, optionally in one language
    CommanderByName { name: String, lang: Option<String> },
    /// Printings sharing an oracle id, in one language
    PrintingsOf { oracle_id: String, lang: String },
    /// Any Commander-eligible card within an identity (colorless means any)
    RandomCommander { identity: ColorSet },
}

/// Contract for card lookups. Implementations own caching, retries and rate
/// limiting; callers treat every call as possibly slow.
#[async_trait]
pub trait CardSource: Send + Sync {
    /// All cards matching a query, in the source's relevance order.
    async fn search(&self, query: &CardQuery) -> Result<Vec<Candidate>>;

    /// One random card matching a query, `None` when nothing matches.
    async fn random(&self, query: &CardQuery) -> Result<Option<Candidate>>;

    /// The card with exactly this name, `None` when unknown.
    async fn lookup_exact(&self, name: &str) -> Result<Option<Candidate>>;
}

/// Legendary creatures, backgrounds and planeswalkers that say they can lead a deck.
pub fn is_commander_eligible(candidate: &Candidate) -> bool {
    let type_line = candidate.type_line.to_lowercase();
    let text = candidate.oracle_text.to_lowercase();
    (type_line.contains("legendary") && type_line.contains("creature"))
        || type_line.contains("background")
        || text.contains("can be your commander")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commander_eligibility() {
        let creature = Candidate::new("Atraxa", "Legendary Creature — Phyrexian Angel Horror");
        assert!(is_commander_eligible(&creature));

        let mut walker = Candidate::new("Teferi, Temporal Archmage", "Legendary Planeswalker — Teferi");
        assert!(!is_commander_eligible(&walker));
        walker.oracle_text = "Teferi, Temporal Archmage can be your commander.".to_string();
        assert!(is_commander_eligible(&walker));

        let background = Candidate::new("Raised by Giants", "Legendary Enchantment — Background");
        assert!(is_commander_eligible(&background));

        let bear = Candidate::new("Grizzly Bears", "Creature — Bear");
        assert!(!is_commander_eligible(&bear));
    }
}
