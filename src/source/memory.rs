//! In-memory card source for offline use and tests.

use crate::deck::classifier::is_land;
use crate::source::{is_commander_eligible, CardQuery, CardSource};
use crate::types::{normalize_name, Candidate};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Evaluates `CardQuery` structurally over a fixed card list.
#[derive(Debug, Clone, Default)]
pub struct MemoryCardSource {
    cards: Vec<Candidate>,
    prices: HashMap<String, f64>,
    failing_lookups: HashSet<String>,
}

impl MemoryCardSource {
    pub fn new(cards: Vec<Candidate>) -> Self {
        Self {
            cards,
            ..Self::default()
        }
    }

    /// Adds cards to the catalog.
    pub fn with_cards(mut self, cards: impl IntoIterator<Item = Candidate>) -> Self {
        self.cards.extend(cards);
        self
    }

    /// Price returned by `lookup_exact` for a name not in the card list.
    pub fn with_price(mut self, name: &str, price: f64) -> Self {
        self.prices.insert(normalize_name(name), price);
        self
    }

    /// Makes `lookup_exact` fail for a name.
    pub fn with_failing_lookup(mut self, name: &str) -> Self {
        self.failing_lookups.insert(normalize_name(name));
        self
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    fn matches(card: &Candidate, query: &CardQuery) -> bool {
        match query {
            CardQuery::Pool { identity } => {
                card.commander_legal
                    && !is_land(card)
                    && card.color_identity.is_subset_of(*identity)
            }
            CardQuery::CommanderByName { name, lang } => {
                card.commander_legal
                    && is_commander_eligible(card)
                    && card.normalized_name().contains(&normalize_name(name))
                    && lang.as_ref().map_or(true, |l| card.lang.eq_ignore_ascii_case(l))
            }
            CardQuery::PrintingsOf { oracle_id, lang } => {
                card.oracle_id.as_deref() == Some(oracle_id.as_str())
                    && card.lang.eq_ignore_ascii_case(lang)
            }
            CardQuery::RandomCommander { identity } => {
                card.commander_legal
                    && is_commander_eligible(card)
                    && (identity.is_empty() || card.color_identity.is_subset_of(*identity))
            }
        }
    }
}

#[async_trait]
impl CardSource for MemoryCardSource {
    async fn search(&self, query: &CardQuery) -> Result<Vec<Candidate>> {
        let found: Vec<Candidate> = self
            .cards
            .iter()
            .filter(|card| Self::matches(card, query))
            .cloned()
            .collect();
        debug!("Memory search {:?} matched {} cards", query, found.len());
        Ok(found)
    }

    async fn random(&self, query: &CardQuery) -> Result<Option<Candidate>> {
        let matching: Vec<&Candidate> = self
            .cards
            .iter()
            .filter(|card| Self::matches(card, query))
            .collect();
        Ok(matching.choose(&mut rand::thread_rng()).map(|c| (*c).clone()))
    }

    async fn lookup_exact(&self, name: &str) -> Result<Option<Candidate>> {
        let key = normalize_name(name);
        if self.failing_lookups.contains(&key) {
            return Err(anyhow!("lookup of {} failed", name));
        }
        if let Some(card) = self.cards.iter().find(|c| c.normalized_name() == key) {
            return Ok(Some(card.clone()));
        }
        Ok(self.prices.get(&key).map(|price| {
            let mut card = Candidate::new(name, "Land");
            card.price_eur = Some(*price);
            card
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColorSet;

    fn create_test_card(name: &str, type_line: &str, colors: &str) -> Candidate {
        let mut card = Candidate::new(name, type_line);
        card.color_identity = ColorSet::parse(colors);
        card
    }

    fn create_test_source() -> MemoryCardSource {
        MemoryCardSource::new(vec![
            create_test_card("Tatyova, Benthic Druid", "Legendary Creature — Merfolk Druid", "UG"),
            create_test_card("Kenrith, the Returned King", "Legendary Creature — Human Noble", "WUBRG"),
            create_test_card("Rampant Growth", "Sorcery", "G"),
            create_test_card("Lightning Bolt", "Instant", "R"),
            create_test_card("Breeding Pool", "Land — Forest Island", "UG"),
        ])
    }

    #[tokio::test]
    async fn test_pool_query_respects_identity_and_lands() {
        let source = create_test_source();
        let pool = source
            .search(&CardQuery::Pool {
                identity: ColorSet::parse("UG"),
            })
            .await
            .unwrap();
        let names: Vec<&str> = pool.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Tatyova, Benthic Druid", "Rampant Growth"]);
    }

    #[tokio::test]
    async fn test_random_commander_within_identity() {
        let source = create_test_source();
        let query = CardQuery::RandomCommander {
            identity: ColorSet::parse("UG"),
        };
        for _ in 0..10 {
            let commander = source.random(&query).await.unwrap().unwrap();
            assert_eq!(commander.name, "Tatyova, Benthic Druid");
        }

        let any = CardQuery::RandomCommander {
            identity: ColorSet::COLORLESS,
        };
        let commander = source.random(&any).await.unwrap().unwrap();
        assert!(is_commander_eligible(&commander));
    }

    #[tokio::test]
    async fn test_lookup_exact_prices_and_failures() {
        let source = create_test_source()
            .with_price("Command Tower", 0.4)
            .with_failing_lookup("Exotic Orchard");

        let bolt = source.lookup_exact("lightning bolt").await.unwrap();
        assert_eq!(bolt.map(|c| c.name), Some("Lightning Bolt".to_string()));

        let tower = source.lookup_exact("Command Tower").await.unwrap().unwrap();
        assert_eq!(tower.price_eur, Some(0.4));

        assert!(source.lookup_exact("Exotic Orchard").await.is_err());
        assert!(source.lookup_exact("Unknown Card").await.unwrap().is_none());
    }
}
