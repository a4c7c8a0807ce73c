//! Commander resolution.
//!
//! A named commander is resolved by an ordered chain of strategies; the first
//! one that yields a Commander-legal card wins. Strategy errors are logged and
//! treated as "not found" so the chain keeps going.

use crate::deck::types::DeckError;
use crate::source::{is_commander_eligible, CardQuery, CardSource};
use crate::types::{Candidate, ColorSet};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use nonempty::NonEmpty;
use tracing::{debug, info, instrument, warn};

/// One way of turning a user-typed name into a commander card.
#[async_trait]
pub trait CommanderStrategy: Send + Sync {
    /// Short label used in logs.
    fn label(&self) -> &'static str;

    async fn resolve(&self, source: &dyn CardSource, name: &str) -> Result<Option<Candidate>>;
}

fn is_legal_commander(card: &Candidate) -> bool {
    card.commander_legal && is_commander_eligible(card)
}

/// Exact English name lookup.
pub struct ExactName;

#[async_trait]
impl CommanderStrategy for ExactName {
    fn label(&self) -> &'static str {
        "exact name"
    }

    async fn resolve(&self, source: &dyn CardSource, name: &str) -> Result<Option<Candidate>> {
        Ok(source.lookup_exact(name).await?.filter(is_legal_commander))
    }
}

/// Name search in a localized language, then a hop to the English printing
/// of the same oracle card.
pub struct LocalizedPrinting {
    pub lang: String,
}

#[async_trait]
impl CommanderStrategy for LocalizedPrinting {
    fn label(&self) -> &'static str {
        "localized printing"
    }

    async fn resolve(&self, source: &dyn CardSource, name: &str) -> Result<Option<Candidate>> {
        let localized = source
            .search(&CardQuery::CommanderByName {
                name: name.to_string(),
                lang: Some(self.lang.clone()),
            })
            .await?;
        let Some(found) = localized.into_iter().next() else {
            return Ok(None);
        };

        let english = match &found.oracle_id {
            Some(oracle_id) => source
                .search(&CardQuery::PrintingsOf {
                    oracle_id: oracle_id.clone(),
                    lang: "en".to_string(),
                })
                .await?
                .into_iter()
                .next(),
            None => None,
        };

        let best = english.unwrap_or(found);
        debug!("Localized name {:?} maps to {}", name, best.name);
        Ok(Some(best).filter(is_legal_commander))
    }
}

/// Loose name search over all commander-eligible cards.
pub struct GenericSearch;

#[async_trait]
impl CommanderStrategy for GenericSearch {
    fn label(&self) -> &'static str {
        "generic search"
    }

    async fn resolve(&self, source: &dyn CardSource, name: &str) -> Result<Option<Candidate>> {
        let found = source
            .search(&CardQuery::CommanderByName {
                name: name.to_string(),
                lang: None,
            })
            .await?;
        Ok(found.into_iter().find(is_legal_commander))
    }
}

/// Ordered, non-empty strategy chain.
pub struct CommanderResolver {
    strategies: NonEmpty<Box<dyn CommanderStrategy>>,
}

impl CommanderResolver {
    /// Exact name, then localized printing, then generic search.
    pub fn standard(localized_lang: &str) -> Self {
        let mut strategies = NonEmpty::new(Box::new(ExactName) as Box<dyn CommanderStrategy>);
        strategies.push(Box::new(LocalizedPrinting {
            lang: localized_lang.to_string(),
        }));
        strategies.push(Box::new(GenericSearch));
        Self { strategies }
    }

    pub fn from_strategies(strategies: Vec<Box<dyn CommanderStrategy>>) -> Result<Self> {
        let strategies = NonEmpty::from_vec(strategies)
            .ok_or_else(|| anyhow!("commander strategy chain cannot be empty"))?;
        Ok(Self { strategies })
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.label()).collect()
    }

    /// Runs the chain until a strategy yields a legal commander.
    #[instrument(skip(self, source))]
    pub async fn resolve(&self, source: &dyn CardSource, name: &str) -> Result<Candidate, DeckError> {
        for strategy in self.strategies.iter() {
            match strategy.resolve(source, name).await {
                Ok(Some(card)) => {
                    info!("Resolved commander {:?} via {}: {}", name, strategy.label(), card.name);
                    return Ok(card);
                }
                Ok(None) => debug!("Strategy {} found nothing for {:?}", strategy.label(), name),
                Err(e) => warn!("Strategy {} failed for {:?}: {:#}", strategy.label(), name, e),
            }
        }
        Err(DeckError::CommanderResolution {
            query: name.to_string(),
        })
    }
}

/// Draws a random legal commander inside `identity` (empty means any).
#[instrument(skip(source))]
pub async fn random_commander(
    source: &dyn CardSource,
    identity: ColorSet,
) -> Result<Candidate, DeckError> {
    let query = format!("random commander within {{{}}}", identity);
    let drawn = match source.random(&CardQuery::RandomCommander { identity }).await {
        Ok(drawn) => drawn.filter(is_legal_commander),
        Err(e) => {
            warn!("Random commander query failed: {:#}", e);
            None
        }
    };

    match drawn {
        Some(card) => {
            info!("Random commander: {}", card.name);
            Ok(card)
        }
        None => Err(DeckError::CommanderResolution { query }),
    }
}
