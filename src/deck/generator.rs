//! The `generate` entry point.
//!
//! resolve commander -> fetch pool -> score and rank -> allocate ->
//! manabase -> finalize. The only suspension points are card-source calls.

use crate::collection::Inventory;
use crate::deck::allocator::{AllocationConstraints, Allocator, MANA_ROCK_CAP};
use crate::deck::classifier::role_of;
use crate::deck::commander::{random_commander, CommanderResolver};
use crate::deck::finalizer::{finalize, FinalizeOptions};
use crate::deck::manabase::build_manabase;
use crate::deck::scorer::DeckScorer;
use crate::deck::types::{CommanderMode, DeckError, DeckRequest, GeneratedDeck, RoleCounts};
use crate::source::{CardQuery, CardSource};
use crate::types::{Candidate, Deck};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, instrument};

/// Progress callback: percentage and a short stage label.
pub type Progress<'a> = &'a (dyn Fn(u8, &str) + Send + Sync);

/// Progress sink that ignores every update.
pub fn no_progress(_percent: u8, _stage: &str) {}

/// Deck generator bound to a card source.
#[derive(Clone)]
pub struct DeckGenerator {
    source: Arc<dyn CardSource>,
}

impl DeckGenerator {
    pub fn new(source: Arc<dyn CardSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn CardSource> {
        &self.source
    }

    /// Builds one deck. Either a complete 99-card deck or an error, never a
    /// partial result.
    #[instrument(skip_all, fields(commander = ?request.commander, lands = request.land_count()))]
    pub async fn generate(
        &self,
        request: &DeckRequest,
        inventory: &Inventory,
        progress: Progress<'_>,
    ) -> Result<GeneratedDeck, DeckError> {
        let source = self.source.as_ref();

        progress(5, "Resolving commander");
        let commander = match &request.commander {
            CommanderMode::Select(name) => {
                CommanderResolver::standard(&request.localized_lang)
                    .resolve(source, name)
                    .await?
            }
            CommanderMode::Random => random_commander(source, request.desired_identity).await?,
        };
        let identity = commander.color_identity;

        progress(20, "Fetching candidate pool");
        let pool = source
            .search(&CardQuery::Pool { identity })
            .await
            .with_context(|| format!("Failed to fetch candidate pool for {}", commander.name))?;
        let commander_name = commander.normalized_name();
        let pool: Vec<Candidate> = pool
            .into_iter()
            .filter(|card| card.normalized_name() != commander_name)
            .collect();
        info!("Fetched {} pool candidates within {{{}}}", pool.len(), identity);

        progress(35, "Scoring candidates");
        let scorer = DeckScorer::new(&request.weights, inventory);
        let ranked = scorer.rank_pool(pool);

        progress(55, "Allocating nonlands");
        let constraints = AllocationConstraints {
            nonland_target: request.nonland_target(),
            targets: &request.targets,
            type_limits: &request.type_limits,
            curve: &request.curve,
            deck_budget: request.weights.deck_budget,
            mana_rock_cap: MANA_ROCK_CAP,
        };
        let allocation = Allocator::new(&ranked, constraints).allocate();

        progress(72, "Building manabase");
        let manabase = build_manabase(
            source,
            identity,
            request.land_count(),
            request.weights.deck_budget,
        )
        .await;

        progress(85, "Finalizing deck");
        let options = FinalizeOptions::from_request(request, identity);
        let deck = finalize(commander, allocation, manabase, &options)?;
        let role_counts = count_roles(&deck);

        info!(
            "Generated deck for {}: {} cards, roles {:?}",
            deck.commander.name,
            deck.main_deck_size(),
            role_counts
        );
        progress(100, "Done");

        Ok(GeneratedDeck { deck, role_counts })
    }
}

/// Role tally over the nonlands of a deck.
pub fn count_roles(deck: &Deck) -> RoleCounts {
    let mut counts = RoleCounts::default();
    for card in &deck.nonlands {
        counts.increment(role_of(card));
    }
    counts
}
