//! Finalizer - reconciles the allocator and manabase output into exactly 99
//! cards or fails.

use crate::deck::allocator::{within_budget, Allocation, RELAXED_BUDGET_FACTOR};
use crate::deck::manabase::{suggest_basics, wastes};
use crate::deck::types::{ColorlessBasics, CurveBucket, DeckError, DeckRequest, ScoredCandidate};
use crate::types::{Candidate, ColorSet, Deck, LandEntry};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Targets the finalizer reconciles against.
#[derive(Debug, Clone)]
pub struct FinalizeOptions {
    pub nonland_target: usize,
    pub land_target: usize,
    pub deck_budget: f64,
    /// Commander identity, drives basic land colors
    pub identity: ColorSet,
    pub colorless_basics: ColorlessBasics,
}

impl FinalizeOptions {
    pub fn from_request(request: &DeckRequest, identity: ColorSet) -> Self {
        Self {
            nonland_target: request.nonland_target(),
            land_target: request.land_count(),
            deck_budget: request.weights.deck_budget,
            identity,
            colorless_basics: request.colorless_basics,
        }
    }
}

/// Builds the final deck.
///
/// Both lists are truncated to their targets. Missing nonlands are drawn from
/// the unused pool (singleton, price at most 1.2x budget, low then mid then
/// high mana value, no lands). Missing lands are filled with basics of the
/// identity, then with Wastes unless the colorless policy rejects them.
#[instrument(skip_all, fields(commander = %commander.name))]
pub fn finalize(
    commander: Candidate,
    allocation: Allocation,
    manabase: Vec<LandEntry>,
    options: &FinalizeOptions,
) -> Result<Deck, DeckError> {
    let Allocation {
        mut selected,
        remaining,
    } = allocation;
    selected.truncate(options.nonland_target);

    let mut lands = manabase;
    lands.truncate(options.land_target);

    if selected.len() < options.nonland_target {
        let before = selected.len();
        top_up_nonlands(&mut selected, &remaining, options);
        debug!("Finalizer added {} nonlands from the pool", selected.len() - before);
    }

    if selected.len() < options.nonland_target {
        let missing = options.nonland_target - selected.len();
        warn!("Pool exhausted with {} nonland slots open", missing);
        return Err(DeckError::InsufficientPool {
            needed: options.nonland_target,
            missing,
        });
    }

    if lands.len() < options.land_target {
        lands.extend(suggest_basics(options.identity, options.land_target - lands.len()));
    }
    if lands.len() < options.land_target {
        let missing = options.land_target - lands.len();
        match options.colorless_basics {
            ColorlessBasics::Wastes => {
                debug!("Filling {} land slots with Wastes", missing);
                lands.extend(wastes(missing));
            }
            ColorlessBasics::Reject => {
                warn!("Manabase short by {} lands for a colorless identity", missing);
                return Err(DeckError::InsufficientLands { missing });
            }
        }
    }

    let deck = Deck {
        commander,
        nonlands: selected.into_iter().map(|item| item.candidate).collect(),
        lands,
    };
    info!(
        "Finalized deck: {} nonlands + {} lands",
        deck.nonlands.len(),
        deck.lands.len()
    );
    Ok(deck)
}

fn top_up_nonlands(
    selected: &mut Vec<ScoredCandidate>,
    remaining: &[ScoredCandidate],
    options: &FinalizeOptions,
) {
    let mut seen: HashSet<String> = selected.iter().map(|item| item.key.clone()).collect();

    for bucket in CurveBucket::ALL {
        for item in remaining.iter().filter(|item| item.bucket == bucket) {
            if selected.len() >= options.nonland_target {
                return;
            }
            if item.land
                || seen.contains(&item.key)
                || !within_budget(item.candidate.price(), options.deck_budget, RELAXED_BUDGET_FACTOR)
            {
                continue;
            }
            seen.insert(item.key.clone());
            selected.push(item.clone());
        }
    }
}
