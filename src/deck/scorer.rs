//! Deck scorer - ranks pool candidates by popularity, ownership, budget fit
//! and synergy with the requested mechanics.

use crate::collection::Inventory;
use crate::deck::classifier::{is_land, is_mana_rock, role_of, type_of};
use crate::deck::types::{CurveBucket, ScoreWeights, ScoredCandidate};
use crate::types::Candidate;
use tracing::{debug, instrument, warn};

/// Rank assumed for unranked cards; also the cap applied to ranks.
pub const RANK_CAP: f64 = 100_000.0;
/// Weight of the budget component.
pub const BUDGET_WEIGHT: f64 = 0.2;
/// Budget component for cards above the per-card budget.
pub const OVER_BUDGET_PENALTY: f64 = 0.3;
/// Synergy bonus per matched mechanic.
pub const SYNERGY_STEP: f64 = 0.1;
/// Ceiling of the synergy bonus.
pub const SYNERGY_CAP: f64 = 0.4;
/// Maximum number of mechanics a request may carry.
pub const MAX_MECHANICS: usize = 3;

/// A requested synergy tag and the text fragments that indicate it.
#[derive(Debug, Clone, PartialEq)]
pub struct Mechanic {
    pub tag: String,
    pub keywords: Vec<String>,
}

impl Mechanic {
    /// Looks up the keyword set of a known tag; unknown tags match themselves.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().to_lowercase();
        let keywords: &[&str] = match tag.as_str() {
            "blink" => &[
                "exile another target creature you control",
                "return it to the battlefield",
                "return that card to the battlefield",
                "return those cards to the battlefield",
                "flicker",
            ],
            "treasure" => &["treasure"],
            "sacrifice" => &[
                "sacrifice a",
                "sacrifice another",
                "whenever a creature you control dies",
                "dies,",
            ],
            "lifegain" => &["gain life", "gains life", "you gain", "lifelink"],
            "tokens" => &["create", "token"],
            "reanimation" => &[
                "from your graveyard to the battlefield",
                "from a graveyard onto the battlefield",
                "return target creature card from your graveyard",
                "reanimate",
            ],
            _ => &[],
        };
        let keywords = if keywords.is_empty() {
            vec![tag.clone()]
        } else {
            keywords.iter().map(|k| k.to_string()).collect()
        };
        Self { tag, keywords }
    }

    /// True if any keyword appears in the lower-cased text.
    pub fn matches(&self, lowered_text: &str) -> bool {
        self.keywords.iter().any(|k| lowered_text.contains(k.as_str()))
    }
}

/// Mechanic tags offered to users.
pub const KNOWN_MECHANICS: [&str; 6] = [
    "blink",
    "treasure",
    "sacrifice",
    "lifegain",
    "tokens",
    "reanimation",
];

/// Lower-cases, deduplicates and truncates requested mechanics.
pub fn normalize_mechanics(tags: &[String]) -> Vec<Mechanic> {
    let mut seen: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || seen.contains(&tag) {
            continue;
        }
        seen.push(tag);
    }
    if seen.len() > MAX_MECHANICS {
        warn!(
            "{} mechanics requested, keeping the first {}",
            seen.len(),
            MAX_MECHANICS
        );
        seen.truncate(MAX_MECHANICS);
    }
    seen.iter().map(|t| Mechanic::from_tag(t)).collect()
}

/// Individual components of a candidate's score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub popularity: f64,
    pub owned: f64,
    pub budget: f64,
    pub synergy: f64,
    pub total: f64,
}

/// Scores candidates for one request. Holds no mutable state.
pub struct DeckScorer<'a> {
    weights: &'a ScoreWeights,
    inventory: &'a Inventory,
    mechanics: Vec<Mechanic>,
}

impl<'a> DeckScorer<'a> {
    /// Create a scorer for a set of weights and an inventory.
    pub fn new(weights: &'a ScoreWeights, inventory: &'a Inventory) -> Self {
        Self {
            weights,
            inventory,
            mechanics: normalize_mechanics(&weights.mechanics),
        }
    }

    /// Mechanics in effect after normalization.
    pub fn mechanics(&self) -> &[Mechanic] {
        &self.mechanics
    }

    /// Final score of a candidate.
    pub fn score(&self, candidate: &Candidate) -> f64 {
        self.breakdown(candidate).total
    }

    /// Score with its components.
    pub fn breakdown(&self, candidate: &Candidate) -> ScoreBreakdown {
        let popularity = popularity_component(candidate.edhrec_rank);
        let owned = if self.inventory.owns(&candidate.name) { 1.0 } else { 0.0 };
        let budget = budget_component(candidate.price(), self.weights.deck_budget);
        let synergy = self.synergy_bonus(candidate);

        let total = (self.weights.edhrec_weight / 100.0) * popularity
            + (self.weights.owned_weight / 100.0) * owned
            + BUDGET_WEIGHT * budget
            + synergy;

        ScoreBreakdown {
            popularity,
            owned,
            budget,
            synergy,
            total,
        }
    }

    /// `0.1` per requested mechanic found in the text, capped at `0.4`.
    pub fn synergy_bonus(&self, candidate: &Candidate) -> f64 {
        if self.mechanics.is_empty() {
            return 0.0;
        }
        let text = candidate.oracle_text.to_lowercase();
        let hits = self.mechanics.iter().filter(|m| m.matches(&text)).count();
        (SYNERGY_STEP * hits as f64).min(SYNERGY_CAP)
    }

    /// Classify, score and sort a pool, best first. Ties keep input order.
    #[instrument(skip(self, pool), fields(pool_size = pool.len()))]
    pub fn rank_pool(&self, pool: Vec<Candidate>) -> Vec<ScoredCandidate> {
        let mut ranked: Vec<ScoredCandidate> = pool
            .into_iter()
            .map(|candidate| {
                let score = self.score(&candidate);
                ScoredCandidate {
                    role: role_of(&candidate),
                    category: type_of(&candidate),
                    bucket: CurveBucket::of(candidate.cmc),
                    mana_rock: is_mana_rock(&candidate),
                    land: is_land(&candidate),
                    key: candidate.identity_key(),
                    score,
                    candidate,
                }
            })
            .collect();

        // sort_by is stable
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

        if let Some(top) = ranked.first() {
            debug!(
                "Ranked {} candidates, top {} at {:.3}",
                ranked.len(),
                top.candidate.name,
                top.score
            );
        }
        ranked
    }
}

/// `1 - min(cap, rank) / cap`; unranked cards score zero.
pub fn popularity_component(rank: Option<u32>) -> f64 {
    let rank = rank.map(f64::from).unwrap_or(RANK_CAP);
    1.0 - rank.min(RANK_CAP) / RANK_CAP
}

/// Full marks inside the budget, a fixed penalty above it.
pub fn budget_component(price: f64, deck_budget: f64) -> f64 {
    if deck_budget <= 0.0 || price <= deck_budget {
        1.0
    } else {
        OVER_BUDGET_PENALTY
    }
}
