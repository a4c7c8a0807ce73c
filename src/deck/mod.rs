//! Deck module - scoring, constrained allocation, manabase and finalization.
//!
//! The pipeline is pure over in-memory data apart from the card-source calls
//! made while resolving the commander, fetching the pool and pricing staples.

pub mod types;
pub mod classifier;
pub mod scorer;
pub mod allocator;
pub mod manabase;
pub mod finalizer;
pub mod commander;
pub mod generator;
pub mod stats;

// Re-export main public types and the generator
pub use generator::{count_roles, no_progress, DeckGenerator, Progress};
pub use types::{
    Balance, ColorlessBasics, CommanderMode, CountRange, CurveBucket, CurveTargets, DeckError,
    DeckRequest, GeneratedDeck, Role, RoleCounts, RoleTargets, ScoreWeights, ScoredCandidate,
    TypeCategory, TypeLimits,
};

// Re-export other key components for advanced usage
pub use allocator::{Allocation, AllocationConstraints, Allocator};
pub use commander::{CommanderResolver, CommanderStrategy};
pub use scorer::DeckScorer;
pub use stats::DeckStats;

use crate::types::ColorSet;

/// Request builder with the usual defaults (edhrec 60, owned 40, budget 200, 36 lands).
pub struct DeckRequestBuilder {
    request: DeckRequest,
}

impl DeckRequestBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            request: DeckRequest::default(),
        }
    }

    /// Resolve this commander by name.
    pub fn with_commander(mut self, name: impl Into<String>) -> Self {
        self.request.commander = CommanderMode::Select(name.into());
        self
    }

    /// Draw a random commander within an identity (empty means any).
    pub fn with_random_commander(mut self, identity: ColorSet) -> Self {
        self.request.commander = CommanderMode::Random;
        self.request.desired_identity = identity;
        self
    }

    /// Set popularity and ownership weights, each 0 to 100.
    pub fn with_weights(mut self, edhrec_weight: f64, owned_weight: f64) -> Self {
        self.request.weights.edhrec_weight = edhrec_weight.clamp(0.0, 100.0);
        self.request.weights.owned_weight = owned_weight.clamp(0.0, 100.0);
        self
    }

    /// Set the per-card budget in EUR, 0 for no limit.
    pub fn with_budget(mut self, deck_budget: f64) -> Self {
        self.request.weights.deck_budget = deck_budget.max(0.0);
        self
    }

    /// Set synergy mechanics.
    pub fn with_mechanics<I, S>(mut self, mechanics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.weights.mechanics = mechanics.into_iter().map(Into::into).collect();
        self
    }

    /// Set the land count. Clamped to 32..=40 when the request is used.
    pub fn with_lands(mut self, target_lands: usize) -> Self {
        self.request.target_lands = target_lands;
        self
    }

    /// Set role targets.
    pub fn with_targets(mut self, targets: RoleTargets) -> Self {
        self.request.targets = targets;
        self
    }

    /// Set type-category limits.
    pub fn with_type_limits(mut self, type_limits: TypeLimits) -> Self {
        self.request.type_limits = type_limits;
        self
    }

    /// Set curve targets.
    pub fn with_curve(mut self, curve: CurveTargets) -> Self {
        self.request.curve = curve;
        self
    }

    /// Set the colorless land policy.
    pub fn with_colorless_basics(mut self, policy: ColorlessBasics) -> Self {
        self.request.colorless_basics = policy;
        self
    }

    /// Set the language tried for localized commander names.
    pub fn with_localized_lang(mut self, lang: impl Into<String>) -> Self {
        self.request.localized_lang = lang.into();
        self
    }

    /// Build the request.
    pub fn build(self) -> DeckRequest {
        self.request
    }
}

impl Default for DeckRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
