//! Core types and data structures for the deck pipeline.

use crate::types::{Candidate, ColorSet, Deck};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Functional role of a nonland card.
/// Each card carries exactly one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Mana acceleration and land fetching
    Ramp,
    /// Card advantage
    Draw,
    /// Targeted interaction
    Removal,
    /// Board wipes
    Wraths,
    /// Anything else
    Other,
}

impl Role {
    /// Roles that carry targets, in reporting order.
    pub const TRACKED: [Role; 4] = [Role::Ramp, Role::Draw, Role::Removal, Role::Wraths];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Ramp => "ramp",
            Role::Draw => "draw",
            Role::Removal => "removal",
            Role::Wraths => "wraths",
            Role::Other => "other",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Type category derived from the type line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeCategory {
    Creature,
    Artifact,
    Enchantment,
    Instant,
    Sorcery,
    Planeswalker,
    Battle,
    Land,
    Other,
}

impl TypeCategory {
    /// Matching order used by the classifier.
    pub const MATCH_ORDER: [TypeCategory; 8] = [
        TypeCategory::Creature,
        TypeCategory::Artifact,
        TypeCategory::Enchantment,
        TypeCategory::Instant,
        TypeCategory::Sorcery,
        TypeCategory::Planeswalker,
        TypeCategory::Battle,
        TypeCategory::Land,
    ];

    /// Order in which type minima are filled by the allocator.
    pub const FILL_ORDER: [TypeCategory; 8] = [
        TypeCategory::Creature,
        TypeCategory::Instant,
        TypeCategory::Sorcery,
        TypeCategory::Artifact,
        TypeCategory::Enchantment,
        TypeCategory::Planeswalker,
        TypeCategory::Battle,
        TypeCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeCategory::Creature => "creature",
            TypeCategory::Artifact => "artifact",
            TypeCategory::Enchantment => "enchantment",
            TypeCategory::Instant => "instant",
            TypeCategory::Sorcery => "sorcery",
            TypeCategory::Planeswalker => "planeswalker",
            TypeCategory::Battle => "battle",
            TypeCategory::Land => "land",
            TypeCategory::Other => "other",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Mana value bucket used for curve shaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveBucket {
    /// Mana value 2 or less
    Low,
    /// Mana value 3 or 4
    Mid,
    /// Mana value 5 or more
    High,
}

impl CurveBucket {
    pub const ALL: [CurveBucket; 3] = [CurveBucket::Low, CurveBucket::Mid, CurveBucket::High];

    pub fn of(cmc: f64) -> Self {
        if cmc <= 2.0 {
            CurveBucket::Low
        } else if cmc <= 4.0 {
            CurveBucket::Mid
        } else {
            CurveBucket::High
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Closed interval of desired counts. Serialized as `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct CountRange {
    pub min: usize,
    pub max: usize,
}

impl CountRange {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: usize) -> bool {
        value >= self.min && value <= self.max
    }
}

impl From<(usize, usize)> for CountRange {
    fn from((min, max): (usize, usize)) -> Self {
        Self::new(min, max.max(min))
    }
}

impl From<CountRange> for (usize, usize) {
    fn from(range: CountRange) -> Self {
        (range.min, range.max)
    }
}

/// Desired count interval per tracked role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleTargets {
    pub ramp: CountRange,
    pub draw: CountRange,
    pub removal: CountRange,
    pub wraths: CountRange,
}

impl RoleTargets {
    /// Interval for a role; `Other` has none.
    pub fn get(&self, role: Role) -> Option<CountRange> {
        match role {
            Role::Ramp => Some(self.ramp),
            Role::Draw => Some(self.draw),
            Role::Removal => Some(self.removal),
            Role::Wraths => Some(self.wraths),
            Role::Other => None,
        }
    }

    /// Minimum for a role, zero for `Other`.
    pub fn minimum(&self, role: Role) -> usize {
        self.get(role).map(|r| r.min).unwrap_or(0)
    }
}

impl Default for RoleTargets {
    fn default() -> Self {
        Self {
            ramp: CountRange::new(8, 12),
            draw: CountRange::new(6, 10),
            removal: CountRange::new(6, 10),
            wraths: CountRange::new(2, 4),
        }
    }
}

/// Per type category `[min, max]` table for the nonland selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeLimits {
    pub creature: CountRange,
    pub artifact: CountRange,
    pub enchantment: CountRange,
    pub instant: CountRange,
    pub sorcery: CountRange,
    pub planeswalker: CountRange,
    pub battle: CountRange,
    pub other: CountRange,
}

impl TypeLimits {
    pub fn get(&self, category: TypeCategory) -> CountRange {
        match category {
            TypeCategory::Creature => self.creature,
            TypeCategory::Artifact => self.artifact,
            TypeCategory::Enchantment => self.enchantment,
            TypeCategory::Instant => self.instant,
            TypeCategory::Sorcery => self.sorcery,
            TypeCategory::Planeswalker => self.planeswalker,
            TypeCategory::Battle => self.battle,
            TypeCategory::Other => self.other,
            TypeCategory::Land => CountRange::new(0, 0),
        }
    }
}

impl Default for TypeLimits {
    fn default() -> Self {
        Self {
            creature: CountRange::new(20, 35),
            artifact: CountRange::new(4, 14),
            enchantment: CountRange::new(2, 10),
            instant: CountRange::new(5, 14),
            sorcery: CountRange::new(4, 12),
            planeswalker: CountRange::new(0, 4),
            battle: CountRange::new(0, 2),
            other: CountRange::new(0, 3),
        }
    }
}

/// Desired counts per curve bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveTargets {
    pub low: usize,
    pub mid: usize,
    pub high: usize,
}

impl CurveTargets {
    pub fn get(&self, bucket: CurveBucket) -> usize {
        match bucket {
            CurveBucket::Low => self.low,
            CurveBucket::Mid => self.mid,
            CurveBucket::High => self.high,
        }
    }
}

impl Default for CurveTargets {
    fn default() -> Self {
        Self {
            low: 25,
            mid: 23,
            high: 15,
        }
    }
}

/// User weights feeding the scoring function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Popularity weight, 0..=100
    pub edhrec_weight: f64,
    /// Ownership weight, 0..=100
    pub owned_weight: f64,
    /// Per-card budget in EUR, 0 means unconstrained
    pub deck_budget: f64,
    /// Preferred synergy tags, at most three
    pub mechanics: Vec<String>,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            edhrec_weight: 60.0,
            owned_weight: 40.0,
            deck_budget: 200.0,
            mechanics: Vec::new(),
        }
    }
}

/// How the commander is chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "name", rename_all = "lowercase")]
pub enum CommanderMode {
    /// Resolve the named commander
    Select(String),
    /// Draw a random legal commander within the desired identity
    Random,
}

/// What fills land slots that colored basics cannot, e.g. for colorless commanders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorlessBasics {
    /// Fill the gap with Wastes
    #[default]
    Wastes,
    /// Fail the request instead
    Reject,
}

/// Full set of inputs for one deck generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckRequest {
    pub commander: CommanderMode,
    /// Identity filter for random commanders; empty means any
    pub desired_identity: ColorSet,
    pub weights: ScoreWeights,
    /// Number of lands, clamped to 32..=40
    pub target_lands: usize,
    pub targets: RoleTargets,
    pub type_limits: TypeLimits,
    pub curve: CurveTargets,
    pub colorless_basics: ColorlessBasics,
    /// Language tried by the localized commander lookup
    pub localized_lang: String,
}

/// Bounds for the land count.
pub const MIN_LANDS: usize = 32;
pub const MAX_LANDS: usize = 40;
/// Cards in the deck besides the commander.
pub const MAIN_DECK_SIZE: usize = 99;

impl DeckRequest {
    /// Land count after clamping.
    pub fn land_count(&self) -> usize {
        self.target_lands.clamp(MIN_LANDS, MAX_LANDS)
    }

    /// Number of nonland slots.
    pub fn nonland_target(&self) -> usize {
        MAIN_DECK_SIZE - self.land_count()
    }
}

impl Default for DeckRequest {
    fn default() -> Self {
        Self {
            commander: CommanderMode::Random,
            desired_identity: ColorSet::COLORLESS,
            weights: ScoreWeights::default(),
            target_lands: 36,
            targets: RoleTargets::default(),
            type_limits: TypeLimits::default(),
            curve: CurveTargets::default(),
            colorless_basics: ColorlessBasics::default(),
            localized_lang: "fr".to_string(),
        }
    }
}

/// A pool candidate with its classification and score attached.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
    pub role: Role,
    pub category: TypeCategory,
    pub bucket: CurveBucket,
    pub mana_rock: bool,
    /// Any type line carrying "Land", including land creatures and artifact lands
    pub land: bool,
    /// Identity key cached for singleton checks
    pub key: String,
}

/// Role tally over the nonland selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
    pub ramp: usize,
    pub draw: usize,
    pub removal: usize,
    pub wraths: usize,
}

/// Position of a count relative to its target interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Balance {
    Below,
    Within,
    Above,
}

impl RoleCounts {
    pub fn get(&self, role: Role) -> usize {
        match role {
            Role::Ramp => self.ramp,
            Role::Draw => self.draw,
            Role::Removal => self.removal,
            Role::Wraths => self.wraths,
            Role::Other => 0,
        }
    }

    pub(crate) fn increment(&mut self, role: Role) {
        match role {
            Role::Ramp => self.ramp += 1,
            Role::Draw => self.draw += 1,
            Role::Removal => self.removal += 1,
            Role::Wraths => self.wraths += 1,
            Role::Other => {}
        }
    }

    /// True if every tracked role reached its minimum.
    pub fn meets_minima(&self, targets: &RoleTargets) -> bool {
        Role::TRACKED
            .iter()
            .all(|role| self.get(*role) >= targets.minimum(*role))
    }

    /// Per-role position against the target intervals.
    pub fn balance(&self, targets: &RoleTargets) -> Vec<(Role, Balance)> {
        Role::TRACKED
            .iter()
            .filter_map(|role| {
                let range = targets.get(*role)?;
                let count = self.get(*role);
                let balance = if count < range.min {
                    Balance::Below
                } else if count > range.max {
                    Balance::Above
                } else {
                    Balance::Within
                };
                Some((*role, balance))
            })
            .collect()
    }
}

/// Successful output of `generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDeck {
    pub deck: Deck,
    pub role_counts: RoleCounts,
}

/// Reportable failures of the deck pipeline.
#[derive(Debug, Error)]
pub enum DeckError {
    /// No legal commander could be resolved
    #[error("no legal commander could be resolved for {query:?}")]
    CommanderResolution { query: String },
    /// The pool ran dry before the nonland selection was complete
    #[error("candidate pool too small: {missing} of {needed} nonland slots could not be filled")]
    InsufficientPool { needed: usize, missing: usize },
    /// Land slots could not be filled for a colorless identity
    #[error("manabase is short by {missing} lands and colorless fill is disabled")]
    InsufficientLands { missing: usize },
    /// Card source failure outside of staple pricing
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}
