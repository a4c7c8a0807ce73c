//! Constrained allocator - phased greedy selection of the nonland cards.
//!
//! Phases run strictly in order over the ranked pool:
//!
//! - A: role minima, hard budget guard (2x)
//! - B: type-category minima, hard budget guard (2x)
//! - C: curve-aware fill under type caps, soft budget guard (1.5x)
//! - D: top-off by mana value bucket, relaxed budget guard (1.2x)
//!
//! Every phase respects the singleton rule, never admits lands and enforces
//! the mana-rock cap. All bookkeeping lives in an `AllocationState` owned by a
//! single call.

use crate::deck::types::{
    CurveBucket, CurveTargets, Role, RoleTargets, ScoredCandidate, TypeCategory, TypeLimits,
};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Maximum number of mana rocks in a selection.
pub const MANA_ROCK_CAP: usize = 10;

/// Budget multiplier for the role and type minima phases.
pub const HARD_BUDGET_FACTOR: f64 = 2.0;
/// Budget multiplier for the curve-aware fill.
pub const SOFT_BUDGET_FACTOR: f64 = 1.5;
/// Budget multiplier for the top-off and the finalizer.
pub const RELAXED_BUDGET_FACTOR: f64 = 1.2;

/// True when the budget is unconstrained or `price <= budget * factor`.
pub fn within_budget(price: f64, deck_budget: f64, factor: f64) -> bool {
    deck_budget <= 0.0 || price <= deck_budget * factor
}

/// Limits the allocator works against.
#[derive(Debug, Clone)]
pub struct AllocationConstraints<'a> {
    pub nonland_target: usize,
    pub targets: &'a RoleTargets,
    pub type_limits: &'a TypeLimits,
    pub curve: &'a CurveTargets,
    pub deck_budget: f64,
    pub mana_rock_cap: usize,
}

/// Mutable bookkeeping for one allocation.
#[derive(Debug, Default)]
pub struct AllocationState {
    picked: Vec<usize>,
    seen: HashSet<String>,
    roles: [usize; 5],
    types: [usize; 9],
    curve: [usize; 3],
    mana_rocks: usize,
}

impl AllocationState {
    pub fn len(&self) -> usize {
        self.picked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picked.is_empty()
    }

    pub fn role_count(&self, role: Role) -> usize {
        self.roles[role.index()]
    }

    pub fn type_count(&self, category: TypeCategory) -> usize {
        self.types[category.index()]
    }

    pub fn curve_count(&self, bucket: CurveBucket) -> usize {
        self.curve[bucket.index()]
    }

    fn has_key(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    fn record(&mut self, index: usize, item: &ScoredCandidate) {
        self.picked.push(index);
        self.seen.insert(item.key.clone());
        self.roles[item.role.index()] += 1;
        self.types[item.category.index()] += 1;
        self.curve[item.bucket.index()] += 1;
        if item.mana_rock {
            self.mana_rocks += 1;
        }
    }
}

/// Result of an allocation: the selection and the unused rest of the pool.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub selected: Vec<ScoredCandidate>,
    pub remaining: Vec<ScoredCandidate>,
}

/// Phased greedy allocator over a ranked pool.
pub struct Allocator<'a> {
    pool: &'a [ScoredCandidate],
    constraints: AllocationConstraints<'a>,
    state: AllocationState,
}

impl<'a> Allocator<'a> {
    pub fn new(pool: &'a [ScoredCandidate], constraints: AllocationConstraints<'a>) -> Self {
        Self {
            pool,
            constraints,
            state: AllocationState::default(),
        }
    }

    /// Runs phases A to D and splits the pool into selected and remaining.
    #[instrument(skip(self), fields(pool_size = self.pool.len(), target = self.constraints.nonland_target))]
    pub fn allocate(mut self) -> Allocation {
        self.fill_role_minima();
        info!("Phase A (role minima) selected {} cards", self.state.len());

        self.fill_type_minima();
        info!("Phase B (type minima) brought selection to {}", self.state.len());

        self.fill_curve();
        info!("Phase C (curve fill) brought selection to {}", self.state.len());

        self.top_off();
        info!(
            "Phase D (top-off) finished with {}/{} cards",
            self.state.len(),
            self.constraints.nonland_target
        );

        self.into_allocation()
    }

    fn is_full(&self) -> bool {
        self.state.len() >= self.constraints.nonland_target
    }

    /// Singleton, land exclusion and mana-rock cap.
    fn admissible(&self, item: &ScoredCandidate) -> bool {
        if item.land || self.state.has_key(&item.key) {
            return false;
        }
        !(item.mana_rock && self.state.mana_rocks >= self.constraints.mana_rock_cap)
    }

    fn below_type_cap(&self, category: TypeCategory) -> bool {
        self.state.type_count(category) < self.constraints.type_limits.get(category).max
    }

    fn affordable(&self, item: &ScoredCandidate, factor: f64) -> bool {
        within_budget(item.candidate.price(), self.constraints.deck_budget, factor)
    }

    fn role_minima_met(&self) -> bool {
        Role::TRACKED
            .iter()
            .all(|role| self.state.role_count(*role) >= self.constraints.targets.minimum(*role))
    }

    fn type_minima_met(&self) -> bool {
        TypeCategory::FILL_ORDER.iter().all(|category| {
            self.state.type_count(*category) >= self.constraints.type_limits.get(*category).min
        })
    }

    fn curve_met(&self) -> bool {
        CurveBucket::ALL
            .iter()
            .all(|bucket| self.state.curve_count(*bucket) >= self.constraints.curve.get(*bucket))
    }

    fn take(&mut self, index: usize) {
        let pool = self.pool;
        let item = &pool[index];
        debug!(
            "Selected {} ({:?}, {:?}, score {:.3})",
            item.candidate.name, item.role, item.category, item.score
        );
        self.state.record(index, item);
    }

    /// Phase A: one pass admitting cards whose role is still below its minimum.
    fn fill_role_minima(&mut self) {
        let pool = self.pool;
        for (index, item) in pool.iter().enumerate() {
            if self.is_full() || self.role_minima_met() {
                break;
            }
            if item.role == Role::Other
                || self.state.role_count(item.role) >= self.constraints.targets.minimum(item.role)
            {
                continue;
            }
            if self.admissible(item)
                && self.below_type_cap(item.category)
                && self.affordable(item, HARD_BUDGET_FACTOR)
            {
                self.take(index);
            }
        }
    }

    /// Phase B: per category, admit cards of that type until its minimum is reached.
    fn fill_type_minima(&mut self) {
        let pool = self.pool;
        for category in TypeCategory::FILL_ORDER {
            let minimum = self.constraints.type_limits.get(category).min;
            if self.state.type_count(category) >= minimum {
                continue;
            }
            for (index, item) in pool.iter().enumerate() {
                if self.is_full() || self.state.type_count(category) >= minimum {
                    break;
                }
                if item.category != category {
                    continue;
                }
                if self.admissible(item)
                    && self.below_type_cap(category)
                    && self.affordable(item, HARD_BUDGET_FACTOR)
                {
                    self.take(index);
                }
            }
            debug!(
                "Type {} at {}/{} after minima fill",
                category.as_str(),
                self.state.type_count(category),
                minimum
            );
        }
    }

    /// Phase C: fill under type caps and curve targets.
    ///
    /// The curve constraint is dropped once every bucket reached its target.
    /// Type caps are dropped only after that, and only once every category
    /// reached its minimum.
    fn fill_curve(&mut self) {
        let pool = self.pool;
        for (index, item) in pool.iter().enumerate() {
            if self.is_full() {
                break;
            }
            let curve_relaxed = self.curve_met();
            let caps_relaxed = curve_relaxed && self.type_minima_met();

            if !self.admissible(item) {
                continue;
            }
            if !caps_relaxed && !self.below_type_cap(item.category) {
                continue;
            }
            if !curve_relaxed
                && self.state.curve_count(item.bucket) >= self.constraints.curve.get(item.bucket)
            {
                continue;
            }
            if self.affordable(item, SOFT_BUDGET_FACTOR) {
                self.take(index);
            }
        }
    }

    /// Phase D: low, then mid, then high mana value, type caps still enforced.
    fn top_off(&mut self) {
        let pool = self.pool;
        for bucket in CurveBucket::ALL {
            for (index, item) in pool.iter().enumerate() {
                if self.is_full() {
                    return;
                }
                if item.bucket != bucket {
                    continue;
                }
                if self.admissible(item)
                    && self.below_type_cap(item.category)
                    && self.affordable(item, RELAXED_BUDGET_FACTOR)
                {
                    self.take(index);
                }
            }
        }
    }

    fn into_allocation(self) -> Allocation {
        let mut taken = vec![false; self.pool.len()];
        for index in &self.state.picked {
            taken[*index] = true;
        }
        let selected = self
            .state
            .picked
            .iter()
            .map(|index| self.pool[*index].clone())
            .collect();
        let remaining = self
            .pool
            .iter()
            .zip(taken)
            .filter(|(_, taken)| !taken)
            .map(|(item, _)| item.clone())
            .collect();
        Allocation {
            selected,
            remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Inventory;
    use crate::deck::scorer::DeckScorer;
    use crate::deck::types::{CountRange, ScoreWeights};
    use crate::types::Candidate;

    fn create_test_item(
        name: &str,
        role: Role,
        category: TypeCategory,
        cmc: f64,
        price: f64,
    ) -> ScoredCandidate {
        let mut candidate = Candidate::new(name, category.as_str());
        candidate.cmc = cmc;
        candidate.price_eur = Some(price);
        ScoredCandidate {
            key: candidate.identity_key(),
            candidate,
            score: 1.0,
            role,
            land: category == TypeCategory::Land,
            category,
            bucket: CurveBucket::of(cmc),
            mana_rock: false,
        }
    }

    fn open_limits() -> TypeLimits {
        let open = CountRange::new(0, 100);
        TypeLimits {
            creature: open,
            artifact: open,
            enchantment: open,
            instant: open,
            sorcery: open,
            planeswalker: open,
            battle: open,
            other: open,
        }
    }

    fn no_roles() -> RoleTargets {
        let none = CountRange::new(0, 0);
        RoleTargets {
            ramp: none,
            draw: none,
            removal: none,
            wraths: none,
        }
    }

    fn open_curve() -> CurveTargets {
        CurveTargets {
            low: 100,
            mid: 100,
            high: 100,
        }
    }

    fn names(items: &[ScoredCandidate]) -> Vec<&str> {
        items.iter().map(|i| i.candidate.name.as_str()).collect()
    }

    #[test]
    fn test_within_budget() {
        assert!(within_budget(1000.0, 0.0, 1.2));
        assert!(within_budget(2.4, 2.0, 1.2));
        assert!(!within_budget(2.5, 2.0, 1.2));
    }

    #[test]
    fn test_role_minima_picked_before_higher_scored_fillers() {
        let pool = vec![
            create_test_item("Filler 1", Role::Other, TypeCategory::Creature, 2.0, 0.0),
            create_test_item("Filler 2", Role::Other, TypeCategory::Creature, 2.0, 0.0),
            create_test_item("Cultivate", Role::Ramp, TypeCategory::Sorcery, 3.0, 0.0),
            create_test_item("Harmonize", Role::Draw, TypeCategory::Sorcery, 4.0, 0.0),
        ];
        let mut targets = no_roles();
        targets.ramp = CountRange::new(1, 3);
        targets.draw = CountRange::new(1, 3);
        let limits = open_limits();
        let curve = open_curve();
        let constraints = AllocationConstraints {
            nonland_target: 2,
            targets: &targets,
            type_limits: &limits,
            curve: &curve,
            deck_budget: 0.0,
            mana_rock_cap: MANA_ROCK_CAP,
        };

        let allocation = Allocator::new(&pool, constraints).allocate();
        assert_eq!(names(&allocation.selected), vec!["Cultivate", "Harmonize"]);
        assert_eq!(names(&allocation.remaining), vec!["Filler 1", "Filler 2"]);
    }

    #[test]
    fn test_phase_a_hard_budget_guard() {
        let pool = vec![
            create_test_item("Pricey Wrath", Role::Wraths, TypeCategory::Sorcery, 4.0, 50.0),
            create_test_item("Cheap Wrath", Role::Wraths, TypeCategory::Sorcery, 4.0, 3.0),
        ];
        let mut targets = no_roles();
        targets.wraths = CountRange::new(1, 2);
        let limits = open_limits();
        let curve = open_curve();
        let constraints = AllocationConstraints {
            nonland_target: 1,
            targets: &targets,
            type_limits: &limits,
            curve: &curve,
            deck_budget: 2.0,
            mana_rock_cap: MANA_ROCK_CAP,
        };

        let allocation = Allocator::new(&pool, constraints).allocate();
        assert_eq!(names(&allocation.selected), vec!["Cheap Wrath"]);
    }

    #[test]
    fn test_singleton_across_printings() {
        let mut reprint = create_test_item("Sol Ring", Role::Ramp, TypeCategory::Artifact, 1.0, 0.0);
        reprint.candidate.lang = "de".to_string();
        let pool = vec![
            create_test_item("Sol Ring", Role::Ramp, TypeCategory::Artifact, 1.0, 0.0),
            reprint,
            create_test_item("Arcane Signet", Role::Ramp, TypeCategory::Artifact, 2.0, 0.0),
        ];
        let targets = RoleTargets::default();
        let limits = open_limits();
        let curve = open_curve();
        let constraints = AllocationConstraints {
            nonland_target: 3,
            targets: &targets,
            type_limits: &limits,
            curve: &curve,
            deck_budget: 0.0,
            mana_rock_cap: MANA_ROCK_CAP,
        };

        let allocation = Allocator::new(&pool, constraints).allocate();
        assert_eq!(names(&allocation.selected), vec!["Sol Ring", "Arcane Signet"]);
    }

    #[test]
    fn test_type_minima_fill_in_priority_order() {
        let pool = vec![
            create_test_item("Bear", Role::Other, TypeCategory::Creature, 2.0, 0.0),
            create_test_item("Opt", Role::Other, TypeCategory::Instant, 1.0, 0.0),
            create_test_item("Wolf", Role::Other, TypeCategory::Creature, 2.0, 0.0),
            create_test_item("Shock", Role::Other, TypeCategory::Instant, 1.0, 0.0),
        ];
        let targets = no_roles();
        let mut limits = open_limits();
        limits.creature = CountRange::new(1, 10);
        limits.instant = CountRange::new(2, 10);
        let curve = CurveTargets {
            low: 0,
            mid: 0,
            high: 0,
        };
        let constraints = AllocationConstraints {
            nonland_target: 3,
            targets: &targets,
            type_limits: &limits,
            curve: &curve,
            deck_budget: 0.0,
            mana_rock_cap: MANA_ROCK_CAP,
        };

        let allocation = Allocator::new(&pool, constraints).allocate();
        assert_eq!(names(&allocation.selected), vec!["Bear", "Opt", "Shock"]);
    }

    #[test]
    fn test_curve_targets_shape_phase_c() {
        let pool = vec![
            create_test_item("Big 1", Role::Other, TypeCategory::Creature, 6.0, 0.0),
            create_test_item("Big 2", Role::Other, TypeCategory::Creature, 7.0, 0.0),
            create_test_item("Small 1", Role::Other, TypeCategory::Creature, 1.0, 0.0),
            create_test_item("Small 2", Role::Other, TypeCategory::Creature, 2.0, 0.0),
        ];
        let targets = no_roles();
        let limits = open_limits();
        let curve = CurveTargets {
            low: 2,
            mid: 0,
            high: 1,
        };
        let constraints = AllocationConstraints {
            nonland_target: 3,
            targets: &targets,
            type_limits: &limits,
            curve: &curve,
            deck_budget: 0.0,
            mana_rock_cap: MANA_ROCK_CAP,
        };

        let allocation = Allocator::new(&pool, constraints).allocate();
        assert_eq!(names(&allocation.selected), vec!["Big 1", "Small 1", "Small 2"]);
    }

    #[test]
    fn test_type_caps_hold_until_curve_and_minima_met() {
        let pool = vec![
            create_test_item("Creature 1", Role::Other, TypeCategory::Creature, 2.0, 0.0),
            create_test_item("Creature 2", Role::Other, TypeCategory::Creature, 2.0, 0.0),
            create_test_item("Creature 3", Role::Other, TypeCategory::Creature, 2.0, 0.0),
        ];
        let targets = no_roles();
        let mut limits = open_limits();
        limits.creature = CountRange::new(0, 1);
        let curve = CurveTargets {
            low: 5,
            mid: 0,
            high: 0,
        };
        let constraints = AllocationConstraints {
            nonland_target: 3,
            targets: &targets,
            type_limits: &limits,
            curve: &curve,
            deck_budget: 0.0,
            mana_rock_cap: MANA_ROCK_CAP,
        };

        // Curve never relaxes, so the creature cap holds through C and D.
        let allocation = Allocator::new(&pool, constraints).allocate();
        assert_eq!(names(&allocation.selected), vec!["Creature 1"]);
        assert_eq!(allocation.remaining.len(), 2);
    }

    #[test]
    fn test_type_caps_relax_after_curve_met() {
        let pool = vec![
            create_test_item("Creature 1", Role::Other, TypeCategory::Creature, 2.0, 0.0),
            create_test_item("Creature 2", Role::Other, TypeCategory::Creature, 2.0, 0.0),
            create_test_item("Creature 3", Role::Other, TypeCategory::Creature, 2.0, 0.0),
        ];
        let targets = no_roles();
        let mut limits = open_limits();
        limits.creature = CountRange::new(0, 1);
        let curve = CurveTargets {
            low: 1,
            mid: 0,
            high: 0,
        };
        let constraints = AllocationConstraints {
            nonland_target: 3,
            targets: &targets,
            type_limits: &limits,
            curve: &curve,
            deck_budget: 0.0,
            mana_rock_cap: MANA_ROCK_CAP,
        };

        let allocation = Allocator::new(&pool, constraints).allocate();
        assert_eq!(allocation.selected.len(), 3);
    }

    #[test]
    fn test_top_off_prefers_low_mana_values() {
        let pool = vec![
            create_test_item("High Over Budget", Role::Other, TypeCategory::Creature, 6.0, 3.5),
            create_test_item("Mid", Role::Other, TypeCategory::Creature, 3.0, 1.0),
            create_test_item("Pricey Low", Role::Other, TypeCategory::Creature, 1.0, 2.6),
            create_test_item("Low", Role::Other, TypeCategory::Creature, 1.0, 2.3),
        ];
        let targets = no_roles();
        let limits = open_limits();
        let curve = CurveTargets {
            low: 0,
            mid: 0,
            high: 1,
        };
        let constraints = AllocationConstraints {
            nonland_target: 2,
            targets: &targets,
            type_limits: &limits,
            curve: &curve,
            deck_budget: 2.0,
            mana_rock_cap: MANA_ROCK_CAP,
        };

        // The only high card is over 1.5x budget, so the curve never relaxes
        // and phase C admits nothing. Phase D walks low before mid at 1.2x.
        let allocation = Allocator::new(&pool, constraints).allocate();
        assert_eq!(names(&allocation.selected), vec!["Low", "Mid"]);
    }

    #[test]
    fn test_mana_rock_cap() {
        let mut pool = Vec::new();
        for i in 0..5 {
            let mut rock =
                create_test_item(&format!("Rock {}", i), Role::Ramp, TypeCategory::Artifact, 2.0, 0.0);
            rock.mana_rock = true;
            pool.push(rock);
        }
        pool.push(create_test_item("Bear", Role::Other, TypeCategory::Creature, 2.0, 0.0));
        let targets = RoleTargets::default();
        let limits = open_limits();
        let curve = open_curve();
        let constraints = AllocationConstraints {
            nonland_target: 5,
            targets: &targets,
            type_limits: &limits,
            curve: &curve,
            deck_budget: 0.0,
            mana_rock_cap: 2,
        };

        let allocator = Allocator::new(&pool, constraints);
        let allocation = allocator.allocate();
        let rocks = allocation.selected.iter().filter(|i| i.mana_rock).count();
        assert_eq!(rocks, 2);
        assert_eq!(allocation.selected.len(), 3);
    }

    #[test]
    fn test_lands_are_never_admitted() {
        let weights = ScoreWeights::default();
        let inventory = Inventory::new();
        let pool = DeckScorer::new(&weights, &inventory).rank_pool(vec![
            Candidate::new("Dryad Arbor", "Land Creature — Forest Dryad"),
            Candidate::new("Seat of the Synod", "Artifact Land"),
            Candidate::new("Urza's Saga", "Enchantment Land — Urza's Saga"),
            Candidate::new("Grizzly Bears", "Creature — Bear"),
        ]);
        let targets = no_roles();
        let limits = open_limits();
        let curve = open_curve();
        let constraints = AllocationConstraints {
            nonland_target: 4,
            targets: &targets,
            type_limits: &limits,
            curve: &curve,
            deck_budget: 0.0,
            mana_rock_cap: MANA_ROCK_CAP,
        };

        let allocation = Allocator::new(&pool, constraints).allocate();
        assert_eq!(names(&allocation.selected), vec!["Grizzly Bears"]);
    }
}
