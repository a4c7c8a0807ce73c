//! Summary statistics for a finished deck.

use crate::collection::Inventory;
use crate::deck::classifier::type_of;
use crate::deck::generator::count_roles;
use crate::deck::types::{Balance, Role, RoleCounts, RoleTargets, TypeCategory};
use crate::types::Deck;
use serde::{Deserialize, Serialize};

/// Counts and averages over the 99, commander excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckStats {
    pub total: usize,
    pub nonland_count: usize,
    pub land_count: usize,
    /// Cards present in the inventory, basics included
    pub owned_count: usize,
    /// Rounded share of owned cards, 0 to 100
    pub owned_percent: u8,
    /// Mean mana value with lands counted as zero
    pub average_cmc: f64,
    pub role_counts: RoleCounts,
    pub balance: Vec<(Role, Balance)>,
    /// Nonland counts per type category, in match order, empty ones omitted
    pub by_category: Vec<(TypeCategory, usize)>,
}

impl DeckStats {
    pub fn compute(deck: &Deck, inventory: &Inventory, targets: &RoleTargets) -> Self {
        let nonland_count = deck.nonlands.len();
        let land_count = deck.lands.len();
        let total = nonland_count + land_count;

        let owned_count = deck.nonlands.iter().filter(|c| inventory.owns(&c.name)).count()
            + deck.lands.iter().filter(|l| inventory.owns(&l.name)).count();
        let owned_percent = if total == 0 {
            0
        } else {
            (owned_count as f64 * 100.0 / total as f64).round() as u8
        };

        let cmc_sum: f64 = deck.nonlands.iter().map(|c| c.cmc).sum();
        let average_cmc = if total == 0 { 0.0 } else { cmc_sum / total as f64 };

        let role_counts = count_roles(deck);
        let balance = role_counts.balance(targets);

        let by_category = TypeCategory::MATCH_ORDER
            .iter()
            .chain(std::iter::once(&TypeCategory::Other))
            .filter_map(|category| {
                let count = deck.nonlands.iter().filter(|c| type_of(c) == *category).count();
                (count > 0).then_some((*category, count))
            })
            .collect();

        Self {
            total,
            nonland_count,
            land_count,
            owned_count,
            owned_percent,
            average_cmc,
            role_counts,
            balance,
            by_category,
        }
    }
}
