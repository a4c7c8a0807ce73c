//! Manabase builder.
//!
//! Produces exactly `target_lands` entries for a color identity: a capped
//! number of catalog staples, accepted in catalog order, followed by basics
//! split across the identity's colors.

use crate::source::CardSource;
use crate::types::{BasicLand, Color, ColorSet, LandEntry};
use tracing::{debug, info, instrument, warn};

/// Hard ceiling on staples regardless of land count.
pub const MAX_STAPLES: usize = 8;

/// Which identities may play a staple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Two or more colors
    MultiColor,
    /// Both colors present
    Pair(Color, Color),
    /// The color is present
    Single(Color),
}

impl Eligibility {
    pub fn allows(self, identity: ColorSet) -> bool {
        match self {
            Eligibility::MultiColor => identity.count() >= 2,
            Eligibility::Pair(a, b) => identity.contains(a) && identity.contains(b),
            Eligibility::Single(color) => identity.contains(color),
        }
    }
}

/// A catalog staple land.
#[derive(Debug, Clone, Copy)]
pub struct Staple {
    pub name: &'static str,
    pub type_line: &'static str,
    pub eligibility: Eligibility,
}

const fn staple(name: &'static str, type_line: &'static str, eligibility: Eligibility) -> Staple {
    Staple {
        name,
        type_line,
        eligibility,
    }
}

use Color::{Black as B, Blue as U, Green as G, Red as R, White as W};
use Eligibility::{MultiColor, Pair, Single};

/// Staples in the order they are considered.
pub const STAPLE_CATALOG: [Staple; 21] = [
    staple("Command Tower", "Land", MultiColor),
    staple("Path of Ancestry", "Land", MultiColor),
    staple("Exotic Orchard", "Land", MultiColor),
    staple("Terramorphic Expanse", "Land", MultiColor),
    staple("Evolving Wilds", "Land", MultiColor),
    staple("Azorius Guildgate", "Land — Gate", Pair(W, U)),
    staple("Dimir Guildgate", "Land — Gate", Pair(U, B)),
    staple("Rakdos Guildgate", "Land — Gate", Pair(B, R)),
    staple("Gruul Guildgate", "Land — Gate", Pair(R, G)),
    staple("Selesnya Guildgate", "Land — Gate", Pair(G, W)),
    staple("Orzhov Guildgate", "Land — Gate", Pair(W, B)),
    staple("Izzet Guildgate", "Land — Gate", Pair(U, R)),
    staple("Golgari Guildgate", "Land — Gate", Pair(B, G)),
    staple("Boros Guildgate", "Land — Gate", Pair(R, W)),
    staple("Simic Guildgate", "Land — Gate", Pair(U, G)),
    staple("Kabira Crossroads", "Land", Single(W)),
    staple("Halimar Depths", "Land", Single(U)),
    staple("Bojuka Bog", "Land", Single(B)),
    staple("Teetering Peaks", "Land", Single(R)),
    staple("Tranquil Thicket", "Land", Single(G)),
    staple("Rogue's Passage", "Land", MultiColor),
];

/// Number of staple slots for a land count.
pub fn staple_cap(target_lands: usize) -> usize {
    MAX_STAPLES.min(target_lands * 4 / 10)
}

/// Catalog staples an identity may play, in catalog order.
pub fn eligible_staples(identity: ColorSet) -> impl Iterator<Item = &'static Staple> {
    STAPLE_CATALOG
        .iter()
        .filter(move |staple| staple.eligibility.allows(identity))
}

/// Splits `slots` basics across the identity's colors in WUBRG order.
///
/// Each color but the last gets `round(slots / k)`, the last takes what is
/// left. A colorless identity gets no basics.
pub fn suggest_basics(identity: ColorSet, slots: usize) -> Vec<LandEntry> {
    let colors: Vec<Color> = identity.iter().collect();
    let Some((last, rest)) = colors.split_last() else {
        return Vec::new();
    };

    let share = (slots as f64 / colors.len() as f64).round() as usize;
    let mut basics = Vec::with_capacity(slots);
    for color in rest {
        let count = share.min(slots - basics.len());
        basics.extend((0..count).map(|_| LandEntry::basic(color.basic_land())));
    }
    let remainder = slots - basics.len();
    basics.extend((0..remainder).map(|_| LandEntry::basic(last.basic_land())));
    basics
}

/// `count` copies of Wastes.
pub fn wastes(count: usize) -> Vec<LandEntry> {
    (0..count).map(|_| LandEntry::basic(BasicLand::Wastes)).collect()
}

/// Builds the land list for an identity.
///
/// With a positive budget each eligible staple is priced through `source`
/// and kept only if it costs at most `deck_budget`; lookups that fail or find
/// nothing skip the staple. Without a budget the first eligible staples are
/// taken as is.
#[instrument(skip(source))]
pub async fn build_manabase(
    source: &dyn CardSource,
    identity: ColorSet,
    target_lands: usize,
    deck_budget: f64,
) -> Vec<LandEntry> {
    let cap = staple_cap(target_lands);
    let mut lands: Vec<LandEntry> = Vec::with_capacity(target_lands);

    for staple in eligible_staples(identity) {
        if lands.len() >= cap {
            break;
        }
        if deck_budget > 0.0 {
            match source.lookup_exact(staple.name).await {
                Ok(Some(card)) if card.price() <= deck_budget => {}
                Ok(Some(card)) => {
                    debug!("Skipping {} at {:.2} over budget", staple.name, card.price());
                    continue;
                }
                Ok(None) => {
                    debug!("No price found for {}, skipping", staple.name);
                    continue;
                }
                Err(e) => {
                    warn!("Price lookup for {} failed: {:#}", staple.name, e);
                    continue;
                }
            }
        }
        lands.push(LandEntry::staple(staple.name, staple.type_line));
    }

    let staples = lands.len();
    lands.extend(suggest_basics(identity, target_lands.saturating_sub(staples)));
    lands.truncate(target_lands);

    info!(
        "Manabase: {} staples, {} basics for {} lands",
        staples,
        lands.len() - staples,
        target_lands
    );
    lands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryCardSource;

    fn count_named(lands: &[LandEntry], name: &str) -> usize {
        lands.iter().filter(|l| l.name == name).count()
    }

    #[test]
    fn test_staple_cap() {
        assert_eq!(staple_cap(36), 8);
        assert_eq!(staple_cap(32), 8);
        assert_eq!(staple_cap(15), 6);
        assert_eq!(staple_cap(0), 0);
    }

    #[test]
    fn test_eligibility() {
        let simic = ColorSet::parse("UG");
        let names: Vec<&str> = eligible_staples(simic).map(|s| s.name).collect();
        assert!(names.contains(&"Simic Guildgate"));
        assert!(names.contains(&"Halimar Depths"));
        assert!(names.contains(&"Tranquil Thicket"));
        assert!(!names.contains(&"Izzet Guildgate"));
        assert!(!names.contains(&"Bojuka Bog"));
        assert_eq!(names.last(), Some(&"Rogue's Passage"));

        let mono_red: Vec<&str> = eligible_staples(ColorSet::parse("R")).map(|s| s.name).collect();
        assert_eq!(mono_red, vec!["Teetering Peaks"]);

        assert_eq!(eligible_staples(ColorSet::COLORLESS).count(), 0);
    }

    #[test]
    fn test_suggest_basics_split() {
        let basics = suggest_basics(ColorSet::parse("UG"), 28);
        assert_eq!(count_named(&basics, "Island"), 14);
        assert_eq!(count_named(&basics, "Forest"), 14);

        let esper = suggest_basics(ColorSet::parse("WUB"), 31);
        assert_eq!(count_named(&esper, "Plains"), 10);
        assert_eq!(count_named(&esper, "Island"), 10);
        assert_eq!(count_named(&esper, "Swamp"), 11);

        let odd = suggest_basics(ColorSet::parse("BR"), 29);
        assert_eq!(odd.len(), 29);
        assert_eq!(count_named(&odd, "Swamp"), 15);
        assert_eq!(count_named(&odd, "Mountain"), 14);

        assert!(suggest_basics(ColorSet::COLORLESS, 30).is_empty());
    }

    #[test]
    fn test_suggest_basics_never_overflows() {
        let basics = suggest_basics(ColorSet::parse("WUBRG"), 3);
        assert_eq!(basics.len(), 3);
        assert!(basics.iter().all(|l| l.is_basic()));
    }

    #[tokio::test]
    async fn test_simic_manabase_without_budget() {
        let source = MemoryCardSource::default();
        let lands = build_manabase(&source, ColorSet::parse("UG"), 36, 0.0).await;

        assert_eq!(lands.len(), 36);
        let staples: Vec<&LandEntry> = lands.iter().filter(|l| !l.is_basic()).collect();
        assert_eq!(staples.len(), 8);
        assert_eq!(staples[0].name, "Command Tower");
        assert_eq!(staples[5].name, "Simic Guildgate");
        assert_eq!(count_named(&lands, "Island"), 14);
        assert_eq!(count_named(&lands, "Forest"), 14);
    }

    #[tokio::test]
    async fn test_budget_skips_expensive_and_unknown_staples() {
        let source = MemoryCardSource::default()
            .with_price("Command Tower", 0.5)
            .with_price("Path of Ancestry", 0.4)
            .with_price("Exotic Orchard", 9.0)
            .with_failing_lookup("Terramorphic Expanse")
            .with_price("Evolving Wilds", 0.3)
            .with_price("Simic Guildgate", 0.2);

        let lands = build_manabase(&source, ColorSet::parse("UG"), 36, 1.0).await;

        let staples: Vec<&str> = lands
            .iter()
            .filter(|l| !l.is_basic())
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(
            staples,
            vec!["Command Tower", "Path of Ancestry", "Evolving Wilds", "Simic Guildgate"]
        );
        assert_eq!(lands.len(), 36);
        assert_eq!(count_named(&lands, "Island"), 16);
        assert_eq!(count_named(&lands, "Forest"), 16);
    }

    #[tokio::test]
    async fn test_colorless_manabase_has_no_basics() {
        let source = MemoryCardSource::default();
        let lands = build_manabase(&source, ColorSet::COLORLESS, 36, 0.0).await;
        assert!(lands.is_empty());
    }
}
