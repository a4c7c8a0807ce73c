//! Role and type classification from card text and type lines.
//!
//! Patterns are matched against lower-cased text. Role rules are checked in a
//! fixed priority order and the first match wins, so balance counts stay
//! reproducible even when a card matches several patterns.

use crate::deck::types::{Role, TypeCategory};
use crate::types::Candidate;
use once_cell::sync::Lazy;
use regex::Regex;

static WRATHS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"destroy all .*creature|wrath|damnation|farewell|supreme verdict")
        .expect("valid wraths pattern")
});

static REMOVAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"destroy target|exile target|counter target").expect("valid removal pattern")
});

static DRAW: Lazy<Regex> = Lazy::new(|| Regex::new(r"draw .* card").expect("valid draw pattern"));

static RAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"add \{[wubrgc]\}|add [wubrgc]\b|add one mana|search your library.*land")
        .expect("valid ramp pattern")
});

static MANA_ABILITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"add \{|add one mana|add .* mana").expect("valid mana ability pattern")
});

/// Ordered role rules. Wraths must stay ahead of removal: "destroy all target
/// creatures" style text would otherwise count as spot removal.
static ROLE_RULES: Lazy<[(Role, &'static Regex); 4]> = Lazy::new(|| {
    [
        (Role::Wraths, &*WRATHS),
        (Role::Removal, &*REMOVAL),
        (Role::Draw, &*DRAW),
        (Role::Ramp, &*RAMP),
    ]
});

/// Role of a card from its rules text.
pub fn role_of(candidate: &Candidate) -> Role {
    role_of_text(&candidate.oracle_text)
}

/// Role of a raw rules text.
pub fn role_of_text(text: &str) -> Role {
    let text = text.to_lowercase();
    ROLE_RULES
        .iter()
        .find(|(_, pattern)| pattern.is_match(&text))
        .map(|(role, _)| *role)
        .unwrap_or(Role::Other)
}

/// Type category from the type line, first match in `TypeCategory::MATCH_ORDER`.
pub fn type_of(candidate: &Candidate) -> TypeCategory {
    let type_line = candidate.type_line.to_lowercase();
    TypeCategory::MATCH_ORDER
        .into_iter()
        .find(|category| type_line.contains(category.as_str()))
        .unwrap_or(TypeCategory::Other)
}

/// True if `land` is one of the card types (subtypes after the dash are ignored).
pub fn is_land(candidate: &Candidate) -> bool {
    candidate
        .type_line
        .split(['—', '/'])
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .any(|word| word.eq_ignore_ascii_case("land"))
}

/// A noncreature artifact with a mana ability.
pub fn is_mana_rock(candidate: &Candidate) -> bool {
    type_of(candidate) == TypeCategory::Artifact
        && MANA_ABILITY.is_match(&candidate.oracle_text.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_card(type_line: &str, text: &str) -> Candidate {
        let mut card = Candidate::new("Test Card", type_line);
        card.oracle_text = text.to_string();
        card
    }

    #[test]
    fn test_role_priority_wraths_over_removal() {
        let card = create_test_card(
            "Sorcery",
            "Destroy all creatures. Then exile target card from a graveyard.",
        );
        assert_eq!(role_of(&card), Role::Wraths);
    }

    #[test]
    fn test_role_priority_removal_over_draw() {
        let card = create_test_card("Instant", "Counter target spell. Draw a card.");
        assert_eq!(role_of(&card), Role::Removal);
    }

    #[test]
    fn test_role_draw_and_ramp() {
        assert_eq!(
            role_of(&create_test_card("Sorcery", "Draw two cards.")),
            Role::Draw
        );
        assert_eq!(
            role_of(&create_test_card("Artifact", "{T}: Add {C}{C}.")),
            Role::Ramp
        );
        assert_eq!(
            role_of(&create_test_card(
                "Sorcery",
                "Search your library for a basic land card, put it onto the battlefield tapped."
            )),
            Role::Ramp
        );
    }

    #[test]
    fn test_role_other() {
        let card = create_test_card("Creature — Bear", "");
        assert_eq!(role_of(&card), Role::Other);
    }

    #[test]
    fn test_type_order() {
        assert_eq!(
            type_of(&create_test_card("Artifact Creature — Golem", "")),
            TypeCategory::Creature
        );
        assert_eq!(
            type_of(&create_test_card("Legendary Enchantment Artifact", "")),
            TypeCategory::Artifact
        );
        assert_eq!(
            type_of(&create_test_card("Kindred Instant — Elf", "")),
            TypeCategory::Instant
        );
        assert_eq!(
            type_of(&create_test_card("Battle — Siege", "")),
            TypeCategory::Battle
        );
        assert_eq!(type_of(&create_test_card("Conspiracy", "")), TypeCategory::Other);
    }

    #[test]
    fn test_is_land_ignores_subtypes() {
        assert!(is_land(&create_test_card("Artifact Land", "")));
        assert!(is_land(&create_test_card("Land — Gate", "")));
        assert!(!is_land(&create_test_card("Creature — Landfall Elemental", "")));
        assert!(!is_land(&create_test_card("Sorcery", "Search your library for a land.")));
    }

    #[test]
    fn test_is_mana_rock() {
        assert!(is_mana_rock(&create_test_card("Artifact", "{T}: Add {C}{C}.")));
        assert!(is_mana_rock(&create_test_card(
            "Artifact",
            "{T}: Add one mana of any color."
        )));
        assert!(!is_mana_rock(&create_test_card(
            "Artifact Creature — Construct",
            "{T}: Add {C}."
        )));
        assert!(!is_mana_rock(&create_test_card("Artifact", "Draw a card.")));
    }
}
