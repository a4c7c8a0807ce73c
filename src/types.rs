//! Core card model shared by the deck pipeline and the card sources.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five colors of the WUBRG alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Blue,
    Black,
    Red,
    Green,
}

impl Color {
    /// All colors in canonical WUBRG order.
    pub const ALL: [Color; 5] = [
        Color::White,
        Color::Blue,
        Color::Black,
        Color::Red,
        Color::Green,
    ];

    pub fn symbol(self) -> char {
        match self {
            Color::White => 'W',
            Color::Blue => 'U',
            Color::Black => 'B',
            Color::Red => 'R',
            Color::Green => 'G',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Color> {
        match symbol.to_ascii_uppercase() {
            'W' => Some(Color::White),
            'U' => Some(Color::Blue),
            'B' => Some(Color::Black),
            'R' => Some(Color::Red),
            'G' => Some(Color::Green),
            _ => None,
        }
    }

    /// The basic land producing this color.
    pub fn basic_land(self) -> BasicLand {
        match self {
            Color::White => BasicLand::Plains,
            Color::Blue => BasicLand::Island,
            Color::Black => BasicLand::Swamp,
            Color::Red => BasicLand::Mountain,
            Color::Green => BasicLand::Forest,
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Color::White => 1 << 0,
            Color::Blue => 1 << 1,
            Color::Black => 1 << 2,
            Color::Red => 1 << 3,
            Color::Green => 1 << 4,
        }
    }
}

/// A color identity stored as bitflags. Iteration is always in WUBRG order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ColorSet(u8);

impl ColorSet {
    pub const COLORLESS: Self = Self(0);

    /// Parses a color string such as `"UG"`. Characters outside WUBRG are ignored.
    pub fn parse(symbols: &str) -> Self {
        symbols
            .chars()
            .filter_map(Color::from_symbol)
            .collect()
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, color: Color) -> bool {
        self.0 & color.bit() != 0
    }

    /// True if every color of `other` is also in `self`.
    pub fn contains_all(self, other: ColorSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if `self` fits inside `identity` (the Commander legality test).
    pub fn is_subset_of(self, identity: ColorSet) -> bool {
        identity.contains_all(self)
    }

    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn with(self, color: Color) -> Self {
        Self(self.0 | color.bit())
    }

    pub fn iter(self) -> impl Iterator<Item = Color> {
        Color::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Color> for ColorSet {
    fn from_iter<T: IntoIterator<Item = Color>>(iter: T) -> Self {
        iter.into_iter()
            .fold(ColorSet::COLORLESS, |set, color| set.with(color))
    }
}

impl fmt::Display for ColorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for color in self.iter() {
            write!(f, "{}", color.symbol())?;
        }
        Ok(())
    }
}

impl From<String> for ColorSet {
    fn from(value: String) -> Self {
        ColorSet::parse(&value)
    }
}

impl From<ColorSet> for String {
    fn from(value: ColorSet) -> Self {
        value.to_string()
    }
}

/// Normalizes a card name for inventory lookups and identity keys.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A card eligible for deck inclusion, already mapped from the card source's
/// loosely typed records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Card name (front face name for multi-faced cards)
    pub name: String,
    /// Mana cost signature, e.g. `{2}{G}`
    pub mana_cost: String,
    /// Full type line
    pub type_line: String,
    /// Rules text, faces joined by newlines
    pub oracle_text: String,
    /// Mana value
    pub cmc: f64,
    /// Color identity
    pub color_identity: ColorSet,
    /// Popularity rank, lower is more popular
    pub edhrec_rank: Option<u32>,
    /// Price in EUR when known
    pub price_eur: Option<f64>,
    /// Whether the card is legal in Commander
    pub commander_legal: bool,
    /// Oracle id shared by all printings
    pub oracle_id: Option<String>,
    /// Printing language code
    pub lang: String,
}

impl Candidate {
    /// Creates a candidate with only a name and type line set.
    pub fn new(name: impl Into<String>, type_line: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mana_cost: String::new(),
            type_line: type_line.into(),
            oracle_text: String::new(),
            cmc: 0.0,
            color_identity: ColorSet::COLORLESS,
            edhrec_rank: None,
            price_eur: None,
            commander_legal: true,
            oracle_id: None,
            lang: "en".to_string(),
        }
    }

    /// Singleton key: normalized name plus mana cost.
    pub fn identity_key(&self) -> String {
        format!("{}:{}", normalize_name(&self.name), self.mana_cost)
    }

    /// Price used by budget checks; unknown prices count as free.
    pub fn price(&self) -> f64 {
        self.price_eur.unwrap_or(0.0)
    }

    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Basic land types, including Wastes for colorless fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasicLand {
    Plains,
    Island,
    Swamp,
    Mountain,
    Forest,
    Wastes,
}

impl BasicLand {
    pub fn name(self) -> &'static str {
        match self {
            BasicLand::Plains => "Plains",
            BasicLand::Island => "Island",
            BasicLand::Swamp => "Swamp",
            BasicLand::Mountain => "Mountain",
            BasicLand::Forest => "Forest",
            BasicLand::Wastes => "Wastes",
        }
    }

    pub fn type_line(self) -> &'static str {
        match self {
            BasicLand::Plains => "Basic Land — Plains",
            BasicLand::Island => "Basic Land — Island",
            BasicLand::Swamp => "Basic Land — Swamp",
            BasicLand::Mountain => "Basic Land — Mountain",
            BasicLand::Forest => "Basic Land — Forest",
            BasicLand::Wastes => "Basic Land",
        }
    }
}

/// Whether a manabase entry came from the staple catalog or is a basic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LandKind {
    Staple,
    Basic,
}

/// A manabase entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandEntry {
    pub name: String,
    pub type_line: String,
    pub kind: LandKind,
}

impl LandEntry {
    pub fn staple(name: &str, type_line: &str) -> Self {
        Self {
            name: name.to_string(),
            type_line: type_line.to_string(),
            kind: LandKind::Staple,
        }
    }

    pub fn basic(land: BasicLand) -> Self {
        Self {
            name: land.name().to_string(),
            type_line: land.type_line().to_string(),
            kind: LandKind::Basic,
        }
    }

    pub fn is_basic(&self) -> bool {
        self.kind == LandKind::Basic
    }
}

/// A finished deck: commander plus exactly 99 other cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
    pub commander: Candidate,
    pub nonlands: Vec<Candidate>,
    pub lands: Vec<LandEntry>,
}

impl Deck {
    /// Cards in the 99, commander excluded.
    pub fn main_deck_size(&self) -> usize {
        self.nonlands.len() + self.lands.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_set_parse_ignores_noise() {
        let set = ColorSet::parse("g-u x");
        assert_eq!(set.count(), 2);
        assert!(set.contains(Color::Blue));
        assert!(set.contains(Color::Green));
        assert_eq!(set.to_string(), "UG");
    }

    #[test]
    fn test_color_set_subset() {
        let simic = ColorSet::parse("UG");
        assert!(ColorSet::parse("G").is_subset_of(simic));
        assert!(ColorSet::COLORLESS.is_subset_of(simic));
        assert!(!ColorSet::parse("UR").is_subset_of(simic));
    }

    #[test]
    fn test_color_set_serde_as_string() {
        let json = serde_json::to_string(&ColorSet::parse("WB")).unwrap();
        assert_eq!(json, "\"WB\"");
        let back: ColorSet = serde_json::from_str("\"bw\"").unwrap();
        assert_eq!(back, ColorSet::parse("WB"));
    }

    #[test]
    fn test_identity_key_normalizes_name() {
        let mut a = Candidate::new("Sol Ring", "Artifact");
        a.mana_cost = "{1}".to_string();
        let mut b = Candidate::new("  sol ring ", "Artifact");
        b.mana_cost = "{1}".to_string();
        b.lang = "fr".to_string();
        assert_eq!(a.identity_key(), b.identity_key());
    }
}
