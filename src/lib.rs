//! deckforge - Commander deck generator
//!
//! Builds a 100-card singleton deck around a commander from a scored card
//! pool: constrained greedy selection of the nonlands, a color-proportioned
//! manabase, and a finalization step that either reaches exactly 99 cards or
//! fails explicitly.

pub mod types;
pub mod collection;
pub mod deck;
pub mod source;
pub mod export;
pub mod settings;

// Re-export main types for convenience
pub use collection::{merge_inventories, parse_collection, Inventory};
pub use deck::{DeckError, DeckGenerator, DeckRequest, DeckRequestBuilder, GeneratedDeck};
pub use source::{CardQuery, CardSource, MemoryCardSource, ScryfallConfig, ScryfallSource};
pub use types::{Candidate, Color, ColorSet, Deck, LandEntry};
