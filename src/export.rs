//! Deck exporters: plain text, Moxfield CSV and Archidekt CSV.
//!
//! Nonlands are listed one per line; lands are aggregated by name in the
//! order they first appear.

use crate::types::Deck;
use anyhow::{Context, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};

/// Land names with their quantities, in first-seen order.
pub fn aggregate_lands(deck: &Deck) -> Vec<(&str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for land in &deck.lands {
        match counts.iter_mut().find(|(name, _)| *name == land.name) {
            Some((_, qty)) => *qty += 1,
            None => counts.push((land.name.as_str(), 1)),
        }
    }
    counts
}

/// `(quantity, name)` rows: commander, nonlands, aggregated lands.
fn deck_rows(deck: &Deck) -> Vec<(usize, &str)> {
    let mut rows = vec![(1, deck.commander.name.as_str())];
    rows.extend(deck.nonlands.iter().map(|c| (1, c.name.as_str())));
    rows.extend(aggregate_lands(deck).into_iter().map(|(name, qty)| (qty, name)));
    rows
}

/// Plain-text decklist.
pub fn to_text(deck: &Deck) -> String {
    let mut lines = vec![format!("Commander: {}", deck.commander.name), String::new()];

    if !deck.nonlands.is_empty() {
        lines.push("Nonlands:".to_string());
        lines.extend(deck.nonlands.iter().map(|c| format!("1 {}", c.name)));
        lines.push(String::new());
    }

    if !deck.lands.is_empty() {
        lines.push("Lands:".to_string());
        lines.extend(
            aggregate_lands(deck)
                .into_iter()
                .map(|(name, qty)| format!("{} {}", qty, name)),
        );
    }

    lines.join("\n")
}

fn write_csv(header: &[&str], rows: impl IntoIterator<Item = Vec<String>>) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(header).context("Failed to write CSV header")?;
    for row in rows {
        writer.write_record(&row).context("Failed to write CSV row")?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV writer")?;
    let mut text = String::from_utf8(bytes).context("CSV output is not UTF-8")?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Moxfield import CSV.
pub fn to_moxfield_csv(deck: &Deck) -> Result<String> {
    write_csv(
        &["Count", "Name", "Set", "Collector Number", "Alter", "Condition", "Language", "Foil"],
        deck_rows(deck).into_iter().map(|(qty, name)| {
            vec![
                qty.to_string(),
                name.to_string(),
                String::new(),
                String::new(),
                String::new(),
                "Near Mint".to_string(),
                "English".to_string(),
                "No".to_string(),
            ]
        }),
    )
}

/// Archidekt import CSV.
pub fn to_archidekt_csv(deck: &Deck) -> Result<String> {
    write_csv(
        &["Quantity", "Card Name", "Set Code", "Collector Number", "Language", "Foil"],
        deck_rows(deck).into_iter().map(|(qty, name)| {
            vec![
                qty.to_string(),
                name.to_string(),
                String::new(),
                String::new(),
                "en".to_string(),
                "false".to_string(),
            ]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BasicLand, Candidate, LandEntry};

    fn create_test_deck() -> Deck {
        Deck {
            commander: Candidate::new("Tatyova, Benthic Druid", "Legendary Creature — Merfolk Druid"),
            nonlands: vec![
                Candidate::new("Cultivate", "Sorcery"),
                Candidate::new("Kodama's Reach", "Sorcery — Arcane"),
            ],
            lands: vec![
                LandEntry::staple("Command Tower", "Land"),
                LandEntry::basic(BasicLand::Island),
                LandEntry::basic(BasicLand::Forest),
                LandEntry::basic(BasicLand::Island),
            ],
        }
    }

    #[test]
    fn test_to_text() {
        let text = to_text(&create_test_deck());
        assert_eq!(
            text,
            "Commander: Tatyova, Benthic Druid\n\nNonlands:\n1 Cultivate\n1 Kodama's Reach\n\nLands:\n1 Command Tower\n2 Island\n1 Forest"
        );
    }

    #[test]
    fn test_to_moxfield_csv() {
        let csv = to_moxfield_csv(&create_test_deck()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            r#""Count","Name","Set","Collector Number","Alter","Condition","Language","Foil""#
        );
        assert_eq!(
            lines[1],
            r#""1","Tatyova, Benthic Druid","","","","Near Mint","English","No""#
        );
        assert_eq!(lines[5], r#""2","Island","","","","Near Mint","English","No""#);
        assert_eq!(lines.len(), 7);
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn test_to_archidekt_csv_escapes_quotes() {
        let mut deck = create_test_deck();
        deck.nonlands.push(Candidate::new("\"Ach! Hans, Run!\"", "Enchantment"));
        let csv = to_archidekt_csv(&deck).unwrap();
        assert!(csv.starts_with(r#""Quantity","Card Name","Set Code","Collector Number","Language","Foil""#));
        assert!(csv.contains(r#""1","""Ach! Hans, Run!""","","","en","false""#));
    }
}
