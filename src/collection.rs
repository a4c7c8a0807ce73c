//! Owned-card inventory and the parsers for uploaded collection files.
//!
//! Supported inputs: JSON arrays of `{name, quantity|qty}`, delimited files
//! (`.csv`, `.tsv`, `.tab`, split on comma, tab or semicolon) with or without a
//! header row, and plain text lists of `N Card Name` or bare names.

use crate::types::normalize_name;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

static FIELD_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",|\t|;").expect("valid separator pattern"));

static QUANTITY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s+(.+?)\s*$").expect("valid quantity line pattern"));

/// Normalized card name to owned quantity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    cards: HashMap<String, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an inventory from `(name, quantity)` pairs, summing duplicates.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, u32)>) -> Self {
        let mut inventory = Self::new();
        for (name, qty) in pairs {
            inventory.add(name, qty);
        }
        inventory
    }

    /// Adds copies of a card.
    pub fn add(&mut self, name: &str, qty: u32) {
        let key = normalize_name(name);
        if key.is_empty() {
            return;
        }
        *self.cards.entry(key).or_insert(0) += qty;
    }

    /// Owned quantity, zero when absent.
    pub fn quantity(&self, name: &str) -> u32 {
        self.cards.get(&normalize_name(name)).copied().unwrap_or(0)
    }

    /// Presence check used by scoring; magnitude is irrelevant.
    pub fn owns(&self, name: &str) -> bool {
        self.quantity(name) > 0
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.cards.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Sums several inventories.
pub fn merge_inventories<'a>(inventories: impl IntoIterator<Item = &'a Inventory>) -> Inventory {
    let mut merged = Inventory::new();
    for inventory in inventories {
        for (name, qty) in inventory.iter() {
            merged.add(name, qty);
        }
    }
    merged
}

#[derive(Debug, Deserialize)]
struct JsonEntry {
    name: Option<String>,
    quantity: Option<u32>,
    qty: Option<u32>,
}

/// Parses an uploaded collection file; the extension of `file_name` selects the format.
pub fn parse_collection(file_name: &str, text: &str) -> Result<Inventory> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    let rows = match extension.as_str() {
        "json" => parse_json(text).with_context(|| format!("Failed to parse {}", file_name))?,
        "csv" | "tsv" | "tab" => parse_delimited(text),
        _ => parse_plain(text),
    };

    let mut inventory = Inventory::new();
    for (name, qty) in rows {
        inventory.add(&name, qty);
    }
    debug!("Parsed {} distinct cards from {}", inventory.len(), file_name);
    Ok(inventory)
}

fn parse_json(text: &str) -> Result<Vec<(String, u32)>> {
    let entries: Vec<JsonEntry> = serde_json::from_str(text).context("expected a JSON array")?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let name = entry.name?.trim().to_string();
            if name.is_empty() {
                return None;
            }
            let qty = entry.quantity.or(entry.qty).filter(|q| *q > 0).unwrap_or(1);
            Some((name, qty))
        })
        .collect())
}

fn parse_delimited(text: &str) -> Vec<(String, u32)> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();
    let Some(first) = lines.peek() else {
        return Vec::new();
    };

    let headers: Vec<String> = FIELD_SEPARATOR
        .split(first)
        .map(|h| h.trim().to_lowercase())
        .collect();
    let has_header = headers.iter().any(|h| h == "name");
    if has_header {
        lines.next();
    }

    let column = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));
    let name_col = column(&["name"]).or_else(|| column(&["card"]));
    let qty_col = column(&["count", "qty", "quantity"]);

    let mut rows = Vec::new();
    for line in lines {
        let cols: Vec<&str> = FIELD_SEPARATOR.split(line).map(str::trim).collect();
        let row = if has_header {
            let name = name_col.and_then(|i| cols.get(i)).copied().unwrap_or_default();
            let qty = qty_col
                .and_then(|i| cols.get(i))
                .and_then(|q| q.parse::<u32>().ok())
                .filter(|q| *q > 0)
                .unwrap_or(1);
            (name.to_string(), qty)
        } else {
            let a = cols.first().copied().unwrap_or_default();
            let b = cols.get(1).copied().unwrap_or_default();
            match (a.parse::<u32>(), b.parse::<u32>()) {
                (Ok(qty), _) => (b.to_string(), qty),
                (_, Ok(qty)) => (a.to_string(), qty),
                _ => (line.trim().to_string(), 1),
            }
        };
        if row.0.is_empty() {
            warn!("Skipping collection line without a card name: {:?}", line);
            continue;
        }
        rows.push(row);
    }
    rows
}

fn parse_plain(text: &str) -> Vec<(String, u32)> {
    text.lines()
        .filter_map(|line| {
            if let Some(caps) = QUANTITY_LINE.captures(line) {
                let qty = caps[1].parse::<u32>().ok()?;
                return Some((caps[2].trim().to_string(), qty));
            }
            let name = line.trim();
            (!name.is_empty()).then(|| (name.to_string(), 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_collection() {
        let text = r#"[
            {"name": "Sol Ring", "quantity": 2},
            {"name": "Arcane Signet", "qty": 1},
            {"name": "Command Tower"},
            {"set": "cmm"}
        ]"#;
        let inventory = parse_collection("export.JSON", text).unwrap();
        assert_eq!(inventory.quantity("sol ring"), 2);
        assert_eq!(inventory.quantity("Arcane Signet"), 1);
        assert_eq!(inventory.quantity("command tower"), 1);
        assert_eq!(inventory.len(), 3);
    }

    #[test]
    fn test_parse_invalid_json_is_an_error() {
        assert!(parse_collection("cards.json", "{not json").is_err());
    }

    #[test]
    fn test_parse_csv_with_header() {
        let text = "Count,Name,Set\n3,Lightning Bolt,2xm\n1,Counterspell,mh2\n";
        let inventory = parse_collection("moxfield.csv", text).unwrap();
        assert_eq!(inventory.quantity("lightning bolt"), 3);
        assert_eq!(inventory.quantity("counterspell"), 1);
    }

    #[test]
    fn test_parse_tsv_without_header() {
        let text = "2\tCultivate\nKodama's Reach\t1\nRampant Growth\n";
        let inventory = parse_collection("list.tsv", text).unwrap();
        assert_eq!(inventory.quantity("cultivate"), 2);
        assert_eq!(inventory.quantity("kodama's reach"), 1);
        assert_eq!(inventory.quantity("rampant growth"), 1);
    }

    #[test]
    fn test_parse_plain_text_sums_duplicates() {
        let text = "1 Sol Ring\n\n2 sol ring\nSwords to Plowshares\n";
        let inventory = parse_collection("deck.txt", text).unwrap();
        assert_eq!(inventory.quantity("Sol Ring"), 3);
        assert_eq!(inventory.quantity("swords to plowshares"), 1);
    }

    #[test]
    fn test_merge_inventories() {
        let a = Inventory::from_pairs([("Sol Ring", 1), ("Forest", 10)]);
        let b = Inventory::from_pairs([("sol ring", 2)]);
        let merged = merge_inventories([&a, &b]);
        assert_eq!(merged.quantity("sol ring"), 3);
        assert_eq!(merged.quantity("forest"), 10);
        assert!(!merged.owns("island"));
    }
}
