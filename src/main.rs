//! Command-line entry point: generate one deck from Scryfall and print it.
//!
//! Usage: deckforge [COMMANDER NAME] [--random [IDENTITY]] [--collection FILE]...
//!                  [--format text|moxfield|archidekt] [--settings DB]

use anyhow::{anyhow, Context, Result};
use deckforge::collection::{merge_inventories, parse_collection, Inventory};
use deckforge::deck::{CommanderMode, DeckGenerator, DeckStats};
use deckforge::export::{to_archidekt_csv, to_moxfield_csv, to_text};
use deckforge::settings::{SettingsStore, SqliteSettingsStore};
use deckforge::source::{ScryfallConfig, ScryfallSource};
use deckforge::types::ColorSet;
use std::sync::Arc;
use tracing::{info, Level};

const DEFAULT_SETTINGS_DB: &str = "./deckforge.db";

#[derive(Debug, Default)]
struct Args {
    commander: Option<String>,
    random: Option<ColorSet>,
    collections: Vec<String>,
    format: Option<String>,
    settings_db: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut name_parts = Vec::new();
    let mut iter = std::env::args().skip(1).peekable();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--random" => {
                let identity = iter
                    .next_if(|next| !next.starts_with("--"))
                    .map(|symbols| ColorSet::parse(&symbols))
                    .unwrap_or(ColorSet::COLORLESS);
                args.random = Some(identity);
            }
            "--collection" => args
                .collections
                .push(iter.next().ok_or_else(|| anyhow!("--collection needs a file"))?),
            "--format" => {
                args.format = Some(iter.next().ok_or_else(|| anyhow!("--format needs a value"))?)
            }
            "--settings" => {
                args.settings_db = Some(iter.next().ok_or_else(|| anyhow!("--settings needs a path"))?)
            }
            _ => name_parts.push(arg),
        }
    }

    if !name_parts.is_empty() {
        args.commander = Some(name_parts.join(" "));
    }
    Ok(args)
}

async fn load_inventory(files: &[String]) -> Result<Inventory> {
    let mut inventories = Vec::with_capacity(files.len());
    for file in files {
        let text = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read collection file {}", file))?;
        inventories.push(parse_collection(file, &text)?);
    }
    Ok(merge_inventories(&inventories))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args()?;

    let store = SqliteSettingsStore::open(
        args.settings_db.as_deref().unwrap_or(DEFAULT_SETTINGS_DB),
    )
    .await?;
    let settings = store.load().await?;

    let mut request = settings.to_request();
    if let Some(identity) = args.random {
        request.commander = CommanderMode::Random;
        request.desired_identity = identity;
    } else if let Some(name) = &args.commander {
        request.commander = CommanderMode::Select(name.clone());
    }

    let inventory = load_inventory(&args.collections).await?;
    info!("Loaded collection with {} distinct cards", inventory.len());

    let source = Arc::new(ScryfallSource::new(ScryfallConfig::default())?);
    let generator = DeckGenerator::new(source);

    let progress = |percent: u8, stage: &str| info!("[{:>3}%] {}", percent, stage);
    let generated = generator.generate(&request, &inventory, &progress).await?;

    let mut settings = settings;
    settings.update_from_request(&request);
    store.save(&settings).await?;

    let deck = &generated.deck;
    let output = match args.format.as_deref().unwrap_or("text") {
        "text" => to_text(deck),
        "moxfield" => to_moxfield_csv(deck)?,
        "archidekt" => to_archidekt_csv(deck)?,
        other => return Err(anyhow!("unknown export format {:?}", other)),
    };
    println!("{}", output);

    let stats = DeckStats::compute(deck, &inventory, &request.targets);
    info!(
        "Average mana value {:.2}, owned {}/{} ({}%), roles {:?}",
        stats.average_cmc, stats.owned_count, stats.total, stats.owned_percent, stats.balance
    );

    Ok(())
}
