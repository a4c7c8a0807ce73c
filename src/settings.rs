//! Persisted user settings.
//!
//! Settings live as one JSON blob under a fixed key. Partial updates are a
//! shallow merge over the stored object, so keys written by other callers
//! survive.

use crate::deck::{CommanderMode, DeckRequest, DeckRequestBuilder, RoleTargets};
use crate::types::ColorSet;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite, Transaction};
use tracing::{debug, info, warn};

/// Key the settings blob is stored under.
pub const SETTINGS_KEY: &str = "ccraft:v1";

/// Whether the user picks the commander or draws one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommanderChoice {
    #[default]
    Select,
    Random,
}

/// User-facing generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub commander_mode: CommanderChoice,
    pub chosen_commander: String,
    #[serde(rename = "desiredCI")]
    pub desired_ci: ColorSet,
    pub mechanics: Vec<String>,
    pub edhrec_weight: f64,
    pub owned_weight: f64,
    pub deck_budget: f64,
    pub target_lands: usize,
    pub targets: RoleTargets,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            commander_mode: CommanderChoice::Select,
            chosen_commander: String::new(),
            desired_ci: ColorSet::COLORLESS,
            mechanics: Vec::new(),
            edhrec_weight: 60.0,
            owned_weight: 40.0,
            deck_budget: 200.0,
            target_lands: 36,
            targets: RoleTargets::default(),
        }
    }
}

impl Settings {
    /// Deck request for these settings. Select mode without a name falls back
    /// to a random commander.
    pub fn to_request(&self) -> DeckRequest {
        let builder = DeckRequestBuilder::new()
            .with_weights(self.edhrec_weight, self.owned_weight)
            .with_budget(self.deck_budget)
            .with_mechanics(self.mechanics.iter().cloned())
            .with_lands(self.target_lands)
            .with_targets(self.targets);

        let name = self.chosen_commander.trim();
        match self.commander_mode {
            CommanderChoice::Select if !name.is_empty() => builder.with_commander(name).build(),
            _ => builder.with_random_commander(self.desired_ci).build(),
        }
    }

    /// Stores a request's choices back into the settings.
    pub fn update_from_request(&mut self, request: &DeckRequest) {
        match &request.commander {
            CommanderMode::Select(name) => {
                self.commander_mode = CommanderChoice::Select;
                self.chosen_commander = name.clone();
            }
            CommanderMode::Random => self.commander_mode = CommanderChoice::Random,
        }
        self.desired_ci = request.desired_identity;
        self.mechanics = request.weights.mechanics.clone();
        self.edhrec_weight = request.weights.edhrec_weight;
        self.owned_weight = request.weights.owned_weight;
        self.deck_budget = request.weights.deck_budget;
        self.target_lands = request.target_lands;
        self.targets = request.targets;
    }
}

/// Storage contract for settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Stored settings, defaults when nothing or nothing readable is stored.
    async fn load(&self) -> Result<Settings>;

    /// Writes every settings field over the stored blob. Keys the settings
    /// type does not know about are kept.
    async fn save(&self, settings: &Settings) -> Result<()>;

    /// Shallow-merges a JSON object over the stored blob and returns the result.
    async fn merge(&self, partial: Value) -> Result<Settings>;
}

/// SQLite-backed settings store.
pub struct SqliteSettingsStore {
    pool: Pool<Sqlite>,
}

impl SqliteSettingsStore {
    /// Opens (creating if needed) a database file.
    pub async fn open(path: &str) -> Result<Self> {
        Self::connect(&format!("sqlite:{}?mode=rwc", path), 5).await
    }

    /// Private in-memory database, one connection so it outlives each query.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .context("Failed to connect to SQLite database")?;

        Self::create_schema(&pool).await?;
        info!("Settings store connected to {}", url);

        Ok(Self { pool })
    }

    async fn create_schema(pool: &Pool<Sqlite>) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await
        .context("Failed to create settings table")?;
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// When the blob was last written.
    pub async fn updated_at(&self) -> Result<Option<DateTime<Utc>>> {
        let millis: Option<i64> =
            sqlx::query_scalar("SELECT updated_at FROM settings WHERE key = ?")
                .bind(SETTINGS_KEY)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to read settings timestamp")?;
        Ok(millis.and_then(DateTime::<Utc>::from_timestamp_millis))
    }

    async fn read_blob(tx: &mut Transaction<'_, Sqlite>) -> Result<Map<String, Value>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(SETTINGS_KEY)
            .fetch_optional(&mut **tx)
            .await
            .context("Failed to read settings")?;

        let Some(raw) = raw else {
            return Ok(Map::new());
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => {
                warn!("Stored settings are not a JSON object, starting over");
                Ok(Map::new())
            }
        }
    }

    async fn write_blob(tx: &mut Transaction<'_, Sqlite>, blob: &Map<String, Value>) -> Result<()> {
        let value = serde_json::to_string(blob).context("Failed to serialize settings")?;
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(SETTINGS_KEY)
        .bind(value)
        .bind(Utc::now().timestamp_millis())
        .execute(&mut **tx)
        .await
        .context("Failed to write settings")?;
        Ok(())
    }

    fn parse(blob: Map<String, Value>) -> Settings {
        serde_json::from_value(Value::Object(blob)).unwrap_or_else(|e| {
            warn!("Stored settings are unreadable ({}), using defaults", e);
            Settings::default()
        })
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn load(&self) -> Result<Settings> {
        let mut tx = self.pool.begin().await?;
        let blob = Self::read_blob(&mut tx).await?;
        tx.commit().await?;
        Ok(Self::parse(blob))
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        let value = serde_json::to_value(settings).context("Failed to serialize settings")?;
        self.merge(value).await?;
        debug!("Saved settings");
        Ok(())
    }

    async fn merge(&self, partial: Value) -> Result<Settings> {
        let Value::Object(partial) = partial else {
            return Err(anyhow!("settings update must be a JSON object"));
        };

        let mut tx = self.pool.begin().await?;
        let mut blob = Self::read_blob(&mut tx).await?;
        let keys: Vec<String> = partial.keys().cloned().collect();
        blob.extend(partial);
        Self::write_blob(&mut tx, &blob).await?;
        tx.commit().await?;

        debug!("Merged settings keys {:?}", keys);
        Ok(Self::parse(blob))
    }
}
