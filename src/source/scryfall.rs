//! Scryfall card source.
//!
//! Handles all HTTP traffic with the Scryfall API: query rendering, paging,
//! response caching, retries with exponential backoff and client-side rate
//! limiting. Loosely typed card JSON is mapped to `Candidate` here so the
//! pipeline never sees raw records.

use crate::source::{CardQuery, CardSource};
use crate::types::{Candidate, ColorSet};
use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use moka::future::Cache;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};
use tracing::{debug, info, instrument, warn};

/// Connection, caching and throttling settings for `ScryfallSource`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScryfallConfig {
    /// API root
    pub base_url: String,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Retries after the first failed attempt
    pub retry_attempts: usize,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Response cache TTL in seconds
    pub cache_ttl_seconds: u64,
    /// Maximum cached responses
    pub max_cache_entries: u64,
    /// Client-side request rate
    pub requests_per_second: u32,
    /// Maximum result pages followed per search
    pub max_pages: usize,
}

impl Default for ScryfallConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.scryfall.com".to_string(),
            user_agent: concat!("deckforge/", env!("CARGO_PKG_VERSION")).to_string(),
            retry_attempts: 2,
            timeout_seconds: 10,
            cache_ttl_seconds: 60,
            max_cache_entries: 1000,
            requests_per_second: 10,
            max_pages: 4,
        }
    }
}

/// One page of a Scryfall list response.
#[derive(Debug, Deserialize)]
struct CardList {
    #[serde(default)]
    data: Vec<ScryfallCard>,
    #[serde(default)]
    has_more: bool,
    next_page: Option<String>,
}

/// The subset of a Scryfall card object the pipeline needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ScryfallCard {
    pub name: String,
    pub mana_cost: Option<String>,
    pub cmc: Option<f64>,
    pub type_line: Option<String>,
    pub oracle_text: Option<String>,
    pub card_faces: Option<Vec<CardFace>>,
    #[serde(default)]
    pub color_identity: Vec<String>,
    pub edhrec_rank: Option<u32>,
    pub prices: Option<Prices>,
    #[serde(default)]
    pub legalities: HashMap<String, String>,
    pub oracle_id: Option<String>,
    pub lang: Option<String>,
}

/// One face of a multi-faced card.
#[derive(Debug, Clone, Deserialize)]
pub struct CardFace {
    pub mana_cost: Option<String>,
    pub type_line: Option<String>,
    pub oracle_text: Option<String>,
}

/// Price strings as Scryfall reports them.
#[derive(Debug, Clone, Deserialize)]
pub struct Prices {
    pub eur: Option<String>,
    pub eur_foil: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn join_faces<F>(faces: &[CardFace], field: F, separator: &str) -> String
where
    F: Fn(&CardFace) -> Option<&str>,
{
    faces
        .iter()
        .filter_map(field)
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

impl From<ScryfallCard> for Candidate {
    /// Top-level fields win; multi-faced cards fall back to their faces
    /// (text joined by newlines, type lines by ` // `, cost from the front face).
    fn from(card: ScryfallCard) -> Self {
        let faces = card.card_faces.unwrap_or_default();

        let oracle_text = non_empty(card.oracle_text)
            .unwrap_or_else(|| join_faces(&faces, |f| f.oracle_text.as_deref(), "\n"));
        let type_line = non_empty(card.type_line)
            .unwrap_or_else(|| join_faces(&faces, |f| f.type_line.as_deref(), " // "));
        let mana_cost = non_empty(card.mana_cost)
            .or_else(|| faces.first().and_then(|f| non_empty(f.mana_cost.clone())))
            .unwrap_or_default();

        let price_eur = card.prices.and_then(|p| {
            let parse = |v: Option<String>| v.and_then(|s| s.parse::<f64>().ok());
            parse(p.eur).or_else(|| parse(p.eur_foil))
        });

        Candidate {
            name: card.name,
            mana_cost,
            type_line,
            oracle_text,
            cmc: card.cmc.unwrap_or(0.0),
            color_identity: ColorSet::parse(&card.color_identity.concat()),
            edhrec_rank: card.edhrec_rank,
            price_eur,
            commander_legal: card.legalities.get("commander").map(String::as_str) == Some("legal"),
            oracle_id: card.oracle_id,
            lang: card.lang.unwrap_or_else(|| "en".to_string()),
        }
    }
}

const COMMANDER_TYPES: &str =
    r#"(type:"legendary creature" or (type:planeswalker and o:"can be your commander") or type:background)"#;

fn identity_filter(identity: ColorSet) -> String {
    if identity.is_empty() {
        "id:c".to_string()
    } else {
        format!("id<={}", identity)
    }
}

/// Search parameters (`q`, `unique`, `order`) for a typed query.
pub fn render_query(query: &CardQuery) -> Vec<(&'static str, String)> {
    match query {
        CardQuery::Pool { identity } => vec![
            ("q", format!("-type:land legal:commander {}", identity_filter(*identity))),
            ("unique", "cards".to_string()),
            ("order", "edhrec".to_string()),
        ],
        CardQuery::CommanderByName { name, lang } => {
            let name = name.replace('"', "");
            let mut q = format!(
                r#"legal:commander name:"{}" (type:legendary or o:"can be your commander")"#,
                name
            );
            let order = match lang {
                Some(lang) => {
                    q.push_str(&format!(" lang:{}", lang));
                    "released"
                }
                None => "edhrec",
            };
            vec![
                ("q", q),
                ("unique", "prints".to_string()),
                ("order", order.to_string()),
            ]
        }
        CardQuery::PrintingsOf { oracle_id, lang } => vec![
            ("q", format!("oracleid:{} lang:{}", oracle_id, lang)),
            ("unique", "prints".to_string()),
            ("order", "released".to_string()),
        ],
        CardQuery::RandomCommander { identity } => {
            let mut q = format!("legal:commander {}", COMMANDER_TYPES);
            if !identity.is_empty() {
                q.push_str(&format!(" {}", identity_filter(*identity)));
            }
            vec![("q", q)]
        }
    }
}

/// A failed Scryfall request.
#[derive(Debug, Error)]
enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Scryfall returned {0}")]
    Status(StatusCode),
    #[error("failed to parse Scryfall response: {0}")]
    Parse(#[source] reqwest::Error),
}

impl FetchError {
    /// Transport failures, rate limiting and server errors are worth retrying.
    fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status(status) => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            FetchError::Parse(_) => false,
        }
    }
}

/// `Ok(false)` for 404, `Ok(true)` for a body worth reading.
fn check_status(status: StatusCode) -> Result<bool, FetchError> {
    if status == StatusCode::NOT_FOUND {
        return Ok(false);
    }
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }
    Ok(true)
}

fn next_page(page: &CardList) -> Result<Option<Url>> {
    if !page.has_more {
        return Ok(None);
    }
    page.next_page
        .as_deref()
        .map(Url::parse)
        .transpose()
        .context("Invalid next_page URL")
}

/// Follows `next_page` links from `first` for at most `max_pages` pages.
/// A missing page (404) ends the walk. Returns the cards and the pages read.
async fn collect_pages<F, Fut>(
    first: Url,
    max_pages: usize,
    mut fetch: F,
) -> Result<(Vec<Candidate>, usize)>
where
    F: FnMut(Url) -> Fut,
    Fut: Future<Output = Result<Option<Arc<Value>>>>,
{
    let mut url = Some(first);
    let mut cards = Vec::new();
    let mut pages = 0;

    while let Some(page_url) = url.take() {
        if pages >= max_pages {
            break;
        }
        pages += 1;

        let Some(value) = fetch(page_url).await? else {
            break;
        };
        let page: CardList =
            serde_json::from_value((*value).clone()).context("Unexpected list object")?;

        url = next_page(&page)?;
        cards.extend(page.data.into_iter().map(Candidate::from));
    }

    Ok((cards, pages))
}

/// Card source backed by the Scryfall REST API.
pub struct ScryfallSource {
    http_client: Client,
    config: ScryfallConfig,
    response_cache: Cache<String, Arc<Value>>,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl ScryfallSource {
    /// Create a new Scryfall source.
    pub fn new(config: ScryfallConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        let response_cache = Cache::builder()
            .max_capacity(config.max_cache_entries)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();

        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN),
        );
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        info!(
            "Created Scryfall source for {} ({} req/s, cache ttl {}s)",
            config.base_url, config.requests_per_second, config.cache_ttl_seconds
        );

        Ok(Self {
            http_client,
            config,
            response_cache,
            rate_limiter,
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        Url::parse_with_params(&url, params).with_context(|| format!("Invalid URL {}", url))
    }

    /// Fetch JSON with caching and retries. `Ok(None)` means HTTP 404.
    #[instrument(skip(self, url), fields(url = %url))]
    async fn get_json(&self, url: Url, cacheable: bool) -> Result<Option<Arc<Value>>> {
        let key = url.to_string();
        if cacheable {
            if let Some(hit) = self.response_cache.get(&key).await {
                debug!("Cache hit for {}", key);
                return Ok(Some(hit));
            }
        }

        let retry_strategy = ExponentialBackoff::from_millis(2)
            .factor(100)
            .max_delay(Duration::from_secs(5))
            .take(self.config.retry_attempts);

        let value = RetryIf::spawn(
            retry_strategy,
            || self.fetch_once(url.clone()),
            FetchError::is_transient,
        )
        .await
        .with_context(|| format!("Scryfall request to {} failed", url))?;

        match value {
            Some(value) => {
                let value = Arc::new(value);
                if cacheable {
                    self.response_cache.insert(key, value.clone()).await;
                }
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn fetch_once(&self, url: Url) -> Result<Option<Value>, FetchError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .http_client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        match check_status(status) {
            Ok(true) => {}
            Ok(false) => {
                debug!("Scryfall returned 404 for {}", url);
                return Ok(None);
            }
            Err(e) => {
                warn!("Scryfall returned {} for {}", status, url);
                return Err(e);
            }
        }

        let value = response.json::<Value>().await.map_err(FetchError::Parse)?;
        Ok(Some(value))
    }

    fn parse_card(value: &Value) -> Result<Candidate> {
        let card: ScryfallCard =
            serde_json::from_value(value.clone()).context("Unexpected card object")?;
        Ok(card.into())
    }
}

#[async_trait]
impl CardSource for ScryfallSource {
    #[instrument(skip(self))]
    async fn search(&self, query: &CardQuery) -> Result<Vec<Candidate>> {
        let first = self.endpoint("/cards/search", &render_query(query))?;
        let (cards, pages) =
            collect_pages(first, self.config.max_pages, |url| self.get_json(url, true)).await?;

        debug!("Search {:?} returned {} cards over {} pages", query, cards.len(), pages);
        Ok(cards)
    }

    #[instrument(skip(self))]
    async fn random(&self, query: &CardQuery) -> Result<Option<Candidate>> {
        let url = self.endpoint("/cards/random", &render_query(query))?;
        match self.get_json(url, false).await? {
            Some(value) => Ok(Some(Self::parse_card(&value)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn lookup_exact(&self, name: &str) -> Result<Option<Candidate>> {
        let url = self.endpoint("/cards/named", &[("exact", name.to_string())])?;
        match self.get_json(url, true).await? {
            Some(value) => Ok(Some(Self::parse_card(&value)?)),
            None => Ok(None),
        }
    }
}
