//! HTTP ability fetcher.
//!
//! Ability references are absolute URLs to an ability document
//! (`{"effect_entries": [{"effect": .., "language": {"name": ..}}]}`).
//! The fetcher is a thin `reqwest` wrapper: one GET per reference, no retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use dexrefresh_shared::{Ability, AbilityFetcher, DexError, FetchConfig, Result};

/// User-Agent string for ability requests.
const USER_AGENT: &str = concat!("dexrefresh/", env!("CARGO_PKG_VERSION"));

/// Maximum response size we accept (2 MB).
const MAX_RESPONSE_SIZE: u64 = 2 * 1024 * 1024;

/// Resolves ability references over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAbilityFetcher {
    client: Client,
    language: Option<String>,
}

impl HttpAbilityFetcher {
    /// Build a fetcher with its own HTTP client.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DexError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            language: config.language.clone(),
        })
    }

    /// Keep only effect entries whose language matches the configured one.
    fn filter_language(&self, mut ability: Ability) -> Ability {
        if let Some(lang) = &self.language {
            ability.effect_entries.retain(|e| &e.language.name == lang);
        }
        ability
    }
}

#[async_trait]
impl AbilityFetcher for HttpAbilityFetcher {
    #[instrument(skip(self))]
    async fn fetch_ability(&self, reference: &str) -> Result<Ability> {
        let url = parse_reference(reference)?;
        debug!(%url, "fetching ability");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| DexError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DexError::Network(format!("{url}: HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(DexError::validation(format!(
                    "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
                )));
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DexError::Network(format!("{url}: failed to read body: {e}")))?;

        let ability: Ability = serde_json::from_slice(&body)
            .map_err(|e| DexError::parse(format!("{url}: invalid ability document: {e}")))?;
        let ability = self.filter_language(ability);

        debug!(%url, effects = ability.effect_entries.len(), "ability resolved");
        Ok(ability)
    }
}

/// Validate that a reference is an absolute http(s) URL.
fn parse_reference(reference: &str) -> Result<Url> {
    let url = Url::parse(reference)
        .map_err(|e| DexError::validation(format!("invalid ability reference {reference:?}: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DexError::validation(format!(
            "ability reference {reference:?} uses unsupported scheme {other}"
        ))),
    }
}
