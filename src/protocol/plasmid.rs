//! Addgene plasmid lookup
//!
//! Fetches `<base>/<id>/` and reads the page heading and the
//! `.features-list li` entries. Single unauthenticated fetch; no caching or
//! retry.

use reqwest::Client;
use scraper::{Html, Selector};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::DEFAULT_ADDGENE_BASE;

#[derive(Debug, Error)]
pub enum PlasmidError {
    #[error("invalid plasmid id {0:?}")]
    InvalidId(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("registry returned status {0}")]
    Status(u16),

    #[error("page has no plasmid name heading")]
    MissingName,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlasmidRecord {
    pub name: String,
    pub features: Vec<String>,
    pub url: String,
}

pub struct PlasmidClient {
    client: Client,
    base_url: String,
}

impl PlasmidClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_ADDGENE_BASE)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn page_url(&self, plasmid_id: &str) -> Result<String, PlasmidError> {
        let id = plasmid_id.trim();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(PlasmidError::InvalidId(plasmid_id.to_string()));
        }
        Ok(format!("{}/{}/", self.base_url, id))
    }

    pub async fn fetch(&self, plasmid_id: &str) -> Result<PlasmidRecord, PlasmidError> {
        let url = self.page_url(plasmid_id)?;
        info!(url = %url, "Fetching plasmid page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PlasmidError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PlasmidError::Status(response.status().as_u16()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| PlasmidError::Request(e.to_string()))?;

        parse_plasmid_page(&html, &url)
    }
}

impl Default for PlasmidClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Read name and features out of a plasmid page
pub fn parse_plasmid_page(html: &str, url: &str) -> Result<PlasmidRecord, PlasmidError> {
    let document = Html::parse_document(html);
    let heading = Selector::parse("h1").unwrap_or_else(|_| unreachable!());
    let feature_items = Selector::parse(".features-list li").unwrap_or_else(|_| unreachable!());

    let name = document
        .select(&heading)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|name| !name.is_empty())
        .ok_or(PlasmidError::MissingName)?;

    let features = document
        .select(&feature_items)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|feature| !feature.is_empty())
        .collect();

    Ok(PlasmidRecord {
        name,
        features,
        url: url.to_string(),
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
