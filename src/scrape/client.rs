use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use urlencoding::encode;

use super::parser::{parse_article, parse_listing};
use crate::Document;

/// Where documents come from. `fetch_listing` returns an empty list once the
/// listing is exhausted; any `Err` is a failure, never the end of the listing.
#[async_trait]
pub trait DocumentSource {
    async fn fetch_listing(&self, page: u32) -> Result<Vec<String>>;
    async fn fetch_article(&self, href: &str) -> Result<Document>;
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub journal: String,
    pub article_type: String,
    pub subject: String,
    pub date_range: String,
    pub order: String,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            journal: "srep".to_string(),
            article_type: "research".to_string(),
            subject: "mathematics-and-computing".to_string(),
            date_range: "last_year".to_string(),
            order: "relevance".to_string(),
        }
    }
}

pub struct NatureClient {
    client: Client,
    base_url: String,
    query: SearchQuery,
}

impl NatureClient {
    pub fn new(base_url: String, query: SearchQuery, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            query,
        })
    }

    pub fn search_url(&self, page: u32) -> String {
        format!(
            "{}/search?journal={}&article_type={}&subject={}&date_range={}&order={}&page={}",
            self.base_url,
            encode(&self.query.journal),
            encode(&self.query.article_type),
            encode(&self.query.subject),
            encode(&self.query.date_range),
            encode(&self.query.order),
            page
        )
    }

    pub fn article_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{}{}", self.base_url, href)
        }
    }

    async fn get_html(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(anyhow!("HTTP {} for {}", status, url));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl DocumentSource for NatureClient {
    async fn fetch_listing(&self, page: u32) -> Result<Vec<String>> {
        let html = self.get_html(&self.search_url(page)).await?;
        Ok(parse_listing(&html))
    }

    async fn fetch_article(&self, href: &str) -> Result<Document> {
        let html = self.get_html(&self.article_url(href)).await?;
        Ok(parse_article(&html))
    }
}
