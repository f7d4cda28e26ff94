//! Pulls contact details out of a provider's public web page to pre-fill a lead.

use std::fmt::Display;
use std::pin::pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::providers::{NewLead, ProviderCategory};

const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;
}

/// Fetches pages over HTTP with a short timeout and a size cap.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new() -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("santurist-seed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ScrapeError::Fetch(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ScrapeError::Fetch(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status.as_u16()));
        }
        if response
            .content_length()
            .is_some_and(|length| length as usize > MAX_PAGE_BYTES)
        {
            return Err(ScrapeError::TooLarge);
        }

        let body = read_capped(response.bytes_stream(), MAX_PAGE_BYTES).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Collects a chunked body, stopping as soon as it grows past `limit`.
async fn read_capped<S, B, E>(chunks: S, limit: usize) -> Result<Vec<u8>, ScrapeError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut chunks = pin!(chunks);
    let mut body = Vec::new();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|err| ScrapeError::Fetch(err.to_string()))?;
        let chunk = chunk.as_ref();
        if body.len() + chunk.len() > limit {
            return Err(ScrapeError::TooLarge);
        }
        body.extend_from_slice(chunk);
    }
    Ok(body)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapedProvider {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
}

impl ScrapedProvider {
    /// Lead draft using the first e-mail and phone found.
    pub fn into_new_lead(self, category: ProviderCategory) -> NewLead {
        let business_name = self.title.clone().unwrap_or_else(|| self.url.clone());
        NewLead {
            business_name,
            category,
            contact_name: None,
            email: self.emails.into_iter().next(),
            phone: self.phones.into_iter().next(),
            website: Some(self.url),
            notes: self.description,
        }
    }
}

pub async fn scrape_provider(
    fetcher: &dyn PageFetcher,
    url: &str,
) -> Result<ScrapedProvider, ScrapeError> {
    let url = url.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ScrapeError::InvalidUrl(url.to_string()));
    }

    let html = fetcher.fetch(url).await?;
    let scraped = extract(url, &html)?;
    info!(
        url,
        emails = scraped.emails.len(),
        phones = scraped.phones.len(),
        "provider page scraped"
    );
    Ok(scraped)
}

fn extract(url: &str, html: &str) -> Result<ScrapedProvider, ScrapeError> {
    let title = Regex::new(r"(?is)<title[^>]*>(.*?)</title>")?;
    let description = Regex::new(
        r#"(?is)<meta\s+[^>]*name\s*=\s*["']description["'][^>]*content\s*=\s*["']([^"']*)["']"#,
    )?;
    let email = Regex::new(r"(?i)(?:mailto:)?([a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,})")?;
    let phone = Regex::new(r#"(?i)tel:([+0-9][0-9 ()-]{6,})"#)?;

    Ok(ScrapedProvider {
        url: url.to_string(),
        title: capture(&title, html),
        description: capture(&description, html),
        emails: unique(email.captures_iter(html).map(|c| c[1].to_ascii_lowercase())),
        phones: unique(phone.captures_iter(html).map(|c| c[1].trim().to_string())),
    })
}

fn capture(pattern: &Regex, html: &str) -> Option<String> {
    pattern
        .captures(html)
        .map(|captures| collapse_whitespace(&captures[1]))
        .filter(|value| !value.is_empty())
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unique(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("only http and https urls can be scraped: '{0}'")]
    InvalidUrl(String),
    #[error("page request failed: {0}")]
    Fetch(String),
    #[error("page responded with status {0}")]
    Status(u16),
    #[error("page exceeds {} bytes", MAX_PAGE_BYTES)]
    TooLarge,
    #[error("invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),
}
