//! Cached HTTP layer shared by the Entrez clients
//!
//! All eutils traffic goes through [`EutilsClient::get`], which memoizes
//! response bodies keyed by URL when a cache is configured. Requests block
//! the calling task until the response arrives; there is no retry, backoff,
//! or rate limiting.

use std::collections::BTreeSet;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{CacheError, CallCache};

use super::EUTILS_BASE_URL;

/// Errors that can occur when talking to the eutils endpoints
#[derive(Debug, Error)]
pub enum EutilsError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The server answered with something other than 200 OK
    #[error("unexpected HTTP status {status} for {url}")]
    UnexpectedStatus { url: String, status: StatusCode },

    /// Failed to parse a JSON response
    #[error("failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Reading or writing the response cache failed
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// HTTP client for eutils with optional response caching
#[derive(Debug, Clone)]
pub struct EutilsClient {
    client: Client,
    cache: Option<CallCache>,
    update_cache: bool,
}

impl Default for EutilsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl EutilsClient {
    /// Creates a client with no response cache.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            cache: None,
            update_cache: false,
        }
    }

    /// Creates a client over a custom `reqwest::Client`.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            cache: None,
            update_cache: false,
        }
    }

    /// Memoizes response bodies in the given cache, keyed by URL.
    pub fn with_cache(mut self, cache: CallCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Forces fresh requests, overwriting any cached responses.
    pub fn with_update_cache(mut self, update_cache: bool) -> Self {
        self.update_cache = update_cache;
        self
    }

    /// Performs a GET, serving the body from the cache when possible.
    pub(crate) async fn get(&self, url: &str) -> Result<String, EutilsError> {
        let Some(cache) = &self.cache else {
            return self.fetch(url).await;
        };

        let path = cache.entry_path("cached_request", &[url]);
        if !self.update_cache {
            match cache.load::<String>(&path) {
                Ok(body) => {
                    debug!(url, "serving response from cache");
                    return Ok(body);
                }
                Err(CacheError::Missing(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }

        let body = self.fetch(url).await?;
        cache.store(&path, &body)?;
        Ok(body)
    }

    async fn fetch(&self, url: &str) -> Result<String, EutilsError> {
        info!(url, "GET");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(EutilsError::UnexpectedStatus {
                url: url.to_string(),
                status,
            });
        }
        Ok(response.text().await?)
    }

    /// Runs an esearch query and returns the matching ids.
    ///
    /// `term` is inserted into the URL verbatim, so spaces must already be
    /// percent-encoded (e.g. `PRJNA961747[Project%20Accession]`).
    pub(crate) async fn esearch(
        &self,
        db: &str,
        term: &str,
        retmax: Option<u32>,
    ) -> Result<Vec<String>, EutilsError> {
        let mut url = format!("{EUTILS_BASE_URL}esearch.fcgi?db={db}&term={term}&retmode=json");
        if let Some(retmax) = retmax {
            url.push_str(&format!("&retmax={retmax}"));
        }
        let body = self.get(&url).await?;
        parse_esearch(&body)
    }

    /// Runs an elink query and returns every linked id, deduplicated and
    /// sorted.
    pub(crate) async fn elink(
        &self,
        dbfrom: &str,
        db: &str,
        id: &str,
    ) -> Result<Vec<String>, EutilsError> {
        let url =
            format!("{EUTILS_BASE_URL}elink.fcgi?dbfrom={dbfrom}&db={db}&id={id}&retmode=json");
        let body = self.get(&url).await?;
        parse_elink(&body)
    }

    /// Fetches a full record as XML.
    pub(crate) async fn efetch(&self, db: &str, id: &str) -> Result<String, EutilsError> {
        let url = format!("{EUTILS_BASE_URL}efetch.fcgi?db={db}&id={id}");
        self.get(&url).await
    }
}

fn parse_esearch(body: &str) -> Result<Vec<String>, EutilsError> {
    let envelope: EsearchEnvelope = serde_json::from_str(body)?;
    Ok(envelope.esearchresult.idlist)
}

fn parse_elink(body: &str) -> Result<Vec<String>, EutilsError> {
    let envelope: ElinkEnvelope = serde_json::from_str(body)?;
    let mut ids = BTreeSet::new();
    for linkset in envelope.linksets {
        for linksetdb in linkset.linksetdbs {
            ids.extend(linksetdb.links);
        }
    }
    Ok(ids.into_iter().collect())
}

/// esearch JSON response envelope
#[derive(Debug, Deserialize)]
struct EsearchEnvelope {
    esearchresult: EsearchResult,
}

#[derive(Debug, Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// elink JSON response envelope
#[derive(Debug, Deserialize)]
struct ElinkEnvelope {
    #[serde(default)]
    linksets: Vec<Linkset>,
}

#[derive(Debug, Deserialize)]
struct Linkset {
    #[serde(default)]
    linksetdbs: Vec<LinksetDb>,
}

#[derive(Debug, Deserialize)]
struct LinksetDb {
    #[serde(default)]
    links: Vec<String>,
}
