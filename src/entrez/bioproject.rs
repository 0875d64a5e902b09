//! BioProject metadata from NCBI Entrez
//!
//! A BioProject groups the samples and experiments of one sequencing
//! project. The esearch endpoint resolves the human-readable accession
//! (e.g. `PRJNA961747`) to the numeric id, and efetch returns the project
//! record as XML.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::http::{EutilsClient, EutilsError};
use super::xml::{attribute, child, child_text, XmlError};
use super::{ensure_numeric_id, InvalidIdError};

/// Metadata for a single BioProject record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BioProject {
    /// Human-readable accession (e.g. `PRJNA961747`)
    pub accession: String,
    /// Numeric Entrez id (e.g. `961747`)
    pub id: String,
    /// Short project name, when the submitter provided one
    pub name: Option<String>,
    /// One-line project title
    pub title: String,
    /// Free-text project description
    pub description: String,
    /// When this data was fetched
    pub fetched_at: DateTime<Utc>,
}

/// Errors that can occur when fetching BioProject metadata
#[derive(Debug, Error)]
pub enum BioProjectError {
    /// The id argument was not a numeric Entrez id
    #[error(transparent)]
    InvalidId(#[from] InvalidIdError),

    /// The underlying eutils request failed
    #[error(transparent)]
    Eutils(#[from] EutilsError),

    /// The response was not well-formed XML
    #[error("malformed XML in response: {0}")]
    Syntax(#[from] roxmltree::Error),

    /// The response XML did not have the expected shape
    #[error(transparent)]
    Shape(#[from] XmlError),

    /// No BioProject matched the accession
    #[error("no BioProject found for accession {0}")]
    NotFound(String),

    /// NCBI answered with a different record than was asked for
    #[error("NCBI returned BioProject id {found}, expected {expected}")]
    MismatchedId { expected: String, found: String },

    /// The record resolved from an accession carries a different accession
    #[error("NCBI returned BioProject accession {found}, expected {expected}")]
    MismatchedAccession { expected: String, found: String },
}

/// Client for fetching BioProject records
#[derive(Debug, Clone, Default)]
pub struct BioProjectClient {
    http: EutilsClient,
}

impl BioProjectClient {
    /// Creates a client with no response cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a client over a configured [`EutilsClient`].
    pub fn with_http(http: EutilsClient) -> Self {
        Self { http }
    }

    /// Fetches a BioProject by accession (e.g. `PRJNA961747`).
    ///
    /// Resolves the accession to a numeric id with esearch, fetches the
    /// record, and verifies the record's accession matches the query.
    pub async fn fetch_by_accession(
        &self,
        accession: &str,
    ) -> Result<BioProject, BioProjectError> {
        let term = format!("{accession}[Project%20Accession]");
        let ids = self.http.esearch("bioproject", &term, Some(1)).await?;
        let id = ids
            .first()
            .ok_or_else(|| BioProjectError::NotFound(accession.to_string()))?;

        let bioproject = self.fetch_by_id(id).await?;
        if bioproject.accession != accession {
            return Err(BioProjectError::MismatchedAccession {
                expected: accession.to_string(),
                found: bioproject.accession,
            });
        }
        Ok(bioproject)
    }

    /// Fetches a BioProject by its numeric id (e.g. `961747`).
    pub async fn fetch_by_id(&self, bioproject_id: &str) -> Result<BioProject, BioProjectError> {
        ensure_numeric_id(bioproject_id, "PRJ")?;
        let body = self.http.efetch("bioproject", bioproject_id).await?;
        parse_bioproject(&body, bioproject_id)
    }
}

/// Parses an efetch bioproject response into a [`BioProject`].
///
/// The record of interest lives at `DocumentSummary/Project`; the archive id
/// must match the id that was requested.
fn parse_bioproject(body: &str, expected_id: &str) -> Result<BioProject, BioProjectError> {
    let doc = roxmltree::Document::parse(body)?;
    let summary = child(doc.root_element(), "DocumentSummary")?;
    let project = child(summary, "Project")?;

    let archive_id = child(child(project, "ProjectID")?, "ArchiveID")?;
    let id = attribute(archive_id, "id")?;
    if id != expected_id {
        return Err(BioProjectError::MismatchedId {
            expected: expected_id.to_string(),
            found: id,
        });
    }
    let accession = attribute(archive_id, "accession")?;

    let descr = child(project, "ProjectDescr")?;
    let name = child(descr, "Name")
        .ok()
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string());

    Ok(BioProject {
        accession,
        id,
        name,
        title: child_text(descr, "Title")?,
        description: child_text(descr, "Description")?,
        fetched_at: Utc::now(),
    })
}
