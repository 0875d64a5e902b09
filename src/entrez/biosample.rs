//! BioSample metadata from NCBI Entrez
//!
//! BioSamples describe the biological material an experiment sequenced.
//! The elink endpoint lists the samples attached to a BioProject; efetch
//! returns one sample's record as XML, including its SRA cross-reference
//! and the submitter-supplied attribute table.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::http::{EutilsClient, EutilsError};
use super::xml::{attribute, child, child_text, text_of, XmlError};
use super::{ensure_numeric_id, InvalidIdError};

/// Metadata for a single BioSample record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BioSample {
    /// Numeric BioSample database id (e.g. `34367739`)
    pub id: String,
    /// Human-readable accession (e.g. `SAMN34367739`)
    pub accession: String,
    /// When the record was published by NCBI
    pub publication_date: NaiveDateTime,
    /// Accession of the linked SRA sample, if one is cross-referenced
    pub sra_accession: Option<String>,
    /// One-line sample title
    pub title: String,
    /// NCBI taxonomy id of the sampled organism
    pub organism_id: String,
    /// NCBI taxonomy name of the sampled organism
    pub organism_name: String,
    /// Submitter-supplied attributes (collection date, host, location, ...)
    pub attributes: BTreeMap<String, String>,
    /// When this data was fetched
    pub fetched_at: DateTime<Utc>,
}

/// Errors that can occur when fetching BioSample metadata
#[derive(Debug, Error)]
pub enum BioSampleError {
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

    /// The publication date was not in NCBI's timestamp format
    #[error("invalid publication date: {0}")]
    InvalidPublicationDate(String),
}

/// Client for listing and fetching BioSample records
#[derive(Debug, Clone, Default)]
pub struct BioSampleClient {
    http: EutilsClient,
}

impl BioSampleClient {
    /// Creates a client with no response cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a client over a configured [`EutilsClient`].
    pub fn with_http(http: EutilsClient) -> Self {
        Self { http }
    }

    /// Lists the BioSample ids linked to a BioProject, sorted and
    /// deduplicated.
    pub async fn ids_in_bioproject(
        &self,
        bioproject_id: &str,
    ) -> Result<Vec<String>, BioSampleError> {
        ensure_numeric_id(bioproject_id, "PRJ")?;
        Ok(self
            .http
            .elink("bioproject", "biosample", bioproject_id)
            .await?)
    }

    /// Fetches a BioSample by its numeric id (e.g. `34367739`).
    pub async fn fetch_by_id(&self, biosample_id: &str) -> Result<BioSample, BioSampleError> {
        ensure_numeric_id(biosample_id, "SAMN")?;
        let body = self.http.efetch("biosample", biosample_id).await?;
        parse_biosample(&body)
    }
}

/// Parses an efetch biosample response into a [`BioSample`].
fn parse_biosample(body: &str) -> Result<BioSample, BioSampleError> {
    let doc = roxmltree::Document::parse(body)?;
    let biosample = child(doc.root_element(), "BioSample")?;

    let publication_date_raw = attribute(biosample, "publication_date")?;
    let publication_date = parse_ncbi_timestamp(&publication_date_raw)
        .ok_or(BioSampleError::InvalidPublicationDate(publication_date_raw))?;

    // The Ids block cross-references other databases; only the SRA entry is
    // of interest, and entries without a db attribute are skipped.
    let mut sra_accession = None;
    for id_node in child(biosample, "Ids")?
        .children()
        .filter(|n| n.has_tag_name("Id"))
    {
        if id_node.attribute("db") == Some("SRA") {
            sra_accession = Some(text_of(id_node));
        }
    }

    let description = child(biosample, "Description")?;
    let organism = child(description, "Organism")?;

    let mut attributes = BTreeMap::new();
    for attribute_node in child(biosample, "Attributes")?
        .children()
        .filter(|n| n.has_tag_name("Attribute"))
    {
        attributes.insert(
            attribute(attribute_node, "attribute_name")?,
            text_of(attribute_node),
        );
    }

    Ok(BioSample {
        id: attribute(biosample, "id")?,
        accession: attribute(biosample, "accession")?,
        publication_date,
        sra_accession,
        title: child_text(description, "Title")?,
        organism_id: attribute(organism, "taxonomy_id")?,
        organism_name: attribute(organism, "taxonomy_name")?,
        attributes,
        fetched_at: Utc::now(),
    })
}

/// Parses NCBI's timestamp format (e.g. `2023-04-25T00:00:00.000`), with or
/// without the fractional seconds.
fn parse_ncbi_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sample efetch response for db=biosample
    const VALID_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<BioSampleSet>
  <BioSample access="public" publication_date="2023-04-25T00:00:00.000" submission_date="2023-04-21T14:51:11.813" id="34367739" accession="SAMN34367739">
    <Ids>
      <Id db="BioSample" is_primary="1">SAMN34367739</Id>
      <Id db_label="Sample name">Saladoid.2012</Id>
      <Id db="SRA">SRS17427263</Id>
    </Ids>
    <Description>
      <Title>Saladoid coprolite sample</Title>
      <Organism taxonomy_id="749906" taxonomy_name="gut metagenome">
        <OrganismName>gut metagenome</OrganismName>
      </Organism>
    </Description>
    <Attributes>
      <Attribute attribute_name="collection_date" harmonized_name="collection_date">2012</Attribute>
      <Attribute attribute_name="env_broad_scale">human-gut</Attribute>
      <Attribute attribute_name="geo_loc_name" harmonized_name="geo_loc_name">Puerto Rico</Attribute>
      <Attribute attribute_name="host" harmonized_name="host">Homo sapiens</Attribute>
      <Attribute attribute_name="Culture">Saladoid</Attribute>
    </Attributes>
  </BioSample>
</BioSampleSet>"#;

    #[test]
    fn test_parse_valid_response() {
        let biosample = parse_biosample(VALID_RESPONSE).expect("Failed to parse biosample");

        assert_eq!(biosample.id, "34367739");
        assert_eq!(biosample.accession, "SAMN34367739");
        assert_eq!(biosample.sra_accession.as_deref(), Some("SRS17427263"));
        assert_eq!(biosample.title, "Saladoid coprolite sample");
        assert_eq!(biosample.organism_id, "749906");
        assert_eq!(biosample.organism_name, "gut metagenome");
        assert_eq!(
            biosample.publication_date,
            NaiveDateTime::parse_from_str("2023-04-25T00:00:00", "%Y-%m-%dT%H:%M:%S").unwrap()
        );
    }

    #[test]
    fn test_parse_collects_attribute_table() {
        let biosample = parse_biosample(VALID_RESPONSE).expect("Failed to parse biosample");

        assert_eq!(biosample.attributes.len(), 5);
        assert_eq!(
            biosample.attributes.get("collection_date").map(String::as_str),
            Some("2012")
        );
        assert_eq!(
            biosample.attributes.get("geo_loc_name").map(String::as_str),
            Some("Puerto Rico")
        );
        assert_eq!(
            biosample.attributes.get("Culture").map(String::as_str),
            Some("Saladoid")
        );
    }

    #[test]
    fn test_parse_skips_ids_without_db_attribute() {
        // The "Sample name" id has no db attribute and must not be mistaken
        // for the SRA cross-reference.
        let body = VALID_RESPONSE.replace(r#"<Id db="SRA">SRS17427263</Id>"#, "");
        let biosample = parse_biosample(&body).expect("Failed to parse biosample");
        assert!(biosample.sra_accession.is_none());
    }

    #[test]
    fn test_parse_rejects_bad_publication_date() {
        let body = VALID_RESPONSE.replace("2023-04-25T00:00:00.000", "April 25th");
        assert!(matches!(
            parse_biosample(&body),
            Err(BioSampleError::InvalidPublicationDate(_))
        ));
    }

    #[test]
    fn test_parse_missing_biosample_element() {
        assert!(matches!(
            parse_biosample("<BioSampleSet></BioSampleSet>"),
            Err(BioSampleError::Shape(XmlError::MissingElement(_)))
        ));
    }

    #[test]
    fn test_parse_ncbi_timestamp_with_and_without_millis() {
        assert!(parse_ncbi_timestamp("2023-04-25T00:00:00.000").is_some());
        assert!(parse_ncbi_timestamp("2023-04-25T00:00:00").is_some());
        assert!(parse_ncbi_timestamp("2023-04-25").is_none());
    }

    #[tokio::test]
    async fn test_fetch_by_id_rejects_accession_before_any_request() {
        let client = BioSampleClient::new();
        let result = client.fetch_by_id("SAMN34367739").await;
        assert!(matches!(result, Err(BioSampleError::InvalidId(_))));
    }

    #[tokio::test]
    async fn test_ids_in_bioproject_rejects_prj_accession() {
        let client = BioSampleClient::new();
        let result = client.ids_in_bioproject("PRJNA961747").await;
        assert!(matches!(
            result,
            Err(BioSampleError::InvalidId(
                InvalidIdError::PrefixedAccession { .. }
            ))
        ));
    }

    #[test]
    fn test_biosample_serialization_roundtrip() {
        let biosample = parse_biosample(VALID_RESPONSE).expect("Failed to parse biosample");

        let json = serde_json::to_string(&biosample).expect("Failed to serialize BioSample");
        let deserialized: BioSample =
            serde_json::from_str(&json).expect("Failed to deserialize BioSample");

        assert_eq!(deserialized.accession, biosample.accession);
        assert_eq!(deserialized.attributes, biosample.attributes);
        assert_eq!(deserialized.publication_date, biosample.publication_date);
    }
}
