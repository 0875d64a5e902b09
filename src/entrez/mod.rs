//! Clients for NCBI's Entrez (eutils) web API
//!
//! NCBI records form a hierarchy: a BioProject groups biological samples
//! (BioSamples), each of which carries sequencing experiments and runs in
//! the SRA. The clients in this module resolve human-readable accessions
//! (`PRJNA961747`, `SAMN34367739`, `SRX27341610`) into the numeric ids the
//! API works with and pull structured metadata out of the esearch, elink,
//! and efetch endpoints.

pub mod bioproject;
pub mod biosample;
pub mod experiment;
pub mod http;
mod xml;

pub use bioproject::{BioProject, BioProjectClient, BioProjectError};
pub use biosample::{BioSample, BioSampleClient, BioSampleError};
pub use experiment::{
    Design, Experiment, Library, LibraryLayout, Platform, Run, SraClient, SraError,
};
pub use http::{EutilsClient, EutilsError};
pub use xml::XmlError;

use thiserror::Error;

/// Base URL for NCBI's Entrez eutils API
pub const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/";

/// An id argument was not the numeric id the API expects
#[derive(Debug, Error)]
pub enum InvalidIdError {
    /// A human-readable accession was passed where a numeric id is required
    #[error("use the numeric id, not the {family}XXXX accession: {id}")]
    PrefixedAccession { id: String, family: &'static str },

    /// The id contained something other than digits
    #[error("the id should be all digits (e.g. 1025377), but it was: {0}")]
    NotNumeric(String),
}

/// Checks that `id` is a numeric Entrez id and not an accession.
///
/// `family` names the accession family of the record type being fetched
/// (`"PRJ"`, `"SAMN"`, `"SRX"`) for the error message.
pub(crate) fn ensure_numeric_id(id: &str, family: &'static str) -> Result<(), InvalidIdError> {
    let lower = id.to_ascii_lowercase();
    if lower.starts_with("prj") || lower.starts_with(&family.to_ascii_lowercase()) {
        return Err(InvalidIdError::PrefixedAccession {
            id: id.to_string(),
            family,
        });
    }
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InvalidIdError::NotNumeric(id.to_string()));
    }
    Ok(())
}
