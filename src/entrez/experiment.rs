//! SRA experiment metadata from NCBI Entrez
//!
//! The SRA database stores sequencing experiments and their runs. efetch
//! answers with an `EXPERIMENT_PACKAGE_SET` document; each package bundles
//! one experiment with its library design, sequencing platform, sample
//! pool, and run list.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::http::{EutilsClient, EutilsError};
use super::xml::{attribute, child, child_text, first_element_child, XmlError};
use super::{ensure_numeric_id, InvalidIdError};

/// A sequencing experiment with its runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    /// Human-readable accession (e.g. `SRX27341610`)
    pub accession: String,
    /// One-line experiment title
    pub title: String,
    /// Library design of the experiment
    pub design: Design,
    /// Sequencer platform that produced the reads
    pub platform: Platform,
    /// Accessions of the pooled sample members
    pub member_accessions: Vec<String>,
    /// Sequencing runs attached to this experiment
    pub runs: Vec<Run>,
}

/// The design block of an experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Design {
    /// Free-text design description
    pub description: String,
    /// SRA accession of the sample the experiment sequenced
    pub biosample_sra_accession: String,
    /// How the sequencing library was prepared
    pub library: Library,
}

/// Library preparation metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    pub strategy: String,
    pub source: String,
    pub selection: String,
    pub layout: LibraryLayout,
}

/// Whether reads come single-ended or in pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LibraryLayout {
    Single,
    Paired,
}

/// A single sequencing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Human-readable accession (e.g. `SRR000001`)
    pub accession: String,
    /// Number of spots (read positions) in the run
    pub total_spots: u64,
}

/// Sequencer platforms as named in the SRA schema
///
/// The platform appears as the tag of the single element under `PLATFORM`;
/// tags that NCBI adds in the future are carried through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Ls454,
    Illumina,
    Helicos,
    AbiSolid,
    CompleteGenomics,
    Bgiseq,
    OxfordNanopore,
    PacbioSmrt,
    IonTorrent,
    Capillary,
    Dnbseq,
    Element,
    Ultima,
    Other(String),
}

impl Platform {
    /// Maps a `PLATFORM` child tag to a platform.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "LS454" => Platform::Ls454,
            "ILLUMINA" => Platform::Illumina,
            "HELICOS" => Platform::Helicos,
            "ABI_SOLID" => Platform::AbiSolid,
            "COMPLETE_GENOMICS" => Platform::CompleteGenomics,
            "BGISEQ" => Platform::Bgiseq,
            "OXFORD_NANOPORE" => Platform::OxfordNanopore,
            "PACBIO_SMRT" => Platform::PacbioSmrt,
            "ION_TORRENT" => Platform::IonTorrent,
            "CAPILLARY" => Platform::Capillary,
            "DNBSEQ" => Platform::Dnbseq,
            "ELEMENT" => Platform::Element,
            "ULTIMA" => Platform::Ultima,
            other => Platform::Other(other.to_string()),
        }
    }

    /// Returns the SRA schema tag for this platform.
    pub fn as_tag(&self) -> &str {
        match self {
            Platform::Ls454 => "LS454",
            Platform::Illumina => "ILLUMINA",
            Platform::Helicos => "HELICOS",
            Platform::AbiSolid => "ABI_SOLID",
            Platform::CompleteGenomics => "COMPLETE_GENOMICS",
            Platform::Bgiseq => "BGISEQ",
            Platform::OxfordNanopore => "OXFORD_NANOPORE",
            Platform::PacbioSmrt => "PACBIO_SMRT",
            Platform::IonTorrent => "ION_TORRENT",
            Platform::Capillary => "CAPILLARY",
            Platform::Dnbseq => "DNBSEQ",
            Platform::Element => "ELEMENT",
            Platform::Ultima => "ULTIMA",
            Platform::Other(tag) => tag,
        }
    }
}

impl From<String> for Platform {
    fn from(tag: String) -> Self {
        Platform::from_tag(&tag)
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        platform.as_tag().to_string()
    }
}

/// Errors that can occur when fetching SRA experiment metadata
#[derive(Debug, Error)]
pub enum SraError {
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

    /// The root element was not an EXPERIMENT_PACKAGE_SET
    #[error("expected an EXPERIMENT_PACKAGE_SET for the SRA id, got {0}")]
    UnexpectedRoot(String),

    /// A field held a value the SRA schema does not allow
    #[error("unexpected value in response: {0}")]
    UnexpectedValue(String),

    /// No SRA record matched the accession
    #[error("accession {0} not found in the sra database")]
    NotFound(String),

    /// The search answered with more than one id where one was expected
    #[error("expected exactly one id for accession {accession}, got {count}")]
    MultipleIds { accession: String, count: usize },

    /// The search answered with an id that is not numeric
    #[error("expected an all-digit id for accession {accession}, but got: {id}")]
    NonNumericId { accession: String, id: String },
}

/// Client for searching and fetching SRA experiments
#[derive(Debug, Clone, Default)]
pub struct SraClient {
    http: EutilsClient,
}

impl SraClient {
    /// Creates a client with no response cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a client over a configured [`EutilsClient`].
    pub fn with_http(http: EutilsClient) -> Self {
        Self { http }
    }

    /// Resolves an experiment accession (e.g. `SRX27341610`) to its numeric
    /// Entrez id.
    ///
    /// The accession is expected to name exactly one record; anything else
    /// is an error.
    pub async fn search_id_for_experiment_accession(
        &self,
        accession: &str,
    ) -> Result<String, SraError> {
        let term = format!("{accession}[Accession]");
        let mut ids = self.http.esearch("sra", &term, Some(1)).await?;
        if ids.is_empty() {
            return Err(SraError::NotFound(accession.to_string()));
        }
        if ids.len() > 1 {
            return Err(SraError::MultipleIds {
                accession: accession.to_string(),
                count: ids.len(),
            });
        }

        let id = ids.remove(0);
        if !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SraError::NonNumericId {
                accession: accession.to_string(),
                id,
            });
        }
        Ok(id)
    }

    /// Fetches the experiments stored under a numeric SRA id.
    pub async fn fetch_by_id(&self, sra_id: &str) -> Result<Vec<Experiment>, SraError> {
        ensure_numeric_id(sra_id, "SRX")?;
        let body = self.http.efetch("sra", sra_id).await?;
        parse_experiment_set(&body)
    }

    /// Fetches every experiment attached to a BioSample accession.
    ///
    /// Ids are fetched one after another; there is no parallel fetching.
    pub async fn search_by_biosample_accession(
        &self,
        biosample_accession: &str,
    ) -> Result<Vec<Experiment>, SraError> {
        let term = format!("{biosample_accession}[BioSample]");
        let ids = self.http.esearch("sra", &term, None).await?;

        let mut experiments = Vec::new();
        for id in ids {
            experiments.extend(self.fetch_by_id(&id).await?);
        }
        Ok(experiments)
    }
}

/// Parses an efetch sra response into the experiments it packages.
fn parse_experiment_set(body: &str) -> Result<Vec<Experiment>, SraError> {
    let doc = roxmltree::Document::parse(body)?;
    let root = doc.root_element();
    if !root.has_tag_name("EXPERIMENT_PACKAGE_SET") {
        return Err(SraError::UnexpectedRoot(root.tag_name().name().to_string()));
    }

    root.children()
        .filter(|n| n.has_tag_name("EXPERIMENT_PACKAGE"))
        .map(parse_experiment_package)
        .collect()
}

fn parse_experiment_package(package: roxmltree::Node) -> Result<Experiment, SraError> {
    let experiment = child(package, "EXPERIMENT")?;
    let accession = attribute(experiment, "accession")?;

    let design = child(experiment, "DESIGN")?;
    let library = child(design, "LIBRARY_DESCRIPTOR")?;
    let layout_tag = first_element_child(child(library, "LIBRARY_LAYOUT")?)?;
    let layout = match layout_tag.tag_name().name() {
        "SINGLE" => LibraryLayout::Single,
        "PAIRED" => LibraryLayout::Paired,
        other => {
            return Err(SraError::UnexpectedValue(format!(
                "unknown library layout: {other}"
            )))
        }
    };

    let platform_tag = first_element_child(child(experiment, "PLATFORM")?)?;
    let platform = Platform::from_tag(platform_tag.tag_name().name());

    let member_accessions = child(package, "Pool")?
        .children()
        .filter(|n| n.has_tag_name("Member"))
        .map(|member| attribute(member, "accession"))
        .collect::<Result<Vec<_>, _>>()?;

    let runs = child(package, "RUN_SET")?
        .children()
        .filter(|n| n.has_tag_name("RUN"))
        .map(parse_run)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Experiment {
        accession,
        title: child_text(experiment, "TITLE")?,
        design: Design {
            description: child_text(design, "DESIGN_DESCRIPTION")?,
            biosample_sra_accession: attribute(child(design, "SAMPLE_DESCRIPTOR")?, "accession")?,
            library: Library {
                name: child_text(library, "LIBRARY_NAME")?,
                strategy: child_text(library, "LIBRARY_STRATEGY")?,
                source: child_text(library, "LIBRARY_SOURCE")?,
                selection: child_text(library, "LIBRARY_SELECTION")?,
                layout,
            },
        },
        platform,
        member_accessions,
        runs,
    })
}

fn parse_run(run: roxmltree::Node) -> Result<Run, SraError> {
    let accession = attribute(run, "accession")?;
    let total_spots_raw = attribute(run, "total_spots")?;
    let total_spots = total_spots_raw.parse().map_err(|_| {
        SraError::UnexpectedValue(format!(
            "run {accession} total_spots is not a number: {total_spots_raw}"
        ))
    })?;
    Ok(Run {
        accession,
        total_spots,
    })
}
