//! srafetch library
//!
//! Resolves NCBI accession numbers (BioProject, BioSample, SRA experiment)
//! into structured metadata through the Entrez web API, downloads
//! sequencing runs as gzipped FASTQ via the SRA Toolkit, and memoizes
//! expensive calls in a content-addressed disk cache.

pub mod cache;
pub mod cli;
pub mod download;
pub mod entrez;
