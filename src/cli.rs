//! Command-line interface parsing for srafetch
//!
//! One subcommand per query, plus `download` for the SRA Toolkit pipeline.
//! The cache flags are global so every subcommand shares the same response
//! cache configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cache::CallCache;

/// srafetch - resolve NCBI accessions into metadata and download reads
#[derive(Parser, Debug)]
#[command(name = "srafetch")]
#[command(about = "Resolve NCBI BioProject/BioSample/SRA accessions and download FASTQ reads")]
#[command(version)]
pub struct Cli {
    /// Directory for cached NCBI responses (defaults to the user cache dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Disable the response cache entirely
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Ignore cached responses and overwrite them with fresh ones
    #[arg(long, global = true)]
    pub refresh: bool,

    /// Write new cache entries gzip-compressed
    #[arg(long, global = true)]
    pub gzip_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// The operation to perform
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch BioProject metadata by accession (e.g. PRJNA961747)
    Bioproject { accession: String },

    /// List the BioSample ids linked to a numeric BioProject id
    Biosamples { bioproject_id: String },

    /// Fetch BioSample metadata by numeric id
    Biosample { id: String },

    /// Fetch an SRA experiment by accession (e.g. SRX27341610)
    Experiment { accession: String },

    /// Fetch every SRA experiment attached to a BioSample accession
    Experiments { biosample_accession: String },

    /// Download a run's reads as gzipped FASTQ files
    Download {
        /// Run accession (e.g. SRR000001)
        run_accession: String,

        /// Existing directory the FASTQ files are placed in
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,

        /// Threads passed to fasterq-dump
        #[arg(long, default_value_t = 6)]
        threads: usize,

        /// Directory for the temporary working space
        #[arg(long, value_name = "DIR")]
        temp_dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Resolves the response cache from the global flags.
    ///
    /// Returns `None` with `--no-cache`, or when no explicit directory is
    /// given and the platform has no user cache directory.
    pub fn cache(&self) -> Option<CallCache> {
        if self.no_cache {
            return None;
        }
        let cache = match &self.cache_dir {
            Some(dir) => CallCache::new(dir),
            None => CallCache::for_project()?,
        };
        Some(cache.with_gzip(self.gzip_cache))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bioproject_subcommand() {
        let cli = Cli::parse_from(["srafetch", "bioproject", "PRJNA961747"]);
        match cli.command {
            Command::Bioproject { accession } => assert_eq!(accession, "PRJNA961747"),
            other => panic!("Expected Bioproject, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_biosamples_subcommand() {
        let cli = Cli::parse_from(["srafetch", "biosamples", "961747"]);
        match cli.command {
            Command::Biosamples { bioproject_id } => assert_eq!(bioproject_id, "961747"),
            other => panic!("Expected Biosamples, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_experiments_subcommand() {
        let cli = Cli::parse_from(["srafetch", "experiments", "SAMN34367739"]);
        match cli.command {
            Command::Experiments {
                biosample_accession,
            } => assert_eq!(biosample_accession, "SAMN34367739"),
            other => panic!("Expected Experiments, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_download_subcommand() {
        let cli = Cli::parse_from([
            "srafetch",
            "download",
            "SRR000001",
            "--out-dir",
            "/data/reads",
            "--threads",
            "8",
        ]);
        match cli.command {
            Command::Download {
                run_accession,
                out_dir,
                threads,
                temp_dir,
            } => {
                assert_eq!(run_accession, "SRR000001");
                assert_eq!(out_dir, PathBuf::from("/data/reads"));
                assert_eq!(threads, 8);
                assert!(temp_dir.is_none());
            }
            other => panic!("Expected Download, got {:?}", other),
        }
    }

    #[test]
    fn test_download_threads_default_to_six() {
        let cli = Cli::parse_from(["srafetch", "download", "SRR000001", "--out-dir", "/data"]);
        match cli.command {
            Command::Download { threads, .. } => assert_eq!(threads, 6),
            other => panic!("Expected Download, got {:?}", other),
        }
    }

    #[test]
    fn test_download_requires_out_dir() {
        let result = Cli::try_parse_from(["srafetch", "download", "SRR000001"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_default_off() {
        let cli = Cli::parse_from(["srafetch", "bioproject", "PRJNA961747"]);
        assert!(cli.cache_dir.is_none());
        assert!(!cli.no_cache);
        assert!(!cli.refresh);
        assert!(!cli.gzip_cache);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "srafetch",
            "bioproject",
            "PRJNA961747",
            "--cache-dir",
            "/tmp/ncbi",
            "--refresh",
        ]);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/ncbi")));
        assert!(cli.refresh);
    }

    #[test]
    fn test_cache_disabled_with_no_cache() {
        let cli = Cli::parse_from([
            "srafetch",
            "--no-cache",
            "--cache-dir",
            "/tmp/ncbi",
            "bioproject",
            "PRJNA961747",
        ]);
        assert!(cli.cache().is_none());
    }

    #[test]
    fn test_cache_uses_explicit_directory() {
        let cli = Cli::parse_from([
            "srafetch",
            "--cache-dir",
            "/tmp/ncbi",
            "bioproject",
            "PRJNA961747",
        ]);
        let cache = cli.cache().expect("explicit cache dir should be used");
        assert_eq!(cache.dir(), std::path::Path::new("/tmp/ncbi"));
    }

    #[test]
    fn test_gzip_cache_flag_changes_entry_extension() {
        let cli = Cli::parse_from([
            "srafetch",
            "--cache-dir",
            "/tmp/ncbi",
            "--gzip-cache",
            "bioproject",
            "PRJNA961747",
        ]);
        let cache = cli.cache().expect("explicit cache dir should be used");
        let path = cache.entry_path("cached_request", &["http://example"]);
        assert!(path.to_string_lossy().ends_with(".json.gz"));
    }

    #[test]
    fn test_missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["srafetch"]).is_err());
    }
}
