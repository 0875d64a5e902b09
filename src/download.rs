//! Download sequencing reads as gzipped FASTQ with the SRA Toolkit
//!
//! The pipeline shells out to the SRA Toolkit: `prefetch` pulls the run
//! into a scratch directory, `vdb-validate` checks the download,
//! `fasterq-dump` converts it to FASTQ, and `gzip`/`mv` compress and move
//! the files into place. Every step is a blocking subprocess; a non-zero
//! exit aborts the download with the command's output attached.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output};

use thiserror::Error;
use tracing::info;

pub const PREFETCH_BIN: &str = "prefetch";
pub const VALIDATE_BIN: &str = "vdb-validate";
pub const FASTERQ_DUMP_BIN: &str = "fasterq-dump";
pub const FASTQ_DUMP_BIN: &str = "fastq-dump";
pub const GZIP_BIN: &str = "gzip";
pub const MV_BIN: &str = "mv";

/// Read-name line layout handed to fasterq-dump
const SEQ_DEFLINE: &str = "@$ac.$si.$ri:$sg:$sn";

const DEFAULT_FASTERQ_DUMP_THREADS: usize = 6;

/// Errors that can occur while downloading a run
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The output directory does not exist
    #[error("out_dir should exist: {}", .0.display())]
    MissingOutDir(PathBuf),

    /// The output path exists but is not a directory
    #[error("out_dir should be a directory, but the given one is not: {}", .0.display())]
    OutDirNotADirectory(PathBuf),

    /// Files from an earlier download of this run are already present
    #[error("there are previous downloaded files for this run: {}", .files.join(","))]
    AlreadyDownloaded {
        run_accession: String,
        files: Vec<String>,
    },

    /// Creating the scratch directory or listing files failed
    #[error("I/O error during download: {0}")]
    Io(#[from] std::io::Error),

    /// A toolkit subprocess exited with a non-zero status
    #[error(
        "command failed with {status}: {command}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}"
    )]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
}

/// Downloads SRA runs and converts them to gzipped FASTQ files
///
/// Thread count and scratch location are the only knobs the toolkit
/// exposes through this pipeline; everything else is a fixed flag set.
#[derive(Debug, Clone)]
pub struct FastqDownloader {
    /// Threads passed to fasterq-dump
    threads: usize,
    /// Parent directory for the scratch space (system temp dir if unset)
    temp_dir: Option<PathBuf>,
}

impl Default for FastqDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl FastqDownloader {
    /// Creates a downloader with the default thread count.
    pub fn new() -> Self {
        Self {
            threads: DEFAULT_FASTERQ_DUMP_THREADS,
            temp_dir: None,
        }
    }

    /// Sets the thread count passed to fasterq-dump.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Places the scratch directory under `temp_dir` instead of the system
    /// temp dir. Useful when the system temp partition is too small for a
    /// prefetched run.
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(temp_dir.into());
        self
    }

    /// Downloads `run_accession` (e.g. `SRR24442506`) and places gzipped
    /// FASTQ files in `out_dir`.
    ///
    /// Refuses to run when `out_dir` already holds files whose names start
    /// with the run accession, so a re-run never clobbers or mixes with an
    /// earlier download. Returns the paths of the files placed in
    /// `out_dir`.
    pub fn download(
        &self,
        run_accession: &str,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, DownloadError> {
        if !out_dir.exists() {
            return Err(DownloadError::MissingOutDir(out_dir.to_path_buf()));
        }
        if !out_dir.is_dir() {
            return Err(DownloadError::OutDirNotADirectory(out_dir.to_path_buf()));
        }

        let previous = files_with_prefix(out_dir, run_accession)?;
        if !previous.is_empty() {
            return Err(DownloadError::AlreadyDownloaded {
                run_accession: run_accession.to_string(),
                files: previous,
            });
        }

        let working_dir = match &self.temp_dir {
            Some(dir) => tempfile::Builder::new()
                .prefix("sra_download_")
                .tempdir_in(dir)?,
            None => tempfile::Builder::new().prefix("sra_download_").tempdir()?,
        };
        let working_path = working_dir.path();

        info!(run_accession, "prefetching run");
        run_checked(
            PREFETCH_BIN,
            [
                OsStr::new("-O"),
                working_path.as_os_str(),
                OsStr::new(run_accession),
            ],
        )?;

        let sra_dir = working_path.join(run_accession);
        info!(run_accession, "validating prefetched run");
        run_checked(VALIDATE_BIN, [sra_dir.as_os_str()])?;

        let fast_out_dir = working_path.join("fast");
        info!(run_accession, threads = self.threads, "converting to FASTQ");
        let threads = self.threads.to_string();
        run_checked(
            FASTERQ_DUMP_BIN,
            [
                OsStr::new("--outdir"),
                fast_out_dir.as_os_str(),
                OsStr::new("--temp"),
                working_path.as_os_str(),
                OsStr::new("--split-3"),
                OsStr::new("--threads"),
                OsStr::new(&threads),
                OsStr::new("--skip-technical"),
                OsStr::new("--seq-defline"),
                OsStr::new(SEQ_DEFLINE),
                sra_dir.as_os_str(),
            ],
        )?;

        info!(run_accession, "compressing FASTQ files");
        for path in dir_entries(&fast_out_dir)? {
            run_checked(GZIP_BIN, [path.as_os_str()])?;
        }

        info!(run_accession, out_dir = %out_dir.display(), "moving files into place");
        let mut moved = Vec::new();
        for path in dir_entries(&fast_out_dir)? {
            run_checked(MV_BIN, [path.as_os_str(), out_dir.as_os_str()])?;
            if let Some(file_name) = path.file_name() {
                moved.push(out_dir.join(file_name));
            }
        }
        moved.sort();
        Ok(moved)
    }
}

/// Builds the argv for the legacy single-step `fastq-dump` conversion.
///
/// Superseded by the prefetch/fasterq-dump pipeline above, but still handy
/// for environments with only the older toolkit.
pub fn fastq_dump_command(run_accession: &str, out_dir: &Path) -> Vec<String> {
    vec![
        FASTQ_DUMP_BIN.to_string(),
        "--split-3".to_string(),
        "--skip-technical".to_string(),
        "--gzip".to_string(),
        "--defline-qual".to_string(),
        "+".to_string(),
        "--defline-seq".to_string(),
        "@$ac.$si/$ri $sn".to_string(),
        "--outdir".to_string(),
        out_dir.display().to_string(),
        run_accession.to_string(),
    ]
}

/// Names of entries in `dir` that start with `prefix`, sorted.
fn files_with_prefix(dir: &Path, prefix: &str) -> Result<Vec<String>, std::io::Error> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

/// Paths of all entries in `dir`, sorted for deterministic processing.
fn dir_entries(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}

/// Runs a command to completion, treating a non-zero exit as an error that
/// carries the full command line and captured output.
fn run_checked<I, S>(program: &str, args: I) -> Result<Output, DownloadError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<OsString> = args
        .into_iter()
        .map(|arg| arg.as_ref().to_os_string())
        .collect();

    let output = Command::new(program).args(&args).output()?;
    if !output.status.success() {
        let mut command = program.to_string();
        for arg in &args {
            command.push(' ');
            command.push_str(&arg.to_string_lossy());
        }
        return Err(DownloadError::CommandFailed {
            command,
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_download_requires_existing_out_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let missing = temp_dir.path().join("absent");

        let result = FastqDownloader::new().download("SRR000001", &missing);
        match result {
            Err(DownloadError::MissingOutDir(path)) => assert_eq!(path, missing),
            other => panic!("Expected MissingOutDir, got {:?}", other),
        }
    }

    #[test]
    fn test_download_requires_out_dir_to_be_a_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file_path = temp_dir.path().join("a_file");
        fs::write(&file_path, b"not a directory").expect("write should succeed");

        let result = FastqDownloader::new().download("SRR000001", &file_path);
        assert!(matches!(result, Err(DownloadError::OutDirNotADirectory(_))));
    }

    #[test]
    fn test_download_refuses_when_run_files_already_present() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("SRR000001_1.fastq.gz"), b"reads")
            .expect("write should succeed");
        fs::write(temp_dir.path().join("SRR000001_2.fastq.gz"), b"reads")
            .expect("write should succeed");

        let result = FastqDownloader::new().download("SRR000001", temp_dir.path());
        match result {
            Err(DownloadError::AlreadyDownloaded {
                run_accession,
                files,
            }) => {
                assert_eq!(run_accession, "SRR000001");
                assert_eq!(
                    files,
                    vec![
                        "SRR000001_1.fastq.gz".to_string(),
                        "SRR000001_2.fastq.gz".to_string()
                    ]
                );
            }
            other => panic!("Expected AlreadyDownloaded, got {:?}", other),
        }
    }

    #[test]
    fn test_files_for_other_runs_do_not_match() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("SRR999999_1.fastq.gz"), b"reads")
            .expect("write should succeed");
        // A name that merely contains the accession does not match either.
        fs::write(temp_dir.path().join("old_SRR000001.fastq.gz"), b"reads")
            .expect("write should succeed");

        let files = files_with_prefix(temp_dir.path(), "SRR000001").expect("listing should succeed");
        assert!(files.is_empty());
    }

    #[test]
    fn test_files_with_prefix_sorted() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("SRR1_b.fastq"), b"").unwrap();
        fs::write(temp_dir.path().join("SRR1_a.fastq"), b"").unwrap();
        fs::write(temp_dir.path().join("other.txt"), b"").unwrap();

        let files = files_with_prefix(temp_dir.path(), "SRR1").expect("listing should succeed");
        assert_eq!(
            files,
            vec!["SRR1_a.fastq".to_string(), "SRR1_b.fastq".to_string()]
        );
    }

    #[test]
    fn test_run_checked_captures_failure_output() {
        let result = run_checked("sh", ["-c", "echo out; echo err >&2; exit 3"]);
        match result {
            Err(DownloadError::CommandFailed {
                command,
                status,
                stdout,
                stderr,
            }) => {
                assert!(command.starts_with("sh -c"));
                assert_eq!(status.code(), Some(3));
                assert_eq!(stdout.trim(), "out");
                assert_eq!(stderr.trim(), "err");
            }
            other => panic!("Expected CommandFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_run_checked_passes_on_success() {
        let output = run_checked("sh", ["-c", "echo fine"]).expect("command should succeed");
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "fine");
    }

    #[test]
    fn test_fastq_dump_command_argv() {
        let cmd = fastq_dump_command("SRR000001", Path::new("/data/reads"));
        assert_eq!(
            cmd,
            vec![
                "fastq-dump",
                "--split-3",
                "--skip-technical",
                "--gzip",
                "--defline-qual",
                "+",
                "--defline-seq",
                "@$ac.$si/$ri $sn",
                "--outdir",
                "/data/reads",
                "SRR000001",
            ]
        );
    }

    #[test]
    fn test_downloader_defaults() {
        let downloader = FastqDownloader::new();
        assert_eq!(downloader.threads, DEFAULT_FASTERQ_DUMP_THREADS);
        assert!(downloader.temp_dir.is_none());
    }

    #[test]
    fn test_downloader_builder_overrides() {
        let downloader = FastqDownloader::new()
            .with_threads(12)
            .with_temp_dir("/scratch");
        assert_eq!(downloader.threads, 12);
        assert_eq!(downloader.temp_dir.as_deref(), Some(Path::new("/scratch")));
    }
}
