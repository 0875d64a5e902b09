//! srafetch - resolve NCBI accessions into metadata and download reads
//!
//! Sequences the Entrez clients the way the record hierarchy suggests:
//! bioproject -> biosample ids -> biosample -> experiments, plus a download
//! subcommand that drives the SRA Toolkit. Query results print as pretty
//! JSON; any failure aborts with the error message.

mod cache;
mod cli;
mod download;
mod entrez;

use std::error::Error;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use download::FastqDownloader;
use entrez::{BioProjectClient, BioSampleClient, EutilsClient, SraClient};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(&cli).await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let mut http = EutilsClient::new().with_update_cache(cli.refresh);
    if let Some(cache) = cli.cache() {
        http = http.with_cache(cache);
    }

    match &cli.command {
        Command::Bioproject { accession } => {
            let bioproject = BioProjectClient::with_http(http)
                .fetch_by_accession(accession)
                .await?;
            print_json(&bioproject)?;
        }
        Command::Biosamples { bioproject_id } => {
            let ids = BioSampleClient::with_http(http)
                .ids_in_bioproject(bioproject_id)
                .await?;
            print_json(&ids)?;
        }
        Command::Biosample { id } => {
            let biosample = BioSampleClient::with_http(http).fetch_by_id(id).await?;
            print_json(&biosample)?;
        }
        Command::Experiment { accession } => {
            let client = SraClient::with_http(http);
            let id = client.search_id_for_experiment_accession(accession).await?;
            let experiments = client.fetch_by_id(&id).await?;
            print_json(&experiments)?;
        }
        Command::Experiments {
            biosample_accession,
        } => {
            let experiments = SraClient::with_http(http)
                .search_by_biosample_accession(biosample_accession)
                .await?;
            print_json(&experiments)?;
        }
        Command::Download {
            run_accession,
            out_dir,
            threads,
            temp_dir,
        } => {
            let mut downloader = FastqDownloader::new().with_threads(*threads);
            if let Some(dir) = temp_dir {
                downloader = downloader.with_temp_dir(dir);
            }
            let files = downloader.download(run_accession, out_dir)?;
            for file in files {
                println!("{}", file.display());
            }
        }
    }

    Ok(())
}

/// Prints a value as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
