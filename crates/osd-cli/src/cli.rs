//! CLI for the osd object-store downloader.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use osd_core::checksum;
use osd_core::config;
use osd_core::object_store::http::HttpObjectStore;
use osd_core::{DownloadRequest, Downloader};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level CLI for the osd downloader.
#[derive(Debug, Parser)]
#[command(name = "osd")]
#[command(about = "osd: resumable concurrent object-store downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one object to a local file.
    Get {
        /// Bucket name.
        bucket: String,
        /// Object name (may contain '/').
        object: String,

        /// Destination path (default: the object's basename in the current directory).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Single byte range to fetch, end inclusive: bytes=start-end.
        #[arg(long, value_name = "RANGE")]
        range: Option<String>,

        /// Object-store endpoint URL (overrides the config file).
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// Part size in bytes (overrides the config file).
        #[arg(long, value_name = "BYTES")]
        part_size: Option<u64>,

        /// Number of parallel workers (overrides the config file).
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,

        /// Do not write a breakpoint record; an interrupted download restarts
        /// from scratch.
        #[arg(long)]
        no_resume: bool,

        /// Breakpoint-record path (default: <destination>.bp).
        #[arg(long, value_name = "PATH")]
        resume_file: Option<PathBuf>,
    },

    /// Compute SHA-256 of a file (e.g. after download).
    Checksum {
        /// Path to the file.
        path: PathBuf,

        /// Expected hex digest; exit non-zero on mismatch.
        #[arg(long, value_name = "HEX")]
        expect: Option<String>,
    },

    /// Generate shell completions on stdout.
    Completions {
        /// Shell to generate for.
        shell: Shell,
    },
}

pub fn run_from_args() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Get {
            bucket,
            object,
            output,
            range,
            endpoint,
            part_size,
            concurrency,
            no_resume,
            resume_file,
        } => {
            let mut cfg = config::load_or_init()?;
            tracing::debug!("loaded config: {:?}", cfg);
            if let Some(endpoint) = endpoint {
                cfg.endpoint = Some(endpoint);
            }
            if let Some(part_size) = part_size {
                cfg.part_size = part_size;
            }
            if let Some(concurrency) = concurrency {
                cfg.concurrency = concurrency;
            }
            if no_resume {
                cfg.resume = false;
            }

            let endpoint = cfg
                .endpoint
                .clone()
                .context("no endpoint configured; pass --endpoint or set it in config.toml")?;
            let store = HttpObjectStore::new(&endpoint)?;

            let destination = match output {
                Some(path) => path,
                None => {
                    let basename = object.rsplit('/').next().unwrap_or(&object);
                    std::env::current_dir()?.join(basename)
                }
            };

            let mut request = DownloadRequest::new(&bucket, &object, destination);
            request.range = range;
            request.resume_path = resume_file;

            let downloader = Downloader::new(Arc::new(store), cfg)?;
            downloader.download(&request)?;
            println!("downloaded {}/{} to {}", bucket, object, request.destination.display());
        }

        CliCommand::Checksum { path, expect } => match expect {
            Some(expected) => {
                if checksum::verify_sha256(&path, &expected)? {
                    println!("{}: OK", path.display());
                } else {
                    anyhow::bail!("checksum mismatch for {}", path.display());
                }
            }
            None => {
                let digest = checksum::sha256_path(&path)?;
                println!("{}  {}", digest, path.display());
            }
        },

        CliCommand::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "osd", &mut std::io::stdout());
        }
    }

    Ok(())
}
