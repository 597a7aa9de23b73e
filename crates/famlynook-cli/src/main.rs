//! FamlyNook CLI: upload local files through the direct-to-storage workflow.
//!
//! Reads FAMLYNOOK_API_URL (or API_URL), FAMLYNOOK_AUTH_TOKEN and
//! FAMLYNOOK_FAMILY_ID from the environment or a `.env` file.

use anyhow::Context;
use clap::{Parser, Subcommand};
use famlynook_cli::{init_tracing, link_target, run_report};
use famlynook_core::ClientConfig;
use famlynook_upload::{cancel_all, BatchOptions, CancelHandle, UploadRequest, UploadWorkflow};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "famlynook", about = "FamlyNook media upload CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more files, optionally attaching them to a memory or post
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Memory to attach the uploads to
        #[arg(long, conflicts_with = "post")]
        memory: Option<String>,
        /// Post to attach the uploads to
        #[arg(long)]
        post: Option<String>,
        /// Uploads in flight at once (defaults to FAMLYNOOK_MAX_CONCURRENT_UPLOADS)
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize report")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Upload {
            files,
            memory,
            post,
            concurrency,
        } => {
            let config = ClientConfig::from_env().context(
                "Invalid configuration. Set FAMLYNOOK_API_URL and FAMLYNOOK_AUTH_TOKEN",
            )?;
            let workflow = UploadWorkflow::from_config(&config)?;

            let mut sessions = workflow.sessions(
                files.iter().map(UploadRequest::new),
                link_target(memory, post),
            );
            let handles: Vec<CancelHandle> =
                sessions.iter().map(|s| s.cancel_handle()).collect();

            let interrupt = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let canceled = cancel_all(&handles);
                    tracing::warn!(canceled, "Interrupted, canceling uploads");
                }
            });

            let options = BatchOptions {
                max_concurrent: concurrency.or(config.max_concurrent_uploads),
            };
            let report = workflow
                .run_batch(&mut sessions, options, |index, percent| {
                    if percent % 10 == 0 {
                        tracing::info!(index, percent, "Upload progress");
                    } else {
                        tracing::debug!(index, percent, "Upload progress");
                    }
                })
                .await;
            interrupt.abort();

            print_json(&run_report(&report, &files))?;

            if report.failed() > 0 || report.canceled() > 0 {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
