//! Saved Jobs CLI
//!
//! Thin wrapper around savedjobs-core for command-line usage.
//!
//! ## Usage
//!
//! ```bash
//! # Save a job (works offline)
//! savedjobs --user ana save 42 "Backend Engineer" --company Acme --city Lisbon
//!
//! # List saved jobs, newest first
//! savedjobs --user ana list
//!
//! # Check a single job
//! savedjobs --user ana is-saved 42
//!
//! # Remove a job
//! savedjobs --user ana unsave 42
//!
//! # Reconcile with the bookmarks API
//! savedjobs --user ana --api-url https://api.example.com/v1 --token $TOKEN sync
//!
//! # Stored partitions, and removing one
//! savedjobs partitions
//! savedjobs --user ana purge
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use savedjobs_core::config::DEFAULT_REQUEST_TIMEOUT;
use savedjobs_core::{
    Bookmark, BookmarkService, DisabledRemote, HttpRemote, JobId, LocalOnlyReason, RedbStore,
    RemoteBookmarks, RemoteConfig, StaticIdentity, SyncMode, SyncReport,
};
use tracing::debug;

/// Saved Jobs - offline-first job bookmarks
#[derive(Parser)]
#[command(name = "savedjobs")]
#[command(version = "0.1.0")]
#[command(about = "Saved Jobs - offline-first job bookmarks")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Data directory (default: ~/.savedjobs/data)
    #[arg(short, long, global = true, env = "SAVEDJOBS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Active user; the anonymous partition is used when absent
    #[arg(short, long, global = true, env = "SAVEDJOBS_USER")]
    user: Option<String>,

    /// Base URL of the bookmarks API; without it the CLI runs local-only
    #[arg(long, global = true, env = "SAVEDJOBS_API_URL")]
    api_url: Option<String>,

    /// Bearer token for the bookmarks API
    #[arg(long, global = true, env = "SAVEDJOBS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a job
    Save {
        /// Job listing id
        job_id: JobId,
        /// Job title
        title: String,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        min_salary: Option<i64>,
        #[arg(long)]
        max_salary: Option<i64>,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        country: Option<String>,
        /// e.g. remote, hybrid, onsite
        #[arg(long)]
        location_type: Option<String>,
        /// e.g. full-time, contract
        #[arg(long)]
        employment_type: Option<String>,
    },

    /// Remove a saved job
    Unsave { job_id: JobId },

    /// Check whether a job is saved
    IsSaved { job_id: JobId },

    /// List saved jobs, newest first
    List,

    /// Reconcile with the bookmarks API
    Sync,

    /// List stored partitions
    Partitions,

    /// Delete the active user's saved jobs from this device
    Purge,
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

/// Get the default data directory (~/.savedjobs/data)
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".savedjobs")
        .join("data")
}

fn build_remote(cli: &Cli) -> Result<Arc<dyn RemoteBookmarks>> {
    let Some(api_url) = &cli.api_url else {
        debug!("No API URL configured, running local-only");
        return Ok(Arc::new(DisabledRemote));
    };

    let mut config = RemoteConfig::new(api_url.as_str())
        .with_timeout(Duration::from_secs(cli.timeout_secs));
    if let Some(token) = &cli.token {
        config = config.with_token(token.as_str());
    }
    let remote = HttpRemote::new(&config).context("Invalid API configuration")?;
    Ok(Arc::new(remote))
}

fn describe_mode(report: &SyncReport) -> String {
    match &report.mode {
        SyncMode::Remote => "remote".to_string(),
        SyncMode::LocalOnly(LocalOnlyReason::EndpointUnavailable) => {
            "local only: bookmarks endpoint unavailable".to_string()
        }
        SyncMode::LocalOnly(LocalOnlyReason::TransientFailure(reason)) => {
            format!("local only: {}", reason)
        }
        SyncMode::LocalOnly(LocalOnlyReason::Unauthorized) => {
            "local only: credentials rejected".to_string()
        }
    }
}

fn print_bookmark(bookmark: &Bookmark) {
    let title = if bookmark.title.trim().is_empty() {
        "(untitled)"
    } else {
        bookmark.title.as_str()
    };
    println!("{}  {}", bookmark.job_id, title);

    if let Some(company) = &bookmark.company_name {
        println!("     Company: {}", company);
    }
    let location: Vec<&str> = [&bookmark.city, &bookmark.country]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .collect();
    if !location.is_empty() {
        println!("     Location: {}", location.join(", "));
    }
    if bookmark.min_salary.is_some() || bookmark.max_salary.is_some() {
        let bound = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string());
        println!(
            "     Salary: {} - {} {}",
            bound(bookmark.min_salary),
            bound(bookmark.max_salary),
            bookmark.currency.as_deref().unwrap_or("")
        );
    }
    println!(
        "     Saved: {} ({})",
        bookmark.saved_at.format("%Y-%m-%d %H:%M"),
        if bookmark.synced { "synced" } else { "not synced" }
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let store = RedbStore::new(data_dir.join("savedjobs.redb"))
        .with_context(|| format!("Failed to open store in {}", data_dir.display()))?;
    let remote = build_remote(&cli)?;
    let identity = match &cli.user {
        Some(user) => StaticIdentity::user(user.as_str()),
        None => StaticIdentity::anonymous(),
    };
    let service = BookmarkService::new(Arc::new(store), remote, Arc::new(identity));

    match cli.command {
        Commands::Save {
            job_id,
            title,
            company,
            min_salary,
            max_salary,
            currency,
            city,
            country,
            location_type,
            employment_type,
        } => {
            let mut bookmark = Bookmark::new(job_id, title)
                .with_salary(min_salary, max_salary)
                .with_location(city, country);
            if let Some(company) = company {
                bookmark = bookmark.with_company(company);
            }
            if let Some(currency) = currency {
                bookmark = bookmark.with_currency(currency);
            }
            if let Some(location_type) = location_type {
                bookmark = bookmark.with_location_type(location_type);
            }
            if let Some(employment_type) = employment_type {
                bookmark = bookmark.with_employment_type(employment_type);
            }

            let propagation = service.save(bookmark).await?;
            println!("Saved job {} ({})", job_id, propagation);
        }

        Commands::Unsave { job_id } => {
            let propagation = service.unsave(job_id).await?;
            println!("Removed job {} ({})", job_id, propagation);
        }

        Commands::IsSaved { job_id } => {
            if service.is_saved(job_id).await? {
                println!("Job {} is saved", job_id);
            } else {
                println!("Job {} is not saved", job_id);
            }
        }

        Commands::List => {
            let bookmarks = service.list().await?;
            if bookmarks.is_empty() {
                println!("No saved jobs ({})", service.partition());
            } else {
                println!("Saved jobs ({}): {}", service.partition(), bookmarks.len());
                println!();
                for bookmark in &bookmarks {
                    print_bookmark(bookmark);
                }
            }
        }

        Commands::Sync => {
            let report = service.sync().await?;
            println!("Sync finished ({})", describe_mode(&report));
            println!("  Adopted: {}", report.adopted.len());
            println!("  Merged:  {}", report.merged.len());
            println!("  Pushed:  {}", report.pushed.len());
            println!("  Removed: {}", report.removed.len());
            if !report.dropped.is_empty() {
                println!("  Dropped: {} (removed on another device)", report.dropped.len());
            }
            let failed = report.push_failed.len() + report.removal_failed.len();
            if failed > 0 {
                println!("  Pending: {} (retried on next sync)", failed);
            }
        }

        Commands::Partitions => {
            let partitions = service.partitions().await?;
            if partitions.is_empty() {
                println!("No partitions stored");
            }
            for partition in partitions {
                println!("{}", partition);
            }
        }

        Commands::Purge => {
            let partition = service.partition();
            if service.purge_partition(&partition).await? {
                println!("Purged {}", partition);
            } else {
                println!("Nothing stored for {}", partition);
            }
        }
    }

    Ok(())
}
