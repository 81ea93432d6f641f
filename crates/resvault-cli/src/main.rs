use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use resvault::{Command, Config, Credentials};
use resvault_client::{S3ObjectStore, TransportCatalogClient};
use resvault_core::{
    BackupResult, BackupService, ListingService, ListingSummary, ResvaultConfig, TracingReporter,
    load_config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let config = Config::parse();
    let settings = load_config(config.config.clone()).context("Failed to load configuration")?;

    match config.command {
        Command::BackupResources {
            credentials,
            dry_run,
            concurrency,
        } => {
            let mut backup_config = settings.backup.clone();
            if dry_run {
                backup_config = backup_config.with_dry_run();
            }
            if let Some(n) = concurrency {
                backup_config = backup_config.with_concurrency(usize::from(n));
            }
            let settings = ResvaultConfig {
                backup: backup_config,
                ..settings
            };
            backup_resources(&settings, &credentials).await?;
        }
        Command::ListResources { credentials } => {
            list_resources(&settings, &credentials).await?;
        }
    }

    Ok(())
}

fn open_store(settings: &ResvaultConfig, credentials: &Credentials) -> S3ObjectStore {
    S3ObjectStore::new(
        &settings.storage,
        &credentials.api_key,
        &credentials.secret_key,
    )
}

async fn backup_resources(
    settings: &ResvaultConfig,
    credentials: &Credentials,
) -> anyhow::Result<()> {
    let catalog =
        TransportCatalogClient::new(&settings.catalog).context("Failed to set up catalog client")?;
    let store = open_store(settings, credentials);
    let service = BackupService::with_config(catalog, store, settings.backup.clone());

    info!(
        catalog = %settings.catalog.url,
        storage = %settings.storage.endpoint,
        dry_run = settings.backup.dry_run,
        "Starting backup"
    );

    let cancel_token = CancellationToken::new();
    spawn_ctrl_c_handler(cancel_token.clone());

    let result = service
        .run_cancellable(&TracingReporter, cancel_token)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Backup failed")?;

    print_backup_summary(&result, service.config().dry_run);
    Ok(())
}

async fn list_resources(
    settings: &ResvaultConfig,
    credentials: &Credentials,
) -> anyhow::Result<()> {
    let service = ListingService::new(open_store(settings, credentials));

    let summary = service
        .report(&TracingReporter)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Listing failed")?;

    print_listing_summary(&summary);
    Ok(())
}

/// Cancels the run on the first Ctrl-C; uploads in flight are allowed to finish.
fn spawn_ctrl_c_handler(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight uploads");
            cancel_token.cancel();
        }
    });
}

fn print_backup_summary(result: &BackupResult, dry_run: bool) {
    let stats = &result.stats;

    info!("");
    info!("═══════════════════════════════════════════════════════");
    info!("{}", backup_summary_title(result, dry_run));
    info!("═══════════════════════════════════════════════════════");
    info!("  + Created:           {}", stats.created);
    info!("  ↑ Updated:           {}", stats.updated);
    info!("  = Unchanged:         {}", stats.unchanged);
    info!("  ✗ Failed:            {}", stats.failed);
    info!("  - Filtered:          {}", stats.filtered);
    info!("───────────────────────────────────────────────────────");
    info!("  Backed up:           {}", stats.backed_up());
    info!("  Skipped:             {}", stats.skipped());
    info!("  Total resources:     {}", stats.total());
    info!("═══════════════════════════════════════════════════════");

    if stats.failed == 0 && !result.is_cancelled() {
        info!("All resources processed successfully!");
    }
}

fn backup_summary_title(result: &BackupResult, dry_run: bool) -> String {
    let suffix = if dry_run { " (dry run)" } else { "" };
    format!("Backup {}{}", result.status.as_str(), suffix)
}

fn print_listing_summary(summary: &ListingSummary) {
    info!("");
    info!("═══════════════════════════════════════════════════════");
    info!("  Buckets:             {}", summary.buckets);
    info!("  Objects:             {}", summary.objects);
    info!("  Total size:          {}", format_bytes(summary.total_bytes));
    info!("═══════════════════════════════════════════════════════");
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
