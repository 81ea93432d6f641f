use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::LazyLock;

static VERSION_INFO: LazyLock<String> = LazyLock::new(|| {
    let version = env!("CARGO_PKG_VERSION");

    // Use VERGEN_GIT_SHA for the commit hash (with safe slicing)
    let commit = option_env!("VERGEN_GIT_SHA")
        .map(|s| s.chars().take(7).collect::<String>())
        .unwrap_or_else(|| "unknown".to_string());

    let built = option_env!("VERGEN_BUILD_DATE").unwrap_or("unknown"); // YYYY-MM-DD
    let target = option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown");
    let rustc = option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown");

    format!("{version}\ncommit: {commit}\nbuilt: {built}\ntarget: {target}\nrustc: {rustc}")
});

pub fn version_info() -> &'static str {
    &VERSION_INFO
}

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "resvault")]
#[command(
    author,
    version = version_info(),
    about = "Back up open-data catalog resources to S3-compatible storage"
)]
#[command(after_help = "Examples:
  resvault backup-resources --api-key=KEY --secret-key=SECRET
  resvault backup-resources --dry-run
  resvault list-resources --api-key=KEY --secret-key=SECRET

Credentials can also be set with RESVAULT_API_KEY and RESVAULT_SECRET_KEY.
Logging verbosity follows RUST_LOG (default: info).")]
pub struct Config {
    /// Path to resvault.toml (default: ~/.config/resvault/resvault.toml)
    #[arg(long, global = true, env = "RESVAULT_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Storage credentials shared by every command
#[derive(Args, Debug, Clone)]
pub struct Credentials {
    /// Access key of the S3-compatible storage
    #[arg(long, env = "RESVAULT_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Secret key of the S3-compatible storage
    #[arg(long, env = "RESVAULT_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Back up new and updated catalog resources to storage
    #[command(after_help = "Examples:
  resvault backup-resources --api-key=KEY --secret-key=SECRET
  resvault backup-resources --concurrency 4    # Process 4 resources of a dataset at once
  resvault backup-resources --dry-run          # Report decisions, write nothing")]
    BackupResources {
        #[command(flatten)]
        credentials: Credentials,

        /// Report what would be uploaded without downloading or writing anything
        #[arg(long)]
        dry_run: bool,

        /// Resources of one dataset processed concurrently (overrides the config file)
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
        concurrency: Option<u16>,
    },
    /// List every bucket and object held in storage
    ListResources {
        #[command(flatten)]
        credentials: Credentials,
    },
}
