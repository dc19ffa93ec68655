//! privfiles
//!
//! Command-line front end over a local private-files store.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use protocol::{decode_validated, FileParams};
use repository::config::{default_config_path, Config};
use repository::UserIdentity;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// privfiles - browse and copy private files for a file picker.
#[derive(Parser, Debug)]
#[command(name = "privfiles")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print the listing for a path token (the area root when omitted)
    List {
        /// Path token from a previous listing
        token: Option<String>,
    },

    /// Copy a file into the draft area
    Copy {
        /// Source token from a listing
        token: String,

        /// Draft item id receiving the copy
        #[arg(long)]
        itemid: u64,

        /// Destination directory path
        #[arg(long, default_value = "/")]
        path: String,

        /// Destination file name
        #[arg(long)]
        name: String,
    },

    /// Decode and validate a path token
    Decode {
        /// Path token to decode
        token: String,
    },

    /// Encode a path token
    Encode {
        /// Context id
        #[arg(long)]
        contextid: u64,

        /// Component name
        #[arg(long, default_value = "user")]
        component: String,

        /// File area name
        #[arg(long, default_value = "private")]
        filearea: String,

        /// Item id
        #[arg(long, default_value = "0")]
        itemid: u64,

        /// Directory path
        #[arg(long, default_value = "/")]
        filepath: String,

        /// File name (omit for directories)
        #[arg(long)]
        filename: Option<String>,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    // Load configuration
    let mut config = Config::load(&config_path)?;

    // Apply environment variable overrides
    config.apply_env_overrides();

    // Validate configuration
    config.validate()?;

    // Initialize tracing
    let _guard = init_tracing(&config, cli.verbose)?;
    tracing::debug!("Using config file: {:?}", config_path);

    match cli.command {
        Commands::List { token } => {
            let repo = config.local_repository();
            let user = UserIdentity::new(config.user.id);
            let listing = repo.get_listing(&user, token.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        Commands::Copy {
            token,
            itemid,
            path,
            name,
        } => {
            let repo = config.local_repository();
            let user = UserIdentity::new(config.user.id);
            let result = repo.copy_to_area(&user, &token, itemid, &path, &name)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Decode { token } => {
            let params = decode_validated(&token)?;
            println!("{}", serde_json::to_string_pretty(&params)?);
        }
        Commands::Encode {
            contextid,
            component,
            filearea,
            itemid,
            filepath,
            filename,
        } => {
            let params = FileParams {
                context_id: contextid,
                component,
                filearea,
                item_id: itemid,
                filepath,
                filename,
            }
            .validated()?;
            println!("{}", params.encode()?);
        }
        Commands::Init { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    config_path.display()
                );
            }
            Config::default().save(&config_path)?;
            println!("Wrote {}", config_path.display());
        }
    }

    Ok(())
}

/// Install the tracing subscriber, logging to stderr or to the configured
/// file.
fn init_tracing(config: &Config, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.logging.level.to_lowercase()
    };
    let filter = EnvFilter::try_new(&level)?;

    match &config.logging.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Log file has no name: {}", path.display()))?;
            std::fs::create_dir_all(dir)?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}
