use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

use commands::fetch::{run_fetch, run_hypnogram, run_mock, run_raw, FetchArgs};
use commands::notes::{db_migrate, db_status, notes_edit, notes_get, notes_list, notes_set};
use commands::{
    init_tracing, load_config, parse_day, parse_fallback, resolve_range, warn_unused_keys,
    CliConfig,
};
use slp_schemas::DateRange;
use slp_upstream::SleepEndpoint;

#[derive(Parser)]
#[command(name = "slp")]
#[command(about = "SleepDesk CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (default: config/base.yaml)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the dashboard view: upstream data, reconciled, with notes
    Fetch {
        /// First day, YYYY-MM-DD (default: dashboard.default_range_days back from today)
        #[arg(long)]
        start: Option<String>,

        /// Last day, YYYY-MM-DD, inclusive
        #[arg(long)]
        end: Option<String>,

        /// never | on_empty | on_failure | on_empty_or_failure | always
        /// (overrides dashboard.fallback)
        #[arg(long)]
        fallback: Option<String>,

        /// Fail when upstream has no records for the range
        #[arg(long, default_value_t = false)]
        require_data: bool,

        /// Also print the downsampled trend series
        #[arg(long, default_value_t = false)]
        trend: bool,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print synthetic records for a range (no network, no database)
    Mock {
        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,

        /// Deterministic output for a given seed
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print one upstream endpoint's body unmodified
    Raw {
        /// detailed | daily
        #[arg(long = "type")]
        endpoint: String,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,
    },

    /// Decode a hypnogram trace into stage codes
    Hypnogram {
        trace: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Sleep notes
    Notes {
        #[command(subcommand)]
        cmd: NotesCmd,
    },

    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum NotesCmd {
    /// Notes in a range, newest first
    List {
        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    Get {
        #[arg(long)]
        day: String,
    },

    /// Create or replace the note for a day
    Set {
        #[arg(long)]
        day: String,

        #[arg(long)]
        text: String,
    },

    /// Rewrite an existing note by id
    Edit {
        #[arg(long)]
        id: String,

        #[arg(long)]
        text: String,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();
    let config_paths = cli.config_paths;

    match cli.cmd {
        Commands::Fetch {
            start,
            end,
            fallback,
            require_data,
            trend,
            json,
        } => {
            let cfg = boot(&config_paths)?;
            let args = FetchArgs {
                range: resolve_range(
                    start.as_deref(),
                    end.as_deref(),
                    cfg.app.dashboard.default_range_days,
                )?,
                policy: parse_fallback(fallback.as_deref(), cfg.app.dashboard.fallback)?,
                json,
                require_data,
                trend,
            };
            run_fetch(&cfg, args).await?;
        }

        Commands::Mock {
            start,
            end,
            seed,
            json,
        } => {
            let range = DateRange::parse(&start, &end)?;
            run_mock(&range, seed, json)?;
        }

        Commands::Raw {
            endpoint,
            start,
            end,
        } => {
            let ep = SleepEndpoint::parse(&endpoint)
                .with_context(|| format!("invalid --type '{endpoint}' (expected detailed|daily)"))?;
            let cfg = boot(&config_paths)?;
            let range = resolve_range(
                start.as_deref(),
                end.as_deref(),
                cfg.app.dashboard.default_range_days,
            )?;
            run_raw(&cfg, ep, &range).await?;
        }

        Commands::Hypnogram { trace, json } => run_hypnogram(&trace, json)?,

        Commands::Notes { cmd } => {
            let cfg = boot(&config_paths)?;
            match cmd {
                NotesCmd::List { start, end, json } => {
                    let range = resolve_range(
                        start.as_deref(),
                        end.as_deref(),
                        cfg.app.dashboard.default_range_days,
                    )?;
                    notes_list(&cfg, &range, json).await?;
                }
                NotesCmd::Get { day } => notes_get(&cfg, parse_day(&day)?).await?,
                NotesCmd::Set { day, text } => notes_set(&cfg, parse_day(&day)?, &text).await?,
                NotesCmd::Edit { id, text } => {
                    let id =
                        Uuid::parse_str(&id).with_context(|| format!("invalid note id '{id}'"))?;
                    notes_edit(&cfg, id, &text).await?;
                }
            }
        }

        Commands::Db { cmd } => {
            let cfg = boot(&config_paths)?;
            match cmd {
                DbCmd::Status => db_status(&cfg).await?,
                DbCmd::Migrate => db_migrate(&cfg).await?,
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = slp_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// Config, then logging (its filter comes from config), then the unused-key warning.
fn boot(config_paths: &[String]) -> Result<CliConfig> {
    let cfg = load_config(config_paths)?;
    init_tracing(&cfg.app);
    warn_unused_keys(&cfg.loaded)?;
    tracing::debug!(config_hash = %cfg.loaded.config_hash, "config loaded");
    Ok(cfg)
}
