//! # Tab Reader CLI (`tabr`)
//!
//! ## Usage
//!
//! ```bash
//! tabr --config ./config/tabr.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tabr serve` | Start the HTTP server the extension posts to |
//! | `tabr tabs` | List tabs from the latest capture |
//! | `tabr ask "<question>"` | Match a question to a captured tab |
//! | `tabr status` | Show whether any capture has arrived |
//! | `tabr prune --keep N` | Delete all but the newest N captures |
//! | `tabr stock <SYMBOL>` | Print a stock quote, optionally chart it (`--chart`, `--base64`) |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tab_reader::store::FsStore;
use tab_reader::{config, dashboard, retention, server, stocks};

/// Tab Reader: stores browser-tab captures and answers questions about them.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Without one, captures live in `./tab_data` and the server binds
/// `0.0.0.0:5000`.
#[derive(Parser)]
#[command(name = "tabr", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "./config/tabr.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Accepts `POST /active_tab` from the browser extension and serves
    /// the latest capture on `GET /tabs`.
    Serve,

    /// List the tabs in the latest capture with a content preview.
    Tabs,

    /// Match a question to one of the captured tabs.
    Ask {
        /// The question, e.g. "what does example.com say about pricing?".
        question: String,
    },

    /// Report whether the extension has delivered any data.
    Status,

    /// Delete old captures, keeping the newest ones.
    ///
    /// The capture named by `latest.json` is never deleted.
    Prune {
        /// Number of captures to keep. Defaults to `[retention].keep`.
        #[arg(long)]
        keep: Option<usize>,

        /// Show what would be removed without deleting anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch a stock quote from Alpha Vantage.
    Stock {
        /// Ticker symbol, e.g. `IBM`.
        symbol: String,

        /// Also write a PNG chart of recent daily closes to this path.
        #[arg(long)]
        chart: Option<PathBuf>,

        /// Print the chart as a base64 PNG data URI.
        #[arg(long)]
        base64: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_minimal(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Tabs => {
            let store = FsStore::open(&cfg.storage.dir)?;
            dashboard::run_tabs(&store).await?;
        }
        Commands::Ask { question } => {
            let store = FsStore::open(&cfg.storage.dir)?;
            dashboard::run_ask(&store, &question).await?;
        }
        Commands::Status => {
            let store = FsStore::open(&cfg.storage.dir)?;
            dashboard::run_status(&store).await?;
        }
        Commands::Prune { keep, dry_run } => {
            let keep = keep.or(cfg.retention.keep).ok_or_else(|| {
                anyhow::anyhow!("--keep is required when [retention].keep is not configured")
            })?;
            let store = FsStore::open(&cfg.storage.dir)?;
            retention::run_prune(&store, keep, dry_run).await?;
        }
        Commands::Stock {
            symbol,
            chart,
            base64,
        } => {
            stocks::run_stock(&cfg.stocks, &symbol, chart.as_deref(), base64).await?;
        }
    }

    Ok(())
}
