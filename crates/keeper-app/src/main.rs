// Keeper CLI entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout carries JSON output)
// 2. Load config
// 3. Open database
// 4. Run the requested command and print its result as JSON

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use keeper_app::config;
use keeper_app::db::{Database, LeagueFacts};
use keeper_app::service::KeeperService;
use keeper_core::model::KeeperType;
use keeper_core::selection::Actor;
use keeper_core::TradeProposal;
use serde::Serialize;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "keeper")]
#[command(about = "Keeper cost, draft-slot cascade and trade value engine for keeper leagues")]
#[command(version)]
struct Cli {
    /// Directory holding config/ and defaults/
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import rosters, players, draft picks, transactions and pick trades from JSON
    Import { facts: PathBuf },

    /// Keeper eligibility and cost for one player on one roster
    Eligibility {
        #[arg(long)]
        roster: String,
        #[arg(long)]
        player: String,
    },

    /// Re-run the draft-slot cascade for a roster
    Cascade {
        #[arg(long)]
        roster: String,
    },

    /// Add a keeper and re-run the roster's cascade
    AddKeeper {
        #[arg(long)]
        roster: String,
        #[arg(long)]
        player: String,
        #[arg(long = "type", value_enum, default_value = "regular")]
        keeper_type: KeeperKind,
    },

    /// Remove a keeper and re-run the roster's cascade
    RemoveKeeper {
        #[arg(long)]
        roster: String,
        #[arg(long)]
        player: String,
        /// Act as the league commissioner (required for locked keepers)
        #[arg(long)]
        commissioner: bool,
    },

    /// Toggle the commissioner lock on a keeper
    Lock {
        #[arg(long)]
        roster: String,
        #[arg(long)]
        player: String,
        #[arg(long)]
        commissioner: bool,
    },

    /// Full draft board for the current season
    Board,

    /// Analyze a trade proposal read from JSON
    Trade { proposal: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum KeeperKind {
    Franchise,
    Regular,
}

impl From<KeeperKind> for KeeperType {
    fn from(kind: KeeperKind) -> Self {
        match kind {
            KeeperKind::Franchise => KeeperType::Franchise,
            KeeperKind::Regular => KeeperType::Regular,
        }
    }
}

fn actor(commissioner: bool) -> Actor {
    if commissioner {
        Actor::Commissioner
    } else {
        Actor::Owner
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.dir)?;
    info!("keeper starting up");

    let config = config::load_config(&cli.dir).context("failed to load configuration")?;
    info!(
        "Config loaded: league={} ({}), season {}, {} rounds",
        config.league.name, config.league.id, config.settings.current_season, config.settings.draft_rounds
    );

    let db_path = cli.dir.join(&config.db_path);
    let db_path = db_path.to_string_lossy();
    let db = Arc::new(Database::open(&db_path).context("failed to open database")?);
    info!("Database opened at {}", db_path);

    let service = KeeperService::new(Arc::clone(&db), config.settings.clone(), config.valuation.clone());

    let result = run(cli.command, &db, &service).await;
    if let Err(e) = &result {
        error!("command failed: {e:#}");
    }
    result
}

async fn run(command: Commands, db: &Database, service: &KeeperService) -> anyhow::Result<()> {
    match command {
        Commands::Import { facts } => {
            let text = std::fs::read_to_string(&facts)
                .with_context(|| format!("failed to read {}", facts.display()))?;
            let facts: LeagueFacts = serde_json::from_str(&text).context("failed to parse league facts")?;
            db.import_facts(&facts)?;
            info!(
                "imported {} rosters, {} players, {} transactions",
                facts.rosters.len(),
                facts.players.len(),
                facts.transactions.len()
            );
            print_json(&serde_json::json!({
                "rosters": facts.rosters.len(),
                "players": facts.players.len(),
                "draftPicks": facts.draft_picks.len(),
                "transactions": facts.transactions.len(),
                "tradedPicks": facts.traded_picks.len(),
                "keepers": facts.keepers.len(),
            }))
        }
        Commands::Eligibility { roster, player } => print_json(&service.evaluate_player(&roster, &player).await?),
        Commands::Cascade { roster } => print_json(&service.recalculate_roster(&roster).await?),
        Commands::AddKeeper {
            roster,
            player,
            keeper_type,
        } => print_json(&service.add_keeper(&roster, &player, keeper_type.into()).await?),
        Commands::RemoveKeeper {
            roster,
            player,
            commissioner,
        } => print_json(&service.remove_keeper(&roster, &player, actor(commissioner)).await?),
        Commands::Lock {
            roster,
            player,
            commissioner,
        } => {
            let locked = service.toggle_lock(&roster, &player, actor(commissioner)).await?;
            print_json(&serde_json::json!({ "playerId": player, "isLocked": locked }))
        }
        Commands::Board => print_json(&service.draft_board().await?),
        Commands::Trade { proposal } => {
            let text = std::fs::read_to_string(&proposal)
                .with_context(|| format!("failed to read {}", proposal.display()))?;
            let proposal: TradeProposal = serde_json::from_str(&text).context("failed to parse trade proposal")?;
            print_json(&service.analyze_trade(&proposal).await?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}

/// Initialize tracing to log to a file so stdout stays clean JSON.
fn init_tracing(base_dir: &std::path::Path) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = base_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("keeper.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("keeper_app=info,keeper_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
