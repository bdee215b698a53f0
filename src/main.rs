//! Binary entrypoint for the Archeolobot operator CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml`
//! - `profile <user>` - level, experience, coins and pickaxe of a user
//! - `dig <user> [--name <display>]` - excavate once (creates the user if needed)
//! - `sell <user> (--name <artifact> | --max-rarity <tier>)` - sell artifacts
//! - `buy <user> <tier>` - buy a pickaxe
//! - `shop` - list pickaxes and their odds
//! - `collection <user>` - list a user's artifacts
//! - `leaderboard [--limit <n>]` - top users
//! - `stats` / `export [--output <file>]` - ledger statistics
//!
//! See the library crate docs for module-level details: `archeolobot::`.
use anyhow::{bail, Result};
use clap::{ArgGroup, Parser, Subcommand};
use log::info;
use std::path::Path;

use archeolobot::config::Config;
use archeolobot::dig::{open_backend, stats, EconomyStore, RarityTier};

#[derive(Parser)]
#[command(name = "archeolobot")]
#[command(about = "Excavation progression engine: dig, sell, upgrade, climb the leaderboard")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show a user's progress
    Profile { user: String },
    /// Excavate once for a user
    Dig {
        user: String,
        /// Display name used if the user does not exist yet
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Sell artifacts by name or up to a rarity tier
    #[command(group(ArgGroup::new("what").required(true).args(["name", "max_rarity"])))]
    Sell {
        user: String,
        /// Artifact name (first match only)
        #[arg(long)]
        name: Option<String>,
        /// Sell everything at or below this rarity
        #[arg(long)]
        max_rarity: Option<String>,
    },
    /// Buy a pickaxe
    Buy { user: String, tier: String },
    /// List the pickaxe catalog
    Shop,
    /// List a user's artifacts
    Collection { user: String },
    /// Show the leaderboard
    Leaderboard {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Print ledger statistics
    Stats {
        /// Rows in the embedded leaderboard
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Export statistics as JSON
    Export {
        #[arg(short, long, default_value = "statistics.json")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { force } = cli.command {
        init_logging(&None, cli.verbose);
        if Path::new(&cli.config).exists() && !force {
            bail!("{} already exists (use --force to overwrite)", cli.config);
        }
        Config::create_default(&cli.config).await?;
        info!("Configuration file created at {}", cli.config);
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    init_logging(&Some(config.clone()), cli.verbose);
    let leaderboard_limit = config.game.leaderboard_limit;
    let backend = open_backend(&config.storage)?;
    let store = EconomyStore::builder(backend).game(config.game).build()?;
    info!(
        "archeolobot v{} using the {} ledger",
        env!("CARGO_PKG_VERSION"),
        store.backend_name()
    );

    match cli.command {
        Commands::Init { .. } => {}
        Commands::Profile { user } => {
            let record = store.get_user(&user)?;
            println!("{} ({})", record.username, record.user_id);
            println!(
                "Level {} | {}/{} XP",
                record.level,
                record.experience,
                store.xp_to_next_level(&record)
            );
            println!("Coins: {}", record.coins);
            let tool = store
                .tool_catalog()
                .get(&record.tool_tier)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| record.tool_tier.clone());
            println!("Pickaxe: {}", tool);
            println!(
                "Excavations: {} | Artifacts: {}",
                record.total_excavations,
                record.artifact_count()
            );
        }
        Commands::Dig { user, name } => {
            let display = name.unwrap_or_else(|| user.clone());
            store.get_or_create_user(&user, &display)?;
            let dig = store.record_excavation(&user)?;
            println!(
                "Found {} [{}] worth {} coins: {}",
                dig.artifact.name, dig.artifact.rarity, dig.artifact.value, dig.artifact.description
            );
            print!("+{} XP", dig.xp_gained);
            if dig.leveled_up {
                print!(" - level up! Now level {}", dig.level);
            }
            println!();
        }
        Commands::Sell {
            user,
            name,
            max_rarity,
        } => {
            if let Some(artifact_name) = name {
                match store.sell_by_name(&user, &artifact_name)? {
                    (coins, Some(_)) => println!("Sold {} for {} coins.", artifact_name, coins),
                    (_, None) => println!("You have no artifact named '{}'.", artifact_name),
                }
            } else if let Some(raw) = max_rarity {
                let max: RarityTier = raw.parse()?;
                let (coins, count) = store.sell_by_max_rarity(&user, max.as_str())?;
                if count == 0 {
                    println!("Nothing at or below {} to sell.", max);
                } else {
                    println!("Sold {} artifact(s) for {} coins.", count, coins);
                }
            }
        }
        Commands::Buy { user, tier } => {
            let purchase = store.buy_tool(&user, &tier)?;
            println!("{}", purchase.message);
            if !purchase.success {
                std::process::exit(1);
            }
        }
        Commands::Shop => {
            let header: Vec<_> = RarityTier::ALL
                .iter()
                .map(|r| format!("{:>9}", r.as_str()))
                .collect();
            println!("{:10} {:20} {:>6}  {}", "key", "pickaxe", "cost", header.join(""));
            for tool in store.tool_catalog().iter() {
                let weights = store.reward_model().weights_for(&tool.key).to_array();
                let total: u32 = weights.iter().sum();
                let odds: Vec<_> = weights
                    .iter()
                    .map(|w| format!("{:>8.1}%", f64::from(*w) * 100.0 / f64::from(total.max(1))))
                    .collect();
                println!(
                    "{:10} {:20} {:>6}  {}",
                    tool.key,
                    tool.name,
                    tool.cost,
                    odds.join("")
                );
            }
        }
        Commands::Collection { user } => {
            let artifacts = store.get_user_artifacts(&user)?;
            if artifacts.is_empty() {
                println!("No artifacts yet.");
            }
            for artifact in artifacts {
                println!(
                    "{:10} {:24} {:>5}  {}",
                    artifact.rarity.as_str(),
                    artifact.name,
                    artifact.value,
                    artifact.discovered_at.format("%Y-%m-%d")
                );
            }
        }
        Commands::Leaderboard { limit } => {
            let rows = store.get_leaderboard(limit.unwrap_or(leaderboard_limit))?;
            for (rank, row) in rows.iter().enumerate() {
                println!(
                    "{:>2}. {:20} Lv {:2}  {:5} XP  {:6} coins  {} artifacts",
                    rank + 1,
                    row.username,
                    row.level,
                    row.experience,
                    row.coins,
                    row.artifact_count
                );
            }
        }
        Commands::Stats { top } => {
            let summary = stats::collect(&store, top)?;
            print!("{}", stats::render(&summary));
        }
        Commands::Export { output } => {
            let export = stats::export_statistics(&store, Path::new(&output))?;
            println!(
                "Exported {} archaeologists to {}",
                export.total_archaeologists, output
            );
        }
    }
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|cfg| cfg.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when stdout is a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
