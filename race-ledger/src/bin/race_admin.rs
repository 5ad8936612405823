//! Race ledger admin binary

use anyhow::Context;
use clap::{Parser, Subcommand};
use race_ledger::{catalog, Config, Ledger, RaceSubmission};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "race-admin", version, about = "Fantasy race scoring ledger admin")]
struct Cli {
    /// TOML config file (defaults to RACE_LEDGER_* environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process or reprocess a race from a JSON submission
    Process {
        /// Submission file (raceId, raceName, poleDriverId, fastestLapDriverId, finishers, dnfs)
        file: PathBuf,

        /// Replace this race instead of the one named in the file
        #[arg(long)]
        race_id: Option<Uuid>,
    },
    /// List processed races, most recent first
    Races,
    /// Show one race and its roster scores
    Race { race_id: Uuid },
    /// Roster standings
    Standings,
    /// Block roster changes
    Lock,
    /// Allow roster changes
    Unlock,
    /// Reset the catalog to the default grid
    Seed,
    /// Check every roster total against its score rows
    Verify,
    /// Print ledger metrics in Prometheus text format
    Metrics,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::from_env()?,
    };
    Ok(config)
}

async fn run(cli: Cli, ledger: &Ledger) -> anyhow::Result<()> {
    match cli.cmd {
        Command::Process { file, race_id } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let mut submission: RaceSubmission = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", file.display()))?;
            if race_id.is_some() {
                submission.race_id = race_id;
            }

            let receipt = ledger.process_race(submission).await?;
            println!(
                "{} {} ({}): {} rosters scored, {} old rows cleared{}",
                if receipt.replaced { "Reprocessed" } else { "Processed" },
                receipt.race_name,
                receipt.race_id,
                receipt.rosters_scored,
                receipt.rows_cleared,
                if receipt.unchanged { ", result unchanged" } else { "" }
            );
        }

        Command::Races => {
            for race in ledger.list_races()? {
                println!(
                    "{}  {}  {}",
                    race.id,
                    race.processed_at.format("%Y-%m-%d %H:%M"),
                    race.name
                );
            }
        }

        Command::Race { race_id } => {
            let race = ledger.get_race(race_id)?;
            println!("{}", serde_json::to_string_pretty(&race)?);
            for row in ledger.race_scores(race_id)? {
                let roster = ledger.get_roster(row.roster_id)?;
                println!("{:>5}  {}", row.points, roster.name);
            }
        }

        Command::Standings => {
            for (rank, roster) in ledger.standings()?.iter().enumerate() {
                println!(
                    "{:>3}. {:>5}  {} ({})",
                    rank + 1,
                    roster.cumulative_points,
                    roster.name,
                    roster.owner
                );
            }
        }

        Command::Lock => {
            ledger.set_rosters_locked(true).await?;
            println!("Rosters locked");
        }

        Command::Unlock => {
            ledger.set_rosters_locked(false).await?;
            println!("Rosters unlocked");
        }

        Command::Seed => {
            let drivers = catalog::default_drivers();
            let constructors = catalog::default_constructors();
            let counts = (drivers.len(), constructors.len());
            ledger.replace_catalog(drivers, constructors).await?;
            println!("Catalog reset: {} drivers, {} constructors", counts.0, counts.1);
        }

        Command::Verify => {
            if !ledger.verify_totals()? {
                anyhow::bail!("roster totals do not match their score rows");
            }
            println!("All roster totals match their score rows");
        }

        Command::Metrics => {
            print!("{}", ledger.metrics().render()?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let ledger = Ledger::open(config).await.context("opening race ledger")?;

    let result = run(cli, &ledger).await;
    ledger.shutdown().await?;
    result
}
