//! fathom: command-line front end for the relationship signal reports.
//!
//! Every report subcommand prints pretty JSON with camelCase keys. Reports
//! never fail on a bad store read (they print the empty report and log the
//! error); only config, store open and import can end the process early.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use fathom_lib::db::snapshot::load_snapshot;
use fathom_lib::error::EngineError;
use fathom_lib::services::{
    commitments, cultural, dashboard, introductions, momentum, proof_points, stall,
};
use fathom_lib::signals::proof_points::MeetingContext;
use fathom_lib::state::{load_config, load_config_from, Config};
use fathom_lib::store::SqliteEventStore;

#[derive(Parser)]
#[command(name = "fathom")]
#[command(about = "Relationship signal analytics over a local event store")]
struct Cli {
    /// Path to configuration file (default ~/.fathom/config.json)
    #[arg(short, long, env = "FATHOM_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite store (overrides config file)
    #[arg(long, env = "FATHOM_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Relationships stalled beyond their stage baseline
    StallRisks,
    /// Stall risks with counts and per-stage health
    StallSummary,
    /// Heating/cooling dashboard over active relationships
    Temperature,
    /// Temperature velocity for one relationship
    TemperatureFor { id: String },
    /// Every active relationship's temperature velocity
    Velocities,
    /// Us/them commitment metrics and trust score
    Commitments,
    /// One relationship's commitments split by side
    CommitmentsFor { id: String },
    /// Mark a pending commitment completed
    CompleteCommitment { id: String },
    /// Introduction funnel and top introducers
    Network,
    /// Value generated by received introductions
    NetworkRoi,
    /// Introductions awaiting action
    PendingIntros,
    /// Stats for one introducer
    Introducer { id: String },
    /// Proof point resonance intelligence
    ProofPoints,
    /// Proof points grouped by category
    ProofPointsByCategory,
    /// Proof points for an upcoming meeting
    Recommend {
        #[arg(long)]
        persona: Option<String>,
        #[arg(long)]
        geography: Option<String>,
        #[arg(long)]
        service: Option<String>,
    },
    /// Best proof points for a persona
    PersonaProofPoints { persona: String },
    /// Cultural patterns by geography
    Cultural,
    /// Cultural context for one relationship
    CulturalFor { id: String },
    /// Cultural prep notes for a meeting with a relationship
    CulturalPrep { id: String },
    /// Relationship count per geography
    Geographies,
    /// Headline reports computed together
    Dashboard,
    /// Load a JSON snapshot into the store
    Import { file: PathBuf },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Attach the recovery hint so the user sees what to do next.
fn explain(err: EngineError) -> anyhow::Error {
    let hint = err.recovery_suggestion();
    anyhow::Error::new(err).context(hint)
}

fn resolve_config(path: Option<&Path>) -> Result<Config, EngineError> {
    match path {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
}

const OPEN_ATTEMPTS: u32 = 3;

/// Open the store, retrying while another process holds it locked.
async fn open_store(path: &Path) -> Result<SqliteEventStore, EngineError> {
    let mut attempt = 1;
    loop {
        match SqliteEventStore::open(path).await {
            Ok(store) => return Ok(store),
            Err(e) => {
                let err = EngineError::from(e);
                if attempt >= OPEN_ATTEMPTS || !err.is_retryable() {
                    return Err(err);
                }
                log::warn!("Store busy (attempt {}): {}", attempt, err);
                tokio::time::sleep(std::time::Duration::from_millis(200 * attempt as u64)).await;
                attempt += 1;
            }
        }
    }
}

async fn import(store: &SqliteEventStore, file: &Path) -> Result<(), EngineError> {
    let snapshot = load_snapshot(file).map_err(EngineError::Import)?;
    let counts = store
        .read(move |db| db.import_snapshot(&snapshot))
        .await?;
    log::info!("Imported {}", file.display());
    print_json(&counts).map_err(|e| EngineError::Io(e.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref()).map_err(explain)?;
    let db_path = config.resolve_db_path(cli.db.as_deref()).map_err(explain)?;
    let store = open_store(&db_path)
        .await
        .map_err(explain)
        .with_context(|| format!("Failed to open store at {}", db_path.display()))?;
    let overrides = &config.stage_defaults;

    match cli.command {
        Command::StallRisks => print_json(&stall::get_stall_risks(&store, overrides).await),
        Command::StallSummary => {
            print_json(&stall::get_stall_risk_summary(&store, overrides).await)
        }
        Command::Temperature => {
            print_json(&momentum::get_temperature_velocity_dashboard(&store).await)
        }
        Command::TemperatureFor { id } => {
            print_json(&momentum::get_temperature_velocity(&store, &id).await)
        }
        Command::Velocities => print_json(&momentum::get_all_temperature_velocities(&store).await),
        Command::Commitments => print_json(&commitments::get_commitment_metrics(&store).await),
        Command::CommitmentsFor { id } => {
            print_json(&commitments::get_commitments_by_relationship(&store, &id).await)
        }
        Command::CompleteCommitment { id } => {
            print_json(&commitments::complete_commitment(&store, &id).await)
        }
        Command::Network => print_json(&introductions::get_introduction_network(&store).await),
        Command::NetworkRoi => print_json(&introductions::get_network_roi(&store).await),
        Command::PendingIntros => {
            print_json(&introductions::get_pending_introductions(&store).await)
        }
        Command::Introducer { id } => {
            print_json(&introductions::get_introducer_stats(&store, &id).await)
        }
        Command::ProofPoints => {
            print_json(&proof_points::get_proof_point_intelligence(&store).await)
        }
        Command::ProofPointsByCategory => {
            print_json(&proof_points::get_proof_points_by_category(&store).await)
        }
        Command::Recommend {
            persona,
            geography,
            service,
        } => {
            let context = MeetingContext {
                persona,
                geography,
                service,
            };
            print_json(&proof_points::get_recommended_proof_points(&store, &context).await)
        }
        Command::PersonaProofPoints { persona } => print_json(
            &proof_points::get_best_proof_points_for_persona(&store, &persona).await,
        ),
        Command::Cultural => print_json(&cultural::get_cultural_patterns(&store).await),
        Command::CulturalFor { id } => {
            print_json(&cultural::get_relationship_cultural_context(&store, &id).await)
        }
        Command::CulturalPrep { id } => {
            print_json(&cultural::get_cultural_prep_for_meeting(&store, &id).await)
        }
        Command::Geographies => print_json(&cultural::get_geography_distribution(&store).await),
        Command::Dashboard => print_json(&dashboard::get_dashboard(&store, overrides).await),
        Command::Import { file } => import(&store, &file).await.map_err(explain),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_store_creates_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fathom.db");
        assert!(open_store(&path).await.is_ok());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_open_store_gives_up_on_permanent_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = open_store(dir.path()).await.err().expect("directory is not a store");
        assert!(!err.is_retryable());
    }
}
