use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod cohort;
mod dispatch;
mod error;
mod models;
mod report;
mod store;

use dispatch::Dispatcher;
use models::{EngineConfig, OpsTelemetry, Role};
use store::{ActivityStore, PgStore};

#[derive(Parser)]
#[command(name = "tier-metrics")]
#[command(about = "Hierarchical coding-activity metrics for campus dashboards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ViewArgs {
    /// Tier to aggregate for.
    #[arg(long, value_enum)]
    role: Role,
    /// Viewer's campus email.
    #[arg(long)]
    viewer: String,
    /// Activity date; defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long, default_value_t = 10)]
    threshold: i64,
    #[arg(long, default_value_t = 7)]
    faculty_recency_days: i64,
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
    /// Ingestion-pipeline health percentage, if known.
    #[arg(long)]
    system_health: Option<f64>,
    /// Ingestion API success percentage, if known.
    #[arg(long)]
    api_success: Option<f64>,
    /// Open support-ticket count, if known.
    #[arg(long)]
    support_tickets: Option<i64>,
}

impl ViewArgs {
    fn config(&self) -> EngineConfig {
        EngineConfig {
            top_performer_threshold: self.threshold,
            faculty_recency_days: self.faculty_recency_days,
            fetch_timeout_secs: self.timeout_secs,
        }
    }

    fn telemetry(&self) -> OpsTelemetry {
        OpsTelemetry {
            system_health: self.system_health,
            api_success: self.api_success,
            support_tickets: self.support_tickets,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import daily activity records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Compute tier statistics for a viewer
    Dashboard {
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown dashboard report
    Report {
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long, default_value = "dashboard.md")]
        out: PathBuf,
    },
}

async fn viewer_name(store: &PgStore, email: &str) -> anyhow::Result<String> {
    Ok(store
        .profile_by_email(email)
        .await?
        .map(|profile| profile.full_name)
        .unwrap_or_else(|| email.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            store::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            store::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = store::import_csv(&pool, &csv).await?;
            println!("Imported {inserted} activity records from {}.", csv.display());
        }
        Commands::Dashboard { view, json } => {
            let date = view.date.unwrap_or_else(|| Utc::now().date_naive());
            let store = PgStore::new(pool);
            let viewer_name = viewer_name(&store, &view.viewer).await?;
            let dispatcher = Dispatcher::new(store, view.config(), view.telemetry());
            let snapshot = dispatcher.load(view.role, &view.viewer, date).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", report::build_report(&snapshot, &viewer_name));
            }
        }
        Commands::Report { view, out } => {
            let date = view.date.unwrap_or_else(|| Utc::now().date_naive());
            let store = PgStore::new(pool);
            let viewer_name = viewer_name(&store, &view.viewer).await?;
            let dispatcher = Dispatcher::new(store, view.config(), view.telemetry());
            let snapshot = dispatcher.load(view.role, &view.viewer, date).await?;

            std::fs::write(&out, report::build_report(&snapshot, &viewer_name))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
