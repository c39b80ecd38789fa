//! centers-web - Project center management service
//!
//! Role-gated HTTP service over the centers database: participant rosters for
//! center staff, bulk CSV import and reporting for the national office, and
//! an append-only audit trail of every mutation.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use centers_web::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "centers-web", about = "Project center management service")]
struct Args {
    /// Data folder holding the database (overrides env and config file)
    #[arg(long)]
    data_folder: Option<String>,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:5730")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting centers-web v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let data_folder =
        centers_common::config::resolve_data_folder(args.data_folder.as_deref(), "CENTERS_DATA");
    let db_path = centers_common::config::ensure_data_folder(&data_folder)?;
    info!("Database path: {}", db_path.display());

    let pool = centers_common::db::init_database(&db_path).await?;

    let state = AppState::new(pool);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    info!("centers-web listening on http://{}", args.bind);
    info!("Health check: http://{}/health", args.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
