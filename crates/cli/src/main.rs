//! `nexum` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`    — start the gRPC server, the timer tick loop, and the lease
//!                sweeper.
//! - `migrate`  — run pending database migrations.
//! - `validate` — validate a workflow IR JSON file.

use clap::{Parser, Subcommand};
use db::BlobStore;
use engine::{EngineConfig, Scheduler};
use tracing::info;

#[derive(Parser)]
#[command(name = "nexum", about = "Durable workflow execution engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the gRPC server plus the timer tick loop and lease sweeper.
    Serve {
        #[arg(long, env = "NEXUM_BIND", default_value = "0.0.0.0:7070")]
        bind: String,
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
        #[arg(long, env = "NEXUM_BLOB_DIR", default_value = "./data/blobs")]
        blob_dir: std::path::PathBuf,
        #[arg(long, env = "NEXUM_LEASE_TTL_SECS", default_value_t = queue::DEFAULT_LEASE_TTL_SECS)]
        lease_ttl_secs: i64,
        #[arg(long, env = "NEXUM_INLINE_THRESHOLD_BYTES", default_value_t = engine::config::DEFAULT_INLINE_THRESHOLD_BYTES)]
        inline_threshold_bytes: u64,
        #[arg(long, env = "NEXUM_TICK_INTERVAL_MS", default_value_t = 500)]
        tick_interval_ms: u64,
    },
    /// Run pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Validate a workflow IR JSON file.
    Validate {
        /// Path to the workflow IR JSON file.
        path: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            bind,
            database_url,
            blob_dir,
            lease_ttl_secs,
            inline_threshold_bytes,
            tick_interval_ms,
        } => {
            let pool = db::pool::create_pool(&database_url, 10)
                .await
                .expect("failed to connect to database");
            let blobs = BlobStore::new(blob_dir);
            let config = EngineConfig {
                inline_threshold_bytes,
                lease_ttl_secs,
                tick_interval: std::time::Duration::from_millis(tick_interval_ms),
            };
            let scheduler = Scheduler::new(pool.clone(), blobs.clone());

            info!(%bind, "starting gRPC server");
            let server = api::serve(&bind, pool.clone(), blobs, config.clone());
            let ticker = engine::ticker::run(pool.clone(), scheduler.clone(), config.tick_interval);
            let sweeper = engine::sweeper::run(pool, scheduler, config.tick_interval);

            tokio::select! {
                result = server => result.expect("gRPC server exited"),
                _ = ticker => unreachable!("ticker loop never returns"),
                _ = sweeper => unreachable!("sweeper loop never returns"),
            }
        }
        Command::Migrate { database_url } => {
            info!("running migrations against {database_url}");
            let pool = db::pool::create_pool(&database_url, 2)
                .await
                .expect("failed to connect to database");
            db::pool::run_migrations(&pool)
                .await
                .expect("migration failed");
            info!("migrations applied successfully");
        }
        Command::Validate { path } => {
            let content = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("cannot read file {}: {e}", path.display()));

            match nodes::parse_ir(&content) {
                Ok(ir) => {
                    println!("workflow IR is valid ({} nodes)", ir.nodes.len());
                }
                Err(e) => {
                    eprintln!("validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
