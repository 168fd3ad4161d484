use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trellis::{api, db, mcp, relations};

#[derive(Parser)]
#[command(name = "trl")]
#[command(about = "Feature relationship tracking for AI-assisted planning")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Trellis HTTP server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Database file (defaults to the platform data directory)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
    /// Start MCP server via stdio (for AI agent integration)
    Mcp {
        /// Database file (defaults to the platform data directory)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
    /// Validate relationships and print the report
    Check {
        /// Database file (defaults to the platform data directory)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

/// Initialize tracing with output to stderr (for MCP mode) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "trellis=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // MCP mode: log to stderr so stdout is clean for protocol
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn open_database(path: Option<PathBuf>) -> anyhow::Result<db::Database> {
    let db = match path {
        Some(path) => db::Database::open(path)?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // MCP mode needs stderr for logging since stdout is the protocol channel
    let use_stderr = matches!(cli.command, Some(Commands::Mcp { .. }));
    init_tracing(use_stderr);

    match cli.command {
        Some(Commands::Serve { port, database }) => {
            tracing::info!("Starting Trellis server on port {}", port);

            let db = open_database(database)?;
            let app = api::create_router(db);

            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
            tracing::info!("Trellis server listening on http://127.0.0.1:{}", port);

            axum::serve(listener, app).await?;
        }
        Some(Commands::Mcp { database }) => {
            let db = open_database(database)?;

            mcp::run_stdio_server(db).await?;
        }
        Some(Commands::Check { database }) => {
            let db = open_database(database)?;

            let features = db.get_all_features()?;
            let modules = db.get_all_modules()?;
            let report = relations::validate(&features, &modules);

            println!("{}", mcp::render::render_validation(&report));

            if !report.valid {
                std::process::exit(1);
            }
        }
        None => {
            // Default: start server
            tracing::info!("Starting Trellis server on port 3000");

            let db = open_database(None)?;
            let app = api::create_router(db);

            let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
            tracing::info!("Trellis server listening on http://127.0.0.1:3000");

            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
