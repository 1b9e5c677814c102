mod collect;
mod dump;
mod scheduler;

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "carwatch")]
#[command(about = "Used-car listing harvester")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one discovery-to-persistence pass now.
    Run {
        /// Maximum number of index pages to walk (default 1).
        #[arg(
            long,
            conflicts_with = "all_pages",
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        pages: Option<u32>,
        /// Walk every index page the site advertises.
        #[arg(long)]
        all_pages: bool,
    },
    /// Run the daily scrape and dump jobs until interrupted.
    Schedule,
    /// Write a gzipped database dump now.
    Dump,
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

/// Index page cap for a manual run.
fn manual_page_cap(pages: Option<u32>, all_pages: bool) -> Option<u32> {
    if all_pages {
        None
    } else {
        Some(pages.unwrap_or(1))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = carwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Run { pages, all_pages } => {
            let pool = connect(&config).await?;
            carwatch_db::run_migrations(&pool).await?;
            let page_cap = manual_page_cap(pages, all_pages);
            let summary = collect::run_scrape(&pool, &config, page_cap, "cli").await?;
            println!("{summary}");
        }
        Commands::Schedule => {
            let pool = connect(&config).await?;
            carwatch_db::run_migrations(&pool).await?;
            let mut scheduler = scheduler::build_scheduler(pool, Arc::new(config)).await?;
            shutdown_signal().await;
            scheduler.shutdown().await?;
        }
        Commands::Dump => {
            let path = dump::dump_database(&config).await?;
            println!("dump written to {}", path.display());
        }
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            let pool = connect(&config).await?;
            carwatch_db::ping(&pool).await?;
            println!("database reachable");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let pool = connect(&config).await?;
            let applied = carwatch_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
    }

    Ok(())
}

async fn connect(config: &carwatch_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = carwatch_db::PoolConfig::from_app_config(config);
    Ok(carwatch_db::connect_pool(&config.database_url, pool_config).await?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping scheduler");
}
