use anyhow::Result;
use clap::Parser as _;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

use cli::{Cli, Commands};
use vaultdb_core::config::Config;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,vaultdb_index=info,vaultdb_embed=info,vaultdb_vector=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let app = commands::App::open(&config, cli.vault).await?;

    match cli.command {
        Commands::Sync => app.sync().await?,
        Commands::Reindex { doc } => app.reindex(&doc).await?,
        Commands::Remove { doc } => app.remove(&doc).await?,
        Commands::Query { text, k, min_score, markdown, write } => {
            app.query(&text, k, min_score, markdown, write.as_deref()).await?
        }
        Commands::Show { doc } => app.show(&doc).await?,
    }
    Ok(())
}
