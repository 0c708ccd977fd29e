use anyhow::Result;
use clap::Parser as _;
use kbingest::{
    config::{Credentials, Settings},
    ingest::{Clients, ingest},
};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Loaded first so `.env` can provide flags, credentials and `RUST_LOG`
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::parse();

    let Some(credentials) = Credentials::acquire(!settings.non_interactive)? else {
        tracing::error!("Missing one or more keys. Exiting.");
        return Ok(());
    };

    let clients = match Clients::init(&settings, &credentials) {
        Ok(clients) => clients,
        Err(err) => {
            tracing::error!("Failed to initialize clients: {err:#}");
            return Ok(());
        }
    };

    match ingest(&settings, clients).await {
        Ok(Some(stats)) if stats.failed_files > 0 => {
            tracing::warn!(
                "{} of {} files failed, see the errors above",
                stats.failed_files,
                stats.files
            );
        }
        Ok(_) => {}
        Err(err) => tracing::error!("Ingestion aborted: {err:#}"),
    }

    Ok(())
}
