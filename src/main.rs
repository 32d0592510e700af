use eyre::{Result, WrapErr};
use price_tracker::catalog::PgCatalog;
use price_tracker::pipeline::{self, ScrapeSettings};
use price_tracker::Config;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let catalog = PgCatalog::connect(&config.database_url, config.max_connections)
        .await
        .wrap_err("could not connect to the catalog database")?;
    if config.run_migrations {
        catalog.migrate().await.wrap_err("migrations failed")?;
    }

    let report = pipeline::run(&catalog, &ScrapeSettings::from(&config))
        .await
        .wrap_err("could not load active categories")?;

    if report.failed() > 0 {
        let failed: Vec<_> = report
            .categories
            .iter()
            .filter(|c| !c.is_success())
            .map(|c| c.slug.as_str())
            .collect();
        warn!(?failed, "some categories failed");
    }
    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "scrape pass finished"
    );
    Ok(())
}
