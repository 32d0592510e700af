//! One scrape-and-reconcile pass over every active category.

use std::time::Duration;

use futures::future::join_all;
use tracing::{info, info_span, warn, Instrument};
use url::Url;

use crate::catalog::{CatalogStore, StoreError};
use crate::{
    reconcile_category, Config, FetchError, ListingPage, ListingSelectors, PageFetcher,
    ReconcileSummary,
};

/// What a pass needs besides the store.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub site_url: Url,
    pub request_timeout: Option<Duration>,
    pub selectors: ListingSelectors,
}

impl From<&Config> for ScrapeSettings {
    fn from(config: &Config) -> Self {
        ScrapeSettings {
            site_url: config.site_url.clone(),
            request_timeout: config.request_timeout,
            selectors: config.selectors.clone(),
        }
    }
}

/// How a category's pipeline ended.
#[derive(Debug)]
pub enum CategoryOutcome {
    Reconciled(ReconcileSummary),
    /// The page could not be fetched; the catalog was not touched.
    FetchFailed(FetchError),
    /// Reconciliation failed and its transaction was rolled back.
    PersistFailed(StoreError),
}

#[derive(Debug)]
pub struct CategoryReport {
    pub slug: String,
    /// Listings dropped because they could not be extracted.
    pub rejected_listings: usize,
    pub outcome: CategoryOutcome,
}

impl CategoryReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CategoryOutcome::Reconciled(_))
    }
}

/// Per-category results of a pass. No order between categories is implied.
#[derive(Debug, Default)]
pub struct RunReport {
    pub categories: Vec<CategoryReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.categories.iter().filter(|c| c.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.categories.len() - self.succeeded()
    }

    pub fn category(&self, slug: &str) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.slug == slug)
    }
}

/// Scrapes and reconciles every active category concurrently.
///
/// Only the initial category query can fail the pass. Failures inside a
/// category are logged and reported in the returned [`RunReport`] without
/// affecting any other category.
pub async fn run(
    store: &dyn CatalogStore,
    settings: &ScrapeSettings,
) -> Result<RunReport, StoreError> {
    let categories = store.active_categories().await?;
    info!(count = categories.len(), "scraping active categories");

    let pipelines = categories.iter().map(|category| {
        let span = info_span!("category", slug = %category.slug);
        run_category(store, settings, &category.slug).instrument(span)
    });

    Ok(RunReport {
        categories: join_all(pipelines).await,
    })
}

/// Fetches, extracts and reconciles a single category.
pub async fn run_category(
    store: &dyn CatalogStore,
    settings: &ScrapeSettings,
    slug: &str,
) -> CategoryReport {
    let report = |rejected_listings, outcome| CategoryReport {
        slug: slug.to_owned(),
        rejected_listings,
        outcome,
    };

    let body = match fetch_category(settings, slug).await {
        Ok(body) => body,
        Err(err) => {
            warn!(error = %err, "fetch failed, skipping category");
            return report(0, CategoryOutcome::FetchFailed(err));
        }
    };

    let page = ListingPage::parse(&body, &settings.selectors, &settings.site_url);
    for rejected in &page.rejected {
        warn!(position = rejected.position, error = %rejected.error, "skipping listing");
    }
    info!(
        products = page.products.len(),
        rejected = page.rejected.len(),
        "listings extracted"
    );

    let outcome = match reconcile_category(store, slug, &page.products).await {
        Ok(summary) => CategoryOutcome::Reconciled(summary),
        Err(err) => {
            warn!(error = %err, "reconciliation failed, category rolled back");
            CategoryOutcome::PersistFailed(err)
        }
    };
    report(page.rejected.len(), outcome)
}

async fn fetch_category(settings: &ScrapeSettings, slug: &str) -> Result<String, FetchError> {
    let fetcher = PageFetcher::new(settings.site_url.clone(), settings.request_timeout)?;
    let url = fetcher.category_url(slug)?;
    fetcher.fetch(&url).await
}
