//! Track retail prices by scraping category listings.
//!
//! A pass reads every active category from the catalog, fetches its listing
//! page with [`PageFetcher`], extracts products with [`ListingPage::parse`]
//! and reconciles them against the stored catalog with
//! [`reconcile_category`], appending to the price history whenever a price
//! moves.
//!
//! Feature Flags:
//! - `serde`: Enables serde support for the data model. (default)

pub mod catalog;
pub mod config;
mod fetch;
mod listing;
pub mod pipeline;
mod reconcile;

pub use catalog::{CatalogEntry, CatalogStore, Category, PriceHistoryEntry, StoreError};
pub use config::Config;
pub use fetch::{FetchError, PageFetcher};
use header::{HeaderMap, HeaderValue};
pub use listing::{
    parse_price, ExtractError, ListingPage, ListingSelectors, ProductRecord, RejectedListing,
};
pub use reconcile::{reconcile_category, ReconcileSummary};
use reqwest::header;
pub use url::Url;

/// Builds the default headers for the client.
fn build_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("tr-TR,tr;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers
}
