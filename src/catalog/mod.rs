//! Persisted product catalog.
//!
//! [`CatalogStore`] is the seam between reconciliation and storage. The
//! production store is [`PgCatalog`]. With the `test-util` feature,
//! `MemoryCatalog` keeps everything in process.

#[cfg(any(test, feature = "test-util"))]
mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;

pub type ProductId = i32;

/// Status of catalog entries created by a scrape.
pub const STATUS_ACTIVE: &str = "active";

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
/// A category whose listing page gets scraped.
pub struct Category {
    pub slug: String,
    pub status: String,
}

impl Category {
    pub fn active(slug: impl Into<String>) -> Self {
        Category {
            slug: slug.into(),
            status: STATUS_ACTIVE.into(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
/// A tracked product.
pub struct CatalogEntry {
    pub id: ProductId,
    /// Unique across the whole catalog.
    pub slug: String,
    pub title: String,
    pub link: String,
    /// Price seen on the most recent differing observation.
    pub price: Decimal,
    /// Lowest price ever observed. Rows written before this column was
    /// maintained may hold NULL.
    pub lowest_price: Option<Decimal>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
/// One observed price of a product. Never updated or deleted.
pub struct PriceHistoryEntry {
    pub product_id: ProductId,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A product seen for the first time.
#[derive(Debug, Clone, Copy)]
pub struct NewProduct<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub link: &'a str,
    pub price: Decimal,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("product {0} does not exist")]
    MissingProduct(ProductId),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation()
                || db.is_foreign_key_violation()
                || db.is_check_violation()
            {
                return StoreError::Constraint(db.message().to_owned());
            }
        }
        StoreError::Database(err)
    }
}

/// Storage holding categories, products and their price history.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All categories whose status is active.
    async fn active_categories(&self) -> Result<Vec<Category>, StoreError>;

    /// Starts a unit of work. Nothing written through it is visible to other
    /// transactions until [`CatalogTransaction::commit`].
    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, StoreError>;
}

/// Writes against the catalog that land together or not at all.
#[async_trait]
pub trait CatalogTransaction: Send {
    async fn find_by_slug(&mut self, slug: &str) -> Result<Option<CatalogEntry>, StoreError>;

    async fn update_price(
        &mut self,
        id: ProductId,
        price: Decimal,
        lowest_price: Decimal,
    ) -> Result<(), StoreError>;

    /// Inserts an active product whose lowest price is its first price and
    /// returns the assigned id.
    async fn insert_product(
        &mut self,
        product: NewProduct<'_>,
        created_at: DateTime<Utc>,
    ) -> Result<ProductId, StoreError>;

    async fn append_history(
        &mut self,
        product_id: ProductId,
        price: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
