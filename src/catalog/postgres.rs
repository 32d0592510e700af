use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

use super::{
    CatalogEntry, CatalogStore, CatalogTransaction, Category, NewProduct, ProductId, StoreError,
    STATUS_ACTIVE,
};

/// Catalog stored in Postgres.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(PgCatalog { pool })
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|err| StoreError::Database(err.into()))
    }
}

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn active_categories(&self) -> Result<Vec<Category>, StoreError> {
        let categories = sqlx::query_as("SELECT slug, status FROM categories WHERE status = $1")
            .bind(STATUS_ACTIVE)
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CatalogTransaction for PgTransaction {
    async fn find_by_slug(&mut self, slug: &str) -> Result<Option<CatalogEntry>, StoreError> {
        let entry = sqlx::query_as(
            "SELECT id, slug, title, link, price, lowest_price, status, created_at
             FROM products WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(entry)
    }

    async fn update_price(
        &mut self,
        id: ProductId,
        price: Decimal,
        lowest_price: Decimal,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE products SET price = $1, lowest_price = $2 WHERE id = $3")
            .bind(price)
            .bind(lowest_price)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::MissingProduct(id));
        }
        Ok(())
    }

    async fn insert_product(
        &mut self,
        product: NewProduct<'_>,
        created_at: DateTime<Utc>,
    ) -> Result<ProductId, StoreError> {
        let id = sqlx::query_scalar(
            "INSERT INTO products (slug, title, link, price, lowest_price, status, created_at)
             VALUES ($1, $2, $3, $4, $4, $5, $6)
             RETURNING id",
        )
        .bind(product.slug)
        .bind(product.title)
        .bind(product.link)
        .bind(product.price)
        .bind(STATUS_ACTIVE)
        .bind(created_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn append_history(
        &mut self,
        product_id: ProductId,
        price: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO price_history (product_id, price, created_at) VALUES ($1, $2, $3)")
            .bind(product_id)
            .bind(price)
            .bind(created_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
