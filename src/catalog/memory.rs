use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{
    CatalogEntry, CatalogStore, CatalogTransaction, Category, NewProduct, PriceHistoryEntry,
    ProductId, StoreError, STATUS_ACTIVE,
};

#[derive(Debug, Default)]
struct MemoryState {
    categories: Vec<Category>,
    products: BTreeMap<ProductId, CatalogEntry>,
    history: Vec<PriceHistoryEntry>,
    last_id: ProductId,
    rejected_slugs: HashSet<String>,
}

impl MemoryState {
    fn slug_taken(&self, slug: &str, except: Option<ProductId>) -> bool {
        self.products
            .values()
            .any(|entry| entry.slug == slug && Some(entry.id) != except)
    }
}

/// Catalog kept in process memory.
///
/// Transactions buffer their writes and apply them atomically on commit,
/// re-checking slug uniqueness against whatever other transactions have
/// committed in the meantime.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(categories: impl IntoIterator<Item = Category>) -> Self {
        let catalog = Self::new();
        catalog.lock().categories.extend(categories);
        catalog
    }

    /// Makes every later insert of `slug` fail with a constraint violation.
    pub fn reject_slug(&self, slug: impl Into<String>) {
        self.lock().rejected_slugs.insert(slug.into());
    }

    /// Committed entry with the given slug.
    pub fn product(&self, slug: &str) -> Option<CatalogEntry> {
        self.lock()
            .products
            .values()
            .find(|entry| entry.slug == slug)
            .cloned()
    }

    /// Committed entries ordered by id.
    pub fn products(&self) -> Vec<CatalogEntry> {
        self.lock().products.values().cloned().collect()
    }

    /// Committed price history of a product, oldest first.
    pub fn history(&self, product_id: ProductId) -> Vec<PriceHistoryEntry> {
        self.lock()
            .history
            .iter()
            .filter(|entry| entry.product_id == product_id)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn active_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self
            .lock()
            .categories
            .iter()
            .filter(|category| category.is_active())
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            catalog: self.clone(),
            written: HashMap::new(),
            inserted: HashSet::new(),
            history: Vec::new(),
        }))
    }
}

struct MemoryTransaction {
    catalog: MemoryCatalog,
    /// Entries inserted or updated in this transaction, by id.
    written: HashMap<ProductId, CatalogEntry>,
    inserted: HashSet<ProductId>,
    history: Vec<PriceHistoryEntry>,
}

impl MemoryTransaction {
    fn entry(&self, id: ProductId) -> Option<CatalogEntry> {
        self.written
            .get(&id)
            .cloned()
            .or_else(|| self.catalog.lock().products.get(&id).cloned())
    }
}

#[async_trait]
impl CatalogTransaction for MemoryTransaction {
    async fn find_by_slug(&mut self, slug: &str) -> Result<Option<CatalogEntry>, StoreError> {
        if let Some(entry) = self.written.values().find(|entry| entry.slug == slug) {
            return Ok(Some(entry.clone()));
        }
        Ok(self.catalog.product(slug))
    }

    async fn update_price(
        &mut self,
        id: ProductId,
        price: Decimal,
        lowest_price: Decimal,
    ) -> Result<(), StoreError> {
        let mut entry = self.entry(id).ok_or(StoreError::MissingProduct(id))?;
        entry.price = price;
        entry.lowest_price = Some(lowest_price);
        self.written.insert(id, entry);
        Ok(())
    }

    async fn insert_product(
        &mut self,
        product: NewProduct<'_>,
        created_at: DateTime<Utc>,
    ) -> Result<ProductId, StoreError> {
        let id = {
            let mut state = self.catalog.lock();
            if state.rejected_slugs.contains(product.slug) {
                return Err(StoreError::Constraint(format!(
                    "slug {:?} rejected by store",
                    product.slug
                )));
            }
            let pending = self.written.values().any(|entry| entry.slug == product.slug);
            if pending || state.slug_taken(product.slug, None) {
                return Err(StoreError::Constraint(format!(
                    "duplicate product slug {:?}",
                    product.slug
                )));
            }
            state.last_id += 1;
            state.last_id
        };

        self.written.insert(
            id,
            CatalogEntry {
                id,
                slug: product.slug.to_owned(),
                title: product.title.to_owned(),
                link: product.link.to_owned(),
                price: product.price,
                lowest_price: Some(product.price),
                status: STATUS_ACTIVE.to_owned(),
                created_at,
            },
        );
        self.inserted.insert(id);
        Ok(id)
    }

    async fn append_history(
        &mut self,
        product_id: ProductId,
        price: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if self.entry(product_id).is_none() {
            return Err(StoreError::MissingProduct(product_id));
        }
        self.history.push(PriceHistoryEntry {
            product_id,
            price,
            created_at,
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction {
            catalog,
            written,
            inserted,
            history,
        } = *self;
        let mut state = catalog.lock();

        for id in &inserted {
            let slug = &written[id].slug;
            if state.slug_taken(slug, Some(*id)) {
                return Err(StoreError::Constraint(format!(
                    "duplicate product slug {slug:?}"
                )));
            }
        }

        state.products.extend(written);
        state.history.extend(history);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
