use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogStore, CatalogTransaction, NewProduct, StoreError};
use crate::ProductRecord;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// What one category's reconciliation changed.
pub struct ReconcileSummary {
    /// Products seen for the first time.
    pub inserted: usize,
    /// Known products whose price changed.
    pub updated: usize,
    /// Known products seen at their stored price.
    pub unchanged: usize,
}

/// Applies the products scraped for `category` to the catalog.
///
/// All writes happen in one transaction. If any of them fails the transaction
/// is rolled back and nothing from this batch is kept.
pub async fn reconcile_category(
    store: &dyn CatalogStore,
    category: &str,
    records: &[ProductRecord],
) -> Result<ReconcileSummary, StoreError> {
    let mut tx = store.begin().await?;

    match apply_records(tx.as_mut(), records).await {
        Ok(summary) => {
            tx.commit().await?;
            info!(
                category,
                inserted = summary.inserted,
                updated = summary.updated,
                unchanged = summary.unchanged,
                "catalog reconciled"
            );
            Ok(summary)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(category, error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

async fn apply_records(
    tx: &mut dyn CatalogTransaction,
    records: &[ProductRecord],
) -> Result<ReconcileSummary, StoreError> {
    let mut summary = ReconcileSummary::default();

    for record in records {
        let now = Utc::now();
        match tx.find_by_slug(&record.slug).await? {
            Some(entry) if entry.price == record.price => summary.unchanged += 1,
            Some(entry) => {
                let lowest = entry
                    .lowest_price
                    .map_or(record.price, |lowest| lowest.min(record.price));
                tx.update_price(entry.id, record.price, lowest).await?;
                tx.append_history(entry.id, record.price, now).await?;

                debug!(
                    slug = %record.slug,
                    old = %entry.price,
                    new = %record.price,
                    change_percent = %change_percent(entry.price, record.price).unwrap_or_default(),
                    "price changed"
                );
                summary.updated += 1;
            }
            None => {
                let product = NewProduct {
                    slug: &record.slug,
                    title: &record.title,
                    link: &record.link,
                    price: record.price,
                };
                let id = tx.insert_product(product, now).await?;
                tx.append_history(id, record.price, now).await?;

                debug!(slug = %record.slug, id, price = %record.price, "new product");
                summary.inserted += 1;
            }
        }
    }

    Ok(summary)
}

/// Signed change from `old` to `new` in percent of `old`, to one decimal.
///
/// `None` when `old` is zero or the result does not fit a `Decimal`.
fn change_percent(old: Decimal, new: Decimal) -> Option<Decimal> {
    let change = new
        .checked_sub(old)?
        .checked_div(old)?
        .checked_mul(Decimal::ONE_HUNDRED)?;
    Some(change.round_dp(1))
}
