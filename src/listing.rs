use std::str::FromStr;

use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use url::Url;

pub const DEFAULT_ITEM_SELECTOR: &str = "li.productListContent-item";
pub const DEFAULT_TITLE_SELECTOR: &str = "h3.product-title";
pub const DEFAULT_LINK_SELECTOR: &str = "a.product-link";
pub const DEFAULT_PRICE_SELECTOR: &str = "div.price-value";

const CURRENCY_SUFFIXES: [&str; 2] = ["TL", "₺"];

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
/// Product found on a category listing page.
pub struct ProductRecord {
    /// Name of the product
    pub title: String,
    /// Absolute link to the product page
    pub link: String,
    /// Price shown on the listing
    pub price: Decimal,
    /// Last path segment of `link`, the key products are matched on
    pub slug: String,
}

/// Why a single listing was skipped.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("listing has no {0}")]
    MissingElement(&'static str),
    #[error("unparsable price {text:?}: {source}")]
    InvalidPrice {
        text: String,
        #[source]
        source: rust_decimal::Error,
    },
    #[error("invalid product link {href:?}: {source}")]
    InvalidLink {
        href: String,
        #[source]
        source: url::ParseError,
    },
    #[error("product link {0} has no slug")]
    MissingSlug(String),
}

/// A listing that could not be turned into a [`ProductRecord`].
#[derive(Debug)]
pub struct RejectedListing {
    /// Zero-based index of the listing among all matched items.
    pub position: usize,
    pub error: ExtractError,
}

/// CSS selectors used to pick listings apart.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    item: Selector,
    title: Selector,
    link: Selector,
    price: Selector,
}

impl ListingSelectors {
    pub fn new(item: &str, title: &str, link: &str, price: &str) -> eyre::Result<Self> {
        Ok(ListingSelectors {
            item: parse_selector(item)?,
            title: parse_selector(title)?,
            link: parse_selector(link)?,
            price: parse_selector(price)?,
        })
    }
}

impl Default for ListingSelectors {
    fn default() -> Self {
        ListingSelectors {
            item: Selector::parse(DEFAULT_ITEM_SELECTOR).unwrap(),
            title: Selector::parse(DEFAULT_TITLE_SELECTOR).unwrap(),
            link: Selector::parse(DEFAULT_LINK_SELECTOR).unwrap(),
            price: Selector::parse(DEFAULT_PRICE_SELECTOR).unwrap(),
        }
    }
}

fn parse_selector(css: &str) -> eyre::Result<Selector> {
    Selector::parse(css).map_err(|err| eyre::eyre!("invalid selector {css:?}: {err:?}"))
}

/// Parses a displayed price such as `1.299,90 TL` into `1299.90`.
///
/// `.` is a thousands separator and `,` the decimal separator.
pub fn parse_price(text: &str) -> Result<Decimal, ExtractError> {
    let trimmed = text.trim();
    let amount = CURRENCY_SUFFIXES
        .iter()
        .find_map(|suffix| trimmed.strip_suffix(suffix))
        .unwrap_or(trimmed);

    let normalized: String = amount
        .chars()
        .filter(|c| *c != '.' && !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    Decimal::from_str(&normalized).map_err(|source| ExtractError::InvalidPrice {
        text: text.to_owned(),
        source,
    })
}

/// Products extracted from one listing page, in document order.
#[derive(Debug, Default)]
pub struct ListingPage {
    pub products: Vec<ProductRecord>,
    pub rejected: Vec<RejectedListing>,
}

impl ListingPage {
    /// Extracts every listing in `html`.
    ///
    /// A listing that is missing an element or carries an unreadable price is
    /// recorded in `rejected`; the remaining listings are still extracted.
    /// Relative product links are resolved against `site_url`.
    pub fn parse(html: &str, selectors: &ListingSelectors, site_url: &Url) -> Self {
        let document = Html::parse_document(html);
        let mut page = ListingPage::default();

        for (position, item) in document.select(&selectors.item).enumerate() {
            match extract_listing(item, selectors, site_url) {
                Ok(product) => page.products.push(product),
                Err(error) => page.rejected.push(RejectedListing { position, error }),
            }
        }

        page
    }
}

fn extract_listing(
    item: ElementRef<'_>,
    selectors: &ListingSelectors,
    site_url: &Url,
) -> Result<ProductRecord, ExtractError> {
    let title = item
        .select(&selectors.title)
        .next()
        .map(|elem| elem.text().collect::<String>().trim().to_owned())
        .filter(|title| !title.is_empty())
        .ok_or(ExtractError::MissingElement("title"))?;

    let href = item
        .select(&selectors.link)
        .next()
        .and_then(|elem| elem.value().attr("href"))
        .ok_or(ExtractError::MissingElement("link"))?;
    let link = site_url
        .join(href.trim())
        .map_err(|source| ExtractError::InvalidLink {
            href: href.to_owned(),
            source,
        })?;

    let price_text = item
        .select(&selectors.price)
        .next()
        .map(|elem| elem.text().collect::<String>())
        .ok_or(ExtractError::MissingElement("price"))?;
    let price = parse_price(&price_text)?;

    let slug = link
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_owned)
        .ok_or_else(|| ExtractError::MissingSlug(link.to_string()))?;

    Ok(ProductRecord {
        title,
        link: link.into(),
        price,
        slug,
    })
}
