//! Product listings - the filtered, sorted and paginated views of the catalog
//! used by the home page, category pages and search.
//!
//! Query parameters arrive as loose strings (an HTML filter form sends empty
//! fields), so [`ProductQuery`] keeps them as such and interprets them
//! leniently: unknown sort keys fall back to newest first, unparsable prices
//! are ignored and unusable page numbers are corrected instead of failing.

use crate::{
    core::category::require_category,
    entities::{Product, category, product},
    errors::Result,
};
use sea_orm::{
    Condition, PaginatorTrait, QueryOrder, QuerySelect, RelationTrait, Select, prelude::*,
    sea_query::{JoinType, LikeExpr},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// `LIKE` pattern matching `text` literally anywhere in a column.
///
/// SQLite folds case only for ASCII letters, so other scripts match
/// case-sensitively.
fn contains_pattern(text: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    LikeExpr::new(escaped).escape('\\')
}

/// Sort orders accepted in `sort_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortOrder {
    /// `price`: cheapest first
    PriceAsc,
    /// `-price`: most expensive first
    PriceDesc,
    /// `-time_create`: newest first
    #[default]
    Newest,
    /// `-views`: most viewed first
    MostViewed,
    /// `-discount_percent`: biggest discount first
    BiggestDiscount,
}

impl SortOrder {
    /// Reads a `sort_by` value; anything unknown means [`SortOrder::Newest`].
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("price") => Self::PriceAsc,
            Some("-price") => Self::PriceDesc,
            Some("-views") => Self::MostViewed,
            Some("-discount_percent") => Self::BiggestDiscount,
            _ => Self::Newest,
        }
    }

    /// The `sort_by` value selecting this order.
    #[must_use]
    pub const fn as_param(self) -> &'static str {
        match self {
            Self::PriceAsc => "price",
            Self::PriceDesc => "-price",
            Self::Newest => "-time_create",
            Self::MostViewed => "-views",
            Self::BiggestDiscount => "-discount_percent",
        }
    }

    fn apply(self, select: Select<Product>) -> Select<Product> {
        match self {
            Self::PriceAsc => select
                .order_by_asc(product::Column::Price)
                .order_by_asc(product::Column::Id),
            Self::PriceDesc => select
                .order_by_desc(product::Column::Price)
                .order_by_desc(product::Column::Id),
            Self::Newest => select
                .order_by_desc(product::Column::CreatedAt)
                .order_by_desc(product::Column::Id),
            Self::MostViewed => select
                .order_by_desc(product::Column::Views)
                .order_by_desc(product::Column::Id),
            Self::BiggestDiscount => select
                .order_by_desc(product::Column::DiscountPercent)
                .order_by_desc(product::Column::Id),
        }
    }
}

/// Query-string parameters of a product listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    /// Free text matched against name, description and category name
    pub q: Option<String>,
    /// Category slug to restrict to
    pub category: Option<String>,
    /// Only products with stock when set
    pub in_stock: Option<String>,
    /// Only discounted products when set
    pub with_discount: Option<String>,
    /// Lowest price, inclusive
    pub min_price: Option<String>,
    /// Highest price, inclusive
    pub max_price: Option<String>,
    /// One of `price`, `-price`, `-time_create`, `-views`, `-discount_percent`
    pub sort_by: Option<String>,
    /// 1-based page number
    pub page: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn flag(value: Option<&String>) -> bool {
    non_empty(value).is_some_and(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "off" | "no"))
}

fn amount(value: Option<&String>) -> Option<i64> {
    non_empty(value).and_then(|v| v.parse().ok())
}

impl ProductQuery {
    /// The search text, if any.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        non_empty(self.q.as_ref())
    }

    /// The category slug, if any.
    #[must_use]
    pub fn category_slug(&self) -> Option<&str> {
        non_empty(self.category.as_ref())
    }

    /// Whether out-of-stock products are hidden.
    #[must_use]
    pub fn in_stock_only(&self) -> bool {
        flag(self.in_stock.as_ref())
    }

    /// Whether only discounted products are shown.
    #[must_use]
    pub fn discounted_only(&self) -> bool {
        flag(self.with_discount.as_ref())
    }

    /// Lower price bound; unparsable values are ignored.
    #[must_use]
    pub fn min_price(&self) -> Option<i64> {
        amount(self.min_price.as_ref())
    }

    /// Upper price bound; unparsable values are ignored.
    #[must_use]
    pub fn max_price(&self) -> Option<i64> {
        amount(self.max_price.as_ref())
    }

    /// Requested sort order.
    #[must_use]
    pub fn sort(&self) -> SortOrder {
        SortOrder::parse(self.sort_by.as_deref())
    }

    fn select(&self, category_id: Option<i64>) -> Select<Product> {
        let mut select = Product::find().filter(product::Column::IsActive.eq(true));

        if let Some(category_id) = category_id {
            select = select.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(text) = self.search() {
            select = select
                .join(JoinType::LeftJoin, product::Relation::Category.def())
                .filter(
                    Condition::any()
                        .add(product::Column::Name.like(contains_pattern(text)))
                        .add(product::Column::Description.like(contains_pattern(text)))
                        .add(category::Column::Name.like(contains_pattern(text))),
                );
        }
        if self.in_stock_only() {
            select = select.filter(product::Column::Quantity.gt(0));
        }
        if self.discounted_only() {
            select = select.filter(product::Column::DiscountPercent.gt(0));
        }
        if let Some(min) = self.min_price() {
            select = select.filter(product::Column::Price.gte(min));
        }
        if let Some(max) = self.max_price() {
            select = select.filter(product::Column::Price.lte(max));
        }

        self.sort().apply(select)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// 1-based number of this page
    pub number: u64,
    /// Number of pages, at least 1
    pub num_pages: u64,
    /// Number of items across all pages
    pub total_items: u64,
    /// Whether a later page exists
    pub has_next: bool,
    /// Whether an earlier page exists
    pub has_previous: bool,
}

/// Picks the page to show: non-numeric or missing means the first page,
/// anything outside `1..=num_pages` means the last one.
#[must_use]
pub fn resolve_page(requested: Option<&str>, num_pages: u64) -> u64 {
    let last = num_pages.max(1);
    match requested.map(str::trim).map(str::parse::<i64>) {
        None | Some(Err(_)) => 1,
        Some(Ok(n)) => u64::try_from(n)
            .ok()
            .filter(|n| (1..=last).contains(n))
            .unwrap_or(last),
    }
}

/// A product listing together with the category it was restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    /// Category named by the query, if any
    pub category: Option<category::Model>,
    /// The requested page of products
    pub page: Page<product::Model>,
    /// Sort order applied
    pub sort_by: &'static str,
}

/// Runs a product query and returns one page of `per_page` products.
///
/// # Errors
/// Returns [`crate::errors::Error::CategoryNotFound`] if the query names an
/// unknown category, or a database error.
#[instrument(skip(db, query))]
pub async fn list_products(
    db: &DatabaseConnection,
    query: &ProductQuery,
    per_page: u64,
) -> Result<Listing> {
    let category = match query.category_slug() {
        Some(slug) => Some(require_category(db, slug).await?),
        None => None,
    };

    let paginator = query
        .select(category.as_ref().map(|c| c.id))
        .paginate(db, per_page.max(1));
    let counts = paginator.num_items_and_pages().await?;
    let num_pages = counts.number_of_pages.max(1);
    let number = resolve_page(query.page.as_deref(), num_pages);
    let items = paginator.fetch_page(number - 1).await?;

    debug!(
        total = counts.number_of_items,
        page = number,
        num_pages,
        "Product listing fetched."
    );

    Ok(Listing {
        category,
        page: Page {
            items,
            number,
            num_pages,
            total_items: counts.number_of_items,
            has_next: number < num_pages,
            has_previous: number > 1,
        },
        sort_by: query.sort().as_param(),
    })
}
