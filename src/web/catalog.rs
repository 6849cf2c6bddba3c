//! Public catalog pages: home, categories, search and product details.

use crate::{
    core::{
        category,
        listing::{self, ProductQuery},
        product,
    },
    errors::Result,
    web::{
        AppState,
        extract::{Path, Query},
    },
};
use axum::{Json, extract::State};
use serde_json::{Value, json};
use tracing::instrument;

/// Categories sidebar shown next to every listing.
async fn sidebar(state: &AppState) -> Result<Value> {
    let categories = category::categories_with_counts(&state.db).await?;
    let top = category::top_categories(&state.db, state.config.catalog.top_categories_limit).await?;
    Ok(json!({ "categories": categories, "top_categories": top }))
}

/// `GET /` - newest products with filters.
#[instrument(skip(state, query))]
pub async fn home(State(state): State<AppState>, Query(query): Query<ProductQuery>) -> Result<Json<Value>> {
    let listing = listing::list_products(&state.db, &query, state.config.catalog.home_page_size).await?;
    Ok(Json(json!({
        "products": listing.page,
        "sort_by": listing.sort_by,
        "sidebar": sidebar(&state).await?,
    })))
}

/// `GET /categories`
pub async fn categories(State(state): State<AppState>) -> Result<Json<Value>> {
    Ok(Json(sidebar(&state).await?))
}

/// `GET /category/{slug}` - products of one category.
#[instrument(skip(state, query))]
pub async fn category_products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(mut query): Query<ProductQuery>,
) -> Result<Json<Value>> {
    query.category = Some(slug);
    let listing =
        listing::list_products(&state.db, &query, state.config.catalog.category_page_size).await?;
    Ok(Json(json!({
        "category": listing.category,
        "products": listing.page,
        "sort_by": listing.sort_by,
        "sidebar": sidebar(&state).await?,
    })))
}

/// `GET /search?q=…`
#[instrument(skip(state, query))]
pub async fn search(State(state): State<AppState>, Query(query): Query<ProductQuery>) -> Result<Json<Value>> {
    let listing =
        listing::list_products(&state.db, &query, state.config.catalog.search_page_size).await?;
    Ok(Json(json!({
        "query": query.search().unwrap_or_default(),
        "current_category": listing.category,
        "products": listing.page,
        "sort_by": listing.sort_by,
    })))
}

/// `GET /product/{slug}` - counts a view and lists related products.
#[instrument(skip(state))]
pub async fn product_detail(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Value>> {
    let product = product::view_product(&state.db, &slug).await?;
    let related =
        product::related_products(&state.db, &product, state.config.catalog.related_limit).await?;
    Ok(Json(json!({
        "product": product,
        "is_discounted": product.is_discounted(),
        "related_products": related,
    })))
}
