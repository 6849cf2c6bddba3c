//! Category business logic - creating categories and browsing them.
//!
//! Category listings count only active products, and categories without any
//! active product are left out of the browsing lists, the same way the
//! storefront sidebar shows them.

use crate::{
    config::settings::CategorySeed,
    entities::{Category, Product, category, product},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument};

/// A category together with the number of active products in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryWithCount {
    /// The category itself
    #[serde(flatten)]
    pub category: category::Model,
    /// Active products listed under it
    pub product_count: i64,
}

/// Turns free text into a URL slug (`"Garden Tools"` → `"garden-tools"`).
///
/// # Errors
/// Returns [`Error::Validation`] if nothing usable is left after slugifying.
pub fn make_slug(text: &str) -> Result<String> {
    let slug = slug::slugify(text);
    if slug.is_empty() {
        return Err(Error::Validation {
            message: format!("Cannot derive a URL slug from '{text}'"),
        });
    }
    Ok(slug)
}

/// Creates a category. The slug is derived from the name when not given.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only
/// - The slug is already used by another category
/// - The database insert fails
#[instrument(skip(db, description))]
pub async fn create_category(
    db: &DatabaseConnection,
    name: &str,
    slug: Option<&str>,
    description: &str,
    image: Option<String>,
) -> Result<category::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Category name cannot be empty".to_string(),
        });
    }

    let slug = make_slug(slug.unwrap_or(name))?;
    if get_category_by_slug(db, &slug).await?.is_some() {
        return Err(Error::SlugTaken { slug });
    }

    let category = category::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slug),
        description: Set(description.trim().to_string()),
        image: Set(image),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(category_id = category.id, slug = %category.slug, "Category created.");
    Ok(category)
}

/// Creates every seeded category whose slug does not exist yet.
/// Returns how many were created.
pub async fn seed_categories(db: &DatabaseConnection, seeds: &[CategorySeed]) -> Result<usize> {
    let mut created = 0;
    for seed in seeds {
        let slug = make_slug(seed.slug.as_deref().unwrap_or(&seed.name))?;
        if get_category_by_slug(db, &slug).await?.is_some() {
            continue;
        }
        create_category(db, &seed.name, Some(&slug), &seed.description, None).await?;
        created += 1;
    }
    Ok(created)
}

/// Finds a category by slug.
pub async fn get_category_by_slug(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<Option<category::Model>> {
    Category::find()
        .filter(category::Column::Slug.eq(slug))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a category by slug, failing with [`Error::CategoryNotFound`].
pub async fn require_category(db: &DatabaseConnection, slug: &str) -> Result<category::Model> {
    get_category_by_slug(db, slug)
        .await?
        .ok_or_else(|| Error::CategoryNotFound {
            slug: slug.to_string(),
        })
}

/// All categories, ordered by name.
pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>> {
    Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn active_product_counts(db: &DatabaseConnection) -> Result<HashMap<i64, i64>> {
    let counts: Vec<(i64, i64)> = Product::find()
        .select_only()
        .column(product::Column::CategoryId)
        .column_as(Expr::col(product::Column::Id).count(), "product_count")
        .filter(product::Column::IsActive.eq(true))
        .group_by(product::Column::CategoryId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(counts.into_iter().collect())
}

/// Categories that contain at least one active product, ordered by name,
/// each with its active-product count.
pub async fn categories_with_counts(db: &DatabaseConnection) -> Result<Vec<CategoryWithCount>> {
    let counts = active_product_counts(db).await?;
    Ok(list_categories(db)
        .await?
        .into_iter()
        .filter_map(|category| {
            counts
                .get(&category.id)
                .map(|&product_count| CategoryWithCount {
                    category,
                    product_count,
                })
        })
        .collect())
}

/// The `limit` categories with the most active products. Ties keep name order.
pub async fn top_categories(
    db: &DatabaseConnection,
    limit: usize,
) -> Result<Vec<CategoryWithCount>> {
    let mut categories = categories_with_counts(db).await?;
    categories.sort_by(|a, b| b.product_count.cmp(&a.product_count));
    categories.truncate(limit);
    Ok(categories)
}
