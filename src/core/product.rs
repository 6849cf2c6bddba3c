//! Product business logic - publishing, editing and viewing products.
//!
//! Prices are validated here; the discount derivation itself happens in the
//! product entity's save hook (see [`crate::core::pricing`]), so every
//! function that saves a product gets consistent `price`/`old_price` values.
//! Only a product's author or a staff user may change or delete it.

use crate::{
    core::{category::make_slug, pricing},
    entities::{Category, OrderItem, Product, order_item, product, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Input for [`create_product`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    /// Display name
    pub name: String,
    /// URL slug; derived from the name when absent
    #[serde(default)]
    pub slug: Option<String>,
    /// Long description
    #[serde(default)]
    pub description: String,
    /// Main image path; a placeholder is used when absent
    #[serde(default)]
    pub image: Option<String>,
    /// List price, at least 1
    pub price: i64,
    /// Discount in percent
    #[serde(default)]
    pub discount_percent: i32,
    /// Units in stock
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    /// Category to list the product under
    pub category_id: i64,
}

const fn default_quantity() -> i32 {
    1
}

/// Partial update for [`update_product`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductChanges {
    /// New name (the slug is kept)
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New image path
    pub image: Option<String>,
    /// New list price. While a discount is active this replaces the recorded
    /// original price and the selling price is derived from it.
    pub price: Option<i64>,
    /// New discount percent
    pub discount_percent: Option<i32>,
    /// New stock level
    pub quantity: Option<i32>,
    /// Move to another category
    pub category_id: Option<i64>,
    /// Show or hide the product
    pub is_active: Option<bool>,
}

/// What [`delete_product`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Removal {
    /// The row is gone
    Deleted,
    /// The product appears in past orders, so it was hidden instead
    Deactivated,
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Product name cannot be empty".to_string(),
        });
    }
    Ok(())
}

/// Largest stock count a product can be saved with.
pub const MAX_QUANTITY: i32 = 1_000_000;

const fn validate_stock(quantity: i32) -> Result<()> {
    if quantity < 0 || quantity > MAX_QUANTITY {
        return Err(Error::InvalidQuantity { quantity });
    }
    Ok(())
}

async fn ensure_category_exists(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    if Category::find_by_id(category_id).one(db).await?.is_none() {
        return Err(Error::CategoryNotFound {
            slug: category_id.to_string(),
        });
    }
    Ok(())
}

fn ensure_can_manage(actor: &user::Model, product: &product::Model) -> Result<()> {
    if actor.is_staff || actor.id == product.author_id {
        Ok(())
    } else {
        warn!(
            user_id = actor.id,
            product_id = product.id,
            "Refused product change by non-author."
        );
        Err(Error::Forbidden)
    }
}

/// Publishes a new product authored by `author_id`.
///
/// # Errors
/// Returns an error if:
/// - The name is empty, the price is below 1, the stock is negative or the
///   discount is outside `0..=100`
/// - The category does not exist
/// - The slug is already used by another product
/// - The database insert fails
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_product(
    db: &DatabaseConnection,
    author_id: i64,
    input: NewProduct,
) -> Result<product::Model> {
    validate_name(&input.name)?;
    pricing::validate_price(input.price)?;
    pricing::validate_discount(input.discount_percent)?;
    validate_stock(input.quantity)?;

    let name = input.name.trim().to_string();
    let slug = make_slug(
        input
            .slug
            .as_deref()
            .filter(|slug| !slug.trim().is_empty())
            .unwrap_or(&name),
    )?;
    ensure_category_exists(db, input.category_id).await?;
    if get_product_by_slug(db, &slug).await?.is_some() {
        return Err(Error::SlugTaken { slug });
    }

    let now = Utc::now();
    let product = product::ActiveModel {
        name: Set(name),
        slug: Set(slug),
        description: Set(input.description.trim().to_string()),
        image: Set(input
            .image
            .filter(|path| !path.trim().is_empty())
            .unwrap_or_else(|| product::DEFAULT_IMAGE.to_string())),
        price: Set(input.price),
        old_price: Set(None),
        discount_percent: Set(input.discount_percent),
        quantity: Set(input.quantity),
        category_id: Set(input.category_id),
        author_id: Set(author_id),
        views: Set(0),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(product_id = product.id, slug = %product.slug, price = product.price, "Product created.");
    Ok(product)
}

/// Applies a [`ProductChanges`] on behalf of `actor`.
///
/// # Errors
/// Returns an error if:
/// - The product does not exist
/// - `actor` is neither the author nor staff
/// - Any new value fails validation, or the new category does not exist
/// - The database update fails
#[instrument(skip(db, actor, changes), fields(user_id = actor.id))]
pub async fn update_product(
    db: &DatabaseConnection,
    actor: &user::Model,
    product_id: i64,
    changes: ProductChanges,
) -> Result<product::Model> {
    let existing = require_product(db, product_id).await?;
    ensure_can_manage(actor, &existing)?;

    if let Some(name) = &changes.name {
        validate_name(name)?;
    }
    if let Some(price) = changes.price {
        pricing::validate_price(price)?;
    }
    if let Some(percent) = changes.discount_percent {
        pricing::validate_discount(percent)?;
    }
    if let Some(quantity) = changes.quantity {
        validate_stock(quantity)?;
    }
    if let Some(category_id) = changes.category_id {
        ensure_category_exists(db, category_id).await?;
    }

    let discounted_now = existing.old_price.is_some();
    let mut product: product::ActiveModel = existing.into();

    if let Some(name) = changes.name {
        product.name = Set(name.trim().to_string());
    }
    if let Some(description) = changes.description {
        product.description = Set(description.trim().to_string());
    }
    if let Some(image) = changes.image {
        product.image = Set(image);
    }
    if let Some(price) = changes.price {
        if discounted_now {
            product.old_price = Set(Some(price));
        } else {
            product.price = Set(price);
        }
    }
    if let Some(percent) = changes.discount_percent {
        product.discount_percent = Set(percent);
    }
    if let Some(quantity) = changes.quantity {
        product.quantity = Set(quantity);
    }
    if let Some(category_id) = changes.category_id {
        product.category_id = Set(category_id);
    }
    if let Some(is_active) = changes.is_active {
        product.is_active = Set(is_active);
    }

    product.update(db).await.map_err(Into::into)
}

/// Sets the discount of a product; `0` removes it and restores the original price.
///
/// # Errors
/// Same as [`update_product`].
pub async fn set_discount(
    db: &DatabaseConnection,
    actor: &user::Model,
    product_id: i64,
    percent: i32,
) -> Result<product::Model> {
    update_product(
        db,
        actor,
        product_id,
        ProductChanges {
            discount_percent: Some(percent),
            ..Default::default()
        },
    )
    .await
}

/// Removes a product on behalf of `actor`.
///
/// Products that appear in past orders are deactivated instead, so order
/// history keeps its lines.
///
/// # Errors
/// Returns an error if the product does not exist, `actor` may not manage
/// it, or the database operation fails.
#[instrument(skip(db, actor), fields(user_id = actor.id))]
pub async fn delete_product(
    db: &DatabaseConnection,
    actor: &user::Model,
    product_id: i64,
) -> Result<Removal> {
    let product = require_product(db, product_id).await?;
    ensure_can_manage(actor, &product)?;

    let ordered = OrderItem::find()
        .filter(order_item::Column::ProductId.eq(product_id))
        .count(db)
        .await?;

    if ordered > 0 {
        let mut active: product::ActiveModel = product.into();
        active.is_active = Set(false);
        active.update(db).await?;
        info!(product_id, "Product deactivated instead of deleted.");
        return Ok(Removal::Deactivated);
    }

    Product::delete_by_id(product_id).exec(db).await?;
    info!(product_id, "Product deleted.");
    Ok(Removal::Deleted)
}

/// Retrieves a product by its unique ID.
pub async fn get_product_by_id(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a product by ID, failing with [`Error::ProductNotFound`].
pub async fn require_product(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    get_product_by_id(db, product_id)
        .await?
        .ok_or_else(|| Error::ProductNotFound {
            key: product_id.to_string(),
        })
}

/// Finds a product by its slug, active or not.
pub async fn get_product_by_slug(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<Option<product::Model>> {
    Product::find()
        .filter(product::Column::Slug.eq(slug))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads an active product for its detail page and counts the view.
///
/// The counter is bumped with a single `UPDATE … SET views = views + 1`, so
/// concurrent views are never lost.
///
/// # Errors
/// Returns [`Error::ProductNotFound`] for unknown or inactive products.
#[instrument(skip(db))]
pub async fn view_product(db: &DatabaseConnection, slug: &str) -> Result<product::Model> {
    let not_found = || Error::ProductNotFound {
        key: slug.to_string(),
    };
    let product = get_product_by_slug(db, slug)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(not_found)?;

    Product::update_many()
        .col_expr(
            product::Column::Views,
            Expr::col(product::Column::Views).add(1),
        )
        .filter(product::Column::Id.eq(product.id))
        .exec(db)
        .await?;

    get_product_by_id(db, product.id).await?.ok_or_else(not_found)
}

/// Other active products from the same category, newest first.
pub async fn related_products(
    db: &DatabaseConnection,
    product: &product::Model,
    limit: u64,
) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::CategoryId.eq(product.category_id))
        .filter(product::Column::IsActive.eq(true))
        .filter(product::Column::Id.ne(product.id))
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Everything a user has published, newest first, including inactive products.
pub async fn products_by_author(
    db: &DatabaseConnection,
    author_id: i64,
) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::AuthorId.eq(author_id))
        .order_by_desc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn new_product(name: &str, price: i64, category_id: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            slug: None,
            description: "A thing".to_string(),
            image: None,
            price,
            discount_percent: 0,
            quantity: 3,
            category_id,
        }
    }

    #[tokio::test]
    async fn test_create_product_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_product(&db, 1, new_product("  ", 100, 1)).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        let result = create_product(&db, 1, new_product("Lamp", 0, 1)).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidPrice { price: 0 }));

        let mut input = new_product("Lamp", 100, 1);
        input.discount_percent = 120;
        let result = create_product(&db, 1, input).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidDiscount { percent: 120 }
        ));

        let mut input = new_product("Lamp", 100, 1);
        input.quantity = -1;
        let result = create_product(&db, 1, input).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidQuantity { quantity: -1 }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_price_and_stock_caps() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_product(&db, 1, new_product("Lamp", i64::MAX / 2, 1)).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidPrice { .. }));

        let result = create_product(&db, 1, new_product("Lamp", pricing::MAX_PRICE + 1, 1)).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidPrice { .. }));

        let mut input = new_product("Lamp", 100, 1);
        input.quantity = MAX_QUANTITY + 1;
        let result = create_product(&db, 1, input).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidQuantity { .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_product_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let author = create_test_user(&db, "seller@example.com").await?;
        let category = create_test_category(&db, "Lighting").await?;

        let product = create_product(&db, author.id, new_product("Desk Lamp", 1500, category.id))
            .await?;

        assert_eq!(product.slug, "desk-lamp");
        assert_eq!(product.price, 1500);
        assert_eq!(product.old_price, None);
        assert_eq!(product.image, product::DEFAULT_IMAGE);
        assert_eq!(product.views, 0);
        assert!(product.is_active);

        let duplicate =
            create_product(&db, author.id, new_product("Desk lamp", 10, category.id)).await;
        assert!(matches!(duplicate.unwrap_err(), Error::SlugTaken { slug: _ }));

        let missing_category = create_product(&db, author.id, new_product("Fan", 10, 999)).await;
        assert!(matches!(
            missing_category.unwrap_err(),
            Error::CategoryNotFound { slug: _ }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_with_discount_derives_price() -> Result<()> {
        let db = setup_test_db().await?;
        let author = create_test_user(&db, "seller@example.com").await?;
        let category = create_test_category(&db, "Lighting").await?;

        let mut input = new_product("Lamp", 1000, category.id);
        input.discount_percent = 20;
        let product = create_product(&db, author.id, input).await?;

        assert_eq!(product.price, 800);
        assert_eq!(product.old_price, Some(1000));
        Ok(())
    }

    #[tokio::test]
    async fn test_discount_round_trip() -> Result<()> {
        let (db, author, _category, product) = setup_with_product().await?;
        assert_eq!(product.price, 1000);

        let discounted = set_discount(&db, &author, product.id, 20).await?;
        assert_eq!(discounted.price, 800);
        assert_eq!(discounted.old_price, Some(1000));

        // Re-saving with the same discount changes nothing
        let resaved = update_product(
            &db,
            &author,
            product.id,
            ProductChanges {
                quantity: Some(7),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(resaved.price, 800);
        assert_eq!(resaved.old_price, Some(1000));

        // A different discount is taken from the original price
        let deeper = set_discount(&db, &author, product.id, 50).await?;
        assert_eq!(deeper.price, 500);
        assert_eq!(deeper.old_price, Some(1000));

        let restored = set_discount(&db, &author, product.id, 0).await?;
        assert_eq!(restored.price, 1000);
        assert_eq!(restored.old_price, None);

        let stored = Product::find_by_id(product.id).one(&db).await?.unwrap();
        assert_eq!(stored.price, 1000);
        assert_eq!(stored.old_price, None);
        assert_eq!(stored.discount_percent, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_price_change_during_discount_updates_original() -> Result<()> {
        let (db, author, _category, product) = setup_with_product().await?;
        set_discount(&db, &author, product.id, 10).await?;

        let repriced = update_product(
            &db,
            &author,
            product.id,
            ProductChanges {
                price: Some(2000),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(repriced.old_price, Some(2000));
        assert_eq!(repriced.price, 1800);

        let restored = set_discount(&db, &author, product.id, 0).await?;
        assert_eq!(restored.price, 2000);

        Ok(())
    }

    #[tokio::test]
    async fn test_full_discount_keeps_price_positive() -> Result<()> {
        let (db, author, _category, product) = setup_with_product().await?;

        let free = set_discount(&db, &author, product.id, 100).await?;
        assert_eq!(free.price, 1);
        assert_eq!(free.old_price, Some(1000));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_requires_author_or_staff() -> Result<()> {
        let (db, _author, _category, product) = setup_with_product().await?;
        let stranger = create_test_user(&db, "stranger@example.com").await?;
        let staff = create_test_staff(&db, "staff@example.com").await?;

        let refused = set_discount(&db, &stranger, product.id, 10).await;
        assert!(matches!(refused.unwrap_err(), Error::Forbidden));

        let allowed = set_discount(&db, &staff, product.id, 10).await?;
        assert_eq!(allowed.price, 900);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_validation() -> Result<()> {
        let (db, author, _category, product) = setup_with_product().await?;

        let result = update_product(
            &db,
            &author,
            product.id,
            ProductChanges {
                price: Some(-5),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::InvalidPrice { price: -5 }));

        let result = update_product(
            &db,
            &author,
            product.id,
            ProductChanges {
                price: Some(i64::MAX),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::InvalidPrice { .. }));

        let result = set_discount(&db, &author, product.id, -3).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidDiscount { percent: -3 }
        ));

        let result = update_product(&db, &author, 999, ProductChanges::default()).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ProductNotFound { key: _ }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_product() -> Result<()> {
        let (db, author, _category, product) = setup_with_product().await?;
        let stranger = create_test_user(&db, "stranger@example.com").await?;

        let refused = delete_product(&db, &stranger, product.id).await;
        assert!(matches!(refused.unwrap_err(), Error::Forbidden));

        assert_eq!(
            delete_product(&db, &author, product.id).await?,
            Removal::Deleted
        );
        assert!(get_product_by_id(&db, product.id).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_ordered_product_deactivates() -> Result<()> {
        let (db, author, _category, product) = setup_with_product().await?;
        let buyer = create_test_user(&db, "buyer@example.com").await?;
        crate::core::cart::add_to_cart(&db, buyer.id, product.id, 1).await?;
        crate::core::order::place_order(&db, buyer.id, "1 Main St").await?;

        assert_eq!(
            delete_product(&db, &author, product.id).await?,
            Removal::Deactivated
        );
        let stored = get_product_by_id(&db, product.id).await?.unwrap();
        assert!(!stored.is_active);

        Ok(())
    }

    #[tokio::test]
    async fn test_view_product_counts_views() -> Result<()> {
        let (db, author, _category, product) = setup_with_product().await?;

        view_product(&db, &product.slug).await?;
        let viewed = view_product(&db, &product.slug).await?;
        assert_eq!(viewed.views, 2);

        update_product(
            &db,
            &author,
            product.id,
            ProductChanges {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;
        let hidden = view_product(&db, &product.slug).await;
        assert!(matches!(hidden.unwrap_err(), Error::ProductNotFound { key: _ }));

        Ok(())
    }

    #[tokio::test]
    async fn test_related_products() -> Result<()> {
        let (db, author, category, product) = setup_with_product().await?;
        let other_category = create_test_category(&db, "Other").await?;

        let sibling = create_custom_product(&db, "Sibling", 10, 1, category.id, author.id).await?;
        let hidden = create_custom_product(&db, "Hidden", 10, 1, category.id, author.id).await?;
        deactivate_product(&db, hidden.id).await?;
        create_custom_product(&db, "Elsewhere", 10, 1, other_category.id, author.id).await?;

        let related = related_products(&db, &product, 4).await?;
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, sibling.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_products_by_author() -> Result<()> {
        let (db, author, category, first) = setup_with_product().await?;
        let second = create_custom_product(&db, "Second", 10, 1, category.id, author.id).await?;
        let other = create_test_user(&db, "other@example.com").await?;
        create_custom_product(&db, "Not mine", 10, 1, category.id, other.id).await?;

        let mine = products_by_author(&db, author.id).await?;
        assert_eq!(
            mine.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );

        Ok(())
    }
}
