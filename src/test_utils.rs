//! Shared test utilities for the storefront.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{account, category, product},
    entities,
    errors::Result,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Stored instead of a real argon2 hash; hashing is slow and most tests
/// never log in. Use [`account::register`] when a test needs a password.
const UNUSABLE_HASH: &str = "!test-only";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a customer account (with profile) that cannot log in.
pub async fn create_test_user(db: &DatabaseConnection, email: &str) -> Result<entities::user::Model> {
    account::insert_user(db, email.to_string(), UNUSABLE_HASH.to_string(), false).await
}

/// Creates a staff account (with profile) that cannot log in.
pub async fn create_test_staff(
    db: &DatabaseConnection,
    email: &str,
) -> Result<entities::user::Model> {
    account::insert_user(db, email.to_string(), UNUSABLE_HASH.to_string(), true).await
}

/// Creates a category whose slug is derived from `name`.
pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::category::Model> {
    category::create_category(db, name, None, "", None).await
}

/// Creates a test product with sensible defaults.
///
/// # Defaults
/// * price: 1000
/// * quantity: 10
/// * no discount
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    category_id: i64,
    author_id: i64,
) -> Result<entities::product::Model> {
    create_custom_product(db, name, 1000, 10, category_id, author_id).await
}

/// Creates a test product with custom price and stock.
pub async fn create_custom_product(
    db: &DatabaseConnection,
    name: &str,
    price: i64,
    quantity: i32,
    category_id: i64,
    author_id: i64,
) -> Result<entities::product::Model> {
    product::create_product(
        db,
        author_id,
        product::NewProduct {
            name: name.to_string(),
            slug: None,
            description: format!("Description of {name}"),
            image: None,
            price,
            discount_percent: 0,
            quantity,
            category_id,
        },
    )
    .await
}

/// Hides a product from listings and checkout.
pub async fn deactivate_product(db: &DatabaseConnection, product_id: i64) -> Result<()> {
    let existing = product::require_product(db, product_id).await?;
    let mut active: entities::product::ActiveModel = existing.into();
    active.is_active = Set(false);
    active.update(db).await?;
    Ok(())
}

/// Sets up a complete test environment with one user who is also the author
/// of one product ("Test Product", price 1000, 10 in stock).
///
/// Returns: (db, user, category, product)
pub async fn setup_with_product() -> Result<(
    DatabaseConnection,
    entities::user::Model,
    entities::category::Model,
    entities::product::Model,
)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "test@example.com").await?;
    let category = create_test_category(&db, "Test Category").await?;
    let product = create_test_product(&db, "Test Product", category.id, user.id).await?;
    Ok((db, user, category, product))
}
