//! Database configuration module for the storefront.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. Indexes that cannot be expressed on a single column (the cart's
//! `(user_id, product_id)` pair) and the product listing indexes are added
//! explicitly. Every statement is idempotent, so this runs on each start-up.

use crate::entities::{
    Cart, CartColumn, Category, Order, OrderItem, Product, ProductColumn, Session, User,
    UserProfile,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info, instrument};

/// Default database location, created on first use.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, or
/// the configured fallback when it is unset.
#[must_use]
pub fn get_database_url(fallback: &str) -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| fallback.to_string())
}

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database: {}", database_url);
    Database::connect(database_url).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

fn extra_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name("idx_cart_items_user_product")
            .table(Cart)
            .col(CartColumn::UserId)
            .col(CartColumn::ProductId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_products_created_at")
            .table(Product)
            .col(ProductColumn::CreatedAt)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_products_category")
            .table(Product)
            .col(ProductColumn::CategoryId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_products_price")
            .table(Product)
            .col(ProductColumn::Price)
            .if_not_exists()
            .to_owned(),
    ]
}

/// Creates all necessary database tables and indexes.
///
/// Parents are created before children so foreign keys resolve on any backend.
#[instrument(skip(db))]
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, User).await?;
    create_table(db, &schema, UserProfile).await?;
    create_table(db, &schema, Session).await?;
    create_table(db, &schema, Category).await?;
    create_table(db, &schema, Product).await?;
    create_table(db, &schema, Cart).await?;
    create_table(db, &schema, Order).await?;
    create_table(db, &schema, OrderItem).await?;

    for index in extra_indexes() {
        db.execute(builder.build(&index)).await?;
    }

    info!("Database tables and indexes ensured.");
    Ok(())
}
