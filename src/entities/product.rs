//! Product entity - Items offered in the catalog.
//!
//! Each product belongs to a category and to the user who published it.
//! `price` is what a customer pays right now; while a discount is active the
//! undiscounted price is kept in `old_price`. The save hook below keeps the
//! two consistent with `discount_percent` on every insert and update.

use crate::core::pricing;
use chrono::Utc;
use sea_orm::{ActiveValue, Set, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Image used when a product is created without one
pub const DEFAULT_IMAGE: &str = "photos/nophoto.jpg";

/// Product database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the product (e.g., "Coffee grinder")
    pub name: String,
    /// URL identifier, unique across products
    #[sea_orm(unique)]
    pub slug: String,
    /// Long description shown on the detail page
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Path of the main image under the media root
    pub image: String,
    /// Current selling price in whole currency units, at least 1
    pub price: i64,
    /// Undiscounted price, set only while `discount_percent > 0`
    pub old_price: Option<i64>,
    /// Discount in percent, `0..=100`
    pub discount_percent: i32,
    /// Units in stock
    pub quantity: i32,
    /// Category this product is listed under
    pub category_id: i64,
    /// User who published the product
    pub author_id: i64,
    /// Number of detail-page views
    pub views: i64,
    /// Inactive products are hidden from listings and cannot be bought
    pub is_active: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "Cascade"
    )]
    Category,
    /// Each product has one author
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
    /// Cart rows referencing this product
    #[sea_orm(has_many = "super::cart::Entity")]
    CartItems,
    /// Order lines referencing this product
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

fn value_of<V>(value: &ActiveValue<V>) -> Option<V>
where
    V: Into<Value> + Clone,
{
    match value {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Some(v.clone()),
        ActiveValue::NotSet => None,
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let (Some(price), Some(old_price), Some(discount_percent)) = (
            value_of(&self.price),
            value_of(&self.old_price),
            value_of(&self.discount_percent),
        ) {
            pricing::validate_discount(discount_percent)
                .map_err(|e| DbErr::Custom(e.to_string()))?;

            let derived = pricing::derive_price(price, old_price, discount_percent);
            if derived.price != price {
                self.price = Set(derived.price);
            }
            if derived.old_price != old_price {
                self.old_price = Set(derived.old_price);
            }
        }

        if !insert {
            self.updated_at = Set(Utc::now());
        }
        Ok(self)
    }
}

impl Model {
    /// Whether a discount is currently applied.
    #[must_use]
    pub const fn is_discounted(&self) -> bool {
        self.discount_percent > 0
    }

    /// Whether at least one unit can be put in a cart.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.is_active && self.quantity > 0
    }
}
