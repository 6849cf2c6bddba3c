//! Order entity - A placed purchase with its shipping details.
//!
//! `status` holds one of the lowercase names of
//! [`OrderStatus`](crate::core::order::OrderStatus); use
//! [`Model::status`] to get the typed value.

use crate::core::order::OrderStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Customer who placed the order
    pub user_id: i64,
    /// Sum of all line totals at purchase time
    pub total_amount: i64,
    /// Lifecycle state: `"pending"`, `"paid"`, `"shipped"`, `"delivered"`, `"cancelled"` or `"completed"`
    pub status: String,
    /// Where to deliver
    #[sea_orm(column_type = "Text")]
    pub shipping_address: String,
    /// When the order was placed
    pub created_at: DateTimeUtc,
    /// When the order was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    /// One order has many line items
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parses the stored status string.
    ///
    /// # Errors
    /// Returns an error if the column holds an unknown status name.
    pub fn status(&self) -> crate::errors::Result<OrderStatus> {
        self.status.parse()
    }
}
