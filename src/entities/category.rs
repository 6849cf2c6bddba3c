//! Category entity - Groups products for browsing.
//!
//! Categories are addressed by their unique slug in URLs.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    /// Unique identifier for the category
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Books")
    pub name: String,
    /// URL identifier, unique across categories
    #[sea_orm(unique)]
    pub slug: String,
    /// Free-form description, may be empty
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Path of the category image under the media root
    pub image: Option<String>,
}

/// Defines relationships between Category and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One category has many products
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
