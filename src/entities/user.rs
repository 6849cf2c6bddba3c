//! User entity - Store customers and staff.
//!
//! Users log in with their email address. `username` is optional and is
//! filled from the email when absent. Passwords are stored as argon2 PHC
//! strings, never in clear text.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login identifier, unique across all users
    #[sea_orm(unique)]
    pub email: String,
    /// Display name; defaults to the email
    pub username: Option<String>,
    /// Argon2 hash of the password
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Inactive users cannot log in
    pub is_active: bool,
    /// Staff may manage any product and change order statuses
    pub is_staff: bool,
    /// When the account was created
    pub date_joined: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Every user has exactly one profile
    #[sea_orm(has_one = "super::user_profile::Entity")]
    Profile,
    /// Login sessions
    #[sea_orm(has_many = "super::session::Entity")]
    Sessions,
    /// Products published by this user
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
    /// Cart line items
    #[sea_orm(has_many = "super::cart::Entity")]
    CartItems,
    /// Placed orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::user_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Name shown to other users: the username, or the email when unset.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.email)
    }
}
