//! Unified error type for the storefront.
//!
//! Every fallible operation in `core`, `config` and `web` returns [`Result`].
//! The HTTP status each variant maps to lives in `web::response`.

use crate::core::order::OrderStatus;
use thiserror::Error;

/// All errors the storefront can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Any error raised by `SeaORM` or the underlying driver
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure (config file, socket binding)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// User input rejected before touching the database
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// Price below the minimum of one currency unit
    #[error("Invalid price: {price}")]
    InvalidPrice {
        /// The rejected price
        price: i64,
    },

    /// Discount outside `0..=100`
    #[error("Invalid discount percent: {percent}")]
    InvalidDiscount {
        /// The rejected percentage
        percent: i32,
    },

    /// Negative stock or otherwise unusable quantity
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity {
        /// The rejected quantity
        quantity: i32,
    },

    /// No product with that id or slug
    #[error("Product not found: {key}")]
    ProductNotFound {
        /// Id or slug used for the lookup
        key: String,
    },

    /// No category with that slug or id
    #[error("Category not found: {slug}")]
    CategoryNotFound {
        /// Slug used for the lookup
        slug: String,
    },

    /// Cart row missing or owned by another user
    #[error("Cart item not found: {id}")]
    CartItemNotFound {
        /// Cart row id
        id: i64,
    },

    /// Order missing or owned by another user
    #[error("Order not found: {id}")]
    OrderNotFound {
        /// Order id
        id: i64,
    },

    /// No user with that id or email
    #[error("User not found: {key}")]
    UserNotFound {
        /// Id or email used for the lookup
        key: String,
    },

    /// A slug that must be unique is already taken
    #[error("Slug already in use: {slug}")]
    SlugTaken {
        /// The conflicting slug
        slug: String,
    },

    /// Email already registered
    #[error("An account with email {email} already exists")]
    EmailTaken {
        /// The conflicting email
        email: String,
    },

    /// Product has no stock left (or is not for sale)
    #[error("Product '{product}' is out of stock")]
    OutOfStock {
        /// Product name
        product: String,
    },

    /// Not enough stock to fulfil an order line
    #[error("Insufficient stock for '{product}': requested {requested}, available {available}")]
    InsufficientStock {
        /// Product name
        product: String,
        /// Units still in stock
        available: i32,
        /// Units asked for
        requested: i32,
    },

    /// Checkout attempted with nothing in the cart
    #[error("Cart is empty")]
    EmptyCart,

    /// Status change not allowed from the current status
    #[error("Cannot change order status from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status
        from: OrderStatus,
        /// Requested status
        to: OrderStatus,
    },

    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Missing, unknown or expired session token
    #[error("Authentication required")]
    Unauthorized,

    /// Authenticated but not allowed to touch the resource
    #[error("Permission denied")]
    Forbidden,

    /// Password hashing backend failure
    #[error("Password hashing error: {message}")]
    PasswordHash {
        /// Backend message
        message: String,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
