//! Cart business logic - adding, removing and re-counting cart line items.
//!
//! A cart is the set of `cart_items` rows owned by one user, at most one row
//! per product. Adding never puts more units in the cart than the product has
//! in stock, and a row whose quantity would drop to zero is deleted. Stock
//! itself is only moved when an order is placed (see [`crate::core::order`]).
//!
//! Every read-modify-write runs inside a database transaction.

use crate::{
    core::pricing,
    entities::{Cart, Product, cart, product},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{debug, info, instrument};

/// One cart row together with the product it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    /// The cart row
    pub item: cart::Model,
    /// The product in the row
    pub product: product::Model,
    /// `product.price × item.quantity`
    pub line_total: i64,
}

/// Everything in a user's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartContents {
    /// Line items, oldest first
    pub lines: Vec<CartLine>,
    /// Sum of all line totals
    pub total: i64,
    /// Number of rows
    pub count: u64,
}

/// Result of [`add_to_cart`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddToCartOutcome {
    /// The created or updated row
    pub item: cart::Model,
    /// Whether the requested quantity was cut down to the available stock
    pub clamped: bool,
    /// Message suitable for showing to the customer
    pub message: String,
    /// Number of rows in the cart afterwards
    pub cart_count: u64,
    /// Units of the product in stock
    pub product_quantity: i32,
}

/// Result of [`update_cart_quantity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QuantityUpdate {
    /// The row now holds `new_quantity` units
    Updated {
        /// Quantity stored in the row
        new_quantity: i32,
        /// Price of the row at the new quantity
        item_total: i64,
        /// Total of the whole cart
        cart_total: i64,
    },
    /// The quantity dropped to zero and the row was deleted
    Removed {
        /// Rows left in the cart
        cart_count: u64,
        /// Total of the remaining cart
        cart_total: i64,
    },
}

pub(crate) async fn lines_for<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<Vec<CartLine>> {
    let rows = Cart::find()
        .filter(cart::Column::UserId.eq(user_id))
        .order_by_asc(cart::Column::Id)
        .find_also_related(Product)
        .all(db)
        .await?;

    rows.into_iter()
        .filter_map(|(item, product)| product.map(|product| (item, product)))
        .map(|(item, product)| -> Result<CartLine> {
            Ok(CartLine {
                line_total: pricing::line_total(product.price, item.quantity)?,
                item,
                product,
            })
        })
        .collect()
}

async fn total_for<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<i64> {
    let lines = lines_for(db, user_id).await?;
    pricing::sum_totals(lines.iter().map(|line| line.line_total))
}

async fn count_for<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<u64> {
    Cart::find()
        .filter(cart::Column::UserId.eq(user_id))
        .count(db)
        .await
        .map_err(Into::into)
}

async fn owned_item<C: ConnectionTrait>(db: &C, user_id: i64, item_id: i64) -> Result<cart::Model> {
    Cart::find_by_id(item_id)
        .filter(cart::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(Error::CartItemNotFound { id: item_id })
}

/// Puts `quantity` units of a product into the user's cart.
///
/// Quantities below one count as one. The resulting row never holds more
/// units than the product has in stock; `clamped` in the outcome tells
/// whether the request had to be cut down.
///
/// # Errors
/// Returns an error if:
/// - The product does not exist
/// - The product is inactive or has no stock ([`Error::OutOfStock`])
/// - The database transaction fails
#[instrument(skip(db))]
pub async fn add_to_cart(
    db: &DatabaseConnection,
    user_id: i64,
    product_id: i64,
    quantity: i32,
) -> Result<AddToCartOutcome> {
    let requested = quantity.max(1);
    let txn = db.begin().await?;

    let product = Product::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::ProductNotFound {
            key: product_id.to_string(),
        })?;

    if !product.is_available() {
        return Err(Error::OutOfStock {
            product: product.name,
        });
    }
    let stock = product.quantity;

    let existing = Cart::find()
        .filter(cart::Column::UserId.eq(user_id))
        .filter(cart::Column::ProductId.eq(product_id))
        .one(&txn)
        .await?;

    let now = Utc::now();
    let (item, wanted) = match existing {
        Some(row) => {
            let wanted = row.quantity.saturating_add(requested);
            let mut active: cart::ActiveModel = row.into();
            active.quantity = Set(wanted.min(stock));
            active.updated_at = Set(now);
            (active.update(&txn).await?, wanted)
        }
        None => {
            let item = cart::ActiveModel {
                user_id: Set(user_id),
                product_id: Set(product_id),
                quantity: Set(requested.min(stock)),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            (item, requested)
        }
    };

    let cart_count = count_for(&txn, user_id).await?;
    txn.commit().await?;

    let clamped = wanted > stock;
    let message = if clamped {
        format!(
            "Only {stock} units of '{}' are available; your cart now holds {}",
            product.name, item.quantity
        )
    } else {
        format!("'{}' was added to your cart", product.name)
    };

    info!(
        user_id,
        product_id,
        quantity = item.quantity,
        clamped,
        "Cart item saved."
    );

    Ok(AddToCartOutcome {
        item,
        clamped,
        message,
        cart_count,
        product_quantity: stock,
    })
}

/// Deletes one row from the user's cart and returns how many rows remain.
///
/// # Errors
/// Returns [`Error::CartItemNotFound`] if the row does not exist or belongs
/// to another user.
#[instrument(skip(db))]
pub async fn remove_from_cart(db: &DatabaseConnection, user_id: i64, item_id: i64) -> Result<u64> {
    let txn = db.begin().await?;
    let item = owned_item(&txn, user_id, item_id).await?;
    Cart::delete_by_id(item.id).exec(&txn).await?;
    let remaining = count_for(&txn, user_id).await?;
    txn.commit().await?;

    debug!(user_id, item_id, remaining, "Cart item removed.");
    Ok(remaining)
}

/// Sets the quantity of a cart row; zero or less deletes the row.
///
/// # Errors
/// Returns [`Error::CartItemNotFound`] if the row does not exist or belongs
/// to another user, or an error if the database transaction fails.
#[instrument(skip(db))]
pub async fn update_cart_quantity(
    db: &DatabaseConnection,
    user_id: i64,
    item_id: i64,
    quantity: i32,
) -> Result<QuantityUpdate> {
    let txn = db.begin().await?;
    let item = owned_item(&txn, user_id, item_id).await?;

    let outcome = if quantity > 0 {
        let price = Product::find_by_id(item.product_id)
            .one(&txn)
            .await?
            .map_or(0, |product| product.price);

        let mut active: cart::ActiveModel = item.into();
        active.quantity = Set(quantity);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        QuantityUpdate::Updated {
            new_quantity: updated.quantity,
            item_total: pricing::line_total(price, updated.quantity)?,
            cart_total: total_for(&txn, user_id).await?,
        }
    } else {
        Cart::delete_by_id(item.id).exec(&txn).await?;
        QuantityUpdate::Removed {
            cart_count: count_for(&txn, user_id).await?,
            cart_total: total_for(&txn, user_id).await?,
        }
    };

    txn.commit().await?;
    debug!(user_id, item_id, quantity, "Cart quantity changed.");
    Ok(outcome)
}

/// Lists the user's cart with its total.
pub async fn cart_contents(db: &DatabaseConnection, user_id: i64) -> Result<CartContents> {
    let lines = lines_for(db, user_id).await?;
    Ok(CartContents {
        total: pricing::sum_totals(lines.iter().map(|line| line.line_total))?,
        count: lines.len() as u64,
        lines,
    })
}

/// Number of rows in the user's cart.
pub async fn cart_count(db: &DatabaseConnection, user_id: i64) -> Result<u64> {
    count_for(db, user_id).await
}
