//! Order business logic - checkout, order history and status changes.
//!
//! Stock moves here and nowhere else: placing an order takes the ordered
//! units out of stock, and cancelling it puts them back. Both happen in the
//! same transaction as the order rows, with conditional
//! `UPDATE … SET quantity = quantity ± n` statements, so two checkouts can
//! never sell the same unit twice.

use crate::{
    core::{cart, pricing},
    entities::{Cart, Order, OrderItem, Product, order, order_item, product, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    DatabaseTransaction, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::{info, instrument, warn};

/// Lifecycle of an order.
///
/// `Pending → Paid → Shipped → Delivered → Completed`; pending and paid
/// orders may also be `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, awaiting payment
    Pending,
    /// Paid, awaiting shipment
    Paid,
    /// Handed to the carrier
    Shipped,
    /// Received by the customer
    Delivered,
    /// Cancelled; stock has been restored
    Cancelled,
    /// Closed
    Completed,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Paid,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::Completed,
    ];

    /// Name stored in the `orders.status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Whether an order may move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid | Self::Cancelled)
                | (Self::Paid, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
                | (Self::Delivered, Self::Completed)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let wanted = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| Error::Validation {
                message: format!("Unknown order status '{value}'"),
            })
    }
}

/// One order line with the product it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    /// The stored line
    pub item: order_item::Model,
    /// Product name, if the product still exists
    pub product_name: Option<String>,
    /// Product slug, if the product still exists
    pub product_slug: Option<String>,
    /// `item.price × item.quantity`
    pub line_total: i64,
}

/// An order with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    /// The order row
    #[serde(flatten)]
    pub order: order::Model,
    /// Its lines, in the order they were placed
    pub items: Vec<OrderLine>,
}

async fn load_lines<C: ConnectionTrait>(db: &C, order_id: i64) -> Result<Vec<OrderLine>> {
    let rows = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .find_also_related(Product)
        .all(db)
        .await?;

    rows.into_iter()
        .map(|(item, product)| -> Result<OrderLine> {
            Ok(OrderLine {
                line_total: item.total_price()?,
                product_name: product.as_ref().map(|p| p.name.clone()),
                product_slug: product.map(|p| p.slug),
                item,
            })
        })
        .collect()
}

/// Puts the units of every line of an order back into stock.
async fn restock(txn: &DatabaseTransaction, order_id: i64) -> Result<()> {
    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(txn)
        .await?;

    for item in items {
        Product::update_many()
            .col_expr(
                product::Column::Quantity,
                Expr::col(product::Column::Quantity).add(item.quantity),
            )
            .filter(product::Column::Id.eq(item.product_id))
            .exec(txn)
            .await?;
    }
    Ok(())
}

async fn change_status(
    txn: &DatabaseTransaction,
    existing: order::Model,
    next: OrderStatus,
) -> Result<order::Model> {
    let current = existing.status()?;
    if !current.can_transition_to(next) {
        return Err(Error::InvalidStatusTransition {
            from: current,
            to: next,
        });
    }
    if next == OrderStatus::Cancelled {
        restock(txn, existing.id).await?;
    }

    let mut active: order::ActiveModel = existing.into();
    active.status = Set(next.as_str().to_string());
    active.updated_at = Set(Utc::now());
    active.update(txn).await.map_err(Into::into)
}

/// Turns the user's cart into an order.
///
/// For every cart line the product's stock is decremented only if enough
/// units are left and the product is still active; otherwise the whole
/// checkout is rolled back. Line prices are copied from the products at this
/// moment and the cart is emptied.
///
/// # Errors
/// Returns an error if:
/// - The shipping address is blank
/// - The cart is empty ([`Error::EmptyCart`])
/// - Any line asks for more than is in stock ([`Error::InsufficientStock`])
/// - The database transaction fails
#[instrument(skip(db, shipping_address))]
pub async fn place_order(
    db: &DatabaseConnection,
    user_id: i64,
    shipping_address: &str,
) -> Result<OrderDetail> {
    let address = shipping_address.trim();
    if address.is_empty() {
        return Err(Error::Validation {
            message: "Shipping address cannot be empty".to_string(),
        });
    }

    let txn = db.begin().await?;
    let lines = cart::lines_for(&txn, user_id).await?;
    if lines.is_empty() {
        return Err(Error::EmptyCart);
    }

    for line in &lines {
        let wanted = line.item.quantity;
        let result = Product::update_many()
            .col_expr(
                product::Column::Quantity,
                Expr::col(product::Column::Quantity).sub(wanted),
            )
            .filter(product::Column::Id.eq(line.product.id))
            .filter(product::Column::Quantity.gte(wanted))
            .filter(product::Column::IsActive.eq(true))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            warn!(
                user_id,
                product_id = line.product.id,
                requested = wanted,
                "Checkout refused, not enough stock."
            );
            return Err(Error::InsufficientStock {
                product: line.product.name.clone(),
                available: if line.product.is_active {
                    line.product.quantity
                } else {
                    0
                },
                requested: wanted,
            });
        }
    }

    let now = Utc::now();
    let total_amount = pricing::sum_totals(lines.iter().map(|line| line.line_total))?;
    let placed = order::ActiveModel {
        user_id: Set(user_id),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        shipping_address: Set(address.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for line in &lines {
        order_item::ActiveModel {
            order_id: Set(placed.id),
            product_id: Set(line.product.id),
            quantity: Set(line.item.quantity),
            price: Set(line.product.price),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    Cart::delete_many()
        .filter(crate::entities::cart::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;

    let items = load_lines(&txn, placed.id).await?;
    txn.commit().await?;

    info!(
        user_id,
        order_id = placed.id,
        total_amount,
        lines = items.len(),
        "Order placed."
    );
    Ok(OrderDetail {
        order: placed,
        items,
    })
}

/// The user's orders, newest first, at most `limit` of them when given.
pub async fn list_orders(
    db: &DatabaseConnection,
    user_id: i64,
    limit: Option<u64>,
) -> Result<Vec<order::Model>> {
    Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads one of the user's orders with its lines.
///
/// # Errors
/// Returns [`Error::OrderNotFound`] if the order does not exist or belongs
/// to someone else.
pub async fn get_order(db: &DatabaseConnection, user_id: i64, order_id: i64) -> Result<OrderDetail> {
    let order = Order::find_by_id(order_id)
        .filter(order::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })?;

    let items = load_lines(db, order.id).await?;
    Ok(OrderDetail { order, items })
}

/// Cancels one of the user's own orders and restores its stock.
///
/// # Errors
/// Returns an error if:
/// - The order does not exist or belongs to someone else
/// - The order is past the `paid` stage ([`Error::InvalidStatusTransition`])
/// - The database transaction fails
#[instrument(skip(db))]
pub async fn cancel_order(
    db: &DatabaseConnection,
    user_id: i64,
    order_id: i64,
) -> Result<order::Model> {
    let txn = db.begin().await?;
    let existing = Order::find_by_id(order_id)
        .filter(order::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })?;

    let cancelled = change_status(&txn, existing, OrderStatus::Cancelled).await?;
    txn.commit().await?;

    info!(user_id, order_id, "Order cancelled.");
    Ok(cancelled)
}

/// Moves any order to a new status. Staff only.
///
/// # Errors
/// Returns an error if:
/// - `actor` is not staff ([`Error::Forbidden`])
/// - The order does not exist
/// - The transition is not allowed
/// - The database transaction fails
#[instrument(skip(db, actor), fields(user_id = actor.id))]
pub async fn update_order_status(
    db: &DatabaseConnection,
    actor: &user::Model,
    order_id: i64,
    status: OrderStatus,
) -> Result<order::Model> {
    if !actor.is_staff {
        return Err(Error::Forbidden);
    }

    let txn = db.begin().await?;
    let existing = Order::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })?;

    let updated = change_status(&txn, existing, status).await?;
    txn.commit().await?;

    info!(order_id, status = %status, "Order status changed.");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{core::cart::add_to_cart, test_utils::*};
    use sea_orm::{DatabaseBackend, MockDatabase};

    async fn stock_of(db: &DatabaseConnection, product_id: i64) -> Result<i32> {
        Ok(Product::find_by_id(product_id)
            .one(db)
            .await?
            .unwrap()
            .quantity)
    }

    #[test]
    fn test_status_round_trip_names() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert_eq!("Shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!(matches!(
            "lost".parse::<OrderStatus>().unwrap_err(),
            Error::Validation { message: _ }
        ));
    }

    #[test]
    fn test_transition_table() {
        use OrderStatus::{Cancelled, Completed, Delivered, Paid, Pending, Shipped};
        assert!(Pending.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Paid.can_transition_to(Cancelled));
        assert!(Delivered.can_transition_to(Completed));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Shipped));
        for next in OrderStatus::ALL {
            assert!(!Cancelled.can_transition_to(next));
            assert!(!Completed.can_transition_to(next));
        }
    }

    #[tokio::test]
    async fn test_place_order_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = place_order(&db, 1, "   ").await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        Ok(())
    }

    #[tokio::test]
    async fn test_place_order_empty_cart() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "buyer@example.com").await?;

        let result = place_order(&db, user.id, "1 Main St").await;
        assert!(matches!(result.unwrap_err(), Error::EmptyCart));
        assert!(list_orders(&db, user.id, None).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_place_order_moves_stock_and_clears_cart() -> Result<()> {
        let (db, user, category, product) = setup_with_product().await?;
        let cheap = create_custom_product(&db, "Cheap", 50, 5, category.id, user.id).await?;
        add_to_cart(&db, user.id, product.id, 2).await?;
        add_to_cart(&db, user.id, cheap.id, 3).await?;

        let placed = place_order(&db, user.id, " 1 Main St ").await?;

        assert_eq!(placed.order.total_amount, 2150);
        assert_eq!(placed.order.status()?, OrderStatus::Pending);
        assert_eq!(placed.order.shipping_address, "1 Main St");
        assert_eq!(placed.items.len(), 2);
        assert_eq!(placed.items[0].item.price, 1000);
        assert_eq!(placed.items[0].product_name.as_deref(), Some("Test Product"));
        assert_eq!(stock_of(&db, product.id).await?, 8);
        assert_eq!(stock_of(&db, cheap.id).await?, 2);
        assert_eq!(crate::core::cart::cart_count(&db, user.id).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_order_keeps_price_snapshot() -> Result<()> {
        let (db, user, _category, product) = setup_with_product().await?;
        add_to_cart(&db, user.id, product.id, 1).await?;
        let placed = place_order(&db, user.id, "1 Main St").await?;

        crate::core::product::set_discount(&db, &user, product.id, 50).await?;

        let reloaded = get_order(&db, user.id, placed.order.id).await?;
        assert_eq!(reloaded.items[0].item.price, 1000);
        assert_eq!(reloaded.order.total_amount, 1000);

        Ok(())
    }

    #[tokio::test]
    async fn test_shortfall_rolls_back_everything() -> Result<()> {
        let (db, user, category, product) = setup_with_product().await?;
        let scarce = create_custom_product(&db, "Scarce", 50, 2, category.id, user.id).await?;
        add_to_cart(&db, user.id, product.id, 4).await?;
        add_to_cart(&db, user.id, scarce.id, 2).await?;

        // Someone else bought the last units after they were carted
        Product::update_many()
            .col_expr(product::Column::Quantity, Expr::value(1))
            .filter(product::Column::Id.eq(scarce.id))
            .exec(&db)
            .await?;

        let result = place_order(&db, user.id, "1 Main St").await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientStock {
                product: _,
                available: 1,
                requested: 2
            }
        ));

        assert_eq!(stock_of(&db, product.id).await?, 10);
        assert_eq!(stock_of(&db, scarce.id).await?, 1);
        assert_eq!(crate::core::cart::cart_count(&db, user.id).await?, 2);
        assert!(list_orders(&db, user.id, None).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_list_and_get_orders() -> Result<()> {
        let (db, user, _category, product) = setup_with_product().await?;
        let other = create_test_user(&db, "other@example.com").await?;

        add_to_cart(&db, user.id, product.id, 1).await?;
        let first = place_order(&db, user.id, "1 Main St").await?;
        add_to_cart(&db, user.id, product.id, 1).await?;
        let second = place_order(&db, user.id, "1 Main St").await?;

        let orders = list_orders(&db, user.id, None).await?;
        assert_eq!(
            orders.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![second.order.id, first.order.id]
        );
        assert_eq!(list_orders(&db, user.id, Some(1)).await?.len(), 1);

        let detail = get_order(&db, user.id, first.order.id).await?;
        assert_eq!(detail.items.len(), 1);

        let result = get_order(&db, other.id, first.order.id).await;
        assert!(matches!(result.unwrap_err(), Error::OrderNotFound { id: _ }));

        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() -> Result<()> {
        let (db, user, _category, product) = setup_with_product().await?;
        add_to_cart(&db, user.id, product.id, 3).await?;
        let placed = place_order(&db, user.id, "1 Main St").await?;
        assert_eq!(stock_of(&db, product.id).await?, 7);

        let cancelled = cancel_order(&db, user.id, placed.order.id).await?;
        assert_eq!(cancelled.status()?, OrderStatus::Cancelled);
        assert_eq!(stock_of(&db, product.id).await?, 10);

        let again = cancel_order(&db, user.id, placed.order.id).await;
        assert!(matches!(
            again.unwrap_err(),
            Error::InvalidStatusTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Cancelled
            }
        ));
        assert_eq!(stock_of(&db, product.id).await?, 10);

        Ok(())
    }

    #[tokio::test]
    async fn test_status_updates_are_staff_only() -> Result<()> {
        let (db, user, _category, product) = setup_with_product().await?;
        let staff = create_test_staff(&db, "staff@example.com").await?;
        add_to_cart(&db, user.id, product.id, 2).await?;
        let placed = place_order(&db, user.id, "1 Main St").await?;
        let id = placed.order.id;

        let refused = update_order_status(&db, &user, id, OrderStatus::Paid).await;
        assert!(matches!(refused.unwrap_err(), Error::Forbidden));

        update_order_status(&db, &staff, id, OrderStatus::Paid).await?;
        update_order_status(&db, &staff, id, OrderStatus::Shipped).await?;

        let too_late = cancel_order(&db, user.id, id).await;
        assert!(matches!(
            too_late.unwrap_err(),
            Error::InvalidStatusTransition { from: _, to: _ }
        ));
        assert_eq!(stock_of(&db, product.id).await?, 8);

        update_order_status(&db, &staff, id, OrderStatus::Delivered).await?;
        let done = update_order_status(&db, &staff, id, OrderStatus::Completed).await?;
        assert_eq!(done.status()?, OrderStatus::Completed);

        Ok(())
    }

    #[tokio::test]
    async fn test_staff_cancel_restores_stock() -> Result<()> {
        let (db, user, _category, product) = setup_with_product().await?;
        let staff = create_test_staff(&db, "staff@example.com").await?;
        add_to_cart(&db, user.id, product.id, 4).await?;
        let placed = place_order(&db, user.id, "1 Main St").await?;

        update_order_status(&db, &staff, placed.order.id, OrderStatus::Paid).await?;
        update_order_status(&db, &staff, placed.order.id, OrderStatus::Cancelled).await?;

        assert_eq!(stock_of(&db, product.id).await?, 10);
        Ok(())
    }
}
