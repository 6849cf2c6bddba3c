//! Cart endpoints. The JSON shapes match what the storefront's cart page
//! script reads after each button press.

use crate::{
    core::cart::{self, QuantityUpdate},
    errors::Result,
    web::{
        AppState,
        auth::CurrentUser,
        extract::{Form, Path},
    },
};
use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

/// Body of the add and update forms.
#[derive(Debug, Deserialize)]
pub struct QuantityForm {
    /// Requested units
    #[serde(default = "one")]
    pub quantity: i32,
}

const fn one() -> i32 {
    1
}

/// `GET /cart`
pub async fn view(State(state): State<AppState>, current: CurrentUser) -> Result<Json<Value>> {
    let contents = cart::cart_contents(&state.db, current.user.id).await?;
    Ok(Json(json!({
        "items": contents.lines,
        "total": contents.total,
        "cart_count": contents.count,
    })))
}

/// `POST /cart/add/{product_id}`
#[instrument(skip(state, current, form), fields(user_id = current.user.id))]
pub async fn add(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(product_id): Path<i64>,
    Form(form): Form<QuantityForm>,
) -> Result<Json<Value>> {
    let outcome = cart::add_to_cart(&state.db, current.user.id, product_id, form.quantity).await?;
    Ok(Json(json!({
        "success": true,
        "message": outcome.message,
        "clamped": outcome.clamped,
        "cart_count": outcome.cart_count,
        "item_quantity": outcome.item.quantity,
        "product_quantity": outcome.product_quantity,
    })))
}

/// `POST /cart/remove/{cart_item_id}`
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(item_id): Path<i64>,
) -> Result<Json<Value>> {
    let cart_count = cart::remove_from_cart(&state.db, current.user.id, item_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Item removed from cart",
        "cart_count": cart_count,
    })))
}

/// `POST /cart/update/{cart_item_id}`
#[instrument(skip(state, current, form), fields(user_id = current.user.id))]
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(item_id): Path<i64>,
    Form(form): Form<QuantityForm>,
) -> Result<Json<Value>> {
    let body = match cart::update_cart_quantity(&state.db, current.user.id, item_id, form.quantity)
        .await?
    {
        QuantityUpdate::Updated {
            new_quantity,
            item_total,
            cart_total,
        } => json!({
            "success": true,
            "new_quantity": new_quantity,
            "item_total": item_total,
            "cart_total": cart_total,
        }),
        QuantityUpdate::Removed {
            cart_count,
            cart_total,
        } => json!({
            "success": true,
            "removed": true,
            "cart_count": cart_count,
            "cart_total": cart_total,
        }),
    };
    Ok(Json(body))
}
