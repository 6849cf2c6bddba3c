//! Checkout and order history.

use crate::{
    core::order::{self, OrderStatus},
    errors::Result,
    web::{
        AppState,
        auth::CurrentUser,
        extract::{Form, Path},
    },
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

/// Body of `POST /orders/checkout`.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    /// Delivery address
    #[serde(default)]
    pub shipping_address: String,
}

/// Body of `POST /orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    /// New status name, e.g. `shipped`
    pub status: String,
}

/// `GET /orders`
pub async fn list(State(state): State<AppState>, current: CurrentUser) -> Result<Json<Value>> {
    let orders = order::list_orders(&state.db, current.user.id, None).await?;
    Ok(Json(json!({ "orders": orders })))
}

/// `POST /orders/checkout`
#[instrument(skip_all, fields(user_id = current.user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(form): Form<CheckoutForm>,
) -> Result<(StatusCode, Json<Value>)> {
    let placed = order::place_order(&state.db, current.user.id, &form.shipping_address).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "order": placed })),
    ))
}

/// `GET /orders/{id}`
pub async fn detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(order_id): Path<i64>,
) -> Result<Json<Value>> {
    let detail = order::get_order(&state.db, current.user.id, order_id).await?;
    Ok(Json(json!({ "order": detail })))
}

/// `POST /orders/{id}/cancel`
#[instrument(skip_all, fields(user_id = current.user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(order_id): Path<i64>,
) -> Result<Json<Value>> {
    let cancelled = order::cancel_order(&state.db, current.user.id, order_id).await?;
    Ok(Json(json!({ "success": true, "order": cancelled })))
}

/// `POST /orders/{id}/status` - staff only.
#[instrument(skip_all, fields(user_id = current.user.id))]
pub async fn set_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(order_id): Path<i64>,
    Form(form): Form<StatusForm>,
) -> Result<Json<Value>> {
    let status: OrderStatus = form.status.parse()?;
    let updated = order::update_order_status(&state.db, &current.user, order_id, status).await?;
    Ok(Json(json!({ "success": true, "order": updated })))
}
