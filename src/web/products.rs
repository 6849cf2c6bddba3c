//! Product management for logged-in sellers.

use crate::{
    core::product::{self, NewProduct, ProductChanges},
    errors::Result,
    web::{
        AppState,
        auth::CurrentUser,
        extract::{Form, Path},
    },
};
use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::instrument;

/// `POST /products`
#[instrument(skip(state, current, input), fields(user_id = current.user.id))]
pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(input): Form<NewProduct>,
) -> Result<(StatusCode, Json<Value>)> {
    let created = product::create_product(&state.db, current.user.id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "product": created })),
    ))
}

/// `GET /products/mine`
pub async fn mine(State(state): State<AppState>, current: CurrentUser) -> Result<Json<Value>> {
    let products = product::products_by_author(&state.db, current.user.id).await?;
    Ok(Json(json!({ "products": products })))
}

/// `POST /products/{id}/update`
#[instrument(skip(state, current, changes), fields(user_id = current.user.id))]
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(product_id): Path<i64>,
    Form(changes): Form<ProductChanges>,
) -> Result<Json<Value>> {
    let updated = product::update_product(&state.db, &current.user, product_id, changes).await?;
    Ok(Json(json!({ "success": true, "product": updated })))
}

/// `POST /products/{id}/delete`
#[instrument(skip(state, current), fields(user_id = current.user.id))]
pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(product_id): Path<i64>,
) -> Result<Json<Value>> {
    let removal = product::delete_product(&state.db, &current.user, product_id).await?;
    Ok(Json(json!({ "success": true, "result": removal })))
}
