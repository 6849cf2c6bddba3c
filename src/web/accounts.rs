//! Registration, login and the profile page.

use crate::{
    core::{
        account::{self, ProfileUpdate},
        cart, order,
    },
    entities::{session, user},
    errors::{Error, Result},
    web::{AppState, auth::CurrentUser, extract::Form},
};
use axum::{Json, extract::State, http::StatusCode};
use chrono::Duration;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

/// Body of `POST /accounts/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    /// Login email
    pub email: String,
    /// Password
    pub password1: String,
    /// Password confirmation
    pub password2: String,
}

/// Body of `POST /accounts/login`.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Login email
    pub email: String,
    /// Password
    pub password: String,
}

fn session_body(user: &user::Model, session: &session::Model) -> Value {
    json!({
        "success": true,
        "token": session.token,
        "expires_at": session.expires_at,
        "user": user,
    })
}

fn session_ttl(state: &AppState) -> Result<Duration> {
    state.config.session.validate()?;
    Duration::try_hours(state.config.session.ttl_hours).ok_or_else(|| Error::Config {
        message: format!("session.ttl_hours out of range: {}", state.config.session.ttl_hours),
    })
}

/// `POST /accounts/register` - creates the account and logs it in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<(StatusCode, Json<Value>)> {
    let ttl = session_ttl(&state)?;
    account::register(&state.db, &form.email, &form.password1, &form.password2).await?;
    let (user, session) = account::login(&state.db, &form.email, &form.password1, ttl).await?;
    Ok((StatusCode::CREATED, Json(session_body(&user, &session))))
}

/// `POST /accounts/login`
#[instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Json<Value>> {
    let (user, session) =
        account::login(&state.db, &form.email, &form.password, session_ttl(&state)?).await?;
    Ok(Json(session_body(&user, &session)))
}

/// `POST /accounts/logout`
pub async fn logout(State(state): State<AppState>, current: CurrentUser) -> Result<Json<Value>> {
    account::logout(&state.db, &current.token).await?;
    Ok(Json(json!({ "success": true })))
}

/// `GET /accounts/profile` - profile, recent orders and cart.
#[instrument(skip_all, fields(user_id = current.user.id))]
pub async fn profile(State(state): State<AppState>, current: CurrentUser) -> Result<Json<Value>> {
    let user_id = current.user.id;
    let profile = account::get_profile(&state.db, user_id).await?;
    let summary = account::profile_summary(&state.db, user_id).await?;
    let orders = order::list_orders(
        &state.db,
        user_id,
        Some(state.config.catalog.profile_orders_limit),
    )
    .await?;
    let contents = cart::cart_contents(&state.db, user_id).await?;

    Ok(Json(json!({
        "display_name": current.user.display_name(),
        "user": current.user,
        "profile": profile,
        "total_orders": summary.total_orders,
        "total_spent": summary.total_spent,
        "orders": orders,
        "cart_items": contents.lines,
        "cart_total": contents.total,
    })))
}

/// `POST /accounts/profile`
#[instrument(skip_all, fields(user_id = current.user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(changes): Form<ProfileUpdate>,
) -> Result<Json<Value>> {
    let profile = account::update_profile(&state.db, current.user.id, changes).await?;
    Ok(Json(json!({ "success": true, "profile": profile })))
}
