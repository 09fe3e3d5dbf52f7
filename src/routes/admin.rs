use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::password;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{OrderKind, OrderStatus, Priority, User};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct OrderListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub kind: Option<OrderKind>,
    pub status: Option<OrderStatus>,
    pub priority: Option<Priority>,
    pub user_id: Option<Uuid>,
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn list_orders(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<OrderListParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(10).clamp(1, 100);
    let offset = page.saturating_sub(1).saturating_mul(per_page);

    let list_params = db::orders::ListParams {
        user_id: params.user_id,
        kind: params.kind,
        status: params.status,
        priority: params.priority,
        search: params.search,
        from: params.from,
        to: params.to,
        limit: per_page,
        offset,
    };

    let orders = db::orders::list(&state.pool, &list_params).await?;
    let total = db::orders::count(&state.pool, &list_params).await?;

    Ok(Json(serde_json::json!({
        "orders": orders,
        "total": total,
        "page": page,
        "per_page": per_page,
        "total_pages": (total as f64 / per_page as f64).ceil() as i64,
    })))
}

pub async fn order_stats(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let total = db::orders::count_all(&state.pool).await?;
    let by_status = db::orders::count_by_status(&state.pool).await?;
    let by_kind = db::orders::count_by_kind(&state.pool).await?;

    let by_status: serde_json::Map<String, serde_json::Value> = by_status
        .into_iter()
        .map(|(status, count)| (status.as_str().to_string(), count.into()))
        .collect();
    let by_kind: serde_json::Map<String, serde_json::Value> = by_kind
        .into_iter()
        .map(|(kind, count)| (kind.as_str().to_string(), count.into()))
        .collect();

    Ok(Json(serde_json::json!({
        "total": total,
        "by_status": by_status,
        "by_kind": by_kind,
    })))
}

#[derive(Deserialize)]
pub struct UserListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn list_users(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<UserListParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(10).clamp(1, 100);
    let offset = page.saturating_sub(1).saturating_mul(per_page);

    let list_params = db::users::ListParams {
        search: params.search,
        position: params.position,
        location: params.location,
        is_active: params.is_active,
        limit: per_page,
        offset,
    };

    let users = db::users::list(&state.pool, &list_params).await?;
    let total = db::users::count(&state.pool, &list_params).await?;

    Ok(Json(serde_json::json!({
        "users": users,
        "total": total,
        "page": page,
        "per_page": per_page,
        "total_pages": (total as f64 / per_page as f64).ceil() as i64,
    })))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub employee_id: String,
    pub full_name: String,
    pub password: String,
    pub position: String,
    pub location: String,
}

pub async fn create_user(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, AppError> {
    auth.require_admin()?;

    if req.password.len() < 6 {
        return Err(AppError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    let user = db::users::create(
        &state.pool,
        req.employee_id.trim(),
        req.full_name.trim(),
        &pw_hash,
        req.position.trim(),
        req.location.trim(),
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("A user with this employee ID already exists".to_string())
        }
        _ => AppError::Database(e),
    })?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "user.created",
        "user",
        Some(user.id),
        None,
    )
    .await;

    Ok(Json(user))
}

pub async fn get_user(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    auth.require_admin()?;

    let user = db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
}

pub async fn update_user(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    auth.require_admin()?;

    let user = db::users::update_profile(
        &state.pool,
        id,
        req.full_name.as_deref().map(str::trim),
        req.position.as_deref().map(str::trim),
        req.location.as_deref().map(str::trim),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "user.updated",
        "user",
        Some(id),
        None,
    )
    .await;

    Ok(Json(user))
}

/// Soft-disable (or re-enable) a user. Users are never hard-deleted through
/// normal flows; this flips `is_active`.
pub async fn toggle_user(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let user = db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let updated = db::users::set_active(&state.pool, id, !user.is_active)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    // A deactivated user's refresh tokens are useless from now on
    if !updated.is_active {
        db::refresh_tokens::delete_all_for_user(&state.pool, id).await?;
    }

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        if updated.is_active {
            "user.activated"
        } else {
            "user.deactivated"
        },
        "user",
        Some(id),
        None,
    )
    .await;

    let message = if updated.is_active {
        "User activated successfully"
    } else {
        "User deactivated successfully"
    };

    Ok(Json(serde_json::json!({ "message": message, "user": updated })))
}

pub async fn delete_user(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    db::users::delete(&state.pool, id).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "user.deleted",
        "user",
        Some(id),
        None,
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}

pub async fn user_stats(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let stats = db::users::stats(&state.pool).await?;

    let by_position: serde_json::Map<String, serde_json::Value> = stats
        .by_position
        .into_iter()
        .map(|(position, count)| (position, count.into()))
        .collect();
    let by_location: serde_json::Map<String, serde_json::Value> = stats
        .by_location
        .into_iter()
        .map(|(location, count)| (location, count.into()))
        .collect();

    Ok(Json(serde_json::json!({
        "total": stats.total,
        "active": stats.active,
        "inactive": stats.inactive,
        "by_position": by_position,
        "by_location": by_location,
    })))
}

#[derive(Deserialize)]
pub struct AuditListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub async fn list_audit(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<AuditListParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);
    let offset = page.saturating_sub(1).saturating_mul(per_page);

    let events = db::audit::list(&state.pool, per_page, offset).await?;

    Ok(Json(serde_json::json!({
        "events": events,
        "page": page,
        "per_page": per_page,
    })))
}
