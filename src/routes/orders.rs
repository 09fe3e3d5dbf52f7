use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{NewFlightOrder, NewHotelOrder, Order, OrderKind, OrderStatus, Priority, User};
use crate::state::SharedState;
use crate::validate;
use crate::workflow;

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub kind: Option<OrderKind>,
    pub status: Option<OrderStatus>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
}

async fn active_submitter(state: &SharedState, auth: &AuthUser) -> Result<User, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    if !user.is_active {
        return Err(AppError::Validation(
            "Account is deactivated; orders cannot be submitted".to_string(),
        ));
    }
    Ok(user)
}

pub async fn create_flight(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<NewFlightOrder>,
) -> Result<Json<Order>, AppError> {
    validate::flight_order(&req)?;
    let user = active_submitter(&state, &auth).await?;

    let order = db::orders::create_flight(&state.pool, &user, &req).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "order.created",
        "order",
        Some(order.id),
        Some(serde_json::json!({ "kind": "FLIGHT", "order_number": order.order_number })),
    )
    .await;

    Ok(Json(order))
}

pub async fn create_hotel(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<NewHotelOrder>,
) -> Result<Json<Order>, AppError> {
    validate::hotel_order(&req)?;
    let user = active_submitter(&state, &auth).await?;

    let order = db::orders::create_hotel(&state.pool, &user, &req).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "order.created",
        "order",
        Some(order.id),
        Some(serde_json::json!({ "kind": "HOTEL", "order_number": order.order_number })),
    )
    .await;

    Ok(Json(order))
}

/// List the calling user's own orders.
pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(10).clamp(1, 100);
    let offset = page.saturating_sub(1).saturating_mul(per_page);

    let list_params = db::orders::ListParams {
        user_id: Some(auth.user_id),
        kind: params.kind,
        status: params.status,
        priority: params.priority,
        search: params.search,
        from: None,
        to: None,
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

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = db::orders::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    // Read access is owner-or-admin; anyone else learns nothing about the
    // order's existence.
    if !auth.is_admin && order.user_id != auth.user_id {
        return Err(AppError::NotFound("Order not found".to_string()));
    }

    Ok(Json(order))
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub status: OrderStatus,
    pub admin_notes: Option<String>,
}

pub async fn transition(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<Order>, AppError> {
    let order = db::orders::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    let actor = workflow::Actor::from(&auth);
    let notes = req.admin_notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

    workflow::validate_transition(&order, &actor, req.status, notes)?;

    let updated = db::orders::transition(
        &state.pool,
        order.id,
        order.status,
        req.status,
        auth.user_id,
        notes,
    )
    .await?
    .ok_or_else(|| {
        AppError::Conflict("Order was modified concurrently; please retry".to_string())
    })?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "order.transitioned",
        "order",
        Some(order.id),
        Some(serde_json::json!({
            "from": order.status.as_str(),
            "to": updated.status.as_str(),
        })),
    )
    .await;

    Ok(Json(updated))
}
