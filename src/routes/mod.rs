pub mod admin;
pub mod auth;
pub mod orders;

use axum::Router;
use axum::routing::{get, post};

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/change-password", post(auth::change_password))
        .route(
            "/api/v1/auth/profile",
            get(auth::get_profile).put(auth::update_profile),
        )
        // Orders
        .route("/api/v1/orders/flight", post(orders::create_flight))
        .route("/api/v1/orders/hotel", post(orders::create_hotel))
        .route("/api/v1/orders", get(orders::list))
        .route("/api/v1/orders/{id}", get(orders::get))
        .route("/api/v1/orders/{id}/transition", post(orders::transition))
        // Admin
        .route("/api/v1/admin/orders", get(admin::list_orders))
        .route("/api/v1/admin/orders/stats", get(admin::order_stats))
        .route(
            "/api/v1/admin/users",
            get(admin::list_users).post(admin::create_user),
        )
        .route("/api/v1/admin/users/stats", get(admin::user_stats))
        .route(
            "/api/v1/admin/users/{id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/api/v1/admin/users/{id}/toggle", post(admin::toggle_user))
        .route("/api/v1/admin/audit", get(admin::list_audit))
}
