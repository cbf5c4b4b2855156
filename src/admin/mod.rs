//! Admin API: circuit introspection and manual reset.
//!
//! | Route                          | Effect                          |
//! |--------------------------------|---------------------------------|
//! | `GET /admin/circuits`          | every registered circuit        |
//! | `GET /admin/circuits/{name}`   | one circuit, 404 if absent      |
//! | `DELETE /admin/circuits/{name}`| forget one circuit              |
//! | `DELETE /admin/circuits`       | forget all circuits             |
//!
//! All routes require the bearer `admin.api_key`.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/circuits", get(list_circuits).delete(delete_circuits))
        .route("/admin/circuits/{name}", get(get_circuit).delete(delete_circuit))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
