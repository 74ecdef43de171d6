use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use crate::middleware::{require_admin, require_auth};
use crate::rate_limit::rate_limit;
use crate::state::AppState;
use crate::{admin, auth, user};

/// Assemble the HTTP API. Shared by the server binary and the integration
/// tests so both exercise the same guard and rate-limit stack.
pub fn api_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login));

    let authed = Router::new()
        .route("/api/logout", post(auth::logout))
        .route("/api/user/profile", get(user::profile))
        .route("/api/user/redeem-code", post(user::redeem_code))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/ban", post(admin::ban_user))
        .route("/api/admin/unban", post(admin::unban_user))
        .route("/api/admin/promote", post(admin::promote_user))
        .route("/api/admin/promo-code", post(admin::create_promo))
        .route("/api/admin/promo-codes", get(admin::list_promos))
        // Added innermost-first: require_auth runs before require_admin.
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(authed)
        .merge(admin_routes)
        .layer(from_fn_with_state(state.clone(), rate_limit))
        .with_state(state)
}
