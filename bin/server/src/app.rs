//! HTTP routing for the gateway.

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use iag_platform_access::Role;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{
    self, AppState, Authenticate, GuardChain, GuardStage, RequireAnyRole, RequirePermission,
};
use crate::handlers;

/// Builds the gateway router.
///
/// `/auth/profile` and `/auth/logout` require a valid token. The `/api`
/// routes additionally require a role or permission when RBAC is enabled,
/// and only a valid token otherwise.
pub fn build_router(state: Arc<AppState>) -> Router {
    let authenticated = GuardChain::new().with_stage(Authenticate::new(state.codec.clone()));
    let rbac = state.enable_rbac;
    let access = state.access.clone();

    let session_routes = guarded(
        Router::new()
            .route("/auth/profile", get(auth::profile))
            .route("/auth/logout", get(auth::logout)),
        authenticated.clone(),
    );

    let admin = guarded(
        Router::new().route("/api/admin", get(handlers::admin_only)),
        authorize(
            &authenticated,
            rbac,
            RequireAnyRole::new(access.clone(), vec![Role::Admin]),
        ),
    );

    let user = guarded(
        Router::new().route("/api/user/data", get(handlers::user_data)),
        authorize(
            &authenticated,
            rbac,
            RequireAnyRole::new(access.clone(), vec![Role::User, Role::Admin]),
        ),
    );

    let viewer = guarded(
        Router::new().route("/api/viewer/data", get(handlers::viewer_data)),
        authorize(
            &authenticated,
            rbac,
            RequireAnyRole::new(access.clone(), vec![Role::Viewer, Role::User, Role::Admin]),
        ),
    );

    let create = guarded(
        Router::new().route("/api/data/create", post(handlers::create_data)),
        authorize(
            &authenticated,
            rbac,
            RequirePermission::new(access, "data", "create"),
        ),
    );

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/auth/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        .merge(session_routes)
        .merge(admin)
        .merge(user)
        .merge(viewer)
        .merge(create)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs `chain` in front of every route in `router`.
fn guarded(router: Router<Arc<AppState>>, chain: GuardChain) -> Router<Arc<AppState>> {
    router.route_layer(from_fn_with_state(Arc::new(chain), GuardChain::enforce))
}

/// Appends `stage` to `base` when authorization is enabled.
fn authorize(base: &GuardChain, enabled: bool, stage: impl GuardStage + 'static) -> GuardChain {
    if enabled {
        base.clone().with_stage(stage)
    } else {
        base.clone()
    }
}
