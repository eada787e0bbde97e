//! Public and RBAC-protected API handlers.

use axum::Json;
use serde_json::{Value, json};

use crate::auth::CurrentIdentity;

/// Service banner.
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Identity and Authorization Gateway (IAG)",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn admin_only(CurrentIdentity(user): CurrentIdentity) -> Json<Value> {
    Json(json!({
        "message": "Welcome to admin area",
        "user": user,
    }))
}

pub async fn user_data(CurrentIdentity(user): CurrentIdentity) -> Json<Value> {
    Json(json!({
        "message": "User data access granted",
        "user": user,
        "data": {
            "resource": "user-data",
            "info": "This is protected user data",
        },
    }))
}

pub async fn viewer_data(CurrentIdentity(user): CurrentIdentity) -> Json<Value> {
    Json(json!({
        "message": "Viewer data access granted",
        "user": user,
        "data": {
            "resource": "viewer-data",
            "info": "This is read-only data",
        },
    }))
}

pub async fn create_data(CurrentIdentity(user): CurrentIdentity) -> Json<Value> {
    Json(json!({
        "message": "Data creation allowed",
        "user": user.email(),
    }))
}
