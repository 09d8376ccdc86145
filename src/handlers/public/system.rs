// handlers/public/system.rs - GET / and GET /health handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::routes::AppState;

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Backoffice API",
            "version": version,
            "description": "Multi-tenant role-based access control and menu resolution",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "menus": "/api/v1/menus[/:id|/tree|/user|/stats|/batch-status] (protected)",
                "roles": "/api/v1/roles[/:id|/stats|/batch-status|/tenant/:tenant_id] (protected)",
                "users": "/api/v1/users/:id/roles, /api/v1/users/:id/permissions[/check] (protected)",
            }
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    let Some(db) = &state.db else {
        return (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "storage": "memory" }
            })),
        );
    };

    match db.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "storage": "postgres", "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": true,
                    "message": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": { "status": "degraded", "timestamp": now, "storage": "postgres" }
                })),
            )
        }
    }
}
