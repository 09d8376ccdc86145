// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route Prefix: /api/v1/*
// Middleware: jwt_auth_middleware places an AuthUser in request extensions.
// Tenant callers are confined to their own roles plus platform roles.

use serde::{Deserialize, Serialize};

use crate::rbac::Status;

pub mod menus; // /api/v1/menus, /api/v1/menu/tree
pub mod roles; // /api/v1/roles
pub mod users; // /api/v1/users/:id/*

/// Body of the batch-status endpoints
#[derive(Debug, Deserialize)]
pub struct BatchStatusRequest {
    #[serde(alias = "menu_ids", alias = "role_ids")]
    pub ids: Vec<String>,
    pub status: Status,
}

#[derive(Debug, Serialize)]
pub struct BatchStatusResponse {
    pub modified: u64,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: u64,
}
