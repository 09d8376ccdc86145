use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::auth::{decode_jwt, Claims};
use crate::error::ApiError;
use crate::routes::AppState;

/// Authenticated caller context extracted from the JWT
#[derive(Clone, Debug, PartialEq)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    /// Empty for platform-scope callers
    pub tenant_id: String,
    pub role_ids: Vec<String>,
}

impl AuthUser {
    pub fn is_platform(&self) -> bool {
        self.tenant_id.is_empty()
    }

    /// The tenant a scoped caller is confined to, `None` for platform callers
    pub fn tenant_scope(&self) -> Option<&str> {
        if self.is_platform() {
            None
        } else {
            Some(&self.tenant_id)
        }
    }

    /// Whether this caller may see or manage roles owned by `tenant_id`
    pub fn can_access_tenant(&self, tenant_id: &str) -> bool {
        self.is_platform() || tenant_id.is_empty() || self.tenant_id == tenant_id
    }

    /// Platform roles are read-only for tenant callers
    pub fn can_manage_tenant(&self, tenant_id: &str) -> bool {
        self.is_platform() || self.tenant_id == tenant_id
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            tenant_id: claims.tenant_id,
            role_ids: claims.role_ids,
        }
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match extract_jwt_from_headers(&headers) {
        Ok(token) => token,
        Err(msg) => return ApiError::unauthorized(msg).into_response(),
    };

    let claims = match decode_jwt(&token, &state.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Rejected bearer token: {}", e);
            return ApiError::unauthorized(e.to_string()).into_response();
        }
    };

    // Convert claims to AuthUser and inject into request
    request.extensions_mut().insert(AuthUser::from(claims));

    next.run(request).await
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
