// routes.rs - Router assembly and shared handler state
//
// Public routes (/ and /health) are mounted at the top level. Everything else
// lives under /api/v1 behind the JWT middleware.

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, StorageBackend};
use crate::database::{DatabaseError, DatabaseManager};
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::rbac::{MemoryStore, PgAssignmentIndex, PgMenuStore, PgRoleStore};
use crate::services::{AccessService, MenuService, RoleService};

/// Services and settings shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub menus: MenuService,
    pub roles: RoleService,
    pub access: AccessService,
    pub jwt_secret: Arc<str>,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Present only for the Postgres backend
    pub db: Option<DatabaseManager>,
}

impl AppState {
    /// Services over a fresh in-memory store
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self::with_memory_store(MemoryStore::new(), jwt_secret)
    }

    pub fn with_memory_store(store: MemoryStore, jwt_secret: &str) -> Self {
        let store = Arc::new(store);
        Self {
            menus: MenuService::new(store.clone(), store.clone()),
            roles: RoleService::new(store.clone(), store.clone(), store.clone()),
            access: AccessService::new(store.clone(), store.clone(), store),
            jwt_secret: Arc::from(jwt_secret),
            default_page_size: 10,
            max_page_size: 100,
            db: None,
        }
    }

    /// Services over Postgres stores sharing the manager's pool
    pub fn postgres(manager: DatabaseManager, jwt_secret: &str) -> Self {
        let pool = manager.pool().clone();
        let menus = Arc::new(PgMenuStore::new(pool.clone()));
        let roles = Arc::new(PgRoleStore::new(pool.clone()));
        let access = Arc::new(PgAssignmentIndex::new(pool));

        Self {
            menus: MenuService::new(menus.clone(), access.clone()),
            roles: RoleService::new(roles.clone(), menus.clone(), access.clone()),
            access: AccessService::new(roles, menus, access),
            jwt_secret: Arc::from(jwt_secret),
            default_page_size: 10,
            max_page_size: 100,
            db: Some(manager),
        }
    }

    /// Builds the state for the configured backend, connecting when needed
    pub async fn from_config(config: &AppConfig) -> Result<Self, DatabaseError> {
        let state = match config.api.storage {
            StorageBackend::Memory => Self::in_memory(&config.security.jwt_secret),
            StorageBackend::Postgres => {
                let manager = DatabaseManager::connect(&config.database).await?;
                Self::postgres(manager, &config.security.jwt_secret)
            }
        };

        Ok(state.with_page_sizes(config.api.default_page_size, config.api.max_page_size))
    }

    pub fn with_page_sizes(mut self, default_page_size: u32, max_page_size: u32) -> Self {
        self.default_page_size = default_page_size;
        self.max_page_size = max_page_size;
        self
    }
}

/// Full application router with permissive CORS and request tracing
pub fn app(state: AppState) -> Router {
    app_with_layers(state, CorsLayer::permissive(), true)
}

/// Application router using CORS and request-logging settings from configuration
pub fn app_from_config(state: AppState, config: &AppConfig) -> Router {
    app_with_layers(state, cors_layer(config), config.api.enable_request_logging)
}

fn app_with_layers(state: AppState, cors: CorsLayer, request_logging: bool) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected API
        .nest("/api/v1", api_routes(state.clone()))
        // Global middleware
        .layer(cors)
        .with_state(state);

    if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(menu_routes())
        .merge(role_routes())
        .merge(user_routes())
        .layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn menu_routes() -> Router<AppState> {
    use protected::menus;

    Router::new()
        .route("/menus", get(menus::menu_list).post(menus::menu_create))
        .route("/menus/tree", get(menus::menu_tree))
        .route("/menu/tree", get(menus::menu_tree))
        .route("/menus/user", get(menus::menu_user))
        .route("/menus/stats", get(menus::menu_stats))
        .route("/menus/batch-status", put(menus::menu_batch_status))
        .route(
            "/menus/:id",
            get(menus::menu_show)
                .put(menus::menu_update)
                .delete(menus::menu_delete),
        )
}

fn role_routes() -> Router<AppState> {
    use protected::roles;

    Router::new()
        .route("/roles", get(roles::role_list).post(roles::role_create))
        .route("/roles/stats", get(roles::role_stats))
        .route("/roles/batch-status", put(roles::role_batch_status))
        .route("/roles/tenant/:tenant_id", get(roles::role_by_tenant))
        .route(
            "/roles/:id",
            get(roles::role_show)
                .put(roles::role_update)
                .delete(roles::role_delete),
        )
        .route("/roles/:id/users", get(roles::role_users))
        .route("/roles/:id/menus", get(roles::role_menus))
        .route(
            "/roles/:id/permissions",
            put(roles::role_permissions_set).delete(roles::role_permissions_remove),
        )
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route(
            "/users/:id/roles",
            get(users::user_roles_get)
                .put(users::user_roles_put)
                .delete(users::user_roles_delete),
        )
        .route("/users/:id/permissions", get(users::user_permissions))
        .route("/users/:id/permissions/check", get(users::user_permission_check))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter(|origin| origin.as_str() != "*")
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
