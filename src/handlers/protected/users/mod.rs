// handlers/protected/users/mod.rs - User assignment handlers
//
// Users themselves live in an external identity system; these endpoints only
// manage which roles a user id holds and what those roles grant.

pub mod roles;       // GET|PUT|DELETE /users/:id/roles
pub mod permissions; // GET /users/:id/permissions[/check]

pub use permissions::{user_permission_check, user_permissions};
pub use roles::{user_roles_delete, user_roles_get, user_roles_put};
