pub mod access_service;
pub mod menu_service;
pub mod role_service;

pub use access_service::{AccessService, UserPermissions};
pub use menu_service::{MenuList, MenuService};
pub use role_service::{RoleInfo, RoleList, RoleService};
