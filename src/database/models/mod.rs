pub mod menu;
pub mod role;

pub use menu::{into_menus, MenuRow, MenuStatsRow, MENU_COLUMNS};
pub use role::{into_roles, RoleRow, RoleStatsRow, ROLE_COLUMNS};
