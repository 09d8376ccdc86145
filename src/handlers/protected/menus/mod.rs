// handlers/protected/menus/mod.rs - Menu catalogue handlers
//
// Menus are global: every authenticated caller reads the same catalogue.
// GET /menus/user is the only per-caller view.

pub mod crud;   // POST /menus, GET|PUT|DELETE /menus/:id
pub mod tree;   // GET /menus, GET /menus/tree, GET /menus/user
pub mod admin;  // GET /menus/stats, PUT /menus/batch-status

pub use admin::{menu_batch_status, menu_stats};
pub use crud::{menu_create, menu_delete, menu_show, menu_update};
pub use tree::{menu_list, menu_tree, menu_user};
