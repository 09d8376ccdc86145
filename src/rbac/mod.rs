//! Role-based access control core: domain types, store contracts, the two
//! store backends and the pure menu-tree engine.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod tree;
pub mod types;

pub use error::{RbacError, RbacResult};
pub use memory::MemoryStore;
pub use postgres::{PgAssignmentIndex, PgMenuStore, PgRoleStore};
pub use store::{AssignmentIndex, MenuStore, RoleStore};
pub use tree::{build_tree, build_user_menu_tree, is_descendant, MenuTreeNode, UserMenuNode};
pub use types::*;
