//! Menu resolution engine: pure functions that turn flat node sets into
//! ordered hierarchies.
//!
//! Every builder indexes the input once (id → arena slot, parent id →
//! sorted child slots) and then walks the adjacency map, so assembly is
//! O(n log n) instead of re-scanning the whole slice per level. Siblings are
//! ordered by `sort_order`, then `created_at`, then input position.
//!
//! Input that violates the forest invariant never hangs a builder: each
//! slot is emitted at most once and nodes on a cycle that no root reaches
//! are dropped.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::types::MenuNode;

/// Administrative tree node carrying the full menu record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuTreeNode {
    #[serde(flatten)]
    pub menu: MenuNode,
    pub children: Vec<MenuTreeNode>,
}

impl MenuTreeNode {
    /// Number of nodes in this subtree, itself included
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(MenuTreeNode::node_count).sum::<usize>()
    }
}

/// Navigation tree node: only the fields a client needs to render menus
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserMenuNode {
    pub menu_id: String,
    pub menu_name: String,
    pub route_path: String,
    pub component: String,
    pub icon: String,
    pub sort_order: i32,
    pub children: Vec<UserMenuNode>,
}

impl UserMenuNode {
    fn project(menu: &MenuNode, children: Vec<UserMenuNode>) -> Self {
        Self {
            menu_id: menu.id.clone(),
            menu_name: menu.name.clone(),
            route_path: menu.route.clone(),
            component: menu.component.clone(),
            icon: menu.icon.clone(),
            sort_order: menu.sort_order,
            children,
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(UserMenuNode::node_count).sum::<usize>()
    }
}

/// Builds the administrative tree below `parent_id` (empty = top level).
///
/// At the top level, nodes whose parent is missing from `nodes` are promoted
/// to roots, so a filtered node set still yields every node exactly once.
pub fn build_tree(nodes: &[MenuNode], parent_id: &str) -> Vec<MenuTreeNode> {
    Arena::new(nodes.iter()).assemble(parent_id, true, &|menu: &MenuNode, children| {
        MenuTreeNode {
            menu: menu.clone(),
            children,
        }
    })
}

/// Builds the end-user navigation tree below `parent_id`.
///
/// Only enabled, visible, non-button nodes are kept. A node whose parent was
/// dropped (or never granted) is not reachable and is omitted together with
/// its whole subtree; nothing is re-parented.
pub fn build_user_menu_tree(nodes: &[MenuNode], parent_id: &str) -> Vec<UserMenuNode> {
    Arena::new(nodes.iter().filter(|menu| menu.is_navigable()))
        .assemble(parent_id, false, &UserMenuNode::project)
}

/// Whether `node_id` lies anywhere in the subtree rooted at `ancestor_id`
pub fn is_descendant(nodes: &[MenuNode], ancestor_id: &str, node_id: &str) -> bool {
    let arena = Arena::new(nodes.iter());
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack = vec![ancestor_id];

    while let Some(current) = stack.pop() {
        let Some(children) = arena.children.get(current) else {
            continue;
        };
        for &slot in children {
            let id = arena.nodes[slot].id.as_str();
            if id == node_id {
                return true;
            }
            if seen.insert(id) {
                stack.push(id);
            }
        }
    }

    false
}

struct Arena<'a> {
    nodes: Vec<&'a MenuNode>,
    index: HashMap<&'a str, usize>,
    children: HashMap<&'a str, Vec<usize>>,
}

impl<'a> Arena<'a> {
    fn new(nodes: impl IntoIterator<Item = &'a MenuNode>) -> Self {
        let nodes: Vec<&'a MenuNode> = nodes.into_iter().collect();

        let mut index: HashMap<&'a str, usize> = HashMap::with_capacity(nodes.len());
        for (slot, node) in nodes.iter().copied().enumerate() {
            // duplicate ids: first occurrence wins
            index.entry(node.id.as_str()).or_insert(slot);
        }

        let mut children: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (slot, node) in nodes.iter().copied().enumerate() {
            if index.get(node.id.as_str()) == Some(&slot) {
                children.entry(node.parent_id.as_str()).or_default().push(slot);
            }
        }

        let mut arena = Self {
            nodes,
            index,
            children: HashMap::new(),
        };
        for siblings in children.values_mut() {
            arena.sort_siblings(siblings);
        }
        arena.children = children;
        arena
    }

    fn sort_siblings(&self, slots: &mut [usize]) {
        slots.sort_by(|&a, &b| {
            let (left, right) = (self.nodes[a], self.nodes[b]);
            left.sort_order
                .cmp(&right.sort_order)
                .then(left.created_at.cmp(&right.created_at))
                .then(a.cmp(&b))
        });
    }

    fn roots(&self, parent_id: &str, promote_orphans: bool) -> Vec<usize> {
        let mut roots = self.children.get(parent_id).cloned().unwrap_or_default();

        if promote_orphans && parent_id.is_empty() {
            for (parent, siblings) in &self.children {
                if !parent.is_empty() && !self.index.contains_key(parent) {
                    roots.extend(siblings.iter().copied());
                }
            }
            self.sort_siblings(&mut roots);
        }

        roots
    }

    fn assemble<T, F>(&self, parent_id: &str, promote_orphans: bool, project: &F) -> Vec<T>
    where
        F: Fn(&MenuNode, Vec<T>) -> T,
    {
        let mut visited = vec![false; self.nodes.len()];
        if let Some(&slot) = self.index.get(parent_id) {
            visited[slot] = true;
        }

        self.roots(parent_id, promote_orphans)
            .into_iter()
            .filter_map(|slot| self.walk(slot, &mut visited, project))
            .collect()
    }

    fn walk<T, F>(&self, slot: usize, visited: &mut [bool], project: &F) -> Option<T>
    where
        F: Fn(&MenuNode, Vec<T>) -> T,
    {
        if visited[slot] {
            return None;
        }
        visited[slot] = true;

        let node = self.nodes[slot];
        let children = match self.children.get(node.id.as_str()) {
            Some(slots) => slots
                .iter()
                .filter_map(|&child| self.walk(child, visited, project))
                .collect(),
            None => Vec::new(),
        };

        Some(project(node, children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::types::{MenuKind, Status};
    use chrono::{Duration, TimeZone, Utc};

    fn menu(id: &str, parent: &str, sort: i32) -> MenuNode {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        MenuNode {
            id: id.to_string(),
            parent_id: parent.to_string(),
            name: format!("name-{}", id),
            kind: MenuKind::Page,
            route: format!("/{}", id),
            component: String::new(),
            icon: String::new(),
            permission_code: String::new(),
            sort_order: sort,
            visible: true,
            status: Status::Enabled,
            created_at: base,
            updated_at: base,
        }
    }

    fn ids(tree: &[MenuTreeNode]) -> Vec<&str> {
        tree.iter().map(|n| n.menu.id.as_str()).collect()
    }

    #[test]
    fn builds_nested_tree_sorted_by_sort_order() {
        let nodes = vec![
            menu("b", "", 2),
            menu("a", "", 1),
            menu("a2", "a", 2),
            menu("a1", "a", 1),
            menu("a1x", "a1", 0),
        ];

        let tree = build_tree(&nodes, "");
        assert_eq!(ids(&tree), vec!["a", "b"]);
        assert_eq!(ids(&tree[0].children), vec!["a1", "a2"]);
        assert_eq!(ids(&tree[0].children[0].children), vec!["a1x"]);
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn ties_fall_back_to_creation_order() {
        let mut first = menu("first", "", 1);
        let mut second = menu("second", "", 1);
        first.created_at = first.created_at + Duration::seconds(1);
        second.created_at = second.created_at + Duration::seconds(2);

        let tree = build_tree(&[second.clone(), first.clone()], "");
        assert_eq!(ids(&tree), vec!["first", "second"]);

        // identical timestamps keep input order
        let tree = build_tree(&[menu("y", "", 1), menu("x", "", 1)], "");
        assert_eq!(ids(&tree), vec!["y", "x"]);
    }

    #[test]
    fn every_node_appears_exactly_once() {
        let nodes = vec![
            menu("root", "", 0),
            menu("c1", "root", 0),
            menu("c2", "root", 1),
            menu("g1", "c1", 0),
            // parent filtered out of the set
            menu("orphan", "missing", 0),
            menu("orphan-child", "orphan", 0),
        ];

        let tree = build_tree(&nodes, "");
        let total: usize = tree.iter().map(MenuTreeNode::node_count).sum();
        assert_eq!(total, nodes.len());
        assert_eq!(ids(&tree), vec!["root", "orphan"]);
    }

    #[test]
    fn subtree_build_starts_below_parent() {
        let nodes = vec![menu("a", "", 0), menu("a1", "a", 0), menu("b", "", 1)];
        let tree = build_tree(&nodes, "a");
        assert_eq!(ids(&tree), vec!["a1"]);
    }

    #[test]
    fn cyclic_input_terminates() {
        let nodes = vec![menu("root", "", 0), menu("x", "y", 0), menu("y", "x", 0), menu("self", "self", 0)];
        let tree = build_tree(&nodes, "");
        assert_eq!(ids(&tree), vec!["root"]);
        assert!(!is_descendant(&nodes, "x", "root"));
        assert!(is_descendant(&nodes, "x", "y"));
    }

    #[test]
    fn user_tree_drops_hidden_disabled_and_buttons() {
        let mut hidden = menu("hidden", "", 1);
        hidden.visible = false;
        let mut disabled = menu("disabled", "", 2);
        disabled.status = Status::Disabled;
        let mut button = menu("button", "page", 0);
        button.kind = MenuKind::Button;

        let nodes = vec![
            menu("page", "", 0),
            button,
            hidden,
            menu("under-hidden", "hidden", 0),
            disabled,
            menu("under-disabled", "disabled", 0),
        ];

        let tree = build_user_menu_tree(&nodes, "");
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].menu_id, "page");
        assert!(tree[0].children.is_empty());
        let total: usize = tree.iter().map(UserMenuNode::node_count).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn user_tree_does_not_promote_ungranted_parents_children() {
        // child granted, parent not in the set
        let nodes = vec![menu("child", "parent", 0)];
        assert!(build_user_menu_tree(&nodes, "").is_empty());
        // the admin tree still shows it
        assert_eq!(build_tree(&nodes, "").len(), 1);
    }

    #[test]
    fn user_tree_projects_navigation_fields() {
        let mut node = menu("dash", "", 3);
        node.icon = "dashboard".into();
        node.component = "./Dashboard".into();
        let tree = build_user_menu_tree(&[node], "");
        assert_eq!(tree[0].route_path, "/dash");
        assert_eq!(tree[0].icon, "dashboard");
        assert_eq!(tree[0].component, "./Dashboard");
        assert_eq!(tree[0].sort_order, 3);
    }

    #[test]
    fn descendant_walk_explores_full_subtree() {
        let nodes = vec![
            menu("a", "", 0),
            menu("b", "a", 0),
            menu("c", "b", 0),
            menu("d", "c", 0),
            menu("e", "", 1),
        ];
        assert!(is_descendant(&nodes, "a", "d"));
        assert!(is_descendant(&nodes, "b", "c"));
        assert!(!is_descendant(&nodes, "d", "a"));
        assert!(!is_descendant(&nodes, "a", "e"));
        assert!(!is_descendant(&nodes, "a", "a"));
    }

    #[test]
    fn empty_input_yields_empty_trees() {
        assert!(build_tree(&[], "").is_empty());
        assert!(build_user_menu_tree(&[], "").is_empty());
    }
}
