//! BSP tree navigation utilities for interactive visualization.

use bsp_portal::{BspNode, BspTree, CellId, NodeId, NodeKind};
use macroquad::prelude::*;

use crate::draw_cell_box;

/// Direction taken at each node in the navigation path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Front,
    Back,
}

/// Interactive BSP tree navigator for exploring tree structure.
#[derive(Debug, Default)]
pub struct TreeNavigator {
    path: Vec<Direction>,
}

impl TreeNavigator {
    /// Creates a new navigator starting at the root.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(&self) -> &[Direction] {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Attempts to navigate to the front child. Returns true if successful.
    pub fn go_front(&mut self, tree: &BspTree) -> bool {
        self.descend(tree, Direction::Front)
    }

    /// Attempts to navigate to the back child. Returns true if successful.
    pub fn go_back(&mut self, tree: &BspTree) -> bool {
        self.descend(tree, Direction::Back)
    }

    fn descend(&mut self, tree: &BspTree, direction: Direction) -> bool {
        let child = self
            .current_node(tree)
            .and_then(|node| child_of(node, direction));
        if child.is_some() {
            self.path.push(direction);
        }
        child.is_some()
    }

    /// Navigates to the parent node. Returns true if not already at root.
    pub fn go_parent(&mut self) -> bool {
        self.path.pop().is_some()
    }

    pub fn go_root(&mut self) {
        self.path.clear();
    }

    /// Handles keyboard input for navigation.
    /// Returns true if navigation state changed.
    pub fn update(&mut self, tree: &BspTree) -> bool {
        let mut changed = false;

        if is_key_pressed(KeyCode::F) {
            changed = self.go_front(tree);
        }
        if is_key_pressed(KeyCode::B) {
            changed = self.go_back(tree);
        }
        if is_key_pressed(KeyCode::P) {
            changed = self.go_parent();
        }
        if is_key_pressed(KeyCode::R) && !self.path.is_empty() {
            self.go_root();
            changed = true;
        }

        changed
    }

    /// Returns the current node, if the tree is non-empty and the path valid.
    pub fn current_node<'a>(&self, tree: &'a BspTree) -> Option<&'a BspNode> {
        let mut current = tree.node(tree.root()?).ok()?;
        for direction in &self.path {
            current = tree.node(child_of(current, *direction)?).ok()?;
        }
        Some(current)
    }

    /// Cells in the subtree below the current node.
    pub fn subtree_cells(&self, tree: &BspTree) -> Vec<CellId> {
        let mut cells = Vec::new();
        let mut pending: Vec<&BspNode> = self.current_node(tree).into_iter().collect();

        while let Some(node) = pending.pop() {
            match node.kind() {
                NodeKind::Leaf(cell) => cells.push(cell.id()),
                NodeKind::Split(_) => {
                    for direction in [Direction::Front, Direction::Back] {
                        let child = child_of(node, direction).and_then(|id| tree.node(id).ok());
                        pending.extend(child);
                    }
                }
            }
        }

        cells.sort();
        cells
    }

    /// Outlines the cells of the current subtree.
    pub fn render(&self, tree: &BspTree, color: Color) {
        for cell in self.subtree_cells(tree) {
            if let Some(bounds) = tree.cell(cell).ok().and_then(|c| c.bounds()) {
                draw_cell_box(bounds, color);
            }
        }
    }

    /// Draws the navigation UI overlay.
    pub fn draw_ui(&self, tree: &BspTree, y_offset: f32) {
        let node = self.current_node(tree);
        let has_front = node.and_then(|n| child_of(n, Direction::Front)).is_some();
        let has_back = node.and_then(|n| child_of(n, Direction::Back)).is_some();
        let is_leaf = node.is_none_or(BspNode::is_leaf);
        let plane = node
            .and_then(|n| n.split_plane().ok())
            .map(|p| {
                let n = p.normal();
                format!("({:.2}, {:.2}, {:.2}) @ {:.1}", n.x, n.y, n.z, p.offset())
            })
            .unwrap_or_else(|| "-".to_string());

        let path_str = if self.path.is_empty() {
            "root".to_string()
        } else {
            self.path
                .iter()
                .map(|d| match d {
                    Direction::Front => "F",
                    Direction::Back => "B",
                })
                .collect::<Vec<_>>()
                .join(" -> ")
        };

        draw_text(
            &format!("Subtree: {} cells | plane {}", self.subtree_cells(tree).len(), plane),
            10.0,
            y_offset,
            18.0,
            WHITE,
        );
        draw_text(
            &format!("Path: {} (depth {})", path_str, self.path.len()),
            10.0,
            y_offset + 20.0,
            18.0,
            YELLOW,
        );
        draw_text(
            &format!(
                "Children: {}{}{}",
                if has_front { "[F]ront " } else { "" },
                if has_back { "[B]ack " } else { "" },
                if is_leaf { "(leaf)" } else { "" }
            ),
            10.0,
            y_offset + 40.0,
            18.0,
            if is_leaf { ORANGE } else { GREEN },
        );
        draw_text("[P]arent | [R]oot", 10.0, y_offset + 60.0, 16.0, DARKGRAY);
    }
}

fn child_of(node: &BspNode, direction: Direction) -> Option<NodeId> {
    let child = match direction {
        Direction::Front => node.front(),
        Direction::Back => node.back(),
    };
    child.ok().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_room_grid;

    #[test]
    fn walks_down_to_a_leaf() {
        let tree = generate_room_grid(2, 1, 10.0).unwrap();
        let mut navigator = TreeNavigator::new();
        assert_eq!(navigator.subtree_cells(&tree).len(), 2);

        assert!(navigator.go_front(&tree));
        assert!(navigator.current_node(&tree).unwrap().is_leaf());
        assert_eq!(navigator.subtree_cells(&tree), vec![CellId::new(1)]);
        assert!(!navigator.go_front(&tree));
        assert_eq!(navigator.depth(), 1);

        assert!(navigator.go_parent());
        assert!(navigator.go_back(&tree));
        assert_eq!(navigator.subtree_cells(&tree), vec![CellId::new(0)]);

        navigator.go_root();
        assert!(navigator.path().is_empty());
        assert!(!navigator.go_parent());
    }
}
