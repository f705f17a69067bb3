use std::collections::HashMap;

use crate::chart_box::BoxId;
use crate::container::BoxContainer;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub box_id: BoxId,
    /// Distance from the system root, which sits at level 0.
    pub level: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// The visible part of a [`BoxContainer`] as an arena-backed tree.
///
/// Children of collapsed boxes are left out. Siblings keep id order.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualTree {
    nodes: Vec<TreeNode>,
    index: HashMap<BoxId, usize>,
}

impl VisualTree {
    pub fn build(boxes: &BoxContainer) -> Result<Self> {
        let root = boxes.system_root().ok_or(Error::MissingRoot)?;

        let mut children: HashMap<BoxId, Vec<BoxId>> = HashMap::new();
        for chart_box in boxes.iter() {
            if let Some(parent) = chart_box.visual_parent_id {
                children.entry(parent).or_default().push(chart_box.id);
            }
        }

        let mut tree = Self {
            nodes: vec![TreeNode {
                box_id: root,
                level: 0,
                parent: None,
                children: Vec::new(),
            }],
            index: HashMap::from([(root, 0)]),
        };

        let mut cursor = 0;
        while cursor < tree.nodes.len() {
            let box_id = tree.nodes[cursor].box_id;
            let collapsed = boxes.get(box_id).is_some_and(|b| b.is_collapsed);
            if !collapsed && let Some(kids) = children.get(&box_id) {
                let level = tree.nodes[cursor].level + 1;
                for &kid in kids {
                    let idx = tree.nodes.len();
                    tree.nodes.push(TreeNode {
                        box_id: kid,
                        level,
                        parent: Some(cursor),
                        children: Vec::new(),
                    });
                    tree.index.insert(kid, idx);
                    tree.nodes[cursor].children.push(idx);
                }
            }
            cursor += 1;
        }
        Ok(tree)
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn node(&self, idx: usize) -> &TreeNode {
        &self.nodes[idx]
    }

    pub fn find(&self, box_id: BoxId) -> Option<&TreeNode> {
        self.index.get(&box_id).map(|&idx| &self.nodes[idx])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.level).max().unwrap_or(0) + 1
    }

    /// Node indices with every child ahead of its parent.
    pub fn post_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(0usize, false)];
        while let Some((idx, expanded)) = stack.pop() {
            if expanded {
                order.push(idx);
                continue;
            }
            stack.push((idx, true));
            for &child in self.nodes[idx].children.iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Node indices with every parent ahead of its children.
    pub fn pre_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            for &child in self.nodes[idx].children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// Visits children before parents; stops once `visit` returns `false`.
    pub fn iterate_child_first(&self, mut visit: impl FnMut(&TreeNode) -> bool) {
        for idx in self.post_order() {
            if !visit(&self.nodes[idx]) {
                return;
            }
        }
    }

    /// Every node in the branch rooted at `idx`, including `idx` itself.
    pub fn branch(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.nodes[current].children.iter().copied());
        }
        out
    }
}
