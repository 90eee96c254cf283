//! Lineage traversal over the manifest's parent/child maps
//!
//! Test nodes are never part of lineage. Ids that cannot be resolved in
//! `nodes` or `sources` are skipped.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use crate::manifest::{Manifest, ManifestNode};

/// Trees larger than this are printed flattened
pub const FLATTEN_THRESHOLD: usize = 20;

/// Which adjacency map to follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Upstream (`parent_map`)
    Parents,

    /// Downstream (`child_map`)
    Children,
}

/// A node as reported in lineage output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageNode {
    pub unique_id: String,
    pub name: String,
    pub resource_type: String,

    /// Original file path (empty for sources without one)
    pub path: String,
}

impl From<&ManifestNode> for LineageNode {
    fn from(node: &ManifestNode) -> Self {
        Self {
            unique_id: node.unique_id.clone(),
            name: node.name.clone(),
            resource_type: node.resource_type.clone(),
            path: node.original_file_path.clone(),
        }
    }
}

/// Nested transitive lineage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageTree {
    #[serde(flatten)]
    pub node: LineageNode,

    /// Distance from the queried node (direct neighbors are level 1)
    pub level: usize,

    pub children: Vec<LineageTree>,
}

/// One entry of a flattened lineage tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatEntry {
    #[serde(flatten)]
    pub node: LineageNode,

    pub level: usize,
}

/// Walks lineage for a single manifest
#[derive(Debug, Clone, Copy)]
pub struct LineageWalker<'a> {
    manifest: &'a Manifest,
}

impl<'a> LineageWalker<'a> {
    pub fn new(manifest: &'a Manifest) -> Self {
        Self { manifest }
    }

    /// Immediate neighbors of `unique_id`
    pub fn direct(&self, unique_id: &str, direction: Direction) -> Vec<LineageNode> {
        self.neighbors(unique_id, direction)
            .filter_map(|id| self.resolve(id))
            .map(LineageNode::from)
            .collect()
    }

    /// Full ancestor / descendant tree of `unique_id`
    ///
    /// Depth-first. A node reachable through several paths is expanded once,
    /// under the first path that reaches it. The root itself never appears.
    pub fn transitive(&self, unique_id: &str, direction: Direction) -> Vec<LineageTree> {
        let mut visited = HashSet::from([unique_id.to_string()]);
        self.expand(unique_id, direction, 1, &mut visited)
    }

    fn expand(
        &self,
        unique_id: &str,
        direction: Direction,
        level: usize,
        visited: &mut HashSet<String>,
    ) -> Vec<LineageTree> {
        let mut trees = Vec::new();

        for id in self.neighbors(unique_id, direction) {
            let Some(node) = self.resolve(id) else {
                continue;
            };

            if !visited.insert(id.to_string()) {
                continue;
            }

            let children = self.expand(id, direction, level + 1, visited);
            trees.push(LineageTree {
                node: LineageNode::from(node),
                level,
                children,
            });
        }

        trees
    }

    fn neighbors(&self, unique_id: &str, direction: Direction) -> impl Iterator<Item = &'a str> {
        let manifest: &'a Manifest = self.manifest;
        let map = match direction {
            Direction::Parents => &manifest.parent_map,
            Direction::Children => &manifest.child_map,
        };

        map.get(unique_id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Resolve a lineage id, hiding tests and dangling references
    fn resolve(&self, unique_id: &str) -> Option<&'a ManifestNode> {
        let manifest: &'a Manifest = self.manifest;
        manifest
            .resolve(unique_id)
            .filter(|node| !node.is_test())
    }
}

/// Total number of nodes in a forest
pub fn count(trees: &[LineageTree]) -> usize {
    trees.iter().map(|tree| 1 + count(&tree.children)).sum()
}

/// Pre-order flattening: every node is followed by all of its descendants
pub fn flatten(trees: &[LineageTree]) -> Vec<FlatEntry> {
    let mut entries = Vec::with_capacity(count(trees));
    flatten_into(trees, &mut entries);
    entries
}

fn flatten_into(trees: &[LineageTree], entries: &mut Vec<FlatEntry>) {
    for tree in trees {
        entries.push(FlatEntry {
            node: tree.node.clone(),
            level: tree.level,
        });
        flatten_into(&tree.children, entries);
    }
}
