//! Search tree over the data dictionary.
//!
//! A rebuildable index keyed frequency → type → key → units (or
//! frequency → key → units for simple variables) with variable ids at
//! the leaves. All comparisons are case-insensitive; any path segment
//! may request substring matching instead of exact matching.

use crate::models::{Frequency, Header, Variable};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Default)]
struct Node {
    children: HashMap<String, Node>,
    ids: Vec<i32>,
}

impl Node {
    fn is_empty(&self) -> bool {
        self.children.is_empty() && self.ids.is_empty()
    }
}

/// Query pattern for [`Tree::find_ids`]. `None` segments match
/// anything.
#[derive(Debug, Clone, Default)]
pub struct VariablePattern {
    pub frequency: Option<Frequency>,
    pub key: Option<String>,
    pub type_: Option<String>,
    pub units: Option<String>,
}

impl VariablePattern {
    pub fn exact(variable: &Variable) -> Self {
        Self {
            frequency: Some(variable.frequency()),
            key: Some(variable.key().to_string()),
            type_: variable.type_().map(|t| t.to_string()),
            units: Some(variable.units().to_string()),
        }
    }
}

/// Index over a [`Header`]; derived, never authoritative.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    root: Node,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a header, reporting ids whose full variable
    /// tuple collides with an already-inserted one. Duplicates are not
    /// inserted; the caller is expected to purge them.
    pub fn from_header(header: &Header) -> (Self, Vec<(Frequency, i32)>) {
        let mut tree = Tree::new();
        let mut duplicates = Vec::new();
        for (frequency, id, variable) in header.iter() {
            if !tree.insert(id, variable) {
                warn!(
                    "Duplicate variable definition {} under id {}; keeping first-seen id",
                    variable, id
                );
                duplicates.push((frequency, id));
            }
        }
        (tree, duplicates)
    }

    fn path(variable: &Variable) -> Vec<String> {
        let mut path = vec![variable.frequency().to_string()];
        match variable {
            Variable::Full {
                key, type_, units, ..
            } => {
                path.push(type_.to_lowercase());
                path.push(key.to_lowercase());
                path.push(units.to_lowercase());
            }
            Variable::Simple { key, units, .. } => {
                path.push(key.to_lowercase());
                path.push(units.to_lowercase());
            }
        }
        path
    }

    /// Insert one id under the variable's path. Returns false (without
    /// inserting) when the leaf is already occupied by another id.
    pub fn insert(&mut self, id: i32, variable: &Variable) -> bool {
        let mut node = &mut self.root;
        for segment in Self::path(variable) {
            node = node.children.entry(segment).or_default();
        }
        if node.ids.is_empty() {
            node.ids.push(id);
            true
        } else {
            false
        }
    }

    /// Find all ids matching the pattern. Exact segment comparison by
    /// default; `part_match` switches the key, type and units segments
    /// to substring matching.
    pub fn find_ids(&self, pattern: &VariablePattern, part_match: bool) -> Vec<i32> {
        let mut ids = Vec::new();
        let frequency = pattern.frequency.map(|f| f.to_string());
        for (name, node) in &self.root.children {
            if !segment_matches(name, frequency.as_deref(), false) {
                continue;
            }
            // A full-shape subtree is one level deeper than a simple one.
            self.collect(node, pattern, part_match, &mut ids);
            self.collect_simple(node, pattern, part_match, &mut ids);
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn collect(
        &self,
        frequency_node: &Node,
        pattern: &VariablePattern,
        part_match: bool,
        ids: &mut Vec<i32>,
    ) {
        for (type_name, type_node) in &frequency_node.children {
            if !segment_matches(type_name, pattern.type_.as_deref(), part_match) {
                continue;
            }
            for (key_name, key_node) in &type_node.children {
                if !segment_matches(key_name, pattern.key.as_deref(), part_match) {
                    continue;
                }
                for (units_name, units_node) in &key_node.children {
                    if !segment_matches(units_name, pattern.units.as_deref(), part_match) {
                        continue;
                    }
                    if units_node.children.is_empty() {
                        ids.extend(&units_node.ids);
                    }
                }
            }
        }
    }

    fn collect_simple(
        &self,
        frequency_node: &Node,
        pattern: &VariablePattern,
        part_match: bool,
        ids: &mut Vec<i32>,
    ) {
        // Simple variables have no type segment; only patterns without
        // a type constraint can reach them.
        if pattern.type_.is_some() {
            return;
        }
        for (key_name, key_node) in &frequency_node.children {
            if !segment_matches(key_name, pattern.key.as_deref(), part_match) {
                continue;
            }
            for (units_name, units_node) in &key_node.children {
                if !segment_matches(units_name, pattern.units.as_deref(), part_match) {
                    continue;
                }
                if units_node.children.is_empty() {
                    ids.extend(&units_node.ids);
                }
            }
        }
    }

    /// Remove the leaf for the given variable, pruning now-childless
    /// ancestors up to (not including) the root. Returns the removed
    /// id, if any.
    pub fn remove(&mut self, variable: &Variable) -> Option<i32> {
        fn remove_path(node: &mut Node, path: &[String]) -> Option<i32> {
            match path {
                [] => node.ids.pop(),
                [head, rest @ ..] => {
                    let child = node.children.get_mut(head)?;
                    let removed = remove_path(child, rest)?;
                    if child.is_empty() {
                        node.children.remove(head);
                    }
                    Some(removed)
                }
            }
        }
        remove_path(&mut self.root, &Self::path(variable))
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

fn segment_matches(name: &str, wanted: Option<&str>, part_match: bool) -> bool {
    match wanted {
        None => true,
        Some(wanted) => {
            let wanted = wanted.to_lowercase();
            if part_match {
                name.contains(&wanted)
            } else {
                name == wanted
            }
        }
    }
}
