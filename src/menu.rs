// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tabled::Tabled;

/// A menu entry as delivered by `GET /menus`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Tabled)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Record {
    #[tabled(rename = "ID")]
    pub(crate) id: i64,
    #[serde(default)]
    #[tabled(skip)]
    pub(crate) parent_id: Option<i64>,
    #[serde(default, alias = "order")]
    #[tabled(skip)]
    pub(crate) menu_order: i32,
    #[tabled(rename = "Path")]
    pub(crate) path: String,
    #[tabled(rename = "Name")]
    pub(crate) name: String,
    #[serde(default)]
    #[tabled(rename = "Component", display_with = "display_optional")]
    pub(crate) component: Option<String>,
    #[serde(default)]
    #[tabled(skip)]
    pub(crate) icon: Option<String>,
    #[serde(default)]
    #[tabled(rename = "Role", display_with = "display_optional")]
    pub(crate) required_role: Option<String>,
}

fn display_optional(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Node {
    pub(crate) record: Record,
    pub(crate) children: Vec<Node>,
}

impl Node {
    /// Depth-first walk yielding each node with its depth.
    pub(crate) fn walk(&self) -> Vec<(usize, &Node)> {
        let mut out = Vec::new();
        let mut stack = vec![(0, self)];
        while let Some((depth, node)) = stack.pop() {
            out.push((depth, node));
            stack.extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        }
        out
    }
}

/// Arrange a flat menu list into an ordered forest.
///
/// Siblings are ordered by `menu_order`, then `id`. Records whose parent
/// chain never reaches a root (dangling or cyclic `parent_id`) are left
/// out. Each id is placed at most once.
pub(crate) fn build_tree(records: &[Record]) -> Vec<Node> {
    let mut by_parent: HashMap<Option<i64>, Vec<&Record>> = HashMap::new();
    for record in records {
        by_parent.entry(record.parent_id).or_default().push(record);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by_key(|record| (record.menu_order, record.id));
    }

    let mut placed = HashSet::new();
    children_of(None, &by_parent, &mut placed)
}

fn children_of(
    parent: Option<i64>,
    by_parent: &HashMap<Option<i64>, Vec<&Record>>,
    placed: &mut HashSet<i64>,
) -> Vec<Node> {
    let Some(siblings) = by_parent.get(&parent) else {
        return Vec::new();
    };

    let mut nodes = Vec::with_capacity(siblings.len());
    for record in siblings {
        if !placed.insert(record.id) {
            continue;
        }
        nodes.push(Node {
            record: (*record).clone(),
            children: children_of(Some(record.id), by_parent, placed),
        });
    }
    nodes
}
