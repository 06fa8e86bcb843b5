//! Mind maps: a tree of labeled nodes stored as a flat parent-pointer list.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapNode {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MindMapData {
    /// Id of the parentless node.
    pub root: String,
    pub nodes: Vec<MindMapNode>,
}

impl MindMapData {
    /// Check that the node list forms a single tree rooted at `root`.
    ///
    /// Ids are unique, exactly one node has no parent and it is `root`, every
    /// `parentId` names a node of this map, and every node is reachable from
    /// the root (which rules out cycles).
    pub fn validate_tree(&self) -> Result<(), String> {
        let mut ids = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(format!("Duplicate mind map node id '{}'", node.id));
            }
        }

        let roots: Vec<&str> = self
            .nodes
            .iter()
            .filter(|n| n.parent_id.is_none())
            .map(|n| n.id.as_str())
            .collect();
        match roots.as_slice() {
            [only] if *only == self.root => {}
            [only] => {
                return Err(format!(
                    "Mind map root '{}' does not match the parentless node '{only}'",
                    self.root
                ));
            }
            [] => return Err("Mind map has no root node".to_string()),
            _ => return Err(format!("Mind map has {} root nodes", roots.len())),
        }

        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for node in &self.nodes {
            if let Some(parent) = node.parent_id.as_deref() {
                if !ids.contains(parent) {
                    return Err(format!(
                        "Mind map node '{}' references missing parent '{parent}'",
                        node.id
                    ));
                }
                children.entry(parent).or_default().push(node.id.as_str());
            }
        }

        let mut seen = HashSet::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([self.root.as_str()]);
        while let Some(id) = queue.pop_front() {
            if seen.insert(id) {
                if let Some(kids) = children.get(id) {
                    queue.extend(kids.iter().copied());
                }
            }
        }
        if seen.len() != self.nodes.len() {
            return Err("Mind map nodes contain a cycle".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMap {
    pub id: String,
    pub topic_id: String,
    pub data: MindMapData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
