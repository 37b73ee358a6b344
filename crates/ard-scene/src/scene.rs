use std::collections::{BTreeMap, BTreeSet};

use ard_save_load::error::ArchiveError;
use thiserror::Error;

use crate::node::{Component, CreateMode, Node, NodeId};

pub const DEFAULT_SCENE_NAME: &str = "Scene";

/// A hierarchy of nodes, each holding components.
#[derive(Debug, Clone)]
pub struct Scene {
    name: String,
    nodes: BTreeMap<NodeId, Node>,
    next_node_id: u32,
    next_component_id: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("node {0:?} does not exist")]
    MissingNode(NodeId),
    #[error("the scene has run out of {0} ids")]
    IdsExhausted(&'static str),
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(DEFAULT_SCENE_NAME)
    }
}

/// Two scenes are equal when they hold the same nodes, regardless of which ids they would hand
/// out next.
impl PartialEq for Scene {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.nodes == other.nodes
    }
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: BTreeMap::default(),
            next_node_id: 1,
            next_component_id: 1,
        }
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline(always)]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    #[inline(always)]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn find_node(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|node| node.name == name)
    }

    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .values()
            .filter(|node| node.parent.is_none())
            .map(|node| node.id)
    }

    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .values()
            .filter(move |node| node.parent == Some(parent))
            .map(|node| node.id)
    }

    /// Every node id, parents before their children. Siblings are in id order.
    pub fn hierarchy_order(&self) -> Vec<NodeId> {
        self.walk(self.roots().collect())
    }

    /// Every node below `root`, parents before their children. Siblings are in id order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        self.walk(self.children(root).collect())
    }

    /// Pre-order walk starting from `stack`, in order. Uses an explicit stack so hierarchy depth
    /// is not bounded by the call stack.
    fn walk(&self, mut stack: Vec<NodeId>) -> Vec<NodeId> {
        let mut children = BTreeMap::<NodeId, Vec<NodeId>>::default();
        for node in self.nodes.values() {
            if let Some(parent) = node.parent {
                children.entry(parent).or_default().push(node.id);
            }
        }

        stack.reverse();
        let mut out = Vec::with_capacity(self.nodes.len());
        while let Some(id) = stack.pop() {
            // Parents edited through `node_mut` can form a cycle.
            if out.len() == self.nodes.len() {
                break;
            }
            out.push(id);

            if let Some(ids) = children.get(&id) {
                stack.extend(ids.iter().rev().copied());
            }
        }
        out
    }

    pub fn create_node(
        &mut self,
        name: impl Into<String>,
        parent: Option<NodeId>,
        mode: CreateMode,
    ) -> Result<NodeId, SceneError> {
        if let Some(parent) = parent {
            if !self.nodes.contains_key(&parent) {
                return Err(SceneError::MissingNode(parent));
            }
        }

        let id = NodeId(self.next_node_id);
        self.next_node_id = id
            .0
            .checked_add(1)
            .ok_or(SceneError::IdsExhausted("node"))?;
        self.nodes.insert(
            id,
            Node {
                id,
                name: name.into(),
                parent,
                mode,
                components: Vec::default(),
            },
        );
        Ok(id)
    }

    pub fn create_component(
        &mut self,
        node: NodeId,
        type_name: impl Into<String>,
    ) -> Result<&mut Component, SceneError> {
        let id = self.next_component_id;
        let next = id
            .checked_add(1)
            .ok_or(SceneError::IdsExhausted("component"))?;
        let node = self
            .nodes
            .get_mut(&node)
            .ok_or(SceneError::MissingNode(node))?;
        self.next_component_id = next;

        node.components.push(Component::new(id, type_name));
        let idx = node.components.len() - 1;
        Ok(&mut node.components[idx])
    }

    /// Removes a node along with all of its descendants.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), SceneError> {
        if !self.nodes.contains_key(&id) {
            return Err(SceneError::MissingNode(id));
        }

        let descendants = self.descendants(id);
        self.nodes.remove(&id);
        descendants.iter().for_each(|id| {
            self.nodes.remove(id);
        });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.next_node_id = 1;
        self.next_component_id = 1;
    }

    /// Replaces the contents of the scene with already decoded nodes. The nodes are validated
    /// first, and the scene is left untouched when they are inconsistent.
    pub fn replace(
        &mut self,
        name: String,
        nodes: impl IntoIterator<Item = Node>,
    ) -> Result<(), ArchiveError> {
        let mut map = BTreeMap::default();
        for node in nodes {
            let id = node.id;
            if map.insert(id, node).is_some() {
                return Err(ArchiveError::Invalid(format!("duplicate node id {}", id.0)));
            }
        }
        validate_hierarchy(&map)?;

        // Ids continue after the largest one loaded, which leaves no room after `u32::MAX`.
        let next_node_id = match map.keys().next_back() {
            Some(id) => id.0.checked_add(1).ok_or_else(|| {
                ArchiveError::Invalid(format!("node id {} leaves no room for new nodes", id.0))
            })?,
            None => 1,
        };
        let next_component_id = match map
            .values()
            .flat_map(|node| node.components.iter().map(|c| c.id))
            .max()
        {
            Some(id) => id.checked_add(1).ok_or_else(|| {
                ArchiveError::Invalid(format!(
                    "component id {id} leaves no room for new components"
                ))
            })?,
            None => 1,
        };

        self.next_node_id = next_node_id;
        self.next_component_id = next_component_id;
        self.name = name;
        self.nodes = map;
        Ok(())
    }
}

fn validate_hierarchy(nodes: &BTreeMap<NodeId, Node>) -> Result<(), ArchiveError> {
    // Nodes already known to lead up to a root.
    let mut rooted = BTreeSet::default();

    for node in nodes.values() {
        let mut path = BTreeSet::default();
        let mut cur = Some(node.id);
        while let Some(id) = cur {
            if rooted.contains(&id) {
                break;
            }

            if !path.insert(id) {
                return Err(ArchiveError::Invalid(format!(
                    "node {} is part of a parent cycle",
                    node.id.0
                )));
            }

            cur = match nodes.get(&id) {
                Some(node) => node.parent,
                None => {
                    return Err(ArchiveError::Invalid(format!(
                        "node {} has missing ancestor {}",
                        node.id.0, id.0
                    )))
                }
            };
        }
        rooted.append(&mut path);
    }
    Ok(())
}
