use std::collections::BTreeMap;

use ard_save_load::{block::ArchiveEnum, variant::Variant};

/// Identifies a node within a single scene.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// Whether a node is shared with network peers or only exists locally.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CreateMode {
    #[default]
    Replicated,
    Local,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub parent: Option<NodeId>,
    pub mode: CreateMode,
    pub components: Vec<Component>,
}

/// A typed bag of named attributes attached to a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub id: u32,
    pub type_name: String,
    pub attributes: BTreeMap<String, Variant>,
}

impl ArchiveEnum for CreateMode {
    const TYPE_NAME: &'static str = "CreateMode";
    const VARIANTS: &'static [(Self, &'static str)] = &[
        (CreateMode::Replicated, "Replicated"),
        (CreateMode::Local, "Local"),
    ];
}

impl Node {
    pub fn component(&self, type_name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.type_name == type_name)
    }

    pub fn component_mut(&mut self, type_name: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.type_name == type_name)
    }
}

impl Component {
    pub fn new(id: u32, type_name: impl Into<String>) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            attributes: BTreeMap::default(),
        }
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Variant>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Builder flavor of [`Component::set_attribute`].
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Variant>) -> Self {
        self.set_attribute(name, value);
        self
    }

    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&Variant> {
        self.attributes.get(name)
    }
}
