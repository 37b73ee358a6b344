use ard_save_load::{
    block::{ArchiveBlock, ArchiveValue},
    error::ArchiveError,
    id_map::IdMap,
    LoadContext, SaveContext, SaveLoad,
};
use ard_scene::{
    node::{Component, CreateMode, Node, NodeId},
    save_load::{load_component, save_component, COMPONENTS, ID, MODE, NAME, NODES, PARENT},
    scene::{Scene, SceneError},
};
use rustc_hash::{FxHashMap, FxHashSet};

/// A node stored inside of a prefab. Ids are local to the template.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePrefab {
    pub id: u32,
    pub parent: Option<u32>,
    pub name: String,
    pub mode: CreateMode,
    pub components: Vec<Component>,
}

/// A flattened, self contained snapshot of a scene or part of one. Nodes are stored parents
/// first, so a template can be instantiated in a single pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PrefabTemplate {
    nodes: Vec<NodePrefab>,
}

impl PrefabTemplate {
    /// Snapshots every node of the scene in hierarchy order.
    pub fn from_scene(scene: &Scene) -> Self {
        Self::from_ids(scene, scene.hierarchy_order())
    }

    /// Snapshots `root` and all of its descendants. The root becomes a root of the template.
    pub fn from_subtree(scene: &Scene, root: NodeId) -> Result<Self, SceneError> {
        if scene.node(root).is_none() {
            return Err(SceneError::MissingNode(root));
        }

        let mut ids = vec![root];
        ids.extend(scene.descendants(root));

        let mut template = Self::from_ids(scene, ids);
        if let Some(root) = template.nodes.first_mut() {
            root.parent = None;
        }
        Ok(template)
    }

    fn from_ids(scene: &Scene, ids: Vec<NodeId>) -> Self {
        let nodes = ids
            .into_iter()
            .filter_map(|id| scene.node(id))
            .map(|node: &Node| NodePrefab {
                id: node.id.0,
                parent: node.parent.map(|parent| parent.0),
                name: node.name.clone(),
                mode: node.mode,
                components: node.components.clone(),
            })
            .collect();
        Self { nodes }
    }

    #[inline(always)]
    pub fn nodes(&self) -> &[NodePrefab] {
        &self.nodes
    }

    #[inline(always)]
    pub fn nodes_mut(&mut self) -> &mut [NodePrefab] {
        &mut self.nodes
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Renumbers nodes as `1..=n` in template order and components as `1..=m`, so the template
    /// no longer depends on the ids of the scene it was taken from. Parents outside of the
    /// template are dropped.
    pub fn normalize_ids(&mut self) {
        let map = IdMap::new_from_ids(self.nodes.iter().map(|node| node.id), 1);
        let mut next_component = 1;

        for node in &mut self.nodes {
            if let Some(id) = map.to_map(node.id) {
                node.id = id.0;
            }
            node.parent = node
                .parent
                .and_then(|parent| map.to_map(parent))
                .map(|parent| parent.0);

            for component in &mut node.components {
                component.id = next_component;
                next_component += 1;
            }
        }
    }

    /// Adds a copy of every node in the template to `scene` under fresh ids. Template roots are
    /// attached to `parent`. Returns the new ids in template order.
    pub fn instantiate(
        &self,
        scene: &mut Scene,
        parent: Option<NodeId>,
    ) -> Result<Vec<NodeId>, SceneError> {
        if let Some(parent) = parent {
            if scene.node(parent).is_none() {
                return Err(SceneError::MissingNode(parent));
            }
        }

        let mut created = FxHashMap::<u32, NodeId>::default();
        let mut out = Vec::with_capacity(self.nodes.len());

        for node in &self.nodes {
            let node_parent = node
                .parent
                .and_then(|parent| created.get(&parent).copied())
                .or(parent);
            let id = scene.create_node(node.name.clone(), node_parent, node.mode)?;

            for component in &node.components {
                scene
                    .create_component(id, component.type_name.clone())?
                    .attributes = component.attributes.clone();
            }

            created.insert(node.id, id);
            out.push(id);
        }

        Ok(out)
    }
}

impl SaveLoad for PrefabTemplate {
    fn save(&self, ctx: &SaveContext, block: &mut ArchiveBlock) -> Result<(), ArchiveError> {
        ctx.write(
            block,
            NODES,
            self.nodes
                .iter()
                .map(|node| save_node(ctx, node).map(ArchiveValue::Block))
                .collect::<Result<Vec<_>, _>>()?,
        );
        Ok(())
    }

    fn load(&mut self, _: &LoadContext, block: &ArchiveBlock) -> Result<(), ArchiveError> {
        let nodes = block
            .read_blocks(NODES)?
            .into_iter()
            .map(load_node)
            .collect::<Result<Vec<_>, _>>()?;

        // Parents must come before their children.
        let mut seen = FxHashSet::default();
        for node in &nodes {
            if let Some(parent) = node.parent {
                if !seen.contains(&parent) {
                    return Err(ArchiveError::Invalid(format!(
                        "prefab node {} refers to parent {} before it is defined",
                        node.id, parent
                    )));
                }
            }

            if !seen.insert(node.id) {
                return Err(ArchiveError::Invalid(format!(
                    "duplicate prefab node id {}",
                    node.id
                )));
            }
        }

        self.nodes = nodes;
        Ok(())
    }
}

fn save_node(ctx: &SaveContext, node: &NodePrefab) -> Result<ArchiveBlock, ArchiveError> {
    let mut block = ArchiveBlock::new();
    ctx.write(&mut block, ID, node.id);
    ctx.write(&mut block, NAME, node.name.as_str());
    if let Some(parent) = node.parent {
        ctx.write(&mut block, PARENT, parent);
    }
    ctx.write_enum(&mut block, MODE, node.mode)?;
    ctx.write(
        &mut block,
        COMPONENTS,
        node.components
            .iter()
            .map(|component| ArchiveValue::Block(save_component(ctx, component)))
            .collect::<Vec<_>>(),
    );
    Ok(block)
}

fn load_node(block: &ArchiveBlock) -> Result<NodePrefab, ArchiveError> {
    Ok(NodePrefab {
        id: block.read(ID)?,
        parent: block.read_optional(PARENT)?,
        name: block.read(NAME)?,
        mode: block.read_enum(MODE)?,
        components: block
            .read_blocks(COMPONENTS)?
            .into_iter()
            .map(load_component)
            .collect::<Result<Vec<_>, _>>()?,
    })
}
