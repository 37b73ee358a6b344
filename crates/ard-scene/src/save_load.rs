use std::collections::BTreeMap;

use ard_save_load::{
    block::{ArchiveBlock, ArchiveValue, Field},
    error::ArchiveError,
    variant::Variant,
    LoadContext, SaveContext, SaveLoad,
};

use crate::{
    node::{Component, Node, NodeId},
    scene::Scene,
};

pub const NAME: Field = Field::new("name", "n");
pub const NODES: Field = Field::new("nodes", "N");
pub const ID: Field = Field::new("id", "i");
pub const PARENT: Field = Field::new("parent", "p");
pub const MODE: Field = Field::new("mode", "m");
pub const COMPONENTS: Field = Field::new("components", "c");
pub const TYPE: Field = Field::new("type", "t");
pub const ATTRIBUTES: Field = Field::new("attributes", "a");

impl SaveLoad for Scene {
    fn save(&self, ctx: &SaveContext, block: &mut ArchiveBlock) -> Result<(), ArchiveError> {
        ctx.write(block, NAME, self.name());
        ctx.write(
            block,
            NODES,
            self.nodes()
                .map(|node| save_node(ctx, node).map(ArchiveValue::Block))
                .collect::<Result<Vec<_>, _>>()?,
        );
        Ok(())
    }

    fn load(&mut self, _: &LoadContext, block: &ArchiveBlock) -> Result<(), ArchiveError> {
        let name = block.read(NAME)?;
        let nodes = block
            .read_blocks(NODES)?
            .into_iter()
            .map(load_node)
            .collect::<Result<Vec<_>, _>>()?;
        self.replace(name, nodes)
    }
}

/// Writes a component's fields into `block`. Shared with flattened templates, which store
/// components the same way.
pub fn save_component(ctx: &SaveContext, component: &Component) -> ArchiveBlock {
    let mut block = ArchiveBlock::new();
    ctx.write(&mut block, ID, component.id);
    ctx.write(&mut block, TYPE, component.type_name.as_str());

    let mut attributes = ArchiveBlock::new();
    component.attributes.iter().for_each(|(name, value)| {
        attributes.insert(name.as_str(), value.clone());
    });
    ctx.write(&mut block, ATTRIBUTES, attributes);

    block
}

pub fn load_component(block: &ArchiveBlock) -> Result<Component, ArchiveError> {
    let attributes = block
        .read_block(ATTRIBUTES)?
        .iter()
        .map(|(name, value)| -> Result<_, ArchiveError> {
            Ok((name.to_owned(), Variant::try_from(value)?))
        })
        .collect::<Result<BTreeMap<_, _>, ArchiveError>>()?;

    Ok(Component {
        id: block.read(ID)?,
        type_name: block.read(TYPE)?,
        attributes,
    })
}

fn save_node(ctx: &SaveContext, node: &Node) -> Result<ArchiveBlock, ArchiveError> {
    let mut block = ArchiveBlock::new();
    ctx.write(&mut block, ID, node.id.0);
    ctx.write(&mut block, NAME, node.name.as_str());
    if let Some(parent) = node.parent {
        ctx.write(&mut block, PARENT, parent.0);
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

fn load_node(block: &ArchiveBlock) -> Result<Node, ArchiveError> {
    Ok(Node {
        id: NodeId(block.read(ID)?),
        name: block.read(NAME)?,
        parent: block.read_optional::<u32>(PARENT)?.map(NodeId),
        mode: block.read_enum(MODE)?,
        components: block
            .read_blocks(COMPONENTS)?
            .into_iter()
            .map(load_component)
            .collect::<Result<Vec<_>, _>>()?,
    })
}
