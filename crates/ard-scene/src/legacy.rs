//! The XML layout scenes were stored in before archive blocks existed. Nodes nest inside their
//! parents and every attribute carries its own type name.
//!
//! ```xml
//! <scene name="Level">
//!   <node id="1" name="Root" mode="Replicated">
//!     <component id="1" type="Light">
//!       <attribute name="Range" type="Float" value="10"/>
//!     </component>
//!     <node id="2" name="Child" mode="Local"/>
//!   </node>
//! </scene>
//! ```

use ard_log::debug;
use ard_save_load::{
    block::ArchiveEnum,
    document::xml::{XmlDocument, XmlElement, MAX_ELEMENT_DEPTH},
    error::ArchiveError,
    variant::Variant,
};

use crate::{
    node::{Component, CreateMode, Node, NodeId},
    scene::Scene,
};

pub const LEGACY_ROOT_NAME: &str = "scene";

impl Scene {
    /// Encodes the scene in the legacy XML layout. Fails on hierarchies nested too deeply for
    /// the layout to be read back.
    pub fn save_legacy_xml(&self) -> Result<XmlDocument, ArchiveError> {
        fn node_element(
            scene: &Scene,
            node: &Node,
            depth: usize,
        ) -> Result<XmlElement, ArchiveError> {
            // Components and their attributes nest two more levels below the node.
            if depth + 2 > MAX_ELEMENT_DEPTH {
                return Err(ArchiveError::Invalid(format!(
                    "node {} is nested too deeply for the legacy layout",
                    node.id.0
                )));
            }

            let mode = node.mode.name().ok_or_else(|| {
                ArchiveError::Invalid(format!("node {} has an unnamed mode", node.id.0))
            })?;
            let mut element = XmlElement::new("node")
                .with_attribute("id", node.id.0.to_string())
                .with_attribute("name", node.name.as_str())
                .with_attribute("mode", mode);

            for component in &node.components {
                let mut component_element = XmlElement::new("component")
                    .with_attribute("id", component.id.to_string())
                    .with_attribute("type", component.type_name.as_str());
                for (name, value) in &component.attributes {
                    component_element.push_child(
                        XmlElement::new("attribute")
                            .with_attribute("name", name.as_str())
                            .with_attribute("type", value.type_name())
                            .with_attribute("value", value.to_text()),
                    );
                }
                element.push_child(component_element);
            }

            for child in scene.children(node.id) {
                if let Some(child) = scene.node(child) {
                    element.push_child(node_element(scene, child, depth + 1)?);
                }
            }

            Ok(element)
        }

        let mut root = XmlElement::new(LEGACY_ROOT_NAME).with_attribute("name", self.name());
        for id in self.roots() {
            if let Some(node) = self.node(id) {
                root.push_child(node_element(self, node, 2)?);
            }
        }
        Ok(XmlDocument::new(root))
    }

    /// Replaces the scene with one stored in the legacy XML layout.
    pub fn load_legacy_xml(&mut self, root: &XmlElement) -> Result<(), ArchiveError> {
        if root.name() != LEGACY_ROOT_NAME {
            return Err(ArchiveError::RootMismatch {
                expected: LEGACY_ROOT_NAME.into(),
                found: root.name().into(),
            });
        }

        let mut nodes = Vec::default();
        for element in root.children_named("node") {
            load_node(element, None, &mut nodes)?;
        }

        let name = root.attribute("name").unwrap_or_default().to_owned();
        debug!("decoded {} nodes of legacy scene `{name}`", nodes.len());
        self.replace(name, nodes)
    }
}

fn load_node(
    element: &XmlElement,
    parent: Option<NodeId>,
    out: &mut Vec<Node>,
) -> Result<(), ArchiveError> {
    let id = NodeId(parse_id(element)?);

    let mode = match element.attribute("mode") {
        Some(mode) => CreateMode::from_name(mode).ok_or_else(|| ArchiveError::UnknownEnum {
            type_name: CreateMode::TYPE_NAME,
            value: mode.into(),
        })?,
        None => CreateMode::default(),
    };

    let components = element
        .children_named("component")
        .map(load_component)
        .collect::<Result<Vec<_>, _>>()?;

    out.push(Node {
        id,
        name: element.attribute("name").unwrap_or_default().to_owned(),
        parent,
        mode,
        components,
    });

    for child in element.children_named("node") {
        load_node(child, Some(id), out)?;
    }

    Ok(())
}

fn load_component(element: &XmlElement) -> Result<Component, ArchiveError> {
    let mut component = Component::new(
        parse_id(element)?,
        element.required_attribute("type")?,
    );

    for attribute in element.children_named("attribute") {
        let value = Variant::from_text(
            attribute.required_attribute("type")?,
            attribute.required_attribute("value")?,
        )?;
        component.set_attribute(attribute.required_attribute("name")?, value);
    }

    Ok(component)
}

fn parse_id(element: &XmlElement) -> Result<u32, ArchiveError> {
    let id = element.required_attribute("id")?;
    id.parse().map_err(|_| {
        ArchiveError::Malformed(format!(
            "`{id}` is not a valid id for element `{}`",
            element.name()
        ))
    })
}
