use ard_prefab::template::PrefabTemplate;
use ard_save_load::{document::xml::XmlElement, error::ArchiveError, SaveLoad};
use ard_scene::scene::Scene;

/// What a resource container needs from the scene it owns.
///
/// [`SaveLoad::load`] must leave the graph untouched when it fails.
pub trait SceneGraph: SaveLoad + Send {
    /// Replaces the graph with one stored in the legacy XML layout. `root` is the root element
    /// of the document.
    fn load_legacy_xml(&mut self, root: &XmlElement) -> Result<(), ArchiveError>;

    /// Snapshots the graph as a prefab template. Ids are not normalized.
    fn generate_flattened_template(&self) -> PrefabTemplate;
}

impl SceneGraph for Scene {
    #[inline]
    fn load_legacy_xml(&mut self, root: &XmlElement) -> Result<(), ArchiveError> {
        Scene::load_legacy_xml(self, root)
    }

    #[inline]
    fn generate_flattened_template(&self) -> PrefabTemplate {
        PrefabTemplate::from_scene(self)
    }
}
