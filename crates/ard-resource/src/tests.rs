use std::{
    io::Cursor,
    sync::{Arc, Mutex},
};

use ard_assets::prelude::*;
use ard_prefab::resource::PrefabResource;
use ard_save_load::{
    document::ArchiveDocument,
    format::{peek_resource_format, ResourceFormat, BINARY_MAGIC},
};
use ard_scene::prelude::*;
use rayon::prelude::*;

use crate::prelude::*;

const FORMATS: [ResourceFormat; 3] = [
    ResourceFormat::Binary,
    ResourceFormat::Json,
    ResourceFormat::Xml,
];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Event {
    Begin,
    End(bool),
}

/// Records reload notifications and answers every reload with a fixed decision.
struct Recorder {
    decision: ReloadDecision,
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    fn new(decision: ReloadDecision) -> (Box<Self>, Arc<Mutex<Vec<Event>>>) {
        let events = Arc::new(Mutex::new(Vec::default()));
        let recorder = Box::new(Self {
            decision,
            events: events.clone(),
        });
        (recorder, events)
    }
}

impl ReloadObserver for Recorder {
    fn reload_begin(&mut self) -> ReloadDecision {
        self.events.lock().unwrap().push(Event::Begin);
        self.decision
    }

    fn reload_end(&mut self, applied: bool) {
        self.events.lock().unwrap().push(Event::End(applied));
    }
}

fn garden(name: &str) -> Scene {
    let mut scene = Scene::new(name);
    let root = scene
        .create_node("Garden", None, CreateMode::Replicated)
        .unwrap();
    let tree = scene
        .create_node("Tree", Some(root), CreateMode::Replicated)
        .unwrap();
    let leaves = scene.create_component(tree, "Foliage").unwrap();
    leaves.set_attribute("Density", 0.75);
    leaves.set_attribute("Season", "autumn");
    leaves.set_attribute("Count", 3000_i64);
    scene
        .create_component(root, "Fence")
        .unwrap()
        .set_attribute("Closed", false);
    scene
        .create_node("Bird", Some(tree), CreateMode::Local)
        .unwrap();
    scene
}

fn resource(scene: Scene) -> SceneResource {
    SceneResource::new("garden", scene)
}

fn save(resource: &SceneResource, format: ResourceFormat) -> Vec<u8> {
    let mut bytes = Vec::default();
    assert!(resource.save(&mut bytes, format, false));
    bytes
}

fn detect(bytes: &[u8]) -> ResourceFormat {
    peek_resource_format(&mut Cursor::new(bytes), &BINARY_MAGIC).unwrap()
}

#[test]
fn scenes_round_trip_in_every_format() {
    let source = resource(garden("Garden"));
    for format in FORMATS {
        let bytes = save(&source, format);
        assert_eq!(detect(&bytes), format);

        let mut loaded = SceneResource::<Scene>::default();
        assert!(loaded.load(&mut Cursor::new(bytes)), "{format:?}");
        assert_eq!(loaded.scene(), source.scene(), "{format:?}");
        assert_eq!(loaded.load_format(), Some(format));
        assert!(!loaded.has_pending());
    }
}

#[test]
fn unknown_bytes_do_not_load() {
    let mut resource = resource(garden("Garden"));
    assert!(!resource.begin_load(&mut Cursor::new(b"scene: garden".to_vec())));
    assert_eq!(resource.load_format(), Some(ResourceFormat::Unknown));
    assert!(!resource.has_pending());
    assert!(!resource.end_load());
    assert_eq!(resource.scene(), &garden("Garden"));
}

#[test]
fn garbage_after_binary_magic_is_reported() {
    let mut resource = resource(garden("Garden"));
    let mut bytes = BINARY_MAGIC.to_vec();
    bytes.extend_from_slice(b"definitely not bincode");

    assert!(!resource.load(&mut Cursor::new(bytes)));
    assert_eq!(resource.load_format(), Some(ResourceFormat::Unknown));
    assert_eq!(resource.scene(), &garden("Garden"));
}

#[test]
fn node_ids_without_a_successor_are_rejected() {
    let mut resource = resource(garden("Garden"));
    let bytes = br#"{
        "resource": {
            "name": "Edge",
            "nodes": [
                { "id": 4294967295, "name": "Last", "mode": "Local", "components": [] }
            ]
        }
    }"#;

    assert!(!resource.load(&mut Cursor::new(bytes.to_vec())));
    assert!(!resource.has_pending());
    assert_eq!(resource.scene(), &garden("Garden"));
}

#[test]
fn deeply_nested_binary_is_reported() {
    const DEPTH: usize = 200_000;
    const BLOCK_TAG: u32 = 4;
    const KEY_TAG: u32 = 6;

    // Magic, then bincode `(name, tokens)` with every block holding the next under `a`.
    let mut bytes = BINARY_MAGIC.to_vec();
    bytes.extend_from_slice(&8_u64.to_le_bytes());
    bytes.extend_from_slice(b"resource");
    bytes.extend_from_slice(&((DEPTH * 2 - 1) as u64).to_le_bytes());
    for level in 0..DEPTH {
        if level > 0 {
            bytes.extend_from_slice(&KEY_TAG.to_le_bytes());
            bytes.extend_from_slice(&1_u64.to_le_bytes());
            bytes.push(b'a');
        }
        bytes.extend_from_slice(&BLOCK_TAG.to_le_bytes());
        bytes.extend_from_slice(&1_u32.to_le_bytes());
    }

    let mut resource = resource(garden("Garden"));
    assert!(!resource.begin_load(&mut Cursor::new(bytes)));
    assert_eq!(resource.load_format(), Some(ResourceFormat::Unknown));
    assert_eq!(resource.scene(), &garden("Garden"));
}

#[test]
fn bom_prefixed_json_loads() {
    let mut bytes = b"\xEF\xBB\xBF".to_vec();
    bytes.extend_from_slice(&save(&resource(garden("Garden")), ResourceFormat::Json));
    assert_eq!(detect(&bytes), ResourceFormat::Json);

    let mut resource = resource(Scene::default());
    assert!(resource.load(&mut Cursor::new(bytes)));
    assert_eq!(resource.scene(), &garden("Garden"));
    assert_eq!(resource.load_format(), Some(ResourceFormat::Json));
}

#[test]
fn legacy_xml_scenes_load() {
    let source = garden("Old Garden");
    let mut bytes = Vec::default();
    source.save_legacy_xml().unwrap().write_to(&mut bytes).unwrap();
    assert_eq!(detect(&bytes), ResourceFormat::Xml);

    let mut resource = resource(Scene::default());
    assert!(resource.load(&mut Cursor::new(bytes)));
    assert_eq!(resource.scene(), &source);
    assert_eq!(resource.load_format(), Some(ResourceFormat::Xml));
}

#[test]
fn observers_can_cancel_a_reload() {
    let mut resource = resource(Scene::default());
    let (veto, veto_events) = Recorder::new(ReloadDecision::Cancel);
    let (bystander, bystander_events) = Recorder::new(ReloadDecision::Proceed);
    resource.add_observer(veto);
    resource.add_observer(bystander);

    let bytes = save(&self::resource(garden("Garden")), ResourceFormat::Json);
    assert!(resource.begin_load(&mut Cursor::new(bytes)));
    assert!(resource.has_pending());

    assert!(resource.end_load());
    assert!(!resource.has_pending());
    assert_eq!(resource.scene(), &Scene::default());

    for events in [veto_events, bystander_events] {
        assert_eq!(*events.lock().unwrap(), [Event::Begin, Event::End(false)]);
    }
}

#[test]
fn observers_hear_about_applied_reloads() {
    let mut resource = resource(Scene::default());
    let (observer, events) = Recorder::new(ReloadDecision::Proceed);
    resource.add_observer(observer);

    let bytes = save(&self::resource(garden("Garden")), ResourceFormat::Xml);
    assert!(resource.load(&mut Cursor::new(bytes)));
    assert_eq!(resource.scene(), &garden("Garden"));
    assert_eq!(*events.lock().unwrap(), [Event::Begin, Event::End(true)]);
}

#[test]
fn failed_apply_releases_the_pending_document() {
    let mut resource = resource(garden("Garden"));
    let (observer, events) = Recorder::new(ReloadDecision::Proceed);
    resource.add_observer(observer);

    // Parses fine but holds no scene.
    let bytes = br#"{ "prefab": { "nodes": [] } }"#.to_vec();
    assert!(resource.begin_load(&mut Cursor::new(bytes)));
    assert!(!resource.end_load());
    assert!(!resource.has_pending());
    assert_eq!(resource.scene(), &garden("Garden"));
    assert_eq!(*events.lock().unwrap(), [Event::Begin]);
}

#[test]
fn end_load_needs_a_pending_document() {
    let mut resource = resource(garden("Garden"));
    assert!(!resource.end_load());

    let bytes = save(&resource, ResourceFormat::Binary);
    assert!(resource.load(&mut Cursor::new(bytes)));
    assert!(!resource.end_load());
}

#[test]
fn second_begin_load_replaces_the_first() {
    let mut resource = resource(Scene::default());
    let first = save(&self::resource(garden("First")), ResourceFormat::Json);
    let second = save(&self::resource(garden("Second")), ResourceFormat::Binary);

    assert!(resource.begin_load(&mut Cursor::new(first)));
    assert!(resource.begin_load(&mut Cursor::new(second)));
    assert_eq!(resource.load_format(), Some(ResourceFormat::Binary));

    assert!(resource.end_load());
    assert_eq!(resource.scene().name(), "Second");
    assert!(!resource.end_load());
}

#[test]
fn failed_begin_load_drops_the_previous_document() {
    let mut resource = resource(Scene::default());
    let bytes = save(&self::resource(garden("Garden")), ResourceFormat::Json);

    assert!(resource.begin_load(&mut Cursor::new(bytes)));
    assert!(!resource.begin_load(&mut Cursor::new(b"".to_vec())));
    assert!(!resource.has_pending());
    assert!(!resource.end_load());
    assert_eq!(resource.scene(), &Scene::default());
}

#[test]
fn default_saves_follow_hint_then_last_load() {
    let mut resource = resource(garden("Garden"));
    let save_default = |resource: &SceneResource| {
        let mut bytes = Vec::default();
        assert!(resource.save_default(&mut bytes));
        detect(&bytes)
    };

    assert_eq!(save_default(&resource), ResourceFormat::Json);

    let bytes = save(&resource, ResourceFormat::Binary);
    assert!(resource.load(&mut Cursor::new(bytes)));
    assert_eq!(save_default(&resource), ResourceFormat::Binary);

    resource.set_save_format_hint(ResourceFormat::Xml);
    assert_eq!(resource.save_format_hint(), Some(ResourceFormat::Xml));
    assert_eq!(save_default(&resource), ResourceFormat::Xml);

    resource.set_save_format_hint(ResourceFormat::Unknown);
    assert_eq!(resource.save_format_hint(), None);
    assert_eq!(save_default(&resource), ResourceFormat::Binary);
}

#[test]
fn saving_in_an_unknown_format_fails() {
    let resource = resource(garden("Garden"));
    let mut bytes = Vec::default();
    assert!(!resource.save(&mut bytes, ResourceFormat::Unknown, false));
    assert!(!resource.save(&mut bytes, ResourceFormat::Unknown, true));
    assert!(bytes.is_empty());
}

#[test]
fn prefab_saves_leave_loading_alone() {
    let mut resource = resource(Scene::default());
    let bytes = save(&self::resource(garden("Garden")), ResourceFormat::Xml);
    assert!(resource.begin_load(&mut Cursor::new(bytes)));

    resource.set_prefab(true);
    assert!(resource.is_prefab());

    let mut first = Vec::default();
    let mut second = Vec::default();
    assert!(resource.save_default(&mut first));
    assert!(resource.save(&mut second, ResourceFormat::Xml, true));
    assert_eq!(first, second);

    assert_eq!(resource.load_format(), Some(ResourceFormat::Xml));
    assert!(resource.has_pending());
    assert!(resource.end_load());
    assert_eq!(resource.scene(), &garden("Garden"));
}

#[test]
fn prefab_saves_do_not_depend_on_live_ids() {
    let mut churned = garden("Garden");
    let junk = churned
        .create_node("Junk", None, CreateMode::Local)
        .unwrap();
    churned.remove_node(junk).unwrap();
    churned
        .create_node("Late", None, CreateMode::Local)
        .unwrap();

    let mut fresh = garden("Garden");
    fresh.create_node("Late", None, CreateMode::Local).unwrap();

    for format in FORMATS {
        let mut a = Vec::default();
        let mut b = Vec::default();
        assert!(resource(churned.clone()).save(&mut a, format, true));
        assert!(resource(fresh.clone()).save(&mut b, format, true));
        assert_eq!(a, b, "{format:?}");

        let prefab = PrefabResource::load(&mut Cursor::new(a)).unwrap();
        assert_eq!(prefab.template().len(), 4);
    }
}

#[test]
fn first_phase_runs_in_parallel() {
    let sources = (0..8)
        .map(|i| {
            let format = FORMATS[i % FORMATS.len()];
            let bytes = save(&resource(garden(&format!("Garden {i}"))), format);
            (format, bytes)
        })
        .collect::<Vec<_>>();

    let mut resources = (0..sources.len())
        .map(|_| SceneResource::<Scene>::default())
        .collect::<Vec<_>>();

    let began = resources
        .par_iter_mut()
        .zip(sources.par_iter())
        .map(|(resource, (_, bytes))| resource.begin_load(&mut Cursor::new(bytes.as_slice())))
        .collect::<Vec<_>>();
    assert!(began.into_iter().all(|began| began));

    for (i, (resource, (format, _))) in resources.iter_mut().zip(&sources).enumerate() {
        assert_eq!(resource.load_format(), Some(*format));
        assert!(resource.end_load());
        assert_eq!(resource.scene(), &garden(&format!("Garden {i}")));
    }
}

#[test]
fn resources_round_trip_through_packages() {
    let dir = tempfile::tempdir().unwrap();
    let package = Package::from(FolderPackage::open(dir.path()).unwrap());

    let mut source = resource(garden("Garden"));
    source.set_save_format_hint(ResourceFormat::Binary);
    let file = AssetName::new("scenes/garden.res");
    assert!(source.save_file_default(&package, file));

    let mut loaded = resource(Scene::default());
    assert!(loaded.load_file(&package, file));
    assert_eq!(loaded.scene(), source.scene());
    assert_eq!(loaded.load_format(), Some(ResourceFormat::Binary));

    let prefab = AssetName::new("prefabs/garden.json");
    assert!(source.save_file(&package, prefab, ResourceFormat::Json, true));
    assert!(PrefabResource::load_file(&package, prefab).is_ok());

    assert!(!loaded.load_file(&package, AssetName::new("scenes/missing.res")));
    assert_eq!(loaded.scene(), source.scene());
}
