use std::io::{Read, Seek, Write};

use ard_assets::prelude::*;
use ard_log::{debug, error, info};
use ard_prefab::resource::PrefabResource;
use ard_save_load::{
    document::{ArchiveDocument, Document},
    error::{ArchiveError, ResourceError},
    flags::LoadFlags,
    format::{resolve_save_format, ResourceFormat, DEFAULT_SAVE_FORMAT},
};
use ard_scene::scene::Scene;

use crate::{
    graph::SceneGraph,
    observer::{ReloadDecision, ReloadObserver},
};

/// Name of the root block scenes are stored under.
pub const RESOURCE_ROOT_NAME: &str = "resource";

/// Owns a live scene and moves it to and from byte streams in any resource format.
///
/// Loading happens in two phases. [`SceneResource::begin_load`] detects and parses a stream into
/// a pending document without touching the scene, so it can run off the owning thread.
/// [`SceneResource::end_load`] then applies the pending document, giving observers a chance to
/// cancel first.
pub struct SceneResource<S: SceneGraph = Scene> {
    name: String,
    scene: S,
    /// Format default saves are forced to use.
    save_format: Option<ResourceFormat>,
    /// Format detected by the most recent `begin_load`.
    load_format: Option<ResourceFormat>,
    is_prefab: bool,
    pending: Option<Document>,
    observers: Vec<Box<dyn ReloadObserver>>,
}

impl<S: SceneGraph + Default> Default for SceneResource<S> {
    fn default() -> Self {
        Self::new("unnamed", S::default())
    }
}

impl<S: SceneGraph> SceneResource<S> {
    pub fn new(name: impl Into<String>, scene: S) -> Self {
        Self {
            name: name.into(),
            scene,
            save_format: None,
            load_format: None,
            is_prefab: false,
            pending: None,
            observers: Vec::default(),
        }
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn scene(&self) -> &S {
        &self.scene
    }

    #[inline(always)]
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    #[inline(always)]
    pub fn into_scene(self) -> S {
        self.scene
    }

    /// Forces default saves to use `format`. [`ResourceFormat::Unknown`] clears the hint.
    pub fn set_save_format_hint(&mut self, format: ResourceFormat) {
        self.save_format = Some(format).filter(|format| format.is_known());
    }

    #[inline(always)]
    pub fn save_format_hint(&self) -> Option<ResourceFormat> {
        self.save_format
    }

    #[inline(always)]
    pub fn load_format(&self) -> Option<ResourceFormat> {
        self.load_format
    }

    /// Makes default saves write a prefab of the scene instead of the scene itself.
    #[inline(always)]
    pub fn set_prefab(&mut self, is_prefab: bool) {
        self.is_prefab = is_prefab;
    }

    #[inline(always)]
    pub fn is_prefab(&self) -> bool {
        self.is_prefab
    }

    #[inline(always)]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn add_observer(&mut self, observer: Box<dyn ReloadObserver>) {
        self.observers.push(observer);
    }

    /// Format a default save would use right now.
    pub fn default_save_format(&self) -> ResourceFormat {
        resolve_save_format(self.save_format, self.load_format, DEFAULT_SAVE_FORMAT)
    }

    /// Writes the scene to `dest` in `format`, or a normalized prefab of it if `as_prefab` is
    /// set. Failures are logged.
    pub fn save(&self, dest: &mut dyn Write, format: ResourceFormat, as_prefab: bool) -> bool {
        match self.try_save(dest, format, as_prefab) {
            Ok(()) => true,
            Err(err) => {
                error!("unable to save resource `{}` as {format:?}: {err}", self.name);
                false
            }
        }
    }

    /// Saves using the format hint, else the format last loaded, else the default format.
    pub fn save_default(&self, dest: &mut dyn Write) -> bool {
        self.save(dest, self.default_save_format(), self.is_prefab)
    }

    pub fn try_save(
        &self,
        dest: &mut dyn Write,
        format: ResourceFormat,
        as_prefab: bool,
    ) -> Result<(), ResourceError> {
        if !format.is_known() {
            return Err(ResourceError::UnknownFormat);
        }

        if as_prefab {
            let mut prefab = PrefabResource::new(self.scene.generate_flattened_template());
            prefab.normalize_ids();
            return prefab.try_save(dest, format);
        }

        let doc = Document::from_object(
            format,
            RESOURCE_ROOT_NAME,
            &self.scene,
            format.save_flags(),
        )?;
        doc.write_to(dest)
    }

    /// First phase of a load. Detects the format of `source` and parses it into a pending
    /// document, replacing any document that was already pending. The live scene is not
    /// touched.
    pub fn begin_load<R: Read + Seek>(&mut self, source: &mut R) -> bool {
        self.pending = None;

        match Document::read(source) {
            Ok(doc) => {
                debug!(
                    "resource `{}` parsed a {:?} document",
                    self.name,
                    doc.format()
                );
                self.load_format = Some(doc.format());
                self.pending = Some(doc);
                true
            }
            Err(err) => {
                self.load_format = Some(ResourceFormat::Unknown);
                error!("unable to read resource `{}`: {err}", self.name);
                false
            }
        }
    }

    /// Second phase of a load. Applies the pending document to the live scene unless an
    /// observer cancels the reload. A cancelled reload still counts as a success. The pending
    /// document is released whatever the outcome.
    pub fn end_load(&mut self) -> bool {
        let doc = match (self.load_format, self.pending.take()) {
            (Some(format), Some(doc)) if format.is_known() => doc,
            _ => {
                error!(
                    "resource `{}` has no document to apply, begin_load must succeed first",
                    self.name
                );
                return false;
            }
        };

        // Every observer is asked, even after one has cancelled.
        let mut cancelled = false;
        for observer in &mut self.observers {
            if observer.reload_begin() == ReloadDecision::Cancel {
                cancelled = true;
            }
        }

        if cancelled {
            info!("reload of resource `{}` was cancelled", self.name);
            self.notify_reload_end(false);
            return true;
        }

        if let Err(err) = self.apply(&doc) {
            error!("unable to load resource `{}`: {err}", self.name);
            return false;
        }

        self.notify_reload_end(true);
        true
    }

    /// Runs both load phases back to back.
    pub fn load<R: Read + Seek>(&mut self, source: &mut R) -> bool {
        self.begin_load(source) && self.end_load()
    }

    pub fn save_file(
        &self,
        package: &Package,
        file: &AssetName,
        format: ResourceFormat,
        as_prefab: bool,
    ) -> bool {
        let res = package
            .open_write(file)
            .map_err(|err| ResourceError::Stream(err.into()))
            .and_then(|mut dest| {
                self.try_save(&mut dest, format, as_prefab)?;
                dest.flush()?;
                Ok(())
            });

        match res {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "unable to save resource `{}` to `{file}`: {err}",
                    self.name
                );
                false
            }
        }
    }

    pub fn save_file_default(&self, package: &Package, file: &AssetName) -> bool {
        self.save_file(package, file, self.default_save_format(), self.is_prefab)
    }

    pub fn load_file(&mut self, package: &Package, file: &AssetName) -> bool {
        match package.open_read(file) {
            Ok(mut source) => self.load(&mut source),
            Err(err) => {
                error!(
                    "unable to open `{file}` for resource `{}`: {err}",
                    self.name
                );
                false
            }
        }
    }

    fn apply(&mut self, doc: &Document) -> Result<(), ArchiveError> {
        if let Document::Xml(xml) = doc {
            if xml.root().name() != RESOURCE_ROOT_NAME {
                debug!(
                    "resource `{}` is stored as a legacy `{}` document",
                    self.name,
                    xml.root().name()
                );
                return self.scene.load_legacy_xml(xml.root());
            }
        }

        doc.apply_to(RESOURCE_ROOT_NAME, &mut self.scene, LoadFlags::empty())
    }

    fn notify_reload_end(&mut self, applied: bool) {
        self.observers
            .iter_mut()
            .for_each(|observer| observer.reload_end(applied));
    }
}
