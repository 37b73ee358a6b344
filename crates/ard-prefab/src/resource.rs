use std::io::{Read, Seek, Write};

use ard_assets::prelude::*;
use ard_log::{debug, error};
use ard_save_load::{
    document::{ArchiveDocument, Document},
    error::ResourceError,
    flags::LoadFlags,
    format::ResourceFormat,
};
use ard_scene::scene::Scene;

use crate::template::PrefabTemplate;

/// Name of the root block prefabs are stored under.
pub const PREFAB_ROOT_NAME: &str = "prefab";

/// A prefab template that can be written to and read from any resource format.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PrefabResource {
    template: PrefabTemplate,
}

impl PrefabResource {
    pub fn new(template: PrefabTemplate) -> Self {
        Self { template }
    }

    /// Flattens the whole scene into a prefab with normalized ids.
    pub fn from_scene(scene: &Scene) -> Self {
        let mut template = PrefabTemplate::from_scene(scene);
        template.normalize_ids();
        Self { template }
    }

    #[inline(always)]
    pub fn template(&self) -> &PrefabTemplate {
        &self.template
    }

    #[inline(always)]
    pub fn template_mut(&mut self) -> &mut PrefabTemplate {
        &mut self.template
    }

    #[inline(always)]
    pub fn into_template(self) -> PrefabTemplate {
        self.template
    }

    #[inline(always)]
    pub fn normalize_ids(&mut self) {
        self.template.normalize_ids();
    }

    /// Writes the prefab in `format`. Failures are logged.
    pub fn save(&self, dest: &mut dyn Write, format: ResourceFormat) -> bool {
        match self.try_save(dest, format) {
            Ok(()) => true,
            Err(err) => {
                error!("unable to save prefab as {format:?}: {err}");
                false
            }
        }
    }

    pub fn try_save(
        &self,
        dest: &mut dyn Write,
        format: ResourceFormat,
    ) -> Result<(), ResourceError> {
        let doc = Document::from_object(
            format,
            PREFAB_ROOT_NAME,
            &self.template,
            format.save_flags(),
        )?;
        doc.write_to(dest)
    }

    /// Detects the format of `source` and reads a prefab out of it.
    pub fn load<R: Read + Seek>(source: &mut R) -> Result<Self, ResourceError> {
        let doc = Document::read(source)?;
        let mut template = PrefabTemplate::default();
        doc.apply_to(PREFAB_ROOT_NAME, &mut template, LoadFlags::empty())?;
        debug!(
            "loaded prefab with {} nodes from {:?} document",
            template.len(),
            doc.format()
        );
        Ok(Self { template })
    }

    /// Writes the prefab to a file within `package`. Failures are logged.
    pub fn save_file(&self, package: &Package, file: &AssetName, format: ResourceFormat) -> bool {
        let res = package
            .open_write(file)
            .map_err(|err| ResourceError::Stream(err.into()))
            .and_then(|mut dest| {
                self.try_save(&mut dest, format)?;
                dest.flush()?;
                Ok(())
            });

        match res {
            Ok(()) => true,
            Err(err) => {
                error!("unable to save prefab to `{file}`: {err}");
                false
            }
        }
    }

    pub fn load_file(package: &Package, file: &AssetName) -> Result<Self, ResourceError> {
        let mut source = package
            .open_read(file)
            .map_err(|err| ResourceError::Stream(err.into()))?;
        Self::load(&mut source)
    }
}
