use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use ard_log::debug;

use crate::prelude::{is_valid_asset_name, AssetName, AssetNameBuf};

use super::{PackageFileError, PackageInterface, PackageOpenError, PackageReader};

/// A package of resources contained within a folder.
#[derive(Clone)]
pub struct FolderPackage(Arc<FolderPackageInner>);

struct FolderPackageInner {
    /// Path to the folder.
    path: PathBuf,
}

impl PackageInterface for FolderPackage {
    #[inline]
    fn path(&self) -> &Path {
        &self.0.path
    }

    fn exists(&self, file: &AssetName) -> bool {
        self.resolve(file)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    fn open_read(&self, file: &AssetName) -> Result<Box<dyn PackageReader>, PackageFileError> {
        let path = self.resolve(file)?;
        if !path.is_file() {
            return Err(PackageFileError::DoesNotExist(file.into()));
        }

        debug!("opening `{}` for reading", path.display());
        Ok(Box::new(BufReader::new(File::open(&path)?)))
    }

    fn open_write(&self, file: &AssetName) -> Result<Box<dyn Write + Send>, PackageFileError> {
        let path = self.resolve(file)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        debug!("opening `{}` for writing", path.display());
        Ok(Box::new(BufWriter::new(File::create(&path)?)))
    }
}

impl FolderPackage {
    pub fn open(path: &Path) -> Result<Self, PackageOpenError> {
        if !path.exists() || !path.is_dir() {
            return Err(PackageOpenError::DoesNotExist);
        }

        Ok(FolderPackage(Arc::new(FolderPackageInner { path: path.into() })))
    }

    fn resolve(&self, file: &AssetName) -> Result<PathBuf, PackageFileError> {
        if !is_valid_asset_name(file) {
            return Err(PackageFileError::InvalidName(AssetNameBuf::from(file)));
        }

        let mut path = self.0.path.clone();
        path.extend(file.components().map(|component| component.as_str()));
        Ok(path)
    }
}
