pub mod folder;

use std::{
    io::{self, Read, Seek, Write},
    path::Path,
};

use enum_dispatch::enum_dispatch;
use thiserror::Error;

use crate::prelude::{AssetName, AssetNameBuf};

use self::folder::FolderPackage;

/// A readable file handed out by a package.
pub trait PackageReader: Read + Seek + Send {}

impl<T: Read + Seek + Send> PackageReader for T {}

/// A package holds resource files at paths relative to its root.
#[enum_dispatch]
#[derive(Clone)]
pub enum Package {
    Folder(FolderPackage),
}

#[derive(Debug, Error)]
pub enum PackageOpenError {
    #[error("the package at the given path does not exist")]
    DoesNotExist,
}

#[derive(Debug, Error)]
pub enum PackageFileError {
    #[error("`{0}` is not a valid name for a file within a package")]
    InvalidName(AssetNameBuf),
    #[error("the file ({0}) at the given path within the package does not exist")]
    DoesNotExist(AssetNameBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Used to read and write resource files on disk.
#[enum_dispatch(Package)]
pub trait PackageInterface: Clone + Send {
    /// Path to the package.
    fn path(&self) -> &Path;

    /// Checks if a file exists within the package.
    fn exists(&self, file: &AssetName) -> bool;

    /// Opens a file within the package for reading. The returned reader is seekable so the
    /// format of the file can be detected before it is consumed.
    fn open_read(&self, file: &AssetName) -> Result<Box<dyn PackageReader>, PackageFileError>;

    /// Creates or truncates a file within the package, along with any missing parent folders.
    fn open_write(&self, file: &AssetName) -> Result<Box<dyn Write + Send>, PackageFileError>;
}

impl From<PackageFileError> for io::Error {
    fn from(err: PackageFileError) -> Self {
        match err {
            PackageFileError::Io(err) => err,
            PackageFileError::InvalidName(_) => io::Error::new(io::ErrorKind::InvalidInput, err),
            PackageFileError::DoesNotExist(_) => io::Error::new(io::ErrorKind::NotFound, err),
        }
    }
}
