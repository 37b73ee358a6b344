use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Path of a file relative to the root of its package.
pub type AssetName = Utf8Path;

pub type AssetNameBuf = Utf8PathBuf;

/// Names must stay inside the package they are resolved against, so only plain relative
/// components are allowed.
pub fn is_valid_asset_name(name: &AssetName) -> bool {
    !name.as_str().is_empty()
        && name
            .components()
            .all(|component| matches!(component, Utf8Component::Normal(_)))
}
