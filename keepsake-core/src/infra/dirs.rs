//! Per-owner locations on the local machine.
//!
//! Cache and settings files live under the platform cache and data
//! directories, namespaced by a digest of the owner id so ids never leak
//! into paths.

use std::path::PathBuf;

use directories::ProjectDirs;
use keepsake_model::OwnerId;
use sha2::Digest;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "keepsake", "keepsake")
}

/// Stable directory-safe namespace for an owner.
///
/// Owner ids are case-sensitive, so the id is hashed exactly as given.
pub fn owner_namespace(owner: &OwnerId) -> String {
    let digest = sha2::Sha256::digest(owner.as_str().as_bytes());
    hex_encode(&digest[..16])
}

/// `<platform cache dir>/memories/<namespace>`, if the platform has one.
pub fn default_cache_root(owner: &OwnerId) -> Option<PathBuf> {
    let dirs = project_dirs()?;
    Some(dirs.cache_dir().join("memories").join(owner_namespace(owner)))
}

/// `<platform data dir>/settings/<namespace>.json`, if the platform has one.
pub fn default_settings_path(owner: &OwnerId) -> Option<PathBuf> {
    let dirs = project_dirs()?;
    Some(
        dirs.data_dir()
            .join("settings")
            .join(format!("{}.json", owner_namespace(owner))),
    )
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}
