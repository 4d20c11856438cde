//! Recursive discovery of reference image files.

use crate::util::FollowCamResult;
use std::fs;
use std::path::{Path, PathBuf};

const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Returns true if `path` has a supported raster extension (any case).
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Lists supported image files under `root`, recursively, sorted by path.
pub fn discover_images(root: &Path) -> FollowCamResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_supported_image(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}
