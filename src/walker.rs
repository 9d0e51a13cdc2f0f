use crate::config::AppConfig;
use crate::error::AppError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Resolve the photo argument into the list of files to process.
///
/// A file is taken as-is whatever its extension. A directory contributes its direct entries whose
/// extension is in the configured set; symlinks are followed, subdirectories are not entered. The result is sorted by
/// path so runs are repeatable across platforms.
pub fn resolve_photos(config: &AppConfig, photo_path: &Path) -> Result<Vec<PathBuf>, AppError> {
    if photo_path.is_file() {
        log::debug!("Photo path {:?} is a single file", photo_path);
        return Ok(vec![photo_path.to_path_buf()]);
    }
    if !photo_path.is_dir() {
        return Err(AppError::PhotoPathNotFound(photo_path.to_path_buf()));
    }

    log::info!("Starting file discovery in {:?}", photo_path);
    log::debug!("Configured allowed extensions: {:?}", config.allowed_extensions);

    let allowed_extensions = &config.allowed_extensions;
    let mut photos = Vec::new();

    for entry in WalkDir::new(photo_path).min_depth(1).max_depth(1).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            // A dangling link or unreadable entry costs that entry only.
            Err(e) if e.depth() > 0 => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if entry.file_type().is_file() {
            let path = entry.path();
            log::trace!("Discovered file: {:?}", path);
            if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
                log::trace!("Checking extension: {} for file: {:?}", ext, path);
                if allowed_extensions.contains(&ext.to_lowercase()) {
                    log::debug!("Queueing photo: {:?}", path);
                    photos.push(path.to_path_buf());
                } else {
                    log::trace!("Skipping file due to unsupported extension: {:?}", path);
                }
            } else {
                log::trace!("Skipping file with no extension: {:?}", path);
            }
        } else {
            log::trace!("Skipping non-file entry: {:?}", entry.path());
        }
    }

    photos.sort();
    log::info!("File discovery complete: {} photos", photos.len());
    Ok(photos)
}
