use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const IMAGE_EXTENSIONS: [&str; 9] = [
    "jpg", "jpeg", "png", "heic", "heif", "tif", "tiff", "webp", "dng",
];
const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mov", "m4v", "3gp", "avi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classifies a file by extension, case-insensitively. `None` for unsupported files.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Image)
        } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Recursively lists all files under `dir` in traversal order, sorted by name within each
/// directory. Hidden entries are skipped unless `include_hidden` is set; a hidden directory
/// is not descended into.
pub fn list_files_walkdir_filtered(
    dir: &Path,
    include_hidden: bool,
) -> Result<Vec<PathBuf>, walkdir::Error> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| include_hidden || !is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        })
        .collect()
}

/// Supported media files under `dir`, paired with their kind.
pub fn list_media_files(
    dir: &Path,
    include_hidden: bool,
) -> Result<Vec<(PathBuf, MediaKind)>, walkdir::Error> {
    Ok(list_files_walkdir_filtered(dir, include_hidden)?
        .into_iter()
        .filter_map(|path| MediaKind::from_path(&path).map(|kind| (path, kind)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_media_kind_from_extension() {
        assert_eq!(MediaKind::from_path(Path::new("a/IMG_1.JPG")), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_path(Path::new("b.heic")), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_path(Path::new("VID.Mp4")), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(MediaKind::from_path(Path::new("jpg")), None);
    }

    #[test]
    fn test_listing_skips_hidden_entries() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("trip/.thumbnails")).unwrap();
        fs::write(dir.path().join("b.jpg"), b"").unwrap();
        fs::write(dir.path().join("a.mp4"), b"").unwrap();
        fs::write(dir.path().join(".hidden.jpg"), b"").unwrap();
        fs::write(dir.path().join("trip/c.jpeg"), b"").unwrap();
        fs::write(dir.path().join("trip/readme.txt"), b"").unwrap();
        fs::write(dir.path().join("trip/.thumbnails/t.jpg"), b"").unwrap();

        let files = list_media_files(dir.path(), false).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|(path, _)| path.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.mp4"),
                PathBuf::from("b.jpg"),
                PathBuf::from("trip/c.jpeg"),
            ]
        );

        let all = list_media_files(dir.path(), true).unwrap();
        assert_eq!(all.len(), 5);
    }
}
