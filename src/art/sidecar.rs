//! Detect cover-art image files inside an album directory.
//!
//! Two passes, first match wins:
//! 1. Well-known cover filenames (cover.jpg, folder.jpg, front.png, ...)
//! 2. Any JPEG or PNG file in the directory, in sorted order

use std::path::Path;

/// Well-known cover filenames, tried in order.
const COVER_NAMES: &[&str] = &[
    "cover.jpg",
    "cover.jpeg",
    "folder.jpg",
    "folder.jpeg",
    "front.jpg",
    "front.jpeg",
    "albumart.jpg",
    "albumart.jpeg",
    "cover.png",
    "folder.png",
];

/// Find cover art in an album directory.
///
/// Returns the image bytes, or None if nothing usable is present.
/// Unreadable candidate files are skipped rather than failing the lookup.
pub fn find_directory_art(dir: &Path) -> Option<Vec<u8>> {
    // Pass 1: known cover filenames (case-insensitive match against the
    // actual directory listing, for case-sensitive filesystems)
    let entries: Vec<_> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();

    for name in COVER_NAMES {
        let found = entries.iter().find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        });
        if let Some(path) = found
            && let Ok(bytes) = std::fs::read(path)
        {
            return Some(bytes);
        }
    }

    // Pass 2: any JPEG or PNG, in sorted order
    let mut images: Vec<_> = entries
        .into_iter()
        .filter(|p| {
            p.extension()
                .and_then(|s| s.to_str())
                .map(|s| s.to_lowercase())
                .is_some_and(|ext| matches!(ext.as_str(), "jpg" | "jpeg" | "png"))
        })
        .collect();
    images.sort();

    for path in images {
        if let Ok(bytes) = std::fs::read(&path) {
            return Some(bytes);
        }
    }

    None
}
