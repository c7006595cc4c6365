//! Album cover-art storage and discovery.
//!
//! Art for an album comes from three places, in priority order:
//! 1. Embedded pictures in the album's audio files (`embedded`)
//! 2. Well-known image files next to the audio files (`sidecar`)
//! 3. The Cover Art Archive, as a rate-limited fallback (`resolver`)
//!
//! Found art is persisted in the [`ArtStore`], a flat directory keyed by
//! album ID. The album row records the filename; serving the bytes is the
//! HTTP layer's job.

pub mod embedded;
pub mod resolver;
pub mod sidecar;

use std::fs;
use std::path::PathBuf;

pub use resolver::ArtResolver;

/// Flat on-disk store for album cover images, keyed by album ID.
#[derive(Debug, Clone)]
pub struct ArtStore {
    dir: PathBuf,
}

impl ArtStore {
    /// Create a store rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        // Ensure the directory exists
        let _ = fs::create_dir_all(&dir);
        Self { dir }
    }

    /// The filename an album's art is stored under.
    pub fn filename_for(album_id: i64) -> String {
        format!("{}.jpg", album_id)
    }

    /// Full path for an album's art file.
    pub fn path_for(&self, album_id: i64) -> PathBuf {
        self.dir.join(Self::filename_for(album_id))
    }

    /// Write image bytes for an album, returning the stored filename.
    pub fn write(&self, album_id: i64, bytes: &[u8]) -> std::io::Result<String> {
        let filename = Self::filename_for(album_id);
        fs::write(self.dir.join(&filename), bytes)?;
        Ok(filename)
    }

    /// Whether art exists on disk for an album.
    pub fn contains(&self, album_id: i64) -> bool {
        self.path_for(album_id).exists()
    }

    /// Remove an album's art file, if present.
    pub fn delete(&self, album_id: i64) -> std::io::Result<()> {
        let path = self.path_for(album_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
