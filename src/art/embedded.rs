//! Extract cover art embedded in audio file tags.
//!
//! Uses lofty to read picture data from:
//! - Vorbis comments (FLAC, OGG)
//! - ID3v2 tags (MP3)
//! - MP4 atoms (M4A/AAC)

use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use std::path::Path;

/// Extract the front cover from embedded tags.
///
/// Prefers a picture tagged as front cover, falling back to the first
/// embedded picture. This is a fast, synchronous operation that only
/// reads the tag data. Returns None if no cover art is embedded or the
/// file can't be read.
pub fn extract_embedded_art(path: &Path) -> Option<Vec<u8>> {
    let tagged_file = Probe::open(path).ok()?.read().ok()?;

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())?;

    let pictures = tag.pictures();
    let picture = pictures
        .iter()
        .find(|p| p.pic_type() == lofty::picture::PictureType::CoverFront)
        .or_else(|| pictures.first())?;

    if picture.data().is_empty() {
        return None;
    }
    Some(picture.data().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_extract_from_nonexistent_file() {
        let result = extract_embedded_art(Path::new("nonexistent.flac"));
        assert!(result.is_none());
    }

    #[test]
    fn test_extract_from_non_audio_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "Not an audio file").expect("Failed to write");

        let result = extract_embedded_art(file.path());
        assert!(result.is_none());
    }
}
