//! Filesystem scanning for album import.
//!
//! Walks a directory tree and turns each directory that directly contains
//! audio files into an [`AlbumUnit`]: album-level tags from the first
//! audio file, one track title per file, and cover art discovered with
//! embedded-picture-then-directory-image priority.
//!
//! All functions here are synchronous and blocking (filesystem traversal
//! and tag parsing); the import job runs them via `spawn_blocking`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use lofty::file::TaggedFile;
use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use walkdir::WalkDir;

use crate::art::{embedded, sidecar};
use crate::model::AlbumUnit;

/// Recognized audio file extensions (lowercase).
pub const AUDIO_EXTENSIONS: &[&str] = &["flac", "mp3", "m4a", "aiff", "aif", "ogg", "wav"];

/// Check if a path has an audio file extension (case-insensitive).
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
}

/// Find all directories under `root` that directly contain at least one
/// audio file, in sorted path order.
///
/// Nested subdirectories are walked independently, not merged: a disc-1 /
/// disc-2 layout yields two units.
pub fn find_album_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs = BTreeSet::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file()
            && is_audio_file(entry.path())
            && let Some(parent) = entry.path().parent()
        {
            dirs.insert(parent.to_path_buf());
        }
    }
    dirs.into_iter().collect()
}

/// Extract an album unit from a directory of audio files.
///
/// Returns None if the directory contains no audio files. Individual
/// unreadable files never fail the unit: track titles fall back to the
/// filename stem and album fields to directory-derived defaults.
pub fn scan_album_dir(dir: &Path) -> Option<AlbumUnit> {
    let mut audio_files: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_audio_file(p))
        .collect();
    audio_files.sort();

    if audio_files.is_empty() {
        return None;
    }

    // Album-level metadata from the first audio file
    let first = read_tag(&audio_files[0]);
    let tag = first.as_ref();

    let title = tag
        .and_then(|t| t.album().map(|s| s.to_string()))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| dir_name(dir));

    let artist = tag
        .and_then(album_artist)
        .or_else(|| tag.and_then(|t| t.artist().map(|s| s.to_string())))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let release_year = tag.and_then(tag_year);

    let record_label = tag.and_then(|t| {
        t.get_string(&ItemKey::Label)
            .or_else(|| t.get_string(&ItemKey::Publisher))
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty())
    });

    // One track title per file, filename stem on any tag-read failure
    let tracks = audio_files
        .iter()
        .map(|path| {
            read_tag(path)
                .and_then(|t| t.title().map(|s| s.to_string()))
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| file_stem(path))
        })
        .collect();

    // Artwork: embedded FLAC picture, then directory image files
    let image_bytes = audio_files
        .iter()
        .find(|p| has_extension(p, "flac"))
        .and_then(|p| embedded::extract_embedded_art(p))
        .or_else(|| sidecar::find_directory_art(dir));

    Some(AlbumUnit {
        title,
        artist,
        release_year,
        record_label,
        tracks,
        image_bytes,
    })
}

/// Read the primary (or first) tag of an audio file, if any.
fn read_tag(path: &Path) -> Option<Tag> {
    let tagged_file: TaggedFile = Probe::open(path).ok()?.read().ok()?;
    tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
        .cloned()
}

fn album_artist(tag: &Tag) -> Option<String> {
    tag.get_string(&ItemKey::AlbumArtist)
        .map(|s| s.to_string())
        .filter(|s| !s.trim().is_empty())
}

/// A 4-digit year from the year tag, or from the leading digits of a
/// date-style tag.
fn tag_year(tag: &Tag) -> Option<i64> {
    if let Some(year) = tag.year() {
        return Some(year as i64);
    }
    let date = tag
        .get_string(&ItemKey::RecordingDate)
        .or_else(|| tag.get_string(&ItemKey::OriginalReleaseDate))?;
    if date.len() < 4 {
        return None;
    }
    date[..4].parse().ok()
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("Unknown")
        .to_string()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("Unknown")
        .to_string()
}
