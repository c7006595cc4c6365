//! Convert MusicBrainz DTOs to domain models.

use super::dto;
use super::{ReleaseCandidate, ReleaseDetails};

/// Flatten a MusicBrainz artist-credit list into a display name.
pub fn join_artist_credits(credits: &[dto::ArtistCredit]) -> String {
    let mut display = String::new();
    for credit in credits {
        if let Some(name) = credit
            .name
            .as_deref()
            .or_else(|| credit.artist.as_ref().map(|a| a.name.as_str()))
        {
            display.push_str(name);
        }
        if let Some(join) = credit.joinphrase.as_deref() {
            display.push_str(join);
        }
    }
    display.trim().to_string()
}

/// Extract a 4-digit year from a release date string (YYYY[-MM[-DD]]).
pub fn parse_year(date: Option<&str>) -> Option<i64> {
    let date = date?;
    if date.len() < 4 {
        return None;
    }
    date[..4].parse().ok()
}

/// First label name in the release's label-info, if any.
fn first_label(release: &dto::Release) -> Option<String> {
    release
        .label_info
        .first()
        .and_then(|info| info.label.as_ref())
        .and_then(|label| label.name.clone())
}

/// Convert a search-result release into a candidate.
pub fn to_candidate(release: &dto::Release) -> ReleaseCandidate {
    ReleaseCandidate {
        mbid: release.id.clone(),
        title: release.title.clone().unwrap_or_default(),
        artist: join_artist_credits(&release.artist_credit),
        year: parse_year(release.date.as_deref()),
        label: first_label(release),
        country: release.country.clone(),
        track_count: release.track_count.unwrap_or(0),
    }
}

/// Convert a full release lookup into details with track titles.
///
/// Track titles fall back to the underlying recording title; entries with
/// neither are dropped.
pub fn to_details(release: &dto::Release) -> ReleaseDetails {
    let tracks = release
        .media
        .iter()
        .flat_map(|medium| medium.tracks.iter())
        .filter_map(|track| {
            track
                .title
                .clone()
                .or_else(|| track.recording.as_ref().and_then(|r| r.title.clone()))
        })
        .collect();

    ReleaseDetails {
        mbid: release.id.clone(),
        title: release.title.clone().unwrap_or_default(),
        artist: join_artist_credits(&release.artist_credit),
        year: parse_year(release.date.as_deref()),
        label: first_label(release),
        tracks,
    }
}
