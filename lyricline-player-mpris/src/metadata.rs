//! Extraction of track info from MPRIS metadata maps.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use lyricline_core::{duration_from_micros, Track, TrackIdentity};
use zbus::zvariant::{Array, OwnedValue};

/// Build a [`Track`] from an `org.mpris.MediaPlayer2.Player` metadata map.
///
/// Returns `None` when the map identifies nothing, i.e. both title and artist
/// come out empty. A missing title falls back to the last path segment of
/// `xesam:url` with its extension stripped, which is what file-based players
/// tend to have.
pub(crate) fn track_from_metadata(metadata: &HashMap<String, OwnedValue>) -> Option<Track> {
    let title = string_value(metadata.get("xesam:title"))
        .filter(|t| !t.trim().is_empty())
        .or_else(|| url_title(metadata.get("xesam:url")))
        .unwrap_or_default();
    let artist = first_string_value(metadata.get("xesam:artist")).unwrap_or_default();
    let album = string_value(metadata.get("xesam:album")).unwrap_or_default();

    let identity = TrackIdentity::new(&title, &artist, &album);
    if identity.title.is_empty() && identity.artist.is_empty() {
        return None;
    }

    let length = metadata.get("mpris:length").and_then(length_value);
    Some(Track::new(identity, length))
}

fn string_value(value: Option<&OwnedValue>) -> Option<String> {
    value
        .and_then(|v| v.downcast_ref::<&str>().ok())
        .map(ToString::to_string)
}

/// `xesam:artist` is specified as a string list, but some players put a plain
/// string there. Accept both and take the first entry.
fn first_string_value(value: Option<&OwnedValue>) -> Option<String> {
    let value = value?;
    if let Ok(s) = value.downcast_ref::<&str>() {
        return Some(s.to_string());
    }
    let array = value.downcast_ref::<&Array>().ok()?;
    array
        .iter()
        .find_map(|item| item.downcast_ref::<&str>().ok())
        .map(ToString::to_string)
}

/// `mpris:length` is specified as int64 microseconds, but some players report
/// uint64.
fn length_value(value: &OwnedValue) -> Option<Duration> {
    if let Ok(micros) = value.downcast_ref::<i64>() {
        return Some(duration_from_micros(micros));
    }
    if let Ok(micros) = value.downcast_ref::<u64>() {
        return Some(Duration::from_micros(micros));
    }
    None
}

/// Derive a display title from a media URL: last path segment, percent-decoded,
/// extension stripped.
fn url_title(value: Option<&OwnedValue>) -> Option<String> {
    let url = string_value(value)?;
    let path = url.split(['?', '#']).next()?;
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    let base = path.trim_end_matches('/').rsplit('/').next()?;
    let decoded = urlencoding::decode(base).map_or_else(|_| base.to_string(), Cow::into_owned);
    let stem = Path::new(&decoded).file_stem()?.to_string_lossy().into_owned();
    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}
