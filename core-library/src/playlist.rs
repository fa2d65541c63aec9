//! Playlist post-processing
//!
//! The embed endpoint returns root-relative URLs and raw second counts; tracks
//! are rewritten here into something a player can use directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LibraryError, Result};

/// One playable track of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoplay: Option<bool>,
    /// Seconds, as a number or a numeric string
    #[serde(default)]
    pub duration: Value,
    #[serde(default)]
    pub prettyduration: String,
    /// Root-relative image URL as returned by the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Item-relative file name of `image`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagename: Option<String>,
    /// File name of the original the derivatives were made from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig: Option<String>,
    #[serde(default)]
    pub sources: Vec<TrackSource>,
    /// Subtitles and similar side files
    #[serde(default)]
    pub tracks: Vec<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSource {
    /// Root-relative URL; not fetchable as is
    #[serde(default)]
    pub file: Option<String>,
    /// Item-relative file name of `file`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Strip the `/download/<identifier>/` prefix from a root-relative URL,
/// leaving the file name (which may include a subdirectory).
pub fn item_relative_name(root_relative: &str) -> String {
    root_relative
        .split('/')
        .skip(3)
        .collect::<Vec<_>>()
        .join("/")
}

/// `m:ss` rendering of a duration in seconds; empty when not numeric.
///
/// Fractional seconds are truncated.
pub fn pretty_duration(duration: &Value) -> String {
    let seconds = match duration {
        Value::Number(n) => n.as_f64().map(|f| f.trunc() as i64),
        Value::String(s) => leading_integer(s),
        _ => None,
    };
    match seconds {
        Some(total) => format!("{}:{:02}", total.div_euclid(60), total.rem_euclid(60)),
        None => String::new(),
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let trimmed = s.trim_start();
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

/// Turn the raw embed response into usable tracks.
///
/// Tracks are kept up to, but not including, the first one marked
/// `autoplay: false`.
pub fn process_playlist(raw: Vec<Value>) -> Result<Vec<PlaylistTrack>> {
    let mut tracks = Vec::with_capacity(raw.len());
    for value in raw {
        let mut track: PlaylistTrack =
            serde_json::from_value(value).map_err(|e| LibraryError::Malformed {
                what: "playlist track".to_string(),
                message: e.to_string(),
            })?;
        if track.autoplay == Some(false) {
            break;
        }
        track.imagename = track.image.as_deref().map(item_relative_name);
        for source in &mut track.sources {
            source.name = source.file.as_deref().map(item_relative_name);
        }
        track.prettyduration = pretty_duration(&track.duration);
        tracks.push(track);
    }
    Ok(tracks)
}
