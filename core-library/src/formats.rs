//! File format classification.
//!
//! Maps the `format` strings found in item file lists onto a coarse kind and
//! a playable flag. Only formats the sync layer makes decisions on are
//! listed; anything else classifies as [`FileKind::Other`] and not playable.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Video,
    Audio,
    Text,
    Image,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub format: &'static str,
    pub kind: FileKind,
    pub mimetype: &'static str,
    /// Suitable for direct display or playback in a client
    pub playable: bool,
}

const fn fmt(
    format: &'static str,
    kind: FileKind,
    mimetype: &'static str,
    playable: bool,
) -> FormatInfo {
    FormatInfo {
        format,
        kind,
        mimetype,
        playable,
    }
}

const FORMATS: &[FormatInfo] = &[
    fmt("VBR MP3", FileKind::Audio, "audio/mpeg3", true),
    fmt("Ogg Vorbis", FileKind::Audio, "audio/ogg", true),
    fmt("128Kbps MP3", FileKind::Audio, "audio/mpeg3", false),
    fmt("64Kbps MP3", FileKind::Audio, "audio/mpeg3", false),
    fmt("Flac", FileKind::Audio, "audio/flac", false),
    fmt("JSON SRT", FileKind::Other, "application/json", false),
    fmt("JPEG", FileKind::Image, "image/jpeg", true),
    fmt("PNG", FileKind::Image, "image/png", true),
    fmt("GIF", FileKind::Image, "image/gif", true),
    fmt("Animated GIF", FileKind::Image, "image/gif", true),
    fmt("JPEG Thumb", FileKind::Image, "image/jpeg", false),
    fmt("JPEG 250px Thumb", FileKind::Image, "image/jpeg", false),
    fmt("JPEG 500px Thumb", FileKind::Image, "image/jpeg", false),
    fmt("Spectrogram", FileKind::Image, "image/png", false),
    fmt("Item Image", FileKind::Image, "image/jpeg", true),
    fmt("Thumbnail", FileKind::Image, "image/jpeg", true),
    fmt("PDF", FileKind::Text, "application/pdf", true),
    fmt("Text PDF", FileKind::Text, "application/pdf", true),
    fmt("HTML", FileKind::Text, "text/html", false),
    fmt("Hypertext", FileKind::Text, "text/html", false),
    fmt("DjVuTXT", FileKind::Text, "text/plain", false),
    fmt("Epub", FileKind::Text, "application/epub+zip", false),
    fmt("Kindle", FileKind::Text, "application/x-mobipocket-ebook", false),
    fmt("h.264", FileKind::Video, "video/mp4", true),
    fmt("512Kb MPEG4", FileKind::Video, "video/mp4", true),
    fmt("256Kb MPEG4", FileKind::Video, "video/mp4", true),
    fmt("MPEG4", FileKind::Video, "video/mp4", true),
    fmt("64Kb MPEG4", FileKind::Video, "video/mp4", false),
    fmt("MPEG2", FileKind::Video, "video/mpeg", false),
    fmt("MPEG1", FileKind::Video, "video/mpeg", false),
    fmt("Ogg Video", FileKind::Video, "video/ogg", false),
    fmt("Archive BitTorrent", FileKind::Other, "application/x-bittorrent", false),
    fmt("Abbyy GZ", FileKind::Other, "application/octet-stream", false),
    fmt("Djvu XML", FileKind::Other, "text/xml", false),
    fmt("Scandata", FileKind::Other, "text/xml", false),
    fmt("Scribe Scandata ZIP", FileKind::Other, "application/zip", false),
    fmt(
        "Single Page Processed JP2 ZIP",
        FileKind::Other,
        "application/octet-stream",
        false,
    ),
];

/// Lookup table over the known formats.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatTable;

impl FormatTable {
    pub fn lookup(&self, format: &str) -> Option<&'static FormatInfo> {
        FORMATS.iter().find(|info| info.format == format)
    }

    pub fn kind_of(&self, format: &str) -> FileKind {
        self.lookup(format)
            .map(|info| info.kind)
            .unwrap_or(FileKind::Other)
    }

    /// True if `format` is a playable file of the given kind.
    pub fn is_playable_as(&self, format: &str, kind: FileKind) -> bool {
        self.lookup(format)
            .map(|info| info.kind == kind && info.playable)
            .unwrap_or(false)
    }
}
