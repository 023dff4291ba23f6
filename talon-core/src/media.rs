//! # Media Model
//!
//! Descriptive state of the currently open file, as the demux/decode layer
//! (out of scope here) publishes it: container, byte stream extents,
//! duration, chapters, editions, tracks and tag metadata. The property and
//! command layers read and mutate this through the player context; they never
//! reach into pipeline internals.

use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Tracks
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
    Sub,
}

impl TrackKind {
    pub fn label(&self) -> &'static str {
        match self {
            TrackKind::Audio => "Audio",
            TrackKind::Video => "Video",
            TrackKind::Sub => "Sub",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// User-visible track id, unique per kind.
    pub id: i64,
    pub kind: TrackKind,
    pub lang: Option<String>,
    pub title: Option<String>,
    pub default: bool,
    /// Loaded from a separate file rather than the container.
    pub external: bool,
    /// Subtitle event start times in seconds, presentation order.
    /// Empty for audio/video tracks.
    #[serde(default)]
    pub sub_events: Vec<f64>,
}

impl Track {
    pub fn new(id: i64, kind: TrackKind) -> Self {
        Self {
            id,
            kind,
            lang: None,
            title: None,
            default: false,
            external: false,
            sub_events: Vec::new(),
        }
    }
}

// ============================================================================
// Streams
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStream {
    pub codec: String,
    /// Container-level format tag.
    pub format: i64,
    /// Bytes per second as demuxed.
    pub bitrate: i64,
    pub samplerate: i64,
    pub channels: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStream {
    pub codec: String,
    /// FourCC or MPEG format tag.
    pub format: i64,
    pub bitrate: i64,
    pub width: i64,
    pub height: i64,
    pub fps: f64,
    /// Display aspect ratio; 0 when unknown.
    pub aspect: f64,
}

impl VideoStream {
    /// Friendly name for the format tag, FourCC text when printable.
    pub fn format_name(&self) -> String {
        match self.format {
            0x1000_0001 => "mpeg1".to_string(),
            0x1000_0002 => "mpeg2".to_string(),
            0x1000_0004 => "mpeg4".to_string(),
            0x1000_0005 => "h264".to_string(),
            f if f >= 0x2020_2020 => {
                let bytes = (f as u32).to_le_bytes();
                String::from_utf8_lossy(&bytes).trim().to_string()
            }
            f => format!("0x{f:08X}"),
        }
    }
}

// ============================================================================
// Chapters / Programs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    /// Start time in seconds.
    pub start: f64,
}

/// A broadcast program: a named bundle of one audio and one video stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: i64,
    pub audio_id: Option<i64>,
    pub video_id: Option<i64>,
}

// ============================================================================
// Media
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub path: String,
    /// Title as resolved by the source (container tag, stream metadata).
    pub title: Option<String>,
    pub demuxer: String,
    pub stream_start: i64,
    pub stream_end: i64,
    pub stream_pos: i64,
    /// Byte-stream timestamp, when the source reports one.
    pub stream_time_pos: Option<f64>,
    /// Total duration in seconds, 0 when unknown.
    pub duration: f64,
    /// Title count for disc-style sources, 0 elsewhere.
    pub titles: i64,
    pub chapters: Vec<Chapter>,
    pub editions: i64,
    pub edition: i64,
    /// Number of selectable angles; 1 means the feature is absent.
    pub angles: i64,
    pub angle: i64,
    pub tracks: Vec<Track>,
    /// Tag metadata in source order.
    pub metadata: Vec<(String, String)>,
    pub programs: Vec<Program>,
    pub audio: Option<AudioStream>,
    pub video: Option<VideoStream>,
}

impl Media {
    /// Describe a file before the (out of scope) demux layer fills in stream
    /// details. Container recognition is by extension.
    pub fn from_path(path: &str) -> Self {
        Self {
            path: path.to_string(),
            title: None,
            demuxer: demuxer_for_path(path).to_string(),
            stream_start: 0,
            stream_end: 0,
            stream_pos: 0,
            stream_time_pos: None,
            duration: 0.0,
            titles: 0,
            chapters: Vec::new(),
            editions: 0,
            edition: 0,
            angles: 1,
            angle: 1,
            tracks: Vec::new(),
            metadata: Vec::new(),
            programs: Vec::new(),
            audio: None,
            video: None,
        }
    }

    /// Filename without its directory, the full path when that is empty.
    pub fn filename(&self) -> &str {
        Path::new(&self.path)
            .file_name()
            .and_then(|f| f.to_str())
            .filter(|f| !f.is_empty())
            .unwrap_or(&self.path)
    }

    pub fn stream_length(&self) -> i64 {
        self.stream_end - self.stream_start
    }

    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }

    pub fn track_by_id(&self, kind: TrackKind, id: i64) -> Option<&Track> {
        self.tracks_of(kind).find(|t| t.id == id)
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Chapter index containing `position`, None before the first chapter.
    pub fn chapter_at(&self, position: f64) -> Option<usize> {
        self.chapters
            .iter()
            .rposition(|c| c.start <= position + 1e-9)
    }

    /// Add an externally loaded subtitle track, returning its id.
    pub fn add_external_sub(&mut self, path: &str) -> i64 {
        let id = self
            .tracks_of(TrackKind::Sub)
            .map(|t| t.id)
            .max()
            .unwrap_or(-1)
            + 1;
        let mut track = Track::new(id, TrackKind::Sub);
        track.title = Some(path.to_string());
        track.external = true;
        self.tracks.push(track);
        id
    }
}

/// Demuxer name by file extension.
pub fn demuxer_for_path(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "mkv" | "webm" => "mkv",
        "mp4" | "m4v" | "mov" => "mov",
        "avi" => "avi",
        "ts" | "m2ts" => "mpegts",
        "mp3" | "flac" | "ogg" | "wav" | "m4a" => "audio",
        _ => "lavf",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_strips_directory() {
        let media = Media::from_path("/movies/night/opening.mkv");
        assert_eq!(media.filename(), "opening.mkv");
        assert_eq!(media.demuxer, "mkv");
    }

    #[test]
    fn test_chapter_lookup() {
        let mut media = Media::from_path("film.mp4");
        media.chapters = vec![
            Chapter { title: "One".into(), start: 0.0 },
            Chapter { title: "Two".into(), start: 60.0 },
            Chapter { title: "Three".into(), start: 120.0 },
        ];
        assert_eq!(media.chapter_at(0.0), Some(0));
        assert_eq!(media.chapter_at(59.9), Some(0));
        assert_eq!(media.chapter_at(60.0), Some(1));
        assert_eq!(media.chapter_at(500.0), Some(2));
    }

    #[test]
    fn test_external_sub_ids() {
        let mut media = Media::from_path("film.mp4");
        media.tracks.push(Track::new(0, TrackKind::Sub));
        let id = media.add_external_sub("film.srt");
        assert_eq!(id, 1);
        assert!(media.track_by_id(TrackKind::Sub, 1).unwrap().external);
    }

    #[test]
    fn test_video_format_name() {
        let mut v = VideoStream {
            codec: "h264".into(),
            format: 0x1000_0005,
            bitrate: 0,
            width: 1920,
            height: 1080,
            fps: 24.0,
            aspect: 1.78,
        };
        assert_eq!(v.format_name(), "h264");
        v.format = u32::from_le_bytes(*b"XVID") as i64;
        assert_eq!(v.format_name(), "XVID");
    }
}
