//! # Player Context
//!
//! The one mutable aggregate every property accessor and command closes
//! over. There is no global instance: the context is created by the front
//! end and passed `&mut` through every call, on a single control thread.

use crate::afilter::AfChain;
use crate::media::{Media, Track, TrackKind};
use crate::mixer::Mixer;
use crate::options::Options;
use crate::osd::OsdState;
use crate::playlist::Playlist;

// ============================================================================
// Control-Flow Signals
// ============================================================================

/// Why the play loop should stop consuming the current entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Exit the player with this status code.
    Quit(i32),
    /// Advance to the next playlist entry.
    NextEntry,
    /// (Re)start whatever the playlist's current entry is.
    CurrentEntry,
    /// Reopen the same source (edition change).
    Restart,
    /// Stop playback, keep the player running.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    /// Absolute time in seconds.
    Absolute(f64),
    /// Offset from the current position in seconds.
    Relative(f64),
    /// Fraction of the total duration, 0..=1.
    Factor(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekRequest {
    pub target: SeekTarget,
    /// Demand sample-precise seeking regardless of the hr-seek option.
    pub exact: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenshotRequest {
    pub mode: i64,
    pub each_frame: bool,
}

// ============================================================================
// Player Context
// ============================================================================

#[derive(Debug)]
pub struct PlayerContext {
    pub opts: Options,
    pub mixer: Mixer,
    pub playlist: Playlist,
    pub media: Option<Media>,
    pub af_chain: AfChain,
    pub osd: OsdState,

    paused: bool,
    position: f64,
    /// Frames to advance while paused; drained by the video loop.
    pub step_frames: u32,
    pub stop_play: Option<StopReason>,
    pub pending_screenshot: Option<ScreenshotRequest>,

    selected_audio: Option<i64>,
    selected_video: Option<i64>,
    selected_sub: Option<i64>,

    /// Terminal output channel (`ANS_*` answers, printed text), drained by
    /// the front end.
    term: Vec<String>,
}

impl Default for PlayerContext {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl PlayerContext {
    pub fn new(opts: Options) -> Self {
        Self {
            opts,
            mixer: Mixer::default(),
            playlist: Playlist::default(),
            media: None,
            af_chain: AfChain::default(),
            osd: OsdState::default(),
            paused: false,
            position: 0.0,
            step_frames: 0,
            stop_play: None,
            pending_screenshot: None,
            selected_audio: None,
            selected_video: None,
            selected_sub: None,
            term: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Media lifecycle
    // ------------------------------------------------------------------

    /// Install a newly opened source and select its default tracks.
    pub fn load_media(&mut self, media: Media) {
        self.selected_audio = default_track(&media, TrackKind::Audio);
        self.selected_video = default_track(&media, TrackKind::Video);
        self.selected_sub = media
            .tracks_of(TrackKind::Sub)
            .find(|t| t.default)
            .map(|t| t.id);
        self.position = 0.0;
        self.step_frames = 0;
        self.media = Some(media);
    }

    pub fn close_media(&mut self) {
        self.media = None;
        self.selected_audio = None;
        self.selected_video = None;
        self.selected_sub = None;
        self.position = 0.0;
    }

    pub fn media(&self) -> Option<&Media> {
        self.media.as_ref()
    }

    /// Active audio stream parameters, None when no audio plays.
    pub fn audio_stream(&self) -> Option<&crate::media::AudioStream> {
        self.selected_audio?;
        self.media.as_ref()?.audio.as_ref()
    }

    /// Active video stream parameters, None when no video plays.
    pub fn video_stream(&self) -> Option<&crate::media::VideoStream> {
        self.selected_video?;
        self.media.as_ref()?.video.as_ref()
    }

    // ------------------------------------------------------------------
    // Playback state
    // ------------------------------------------------------------------

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn unpause(&mut self) {
        self.paused = false;
        self.step_frames = 0;
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Duration of the current source, None when unknown.
    pub fn duration(&self) -> Option<f64> {
        let len = self.media.as_ref()?.duration;
        if len as i64 == 0 {
            None
        } else {
            Some(len)
        }
    }

    pub fn percent_pos(&self) -> Option<i64> {
        let len = self.duration()?;
        Some((self.position / len * 100.0).round().clamp(0.0, 100.0) as i64)
    }

    /// Resolve and apply a seek. The position moves immediately; the
    /// playback pipelines resynchronize from it on their next cycle.
    /// Returns the new position.
    pub fn request_seek(&mut self, req: SeekRequest) -> f64 {
        let len = self.duration().unwrap_or(0.0);
        let target = match req.target {
            SeekTarget::Absolute(t) => t,
            SeekTarget::Relative(d) => self.position + d,
            SeekTarget::Factor(f) => len * f,
        };
        let max = if len > 0.0 { len } else { f64::MAX };
        self.position = target.clamp(0.0, max);
        self.position
    }

    /// Advance one frame: unpause for a single frame, then pause again.
    pub fn step_frame(&mut self) {
        self.step_frames += 1;
        self.paused = false;
    }

    pub fn request_screenshot(&mut self, mode: i64, each_frame: bool) {
        self.pending_screenshot = Some(ScreenshotRequest { mode, each_frame });
    }

    /// Flag the audio pipeline for a rebuild (speed or filter change).
    pub fn reinit_audio(&mut self) {
        self.af_chain.needs_reinit = true;
    }

    // ------------------------------------------------------------------
    // Track selection
    // ------------------------------------------------------------------

    pub fn selected_track(&self, kind: TrackKind) -> Option<i64> {
        match kind {
            TrackKind::Audio => self.selected_audio,
            TrackKind::Video => self.selected_video,
            TrackKind::Sub => self.selected_sub,
        }
    }

    pub fn current_track(&self, kind: TrackKind) -> Option<&Track> {
        let id = self.selected_track(kind)?;
        self.media.as_ref()?.track_by_id(kind, id)
    }

    pub fn select_track(&mut self, kind: TrackKind, id: Option<i64>) {
        let id = id.filter(|&id| {
            self.media
                .as_ref()
                .map(|m| m.track_by_id(kind, id).is_some())
                .unwrap_or(false)
        });
        match kind {
            TrackKind::Audio => self.selected_audio = id,
            TrackKind::Video => self.selected_video = id,
            TrackKind::Sub => self.selected_sub = id,
        }
    }

    /// Id of the neighbouring track in `direction`, None when stepping past
    /// the last (or first) track, which deselects.
    pub fn track_next(&self, kind: TrackKind, direction: i64) -> Option<i64> {
        let media = self.media.as_ref()?;
        let ids: Vec<i64> = media.tracks_of(kind).map(|t| t.id).collect();
        if ids.is_empty() {
            return None;
        }
        let current = self.selected_track(kind);
        match current {
            None => {
                if direction > 0 {
                    ids.first().copied()
                } else {
                    ids.last().copied()
                }
            }
            Some(cur) => {
                let pos = ids.iter().position(|&id| id == cur)?;
                if direction > 0 {
                    ids.get(pos + 1).copied()
                } else if pos > 0 {
                    ids.get(pos - 1).copied()
                } else {
                    None
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Terminal output channel
    // ------------------------------------------------------------------

    pub fn term_write(&mut self, line: String) {
        self.term.push(line);
    }

    pub fn take_term_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.term)
    }
}

fn default_track(media: &Media, kind: TrackKind) -> Option<i64> {
    media
        .tracks_of(kind)
        .find(|t| t.default)
        .or_else(|| media.tracks_of(kind).next())
        .map(|t| t.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{Chapter, Track};

    fn media_with_tracks() -> Media {
        let mut media = Media::from_path("film.mkv");
        media.duration = 200.0;
        media.tracks = vec![
            Track::new(0, TrackKind::Video),
            Track::new(0, TrackKind::Audio),
            Track::new(1, TrackKind::Audio),
            Track::new(0, TrackKind::Sub),
        ];
        media.chapters = vec![
            Chapter { title: "Intro".into(), start: 0.0 },
            Chapter { title: "Middle".into(), start: 100.0 },
        ];
        media
    }

    #[test]
    fn test_load_selects_defaults() {
        let mut ctx = PlayerContext::default();
        ctx.load_media(media_with_tracks());
        assert_eq!(ctx.selected_track(TrackKind::Audio), Some(0));
        assert_eq!(ctx.selected_track(TrackKind::Video), Some(0));
        // Subs stay off unless a track is flagged default.
        assert_eq!(ctx.selected_track(TrackKind::Sub), None);
    }

    #[test]
    fn test_seek_clamps_to_duration() {
        let mut ctx = PlayerContext::default();
        ctx.load_media(media_with_tracks());
        ctx.request_seek(SeekRequest {
            target: SeekTarget::Absolute(500.0),
            exact: false,
        });
        assert_eq!(ctx.position(), 200.0);
        ctx.request_seek(SeekRequest {
            target: SeekTarget::Relative(-1000.0),
            exact: false,
        });
        assert_eq!(ctx.position(), 0.0);
    }

    #[test]
    fn test_percent_pos() {
        let mut ctx = PlayerContext::default();
        ctx.load_media(media_with_tracks());
        ctx.request_seek(SeekRequest {
            target: SeekTarget::Factor(0.5),
            exact: false,
        });
        assert_eq!(ctx.percent_pos(), Some(50));
    }

    #[test]
    fn test_track_cycling_deselects_past_end() {
        let mut ctx = PlayerContext::default();
        ctx.load_media(media_with_tracks());
        // audio 0 -> 1 -> none -> 0
        assert_eq!(ctx.track_next(TrackKind::Audio, 1), Some(1));
        ctx.select_track(TrackKind::Audio, Some(1));
        assert_eq!(ctx.track_next(TrackKind::Audio, 1), None);
        ctx.select_track(TrackKind::Audio, None);
        assert_eq!(ctx.track_next(TrackKind::Audio, 1), Some(0));
    }

    #[test]
    fn test_select_unknown_track_deselects() {
        let mut ctx = PlayerContext::default();
        ctx.load_media(media_with_tracks());
        ctx.select_track(TrackKind::Audio, Some(99));
        assert_eq!(ctx.selected_track(TrackKind::Audio), None);
    }

    #[test]
    fn test_frame_step_unpauses() {
        let mut ctx = PlayerContext::default();
        ctx.pause();
        ctx.step_frame();
        assert!(!ctx.paused());
        assert_eq!(ctx.step_frames, 1);
    }
}
