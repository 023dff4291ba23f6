//! # On-Screen Display State
//!
//! Transient user feedback produced by the command and property layers:
//! text messages, numeric progress bars and the deferred seek-info flags.
//! The presentation layer (terminal shell, video overlay) drains this state;
//! nothing here draws.

use crate::context::PlayerContext;
use crate::media::TrackKind;
use crate::properties::{get_property, print_property, property_type};
use crate::property::{format_time, ValueType};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Highest meaningful osd-level.
pub const MAX_OSD_LEVEL: i64 = 3;

// ============================================================================
// OSD Directives
// ============================================================================

/// Per-command OSD request, parsed from command prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnOsd {
    /// Property/command decides (the default table-driven behavior).
    #[default]
    Auto,
    /// Suppress all feedback.
    No,
    /// Message only.
    Msg,
    /// Bar only.
    Bar,
    /// Both.
    MsgBar,
}

impl OnOsd {
    pub fn msg(self) -> bool {
        matches!(self, OnOsd::Auto | OnOsd::Msg | OnOsd::MsgBar)
    }

    pub fn bar(self) -> bool {
        matches!(self, OnOsd::Auto | OnOsd::Bar | OnOsd::MsgBar)
    }
}

bitflags! {
    /// Pending seek feedback, coalesced so rapid seeks redraw once.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SeekInfoFlags: u32 {
        const BAR          = 1 << 0;
        const TEXT         = 1 << 1;
        const CHAPTER_TEXT = 1 << 2;
        const EDITION      = 1 << 3;
    }
}

/// Direction glyph attached to the next seek redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    Forward,
    Rewind,
}

// ============================================================================
// Messages and Bars
// ============================================================================

/// Message identity: a new message replaces the live one with the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageId {
    Text,
    /// Keyed by display-table row so repeated changes of one property
    /// replace rather than stack.
    Property(usize),
    SubDelay,
    OsdStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OsdMessage {
    pub id: MessageId,
    /// Minimum osd-level at which the message shows.
    pub level: i64,
    pub duration_ms: u64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarKind {
    Position,
    Volume,
    Balance,
    Panscan,
    Gamma,
    Brightness,
    Contrast,
    Saturation,
    Hue,
    /// Forced bar for a property without a display entry.
    Generic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OsdBar {
    pub kind: BarKind,
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Default)]
pub struct OsdState {
    messages: Vec<OsdMessage>,
    bar: Option<OsdBar>,
    pub seek_info: SeekInfoFlags,
    pub seek_direction: Option<SeekDirection>,
}

impl OsdState {
    /// Install a message, replacing any live message with the same id.
    pub fn set_msg(&mut self, msg: OsdMessage) {
        self.messages.retain(|m| m.id != msg.id);
        self.messages.push(msg);
    }

    pub fn remove_msg(&mut self, id: MessageId) {
        self.messages.retain(|m| m.id != id);
    }

    pub fn set_bar(&mut self, bar: OsdBar) {
        self.bar = Some(bar);
    }

    pub fn messages(&self) -> &[OsdMessage] {
        &self.messages
    }

    pub fn drain_messages(&mut self) -> Vec<OsdMessage> {
        std::mem::take(&mut self.messages)
    }

    pub fn take_bar(&mut self) -> Option<OsdBar> {
        self.bar.take()
    }

    /// Consume the coalesced seek flags for one redraw.
    pub fn take_seek_info(&mut self) -> (SeekInfoFlags, Option<SeekDirection>) {
        (
            std::mem::take(&mut self.seek_info),
            self.seek_direction.take(),
        )
    }
}

/// Queue a message if the current osd-level admits it.
pub fn set_osd_msg(ctx: &mut PlayerContext, id: MessageId, level: i64, text: String) {
    let duration_ms = ctx.opts.osd_duration_ms;
    set_osd_msg_dur(ctx, id, level, duration_ms, text);
}

/// `set_osd_msg` with an explicit lifetime override.
pub fn set_osd_msg_dur(
    ctx: &mut PlayerContext,
    id: MessageId,
    level: i64,
    duration_ms: u64,
    text: String,
) {
    if ctx.opts.osd_level < level {
        return;
    }
    ctx.osd.set_msg(OsdMessage {
        id,
        level,
        duration_ms,
        text,
    });
}

// ============================================================================
// Property Display Table
// ============================================================================

/// How one property presents on the OSD after a successful set/switch.
pub struct OsdDisplay {
    pub name: &'static str,
    /// Friendly label; the raw property name is the fallback.
    pub label: Option<&'static str>,
    pub bar: Option<BarKind>,
    /// Shared message identity; defaults to a per-row id.
    pub msg_id: Option<MessageId>,
    /// Deferred feedback: accumulate these instead of firing immediately.
    pub seek_msg: SeekInfoFlags,
    pub seek_bar: SeekInfoFlags,
}

impl OsdDisplay {
    const fn msg(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label: Some(label),
            bar: None,
            msg_id: None,
            seek_msg: SeekInfoFlags::empty(),
            seek_bar: SeekInfoFlags::empty(),
        }
    }

    const fn bar(name: &'static str, label: &'static str, kind: BarKind) -> Self {
        Self {
            name,
            label: Some(label),
            bar: Some(kind),
            msg_id: None,
            seek_msg: SeekInfoFlags::empty(),
            seek_bar: SeekInfoFlags::empty(),
        }
    }
}

pub static DISPLAY_TABLE: &[OsdDisplay] = &[
    // general
    OsdDisplay::msg("loop", "Loop"),
    OsdDisplay {
        name: "chapter",
        label: None,
        bar: None,
        msg_id: None,
        seek_msg: SeekInfoFlags::CHAPTER_TEXT,
        seek_bar: SeekInfoFlags::BAR,
    },
    OsdDisplay {
        name: "edition",
        label: None,
        bar: None,
        msg_id: None,
        seek_msg: SeekInfoFlags::EDITION,
        seek_bar: SeekInfoFlags::empty(),
    },
    OsdDisplay::msg("hr-seek", "hr-seek"),
    OsdDisplay::msg("speed", "Speed"),
    OsdDisplay::msg("pause", "Pause"),
    // audio
    OsdDisplay::bar("volume", "Volume", BarKind::Volume),
    OsdDisplay::msg("mute", "Mute"),
    OsdDisplay::msg("audio-delay", "A-V delay"),
    OsdDisplay::msg("audio", "Audio"),
    OsdDisplay::bar("balance", "Balance", BarKind::Balance),
    // video
    OsdDisplay::bar("panscan", "Panscan", BarKind::Panscan),
    OsdDisplay::msg("ontop", "Stay on top"),
    OsdDisplay::msg("border", "Border"),
    OsdDisplay::msg("framedrop", "Framedrop"),
    OsdDisplay::msg("deinterlace", "Deinterlace"),
    OsdDisplay::bar("gamma", "Gamma", BarKind::Gamma),
    OsdDisplay::bar("brightness", "Brightness", BarKind::Brightness),
    OsdDisplay::bar("contrast", "Contrast", BarKind::Contrast),
    OsdDisplay::bar("saturation", "Saturation", BarKind::Saturation),
    OsdDisplay::bar("hue", "Hue", BarKind::Hue),
    OsdDisplay::msg("vsync", "VSync"),
    OsdDisplay::msg("angle", "Angle"),
    // subs
    OsdDisplay::msg("sub", "Subtitles"),
    OsdDisplay::msg("sub-pos", "Sub position"),
    OsdDisplay {
        name: "sub-delay",
        label: Some("Sub delay"),
        bar: None,
        msg_id: Some(MessageId::SubDelay),
        seek_msg: SeekInfoFlags::empty(),
        seek_bar: SeekInfoFlags::empty(),
    },
    OsdDisplay::msg("sub-visibility", "Subtitles"),
    OsdDisplay::msg("sub-forced-only", "Forced sub only"),
    OsdDisplay::msg("sub-scale", "Sub Scale"),
];

fn display_entry(name: &str) -> Option<(usize, &'static OsdDisplay)> {
    DISPLAY_TABLE
        .iter()
        .enumerate()
        .find(|(_, d)| d.name == name)
}

// ============================================================================
// Property Feedback
// ============================================================================

/// Present a just-mutated property per the display table and OSD directive.
pub fn show_property_osd(ctx: &mut PlayerContext, name: &str, mode: OnOsd) {
    let Ok(info) = property_type(ctx, name) else {
        return;
    };

    let entry = display_entry(name);

    let mut bar_kind = entry.and_then(|(_, d)| {
        if !d.seek_bar.is_empty() {
            Some(BarKind::Position)
        } else {
            d.bar
        }
    });
    let mut label: Option<String> = entry.and_then(|(_, d)| {
        if !d.seek_msg.is_empty() {
            Some(String::new())
        } else {
            d.label.map(str::to_string)
        }
    });

    if mode != OnOsd::Auto {
        // Forced feedback falls back to the raw name and a generic bar.
        label = label.or_else(|| Some(name.to_string())).filter(|_| mode.msg());
        bar_kind = bar_kind.or(Some(BarKind::Generic)).filter(|_| mode.bar());
    }

    if let Some((_, d)) = entry {
        if !d.seek_msg.is_empty() || !d.seek_bar.is_empty() {
            let mut add = SeekInfoFlags::empty();
            if label.is_some() {
                add |= d.seek_msg;
            }
            if bar_kind.is_some() {
                add |= d.seek_bar;
            }
            ctx.osd.seek_info |= add;
            return;
        }
    }

    if let (Some(kind), Some((min, max))) = (bar_kind, info.range) {
        if matches!(info.value_type, ValueType::Int | ValueType::Float) {
            if let Ok(value) = get_property(ctx, name) {
                if let Some(v) = value.as_f64() {
                    ctx.osd.set_bar(OsdBar {
                        kind,
                        label: label.clone().unwrap_or_else(|| name.to_string()),
                        min,
                        max,
                        value: v,
                    });
                }
            }
            if mode == OnOsd::Auto {
                return;
            }
        }
    }

    if let Some(label) = label.filter(|l| !l.is_empty()) {
        if let Ok(text) = print_property(ctx, name) {
            let id = match entry {
                Some((index, d)) => d.msg_id.unwrap_or(MessageId::Property(index)),
                None => MessageId::Text,
            };
            set_osd_msg(ctx, id, 1, format!("{label}: {text}"));
        }
    }
}

// ============================================================================
// Listings
// ============================================================================

/// Chapter listing with the current one marked.
pub fn show_chapters_on_osd(ctx: &mut PlayerContext) {
    let mut res = String::new();
    match ctx.media() {
        Some(media) if !media.chapters.is_empty() => {
            let current = media.chapter_at(ctx.position());
            for (n, chapter) in media.chapters.iter().enumerate() {
                let marker = if current == Some(n) { ("> ", " <") } else { ("", "") };
                res.push_str(&format!(
                    "{}   {}{}{}\n",
                    format_time(chapter.start),
                    marker.0,
                    chapter.title,
                    marker.1
                ));
            }
        }
        _ => res.push_str("No chapters."),
    }
    set_osd_msg(ctx, MessageId::Text, 1, res);
}

/// Track listing grouped by kind, selections marked.
pub fn show_tracks_on_osd(ctx: &mut PlayerContext) {
    let Some(media) = ctx.media() else {
        set_osd_msg(ctx, MessageId::Text, 1, "No tracks.".to_string());
        return;
    };

    let mut res = String::new();
    for kind in [TrackKind::Video, TrackKind::Audio, TrackKind::Sub] {
        let selected_id = ctx.selected_track(kind);
        for track in media.tracks_of(kind) {
            let selected = selected_id == Some(track.id);
            res.push_str(&format!("{}: ", kind.label()));
            if selected {
                res.push_str("> ");
            }
            res.push_str(&format!("({}) ", track.id));
            if let Some(title) = &track.title {
                res.push_str(&format!("'{}' ", title));
            }
            if let Some(lang) = &track.lang {
                res.push_str(&format!("({}) ", lang));
            }
            if track.external {
                res.push_str("(external) ");
            }
            if selected {
                res.push('<');
            }
            res.push('\n');
        }
        res.push('\n');
    }

    if media.editions > 1 {
        res.push_str(&format!(
            "\nEdition: {} of {}\n",
            media.edition + 1,
            media.editions
        ));
    }

    set_osd_msg(ctx, MessageId::Text, 1, res);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_replace_by_id() {
        let mut osd = OsdState::default();
        osd.set_msg(OsdMessage {
            id: MessageId::SubDelay,
            level: 1,
            duration_ms: 1000,
            text: "Sub delay: 100 ms".into(),
        });
        osd.set_msg(OsdMessage {
            id: MessageId::SubDelay,
            level: 1,
            duration_ms: 1000,
            text: "Sub delay: 200 ms".into(),
        });
        assert_eq!(osd.messages().len(), 1);
        assert_eq!(osd.messages()[0].text, "Sub delay: 200 ms");
    }

    #[test]
    fn test_seek_info_coalesces() {
        let mut osd = OsdState::default();
        osd.seek_info |= SeekInfoFlags::BAR;
        osd.seek_info |= SeekInfoFlags::BAR | SeekInfoFlags::TEXT;
        let (flags, _) = osd.take_seek_info();
        assert_eq!(flags, SeekInfoFlags::BAR | SeekInfoFlags::TEXT);
        assert!(osd.seek_info.is_empty());
    }

    #[test]
    fn test_osd_level_filters_messages() {
        let mut ctx = PlayerContext::default();
        ctx.opts.osd_level = 0;
        set_osd_msg(&mut ctx, MessageId::Text, 1, "hidden".into());
        assert!(ctx.osd.messages().is_empty());
        ctx.opts.osd_level = 1;
        set_osd_msg(&mut ctx, MessageId::Text, 1, "shown".into());
        assert_eq!(ctx.osd.messages().len(), 1);
    }
}
