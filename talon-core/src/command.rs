//! # Command Dispatcher
//!
//! Executes one parsed command against the player context. Dispatch is
//! total over the command set; failures log a warning and the player keeps
//! running. The only command that terminates anything is `quit`, and even
//! that just records a stop reason for the play loop.
//!
//! Side effects are synchronous: when `run_command` returns, the mutation
//! happened (or was logged). Nothing is queued or retried.

use crate::context::{PlayerContext, SeekRequest, SeekTarget, StopReason};
use crate::media::TrackKind;
use crate::osd::{
    set_osd_msg, set_osd_msg_dur, show_chapters_on_osd, show_property_osd, show_tracks_on_osd,
    MessageId, OnOsd, SeekDirection, SeekInfoFlags, MAX_OSD_LEVEL,
};
use crate::playlist::{self, PlaylistEntry};
use crate::properties::{
    expand_string, get_property, set_property, set_property_from_str, switch_property,
};
use crate::property::{format_value, SwitchStep, Value};
use serde::{Deserialize, Serialize};

/// Message level that no osd-level admits.
const OSD_LEVEL_INVISIBLE: i64 = MAX_OSD_LEVEL + 1;

// ============================================================================
// Command Model
// ============================================================================

/// Interpretation of a seek command's target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeekKind {
    /// Offset in seconds from the current position.
    #[default]
    Relative,
    /// Percentage of the total duration.
    Percent,
    /// Absolute timestamp in seconds.
    Absolute,
}

/// Pause behavior applied after the command itself ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pausing {
    #[default]
    None,
    Pause,
    Toggle,
}

/// A parsed player command with named, typed arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Seek {
        target: f64,
        #[serde(default)]
        kind: SeekKind,
        #[serde(default)]
        exact: bool,
    },
    Set {
        property: String,
        value: String,
    },
    Add {
        property: String,
        #[serde(default)]
        step: Option<f64>,
    },
    Cycle {
        property: String,
        #[serde(default)]
        step: Option<f64>,
    },
    GetProperty {
        property: String,
    },
    SpeedMult {
        factor: f64,
    },
    FrameStep,
    Quit {
        #[serde(default)]
        code: i32,
    },
    PlaylistNext {
        #[serde(default)]
        force: bool,
    },
    PlaylistPrev {
        #[serde(default)]
        force: bool,
    },
    PlaylistClear,
    LoadFile {
        path: String,
        #[serde(default)]
        append: bool,
    },
    LoadList {
        path: String,
        #[serde(default)]
        append: bool,
    },
    Stop,
    OsdLevel {
        /// Absent cycles to the next level.
        #[serde(default)]
        level: Option<i64>,
    },
    PrintText {
        text: String,
    },
    ShowText {
        text: String,
        #[serde(default)]
        duration_ms: Option<u64>,
        #[serde(default)]
        level: Option<i64>,
    },
    ShowProgress,
    ShowChapters,
    ShowTracks,
    SubStep {
        movement: i64,
    },
    SubLoad {
        path: String,
    },
    Screenshot {
        #[serde(default)]
        mode: i64,
        #[serde(default)]
        each_frame: bool,
    },
    Run {
        command: String,
    },
    AfSwitch {
        filters: String,
    },
    AfAdd {
        filters: String,
    },
    AfDel {
        filters: String,
    },
    AfClr,
    AfCmdline {
        filter: String,
        args: String,
    },
}

/// A command plus its execution modifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    #[serde(flatten)]
    pub command: Command,
    #[serde(default)]
    pub on_osd: OnOsd,
    #[serde(default)]
    pub pausing: Pausing,
}

impl From<Command> for Invocation {
    fn from(command: Command) -> Self {
        Self {
            command,
            on_osd: OnOsd::Auto,
            pausing: Pausing::None,
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

pub fn run_command(ctx: &mut PlayerContext, inv: &Invocation) {
    let auto_osd = inv.on_osd == OnOsd::Auto;
    let msg_osd = inv.on_osd.msg();
    let bar_osd = inv.on_osd.bar();
    let osdl = if msg_osd { 1 } else { OSD_LEVEL_INVISIBLE };

    match &inv.command {
        Command::Seek { target, kind, exact } => {
            let direction = match kind {
                SeekKind::Absolute => {
                    let fwd = *target > ctx.position();
                    ctx.request_seek(SeekRequest {
                        target: SeekTarget::Absolute(*target),
                        exact: *exact,
                    });
                    if fwd { SeekDirection::Forward } else { SeekDirection::Rewind }
                }
                SeekKind::Percent => {
                    ctx.request_seek(SeekRequest {
                        target: SeekTarget::Factor(*target / 100.0),
                        exact: *exact,
                    });
                    SeekDirection::Forward
                }
                SeekKind::Relative => {
                    ctx.request_seek(SeekRequest {
                        target: SeekTarget::Relative(*target),
                        exact: *exact,
                    });
                    if *target > 0.0 { SeekDirection::Forward } else { SeekDirection::Rewind }
                }
            };
            if bar_osd {
                ctx.osd.seek_info |= SeekInfoFlags::BAR;
            }
            if msg_osd && !auto_osd {
                ctx.osd.seek_info |= SeekInfoFlags::TEXT;
            }
            if !ctx.osd.seek_info.is_empty() {
                ctx.osd.seek_direction = Some(direction);
            }
        }

        Command::Set { property, value } => {
            match set_property_from_str(ctx, property, value) {
                Err(crate::property::PropertyError::Unknown) => {
                    tracing::warn!("Unknown property: '{}'", property);
                }
                Err(e) => {
                    tracing::warn!("Failed to set property '{}' to '{}': {}", property, value, e);
                }
                Ok(()) => show_property_osd(ctx, property, inv.on_osd),
            }
        }

        Command::Add { property, step } | Command::Cycle { property, step } => {
            let step = SwitchStep {
                amount: step.unwrap_or(1.0),
                wrap: matches!(inv.command, Command::Cycle { .. }),
            };
            match switch_property(ctx, property, step) {
                Err(crate::property::PropertyError::Unknown) => {
                    tracing::warn!("Unknown property: '{}'", property);
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to increment property '{}' by {}: {}",
                        property,
                        step.amount,
                        e
                    );
                }
                Ok(()) => show_property_osd(ctx, property, inv.on_osd),
            }
        }

        Command::GetProperty { property } => match get_property(ctx, property) {
            Ok(value) => {
                ctx.term_write(format!("ANS_{}={}", property, format_value(&value)));
            }
            Err(e) => {
                tracing::warn!("Failed to get value of property '{}'.", property);
                ctx.term_write(format!("ANS_ERROR={}", e.answer_code()));
            }
        },

        Command::SpeedMult { factor } => {
            let speed = ctx.opts.speed * factor;
            if let Err(e) = set_property(ctx, "speed", Value::Float(speed)) {
                tracing::warn!("Failed to set speed: {}", e);
            } else {
                show_property_osd(ctx, "speed", inv.on_osd);
            }
        }

        Command::FrameStep => ctx.step_frame(),

        Command::Quit { code } => ctx.stop_play = Some(StopReason::Quit(*code)),

        Command::PlaylistNext { force } | Command::PlaylistPrev { force } => {
            let direction = if matches!(inv.command, Command::PlaylistPrev { .. }) { -1 } else { 1 };
            match ctx.playlist.next_index(direction) {
                Some(index) => {
                    ctx.playlist.current = Some(index);
                    ctx.playlist.current_was_replaced = false;
                    ctx.stop_play = Some(StopReason::CurrentEntry);
                }
                None if *force => {
                    ctx.playlist.current = None;
                    ctx.stop_play = Some(StopReason::CurrentEntry);
                }
                None => {}
            }
        }

        Command::PlaylistClear => ctx.playlist.clear_except_current(),

        Command::LoadFile { path, append } => {
            if !*append {
                ctx.playlist.clear();
            }
            ctx.playlist.add(PlaylistEntry::new(path));
            if !*append {
                ctx.playlist.current = Some(0);
                ctx.playlist.current_was_replaced = false;
                ctx.stop_play = Some(StopReason::CurrentEntry);
            }
        }

        Command::LoadList { path, append } => match playlist::parse_file(path) {
            Ok(entries) => {
                if !*append {
                    ctx.playlist.clear();
                }
                ctx.playlist.entries.extend(entries);
                if !*append {
                    ctx.stop_play = Some(StopReason::NextEntry);
                }
            }
            Err(e) => {
                tracing::error!("Unable to load playlist {}: {}", path, e);
            }
        },

        Command::Stop => ctx.stop_play = Some(StopReason::Stop),

        Command::OsdLevel { level } => {
            let max = MAX_OSD_LEVEL;
            ctx.opts.osd_level = match level {
                None => (ctx.opts.osd_level + 1) % (max + 1),
                Some(v) => (*v).clamp(0, max),
            };
            if msg_osd && ctx.opts.osd_level <= 1 {
                let state = if ctx.opts.osd_level != 0 { "enabled" } else { "disabled" };
                set_osd_msg(ctx, MessageId::OsdStatus, 0, format!("OSD: {}", state));
            } else {
                ctx.osd.remove_msg(MessageId::OsdStatus);
            }
        }

        Command::PrintText { text } => {
            let expanded = expand_string(ctx, text);
            ctx.term_write(expanded);
        }

        Command::ShowText { text, duration_ms, level } => {
            let expanded = expand_string(ctx, text);
            let duration = duration_ms.unwrap_or(ctx.opts.osd_duration_ms);
            set_osd_msg_dur(ctx, MessageId::Text, level.unwrap_or(0), duration, expanded);
        }

        Command::ShowProgress => {
            if msg_osd {
                ctx.osd.seek_info |= SeekInfoFlags::TEXT;
            }
            if bar_osd {
                ctx.osd.seek_info |= SeekInfoFlags::BAR;
            }
        }

        Command::ShowChapters => show_chapters_on_osd(ctx),

        Command::ShowTracks => show_tracks_on_osd(ctx),

        Command::SubStep { movement } => sub_step(ctx, *movement, osdl),

        Command::SubLoad { path } => {
            if ctx.video_stream().is_some() {
                if let Some(media) = ctx.media.as_mut() {
                    let id = media.add_external_sub(path);
                    tracing::info!("Loaded subtitle file '{}' as track {}", path, id);
                }
            }
        }

        Command::Screenshot { mode, each_frame } => {
            ctx.request_screenshot(*mode, *each_frame);
        }

        Command::Run { command } => run_detached(ctx, command),

        Command::AfSwitch { filters } => {
            if ctx.audio_stream().is_some() {
                ctx.af_chain.clear();
                ctx.af_chain.add_spec(filters);
                ctx.reinit_audio();
            }
        }

        Command::AfAdd { filters } => {
            if ctx.audio_stream().is_some() {
                ctx.af_chain.add_spec(filters);
                ctx.reinit_audio();
            }
        }

        Command::AfDel { filters } => {
            if ctx.audio_stream().is_some() {
                ctx.af_chain.remove_spec(filters);
                ctx.reinit_audio();
            }
        }

        Command::AfClr => {
            if ctx.audio_stream().is_some() {
                ctx.af_chain.clear();
                ctx.reinit_audio();
            }
        }

        Command::AfCmdline { filter, args } => {
            if ctx.audio_stream().is_some() && !ctx.af_chain.command_line(filter, args) {
                tracing::warn!("Filter '{}' not found in chain.", filter);
            }
        }
    }

    // Uniform pause post-processing, independent of the command's own logic.
    match inv.pausing {
        Pausing::None => {}
        Pausing::Pause => ctx.pause(),
        Pausing::Toggle => {
            if ctx.paused() {
                ctx.unpause();
            } else {
                ctx.pause();
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Step to the previous/next subtitle event by shifting sub-delay so the
/// target event lands on the current position.
fn sub_step(ctx: &mut PlayerContext, movement: i64, osdl: i64) {
    if ctx.video_stream().is_none() {
        return;
    }
    let Some(track) = ctx.current_track(TrackKind::Sub) else {
        return;
    };
    if track.sub_events.is_empty() {
        return;
    }
    let events = track.sub_events.clone();
    let now = ctx.position() - ctx.opts.sub_delay;
    let current = events
        .iter()
        .rposition(|&t| t <= now)
        .map(|i| i as i64)
        .unwrap_or(-1);
    let target = (current + movement).clamp(0, events.len() as i64 - 1) as usize;
    ctx.opts.sub_delay = ctx.position() - events[target];

    let delay_ms = (ctx.opts.sub_delay * 1000.0).round() as i64;
    set_osd_msg(
        ctx,
        MessageId::SubDelay,
        osdl,
        format!("Sub delay: {} ms", delay_ms),
    );
}

/// Fire-and-forget subprocess: spawned detached, never waited on.
#[cfg(unix)]
fn run_detached(ctx: &mut PlayerContext, command: &str) {
    let expanded = expand_string(ctx, command);
    if let Err(e) = std::process::Command::new("/bin/sh")
        .arg("-c")
        .arg(&expanded)
        .spawn()
    {
        tracing::warn!("Failed to run '{}': {}", expanded, e);
    }
}

#[cfg(not(unix))]
fn run_detached(_ctx: &mut PlayerContext, command: &str) {
    tracing::warn!("run command not supported on this platform: '{}'", command);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{AudioStream, Chapter, Media, Track, VideoStream};
    use crate::osd::OsdState;

    fn demo_ctx() -> PlayerContext {
        let mut media = Media::from_path("/media/demo.mkv");
        media.duration = 600.0;
        media.chapters = vec![
            Chapter { title: "One".into(), start: 0.0 },
            Chapter { title: "Two".into(), start: 300.0 },
        ];
        let mut sub = Track::new(0, TrackKind::Sub);
        sub.sub_events = vec![10.0, 20.0, 30.0];
        sub.default = true;
        media.tracks = vec![
            Track::new(0, TrackKind::Video),
            Track::new(0, TrackKind::Audio),
            sub,
        ];
        media.audio = Some(AudioStream {
            codec: "aac".into(),
            format: 255,
            bitrate: 24_000,
            samplerate: 44_100,
            channels: 2,
        });
        media.video = Some(VideoStream {
            codec: "h264".into(),
            format: 0x1000_0005,
            bitrate: 400_000,
            width: 1280,
            height: 720,
            fps: 30.0,
            aspect: 16.0 / 9.0,
        });
        let mut ctx = PlayerContext::default();
        ctx.load_media(media);
        ctx
    }

    fn run(ctx: &mut PlayerContext, command: Command) {
        run_command(ctx, &Invocation::from(command));
    }

    #[test]
    fn test_seek_sets_coalesced_osd_flags() {
        let mut ctx = demo_ctx();
        run(&mut ctx, Command::Seek {
            target: 10.0,
            kind: SeekKind::Relative,
            exact: false,
        });
        assert_eq!(ctx.position(), 10.0);
        let (flags, direction) = ctx.osd.take_seek_info();
        assert!(flags.contains(SeekInfoFlags::BAR));
        assert_eq!(direction, Some(SeekDirection::Forward));
    }

    #[test]
    fn test_seek_osd_none_suppresses_feedback() {
        let mut ctx = demo_ctx();
        run_command(&mut ctx, &Invocation {
            command: Command::Seek { target: 10.0, kind: SeekKind::Relative, exact: false },
            on_osd: OnOsd::No,
            pausing: Pausing::None,
        });
        let (flags, direction) = ctx.osd.take_seek_info();
        assert!(flags.is_empty());
        assert_eq!(direction, None);
    }

    #[test]
    fn test_set_unknown_property_is_ignored() {
        let mut ctx = demo_ctx();
        let position = ctx.position();
        run(&mut ctx, Command::Set {
            property: "not-a-real-property".into(),
            value: "1".into(),
        });
        assert_eq!(ctx.position(), position);
        assert!(ctx.osd.messages().is_empty());
        assert_eq!(ctx.stop_play, None);
    }

    #[test]
    fn test_set_volume_shows_bar() {
        let mut ctx = demo_ctx();
        run(&mut ctx, Command::Set { property: "volume".into(), value: "40".into() });
        let bar = ctx.osd.take_bar().expect("volume set should draw a bar");
        assert_eq!(bar.value, 40.0);
        assert_eq!(bar.label, "Volume");
    }

    #[test]
    fn test_cycle_pause_shows_message() {
        let mut ctx = demo_ctx();
        run(&mut ctx, Command::Cycle { property: "pause".into(), step: None });
        assert!(ctx.paused());
        assert!(ctx.osd.messages().iter().any(|m| m.text == "Pause: yes"));
    }

    #[test]
    fn test_get_property_answers_on_term_channel() {
        let mut ctx = demo_ctx();
        run(&mut ctx, Command::GetProperty { property: "fps".into() });
        run(&mut ctx, Command::GetProperty { property: "bogus".into() });
        let answers = ctx.take_term_output();
        assert_eq!(answers[0], "ANS_fps=30.00");
        assert_eq!(answers[1], "ANS_ERROR=PROPERTY_UNKNOWN");
    }

    #[test]
    fn test_speed_mult_compounds() {
        let mut ctx = demo_ctx();
        run(&mut ctx, Command::SpeedMult { factor: 2.0 });
        run(&mut ctx, Command::SpeedMult { factor: 2.0 });
        assert_eq!(ctx.opts.speed, 4.0);
    }

    #[test]
    fn test_quit_records_exit_code() {
        let mut ctx = demo_ctx();
        run(&mut ctx, Command::Quit { code: 3 });
        assert_eq!(ctx.stop_play, Some(StopReason::Quit(3)));
    }

    #[test]
    fn test_loadfile_replace_vs_append() {
        let mut ctx = demo_ctx();
        run(&mut ctx, Command::LoadFile { path: "a.mkv".into(), append: false });
        assert_eq!(ctx.playlist.len(), 1);
        assert_eq!(ctx.stop_play, Some(StopReason::CurrentEntry));
        ctx.stop_play = None;
        run(&mut ctx, Command::LoadFile { path: "b.mkv".into(), append: true });
        assert_eq!(ctx.playlist.len(), 2);
        assert_eq!(ctx.stop_play, None);
    }

    #[test]
    fn test_playlist_next_requires_entry_unless_forced() {
        let mut ctx = demo_ctx();
        ctx.playlist.add(PlaylistEntry::new("only.mkv"));
        ctx.playlist.current = Some(0);
        run(&mut ctx, Command::PlaylistNext { force: false });
        assert_eq!(ctx.stop_play, None);
        run(&mut ctx, Command::PlaylistNext { force: true });
        assert_eq!(ctx.stop_play, Some(StopReason::CurrentEntry));
        assert_eq!(ctx.playlist.current, None);
    }

    #[test]
    fn test_osd_level_cycles_and_reports() {
        let mut ctx = demo_ctx();
        ctx.opts.osd_level = 0;
        run(&mut ctx, Command::OsdLevel { level: None });
        assert_eq!(ctx.opts.osd_level, 1);
        assert!(ctx
            .osd
            .messages()
            .iter()
            .any(|m| m.text == "OSD: enabled"));
        run(&mut ctx, Command::OsdLevel { level: Some(99) });
        assert_eq!(ctx.opts.osd_level, MAX_OSD_LEVEL);
    }

    #[test]
    fn test_print_text_expands_properties() {
        let mut ctx = demo_ctx();
        run(&mut ctx, Command::PrintText { text: "file: ${filename}".into() });
        assert_eq!(ctx.take_term_output(), vec!["file: demo.mkv".to_string()]);
    }

    #[test]
    fn test_show_progress_flags() {
        let mut ctx = demo_ctx();
        run(&mut ctx, Command::ShowProgress);
        let (flags, _) = ctx.osd.take_seek_info();
        assert_eq!(flags, SeekInfoFlags::TEXT | SeekInfoFlags::BAR);
    }

    #[test]
    fn test_sub_step_shifts_delay() {
        let mut ctx = demo_ctx();
        ctx.request_seek(crate::context::SeekRequest {
            target: SeekTarget::Absolute(15.0),
            exact: false,
        });
        run(&mut ctx, Command::SubStep { movement: 1 });
        // Event at 20s pulled to the current position.
        assert_eq!(ctx.opts.sub_delay, -5.0);
        assert!(ctx
            .osd
            .messages()
            .iter()
            .any(|m| m.id == MessageId::SubDelay));
    }

    #[test]
    fn test_af_edits_gated_on_audio() {
        let mut ctx = demo_ctx();
        run(&mut ctx, Command::AfAdd { filters: "volume=10,pan".into() });
        assert_eq!(ctx.af_chain.display_chain(), "volume=10,pan");
        run(&mut ctx, Command::AfDel { filters: "pan".into() });
        assert_eq!(ctx.af_chain.display_chain(), "volume=10");

        ctx.media.as_mut().unwrap().audio = None;
        ctx.select_track(TrackKind::Audio, None);
        run(&mut ctx, Command::AfClr);
        assert_eq!(ctx.af_chain.display_chain(), "volume=10");
    }

    #[test]
    fn test_pausing_applied_after_any_command() {
        let mut ctx = demo_ctx();
        run_command(&mut ctx, &Invocation {
            command: Command::Seek { target: 5.0, kind: SeekKind::Relative, exact: false },
            on_osd: OnOsd::Auto,
            pausing: Pausing::Pause,
        });
        assert!(ctx.paused());
        run_command(&mut ctx, &Invocation {
            command: Command::ShowProgress,
            on_osd: OnOsd::Auto,
            pausing: Pausing::Toggle,
        });
        assert!(!ctx.paused());
    }

    #[test]
    fn test_screenshot_request_recorded() {
        let mut ctx = demo_ctx();
        run(&mut ctx, Command::Screenshot { mode: 1, each_frame: false });
        let req = ctx.pending_screenshot.expect("screenshot request");
        assert_eq!(req.mode, 1);
        assert!(!req.each_frame);
    }

    #[test]
    fn test_invocation_json_round_trip() {
        let inv = Invocation {
            command: Command::Set { property: "volume".into(), value: "50".into() },
            on_osd: OnOsd::Bar,
            pausing: Pausing::Toggle,
        };
        let json = serde_json::to_string(&inv).unwrap();
        let back: Invocation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inv);
    }

    #[test]
    fn test_osd_state_default_is_quiet() {
        let osd = OsdState::default();
        assert!(osd.messages().is_empty());
        assert!(osd.seek_info.is_empty());
    }
}
