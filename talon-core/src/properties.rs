//! # Property Registry
//!
//! Every named property the player exposes, with its accessor, plus the
//! top-level operations (get/set/print/switch/type query) used by commands,
//! the IPC surface and the OSD. Names are stable, case-sensitive external
//! API.
//!
//! Most accessors are thin: read-only views over the media model, or
//! bridges into the option table for properties that mirror an option of
//! the same name. Anything with real side effects (seeking, track
//! selection, mixer) gets its own accessor.

use crate::context::{PlayerContext, SeekRequest, SeekTarget, StopReason};
use crate::media::TrackKind;
use crate::options::{self, OptionAccessor};
use crate::property::{
    find, format_value, split_key, Property, PropertyEntry, PropertyError, PropertyResult,
    SwitchStep, TypeInfo, Value, ValueType,
};
use once_cell::sync::Lazy;

// ============================================================================
// Shared Accessor Building Blocks
// ============================================================================

/// Resource a property needs before it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Media,
    Audio,
    Video,
    AudioVideo,
}

impl Gate {
    fn check(self, ctx: &PlayerContext) -> PropertyResult<()> {
        let ok = match self {
            Gate::Media => ctx.media().is_some(),
            Gate::Audio => ctx.audio_stream().is_some(),
            Gate::Video => ctx.video_stream().is_some(),
            Gate::AudioVideo => ctx.audio_stream().is_some() && ctx.video_stream().is_some(),
        };
        if ok {
            Ok(())
        } else {
            Err(PropertyError::Unavailable)
        }
    }
}

fn option_accessor(name: &str) -> &'static OptionAccessor {
    // Registry construction pairs every bridge with a table row; a miss is
    // a table bug, caught by tests.
    options::find_option(name).expect("option bridge without option table row")
}

/// Property/option bridge: GET, SET and the type query delegate to the
/// option table entry of the same name.
struct OptionBacked(&'static str);

impl Property for OptionBacked {
    fn type_info(&self, _ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Ok(option_accessor(self.0).info.clone())
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Ok((option_accessor(self.0).get)(&ctx.opts))
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        (option_accessor(self.0).set)(&mut ctx.opts, &value)
    }
}

/// Option bridge that answers only while a resource is active.
struct GatedOption {
    name: &'static str,
    gate: Gate,
}

impl Property for GatedOption {
    fn type_info(&self, ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        self.gate.check(ctx)?;
        OptionBacked(self.name).type_info(ctx)
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        self.gate.check(ctx)?;
        OptionBacked(self.name).get(ctx)
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        self.gate.check(ctx)?;
        OptionBacked(self.name).set(ctx, value)
    }
}

/// Gated option rendered as a millisecond delay on the OSD.
struct DelayOption {
    name: &'static str,
    gate: Gate,
}

impl Property for DelayOption {
    fn type_info(&self, ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        self.gate.check(ctx)?;
        OptionBacked(self.name).type_info(ctx)
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        self.gate.check(ctx)?;
        OptionBacked(self.name).get(ctx)
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        self.gate.check(ctx)?;
        OptionBacked(self.name).set(ctx, value)
    }

    fn print(&self, ctx: &PlayerContext) -> PropertyResult<String> {
        let Some(seconds) = self.get(ctx)?.as_f64() else {
            return Err(PropertyError::Failed("non-numeric delay".into()));
        };
        Ok(format_delay(seconds))
    }
}

type CtxGet<T> = fn(&PlayerContext) -> PropertyResult<T>;

struct RoStr(CtxGet<String>);

impl Property for RoStr {
    fn type_info(&self, _ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Ok(TypeInfo::new(ValueType::Str))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Ok(Value::Str((self.0)(ctx)?))
    }
}

struct RoInt(CtxGet<i64>);

impl Property for RoInt {
    fn type_info(&self, _ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Ok(TypeInfo::new(ValueType::Int))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Ok(Value::Int((self.0)(ctx)?))
    }
}

/// Read-only integer with a custom OSD rendering.
struct RoIntPrint {
    get: CtxGet<i64>,
    print: CtxGet<String>,
}

impl Property for RoIntPrint {
    fn type_info(&self, _ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Ok(TypeInfo::new(ValueType::Int))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Ok(Value::Int((self.get)(ctx)?))
    }

    fn print(&self, ctx: &PlayerContext) -> PropertyResult<String> {
        (self.print)(ctx)
    }
}

struct RoFloat(CtxGet<f64>);

impl Property for RoFloat {
    fn type_info(&self, _ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Ok(TypeInfo::new(ValueType::Float))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Ok(Value::Float((self.0)(ctx)?))
    }
}

struct RoTime(CtxGet<f64>);

impl Property for RoTime {
    fn type_info(&self, _ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Ok(TypeInfo::new(ValueType::Time))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Ok(Value::Time((self.0)(ctx)?))
    }
}

fn format_bitrate(rate: i64) -> String {
    format!("{} kbps", rate * 8 / 1000)
}

fn format_delay(seconds: f64) -> String {
    format!("{} ms", (seconds * 1000.0).round() as i64)
}

fn media_of(ctx: &PlayerContext) -> PropertyResult<&crate::media::Media> {
    ctx.media().ok_or(PropertyError::Unavailable)
}

// ============================================================================
// Playback Position
// ============================================================================

/// Playback speed multiplier. Changing it rebuilds the audio chain so
/// resampling picks up the new rate.
struct Speed;

impl Property for Speed {
    fn type_info(&self, ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        OptionBacked("speed").type_info(ctx)
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        OptionBacked("speed").get(ctx)
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        OptionBacked("speed").set(ctx, value)?;
        ctx.reinit_audio();
        Ok(())
    }

    fn print(&self, ctx: &PlayerContext) -> PropertyResult<String> {
        Ok(format!("x {:6.2}", ctx.opts.speed))
    }
}

struct Pause;

impl Property for Pause {
    fn type_info(&self, _ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Ok(TypeInfo::ranged(ValueType::Flag, 0.0, 1.0))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Ok(Value::Flag(ctx.paused()))
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        match value {
            Value::Flag(true) => ctx.pause(),
            Value::Flag(false) => ctx.unpause(),
            _ => return Err(PropertyError::Failed("expected a flag value".into())),
        }
        Ok(())
    }
}

struct TimePos;

impl Property for TimePos {
    fn type_info(&self, _ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Ok(TypeInfo::new(ValueType::Time))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        media_of(ctx)?;
        Ok(Value::Time(ctx.position()))
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        media_of(ctx)?;
        let target = value
            .as_f64()
            .ok_or_else(|| PropertyError::Failed("expected a time value".into()))?;
        ctx.request_seek(SeekRequest {
            target: SeekTarget::Absolute(target),
            exact: false,
        });
        Ok(())
    }
}

struct PercentPos;

impl Property for PercentPos {
    fn type_info(&self, _ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Ok(TypeInfo::ranged(ValueType::Int, 0.0, 100.0))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        media_of(ctx)?;
        ctx.percent_pos()
            .map(Value::Int)
            .ok_or(PropertyError::Unavailable)
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        media_of(ctx)?;
        let pos = value
            .as_f64()
            .ok_or_else(|| PropertyError::Failed("expected a percentage".into()))?;
        ctx.request_seek(SeekRequest {
            target: SeekTarget::Factor(pos / 100.0),
            exact: false,
        });
        Ok(())
    }
}

/// Byte position in the underlying stream.
struct StreamPos;

impl Property for StreamPos {
    fn type_info(&self, ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        let media = media_of(ctx)?;
        Ok(TypeInfo::ranged(
            ValueType::Int,
            media.stream_start as f64,
            media.stream_end as f64,
        ))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Ok(Value::Int(media_of(ctx)?.stream_pos))
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        media_of(ctx)?;
        let pos = value
            .as_f64()
            .ok_or_else(|| PropertyError::Failed("expected a byte offset".into()))?
            as i64;
        let media = ctx.media.as_mut().ok_or(PropertyError::Unavailable)?;
        media.stream_pos = pos.clamp(media.stream_start, media.stream_end);
        Ok(())
    }
}

// ============================================================================
// Chapters / Editions / Angles
// ============================================================================

struct ChapterProp;

impl ChapterProp {
    fn chapter_count(ctx: &PlayerContext) -> PropertyResult<i64> {
        let media = media_of(ctx)?;
        if media.chapters.is_empty() {
            return Err(PropertyError::Unavailable);
        }
        Ok(media.chapters.len() as i64)
    }

    fn seek_to_chapter(ctx: &mut PlayerContext, index: i64) {
        let start = ctx
            .media()
            .and_then(|m| m.chapters.get(index as usize))
            .map(|c| c.start);
        if let Some(start) = start {
            ctx.request_seek(SeekRequest {
                target: SeekTarget::Absolute(start),
                exact: false,
            });
        }
    }
}

impl Property for ChapterProp {
    fn type_info(&self, ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        let count = Self::chapter_count(ctx)?;
        Ok(TypeInfo::ranged(ValueType::Int, 0.0, (count - 1) as f64))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Self::chapter_count(ctx)?;
        let media = media_of(ctx)?;
        Ok(Value::Int(
            media.chapter_at(ctx.position()).map(|i| i as i64).unwrap_or(-1),
        ))
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        let count = Self::chapter_count(ctx)?;
        let index = value
            .as_f64()
            .ok_or_else(|| PropertyError::Failed("expected a chapter index".into()))?
            as i64;
        Self::seek_to_chapter(ctx, index.clamp(0, count - 1));
        Ok(())
    }

    /// Stepping past the last chapter advances the playlist instead of
    /// clamping, so chapter-next at the end behaves like next-entry.
    fn switch(&self, ctx: &mut PlayerContext, step: SwitchStep) -> PropertyResult<()> {
        let count = Self::chapter_count(ctx)?;
        let current = match self.get(ctx)? {
            Value::Int(i) => i,
            _ => 0,
        };
        let target = current + step.amount.round() as i64;
        if target >= count {
            if step.amount > 0.0 {
                ctx.stop_play = Some(StopReason::NextEntry);
            }
            return Ok(());
        }
        Self::seek_to_chapter(ctx, target.max(0));
        Ok(())
    }

    fn print(&self, ctx: &PlayerContext) -> PropertyResult<String> {
        let media = media_of(ctx)?;
        let index = media
            .chapter_at(ctx.position())
            .ok_or(PropertyError::Unavailable)?;
        let chapter = &media.chapters[index];
        Ok(format!("({}) {}", index + 1, chapter.title))
    }
}

struct EditionProp;

impl EditionProp {
    fn editions(ctx: &PlayerContext) -> PropertyResult<i64> {
        let media = media_of(ctx)?;
        if media.editions <= 0 {
            return Err(PropertyError::Unavailable);
        }
        Ok(media.editions)
    }
}

impl Property for EditionProp {
    fn type_info(&self, ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        let editions = Self::editions(ctx)?;
        Ok(TypeInfo::ranged(ValueType::Int, 0.0, (editions - 1) as f64))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Self::editions(ctx)?;
        Ok(Value::Int(media_of(ctx)?.edition))
    }

    /// Switching editions means reopening the source; the play loop
    /// observes the restart reason and the requested edition option.
    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        Self::editions(ctx)?;
        let edition = value
            .as_f64()
            .ok_or_else(|| PropertyError::Failed("expected an edition index".into()))?
            as i64;
        let current = ctx.media().ok_or(PropertyError::Unavailable)?.edition;
        if edition != current {
            ctx.opts.edition_id = edition;
            ctx.stop_play = Some(StopReason::Restart);
        }
        Ok(())
    }
}

struct AngleProp;

impl AngleProp {
    fn angles(ctx: &PlayerContext) -> PropertyResult<i64> {
        let media = media_of(ctx)?;
        if media.angle < 0 || media.angles <= 1 {
            return Err(PropertyError::Unavailable);
        }
        Ok(media.angles)
    }
}

impl Property for AngleProp {
    fn type_info(&self, ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        let angles = Self::angles(ctx)?;
        Ok(TypeInfo::ranged(ValueType::Int, 1.0, angles as f64))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Self::angles(ctx)?;
        Ok(Value::Int(media_of(ctx)?.angle))
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        let angles = Self::angles(ctx)?;
        let angle = value
            .as_f64()
            .ok_or_else(|| PropertyError::Failed("expected an angle".into()))?
            as i64;
        let media = ctx.media.as_mut().ok_or(PropertyError::Unavailable)?;
        media.angle = angle.clamp(1, angles);
        Ok(())
    }

    fn print(&self, ctx: &PlayerContext) -> PropertyResult<String> {
        let angles = Self::angles(ctx)?;
        Ok(format!("{}/{}", media_of(ctx)?.angle, angles))
    }
}

// ============================================================================
// Metadata
// ============================================================================

struct Metadata;

impl Property for Metadata {
    fn type_info(&self, _ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Ok(TypeInfo::new(ValueType::StrList))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        let media = media_of(ctx)?;
        Ok(Value::StrList(
            media
                .metadata
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect(),
        ))
    }

    fn get_key(&self, ctx: &PlayerContext, key: &str) -> PropertyResult<Value> {
        let media = media_of(ctx)?;
        media
            .metadata_value(key)
            .map(|v| Value::Str(v.to_string()))
            .ok_or(PropertyError::Unknown)
    }
}

// ============================================================================
// Audio
// ============================================================================

struct Volume;

impl Property for Volume {
    fn type_info(&self, ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Gate::Audio.check(ctx)?;
        Ok(TypeInfo::ranged(ValueType::Float, 0.0, 100.0))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Gate::Audio.check(ctx)?;
        Ok(Value::Float(ctx.mixer.volume()))
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        Gate::Audio.check(ctx)?;
        let volume = value
            .as_f64()
            .ok_or_else(|| PropertyError::Failed("expected a volume".into()))?;
        ctx.mixer.set_volume(volume);
        Ok(())
    }

    /// Volume steps by the mixer's own increment; the step amount only
    /// picks the direction.
    fn switch(&self, ctx: &mut PlayerContext, step: SwitchStep) -> PropertyResult<()> {
        Gate::Audio.check(ctx)?;
        if step.amount <= 0.0 {
            ctx.mixer.dec_volume();
        } else {
            ctx.mixer.inc_volume();
        }
        Ok(())
    }
}

struct Mute;

impl Property for Mute {
    fn type_info(&self, ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Gate::Audio.check(ctx)?;
        Ok(TypeInfo::ranged(ValueType::Flag, 0.0, 1.0))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Gate::Audio.check(ctx)?;
        Ok(Value::Flag(ctx.mixer.muted()))
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        Gate::Audio.check(ctx)?;
        match value {
            Value::Flag(mute) => ctx.mixer.set_mute(mute),
            _ => return Err(PropertyError::Failed("expected a flag value".into())),
        }
        Ok(())
    }
}

struct Balance;

impl Property for Balance {
    fn type_info(&self, _ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Ok(TypeInfo::ranged(ValueType::Float, -1.0, 1.0))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Ok(Value::Float(ctx.mixer.balance()))
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        let balance = value
            .as_f64()
            .ok_or_else(|| PropertyError::Failed("expected a balance".into()))?;
        ctx.mixer.set_balance(balance);
        Ok(())
    }

    fn print(&self, ctx: &PlayerContext) -> PropertyResult<String> {
        Ok(ctx.mixer.balance_text())
    }
}

// ============================================================================
// Track Selection
// ============================================================================

struct TrackSelect(TrackKind);

impl Property for TrackSelect {
    fn type_info(&self, ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        media_of(ctx)?;
        Ok(TypeInfo::ranged(ValueType::Int, -2.0, 65535.0))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        media_of(ctx)?;
        Ok(Value::Int(ctx.selected_track(self.0).unwrap_or(-1)))
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        media_of(ctx)?;
        let id = value
            .as_f64()
            .ok_or_else(|| PropertyError::Failed("expected a track id".into()))?
            as i64;
        ctx.select_track(self.0, (id >= 0).then_some(id));
        Ok(())
    }

    fn switch(&self, ctx: &mut PlayerContext, step: SwitchStep) -> PropertyResult<()> {
        media_of(ctx)?;
        let direction = if step.amount >= 0.0 { 1 } else { -1 };
        let next = ctx.track_next(self.0, direction);
        ctx.select_track(self.0, next);
        Ok(())
    }

    fn print(&self, ctx: &PlayerContext) -> PropertyResult<String> {
        media_of(ctx)?;
        match ctx.current_track(self.0) {
            None => Ok("disabled".to_string()),
            Some(track) => {
                let lang = track.lang.as_deref().unwrap_or("unknown");
                Ok(match &track.title {
                    Some(title) => format!("({}) {} (\"{}\")", track.id, lang, title),
                    None => format!("({}) {}", track.id, lang),
                })
            }
        }
    }
}

/// Program selection: switch audio and video tracks as one bundle.
struct ProgramProp;

impl ProgramProp {
    fn apply(ctx: &mut PlayerContext, id: Option<i64>) -> PropertyResult<()> {
        let media = media_of(ctx)?;
        if media.programs.is_empty() {
            return Err(PropertyError::Failed("no programs in stream".into()));
        }
        let program = match id {
            Some(id) => media.programs.iter().find(|p| p.id == id),
            // No explicit id cycles to the program after the current tracks.
            None => {
                let cur_audio = ctx.selected_track(TrackKind::Audio);
                let pos = media
                    .programs
                    .iter()
                    .position(|p| p.audio_id == cur_audio)
                    .map(|i| (i + 1) % media.programs.len())
                    .unwrap_or(0);
                media.programs.get(pos)
            }
        };
        let Some(program) = program.cloned() else {
            return Err(PropertyError::Failed("no such program".into()));
        };
        if program.audio_id.is_none() && program.video_id.is_none() {
            tracing::error!("Selected program contains no audio or video streams!");
            return Err(PropertyError::Failed("empty program".into()));
        }
        ctx.select_track(TrackKind::Audio, program.audio_id);
        ctx.select_track(TrackKind::Video, program.video_id);
        Ok(())
    }
}

impl Property for ProgramProp {
    fn type_info(&self, ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        media_of(ctx)?;
        Ok(TypeInfo::ranged(ValueType::Int, -1.0, 65535.0))
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        let id = value
            .as_f64()
            .ok_or_else(|| PropertyError::Failed("expected a program id".into()))?
            as i64;
        Self::apply(ctx, (id >= 0).then_some(id))
    }

    fn switch(&self, ctx: &mut PlayerContext, _step: SwitchStep) -> PropertyResult<()> {
        Self::apply(ctx, None)
    }
}

// ============================================================================
// Video
// ============================================================================

/// Fullscreen toggles the window state as a side effect of the option.
struct Fullscreen;

impl Property for Fullscreen {
    fn type_info(&self, ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Gate::Video.check(ctx)?;
        OptionBacked("fullscreen").type_info(ctx)
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Gate::Video.check(ctx)?;
        OptionBacked("fullscreen").get(ctx)
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        Gate::Video.check(ctx)?;
        let Value::Flag(want) = value else {
            return Err(PropertyError::Failed("expected a flag value".into()));
        };
        if ctx.opts.fullscreen == want {
            return Ok(());
        }
        ctx.opts.fullscreen = want;
        Ok(())
    }
}

struct VideoFormat;

impl Property for VideoFormat {
    fn type_info(&self, _ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Ok(TypeInfo::new(ValueType::Int))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Ok(Value::Int(
            ctx.video_stream().ok_or(PropertyError::Unavailable)?.format,
        ))
    }

    fn print(&self, ctx: &PlayerContext) -> PropertyResult<String> {
        Ok(ctx
            .video_stream()
            .ok_or(PropertyError::Unavailable)?
            .format_name())
    }
}

struct Aspect;

impl Property for Aspect {
    fn type_info(&self, _ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Ok(TypeInfo::ranged(ValueType::Float, 0.0, 10.0))
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Ok(Value::Float(
            ctx.video_stream().ok_or(PropertyError::Unavailable)?.aspect,
        ))
    }

    /// Values below 0.1 reset to the source pixel aspect.
    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        Gate::Video.check(ctx)?;
        let mut aspect = value
            .as_f64()
            .ok_or_else(|| PropertyError::Failed("expected an aspect ratio".into()))?;
        let video = ctx
            .media
            .as_mut()
            .and_then(|m| m.video.as_mut())
            .ok_or(PropertyError::Unavailable)?;
        if aspect < 0.1 {
            aspect = video.width as f64 / video.height as f64;
        }
        video.aspect = aspect;
        Ok(())
    }
}

/// Subtitle position with its `pos/100` OSD form.
struct SubPos;

impl Property for SubPos {
    fn type_info(&self, ctx: &PlayerContext) -> PropertyResult<TypeInfo> {
        Gate::Video.check(ctx)?;
        OptionBacked("sub-pos").type_info(ctx)
    }

    fn get(&self, ctx: &PlayerContext) -> PropertyResult<Value> {
        Gate::Video.check(ctx)?;
        OptionBacked("sub-pos").get(ctx)
    }

    fn set(&self, ctx: &mut PlayerContext, value: Value) -> PropertyResult<()> {
        Gate::Video.check(ctx)?;
        OptionBacked("sub-pos").set(ctx, value)
    }

    fn print(&self, ctx: &PlayerContext) -> PropertyResult<String> {
        Gate::Video.check(ctx)?;
        Ok(format!("{}/100", ctx.opts.sub_pos))
    }
}

// ============================================================================
// Registry
// ============================================================================

fn opt(name: &'static str) -> PropertyEntry {
    PropertyEntry::new(name, Box::new(OptionBacked(name)))
}

fn gated(name: &'static str, gate: Gate) -> PropertyEntry {
    PropertyEntry::new(name, Box::new(GatedOption { name, gate }))
}

fn entry(name: &'static str, accessor: impl Property + 'static) -> PropertyEntry {
    PropertyEntry::new(name, Box::new(accessor))
}

/// All properties, in presentation order. Immutable after construction.
static PROPERTIES: Lazy<Vec<PropertyEntry>> = Lazy::new(|| {
    vec![
        // General
        opt("osd-level"),
        opt("loop"),
        entry("speed", Speed),
        entry("filename", RoStr(|ctx| {
            Ok(media_of(ctx)?.filename().to_string())
        })),
        entry("path", RoStr(|ctx| Ok(media_of(ctx)?.path.clone()))),
        entry("media-title", RoStr(|ctx| {
            let media = media_of(ctx)?;
            media
                .title
                .clone()
                .or_else(|| Some(media.filename().to_string()))
                .ok_or(PropertyError::Unavailable)
        })),
        entry("stream-path", RoStr(|ctx| Ok(media_of(ctx)?.path.clone()))),
        entry("demuxer", RoStr(|ctx| Ok(media_of(ctx)?.demuxer.clone()))),
        entry("stream-pos", StreamPos),
        entry("stream-start", RoInt(|ctx| Ok(media_of(ctx)?.stream_start))),
        entry("stream-end", RoInt(|ctx| Ok(media_of(ctx)?.stream_end))),
        entry("stream-length", RoInt(|ctx| Ok(media_of(ctx)?.stream_length()))),
        entry("stream-time-pos", RoTime(|ctx| {
            media_of(ctx)?
                .stream_time_pos
                .ok_or(PropertyError::Unavailable)
        })),
        entry("length", RoTime(|ctx| {
            ctx.duration().ok_or(PropertyError::Unavailable)
        })),
        entry("percent-pos", PercentPos),
        entry("time-pos", TimePos),
        entry("chapter", ChapterProp),
        entry("edition", EditionProp),
        entry("titles", RoInt(|ctx| Ok(media_of(ctx)?.titles))),
        entry("chapters", RoInt(|ctx| Ok(media_of(ctx)?.chapters.len() as i64))),
        entry("editions", RoInt(|ctx| {
            let media = media_of(ctx)?;
            if media.editions <= 0 {
                return Err(PropertyError::Unavailable);
            }
            Ok(media.editions)
        })),
        entry("angle", AngleProp),
        entry("metadata", Metadata),
        entry("pause", Pause),
        opt("hr-seek"),
        // Audio
        entry("volume", Volume),
        entry("mute", Mute),
        entry("audio-delay", DelayOption { name: "audio-delay", gate: Gate::AudioVideo }),
        entry("audio-format", RoInt(|ctx| {
            Ok(ctx.audio_stream().ok_or(PropertyError::Unavailable)?.format)
        })),
        entry("audio-codec", RoStr(|ctx| {
            Ok(ctx
                .audio_stream()
                .ok_or(PropertyError::Unavailable)?
                .codec
                .clone())
        })),
        entry("audio-bitrate", RoIntPrint {
            get: |ctx| Ok(ctx.audio_stream().ok_or(PropertyError::Unavailable)?.bitrate),
            print: |ctx| {
                Ok(format_bitrate(
                    ctx.audio_stream().ok_or(PropertyError::Unavailable)?.bitrate,
                ))
            },
        }),
        entry("samplerate", RoIntPrint {
            get: |ctx| {
                Ok(ctx
                    .audio_stream()
                    .ok_or(PropertyError::Unavailable)?
                    .samplerate)
            },
            print: |ctx| {
                let rate = ctx
                    .audio_stream()
                    .ok_or(PropertyError::Unavailable)?
                    .samplerate;
                Ok(format!("{} kHz", rate / 1000))
            },
        }),
        entry("channels", RoIntPrint {
            get: |ctx| Ok(ctx.audio_stream().ok_or(PropertyError::Unavailable)?.channels),
            print: |ctx| {
                let channels = ctx
                    .audio_stream()
                    .ok_or(PropertyError::Unavailable)?
                    .channels;
                Ok(match channels {
                    1 => "mono".to_string(),
                    2 => "stereo".to_string(),
                    n => format!("{n} channels"),
                })
            },
        }),
        entry("audio", TrackSelect(TrackKind::Audio)),
        entry("balance", Balance),
        // Video
        entry("fullscreen", Fullscreen),
        gated("deinterlace", Gate::Video),
        opt("ontop"),
        opt("border"),
        gated("framedrop", Gate::Video),
        gated("gamma", Gate::Video),
        gated("brightness", Gate::Video),
        gated("contrast", Gate::Video),
        gated("saturation", Gate::Video),
        gated("hue", Gate::Video),
        gated("panscan", Gate::Video),
        opt("vsync"),
        entry("video-format", VideoFormat),
        entry("video-codec", RoStr(|ctx| {
            Ok(ctx
                .video_stream()
                .ok_or(PropertyError::Unavailable)?
                .codec
                .clone())
        })),
        entry("video-bitrate", RoIntPrint {
            get: |ctx| Ok(ctx.video_stream().ok_or(PropertyError::Unavailable)?.bitrate),
            print: |ctx| {
                Ok(format_bitrate(
                    ctx.video_stream().ok_or(PropertyError::Unavailable)?.bitrate,
                ))
            },
        }),
        entry("width", RoInt(|ctx| {
            Ok(ctx.video_stream().ok_or(PropertyError::Unavailable)?.width)
        })),
        entry("height", RoInt(|ctx| {
            Ok(ctx.video_stream().ok_or(PropertyError::Unavailable)?.height)
        })),
        entry("fps", RoFloat(|ctx| {
            Ok(ctx.video_stream().ok_or(PropertyError::Unavailable)?.fps)
        })),
        entry("aspect", Aspect),
        entry("video", TrackSelect(TrackKind::Video)),
        entry("program", ProgramProp),
        // Subs
        entry("sub", TrackSelect(TrackKind::Sub)),
        entry("sub-delay", DelayOption { name: "sub-delay", gate: Gate::Video }),
        entry("sub-pos", SubPos),
        gated("sub-visibility", Gate::Video),
        opt("sub-forced-only"),
        opt("sub-scale"),
    ]
});

pub fn registry() -> &'static [PropertyEntry] {
    &PROPERTIES
}

/// All registered property names, table order.
pub fn property_names() -> Vec<&'static str> {
    registry().iter().map(|e| e.name).collect()
}

// ============================================================================
// Top-Level Operations
// ============================================================================

fn lookup(name: &str) -> PropertyResult<&'static PropertyEntry> {
    find(registry(), name).ok_or(PropertyError::Unknown)
}

/// Resolve a name that may carry a `base/key` suffix.
fn lookup_keyed(name: &str) -> PropertyResult<(&'static PropertyEntry, Option<&str>)> {
    match lookup(name) {
        Ok(entry) => Ok((entry, None)),
        Err(PropertyError::Unknown) => {
            let (base, key) = split_key(name).ok_or(PropertyError::Unknown)?;
            Ok((lookup(base)?, Some(key)))
        }
        Err(e) => Err(e),
    }
}

pub fn property_type(ctx: &PlayerContext, name: &str) -> PropertyResult<TypeInfo> {
    let (entry, key) = lookup_keyed(name)?;
    match key {
        None => entry.accessor.type_info(ctx),
        Some(_) => Ok(TypeInfo::new(ValueType::Str)),
    }
}

pub fn get_property(ctx: &PlayerContext, name: &str) -> PropertyResult<Value> {
    let (entry, key) = lookup_keyed(name)?;
    match key {
        None => entry.accessor.get(ctx),
        Some(key) => entry.accessor.get_key(ctx, key),
    }
}

/// Typed set. Numeric values are clamped into the property's declared
/// range before the accessor runs, so out-of-range writes are deterministic.
pub fn set_property(ctx: &mut PlayerContext, name: &str, value: Value) -> PropertyResult<()> {
    let entry = lookup(name)?;
    let info = entry.accessor.type_info(ctx)?;
    entry.accessor.set(ctx, info.clamp(value))
}

/// String set: parse per the property's type, then clamp and set.
pub fn set_property_from_str(ctx: &mut PlayerContext, name: &str, raw: &str) -> PropertyResult<()> {
    let entry = lookup(name)?;
    let info = entry.accessor.type_info(ctx)?;
    let value = info.parse(raw)?;
    entry.accessor.set(ctx, info.clamp(value))
}

pub fn switch_property(
    ctx: &mut PlayerContext,
    name: &str,
    step: SwitchStep,
) -> PropertyResult<()> {
    lookup(name)?.accessor.switch(ctx, step)
}

pub fn print_property(ctx: &PlayerContext, name: &str) -> PropertyResult<String> {
    let (entry, key) = lookup_keyed(name)?;
    match key {
        None => entry.accessor.print(ctx),
        Some(key) => Ok(format_value(&entry.accessor.get_key(ctx, key)?)),
    }
}

/// Expand `${property}` references in user text. Failed lookups expand to
/// nothing, mirroring how the terminal status line degrades.
pub fn expand_string(ctx: &PlayerContext, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                if let Ok(value) = print_property(ctx, name) {
                    out.push_str(&value);
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{AudioStream, Chapter, Media, Track, VideoStream};

    fn demo_media() -> Media {
        let mut media = Media::from_path("/media/demo.mkv");
        media.duration = 600.0;
        media.stream_end = 1_000_000;
        media.title = Some("Demo".to_string());
        media.chapters = vec![
            Chapter { title: "Intro".into(), start: 0.0 },
            Chapter { title: "Main".into(), start: 300.0 },
        ];
        media.metadata = vec![("title".into(), "Demo".into())];
        let mut audio0 = Track::new(0, TrackKind::Audio);
        audio0.lang = Some("en".into());
        let mut audio1 = Track::new(1, TrackKind::Audio);
        audio1.lang = Some("ja".into());
        media.tracks = vec![
            Track::new(0, TrackKind::Video),
            audio0,
            audio1,
            Track::new(0, TrackKind::Sub),
        ];
        media.audio = Some(AudioStream {
            codec: "flac".into(),
            format: 0x43614C66,
            bitrate: 96_000,
            samplerate: 48_000,
            channels: 2,
        });
        media.video = Some(VideoStream {
            codec: "h264".into(),
            format: 0x1000_0005,
            bitrate: 500_000,
            width: 1920,
            height: 1080,
            fps: 24.0,
            aspect: 16.0 / 9.0,
        });
        media
    }

    fn demo_ctx() -> PlayerContext {
        let mut ctx = PlayerContext::default();
        ctx.load_media(demo_media());
        ctx
    }

    #[test]
    fn test_get_type_matches_get_for_all_properties() {
        let ctx = demo_ctx();
        for name in property_names() {
            let value = match get_property(&ctx, name) {
                Ok(v) => v,
                // Write-only or currently absent resources are exempt.
                Err(PropertyError::NotImplemented) | Err(PropertyError::Unavailable) => continue,
                Err(e) => panic!("{name}: unexpected {e:?}"),
            };
            let info = property_type(&ctx, name)
                .unwrap_or_else(|e| panic!("{name}: no type info ({e:?})"));
            assert_eq!(
                value.value_type(),
                info.value_type,
                "{name}: GET variant disagrees with GET_TYPE"
            );
        }
    }

    #[test]
    fn test_unknown_property_is_unknown_for_every_action() {
        let mut ctx = demo_ctx();
        let name = "not-a-real-property";
        assert_eq!(get_property(&ctx, name), Err(PropertyError::Unknown));
        assert_eq!(
            set_property(&mut ctx, name, Value::Int(1)),
            Err(PropertyError::Unknown)
        );
        assert_eq!(
            set_property_from_str(&mut ctx, name, "1"),
            Err(PropertyError::Unknown)
        );
        assert_eq!(
            switch_property(&mut ctx, name, SwitchStep::new(1.0, false)),
            Err(PropertyError::Unknown)
        );
        assert_eq!(print_property(&ctx, name), Err(PropertyError::Unknown));
        assert_eq!(property_type(&ctx, name), Err(PropertyError::Unknown));
    }

    #[test]
    fn test_percent_pos_round_trip() {
        let mut ctx = demo_ctx();
        set_property(&mut ctx, "percent-pos", Value::Int(50)).unwrap();
        assert_eq!(get_property(&ctx, "percent-pos").unwrap(), Value::Int(50));
        assert_eq!(ctx.position(), 300.0);
    }

    #[test]
    fn test_mute_round_trip() {
        let mut ctx = demo_ctx();
        set_property(&mut ctx, "mute", Value::Flag(true)).unwrap();
        assert_eq!(get_property(&ctx, "mute").unwrap(), Value::Flag(true));
        set_property(&mut ctx, "mute", Value::Flag(false)).unwrap();
        assert_eq!(get_property(&ctx, "mute").unwrap(), Value::Flag(false));
    }

    #[test]
    fn test_ranged_set_clamps() {
        let mut ctx = demo_ctx();
        set_property(&mut ctx, "volume", Value::Float(250.0)).unwrap();
        assert_eq!(get_property(&ctx, "volume").unwrap(), Value::Float(100.0));
        set_property_from_str(&mut ctx, "brightness", "-500").unwrap();
        assert_eq!(get_property(&ctx, "brightness").unwrap(), Value::Int(-100));
    }

    #[test]
    fn test_audio_props_unavailable_without_audio() {
        let mut ctx = demo_ctx();
        ctx.media.as_mut().unwrap().audio = None;
        ctx.select_track(TrackKind::Audio, None);
        assert_eq!(get_property(&ctx, "volume"), Err(PropertyError::Unavailable));
        assert_eq!(
            set_property(&mut ctx, "mute", Value::Flag(true)),
            Err(PropertyError::Unavailable)
        );
    }

    #[test]
    fn test_option_bridge_round_trip() {
        let mut ctx = demo_ctx();
        set_property_from_str(&mut ctx, "framedrop", "hard").unwrap();
        assert_eq!(
            get_property(&ctx, "framedrop").unwrap(),
            Value::Str("hard".into())
        );
        assert!(set_property_from_str(&mut ctx, "framedrop", "soft").is_err());
    }

    #[test]
    fn test_track_switch_cycles_and_disables() {
        let mut ctx = demo_ctx();
        assert_eq!(get_property(&ctx, "audio").unwrap(), Value::Int(0));
        switch_property(&mut ctx, "audio", SwitchStep::new(1.0, false)).unwrap();
        assert_eq!(get_property(&ctx, "audio").unwrap(), Value::Int(1));
        switch_property(&mut ctx, "audio", SwitchStep::new(1.0, false)).unwrap();
        assert_eq!(get_property(&ctx, "audio").unwrap(), Value::Int(-1));
        assert_eq!(print_property(&ctx, "audio").unwrap(), "disabled");
    }

    #[test]
    fn test_chapter_switch_past_end_advances_playlist() {
        let mut ctx = demo_ctx();
        switch_property(&mut ctx, "chapter", SwitchStep::new(1.0, false)).unwrap();
        assert_eq!(ctx.position(), 300.0);
        switch_property(&mut ctx, "chapter", SwitchStep::new(1.0, false)).unwrap();
        assert_eq!(ctx.stop_play, Some(StopReason::NextEntry));
    }

    #[test]
    fn test_metadata_key_access() {
        let ctx = demo_ctx();
        assert_eq!(
            get_property(&ctx, "metadata/title").unwrap(),
            Value::Str("Demo".into())
        );
        assert_eq!(
            get_property(&ctx, "metadata/absent"),
            Err(PropertyError::Unknown)
        );
    }

    #[test]
    fn test_speed_set_flags_audio_reinit() {
        let mut ctx = demo_ctx();
        ctx.af_chain.needs_reinit = false;
        set_property_from_str(&mut ctx, "speed", "1.5").unwrap();
        assert!(ctx.af_chain.needs_reinit);
        assert_eq!(print_property(&ctx, "speed").unwrap(), "x   1.50");
    }

    #[test]
    fn test_expand_string() {
        let ctx = demo_ctx();
        assert_eq!(
            expand_string(&ctx, "now playing: ${media-title} [${fps}]"),
            "now playing: Demo [24.00]"
        );
        // Unknown names vanish rather than leak markup.
        assert_eq!(expand_string(&ctx, "x${nope}y"), "xy");
        assert_eq!(expand_string(&ctx, "dangling ${tail"), "dangling ${tail");
    }

    #[test]
    fn test_switch_choice_cycles() {
        let mut ctx = demo_ctx();
        let cycle = SwitchStep::new(1.0, true);
        switch_property(&mut ctx, "framedrop", cycle).unwrap();
        assert_eq!(ctx.opts.framedrop, crate::options::Framedrop::On);
        switch_property(&mut ctx, "framedrop", cycle).unwrap();
        switch_property(&mut ctx, "framedrop", cycle).unwrap();
        assert_eq!(ctx.opts.framedrop, crate::options::Framedrop::Off);
    }

    #[test]
    fn test_switch_flag_toggles() {
        let mut ctx = demo_ctx();
        switch_property(&mut ctx, "pause", SwitchStep::new(1.0, false)).unwrap();
        assert!(ctx.paused());
        switch_property(&mut ctx, "pause", SwitchStep::new(1.0, false)).unwrap();
        assert!(!ctx.paused());
    }

    #[test]
    fn test_every_bridge_has_an_option_row() {
        // Walking the registry exercises every OptionBacked accessor's
        // table lookup, so a missing row fails here instead of at runtime.
        let ctx = demo_ctx();
        for name in property_names() {
            let _ = property_type(&ctx, name);
        }
    }
}
