//! # Player Options
//!
//! User-tunable playback settings and the option/property bridge.
//!
//! Every option row in [`OPTION_TABLE`] is reachable as a property of the
//! same name through the generic bridge accessor, so options never need
//! per-property glue. Options persist as JSON in the platform config
//! directory.

use crate::property::{PropertyError, PropertyResult, TypeInfo, Value, ValueType};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Enumerated Options
// ============================================================================

pub const FRAMEDROP_CHOICES: &[&str] = &["off", "on", "hard"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framedrop {
    #[default]
    Off,
    On,
    Hard,
}

impl Framedrop {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framedrop::Off => "off",
            Framedrop::On => "on",
            Framedrop::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "off" => Some(Framedrop::Off),
            "on" => Some(Framedrop::On),
            "hard" => Some(Framedrop::Hard),
            _ => None,
        }
    }
}

pub const HR_SEEK_CHOICES: &[&str] = &["off", "absolute", "always"];

/// When to use precise (non-keyframe-limited) seeking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HrSeek {
    Off,
    #[default]
    Absolute,
    Always,
}

impl HrSeek {
    pub fn as_str(&self) -> &'static str {
        match self {
            HrSeek::Off => "off",
            HrSeek::Absolute => "absolute",
            HrSeek::Always => "always",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "off" => Some(HrSeek::Off),
            "absolute" => Some(HrSeek::Absolute),
            "always" => Some(HrSeek::Always),
            _ => None,
        }
    }
}

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// OSD verbosity, 0 (off) to 3 (full status).
    pub osd_level: i64,
    /// OSD message lifetime in milliseconds.
    pub osd_duration_ms: u64,
    /// -1 no loop, 0 loop forever, N loop N additional times.
    pub loop_times: i64,
    pub speed: f64,
    pub fullscreen: bool,
    pub ontop: bool,
    pub border: bool,
    pub framedrop: Framedrop,
    pub vsync: bool,
    pub hr_seek: HrSeek,
    pub deinterlace: bool,
    /// Equalizer-style color controls, -100..=100, 0 neutral.
    pub gamma: i64,
    pub brightness: i64,
    pub contrast: i64,
    pub saturation: i64,
    pub hue: i64,
    pub panscan: f64,
    pub audio_delay: f64,
    pub sub_delay: f64,
    /// Vertical subtitle position, 0 top to 100 bottom.
    pub sub_pos: i64,
    pub sub_visibility: bool,
    pub sub_forced_only: bool,
    pub sub_scale: f64,
    /// Requested edition, -1 selects the demuxer default.
    pub edition_id: i64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            osd_level: 1,
            osd_duration_ms: 1000,
            loop_times: -1,
            speed: 1.0,
            fullscreen: false,
            ontop: false,
            border: true,
            framedrop: Framedrop::Off,
            vsync: false,
            hr_seek: HrSeek::default(),
            deinterlace: false,
            gamma: 0,
            brightness: 0,
            contrast: 0,
            saturation: 0,
            hue: 0,
            panscan: 0.0,
            audio_delay: 0.0,
            sub_delay: 0.0,
            sub_pos: 100,
            sub_visibility: true,
            sub_forced_only: false,
            sub_scale: 1.0,
            edition_id: -1,
        }
    }
}

impl Options {
    /// Load from the default config location, falling back to defaults.
    pub fn load() -> Self {
        match Self::load_from(&config_file_path()) {
            Ok(opts) => opts,
            Err(e) => {
                tracing::debug!("Using default options: {}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &PathBuf) -> Result<Self, String> {
        if !path.exists() {
            return Err(format!("no config at {}", path.display()));
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    pub fn save(&self) -> Result<(), String> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create directory: {}", e))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))
    }
}

fn config_file_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("talon");
    path.push("options.json");
    path
}

// ============================================================================
// Option / Property Bridge Table
// ============================================================================

/// Uniform read/copy/write access to one option field.
///
/// The table is the single source of truth for option names, types and
/// ranges; the generic bridge property delegates here by name.
pub struct OptionAccessor {
    pub name: &'static str,
    pub info: TypeInfo,
    pub get: fn(&Options) -> Value,
    pub set: fn(&mut Options, &Value) -> PropertyResult<()>,
}

fn expect_f64(value: &Value) -> PropertyResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| PropertyError::Failed("expected a numeric value".into()))
}

fn expect_flag(value: &Value) -> PropertyResult<bool> {
    match value {
        Value::Flag(b) => Ok(*b),
        Value::Int(i) => Ok(*i != 0),
        _ => Err(PropertyError::Failed("expected a flag value".into())),
    }
}

fn expect_str(value: &Value) -> PropertyResult<&str> {
    match value {
        Value::Str(s) => Ok(s.as_str()),
        _ => Err(PropertyError::Failed("expected a string value".into())),
    }
}

macro_rules! int_opt {
    ($name:literal, $field:ident, $info:expr) => {
        OptionAccessor {
            name: $name,
            info: $info,
            get: |o| Value::Int(o.$field),
            set: |o, v| {
                o.$field = expect_f64(v)?.round() as i64;
                Ok(())
            },
        }
    };
}

macro_rules! float_opt {
    ($name:literal, $field:ident, $info:expr) => {
        OptionAccessor {
            name: $name,
            info: $info,
            get: |o| Value::Float(o.$field),
            set: |o, v| {
                o.$field = expect_f64(v)?;
                Ok(())
            },
        }
    };
}

macro_rules! flag_opt {
    ($name:literal, $field:ident) => {
        OptionAccessor {
            name: $name,
            info: TypeInfo::ranged(ValueType::Flag, 0.0, 1.0),
            get: |o| Value::Flag(o.$field),
            set: |o, v| {
                o.$field = expect_flag(v)?;
                Ok(())
            },
        }
    };
}

pub static OPTION_TABLE: &[OptionAccessor] = &[
    int_opt!("osd-level", osd_level, TypeInfo::ranged(ValueType::Int, 0.0, 3.0)),
    int_opt!("loop", loop_times, TypeInfo::ranged(ValueType::Int, -1.0, 10000.0)),
    float_opt!("speed", speed, TypeInfo::ranged(ValueType::Float, 0.01, 100.0)),
    flag_opt!("fullscreen", fullscreen),
    flag_opt!("ontop", ontop),
    flag_opt!("border", border),
    OptionAccessor {
        name: "framedrop",
        info: TypeInfo::choice(FRAMEDROP_CHOICES),
        get: |o| Value::Str(o.framedrop.as_str().to_string()),
        set: |o, v| {
            o.framedrop = Framedrop::from_str(expect_str(v)?)
                .ok_or_else(|| PropertyError::Failed("invalid framedrop mode".into()))?;
            Ok(())
        },
    },
    flag_opt!("vsync", vsync),
    OptionAccessor {
        name: "hr-seek",
        info: TypeInfo::choice(HR_SEEK_CHOICES),
        get: |o| Value::Str(o.hr_seek.as_str().to_string()),
        set: |o, v| {
            o.hr_seek = HrSeek::from_str(expect_str(v)?)
                .ok_or_else(|| PropertyError::Failed("invalid hr-seek mode".into()))?;
            Ok(())
        },
    },
    flag_opt!("deinterlace", deinterlace),
    int_opt!("gamma", gamma, TypeInfo::ranged(ValueType::Int, -100.0, 100.0)),
    int_opt!("brightness", brightness, TypeInfo::ranged(ValueType::Int, -100.0, 100.0)),
    int_opt!("contrast", contrast, TypeInfo::ranged(ValueType::Int, -100.0, 100.0)),
    int_opt!("saturation", saturation, TypeInfo::ranged(ValueType::Int, -100.0, 100.0)),
    int_opt!("hue", hue, TypeInfo::ranged(ValueType::Int, -100.0, 100.0)),
    float_opt!("panscan", panscan, TypeInfo::ranged(ValueType::Float, 0.0, 1.0)),
    float_opt!("audio-delay", audio_delay, TypeInfo::ranged(ValueType::Float, -100.0, 100.0)),
    float_opt!("sub-delay", sub_delay, TypeInfo::ranged(ValueType::Float, -100.0, 100.0)),
    int_opt!("sub-pos", sub_pos, TypeInfo::ranged(ValueType::Int, 0.0, 100.0)),
    flag_opt!("sub-visibility", sub_visibility),
    flag_opt!("sub-forced-only", sub_forced_only),
    float_opt!("sub-scale", sub_scale, TypeInfo::ranged(ValueType::Float, 0.0, 100.0)),
    int_opt!("edition", edition_id, TypeInfo::ranged(ValueType::Int, -1.0, 8190.0)),
];

/// Look up an option accessor by name.
pub fn find_option(name: &str) -> Option<&'static OptionAccessor> {
    OPTION_TABLE.iter().find(|o| o.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_lookup() {
        assert!(find_option("speed").is_some());
        assert!(find_option("osd-level").is_some());
        assert!(find_option("no-such-option").is_none());
    }

    #[test]
    fn test_option_set_get_round_trip() {
        let mut opts = Options::default();
        let acc = find_option("brightness").unwrap();
        (acc.set)(&mut opts, &Value::Int(40)).unwrap();
        assert_eq!((acc.get)(&opts), Value::Int(40));
    }

    #[test]
    fn test_choice_option_rejects_bad_value() {
        let mut opts = Options::default();
        let acc = find_option("framedrop").unwrap();
        assert!((acc.set)(&mut opts, &Value::Str("fast".into())).is_err());
        (acc.set)(&mut opts, &Value::Str("hard".into())).unwrap();
        assert_eq!(opts.framedrop, Framedrop::Hard);
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");

        let mut opts = Options::default();
        opts.brightness = 25;
        opts.hr_seek = HrSeek::Always;
        opts.save_to(&path).unwrap();

        let loaded = Options::load_from(&path).unwrap();
        assert_eq!(loaded.brightness, 25);
        assert_eq!(loaded.hr_seek, HrSeek::Always);
    }
}
