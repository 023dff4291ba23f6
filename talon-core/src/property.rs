//! # Property Layer
//!
//! Generic machinery for named, typed access to player state.
//!
//! A property is a string-keyed accessor over the [`PlayerContext`]
//! implementing a fixed operation set: get, set, print, switch, type query,
//! and sub-key access. Concrete properties live in `properties.rs`; this
//! module provides the trait, the value model, the error taxonomy, and the
//! lookup/dispatch helpers shared by every accessor.

use crate::context::PlayerContext;
use thiserror::Error;

// ============================================================================
// Error Taxonomy
// ============================================================================

/// Why a property operation did not complete.
///
/// All variants are non-fatal: callers log and move on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// No property registered under the requested name.
    #[error("unknown property")]
    Unknown,
    /// The property exists but does not support the requested operation.
    #[error("operation not implemented")]
    NotImplemented,
    /// The backing resource is currently absent (no file loaded, no audio
    /// stream, etc.).
    #[error("property unavailable")]
    Unavailable,
    /// The operation was attempted and failed.
    #[error("operation failed: {0}")]
    Failed(String),
}

impl PropertyError {
    /// Stable answer code used on the terminal answer channel.
    pub fn answer_code(&self) -> &'static str {
        match self {
            PropertyError::Unknown => "PROPERTY_UNKNOWN",
            PropertyError::NotImplemented => "NOT_IMPLEMENTED",
            PropertyError::Unavailable => "PROPERTY_UNAVAILABLE",
            PropertyError::Failed(_) => "ERROR",
        }
    }
}

pub type PropertyResult<T> = Result<T, PropertyError>;

// ============================================================================
// Value Model
// ============================================================================

/// A property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Flag(bool),
    Int(i64),
    Float(f64),
    /// Seconds. Distinct from `Float` so printing can use H:MM:SS form.
    Time(f64),
    Str(String),
    StrList(Vec<String>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Flag(_) => ValueType::Flag,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Time(_) => ValueType::Time,
            Value::Str(_) => ValueType::Str,
            Value::StrList(_) => ValueType::StrList,
        }
    }

    /// Numeric view, for range clamping and switch stepping.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Flag(b) => Some(*b as i64 as f64),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) | Value::Time(f) => Some(*f),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Flag,
    Int,
    Float,
    Time,
    Str,
    StrList,
}

/// Type metadata reported by the type query.
///
/// `range` bounds are inclusive and expressed as `f64` regardless of the
/// value type. `choices` constrains string-typed properties to a fixed set.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    pub value_type: ValueType,
    pub range: Option<(f64, f64)>,
    pub choices: Option<&'static [&'static str]>,
}

impl TypeInfo {
    pub const fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            range: None,
            choices: None,
        }
    }

    pub const fn ranged(value_type: ValueType, min: f64, max: f64) -> Self {
        Self {
            value_type,
            range: Some((min, max)),
            choices: None,
        }
    }

    pub const fn choice(choices: &'static [&'static str]) -> Self {
        Self {
            value_type: ValueType::Str,
            range: None,
            choices: Some(choices),
        }
    }

    /// Clamp a numeric value into the declared range. Non-numeric values and
    /// unbounded types pass through untouched.
    pub fn clamp(&self, value: Value) -> Value {
        let Some((min, max)) = self.range else {
            return value;
        };
        match value {
            Value::Int(i) => Value::Int((i as f64).clamp(min, max) as i64),
            Value::Float(f) => Value::Float(f.clamp(min, max)),
            Value::Time(t) => Value::Time(t.clamp(min, max)),
            other => other,
        }
    }

    /// Parse a string into a value of this type. Used by the string SET path
    /// (IPC, command shell). Range clamping happens separately.
    pub fn parse(&self, s: &str) -> PropertyResult<Value> {
        let s = s.trim();
        match self.value_type {
            ValueType::Flag => match s {
                "yes" | "true" | "on" | "1" => Ok(Value::Flag(true)),
                "no" | "false" | "off" | "0" => Ok(Value::Flag(false)),
                _ => Err(PropertyError::Failed(format!("not a flag value: '{s}'"))),
            },
            ValueType::Int => s
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| PropertyError::Failed(format!("not an integer: {e}"))),
            ValueType::Float => s
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| PropertyError::Failed(format!("not a number: {e}"))),
            ValueType::Time => s
                .parse::<f64>()
                .map(Value::Time)
                .map_err(|e| PropertyError::Failed(format!("not a time: {e}"))),
            ValueType::Str => {
                if let Some(choices) = self.choices {
                    if !choices.contains(&s) {
                        return Err(PropertyError::Failed(format!(
                            "invalid choice '{s}' (expected one of {choices:?})"
                        )));
                    }
                }
                Ok(Value::Str(s.to_string()))
            }
            ValueType::StrList => Ok(Value::StrList(
                s.split(',').map(|p| p.trim().to_string()).collect(),
            )),
        }
    }
}

/// Payload of the switch operation (the `add` / `cycle` commands).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchStep {
    /// Step amount; sign selects direction.
    pub amount: f64,
    /// Wrap around range bounds instead of clamping.
    pub wrap: bool,
}

impl SwitchStep {
    pub fn new(amount: f64, wrap: bool) -> Self {
        Self { amount, wrap }
    }
}

// ============================================================================
// Property Trait
// ============================================================================

/// One named piece of player state.
///
/// Implementations are stateless unit structs registered in the property
/// table; all mutable state lives in the [`PlayerContext`] threaded through
/// every call. Operations must not block.
///
/// `print` and `switch` have generic fallbacks so most accessors only
/// implement `type_info`, `get` and (for writable properties) `set`.
pub trait Property: Send + Sync {
    fn type_info(&self, ctx: &PlayerContext) -> PropertyResult<TypeInfo>;

    fn get(&self, _ctx: &PlayerContext) -> PropertyResult<Value> {
        Err(PropertyError::NotImplemented)
    }

    fn set(&self, _ctx: &mut PlayerContext, _value: Value) -> PropertyResult<()> {
        Err(PropertyError::NotImplemented)
    }

    /// Human-readable rendering for OSD and terminal output.
    fn print(&self, ctx: &PlayerContext) -> PropertyResult<String> {
        Ok(format_value(&self.get(ctx)?))
    }

    /// Step the value. Flags toggle; numeric values step by `amount`,
    /// clamping to the declared range or wrapping when requested; choice
    /// strings walk the choice list.
    fn switch(&self, ctx: &mut PlayerContext, step: SwitchStep) -> PropertyResult<()> {
        let info = self.type_info(ctx)?;
        let current = self.get(ctx)?;
        let next = match current {
            Value::Flag(b) => Value::Flag(!b),
            Value::Int(i) => Value::Int(step_number(i as f64, step, &info).round() as i64),
            Value::Float(f) => Value::Float(step_number(f, step, &info)),
            Value::Time(t) => Value::Time(step_number(t, step, &info)),
            Value::Str(s) => {
                let Some(choices) = info.choices else {
                    return Err(PropertyError::NotImplemented);
                };
                Value::Str(step_choice(choices, &s, step).to_string())
            }
            _ => return Err(PropertyError::NotImplemented),
        };
        self.set(ctx, next)
    }

    /// Sub-key access (`metadata/<key>` style names).
    fn get_key(&self, _ctx: &PlayerContext, _key: &str) -> PropertyResult<Value> {
        Err(PropertyError::NotImplemented)
    }
}

fn step_choice<'a>(choices: &[&'a str], current: &str, step: SwitchStep) -> &'a str {
    let len = choices.len() as i64;
    let pos = choices.iter().position(|&c| c == current).unwrap_or(0) as i64;
    let next = pos + step.amount.round() as i64;
    let next = if step.wrap {
        next.rem_euclid(len)
    } else {
        next.clamp(0, len - 1)
    };
    choices[next as usize]
}

fn step_number(current: f64, step: SwitchStep, info: &TypeInfo) -> f64 {
    let next = current + step.amount;
    match info.range {
        Some((min, max)) if step.wrap => {
            let span = max - min + 1.0;
            let mut v = next;
            while v > max {
                v -= span;
            }
            while v < min {
                v += span;
            }
            v
        }
        Some((min, max)) => next.clamp(min, max),
        None => next,
    }
}

/// Default value rendering used by the `print` fallback.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Flag(true) => "yes".to_string(),
        Value::Flag(false) => "no".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format!("{f:.2}"),
        Value::Time(t) => format_time(*t),
        Value::Str(s) => s.clone(),
        Value::StrList(list) => list.join(", "),
    }
}

/// `H:MM:SS` rendering, hours unpadded.
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

// ============================================================================
// Registry Lookup
// ============================================================================

/// One row of the property table.
pub struct PropertyEntry {
    pub name: &'static str,
    pub accessor: Box<dyn Property>,
}

impl PropertyEntry {
    pub fn new(name: &'static str, accessor: Box<dyn Property>) -> Self {
        Self { name, accessor }
    }
}

/// Locate an accessor by exact, case-sensitive name.
pub fn find<'a>(list: &'a [PropertyEntry], name: &str) -> Option<&'a PropertyEntry> {
    list.iter().find(|e| e.name == name)
}

/// Split a `base/key` name into its base property and sub-key.
pub fn split_key(name: &str) -> Option<(&str, &str)> {
    name.split_once('/').filter(|(base, key)| !base.is_empty() && !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag_values() {
        let info = TypeInfo::new(ValueType::Flag);
        assert_eq!(info.parse("yes").unwrap(), Value::Flag(true));
        assert_eq!(info.parse("0").unwrap(), Value::Flag(false));
        assert!(info.parse("maybe").is_err());
    }

    #[test]
    fn test_clamp_into_range() {
        let info = TypeInfo::ranged(ValueType::Int, 0.0, 100.0);
        assert_eq!(info.clamp(Value::Int(150)), Value::Int(100));
        assert_eq!(info.clamp(Value::Int(-3)), Value::Int(0));
        assert_eq!(info.clamp(Value::Int(42)), Value::Int(42));
    }

    #[test]
    fn test_choice_parse() {
        let info = TypeInfo::choice(&["off", "on", "hard"]);
        assert_eq!(info.parse("hard").unwrap(), Value::Str("hard".into()));
        assert!(info.parse("soft").is_err());
    }

    #[test]
    fn test_step_wraps_and_clamps() {
        let info = TypeInfo::ranged(ValueType::Int, 0.0, 3.0);
        let wrap = SwitchStep::new(1.0, true);
        assert_eq!(step_number(3.0, wrap, &info), 0.0);
        let clamp = SwitchStep::new(5.0, false);
        assert_eq!(step_number(2.0, clamp, &info), 3.0);
    }

    #[test]
    fn test_step_choice() {
        let choices = &["off", "on", "hard"];
        let cycle = SwitchStep::new(1.0, true);
        assert_eq!(step_choice(choices, "off", cycle), "on");
        assert_eq!(step_choice(choices, "hard", cycle), "off");
        let add = SwitchStep::new(1.0, false);
        assert_eq!(step_choice(choices, "hard", add), "hard");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00:00");
        assert_eq!(format_time(3671.4), "1:01:11");
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("metadata/title"), Some(("metadata", "title")));
        assert_eq!(split_key("volume"), None);
        assert_eq!(split_key("/title"), None);
    }
}
