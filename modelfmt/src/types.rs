use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// How aggressively a raw model identifier is reduced to a display name.
///
/// Every stage includes the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SplitLevel {
    /// Trimmed input, untouched.
    Identity = 0,
    /// Drop everything up to and including the first `" - "`.
    Provider = 1,
    /// Also drop a vendor segment (`org/`), or a second `" - "` prefix.
    Vendor = 2,
    /// Also strip trailing date, size and keyword tags.
    #[default]
    Suffixes = 3,
}

impl SplitLevel {
    pub const MIN: i64 = 0;
    pub const MAX: i64 = 3;

    pub const ALL: [SplitLevel; 4] = [
        SplitLevel::Identity,
        SplitLevel::Provider,
        SplitLevel::Vendor,
        SplitLevel::Suffixes,
    ];

    /// Clamp an arbitrary integer into `[0, 3]`.
    pub fn clamped(n: i64) -> Self {
        match n.clamp(Self::MIN, Self::MAX) {
            0 => SplitLevel::Identity,
            1 => SplitLevel::Provider,
            2 => SplitLevel::Vendor,
            _ => SplitLevel::Suffixes,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SplitLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Coerce a stored settings value into a split level.
///
/// Integers are clamped, floats truncated then clamped, numeric strings parsed
/// the same way. Anything else (bools, null, garbage text) yields the default.
pub fn clamp_split_level(value: &serde_json::Value) -> SplitLevel {
    match value {
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => SplitLevel::clamped(i),
            None => n.as_f64().map(clamp_float).unwrap_or_default(),
        },
        serde_json::Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                SplitLevel::clamped(i)
            } else if let Ok(f) = s.parse::<f64>() {
                clamp_float(f)
            } else {
                SplitLevel::default()
            }
        }
        _ => SplitLevel::default(),
    }
}

fn clamp_float(f: f64) -> SplitLevel {
    if f.is_finite() {
        SplitLevel::clamped(f.trunc() as i64)
    } else {
        SplitLevel::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseSplitLevelError {
    #[error("split level must be an integer, got {0:?}")]
    NotANumber(String),

    #[error("split level {0} is out of range (expected 0-3)")]
    OutOfRange(i64),
}

impl FromStr for SplitLevel {
    type Err = ParseSplitLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: i64 = s
            .trim()
            .parse()
            .map_err(|_| ParseSplitLevelError::NotANumber(s.to_string()))?;
        if !(Self::MIN..=Self::MAX).contains(&n) {
            return Err(ParseSplitLevelError::OutOfRange(n));
        }
        Ok(SplitLevel::clamped(n))
    }
}

impl Serialize for SplitLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for SplitLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(clamp_split_level(&value))
    }
}
