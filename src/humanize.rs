//! Human-readable byte sizes for upload limits ("10MB", "1.5GiB", 4096).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty size")]
    Empty,

    #[error("invalid size '{0}'")]
    InvalidNumber(String),

    #[error("unknown size unit '{0}'")]
    InvalidUnit(String),

    #[error("size '{0}' does not fit in 64 bits")]
    Overflow(String),
}

const KIB: u64 = 1024;

/// Binary units only; `MB` and `MiB` both mean 1024 * 1024.
const UNITS: &[(&str, u64)] = &[
    ("TB", KIB * KIB * KIB * KIB),
    ("GB", KIB * KIB * KIB),
    ("MB", KIB * KIB),
    ("KB", KIB),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub const fn kib(n: u64) -> Self {
        Self(n * KIB)
    }

    pub const fn mib(n: u64) -> Self {
        Self(n * KIB * KIB)
    }

    pub const fn gib(n: u64) -> Self {
        Self(n * KIB * KIB * KIB)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

fn multiplier(unit: &str) -> Option<u64> {
    match unit {
        "" | "B" => Some(1),
        "K" | "KB" | "KIB" => Some(KIB),
        "M" | "MB" | "MIB" => Some(KIB * KIB),
        "G" | "GB" | "GIB" => Some(KIB * KIB * KIB),
        "T" | "TB" | "TIB" => Some(KIB * KIB * KIB * KIB),
        _ => None,
    }
}

impl FromStr for ByteSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(ParseError::Empty);
        }

        let split = raw
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(raw.len());
        let (number, unit) = raw.split_at(split);
        let unit = unit.trim().to_ascii_uppercase();

        let scale = multiplier(&unit).ok_or_else(|| ParseError::InvalidUnit(unit.clone()))?;

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(ParseError::InvalidNumber(raw.to_string()));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| ParseError::InvalidNumber(raw.to_string()))?
        };

        let mut bytes = whole
            .checked_mul(scale)
            .ok_or_else(|| ParseError::Overflow(raw.to_string()))?;

        // Fractions are truncated to whole bytes.
        if !fraction.is_empty() {
            let digits: u32 = fraction
                .len()
                .try_into()
                .map_err(|_| ParseError::InvalidNumber(raw.to_string()))?;
            let numerator: u64 = fraction
                .parse()
                .map_err(|_| ParseError::InvalidNumber(raw.to_string()))?;
            let denominator = 10u64
                .checked_pow(digits)
                .ok_or_else(|| ParseError::InvalidNumber(raw.to_string()))?;
            let extra = (u128::from(numerator) * u128::from(scale)) / u128::from(denominator);
            bytes = u64::try_from(extra)
                .ok()
                .and_then(|extra| bytes.checked_add(extra))
                .ok_or_else(|| ParseError::Overflow(raw.to_string()))?;
        }

        Ok(ByteSize(bytes))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &(unit, size) in UNITS {
            if self.0 >= size {
                let tenths = self.0 % size * 10 / size;
                return if tenths == 0 {
                    write!(f, "{}{unit}", self.0 / size)
                } else {
                    write!(f, "{}.{tenths}{unit}", self.0 / size)
                };
            }
        }
        write!(f, "{}B", self.0)
    }
}

impl From<ByteSize> for String {
    fn from(size: ByteSize) -> Self {
        size.to_string()
    }
}

impl From<u64> for ByteSize {
    fn from(bytes: u64) -> Self {
        ByteSize(bytes)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = ByteSize;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a byte count or a size string such as \"10MB\"")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(ByteSize(v))
            }

            // TOML and environment sources hand integers over as i64.
            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(ByteSize)
                    .map_err(|_| E::custom(format!("size must not be negative, got {v}")))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}
