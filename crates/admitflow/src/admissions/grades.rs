use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Six-letter grade scale used across student results and course requirements.
///
/// Serializes as the bare letter so stored documents stay human-readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Grade {
    /// Ordinal strength of the grade. A is strongest.
    pub const fn rank(self) -> u8 {
        match self {
            Grade::A => 6,
            Grade::B => 5,
            Grade::C => 4,
            Grade::D => 3,
            Grade::E => 2,
            Grade::F => 1,
        }
    }

    pub const fn letter(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
        }
    }

    /// True when this grade is at least as strong as `required`.
    pub const fn meets_or_exceeds(self, required: Grade) -> bool {
        self.rank() >= required.rank()
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

impl FromStr for Grade {
    type Err = InvalidGrade;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "E" => Ok(Grade::E),
            "F" => Ok(Grade::F),
            _ => Err(InvalidGrade(value.to_string())),
        }
    }
}

/// Raised when a stored or submitted grade symbol is outside the A-F scale.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized grade symbol '{0}'")]
pub struct InvalidGrade(pub String);
