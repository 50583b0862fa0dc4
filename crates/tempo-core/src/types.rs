//! Domain enums with stable string encodings.
//!
//! Every enum here is persisted as text (or, for [`HabitStatus`], as a small
//! integer). Strict parsing goes through `FromStr`; values read back from
//! storage go through `from_stored`, which falls back to the default variant
//! instead of failing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The string does not name a known variant.
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    /// Habit statuses are stored as 0, 1 or 2.
    #[error("habit status must be 0, 1 or 2, got {value}")]
    HabitStatusOutOfRange { value: i64 },
}

/// Generates a fieldless enum with a canonical lowercase string form.
macro_rules! define_string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal, default = $default:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// String representation for database storage.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            /// Parses a value read back from storage.
            ///
            /// Unknown strings degrade to the default variant with a warning.
            pub fn from_stored(value: &str) -> Self {
                value.parse().unwrap_or_else(|_| {
                    tracing::warn!(value, kind = $kind, "unknown stored value, using default");
                    Self::default()
                })
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ValidationError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_string_enum!(
    /// Which focus flow the user has selected.
    FocusMode, "focus mode", default = Pomodoro {
        Pomodoro => "pomodoro",
        Timeblock => "timeblock",
    }
);

define_string_enum!(
    /// Current Pomodoro phase.
    Phase, "phase", default = Idle {
        Idle => "idle",
        Focus => "focus",
        Break => "break",
        LongBreak => "long_break",
    }
);

define_string_enum!(
    /// Kind of interval recorded in the focus session log.
    SessionType, "session type", default = Focus {
        Focus => "focus",
        Break => "break",
        LongBreak => "long_break",
    }
);

define_string_enum!(
    /// A habit's status for one day.
    HabitStatus, "habit status", default = Missed {
        Missed => "missed",
        Partial => "partial",
        Done => "done",
    }
);

impl Phase {
    /// The session log type for a running phase. `None` for idle.
    #[must_use]
    pub const fn session_type(self) -> Option<SessionType> {
        match self {
            Self::Idle => None,
            Self::Focus => Some(SessionType::Focus),
            Self::Break => Some(SessionType::Break),
            Self::LongBreak => Some(SessionType::LongBreak),
        }
    }
}

impl From<SessionType> for Phase {
    fn from(session_type: SessionType) -> Self {
        match session_type {
            SessionType::Focus => Self::Focus,
            SessionType::Break => Self::Break,
            SessionType::LongBreak => Self::LongBreak,
        }
    }
}

impl HabitStatus {
    /// Integer form used in `habit_logs.status`.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Missed => 0,
            Self::Partial => 1,
            Self::Done => 2,
        }
    }

    /// Points a day with this status is worth.
    #[must_use]
    pub const fn points(self) -> i64 {
        match self {
            Self::Missed => 0,
            Self::Partial => 1,
            Self::Done => 2,
        }
    }

    /// Lenient integer decoding for stored rows.
    pub fn from_stored_i64(value: i64) -> Self {
        Self::try_from(value).unwrap_or_else(|_| {
            tracing::warn!(value, "habit status out of range, treating as missed");
            Self::Missed
        })
    }
}

impl TryFrom<i64> for HabitStatus {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Missed),
            1 => Ok(Self::Partial),
            2 => Ok(Self::Done),
            _ => Err(ValidationError::HabitStatusOutOfRange { value }),
        }
    }
}

impl From<HabitStatus> for i64 {
    fn from(status: HabitStatus) -> Self {
        status.as_i64()
    }
}
