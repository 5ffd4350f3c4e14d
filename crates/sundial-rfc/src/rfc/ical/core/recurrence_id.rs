//! RECURRENCE-ID property value (RFC 5545 §3.8.4.4).

use std::fmt;

use super::DateTime;

/// RANGE parameter of a RECURRENCE-ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecurrenceRange {
    /// Only the identified instance is overridden.
    #[default]
    ThisInstance,
    /// The identified instance and every later one are overridden.
    ThisAndFuture,
}

impl RecurrenceRange {
    /// Parses a RANGE parameter value. Unrecognized values mean `ThisInstance`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("THISANDFUTURE") {
            Self::ThisAndFuture
        } else {
            Self::ThisInstance
        }
    }

    /// Returns the parameter value, empty for the default range.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ThisInstance => "",
            Self::ThisAndFuture => "THISANDFUTURE",
        }
    }
}

/// Identifies the instance of a recurring master that an override replaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecurrenceId {
    value: DateTime,
    range: RecurrenceRange,
}

impl RecurrenceId {
    /// Creates a RECURRENCE-ID for a single instance.
    #[must_use]
    pub const fn new(value: DateTime) -> Self {
        Self {
            value,
            range: RecurrenceRange::ThisInstance,
        }
    }

    /// Creates a RECURRENCE-ID with an explicit range.
    #[must_use]
    pub const fn with_range(value: DateTime, range: RecurrenceRange) -> Self {
        Self { value, range }
    }

    /// Returns the original start of the overridden instance.
    #[must_use]
    pub const fn value(&self) -> &DateTime {
        &self.value
    }

    /// Returns the range of the override.
    #[must_use]
    pub const fn range(&self) -> RecurrenceRange {
        self.range
    }

    /// Returns the overridden instance when only that single instance is
    /// replaced, and `None` for a `ThisAndFuture` override.
    #[must_use]
    pub const fn this_instance(&self) -> Option<&DateTime> {
        match self.range {
            RecurrenceRange::ThisInstance => Some(&self.value),
            RecurrenceRange::ThisAndFuture => None,
        }
    }
}

impl fmt::Display for RecurrenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.range {
            RecurrenceRange::ThisInstance => write!(f, "{}", self.value),
            RecurrenceRange::ThisAndFuture => {
                write!(f, "RANGE={}:{}", self.range.as_str(), self.value)
            }
        }
    }
}
