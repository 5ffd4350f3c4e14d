//! Timezone resolution and UTC conversion for iCalendar date-times.
//!
//! Uses ICU4X for Windows timezone ID to IANA mapping and timezone canonicalization.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone as _, Utc};
use chrono_tz::Tz;
use icu::time::zone::WindowsParser;
use icu::time::zone::iana::IanaParserExtended;

use super::vtimezone::VTimezone;
use crate::rfc::ical::core::UtcOffset;

/// Error during timezone resolution or conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// Unknown or invalid timezone identifier.
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// Malformed fixed-offset identifier such as `UTC+25:00`.
    #[error("Invalid UTC offset: {0}")]
    InvalidOffset(String),

    /// The conversion left the representable date range.
    #[error("Invalid datetime: {0}")]
    InvalidDateTime(String),

    /// A DATE was compared against a DATE-TIME.
    #[error("Values cannot be compared: {0}")]
    Incomparable(String),
}

/// A change of UTC offset at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// First instant at which `offset_after` applies.
    pub at: DateTime<Utc>,
    /// Offset in effect just before the transition.
    pub offset_before: UtcOffset,
    /// Offset in effect from the transition on.
    pub offset_after: UtcOffset,
    /// Abbreviation of the new observance, when known.
    pub name: Option<String>,
}

/// A resolved time zone.
#[derive(Debug, Clone)]
pub enum TimeZone {
    /// Constant offset with no transitions (`UTC`, `UTC+01:00`).
    Fixed {
        /// The identifier the zone was resolved from.
        name: String,
        /// The constant offset.
        offset: UtcOffset,
    },
    /// Zone from the IANA database.
    Iana(Tz),
    /// Zone defined by a VTIMEZONE component registered with the resolver.
    Custom(Arc<VTimezone>),
}

impl TimeZone {
    /// Returns the zone identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Fixed { name, .. } => name,
            Self::Iana(tz) => tz.name(),
            Self::Custom(vtimezone) => vtimezone.tzid(),
        }
    }

    /// Returns the offset in effect at an instant.
    #[must_use]
    pub fn offset_at(&self, instant: DateTime<Utc>) -> UtcOffset {
        match self {
            Self::Fixed { offset, .. } => *offset,
            Self::Iana(tz) => {
                let fixed = tz.offset_from_utc_datetime(&instant.naive_utc()).fix();
                UtcOffset::from_seconds(fixed.local_minus_utc()).unwrap_or(UtcOffset::UTC)
            }
            Self::Custom(vtimezone) => vtimezone.offset_at(instant),
        }
    }

    /// Returns the wall-clock reading of an instant in this zone.
    #[must_use]
    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        let utc = instant.naive_utc();
        utc.checked_add_signed(self.offset_at(instant).as_delta())
            .unwrap_or(utc)
    }

    /// ## Summary
    /// Converts a wall-clock reading in this zone to a UTC instant.
    ///
    /// Follows RFC 5545 §3.3.5: a reading inside a DST gap is interpreted
    /// with the offset in effect before the gap, and a reading inside a fold
    /// takes the first of its two instants.
    ///
    /// ## Errors
    /// Returns `ConversionError::InvalidDateTime` if the result leaves the
    /// representable range.
    pub fn to_utc(&self, local: NaiveDateTime) -> Result<DateTime<Utc>, ConversionError> {
        match self {
            Self::Fixed { offset, .. } => shift_by_offset(local, *offset),
            Self::Iana(tz) => match tz.from_local_datetime(&local) {
                LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
                LocalResult::Ambiguous(first, second) => {
                    Ok(first.with_timezone(&Utc).min(second.with_timezone(&Utc)))
                }
                LocalResult::None => {
                    let before = local
                        .checked_sub_signed(TimeDelta::days(1))
                        .ok_or_else(|| ConversionError::InvalidDateTime(local.to_string()))?;
                    shift_by_offset(local, self.offset_at(before.and_utc()))
                }
            },
            Self::Custom(vtimezone) => vtimezone.to_utc(local),
        }
    }

    /// Returns the offset changes with `start <= at < end`, in order.
    #[must_use]
    pub fn transitions(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Transition> {
        match self {
            Self::Fixed { .. } => Vec::new(),
            Self::Iana(_) => self.scan_transitions(start, end),
            Self::Custom(vtimezone) => vtimezone.transitions(start, end),
        }
    }

    /// Returns the largest offset in effect anywhere in `[start, end)`.
    #[must_use]
    pub fn max_offset(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> UtcOffset {
        self.transitions(start, end)
            .iter()
            .map(|transition| transition.offset_after)
            .fold(self.offset_at(start), UtcOffset::max)
    }

    /// Finds offset changes by probing once a day and bisecting each change
    /// down to the second.
    fn scan_transitions(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Transition> {
        let mut transitions = Vec::new();
        let mut probe = start;
        let mut offset = self.offset_at(start);

        while probe < end {
            let next = probe
                .checked_add_signed(TimeDelta::days(1))
                .map_or(end, |next| next.min(end));
            let next_offset = self.offset_at(next);
            if next_offset != offset {
                let (mut lo, mut hi) = (probe.timestamp(), next.timestamp());
                while hi - lo > 1 {
                    let mid = lo + (hi - lo) / 2;
                    let at_mid = DateTime::from_timestamp(mid, 0).unwrap_or(next);
                    if self.offset_at(at_mid) == offset {
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
                let at = DateTime::from_timestamp(hi, 0).unwrap_or(next);
                if at < end {
                    transitions.push(Transition {
                        at,
                        offset_before: offset,
                        offset_after: self.offset_at(at),
                        name: None,
                    });
                }
                offset = next_offset;
            }
            probe = next;
        }

        transitions
    }
}

/// Converts a wall-clock reading to UTC using a known offset.
pub(crate) fn shift_by_offset(
    local: NaiveDateTime,
    offset: UtcOffset,
) -> Result<DateTime<Utc>, ConversionError> {
    local
        .checked_sub_signed(offset.as_delta())
        .map(|utc| utc.and_utc())
        .ok_or_else(|| ConversionError::InvalidDateTime(format!("{local} at offset {offset}")))
}

/// Resolver for timezone identifiers.
///
/// Holds the custom zones registered from VTIMEZONE components and caches
/// IANA lookups. Registration needs `&mut self`; once populated the resolver
/// can be shared read-only across threads.
#[derive(Debug, Default)]
pub struct TimeZoneResolver {
    /// Registered VTIMEZONE definitions by TZID.
    vtimezones: HashMap<String, Arc<VTimezone>>,
    /// Cache of resolved IANA timezones by TZID.
    cache: RwLock<HashMap<String, Tz>>,
}

impl TimeZoneResolver {
    /// Creates a new timezone resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Registers a VTIMEZONE definition for use by this resolver.
    ///
    /// A registered TZID takes precedence over the IANA database, which lets
    /// custom or proprietary zones shadow system names.
    pub fn register_vtimezone(&mut self, vtimezone: VTimezone) {
        tracing::trace!(tzid = vtimezone.tzid(), "Registering VTIMEZONE");
        self.vtimezones
            .insert(vtimezone.tzid().to_string(), Arc::new(vtimezone));
    }

    /// ## Summary
    /// Returns the registered VTIMEZONE for a TZID, if any.
    #[must_use]
    pub fn get_vtimezone(&self, tzid: &str) -> Option<&VTimezone> {
        self.vtimezones.get(tzid).map(AsRef::as_ref)
    }

    /// ## Summary
    /// Checks if a TZID has a registered VTIMEZONE.
    #[must_use]
    pub fn has_vtimezone(&self, tzid: &str) -> bool {
        self.vtimezones.contains_key(tzid)
    }

    /// ## Summary
    /// Resolves a timezone identifier.
    ///
    /// Identifier shapes are tried in order: the literal `UTC`, a fixed
    /// offset `UTC±HH:MM`, a registered VTIMEZONE, then the IANA database
    /// (directly, and again after normalizing vendor prefixes, Windows names
    /// and aliases).
    ///
    /// ## Errors
    ///
    /// Returns `ConversionError::InvalidOffset` for a malformed fixed offset
    /// and `ConversionError::UnknownTimezone` if the TZID cannot be resolved.
    ///
    /// ## Side Effects
    ///
    /// Caches successful IANA resolutions to avoid repeated normalization.
    pub fn resolve(&self, tzid: &str) -> Result<TimeZone, ConversionError> {
        let trimmed = tzid.trim();

        if trimmed.eq_ignore_ascii_case("UTC") {
            return Ok(TimeZone::Fixed {
                name: "UTC".to_string(),
                offset: UtcOffset::UTC,
            });
        }

        if let Some(rest) = trimmed
            .get(..3)
            .filter(|prefix| prefix.eq_ignore_ascii_case("UTC"))
            .and_then(|_| trimmed.get(3..))
            .filter(|rest| rest.starts_with('+') || rest.starts_with('-'))
        {
            let offset = parse_fixed_offset(rest)
                .ok_or_else(|| ConversionError::InvalidOffset(tzid.to_string()))?;
            tracing::trace!(tzid, %offset, "Resolved fixed-offset timezone");
            return Ok(TimeZone::Fixed {
                name: trimmed.to_string(),
                offset,
            });
        }

        if let Some(vtimezone) = self.vtimezones.get(trimmed) {
            tracing::trace!(tzid, "Resolved registered VTIMEZONE");
            return Ok(TimeZone::Custom(Arc::clone(vtimezone)));
        }

        if let Some(tz) = self
            .cache
            .read()
            .ok()
            .and_then(|cache| cache.get(trimmed).copied())
        {
            return Ok(TimeZone::Iana(tz));
        }

        let tz = Tz::from_str(trimmed)
            .or_else(|_e| Tz::from_str(&normalize_tzid(trimmed)))
            .map_err(|_e| ConversionError::UnknownTimezone(tzid.to_string()))?;
        tracing::trace!(tzid, resolved = tz.name(), "Resolved IANA timezone");

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(trimmed.to_string(), tz);
        }

        Ok(TimeZone::Iana(tz))
    }
}

/// Parses the `±HH:MM` tail of a fixed-offset identifier. `±HHMM` and `±HH`
/// are accepted too.
fn parse_fixed_offset(s: &str) -> Option<UtcOffset> {
    let negative = s.starts_with('-');
    let body = s.get(1..)?;
    let (hours, minutes) = match body.split_once(':') {
        Some((hours, minutes)) => (hours, minutes),
        None if body.len() == 4 => (body.get(..2)?, body.get(2..)?),
        None => (body, "0"),
    };
    if hours.is_empty()
        || hours.len() > 2
        || minutes.len() > 2
        || !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let hours: u8 = hours.parse().ok()?;
    if hours > 23 {
        return None;
    }
    UtcOffset::from_hours_minutes(negative, hours, minutes.parse().ok()?)
}

/// Normalizes common CalDAV/iCalendar timezone identifiers to IANA names.
///
/// Uses ICU4X for Windows timezone ID mapping and IANA canonicalization.
/// Many calendar clients use non-standard TZID values that need to be
/// mapped to standard IANA timezone names.
fn normalize_tzid(tzid: &str) -> String {
    // Strip common prefixes
    let stripped = tzid
        .strip_prefix("/mozilla.org/")
        .or_else(|| tzid.strip_prefix("/softwarestudio.org/"))
        .unwrap_or(tzid);

    // Try Windows timezone mapping first using ICU
    let windows_parser = WindowsParser::new();
    if let Some(tz) = windows_parser.parse(stripped, None) {
        // Get the canonical IANA name from the BCP-47 timezone ID
        let iana_parser = IanaParserExtended::new();
        for entry in iana_parser.iter() {
            if entry.time_zone == tz {
                return entry.canonical.to_string();
            }
        }
    }

    // Canonicalize IANA aliases (Europe/Kiev -> Europe/Kyiv)
    let iana_parser = IanaParserExtended::new();
    let parsed = iana_parser.parse(stripped);
    if parsed.time_zone != icu::time::TimeZone::UNKNOWN {
        return parsed.canonical.to_string();
    }

    // Return as-is if not recognized
    stripped.to_string()
}
