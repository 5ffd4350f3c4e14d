//! Custom time zones defined by VTIMEZONE components (RFC 5545 §3.6.5).
//!
//! Offsets are derived by expanding each observance's onsets with the rule
//! evaluator, so any RRULE an observance carries is honored.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

use super::rrule::RuleIter;
use super::timezone::{ConversionError, TimeZoneResolver, Transition, shift_by_offset};
use crate::rfc::ical::core::{
    DateTime as ICalDateTime, DateTimeForm, RRuleUntil, RecurrencePattern, Termination, UtcOffset,
};

/// How far back a lookup first searches for the latest onset of a rule.
/// Observance rules in the wild are yearly, so two years always cover one.
const RECENT_ONSET_WINDOW_DAYS: i64 = 2 * 366;

/// Kind of timezone observance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservanceKind {
    /// Standard time (e.g., EST, GMT).
    Standard,
    /// Daylight saving time (e.g., EDT, BST).
    Daylight,
}

impl ObservanceKind {
    /// Returns the string name for this observance kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Daylight => "DAYLIGHT",
        }
    }
}

impl fmt::Display for ObservanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A timezone observance rule (STANDARD or DAYLIGHT).
///
/// Represents when a particular offset takes effect. Onsets are local
/// wall-clock times read in `offset_from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observance {
    /// Type of observance (Standard or Daylight).
    pub kind: ObservanceKind,
    /// First onset of this observance (local time).
    pub dtstart: NaiveDateTime,
    /// The offset from UTC before this observance takes effect.
    pub offset_from: UtcOffset,
    /// The offset from UTC when this observance is in effect.
    pub offset_to: UtcOffset,
    /// Recurrence rule for later onsets (if any).
    pub rrule: Option<RecurrencePattern>,
    /// Additional onsets (local time).
    pub rdates: Vec<NaiveDateTime>,
    /// Timezone name abbreviation (e.g., "EST", "EDT").
    pub name: Option<String>,
}

impl Observance {
    /// Creates an observance with a single onset.
    #[must_use]
    pub const fn new(
        kind: ObservanceKind,
        dtstart: NaiveDateTime,
        offset_from: UtcOffset,
        offset_to: UtcOffset,
    ) -> Self {
        Self {
            kind,
            dtstart,
            offset_from,
            offset_to,
            rrule: None,
            rdates: Vec::new(),
            name: None,
        }
    }

    /// Creates a STANDARD observance.
    #[must_use]
    pub const fn standard(
        dtstart: NaiveDateTime,
        offset_from: UtcOffset,
        offset_to: UtcOffset,
    ) -> Self {
        Self::new(ObservanceKind::Standard, dtstart, offset_from, offset_to)
    }

    /// Creates a DAYLIGHT observance.
    #[must_use]
    pub const fn daylight(
        dtstart: NaiveDateTime,
        offset_from: UtcOffset,
        offset_to: UtcOffset,
    ) -> Self {
        Self::new(ObservanceKind::Daylight, dtstart, offset_from, offset_to)
    }

    /// Sets the recurrence rule.
    #[must_use]
    pub fn with_rrule(mut self, rrule: RecurrencePattern) -> Self {
        self.rrule = Some(rrule);
        self
    }

    /// Adds an explicit onset.
    #[must_use]
    pub fn with_rdate(mut self, rdate: NaiveDateTime) -> Self {
        self.rdates.push(rdate);
        self
    }

    /// Sets the abbreviation.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn onset_instant(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        shift_by_offset(local, self.offset_from).ok()
    }

    /// Onset instants with `from <= at <= to`, ascending. `from = None`
    /// scans from the first onset.
    fn onsets(&self, from: Option<DateTime<Utc>>, to: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let in_range = |at: &DateTime<Utc>| from.is_none_or(|from| *at >= from) && *at <= to;

        let mut onsets: Vec<_> = std::iter::once(self.dtstart)
            .chain(self.rdates.iter().copied())
            .filter_map(|local| self.onset_instant(local))
            .filter(in_range)
            .collect();

        if let Some(pattern) = &self.rrule {
            onsets.extend(self.rule_onsets(pattern, from, to).into_iter().filter(in_range));
        }

        onsets.sort_unstable();
        onsets.dedup();
        onsets
    }

    /// Expands the observance rule between two instants.
    fn rule_onsets(
        &self,
        pattern: &RecurrencePattern,
        from: Option<DateTime<Utc>>,
        to: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        // The rule runs on the local wall clock, so bounds and a UTC UNTIL are
        // moved into local time first.
        let shift = self.offset_from.as_delta();
        let local_until = match pattern.until() {
            Some(RRuleUntil::DateTime(until)) if until.is_utc() => {
                until.naive().checked_add_signed(shift)
            }
            _ => None,
        };
        let local_pattern = match local_until {
            Some(local_until) => pattern
                .clone()
                .with_termination(Some(Termination::Until(RRuleUntil::DateTime(
                    ICalDateTime::from_naive(local_until, DateTimeForm::Floating),
                )))),
            None => pattern.clone(),
        };

        let anchor = ICalDateTime::from_naive(self.dtstart, DateTimeForm::Floating);
        let resolver = TimeZoneResolver::new();
        let iter = match RuleIter::new(&local_pattern, &anchor, &resolver) {
            Ok(iter) => iter.with_horizon(to.checked_add_signed(shift).unwrap_or(to)),
            Err(error) => {
                tracing::warn!(%error, kind = %self.kind, "Cannot expand observance rule");
                return Vec::new();
            }
        };
        let iter = match from {
            Some(from) => iter.resuming_from(from.checked_add_signed(shift).unwrap_or(from)),
            None => iter,
        };

        let mut onsets = Vec::new();
        for next in iter {
            match next {
                Ok(local) => onsets.extend(self.onset_instant(local.naive())),
                Err(error) => {
                    tracing::warn!(%error, kind = %self.kind, "Observance rule expansion stopped");
                    break;
                }
            }
        }
        onsets
    }

    /// Latest onset at or before an instant.
    fn latest_onset(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let recent = instant.checked_sub_signed(TimeDelta::days(RECENT_ONSET_WINDOW_DAYS));
        self.onsets(recent, instant)
            .last()
            .copied()
            .or_else(|| self.onsets(None, instant).last().copied())
    }
}

/// A custom time zone assembled from VTIMEZONE observances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VTimezone {
    tzid: String,
    observances: Vec<Observance>,
}

impl VTimezone {
    /// Creates a zone with no observances. Such a zone behaves as UTC.
    #[must_use]
    pub fn new(tzid: impl Into<String>) -> Self {
        Self {
            tzid: tzid.into(),
            observances: Vec::new(),
        }
    }

    /// Adds an observance.
    #[must_use]
    pub fn with_observance(mut self, observance: Observance) -> Self {
        self.observances.push(observance);
        self
    }

    /// Returns the zone identifier (TZID property).
    #[must_use]
    pub fn tzid(&self) -> &str {
        &self.tzid
    }

    /// Returns the observances in declaration order.
    #[must_use]
    pub fn observances(&self) -> &[Observance] {
        &self.observances
    }

    /// Observance whose onset most recently preceded an instant.
    fn observance_at(&self, instant: DateTime<Utc>) -> Option<&Observance> {
        self.observances
            .iter()
            .filter_map(|obs| obs.latest_onset(instant).map(|at| (at, obs)))
            .max_by_key(|(at, _)| *at)
            .map(|(_, obs)| obs)
    }

    /// ## Summary
    /// Returns the UTC offset in effect at an instant.
    ///
    /// For instants before every onset, returns the earliest observance's
    /// `offset_from` (the offset before any transition).
    #[must_use]
    pub fn offset_at(&self, instant: DateTime<Utc>) -> UtcOffset {
        match self.observance_at(instant) {
            Some(obs) => obs.offset_to,
            None => self
                .observances
                .iter()
                .min_by_key(|obs| obs.dtstart)
                .map_or(UtcOffset::UTC, |obs| obs.offset_from),
        }
    }

    /// ## Summary
    /// Converts a local datetime to UTC using this timezone's rules.
    ///
    /// A reading valid under several offsets (a fold) takes the earliest
    /// instant; a reading valid under none (a gap) uses the offset in effect
    /// before the gap.
    ///
    /// ## Errors
    /// Returns `ConversionError::InvalidDateTime` if the result leaves the
    /// representable range.
    pub fn to_utc(&self, local: NaiveDateTime) -> Result<DateTime<Utc>, ConversionError> {
        let mut offsets: Vec<_> = self
            .observances
            .iter()
            .flat_map(|obs| [obs.offset_from, obs.offset_to])
            .collect();
        offsets.sort_unstable();
        offsets.dedup();

        let earliest = offsets
            .into_iter()
            .filter_map(|offset| {
                let instant = shift_by_offset(local, offset).ok()?;
                (self.offset_at(instant) == offset).then_some(instant)
            })
            .min();
        if let Some(instant) = earliest {
            return Ok(instant);
        }

        let before = local
            .checked_sub_signed(TimeDelta::days(1))
            .ok_or_else(|| ConversionError::InvalidDateTime(local.to_string()))?;
        shift_by_offset(local, self.offset_at(before.and_utc()))
    }

    /// ## Summary
    /// Converts a UTC instant to local time using this timezone's rules.
    #[must_use]
    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        let utc = instant.naive_utc();
        utc.checked_add_signed(self.offset_at(instant).as_delta())
            .unwrap_or(utc)
    }

    /// ## Summary
    /// Returns the offset changes with `start <= at < end`, in order.
    ///
    /// Onsets that do not change the offset are skipped.
    #[must_use]
    pub fn transitions(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Transition> {
        let Some(last) = end.checked_sub_signed(TimeDelta::seconds(1)) else {
            return Vec::new();
        };

        let mut onsets: Vec<(DateTime<Utc>, &Observance)> = self
            .observances
            .iter()
            .flat_map(|obs| {
                obs.onsets(Some(start), last)
                    .into_iter()
                    .map(move |at| (at, obs))
            })
            .collect();
        onsets.sort_by_key(|(at, _)| *at);

        let mut transitions = Vec::new();
        let before = start.checked_sub_signed(TimeDelta::seconds(1)).unwrap_or(start);
        let mut offset = self.offset_at(before);
        for (at, obs) in onsets {
            if obs.offset_to == offset {
                continue;
            }
            transitions.push(Transition {
                at,
                offset_before: offset,
                offset_after: obs.offset_to,
                name: obs.name.clone(),
            });
            offset = obs.offset_to;
        }
        transitions
    }
}
