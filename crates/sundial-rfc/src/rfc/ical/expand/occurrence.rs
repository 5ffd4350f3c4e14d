//! Occurrence aggregation (RFC 5545 §3.8.5).
//!
//! A `RecurrenceSet` merges its anchor, RRULE and RDATE instances, removes
//! EXDATE and EXRULE matches and yields the result lazily in start order.
//! A `RecurrenceIndex` combines sets sharing a UID and applies RECURRENCE-ID
//! overrides.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{TimeDelta, Utc};

use super::rrule::RuleIter;
use super::timezone::{TimeZone, TimeZoneResolver};
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::core::{
    DateTime, Duration, Period, RecurrenceId, RecurrencePattern, RecurrenceRange, TimelineKey,
};

/// A query window on the UTC timeline, half-open: `[start, end)`.
///
/// Floating values and dates are placed on the timeline by reading their
/// wall clock as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    start: Option<chrono::DateTime<Utc>>,
    end: Option<chrono::DateTime<Utc>>,
}

impl TimeRange {
    /// A window covering the whole timeline.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// ## Summary
    /// A window from `start` (inclusive) to `end` (exclusive).
    ///
    /// ## Errors
    /// Returns a validation error if `end` precedes `start`.
    pub fn between(start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>) -> RfcResult<Self> {
        if end < start {
            return Err(RfcError::invalid(format!(
                "time range end {end} precedes start {start}"
            )));
        }
        Ok(Self {
            start: Some(start),
            end: Some(end),
        })
    }

    /// A window open towards the future.
    #[must_use]
    pub const fn starting_at(start: chrono::DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// A window open towards the past.
    #[must_use]
    pub const fn ending_at(end: chrono::DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    #[must_use]
    pub const fn start(&self) -> Option<chrono::DateTime<Utc>> {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> Option<chrono::DateTime<Utc>> {
        self.end
    }

    /// Whether an occurrence spanning `start..end` overlaps the window.
    /// A zero-length occurrence overlaps when `window.start <= start < window.end`.
    fn overlaps(&self, start: TimelineKey, end: TimelineKey) -> bool {
        let (start, end) = (start.as_utc(), end.as_utc());
        let before_end = self.end.is_none_or(|window_end| start < window_end);
        let after_start = self.start.is_none_or(|window_start| {
            if end > start {
                end > window_start
            } else {
                start >= window_start
            }
        });
        before_end && after_start
    }

    /// Whether nothing starting at or after `start` can overlap the window.
    fn is_past(&self, start: TimelineKey) -> bool {
        self.end.is_some_and(|window_end| start.as_utc() >= window_end)
    }
}

/// The recurrence-related content of one calendar component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceSet {
    uid: String,
    dtstart: DateTime,
    duration: Duration,
    rrules: Vec<RecurrencePattern>,
    exrules: Vec<RecurrencePattern>,
    rdates: Vec<Period>,
    exdates: Vec<DateTime>,
    recurrence_id: Option<RecurrenceId>,
}

impl RecurrenceSet {
    /// Creates a set whose only occurrence is `dtstart`, lasting zero time.
    #[must_use]
    pub fn new(uid: impl Into<String>, dtstart: DateTime) -> Self {
        Self {
            uid: uid.into(),
            dtstart,
            duration: Duration::zero(),
            rrules: Vec::new(),
            exrules: Vec::new(),
            rdates: Vec::new(),
            exdates: Vec::new(),
            recurrence_id: None,
        }
    }

    /// ## Summary
    /// Sets the duration every generated occurrence inherits.
    ///
    /// ## Errors
    /// Returns a validation error if the duration is negative, or has a time
    /// component while DTSTART is a DATE.
    pub fn with_duration(mut self, duration: Duration) -> RfcResult<Self> {
        Period::from_duration(self.dtstart.clone(), duration)?;
        self.duration = duration;
        Ok(self)
    }

    #[must_use]
    pub fn with_rrule(mut self, pattern: RecurrencePattern) -> Self {
        self.rrules.push(pattern);
        self
    }

    /// Adds an exclusion rule; every start it produces is removed.
    #[must_use]
    pub fn with_exrule(mut self, pattern: RecurrencePattern) -> Self {
        self.exrules.push(pattern);
        self
    }

    /// Adds an explicit occurrence. A bare instant lasts the base duration.
    #[must_use]
    pub fn with_rdate(mut self, period: Period) -> Self {
        self.rdates.push(period);
        self
    }

    #[must_use]
    pub fn with_exdate(mut self, value: DateTime) -> Self {
        self.exdates.push(value);
        self
    }

    /// Marks this set as an override of an instance of the master sharing its UID.
    #[must_use]
    pub fn with_recurrence_id(mut self, recurrence_id: RecurrenceId) -> Self {
        self.recurrence_id = Some(recurrence_id);
        self
    }

    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub const fn dtstart(&self) -> &DateTime {
        &self.dtstart
    }

    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub fn rrules(&self) -> &[RecurrencePattern] {
        &self.rrules
    }

    #[must_use]
    pub fn exrules(&self) -> &[RecurrencePattern] {
        &self.exrules
    }

    #[must_use]
    pub fn rdates(&self) -> &[Period] {
        &self.rdates
    }

    #[must_use]
    pub fn exdates(&self) -> &[DateTime] {
        &self.exdates
    }

    #[must_use]
    pub const fn recurrence_id(&self) -> Option<&RecurrenceId> {
        self.recurrence_id.as_ref()
    }

    /// ## Summary
    /// Lazily yields the occurrences of this set overlapping `window`, in
    /// ascending start order without duplicate starts.
    ///
    /// DTSTART is always an occurrence unless excluded. When a generated
    /// and an explicit occurrence share a start, the explicit one is kept.
    /// An error while evaluating one rule is yielded in place and the other
    /// sources carry on.
    ///
    /// ## Errors
    /// Returns an error if a TZID used by the set cannot be resolved, or if
    /// a rule cannot be evaluated from DTSTART.
    pub fn occurrences<'a>(
        &'a self,
        window: &TimeRange,
        resolver: &TimeZoneResolver,
    ) -> RfcResult<Occurrences<'a>> {
        tracing::debug!(
            uid = %self.uid,
            dtstart = %self.dtstart,
            rules = self.rrules.len(),
            "Expanding recurrence set"
        );

        let zone = self.dtstart.zone(resolver)?;
        let anchor_key = self.dtstart.timeline_key_in(zone.as_ref())?;

        // Occurrences that start before the window may still reach into it.
        let resume = window.start.and_then(|start| {
            start.checked_sub_signed(self.duration.to_time_delta() + TimeDelta::days(1))
        });
        let sources = |patterns: &'a [RecurrencePattern]| -> RfcResult<Vec<Source<'a>>> {
            patterns
                .iter()
                .map(|pattern| -> RfcResult<Source<'a>> {
                    let mut iter = RuleIter::new(pattern, &self.dtstart, resolver)?;
                    if let Some(bound) = resume {
                        iter = iter.resuming_from(bound);
                    }
                    if let Some(bound) = window.end {
                        iter = iter.with_horizon(bound);
                    }
                    Ok(Source::new(iter))
                })
                .collect()
        };
        let rules = sources(&self.rrules)?;
        let exrules = sources(&self.exrules)?;

        let mut rdates = Vec::with_capacity(self.rdates.len());
        for period in &self.rdates {
            let period = if period.is_instant() {
                Period::with_base_duration(period.start().clone(), self.duration)
            } else {
                period.clone()
            };
            let start = period.start().timeline_key(resolver)?;
            let end = period.effective_end(resolver)?.timeline_key(resolver)?;
            rdates.push(Added { period, start, end });
        }
        rdates.sort_by_key(|added| added.start);
        rdates.dedup_by_key(|added| added.start);

        let exdates = self
            .exdates
            .iter()
            .map(|value| value.timeline_key(resolver))
            .collect::<RfcResult<HashSet<_>>>()?;

        Ok(Occurrences {
            set: self,
            zone,
            window: *window,
            anchor_key,
            anchor: Some((self.dtstart.clone(), anchor_key)),
            rules,
            rdates: rdates.into(),
            exdates,
            exrules,
            skip: HashSet::new(),
            cutoff: None,
            deferred: VecDeque::new(),
            finished: false,
        })
    }
}

/// One occurrence of a recurrence set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence<'a> {
    source: &'a RecurrenceSet,
    period: Period,
    recurrence_id: DateTime,
    key: TimelineKey,
}

impl<'a> Occurrence<'a> {
    /// The set that produced this occurrence.
    #[must_use]
    pub const fn source(&self) -> &'a RecurrenceSet {
        self.source
    }

    #[must_use]
    pub const fn period(&self) -> &Period {
        &self.period
    }

    #[must_use]
    pub const fn start(&self) -> &DateTime {
        self.period.start()
    }

    /// The RECURRENCE-ID identifying this instance. For the DTSTART
    /// occurrence of an override this is the instance it replaces.
    #[must_use]
    pub const fn recurrence_id(&self) -> &DateTime {
        &self.recurrence_id
    }
}

/// Explicit occurrence with precomputed timeline bounds.
#[derive(Debug, Clone)]
struct Added {
    period: Period,
    start: TimelineKey,
    end: TimelineKey,
}

/// A rule iterator with one instance of lookahead.
#[derive(Debug)]
struct Source<'a> {
    iter: RuleIter<'a>,
    head: Option<(DateTime, TimelineKey)>,
    done: bool,
}

impl<'a> Source<'a> {
    const fn new(iter: RuleIter<'a>) -> Self {
        Self {
            iter,
            head: None,
            done: false,
        }
    }

    /// Pulls the next instance into `head` if it is empty.
    fn fill(&mut self) -> Option<RfcError> {
        if self.head.is_some() || self.done {
            return None;
        }
        match self.iter.next_keyed() {
            Some(Ok(item)) => {
                self.head = Some(item);
                None
            }
            Some(Err(error)) => Some(error),
            None => {
                self.done = true;
                None
            }
        }
    }

    fn head_key(&self) -> Option<TimelineKey> {
        self.head.as_ref().map(|(_, key)| *key)
    }
}

/// Lazy occurrence stream of one `RecurrenceSet`.
#[derive(Debug)]
pub struct Occurrences<'a> {
    set: &'a RecurrenceSet,
    zone: Option<TimeZone>,
    window: TimeRange,
    anchor_key: TimelineKey,
    anchor: Option<(DateTime, TimelineKey)>,
    rules: Vec<Source<'a>>,
    rdates: VecDeque<Added>,
    exdates: HashSet<TimelineKey>,
    exrules: Vec<Source<'a>>,
    /// Instance starts replaced by overrides.
    skip: HashSet<TimelineKey>,
    /// Instances starting at or after this point are replaced by an override.
    cutoff: Option<TimelineKey>,
    deferred: VecDeque<RfcError>,
    finished: bool,
}

impl<'a> Occurrences<'a> {
    /// Suppresses the instances an override replaces.
    fn restrict(mut self, skip: HashSet<TimelineKey>, cutoff: Option<TimelineKey>) -> Self {
        self.skip = skip;
        self.cutoff = cutoff;
        self
    }

    fn next_start(&self) -> Option<TimelineKey> {
        let anchor = self.anchor.as_ref().map(|(_, key)| *key);
        let rules = self.rules.iter().filter_map(Source::head_key);
        let added = self.rdates.front().map(|added| added.start);
        anchor.into_iter().chain(rules).chain(added).min()
    }

    /// Takes every candidate starting at `key`; an explicit one wins.
    fn take_at(&mut self, key: TimelineKey) -> Option<Candidate> {
        let mut generated = None;
        if self.anchor.as_ref().is_some_and(|(_, k)| *k == key) {
            generated = self.anchor.take().map(|(value, _)| value);
        }
        for source in &mut self.rules {
            if source.head_key() == Some(key) {
                generated = source.head.take().map(|(value, _)| value).or(generated);
            }
        }
        if self.rdates.front().is_some_and(|added| added.start == key) {
            return self.rdates.pop_front().map(Candidate::Added);
        }
        generated.map(Candidate::Generated)
    }

    /// Whether an EXRULE produces `key`. Rule failures are deferred.
    fn excluded_by_rule(&mut self, key: TimelineKey) -> bool {
        let mut excluded = false;
        for source in &mut self.exrules {
            loop {
                if let Some(error) = source.fill() {
                    self.deferred.push_back(error);
                    continue;
                }
                match source.head_key() {
                    Some(head) if head < key => source.head = None,
                    Some(head) => {
                        excluded |= head == key;
                        break;
                    }
                    None => break,
                }
            }
        }
        excluded
    }

    fn build(
        &self,
        candidate: Candidate,
        key: TimelineKey,
    ) -> RfcResult<(Occurrence<'a>, TimelineKey)> {
        let (period, end) = match candidate {
            Candidate::Added(added) => (added.period, added.end),
            Candidate::Generated(start) => {
                let end = start
                    .add_duration_in(&self.set.duration, self.zone.as_ref())?
                    .timeline_key_in(self.zone.as_ref())?;
                (Period::with_base_duration(start, self.set.duration), end)
            }
        };
        let recurrence_id = match &self.set.recurrence_id {
            Some(rid) if key == self.anchor_key => rid.value().clone(),
            _ => period.start().clone(),
        };
        let occurrence = Occurrence {
            source: self.set,
            period,
            recurrence_id,
            key,
        };
        Ok((occurrence, end))
    }
}

enum Candidate {
    Generated(DateTime),
    Added(Added),
}

impl<'a> Iterator for Occurrences<'a> {
    type Item = RfcResult<Occurrence<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(error) = self.deferred.pop_front() {
                return Some(Err(error));
            }
            if self.finished {
                return None;
            }
            for source in &mut self.rules {
                if let Some(error) = source.fill() {
                    return Some(Err(error));
                }
            }

            let Some(key) = self.next_start() else {
                self.finished = true;
                continue;
            };
            if self.window.is_past(key) || self.cutoff.is_some_and(|cutoff| key >= cutoff) {
                self.finished = true;
                continue;
            }
            let Some(candidate) = self.take_at(key) else {
                continue;
            };
            if self.exdates.contains(&key)
                || self.skip.contains(&key)
                || self.excluded_by_rule(key)
            {
                tracing::trace!(uid = %self.set.uid, ?key, "Occurrence excluded");
                continue;
            }
            match self.build(candidate, key) {
                Ok((occurrence, end)) if self.window.overlaps(key, end) => {
                    return Some(Ok(occurrence));
                }
                Ok(_) => {}
                Err(error) => return Some(Err(error)),
            }
        }
    }
}

/// Occurrence streams of many sets, merged by start.
///
/// Equal starts are ordered by the position of their set in the indexed slice.
#[derive(Debug)]
pub struct MergedOccurrences<'a> {
    members: Vec<Member<'a>>,
}

#[derive(Debug)]
struct Member<'a> {
    ordinal: usize,
    stream: Occurrences<'a>,
    head: Option<Occurrence<'a>>,
}

impl<'a> Iterator for MergedOccurrences<'a> {
    type Item = RfcResult<Occurrence<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        for member in &mut self.members {
            if member.head.is_none() {
                match member.stream.next() {
                    Some(Ok(occurrence)) => member.head = Some(occurrence),
                    Some(Err(error)) => return Some(Err(error)),
                    None => {}
                }
            }
        }
        self.members
            .iter_mut()
            .filter(|member| member.head.is_some())
            .min_by_key(|member| (member.head.as_ref().map(|o| o.key), member.ordinal))
            .and_then(|member| member.head.take())
            .map(Ok)
    }
}

/// Recurrence sets grouped by UID, with RECURRENCE-ID overrides applied.
///
/// A `ThisInstance` override replaces the single instance it names. A
/// `ThisAndFuture` override replaces its instance and every later one of
/// the master; the override's own series runs until the next
/// `ThisAndFuture` override.
#[derive(Debug)]
pub struct RecurrenceIndex<'a> {
    sets: &'a [RecurrenceSet],
    by_uid: HashMap<&'a str, Vec<usize>>,
    uids: Vec<&'a str>,
}

impl<'a> RecurrenceIndex<'a> {
    #[must_use]
    pub fn new(sets: &'a [RecurrenceSet]) -> Self {
        let mut by_uid: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut uids = Vec::new();
        for (ordinal, set) in sets.iter().enumerate() {
            let members = by_uid.entry(set.uid()).or_default();
            if members.is_empty() {
                uids.push(set.uid());
            }
            members.push(ordinal);
        }
        Self { sets, by_uid, uids }
    }

    /// UIDs in order of first appearance.
    #[must_use]
    pub fn uids(&self) -> &[&'a str] {
        &self.uids
    }

    /// ## Summary
    /// Occurrences of the event `uid` within `window`. An unknown UID
    /// yields nothing.
    ///
    /// ## Errors
    /// Returns an error if a set of the event cannot start expanding.
    pub fn occurrences_of(
        &self,
        uid: &str,
        window: &TimeRange,
        resolver: &TimeZoneResolver,
    ) -> RfcResult<MergedOccurrences<'a>> {
        let members = match self.by_uid.get(uid) {
            Some(ordinals) => self.members(ordinals, window, resolver)?,
            None => Vec::new(),
        };
        Ok(MergedOccurrences { members })
    }

    /// ## Summary
    /// Occurrences of every event within `window`, merged by start.
    ///
    /// ## Errors
    /// Returns an error if any set cannot start expanding.
    pub fn occurrences(
        &self,
        window: &TimeRange,
        resolver: &TimeZoneResolver,
    ) -> RfcResult<MergedOccurrences<'a>> {
        tracing::debug!(events = self.uids.len(), ?window, "Expanding recurrence index");
        let mut members = Vec::new();
        for uid in &self.uids {
            if let Some(ordinals) = self.by_uid.get(uid) {
                members.extend(self.members(ordinals, window, resolver)?);
            }
        }
        Ok(MergedOccurrences { members })
    }

    fn members(
        &self,
        ordinals: &[usize],
        window: &TimeRange,
        resolver: &TimeZoneResolver,
    ) -> RfcResult<Vec<Member<'a>>> {
        let mut single = HashSet::new();
        let mut future = Vec::new();
        for set in ordinals.iter().filter_map(|i| self.sets.get(*i)) {
            if let Some(rid) = set.recurrence_id() {
                let key = rid.value().timeline_key(resolver)?;
                match rid.range() {
                    RecurrenceRange::ThisInstance => {
                        single.insert(key);
                    }
                    RecurrenceRange::ThisAndFuture => future.push(key),
                }
            }
        }
        future.sort_unstable();

        let mut members = Vec::with_capacity(ordinals.len());
        for &ordinal in ordinals {
            let Some(set) = self.sets.get(ordinal) else {
                continue;
            };
            let stream = set.occurrences(window, resolver)?;
            let stream = match set.recurrence_id() {
                None => stream.restrict(single.clone(), future.first().copied()),
                Some(rid) if rid.range() == RecurrenceRange::ThisAndFuture => {
                    let own = rid.value().timeline_key(resolver)?;
                    let next = future.iter().find(|key| **key > own).copied();
                    stream.restrict(single.clone(), next)
                }
                Some(_) => stream,
            };
            members.push(Member {
                ordinal,
                stream,
                head: None,
            });
        }
        Ok(members)
    }
}
