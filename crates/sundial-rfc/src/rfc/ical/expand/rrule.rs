//! Lazy evaluation of recurrence rules (RFC 5545 §3.3.10, §3.8.5.3).
//!
//! A `RuleIter` walks the rule one frequency step at a time. Each step builds
//! its candidate set from the BY-filters, orders it, applies BYSETPOS and
//! hands the survivors out one by one, so nothing past the current step is
//! ever materialized.

use std::collections::VecDeque;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Utc};
use sundial_core::config::{DEFAULT_MAX_EMPTY_STEPS, ExpansionConfig};

use super::timezone::{TimeZone, TimeZoneResolver};
use crate::error::RfcResult;
use crate::rfc::ical::core::{
    DateTime, Duration, Frequency, Period, RRuleUntil, RecurrencePattern, TimelineKey,
};

/// Days in one Gregorian cycle. Calendar filters repeat with this period.
const GREGORIAN_CYCLE_DAYS: i64 = 146_097;

/// Error raised when a rule cannot be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpansionError {
    /// Sub-daily frequencies need a time of day to step from.
    #[error("{0} recurrence requires a DATE-TIME anchor")]
    SubDailyDateAnchor(Frequency),

    /// The rule produced no candidate for too many consecutive steps.
    #[error("No recurrence candidate within {limit} consecutive steps")]
    EmptyStepLimit {
        /// The configured bound that was reached.
        limit: u32,
    },

    /// A DATE-TIME UNTIL was given for a DATE anchor.
    #[error("UNTIL {until} is a DATE-TIME but the anchor is a DATE")]
    UntilMismatch {
        /// The offending UNTIL value.
        until: String,
    },
}

/// Options for recurrence evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionOptions {
    /// Consecutive steps without a candidate tolerated before evaluation
    /// fails with `ExpansionError::EmptyStepLimit`.
    ///
    /// Day-level rules keep going until the empty run also spans a full
    /// Gregorian cycle per INTERVAL, so rare but valid dates (a leap day
    /// under DAILY) are still reached.
    pub max_empty_steps: u32,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self {
            max_empty_steps: DEFAULT_MAX_EMPTY_STEPS,
        }
    }
}

impl From<&ExpansionConfig> for ExpansionOptions {
    fn from(config: &ExpansionConfig) -> Self {
        Self {
            max_empty_steps: config.max_empty_steps,
        }
    }
}

impl ExpansionOptions {
    /// Sets the empty-step bound.
    #[must_use]
    pub const fn with_max_empty_steps(mut self, max_empty_steps: u32) -> Self {
        self.max_empty_steps = max_empty_steps;
        self
    }
}

/// Upper bound taken from UNTIL.
#[derive(Debug, Clone, Copy)]
enum UntilBound {
    /// Last local date that may produce instances.
    Date(NaiveDate),
    /// Last timeline position that may produce instances.
    Instant(NaiveDateTime),
}

/// What a single frequency step yielded.
enum Step {
    /// Ordered candidates, BYSETPOS already applied.
    Candidates(Vec<NaiveDateTime>),
    /// The step cannot match; evaluation continues at the given step.
    Skip(u64),
    /// A sub-daily step landed on a day the date filters reject;
    /// evaluation continues at the given step.
    SkipDay(u64),
    /// No later step can produce anything.
    Exhausted,
}

/// Expansion plan derived from a pattern and its anchor.
///
/// Holds the effective BY-lists, including the values RFC 5545 implies from
/// the anchor when a rule has no day-level filter at all.
#[derive(Debug, Clone)]
struct Filters {
    freq: Frequency,
    wkst: chrono::Weekday,
    months: Vec<u32>,
    weeknos: Vec<i64>,
    yeardays: Vec<i64>,
    monthdays: Vec<i64>,
    weekdays: Vec<chrono::Weekday>,
    nth_weekdays: Vec<(i64, chrono::Weekday)>,
    /// Ordinal BYDAY counts within the month rather than the year.
    month_scoped: bool,
    hours: Vec<u32>,
    minutes: Vec<u32>,
    seconds: Vec<u32>,
    /// Times of day for day-level frequencies, ascending.
    times: Vec<NaiveTime>,
    setpos: Vec<i64>,
}

impl Filters {
    fn new(pattern: &RecurrencePattern, anchor: &DateTime) -> Self {
        let freq = pattern.freq();
        let wall = anchor.naive();

        let mut months: Vec<u32> = pattern.by_month().iter().map(|m| u32::from(*m)).collect();
        let mut monthdays: Vec<i64> =
            pattern.by_monthday().iter().map(|d| i64::from(*d)).collect();
        let yeardays: Vec<i64> = pattern.by_yearday().iter().map(|d| i64::from(*d)).collect();
        let weeknos: Vec<i64> = pattern.by_weekno().iter().map(|w| i64::from(*w)).collect();

        let mut weekdays = Vec::new();
        let mut nth_weekdays = Vec::new();
        for day in pattern.by_day() {
            match day.ordinal {
                Some(n) => nth_weekdays.push((i64::from(n), day.weekday.to_chrono())),
                None => weekdays.push(day.weekday.to_chrono()),
            }
        }

        if weeknos.is_empty()
            && yeardays.is_empty()
            && monthdays.is_empty()
            && pattern.by_day().is_empty()
        {
            match freq {
                Frequency::Yearly => {
                    if months.is_empty() {
                        months.push(wall.month());
                    }
                    monthdays.push(i64::from(wall.day()));
                }
                Frequency::Monthly => monthdays.push(i64::from(wall.day())),
                Frequency::Weekly => weekdays.push(wall.weekday()),
                Frequency::Daily
                | Frequency::Hourly
                | Frequency::Minutely
                | Frequency::Secondly => {}
            }
        }

        let sorted = |values: &[u8]| {
            let mut out: Vec<u32> = values.iter().map(|v| u32::from(*v)).collect();
            out.sort_unstable();
            out.dedup();
            out
        };
        let hours = sorted(pattern.by_hour());
        let minutes = sorted(pattern.by_minute());
        let seconds = sorted(pattern.by_second());

        let times = if anchor.has_time() {
            time_grid(
                &or_default(&hours, wall.hour()),
                &or_default(&minutes, wall.minute()),
                &or_default(&seconds, wall.second()),
            )
        } else {
            vec![NaiveTime::MIN]
        };

        Self {
            freq,
            wkst: pattern.wkst().to_chrono(),
            month_scoped: freq == Frequency::Monthly || !months.is_empty(),
            months,
            weeknos,
            yeardays,
            monthdays,
            weekdays,
            nth_weekdays,
            hours,
            minutes,
            seconds,
            times,
            setpos: pattern.by_setpos().iter().map(|p| i64::from(*p)).collect(),
        }
    }

    /// Applies BYMONTH, BYWEEKNO, BYYEARDAY, BYMONTHDAY and BYDAY to a date.
    fn day_matches(&self, date: NaiveDate) -> bool {
        if !self.months.is_empty() && !self.months.contains(&date.month()) {
            return false;
        }
        if !self.weeknos.is_empty() && !self.weekno_matches(date) {
            return false;
        }
        if !signed_match(
            &self.yeardays,
            i64::from(date.ordinal()),
            year_len(date.year()),
        ) {
            return false;
        }
        if !signed_match(
            &self.monthdays,
            i64::from(date.day()),
            month_len(date.year(), date.month()),
        ) {
            return false;
        }
        if self.weekdays.is_empty() && self.nth_weekdays.is_empty() {
            return true;
        }
        let weekday = date.weekday();
        self.weekdays.contains(&weekday)
            || self
                .nth_weekdays
                .iter()
                .any(|(n, day)| *day == weekday && self.nth_matches(date, *n))
    }

    /// Whether `date` is the nth (or nth-from-last) of its weekday in scope.
    fn nth_matches(&self, date: NaiveDate, n: i64) -> bool {
        let (offset, len) = if self.month_scoped {
            (i64::from(date.day0()), month_len(date.year(), date.month()))
        } else {
            (i64::from(date.ordinal0()), year_len(date.year()))
        };
        n == offset / 7 + 1 || n == -((len - 1 - offset) / 7 + 1)
    }

    /// Week numbers follow RFC 5545: week 1 is the first week starting on
    /// WKST with at least four days in the year.
    fn weekno_matches(&self, date: NaiveDate) -> bool {
        let year = date.year();
        let starts = (
            week_one_start(year - 1, self.wkst),
            week_one_start(year, self.wkst),
            week_one_start(year + 1, self.wkst),
            week_one_start(year + 2, self.wkst),
        );
        let (Some(prev), Some(this), Some(next), Some(after)) = starts else {
            return false;
        };
        let (start, end) = if date < this {
            (prev, this)
        } else if date >= next {
            (next, after)
        } else {
            (this, next)
        };
        let week = (date - start).num_days() / 7 + 1;
        let weeks_in_year = (end - start).num_days() / 7;
        self.weeknos
            .iter()
            .any(|w| *w == week || *w == week - weeks_in_year - 1)
    }

    /// Keeps the candidates at the BYSETPOS positions, in order.
    fn select_positions(&self, candidates: Vec<NaiveDateTime>) -> Vec<NaiveDateTime> {
        if self.setpos.is_empty() {
            return candidates;
        }
        let len = i64::try_from(candidates.len()).unwrap_or(i64::MAX);
        let mut picked: Vec<usize> = self
            .setpos
            .iter()
            .filter_map(|pos| {
                let index = if *pos > 0 { pos - 1 } else { len + pos };
                usize::try_from(index).ok().filter(|i| *i < candidates.len())
            })
            .collect();
        picked.sort_unstable();
        picked.dedup();
        picked.into_iter().map(|i| candidates[i]).collect()
    }
}

fn or_default(values: &[u32], default: u32) -> Vec<u32> {
    if values.is_empty() {
        vec![default]
    } else {
        values.to_vec()
    }
}

fn time_grid(hours: &[u32], minutes: &[u32], seconds: &[u32]) -> Vec<NaiveTime> {
    let mut times: Vec<NaiveTime> = hours
        .iter()
        .flat_map(|h| {
            minutes.iter().flat_map(move |m| {
                seconds
                    .iter()
                    .filter_map(move |s| NaiveTime::from_hms_opt(*h, *m, *s))
            })
        })
        .collect();
    times.sort_unstable();
    times
}

/// Matches a day index against signed BY-values; an empty list matches all.
fn signed_match(values: &[i64], index: i64, len: i64) -> bool {
    values.is_empty() || values.iter().any(|v| *v == index || *v == index - len - 1)
}

fn year_len(year: i32) -> i64 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}

fn month_len(year: i32, month: u32) -> i64 {
    (28..=31)
        .rev()
        .find(|day| NaiveDate::from_ymd_opt(year, month, *day).is_some())
        .map_or(31, i64::from)
}

fn days_since(day: chrono::Weekday, start: chrono::Weekday) -> u64 {
    u64::from((7 + day.num_days_from_monday() - start.num_days_from_monday()) % 7)
}

fn week_one_start(year: i32, wkst: chrono::Weekday) -> Option<NaiveDate> {
    let jan4 = NaiveDate::from_ymd_opt(year, 1, 4)?;
    jan4.checked_sub_days(Days::new(days_since(jan4.weekday(), wkst)))
}

/// Lazy, strictly ascending sequence of the instances one pattern produces
/// from an anchor.
///
/// Only candidates at or after the anchor are produced; the anchor itself
/// appears only when it matches the rule. COUNT counts every produced
/// instance, including those hidden by `resuming_from`.
#[derive(Debug)]
pub struct RuleIter<'a> {
    pattern: &'a RecurrencePattern,
    anchor: DateTime,
    zone: Option<TimeZone>,
    filters: Filters,
    until: Option<UntilBound>,
    options: ExpansionOptions,
    /// Week containing the anchor, for WEEKLY stepping.
    week_start: NaiveDate,
    /// Anchor truncated to the frequency unit, for sub-daily stepping.
    base: NaiveDateTime,
    resume: Option<NaiveDateTime>,
    horizon: Option<NaiveDateTime>,
    step: u64,
    emitted: u32,
    empty_steps: u32,
    /// Wall-clock start of the current run of empty steps.
    empty_since: Option<NaiveDateTime>,
    last: Option<TimelineKey>,
    pending: VecDeque<(DateTime, TimelineKey)>,
    failure: Option<crate::error::RfcError>,
    finished: bool,
}

impl<'a> RuleIter<'a> {
    /// ## Summary
    /// Starts evaluating `pattern` from `anchor`.
    ///
    /// The anchor's zone is resolved once here and reused for every instance.
    ///
    /// ## Errors
    /// Returns an error if the anchor's TZID cannot be resolved, if a
    /// sub-daily frequency is paired with a DATE anchor, or if UNTIL is a
    /// DATE-TIME while the anchor is a DATE.
    pub fn new(
        pattern: &'a RecurrencePattern,
        anchor: &DateTime,
        resolver: &TimeZoneResolver,
    ) -> RfcResult<Self> {
        let freq = pattern.freq();
        if freq.is_sub_daily() && !anchor.has_time() {
            return Err(ExpansionError::SubDailyDateAnchor(freq).into());
        }

        let zone = anchor.zone(resolver)?;
        let until = match pattern.until() {
            None => None,
            Some(RRuleUntil::Date(date)) => Some(UntilBound::Date(*date)),
            Some(RRuleUntil::DateTime(until)) => {
                if !anchor.has_time() {
                    return Err(ExpansionError::UntilMismatch {
                        until: until.to_string(),
                    }
                    .into());
                }
                // A floating UNTIL is read in the anchor's zone.
                let key = if until.is_floating() {
                    DateTime::from_naive(until.naive(), anchor.form().clone())
                        .timeline_key_in(zone.as_ref())?
                } else {
                    until.timeline_key(resolver)?
                };
                Some(UntilBound::Instant(key.instant))
            }
        };

        let wall = anchor.naive();
        let wkst = pattern.wkst().to_chrono();
        let week_start = wall
            .date()
            .checked_sub_days(Days::new(days_since(wall.weekday(), wkst)))
            .unwrap_or(wall.date());
        let base = match freq {
            Frequency::Hourly => wall.date().and_hms_opt(wall.hour(), 0, 0),
            Frequency::Minutely => wall.date().and_hms_opt(wall.hour(), wall.minute(), 0),
            _ => Some(wall),
        }
        .unwrap_or(wall);

        tracing::debug!(rule = %pattern, anchor = %anchor, "Starting recurrence evaluation");

        Ok(Self {
            pattern,
            anchor: anchor.clone(),
            zone,
            filters: Filters::new(pattern, anchor),
            until,
            options: ExpansionOptions::default(),
            week_start,
            base,
            resume: None,
            horizon: None,
            step: 0,
            emitted: 0,
            empty_steps: 0,
            empty_since: None,
            last: None,
            pending: VecDeque::new(),
            failure: None,
            finished: false,
        })
    }

    /// Hides instances that start before `bound`.
    ///
    /// Without COUNT, evaluation jumps straight to the step containing the
    /// bound. With COUNT every earlier step still has to be walked so the
    /// count stays exact.
    #[must_use]
    pub fn resuming_from(mut self, bound: chrono::DateTime<Utc>) -> Self {
        let bound = bound.naive_utc();
        self.resume = Some(bound);
        if self.pattern.count().is_none() {
            // Wall clock and timeline differ by less than a day.
            if let Some(target) = bound.checked_sub_days(Days::new(1)) {
                self.step = self.step.max(self.step_containing(target));
            }
        }
        self
    }

    /// Ends the sequence at the first instance starting after `bound`.
    #[must_use]
    pub fn with_horizon(mut self, bound: chrono::DateTime<Utc>) -> Self {
        self.horizon = Some(bound.naive_utc());
        self
    }

    /// Replaces the evaluation options.
    #[must_use]
    pub const fn with_options(mut self, options: ExpansionOptions) -> Self {
        self.options = options;
        self
    }

    /// ## Summary
    /// Turns the instance sequence into periods lasting `duration`.
    ///
    /// ## Errors
    /// Returns a validation error if `duration` is negative or has a time
    /// component while the anchor is a DATE.
    pub fn periods(self, duration: Duration) -> RfcResult<Periods<'a>> {
        Period::from_duration(self.anchor.clone(), duration)?;
        Ok(Periods {
            inner: self,
            duration,
        })
    }

    /// Next instance together with its timeline position.
    pub(crate) fn next_keyed(&mut self) -> Option<RfcResult<(DateTime, TimelineKey)>> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(Ok(item));
            }
            if let Some(error) = self.failure.take() {
                return Some(Err(error));
            }
            if self.finished {
                return None;
            }
            self.advance();
        }
    }

    /// Evaluates one frequency step.
    fn advance(&mut self) {
        let limit = self.options.max_empty_steps;
        if self.gave_up(limit) {
            tracing::warn!(rule = %self.pattern, limit, "Recurrence gave up after empty steps");
            self.failure = Some(ExpansionError::EmptyStepLimit { limit }.into());
            self.finished = true;
            return;
        }

        let step = self.step;
        match self.candidates(step) {
            Step::Exhausted => self.finished = true,
            Step::Skip(next) => {
                self.note_empty(step, true);
                self.step = next;
            }
            Step::SkipDay(next) => {
                self.note_empty(step, false);
                self.step = next;
            }
            Step::Candidates(walls) => {
                tracing::trace!(step, candidates = walls.len(), "Evaluated recurrence step");
                self.step = step.saturating_add(1);
                if walls.is_empty() {
                    self.note_empty(step, true);
                } else {
                    self.empty_steps = 0;
                    self.empty_since = None;
                    self.accept(walls);
                }
            }
        }
    }

    /// Records an empty step. Sub-daily day skips only extend the run's
    /// calendar span, they do not count against the step limit.
    fn note_empty(&mut self, step: u64, counted: bool) {
        if self.empty_since.is_none() {
            self.empty_since = self.step_start(step);
        }
        if counted {
            self.empty_steps = self.empty_steps.saturating_add(1);
        }
    }

    /// Whether the current empty run proves the rule cannot match again.
    ///
    /// A day-level rule has to exceed the step limit and cover a Gregorian
    /// cycle per INTERVAL. A sub-daily rule gives up on either: too many
    /// time-level misses, or day skips covering a whole cycle.
    fn gave_up(&self, limit: u32) -> bool {
        let counted = self.empty_steps >= limit;
        let sub_daily = self.filters.freq.is_sub_daily();
        let cycles = if sub_daily {
            1
        } else {
            i64::from(self.pattern.interval())
        };
        let spanned = match (self.empty_since, self.step_start(self.step)) {
            (Some(since), Some(now)) => {
                (now - since).num_days() >= GREGORIAN_CYCLE_DAYS.saturating_mul(cycles)
            }
            _ => false,
        };
        if sub_daily {
            counted || spanned
        } else {
            counted && spanned
        }
    }

    /// Applies anchor, UNTIL, COUNT, horizon and resumption bounds to one
    /// step's ordered candidates.
    fn accept(&mut self, candidates: Vec<NaiveDateTime>) {
        let anchor_wall = self.anchor.naive();
        for wall in candidates {
            if wall < anchor_wall {
                continue;
            }
            let (value, key) = match self.normalize(wall) {
                Ok(item) => item,
                Err(error) => {
                    self.failure = Some(error);
                    self.finished = true;
                    return;
                }
            };
            let past_until = match self.until {
                Some(UntilBound::Date(date)) => value.date_part() > date,
                Some(UntilBound::Instant(until)) => key.instant > until,
                None => false,
            };
            if past_until {
                self.finished = true;
                return;
            }
            // DST normalization can fold two wall times onto one instant.
            if self.last.is_some_and(|last| key <= last) {
                continue;
            }
            self.last = Some(key);

            let mut last_counted = false;
            if let Some(count) = self.pattern.count() {
                if self.emitted >= count {
                    self.finished = true;
                    return;
                }
                self.emitted += 1;
                last_counted = self.emitted == count;
            }
            if self.horizon.is_some_and(|horizon| key.instant > horizon) {
                self.finished = true;
                return;
            }
            if self.resume.is_none_or(|resume| key.instant >= resume) {
                self.pending.push_back((value, key));
            }
            // COUNT reached.
            if last_counted {
                self.finished = true;
                return;
            }
        }
    }

    /// Turns a wall-clock candidate into a value in the anchor's form.
    /// Zoned times inside a DST gap move forward past it.
    fn normalize(&self, wall: NaiveDateTime) -> RfcResult<(DateTime, TimelineKey)> {
        if !self.anchor.has_time() {
            let value = DateTime::from_date(wall.date());
            let key = value.timeline_key_in(None)?;
            return Ok((value, key));
        }
        let form = self.anchor.form().clone();
        match &self.zone {
            Some(zone) => {
                let instant = zone.to_utc(wall)?;
                let value = DateTime::from_naive(zone.to_local(instant), form);
                let key = TimelineKey {
                    instant: instant.naive_utc(),
                    has_time: true,
                };
                Ok((value, key))
            }
            None => {
                let key = TimelineKey {
                    instant: wall,
                    has_time: true,
                };
                Ok((DateTime::from_naive(wall, form), key))
            }
        }
    }

    /// Wall-clock bound past which no step can produce an instance.
    fn stop_after(&self) -> Option<NaiveDateTime> {
        let until = self.until.and_then(|until| match until {
            UntilBound::Date(date) => date
                .checked_add_days(Days::new(2))
                .map(|date| date.and_time(NaiveTime::MIN)),
            UntilBound::Instant(instant) => instant.checked_add_days(Days::new(1)),
        });
        let horizon = self
            .horizon
            .and_then(|horizon| horizon.checked_add_days(Days::new(1)));
        match (until, horizon) {
            (Some(until), Some(horizon)) => Some(until.min(horizon)),
            (until, horizon) => until.or(horizon),
        }
    }

    fn past_stop(&self, span_start: NaiveDateTime) -> bool {
        self.stop_after().is_some_and(|stop| span_start > stop)
    }

    fn candidates(&self, step: u64) -> Step {
        if let Some(unit) = self.filters.freq.unit_seconds() {
            return self.sub_daily_candidates(step, unit);
        }
        let Some((span_start, days)) = self.step_days(step) else {
            return Step::Exhausted;
        };
        if self.past_stop(span_start.and_time(NaiveTime::MIN)) {
            return Step::Exhausted;
        }
        let walls: Vec<NaiveDateTime> = days
            .into_iter()
            .filter(|day| self.filters.day_matches(*day))
            .flat_map(|day| self.filters.times.iter().map(move |time| day.and_time(*time)))
            .collect();
        Step::Candidates(self.filters.select_positions(walls))
    }

    /// The days of a day-level step, starting with its first day.
    fn step_days(&self, step: u64) -> Option<(NaiveDate, Vec<NaiveDate>)> {
        let (start, len) = self.step_span(step)?;
        let len = usize::try_from(len).unwrap_or_default();
        Some((start, start.iter_days().take(len).collect()))
    }

    /// First day and length in days of a day-level step.
    fn step_span(&self, step: u64) -> Option<(NaiveDate, i64)> {
        let anchor = self.anchor.date_part();
        let units = i64::try_from(step)
            .ok()?
            .checked_mul(i64::from(self.pattern.interval()))?;

        match self.filters.freq {
            Frequency::Yearly => {
                let year = i32::try_from(i64::from(anchor.year()).checked_add(units)?).ok()?;
                Some((NaiveDate::from_ymd_opt(year, 1, 1)?, year_len(year)))
            }
            Frequency::Monthly => {
                let index = (i64::from(anchor.year()) * 12 + i64::from(anchor.month0()))
                    .checked_add(units)?;
                let year = i32::try_from(index.div_euclid(12)).ok()?;
                let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
                Some((NaiveDate::from_ymd_opt(year, month, 1)?, month_len(year, month)))
            }
            Frequency::Weekly => {
                let offset = u64::try_from(units.checked_mul(7)?).ok()?;
                Some((self.week_start.checked_add_days(Days::new(offset))?, 7))
            }
            Frequency::Daily => {
                let day = anchor.checked_add_days(Days::new(u64::try_from(units).ok()?))?;
                Some((day, 1))
            }
            Frequency::Hourly | Frequency::Minutely | Frequency::Secondly => None,
        }
    }

    /// Wall-clock start of a step.
    fn step_start(&self, step: u64) -> Option<NaiveDateTime> {
        match self.filters.freq.unit_seconds() {
            Some(unit) => self.sub_daily_at(step, unit),
            None => self
                .step_span(step)
                .map(|(start, _)| start.and_time(NaiveTime::MIN)),
        }
    }

    /// The single instant a sub-daily step stands for.
    fn sub_daily_at(&self, step: u64, unit: i64) -> Option<NaiveDateTime> {
        let step_seconds = i64::from(self.pattern.interval()).checked_mul(unit)?;
        let offset = i64::try_from(step).ok()?.checked_mul(step_seconds)?;
        self.base.checked_add_signed(TimeDelta::try_seconds(offset)?)
    }

    /// A sub-daily step is a single instant; filters that fail at the day,
    /// hour or minute level jump straight to the next boundary.
    fn sub_daily_candidates(&self, step: u64, unit: i64) -> Step {
        let step_seconds = i64::from(self.pattern.interval()) * unit;
        let Some(at) = self.sub_daily_at(step, unit) else {
            return Step::Exhausted;
        };
        if self.past_stop(at) {
            return Step::Exhausted;
        }

        let f = &self.filters;
        let hour_start = at.date().and_hms_opt(at.hour(), 0, 0).unwrap_or(at);
        if !f.day_matches(at.date()) {
            let next_day = at.date().succ_opt().map(|day| day.and_time(NaiveTime::MIN));
            return match self.skip_to(next_day, step, step_seconds) {
                Step::Skip(next) => Step::SkipDay(next),
                other => other,
            };
        }
        if !f.hours.is_empty() && !f.hours.contains(&at.hour()) {
            let next_hour = hour_start.checked_add_signed(TimeDelta::hours(1));
            return self.skip_to(next_hour, step, step_seconds);
        }
        let fine = f.freq <= Frequency::Minutely;
        if fine && !f.minutes.is_empty() && !f.minutes.contains(&at.minute()) {
            let next_minute = hour_start
                .checked_add_signed(TimeDelta::minutes(i64::from(at.minute()) + 1));
            return self.skip_to(next_minute, step, step_seconds);
        }
        let second_filtered = !f.seconds.is_empty() && !f.seconds.contains(&at.second());
        if f.freq == Frequency::Secondly && second_filtered {
            return Step::Candidates(Vec::new());
        }

        let anchor = self.anchor.naive();
        let times = match f.freq {
            Frequency::Hourly => time_grid(
                &[at.hour()],
                &or_default(&f.minutes, anchor.minute()),
                &or_default(&f.seconds, anchor.second()),
            ),
            Frequency::Minutely => time_grid(
                &[at.hour()],
                &[at.minute()],
                &or_default(&f.seconds, anchor.second()),
            ),
            _ => vec![at.time()],
        };
        let walls = times.into_iter().map(|time| at.date().and_time(time)).collect();
        Step::Candidates(f.select_positions(walls))
    }

    /// First sub-daily step at or after `target`. A target past the end of
    /// the calendar ends the sequence.
    fn skip_to(&self, target: Option<NaiveDateTime>, step: u64, step_seconds: i64) -> Step {
        let Some(target) = target else {
            return Step::Exhausted;
        };
        let delta = (target - self.base).num_seconds();
        let next = (delta + step_seconds - 1).div_euclid(step_seconds);
        Step::Skip(u64::try_from(next).unwrap_or(0).max(step.saturating_add(1)))
    }

    /// Index of the step whose span contains `target`, or 0 if it precedes
    /// the anchor.
    fn step_containing(&self, target: NaiveDateTime) -> u64 {
        let anchor = self.anchor.naive();
        let units = match self.filters.freq {
            Frequency::Yearly => i64::from(target.year()) - i64::from(anchor.year()),
            Frequency::Monthly => {
                (i64::from(target.year()) - i64::from(anchor.year())) * 12
                    + i64::from(target.month0())
                    - i64::from(anchor.month0())
            }
            Frequency::Weekly => (target.date() - self.week_start).num_days().div_euclid(7),
            Frequency::Daily => (target.date() - anchor.date()).num_days(),
            Frequency::Hourly | Frequency::Minutely | Frequency::Secondly => {
                let unit = self.filters.freq.unit_seconds().unwrap_or(1);
                (target - self.base).num_seconds().div_euclid(unit)
            }
        };
        u64::try_from(units.div_euclid(i64::from(self.pattern.interval()))).unwrap_or(0)
    }
}

impl Iterator for RuleIter<'_> {
    type Item = RfcResult<DateTime>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_keyed().map(|item| item.map(|(value, _)| value))
    }
}

/// Instances of a `RuleIter` as periods of a fixed duration.
#[derive(Debug)]
pub struct Periods<'a> {
    inner: RuleIter<'a>,
    duration: Duration,
}

impl Iterator for Periods<'_> {
    type Item = RfcResult<Period>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|item| item.map(|start| Period::with_base_duration(start, self.duration)))
    }
}
