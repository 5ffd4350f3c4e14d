//! Recurrence evaluation for RFC 5545 calendar data.
//!
//! The crate expands `RRULE` patterns into ordered occurrence timelines,
//! folds in `RDATE`/`EXDATE` lists and `RECURRENCE-ID` overrides, and resolves
//! the time zones those values are bound to.

pub mod error;
pub mod rfc;
