//! iCalendar (RFC 5545) recurrence support.
//!
//! - `core`: date-time, duration, period and recurrence pattern values
//! - `parse`: value-level parsers for the textual forms of those values
//! - `expand`: time zone resolution, rule evaluation and occurrence merging

pub mod core;
pub mod expand;
pub mod parse;
