//! Parsers for the textual forms of recurrence values (RFC 5545 §3.3).
//!
//! Only value-level grammar lives here: DATE, DATE-TIME, DURATION, PERIOD,
//! UTC-OFFSET and RECUR. Content lines and components are out of scope.

mod error;
mod values;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use values::{
    parse_date, parse_date_list, parse_date_or_datetime, parse_datetime, parse_duration,
    parse_period, parse_period_list, parse_recurrence_pattern, parse_rrule, parse_utc_offset,
};
