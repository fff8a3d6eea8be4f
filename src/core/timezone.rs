//! Server timezone that submission times are rendered in.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Offset, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use super::error::CoreError;

/// A fixed UTC offset, or an IANA zone whose offset follows its
/// daylight-saving rules.
///
/// Accepts `UTC`, `Z`, `+HH`, `+HHMM`, `+HH:MM` (or `-`) and zone names such
/// as `Europe/Berlin`.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timezone {
    Fixed(UtcOffset),
    Named(Tz),
}

impl Timezone {
    pub const UTC: Timezone = Timezone::Fixed(UtcOffset::UTC);

    pub fn parse(raw: &str) -> Result<Self, String> {
        let s = raw.trim();
        if s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("gmt") || s == "Z" {
            return Ok(Self::UTC);
        }
        let invalid = || {
            format!("invalid timezone `{raw}`: expected UTC, [+-]HH:MM or a zone name")
        };
        match s.as_bytes().first() {
            Some(b'+' | b'-') => parse_fixed(s).map(Self::Fixed).ok_or_else(invalid),
            _ => Tz::from_str(s).map(Self::Named).map_err(|_| invalid()),
        }
    }

    /// Offset in effect at `at`.
    pub fn offset_at(self, at: OffsetDateTime) -> Result<UtcOffset, CoreError> {
        match self {
            Timezone::Fixed(offset) => Ok(offset),
            Timezone::Named(tz) => {
                let utc = DateTime::from_timestamp(at.unix_timestamp(), 0)
                    .ok_or_else(|| out_of_range(at))?;
                let seconds = tz
                    .offset_from_utc_datetime(&utc.naive_utc())
                    .fix()
                    .local_minus_utc();
                UtcOffset::from_whole_seconds(seconds)
                    .map_err(|e| CoreError::DateFormat(e.to_string()))
            }
        }
    }

    /// `at` as wall-clock time in this zone.
    pub fn localize(self, at: OffsetDateTime) -> Result<OffsetDateTime, CoreError> {
        let offset = self.offset_at(at)?;
        at.checked_to_offset(offset).ok_or_else(|| out_of_range(at))
    }
}

fn parse_fixed(s: &str) -> Option<UtcOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1i8, &s[1..]),
        b'-' => (-1i8, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) || !matches!(digits.len(), 2 | 4) {
        return None;
    }
    let hours: i8 = digits[..2].parse().ok()?;
    let minutes: i8 = if digits.len() == 4 {
        digits[2..].parse().ok()?
    } else {
        0
    };
    if minutes >= 60 {
        return None;
    }
    UtcOffset::from_hms(sign * hours, sign * minutes, 0).ok()
}

fn out_of_range(at: OffsetDateTime) -> CoreError {
    CoreError::DateFormat(format!(
        "timestamp {} is out of range in the configured timezone",
        at.unix_timestamp()
    ))
}

impl Default for Timezone {
    fn default() -> Self {
        Self::UTC
    }
}

impl From<UtcOffset> for Timezone {
    fn from(offset: UtcOffset) -> Self {
        Timezone::Fixed(offset)
    }
}

impl From<Tz> for Timezone {
    fn from(tz: Tz) -> Self {
        Timezone::Named(tz)
    }
}

impl TryFrom<String> for Timezone {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<Timezone> for String {
    fn from(tz: Timezone) -> Self {
        tz.to_string()
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timezone::Fixed(offset) => {
                let (h, m, _) = offset.as_hms();
                let sign = if offset.is_negative() { '-' } else { '+' };
                write!(f, "{sign}{:02}:{:02}", h.unsigned_abs(), m.unsigned_abs())
            }
            Timezone::Named(tz) => f.write_str(tz.name()),
        }
    }
}

impl fmt::Debug for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timezone({self})")
    }
}
