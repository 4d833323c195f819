//! Nanosecond-resolution timestamps.
//!
//! [`NsTime`] is a signed count of nanoseconds since the Unix epoch and is
//! the time type used throughout the crate. [`TimeParts`] holds the
//! year/day-of-year/time-of-day breakdown stored in the v3 fixed header, and
//! [`BTime`] is the packed 10-byte form used by v2 records.
//!
//! All conversions are checked: calendar values outside the representable
//! range (roughly 1677-09-21 to 2262-04-11) fail with
//! [`MseedError::InvalidTime`] instead of wrapping.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{MseedError, Result};

/// Nanoseconds per second.
pub const NSTMODULUS: i64 = 1_000_000_000;

const SECONDS_PER_DAY: i64 = 86_400;
/// `NaiveDate::num_days_from_ce()` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

/// Nanoseconds since 1970-01-01T00:00:00Z.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NsTime(i64);

impl NsTime {
    pub const EPOCH: NsTime = NsTime(0);

    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn nanos(self) -> i64 {
        self.0
    }

    /// Build a time from year, day-of-year and time of day.
    ///
    /// `second` may be 60 to express a leap second; it rolls into the next
    /// minute like any other carry.
    pub fn from_ordinal(
        year: i32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        nanosecond: u32,
    ) -> Result<Self> {
        let date = NaiveDate::from_yo_opt(year, day)
            .ok_or_else(|| MseedError::InvalidTime(format!("year {year}, day {day}")))?;
        Self::from_date(date, hour, minute, second, nanosecond)
    }

    /// Build a time from a calendar date (month 1-12, day of month).
    pub fn from_ymd(
        year: i32,
        month: u32,
        mday: u32,
        hour: u32,
        minute: u32,
        second: u32,
        nanosecond: u32,
    ) -> Result<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, mday).ok_or_else(|| {
            MseedError::InvalidTime(format!("date {year:04}-{month:02}-{mday:02}"))
        })?;
        Self::from_date(date, hour, minute, second, nanosecond)
    }

    fn from_date(
        date: NaiveDate,
        hour: u32,
        minute: u32,
        second: u32,
        nanosecond: u32,
    ) -> Result<Self> {
        if hour > 23 || minute > 59 || second > 60 || nanosecond >= NSTMODULUS as u32 {
            return Err(MseedError::InvalidTime(format!(
                "time of day {hour:02}:{minute:02}:{second:02}.{nanosecond:09}"
            )));
        }
        let days = date.num_days_from_ce() as i64 - UNIX_EPOCH_DAYS_FROM_CE;
        let seconds = days * SECONDS_PER_DAY
            + hour as i64 * 3600
            + minute as i64 * 60
            + second as i64;
        let nanos = (seconds as i128) * NSTMODULUS as i128 + nanosecond as i128;
        i64::try_from(nanos)
            .map(Self)
            .map_err(|_| MseedError::InvalidTime(format!("{date} is out of range")))
    }

    /// Build a time from the v3 header components.
    pub fn from_parts(parts: &TimeParts) -> Result<Self> {
        Self::from_ordinal(
            parts.year as i32,
            parts.day as u32,
            parts.hour as u32,
            parts.minute as u32,
            parts.second as u32,
            parts.nanosecond,
        )
    }

    /// Build a time from a legacy [`BTime`]; `fract` is in 100 µs units.
    pub fn from_btime(bt: &BTime) -> Result<Self> {
        Self::from_ordinal(
            bt.year as i32,
            bt.day as u32,
            bt.hour as u32,
            bt.minute as u32,
            bt.second as u32,
            bt.fract as u32 * 100_000,
        )
    }

    /// Seconds since the epoch, rounded to the nearest microsecond.
    pub fn from_epoch_seconds(seconds: f64) -> Result<Self> {
        if !seconds.is_finite() {
            return Err(MseedError::InvalidTime(format!("{seconds} seconds")));
        }
        let micros = (seconds * 1_000_000.0).round();
        if micros.abs() > (i64::MAX / 1000) as f64 {
            return Err(MseedError::InvalidTime(format!("{seconds} seconds")));
        }
        Ok(Self(micros as i64 * 1000))
    }

    pub fn epoch_seconds(self) -> f64 {
        self.0 as f64 / NSTMODULUS as f64
    }

    pub fn checked_add_nanos(self, nanos: i64) -> Result<Self> {
        self.0
            .checked_add(nanos)
            .map(Self)
            .ok_or_else(|| MseedError::InvalidTime(format!("{} + {nanos} ns overflows", self.0)))
    }

    /// Time of the sample `offset` samples away at `rate_hz`.
    pub fn sample_time(self, offset: i64, rate_hz: f64) -> Result<Self> {
        if offset == 0 || rate_hz <= 0.0 || !rate_hz.is_finite() {
            return Ok(self);
        }
        let delta = (offset as f64 / rate_hz * NSTMODULUS as f64).round();
        if delta.abs() >= i64::MAX as f64 {
            return Err(MseedError::InvalidTime(format!(
                "sample offset {offset} at {rate_hz} Hz overflows"
            )));
        }
        self.checked_add_nanos(delta as i64)
    }

    /// Split into year/day-of-year/time-of-day components.
    pub fn to_parts(self) -> Result<TimeParts> {
        let seconds = self.0.div_euclid(NSTMODULUS);
        let nanosecond = self.0.rem_euclid(NSTMODULUS) as u32;
        let days = seconds.div_euclid(SECONDS_PER_DAY);
        let secs_of_day = seconds.rem_euclid(SECONDS_PER_DAY);
        let date = date_from_epoch_days(days)?;
        let year = u16::try_from(date.year())
            .map_err(|_| MseedError::InvalidTime(format!("year {} before 0", date.year())))?;
        Ok(TimeParts {
            year,
            day: date.ordinal() as u16,
            hour: (secs_of_day / 3600) as u8,
            minute: (secs_of_day % 3600 / 60) as u8,
            second: (secs_of_day % 60) as u8,
            nanosecond,
        })
    }

    /// Convert to a [`BTime`]; precision below 100 µs is truncated.
    pub fn to_btime(self) -> Result<BTime> {
        let p = self.to_parts()?;
        Ok(BTime {
            year: p.year,
            day: p.day,
            hour: p.hour,
            minute: p.minute,
            second: p.second,
            fract: (p.nanosecond / 100_000) as u16,
        })
    }

    /// Parse a date-time string.
    ///
    /// Accepted forms:
    /// - `YYYY[-MM-DD][Thh[:mm[:ss[.fffffffff]]]][Z]` (space also separates)
    /// - `YYYY-DDD[Thh:mm:ss.fff]` (day-of-year)
    /// - `YYYY,DDD[,hh:mm:ss.ffff]` (SEED ordinal)
    /// - `ssssssssss[.fffffffff]` (epoch seconds, full nanosecond precision)
    pub fn parse(s: &str) -> Result<Self> {
        let bad = || MseedError::InvalidTime(format!("unrecognized time string {s:?}"));
        let text = s.trim();
        let text = text.strip_suffix(['Z', 'z']).unwrap_or(text);
        if text.is_empty() {
            return Err(bad());
        }

        if is_epoch_string(text) {
            return parse_epoch(text).ok_or_else(bad);
        }

        let (date_part, time_part) = if text.contains(',') {
            let mut it = text.splitn(3, ',');
            let year = it.next().unwrap_or_default();
            let doy = it.next().ok_or_else(bad)?;
            let date = parse_date_fields(&[year, doy]).ok_or_else(bad)?;
            (date, it.next())
        } else {
            let mut it = text.splitn(2, ['T', 't', ' ']);
            let date_str = it.next().unwrap_or_default();
            let fields: Vec<&str> = date_str.split('-').collect();
            let date = parse_date_fields(&fields).ok_or_else(bad)?;
            (date, it.next())
        };

        let (hour, minute, second, nanosecond) = match time_part {
            Some(t) if !t.is_empty() => parse_time_of_day(t).ok_or_else(bad)?,
            _ => (0, 0, 0, 0),
        };
        Self::from_date(date_part, hour, minute, second, nanosecond)
    }

    /// Render in one of the [`TimeFormat`] layouts.
    pub fn format(self, format: TimeFormat, subsecond: SubSecond) -> Result<String> {
        let nanos_of_second = self.0.rem_euclid(NSTMODULUS) as u32;
        let frac = subsecond.render(nanos_of_second);
        let (separator, zone, with_doy) = match format {
            TimeFormat::UnixEpoch => {
                return Ok(format!("{}{frac}", self.0.div_euclid(NSTMODULUS)));
            }
            TimeFormat::NanosecondEpoch => return Ok(self.0.to_string()),
            TimeFormat::SeedOrdinal => {
                let p = self.to_parts()?;
                return Ok(format!(
                    "{:04},{:03},{:02}:{:02}:{:02}{frac}",
                    p.year, p.day, p.hour, p.minute, p.second
                ));
            }
            TimeFormat::IsoMonthDay => ('T', "", false),
            TimeFormat::IsoMonthDayZ => ('T', "Z", false),
            TimeFormat::IsoMonthDayDoy => (' ', "", true),
            TimeFormat::IsoMonthDayDoyZ => (' ', "Z", true),
            TimeFormat::IsoMonthDaySpace => (' ', "", false),
            TimeFormat::IsoMonthDaySpaceZ => (' ', "Z", false),
        };

        let p = self.to_parts()?;
        let date = NaiveDate::from_yo_opt(p.year as i32, p.day as u32)
            .ok_or_else(|| MseedError::InvalidTime(format!("{p}")))?;
        let mut text = format!(
            "{:04}-{:02}-{:02}{separator}{:02}:{:02}:{:02}{frac}{zone}",
            p.year,
            date.month(),
            date.day(),
            p.hour,
            p.minute,
            p.second
        );
        if with_doy {
            text.push_str(&format!(" ({:03})", p.day));
        }
        Ok(text)
    }
}

impl FromStr for NsTime {
    type Err = MseedError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for NsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format(TimeFormat::IsoMonthDayZ, SubSecond::NanoMicroNone) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{}ns", self.0),
        }
    }
}

fn date_from_epoch_days(days: i64) -> Result<NaiveDate> {
    i32::try_from(days + UNIX_EPOCH_DAYS_FROM_CE)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| MseedError::InvalidTime(format!("{days} days from epoch")))
}

fn is_epoch_string(text: &str) -> bool {
    let body = text.strip_prefix(['-', '+']).unwrap_or(text);
    !body.is_empty()
        && body.chars().all(|c| c.is_ascii_digit() || c == '.')
        && (body.contains('.') || body.len() > 4 || text.starts_with(['-', '+']))
}

fn parse_epoch(text: &str) -> Option<NsTime> {
    let negative = text.starts_with('-');
    let body = text.strip_prefix(['-', '+']).unwrap_or(text);
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    let secs: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };
    let frac = parse_fraction(frac_part)? as i64;
    let magnitude = secs.checked_mul(NSTMODULUS)?.checked_add(frac)?;
    Some(NsTime(if negative { -magnitude } else { magnitude }))
}

/// Parse up to nine fractional-second digits into nanoseconds.
fn parse_fraction(frac: &str) -> Option<u32> {
    if frac.is_empty() {
        return Some(0);
    }
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let digits: String = frac.chars().take(9).collect();
    let value: u32 = digits.parse().ok()?;
    Some(value * 10u32.pow(9 - digits.len() as u32))
}

fn parse_date_fields(fields: &[&str]) -> Option<NaiveDate> {
    let year: i32 = fields.first()?.parse().ok()?;
    match fields.len() {
        1 => NaiveDate::from_yo_opt(year, 1),
        2 => NaiveDate::from_yo_opt(year, fields[1].parse().ok()?),
        3 => NaiveDate::from_ymd_opt(year, fields[1].parse().ok()?, fields[2].parse().ok()?),
        _ => None,
    }
}

fn parse_time_of_day(t: &str) -> Option<(u32, u32, u32, u32)> {
    let (hms, frac) = t.split_once('.').unwrap_or((t, ""));
    let mut it = hms.split(':');
    let hour = it.next()?.parse().ok()?;
    let minute = it.next().map_or(Some(0), |m| m.parse().ok())?;
    let second = it.next().map_or(Some(0), |s| s.parse().ok())?;
    if it.next().is_some() {
        return None;
    }
    Some((hour, minute, second, parse_fraction(frac)?))
}

/// Layouts for [`NsTime::format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFormat {
    /// `YYYY-MM-DDThh:mm:ss.sssssssss`
    IsoMonthDay,
    /// `YYYY-MM-DDThh:mm:ss.sssssssssZ`
    IsoMonthDayZ,
    /// `YYYY-MM-DD hh:mm:ss.sssssssss (doy)`
    IsoMonthDayDoy,
    /// `YYYY-MM-DD hh:mm:ss.sssssssssZ (doy)`
    IsoMonthDayDoyZ,
    /// `YYYY-MM-DD hh:mm:ss.sssssssss`
    IsoMonthDaySpace,
    /// `YYYY-MM-DD hh:mm:ss.sssssssssZ`
    IsoMonthDaySpaceZ,
    /// `YYYY,DDD,hh:mm:ss.sssssssss`
    SeedOrdinal,
    /// `ssssssssss.sssssssss`
    UnixEpoch,
    /// `sssssssssssssssssss`
    NanosecondEpoch,
}

/// Sub-second resolution for [`NsTime::format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubSecond {
    None,
    Micro,
    Nano,
    /// Microseconds if the sub-second part is non-zero.
    MicroNone,
    /// Nanoseconds if the sub-second part is non-zero.
    NanoNone,
    /// Nanoseconds if there are sub-microseconds, otherwise microseconds.
    NanoMicro,
    /// Like `NanoMicro`, but nothing when the sub-second part is zero.
    NanoMicroNone,
}

impl SubSecond {
    fn render(self, nanos: u32) -> String {
        let micro = || format!(".{:06}", nanos / 1000);
        let nano = || format!(".{nanos:09}");
        match self {
            Self::None => String::new(),
            Self::Micro => micro(),
            Self::Nano => nano(),
            Self::MicroNone if nanos == 0 => String::new(),
            Self::MicroNone => micro(),
            Self::NanoNone if nanos == 0 => String::new(),
            Self::NanoNone => nano(),
            Self::NanoMicro | Self::NanoMicroNone if nanos % 1000 != 0 => nano(),
            Self::NanoMicroNone if nanos == 0 => String::new(),
            Self::NanoMicro | Self::NanoMicroNone => micro(),
        }
    }
}

/// Year, day-of-year and time-of-day, as stored in the v3 fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeParts {
    pub year: u16,
    pub day: u16,        // 1-366
    pub hour: u8,        // 0-23
    pub minute: u8,      // 0-59
    pub second: u8,      // 0-60 (60 for leap second)
    pub nanosecond: u32, // 0-999_999_999
}

impl fmt::Display for TimeParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:03} {:02}:{:02}:{:02}.{:09}",
            self.year, self.day, self.hour, self.minute, self.second, self.nanosecond
        )
    }
}

/// Legacy BTIME timestamp (10 bytes in the miniSEED v2 fixed header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTime {
    pub year: u16,
    pub day: u16,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub fract: u16, // 0.0001 second units
}

impl fmt::Display for BTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:03} {:02}:{:02}:{:02}.{:04}",
            self.year, self.day, self.hour, self.minute, self.second, self.fract
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_is_zero() {
        let t = NsTime::from_ordinal(1970, 1, 0, 0, 0, 0).unwrap();
        assert_eq!(t, NsTime::EPOCH);
        assert_eq!(t.to_string(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_btime_roundtrip() {
        let bt = BTime {
            year: 2024,
            day: 15,
            hour: 10,
            minute: 30,
            second: 45,
            fract: 1234,
        };
        let t = NsTime::from_btime(&bt).unwrap();
        assert_eq!(t.nanos() % NSTMODULUS, 123_400_000);
        assert_eq!(t.to_btime().unwrap(), bt);
    }

    #[test]
    fn test_btime_truncates_sub_fract() {
        let t = NsTime::from_ordinal(2025, 100, 12, 0, 0, 123_456_789).unwrap();
        let bt = t.to_btime().unwrap();
        assert_eq!(bt.fract, 1234);
        let back = NsTime::from_btime(&bt).unwrap();
        assert_eq!(back.nanos() % NSTMODULUS, 123_400_000);
    }

    #[test]
    fn test_parts_roundtrip() {
        let parts = TimeParts {
            year: 2024,
            day: 366,
            hour: 23,
            minute: 59,
            second: 59,
            nanosecond: 999_999_999,
        };
        let t = NsTime::from_parts(&parts).unwrap();
        assert_eq!(t.to_parts().unwrap(), parts);
        assert_eq!(format!("{parts}"), "2024-366 23:59:59.999999999");
    }

    #[test]
    fn test_leap_second_rolls_over() {
        let leap = NsTime::from_ordinal(2016, 366, 23, 59, 60, 0).unwrap();
        let next = NsTime::from_ordinal(2017, 1, 0, 0, 0, 0).unwrap();
        assert_eq!(leap, next);
    }

    #[test]
    fn test_pre_epoch_parts() {
        let t = NsTime::from_ymd(1969, 12, 31, 23, 59, 59, 500_000_000).unwrap();
        assert_eq!(t.nanos(), -500_000_000);
        let p = t.to_parts().unwrap();
        assert_eq!((p.year, p.day, p.second, p.nanosecond), (1969, 365, 59, 500_000_000));
    }

    #[test]
    fn test_out_of_range_fails() {
        assert!(matches!(
            NsTime::from_ordinal(2300, 1, 0, 0, 0, 0),
            Err(MseedError::InvalidTime(_))
        ));
        assert!(NsTime::from_ordinal(2023, 366, 0, 0, 0, 0).is_err());
        assert!(NsTime::from_ordinal(2023, 1, 24, 0, 0, 0).is_err());
        assert!(NsTime::from_nanos(i64::MAX).checked_add_nanos(1).is_err());
    }

    #[test]
    fn test_parse_forms() {
        let expected = NsTime::from_ymd(2024, 1, 1, 15, 13, 55, 123_456_789).unwrap();
        assert_eq!(NsTime::parse("2024-01-01T15:13:55.123456789Z").unwrap(), expected);
        assert_eq!(NsTime::parse("2024-01-01 15:13:55.123456789").unwrap(), expected);
        assert_eq!(NsTime::parse("2024-001T15:13:55.123456789").unwrap(), expected);
        assert_eq!(NsTime::parse("2024,001,15:13:55.123456789").unwrap(), expected);
        assert_eq!(
            NsTime::parse("1704122035.123456789").unwrap(),
            expected
        );
        assert_eq!(
            NsTime::parse("2024-02-03").unwrap(),
            NsTime::from_ymd(2024, 2, 3, 0, 0, 0, 0).unwrap()
        );
        assert_eq!(
            NsTime::parse("2024-02-03T04:05").unwrap(),
            NsTime::from_ymd(2024, 2, 3, 4, 5, 0, 0).unwrap()
        );
        assert_eq!(
            "2024,034,01:02:03.5".parse::<NsTime>().unwrap(),
            NsTime::from_ymd(2024, 2, 3, 1, 2, 3, 500_000_000).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(NsTime::parse("").is_err());
        assert!(NsTime::parse("yesterday").is_err());
        assert!(NsTime::parse("2024-13-01").is_err());
        assert!(NsTime::parse("2024-01-01T25:00:00").is_err());
    }

    #[test]
    fn test_format_variants() {
        let t = NsTime::from_ymd(2024, 2, 3, 4, 5, 6, 789_000_000).unwrap();
        let f = |fmt, sub| t.format(fmt, sub).unwrap();
        assert_eq!(
            f(TimeFormat::IsoMonthDay, SubSecond::Nano),
            "2024-02-03T04:05:06.789000000"
        );
        assert_eq!(
            f(TimeFormat::IsoMonthDayZ, SubSecond::NanoMicroNone),
            "2024-02-03T04:05:06.789000Z"
        );
        assert_eq!(
            f(TimeFormat::IsoMonthDayDoy, SubSecond::None),
            "2024-02-03 04:05:06 (034)"
        );
        assert_eq!(
            f(TimeFormat::SeedOrdinal, SubSecond::Micro),
            "2024,034,04:05:06.789000"
        );
        assert_eq!(
            f(TimeFormat::UnixEpoch, SubSecond::Micro),
            "1706933106.789000"
        );
        assert_eq!(
            f(TimeFormat::NanosecondEpoch, SubSecond::None),
            "1706933106789000000"
        );
        assert_eq!(
            f(TimeFormat::IsoMonthDayDoyZ, SubSecond::None),
            "2024-02-03 04:05:06Z (034)"
        );
        assert_eq!(
            f(TimeFormat::IsoMonthDaySpaceZ, SubSecond::Micro),
            "2024-02-03 04:05:06.789000Z"
        );
    }

    #[test]
    fn test_subsecond_variants() {
        assert_eq!(SubSecond::NanoMicroNone.render(0), "");
        assert_eq!(SubSecond::NanoMicroNone.render(5_000), ".000005");
        assert_eq!(SubSecond::NanoMicroNone.render(5_001), ".000005001");
        assert_eq!(SubSecond::NanoMicro.render(0), ".000000");
        assert_eq!(SubSecond::MicroNone.render(0), "");
        assert_eq!(SubSecond::NanoNone.render(1), ".000000001");
    }

    #[test]
    fn test_epoch_seconds_rounds_to_micro() {
        let t = NsTime::from_epoch_seconds(1267253400.019539).unwrap();
        assert_eq!(t.nanos(), 1267253400019539000);
        assert!((t.epoch_seconds() - 1267253400.019539).abs() < 1e-6);
    }

    #[test]
    fn test_sample_time() {
        let start = NsTime::parse("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(
            start.sample_time(100, 40.0).unwrap().nanos() - start.nanos(),
            2_500_000_000
        );
        assert_eq!(
            start.sample_time(-1, 20.0).unwrap().nanos() - start.nanos(),
            -50_000_000
        );
        assert_eq!(start.sample_time(10, 0.0).unwrap(), start);
    }
}
