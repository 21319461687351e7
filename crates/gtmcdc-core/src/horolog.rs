//! `$HOROLOG` timestamp utilities.
//!
//! A horolog is `ddddd,sssss`: days after 1841-01-01 and seconds after
//! midnight of that day. Timestamps produced here count seconds from the
//! horolog day 47117 and never apply a timezone.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

/// Horolog day of the timestamp origin.
pub const EPOCH_DAY: i64 = 47_117;

/// Largest day accepted by the database (9999-12-31).
pub const MAX_DAY: i64 = 2_980_013;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// A validated `day,seconds` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Horolog {
    pub day: i64,
    pub seconds: i64,
}

impl Horolog {
    pub fn new(day: i64, seconds: i64) -> Result<Self> {
        if !(0..=MAX_DAY).contains(&day) || !(0..SECONDS_PER_DAY).contains(&seconds) {
            return Err(Error::NotHorologFormat(format!("{day},{seconds}")));
        }
        Ok(Self { day, seconds })
    }

    /// Seconds since the timestamp origin.
    pub fn to_timestamp(self) -> Result<i64> {
        let ts = (self.day - EPOCH_DAY) * SECONDS_PER_DAY + self.seconds;
        if ts < 0 {
            return Err(Error::DatePriorToEpoch(self.to_string()));
        }
        Ok(ts)
    }

    /// Inverse of [`Horolog::to_timestamp`].
    pub fn from_timestamp(ts: i64) -> Result<Self> {
        if ts < 0 {
            return Err(Error::DatePriorToEpoch(ts.to_string()));
        }
        Self::new(
            ts.div_euclid(SECONDS_PER_DAY) + EPOCH_DAY,
            ts.rem_euclid(SECONDS_PER_DAY),
        )
    }

    /// Absolute calendar time of this horolog.
    pub fn to_datetime(self) -> Result<NaiveDateTime> {
        NaiveDate::from_ymd_opt(1841, 1, 1)
            .and_then(|origin| origin.checked_add_signed(Duration::days(self.day)))
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .and_then(|midnight| midnight.checked_add_signed(Duration::seconds(self.seconds)))
            .ok_or_else(|| Error::NotHorologFormat(self.to_string()))
    }
}

impl FromStr for Horolog {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::NotHorologFormat(s.to_string());

        let (day, seconds) = s.split_once(',').ok_or_else(invalid)?;
        if seconds.contains(',') {
            return Err(invalid());
        }

        let day: i64 = day.parse().map_err(|_| invalid())?;
        let seconds: i64 = seconds.parse().map_err(|_| invalid())?;

        Self::new(day, seconds).map_err(|_| invalid())
    }
}

impl fmt::Display for Horolog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.day, self.seconds)
    }
}

/// Heartbeat forms sent during replication; they all decode to 0.
fn is_sentinel(s: &str) -> bool {
    matches!(s, "" | "," | "0" | "0,0")
}

/// Decode a horolog string into seconds since the timestamp origin.
///
/// GT.M sends `0,0` during replication (YottaDB may send an empty field),
/// so the sentinel forms yield `0` without validation.
pub fn decode(horolog: &str) -> Result<i64> {
    if is_sentinel(horolog) {
        return Ok(0);
    }
    horolog.parse::<Horolog>()?.to_timestamp()
}

/// Encode seconds since the timestamp origin as a horolog string.
pub fn encode(ts: i64) -> Result<String> {
    Horolog::from_timestamp(ts).map(|h| h.to_string())
}

/// Calendar time of a horolog string. Sentinels are not special here.
pub fn to_datetime(horolog: &str) -> Result<NaiveDateTime> {
    horolog.parse::<Horolog>()?.to_datetime()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_decode_sentinels() {
        assert_eq!(decode("0,0").unwrap(), 0);
        assert_eq!(decode("").unwrap(), 0);
        assert_eq!(decode(",").unwrap(), 0);
        assert_eq!(decode("0").unwrap(), 0);
    }

    #[test]
    fn test_decode_valid() {
        assert_eq!(decode("47117,0").unwrap(), 0);
        assert_eq!(decode("47117,86399").unwrap(), 86_399);
        assert_eq!(decode("65282,59700").unwrap(), 1_569_515_700);
    }

    #[test]
    fn test_decode_out_of_range() {
        assert!(matches!(
            decode("29800130,1234"),
            Err(Error::NotHorologFormat(_))
        ));
        assert!(matches!(
            decode("65282,86400"),
            Err(Error::NotHorologFormat(_))
        ));
        assert!(matches!(decode("-1,0"), Err(Error::NotHorologFormat(_))));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(decode("abc,12"), Err(Error::NotHorologFormat(_))));
        assert!(matches!(decode("65282"), Err(Error::NotHorologFormat(_))));
        assert!(matches!(
            decode("65282,1,2"),
            Err(Error::NotHorologFormat(_))
        ));
        assert!(matches!(decode("65282,"), Err(Error::NotHorologFormat(_))));
    }

    #[test]
    fn test_decode_prior_to_epoch() {
        assert!(matches!(
            decode("47116,86399"),
            Err(Error::DatePriorToEpoch(_))
        ));
        assert!(matches!(decode("1,0"), Err(Error::DatePriorToEpoch(_))));
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(0).unwrap(), "47117,0");
        assert_eq!(encode(1_569_515_700).unwrap(), "65282,59700");
        assert!(matches!(encode(-1), Err(Error::DatePriorToEpoch(_))));
    }

    #[test]
    fn test_horolog_roundtrip() {
        let pairs = [
            (EPOCH_DAY, 0),
            (EPOCH_DAY, 86_399),
            (65_282, 59_700),
            (100_000, 1),
            (MAX_DAY, 86_399),
        ];

        for (day, seconds) in pairs {
            let ts = Horolog::new(day, seconds).unwrap().to_timestamp().unwrap();
            let back = Horolog::from_timestamp(ts).unwrap();
            assert_eq!(back, Horolog { day, seconds }, "Roundtrip failed for {}", ts);
            assert_eq!(decode(&encode(ts).unwrap()).unwrap(), ts);
        }
    }

    #[test]
    fn test_to_datetime() {
        let origin = to_datetime("0,0").unwrap();
        assert_eq!(origin.year(), 1841);
        assert_eq!(origin.month(), 1);
        assert_eq!(origin.day(), 1);

        let t = to_datetime("65282,59700").unwrap();
        assert_eq!(t.year(), 2019);
        assert_eq!(t.month(), 9);
        assert_eq!(t.day(), 27);
        assert_eq!(t.hour(), 16);
        assert_eq!(t.minute(), 35);
        assert_eq!(t.nanosecond(), 0);

        assert!(to_datetime(",").is_err());
    }
}
