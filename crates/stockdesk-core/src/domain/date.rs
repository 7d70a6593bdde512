use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration, Month, OffsetDateTime};

use crate::ValidationError;

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Calendar trading date, `YYYY-MM-DD` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarketDate(Date);

impl MarketDate {
    pub fn today() -> Self {
        Self(OffsetDateTime::now_utc().date())
    }

    pub const fn from_date(date: Date) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u8, day: u8) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDate {
            value: format!("{year:04}-{month:02}-{day:02}"),
        };
        let month = Month::try_from(month).map_err(|_| invalid())?;
        Date::from_calendar_date(year, month, day)
            .map(Self)
            .map_err(|_| invalid())
    }

    /// Parse `YYYY-MM-DD`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        Date::parse(input.trim(), ISO_DATE)
            .map(Self)
            .map_err(|_| ValidationError::InvalidDate {
                value: input.to_owned(),
            })
    }

    /// Parse the compact `YYYYMMDD` form used by chart feeds.
    pub fn parse_compact(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let invalid = || ValidationError::InvalidDate {
            value: input.to_owned(),
        };
        if trimmed.len() != 8 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let year = trimmed[0..4].parse::<i32>().map_err(|_| invalid())?;
        let month = trimmed[4..6].parse::<u8>().map_err(|_| invalid())?;
        let day = trimmed[6..8].parse::<u8>().map_err(|_| invalid())?;
        Self::from_ymd(year, month, day).map_err(|_| invalid())
    }

    /// Parse the dotted `YYYY.MM.DD` form used by portal listings. Anything
    /// after the date (e.g. a time of day) is ignored.
    pub fn parse_dotted(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDate {
            value: input.to_owned(),
        };
        let head = input.trim().split_whitespace().next().ok_or_else(invalid)?;
        let mut parts = head.split('.');
        let (Some(year), Some(month), Some(day)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let year = if year < 100 { 2000 + year } else { year };
        let month = month.parse::<u8>().map_err(|_| invalid())?;
        let day = day.parse::<u8>().map_err(|_| invalid())?;
        Self::from_ymd(year, month, day).map_err(|_| invalid())
    }

    pub const fn into_inner(self) -> Date {
        self.0
    }

    /// Sunday closing the Monday-based week that contains this date.
    pub fn week_end(self) -> Self {
        let days_to_sunday = 6 - i64::from(self.0.weekday().number_days_from_monday());
        self.0
            .checked_add(Duration::days(days_to_sunday))
            .map(Self)
            .unwrap_or(self)
    }

    /// Last calendar day of this date's month.
    pub fn month_end(self) -> Self {
        let date = self.0;
        let first_of_next = if date.month() == Month::December {
            Date::from_calendar_date(date.year() + 1, Month::January, 1)
        } else {
            Date::from_calendar_date(date.year(), date.month().next(), 1)
        };

        first_of_next
            .ok()
            .and_then(Date::previous_day)
            .map(Self)
            .unwrap_or(self)
    }

    /// Whole calendar days from `self` to `later` (negative if `later` is earlier).
    pub fn days_until(self, later: Self) -> i64 {
        (later.0 - self.0).whole_days()
    }
}

impl Display for MarketDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Serialize for MarketDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MarketDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}
