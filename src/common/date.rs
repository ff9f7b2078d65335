use std::fmt::{self, Debug, Display};
use std::str::FromStr;

/// A date error.
#[derive(Debug, PartialEq, Eq)]
pub struct DateError;

impl std::error::Error for DateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl std::fmt::Display for DateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unable to decode date")
    }
}

const DAYS_PER_MONTH: [u8; 13] = [0, 31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// A game date with an optional hour component.
///
/// Clausewitz games do not follow a traditional calendar: every year is
/// treated as a non-leap year. Years can be negative but can't be zero.
///
/// An hour is considered present if it is non-zero, so games with hours run
/// on a clock from 1-24 instead of 0-23.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    year: i16,
    month: u8,
    day: u8,
    hour: u8,
}

impl Debug for Date {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Date {}", self)
    }
}

impl Date {
    /// Create a new date from year, month, and day parts
    ///
    /// Will return `None` if the date does not exist
    ///
    /// ```
    /// use clausewitz_save::common::Date;
    /// assert_eq!(Date::from_ymd_opt(1444, 11, 11), Some(Date::from_ymd(1444, 11, 11)));
    /// assert!(Date::from_ymd_opt(800, 0, 3).is_none());
    /// assert!(Date::from_ymd_opt(800, 13, 1).is_none());
    /// assert!(Date::from_ymd_opt(800, 12, 32).is_none());
    /// assert!(Date::from_ymd_opt(2020, 2, 29).is_none());
    /// assert!(Date::from_ymd_opt(0, 2, 1).is_none());
    /// ```
    pub fn from_ymd_opt(year: i16, month: u8, day: u8) -> Option<Self> {
        Self::from_ymdh_opt(year, month, day, 0)
    }

    /// Create a new date with an hour component. An hour of zero means
    /// there is no hour.
    pub fn from_ymdh_opt(year: i16, month: u8, day: u8, hour: u8) -> Option<Self> {
        let valid = year != 0
            && (1..=12).contains(&month)
            && day != 0
            && day <= DAYS_PER_MONTH[usize::from(month)]
            && hour < 25;

        valid.then_some(Date {
            year,
            month,
            day,
            hour,
        })
    }

    /// Create a new date from year, month, and day parts
    ///
    /// Will panic if the date does not exist.
    pub fn from_ymd(year: i16, month: u8, day: u8) -> Self {
        match Self::from_ymd_opt(year, month, day) {
            Some(date) => date,
            None => panic!("invalid date: {}.{}.{}", year, month, day),
        }
    }

    /// Parses `Y.M.D` or `Y.M.D.H`. A zero hour is disallowed, so the hour
    /// must be omitted for a date without a time component.
    ///
    /// ```
    /// use clausewitz_save::common::Date;
    /// let date = Date::parse("1444.11.11").expect("to parse date");
    /// assert_eq!(date.year(), 1444);
    /// assert_eq!(date.month(), 11);
    /// assert_eq!(date.day(), 11);
    /// assert!(!date.has_hour());
    ///
    /// let date = Date::parse("1936.1.1.12").expect("to parse date");
    /// assert_eq!(date.hour(), 12);
    /// ```
    pub fn parse<T: AsRef<[u8]>>(s: T) -> Result<Self, DateError> {
        let data = s.as_ref();
        let (negative, data) = match data.split_first() {
            Some((b'-', rest)) => (true, rest),
            _ => (false, data),
        };

        let mut parts = data.split(|&x| x == b'.');
        let year = parts.next().and_then(parse_component).ok_or(DateError)?;
        let month = parts.next().and_then(parse_component).ok_or(DateError)?;
        let day = parts.next().and_then(parse_component).ok_or(DateError)?;
        let hour = match parts.next() {
            Some(x) => match parse_component(x) {
                Some(0) | None => return Err(DateError),
                Some(h) => h,
            },
            None => 0,
        };

        if parts.next().is_some() {
            return Err(DateError);
        }

        let year = if negative {
            -i64::from(year)
        } else {
            i64::from(year)
        };
        let year = i16::try_from(year).map_err(|_| DateError)?;
        let month = u8::try_from(month).map_err(|_| DateError)?;
        let day = u8::try_from(day).map_err(|_| DateError)?;
        let hour = u8::try_from(hour).map_err(|_| DateError)?;
        Self::from_ymdh_opt(year, month, day, hour).ok_or(DateError)
    }

    /// Return the year
    pub fn year(&self) -> i16 {
        self.year
    }

    /// Returns the month. Range: [1, 12]
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Return the day
    pub fn day(&self) -> u8 {
        self.day
    }

    /// Return the hour component. Range [1, 24]. If zero, then there is no hour
    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// Return if this date has an hour component
    pub fn has_hour(&self) -> bool {
        self.hour != 0
    }

    /// Formats the date in the game format: `Y.M.D` or `Y.M.D.H`
    ///
    /// ```
    /// use clausewitz_save::common::Date;
    /// let date = Date::from_ymd(1400, 1, 2);
    /// assert_eq!(date.game_fmt(), String::from("1400.1.2"));
    /// ```
    pub fn game_fmt(&self) -> String {
        self.to_string()
    }
}

fn parse_component(data: &[u8]) -> Option<u32> {
    if data.is_empty() || data.len() > 5 || !data.iter().all(u8::is_ascii_digit) {
        return None;
    }

    Some(
        data.iter()
            .fold(0u32, |acc, &x| acc * 10 + u32::from(x - b'0')),
    )
}

impl Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_hour() {
            write!(f, "{}.{}.{}.{}", self.year, self.month, self.day, self.hour)
        } else {
            write!(f, "{}.{}.{}", self.year, self.month, self.day)
        }
    }
}

impl FromStr for Date {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes())
    }
}
