//! Budget periods (calendar months) and report date ranges

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A calendar month, the unit for budgets and period aggregation.
///
/// Serialized as `YYYY-MM`. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period(NaiveDate);

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// The month a date falls in
    pub fn containing(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next().0.pred_opt().unwrap_or(self.0)
    }

    pub fn next(&self) -> Self {
        Self(self.0.checked_add_months(Months::new(1)).unwrap_or(self.0))
    }

    pub fn prev(&self) -> Self {
        Self(self.0.checked_sub_months(Months::new(1)).unwrap_or(self.0))
    }

    /// Whole-month date range
    pub fn range(&self) -> DateRange {
        DateRange {
            from: self.first_day(),
            to: self.last_day(),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got '{}'", s))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("expected YYYY-MM, got '{}'", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("expected YYYY-MM, got '{}'", s))?;
        Self::new(year, month).ok_or_else(|| format!("no such month: {}", s))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl TryFrom<String> for Period {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

/// Inclusive date range used for queries and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting one that ends before it starts
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        let range = Self { from, to };
        range.check()?;
        Ok(range)
    }

    pub fn day(date: NaiveDate) -> Self {
        Self {
            from: date,
            to: date,
        }
    }

    /// Ranges arriving over the wire are deserialized unchecked
    pub fn check(&self) -> Result<()> {
        if self.from > self.to {
            return Err(Error::validation(
                "range",
                format!("start {} is after end {}", self.from, self.to),
            ));
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// Number of days covered, inclusive
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    /// Months touched by this range, in order
    pub fn periods(&self) -> Vec<Period> {
        let last = Period::containing(self.to);
        let mut current = Period::containing(self.from);
        let mut periods = Vec::new();
        while current <= last {
            periods.push(current);
            let next = current.next();
            if next == current {
                break;
            }
            current = next;
        }
        periods
    }

    /// Every date an expense can carry (years 1 through 9999)
    pub fn all_time() -> Self {
        Self {
            from: NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN),
            to: NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn this_month(today: NaiveDate) -> Self {
        Self {
            from: Period::containing(today).first_day(),
            to: today,
        }
    }

    /// The last `days` days ending today
    pub fn last_days(days: i64, today: NaiveDate) -> Self {
        Self {
            from: today - Duration::days(days.max(1) - 1),
            to: today,
        }
    }

    /// Resolve a named preset, a month (`YYYY-MM`), a single day
    /// (`YYYY-MM-DD`) or an explicit `FROM..TO` span.
    pub fn parse(input: &str, today: NaiveDate) -> Result<Self> {
        let name = input.trim().to_lowercase().replace('_', "-");

        if let Some((from, to)) = name.split_once("..") {
            let from = parse_day(from, "range")?;
            let to = parse_day(to, "range")?;
            return Self::new(from, to);
        }

        let weekday = today.weekday().num_days_from_monday() as i64;
        let this_period = Period::containing(today);

        let range = match name.as_str() {
            "today" => Self::day(today),
            "yesterday" => Self::day(today - Duration::days(1)),
            "this-week" | "week" => Self {
                from: today - Duration::days(weekday),
                to: today,
            },
            "last-week" => {
                let monday = today - Duration::days(weekday + 7);
                Self {
                    from: monday,
                    to: monday + Duration::days(6),
                }
            }
            "this-month" | "month" => Self::this_month(today),
            "last-month" => this_period.prev().range(),
            "this-year" | "year" => Self {
                from: NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                to: today,
            },
            "last-7-days" => Self::last_days(7, today),
            "last-30-days" => Self {
                from: today - Duration::days(30),
                to: today,
            },
            "last-90-days" => Self {
                from: today - Duration::days(90),
                to: today,
            },
            "last-12-months" => Self {
                from: this_period
                    .first_day()
                    .checked_sub_months(Months::new(11))
                    .unwrap_or(today),
                to: today,
            },
            "all" => Self {
                from: Self::all_time().from,
                to: today,
            },
            other => {
                if let Ok(date) = NaiveDate::parse_from_str(other, "%Y-%m-%d") {
                    Self::day(date)
                } else if let Ok(period) = other.parse::<Period>() {
                    period.range()
                } else {
                    return Err(Error::validation(
                        "range",
                        format!(
                            "unknown period '{}' (try today, this-week, this-month, last-month, \
                             this-year, last-30-days, all, YYYY-MM or FROM..TO)",
                            input.trim()
                        ),
                    ));
                }
            }
        };
        Ok(range)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{} to {}", self.from, self.to)
        }
    }
}

fn parse_day(s: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        Error::validation(field, format!("expected YYYY-MM-DD, got '{}'", s.trim()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_parse_and_display() {
        let period: Period = "2024-01".parse().unwrap();
        assert_eq!(period.year(), 2024);
        assert_eq!(period.month(), 1);
        assert_eq!(period.to_string(), "2024-01");
        assert_eq!(period.last_day(), date(2024, 1, 31));

        assert!("2024-13".parse::<Period>().is_err());
        assert!("January".parse::<Period>().is_err());
    }

    #[test]
    fn test_period_leap_february() {
        let feb = Period::new(2024, 2).unwrap();
        assert_eq!(feb.last_day(), date(2024, 2, 29));
        assert_eq!(feb.prev().to_string(), "2024-01");
        assert_eq!(Period::new(2023, 12).unwrap().next().to_string(), "2024-01");
    }

    #[test]
    fn test_period_ordering_is_chronological() {
        let mut periods: Vec<Period> = ["2024-02", "2023-12", "2024-01"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        periods.sort();
        let names: Vec<String> = periods.iter().map(|p| p.to_string()).collect();
        assert_eq!(names, vec!["2023-12", "2024-01", "2024-02"]);
    }

    #[test]
    fn test_period_serde_as_string() {
        let period = Period::new(2024, 3).unwrap();
        let json = serde_json::to_string(&period).unwrap();
        assert_eq!(json, "\"2024-03\"");
        let back: Period = serde_json::from_str(&json).unwrap();
        assert_eq!(back, period);
        assert!(serde_json::from_str::<Period>("\"2024-00\"").is_err());
    }

    #[test]
    fn test_range_presets() {
        // Wednesday
        let today = date(2024, 3, 13);

        let r = DateRange::parse("this-month", today).unwrap();
        assert_eq!((r.from, r.to), (date(2024, 3, 1), today));

        let r = DateRange::parse("last-month", today).unwrap();
        assert_eq!((r.from, r.to), (date(2024, 2, 1), date(2024, 2, 29)));

        let r = DateRange::parse("this_week", today).unwrap();
        assert_eq!((r.from, r.to), (date(2024, 3, 11), today));

        let r = DateRange::parse("last-week", today).unwrap();
        assert_eq!((r.from, r.to), (date(2024, 3, 4), date(2024, 3, 10)));

        let r = DateRange::parse("yesterday", today).unwrap();
        assert_eq!(r, DateRange::day(date(2024, 3, 12)));

        let r = DateRange::parse("2024-01", today).unwrap();
        assert_eq!((r.from, r.to), (date(2024, 1, 1), date(2024, 1, 31)));
    }

    #[test]
    fn test_range_all_reaches_earliest_accepted_date() {
        let today = date(2024, 3, 13);
        let r = DateRange::parse("all", today).unwrap();
        assert_eq!((r.from, r.to), (date(1, 1, 1), today));
        assert!(r.contains(date(1850, 6, 1)));
    }

    #[test]
    fn test_range_last_month_in_january() {
        let r = DateRange::parse("last-month", date(2024, 1, 15)).unwrap();
        assert_eq!((r.from, r.to), (date(2023, 12, 1), date(2023, 12, 31)));
    }

    #[test]
    fn test_range_explicit_span() {
        let today = date(2024, 3, 13);
        let r = DateRange::parse("2024-01-05..2024-02-10", today).unwrap();
        assert_eq!((r.from, r.to), (date(2024, 1, 5), date(2024, 2, 10)));
        assert_eq!(r.periods().len(), 2);

        let err = DateRange::parse("2024-02-10..2024-01-05", today).unwrap_err();
        assert!(err.to_string().starts_with("invalid range"));
    }

    #[test]
    fn test_range_unknown_preset() {
        let err = DateRange::parse("fortnight", date(2024, 3, 13)).unwrap_err();
        assert!(err.to_string().contains("fortnight"));
    }

    #[test]
    fn test_last_days() {
        let r = DateRange::last_days(7, date(2024, 3, 13));
        assert_eq!(r.from, date(2024, 3, 7));
        assert_eq!(r.days(), 7);
    }
}
