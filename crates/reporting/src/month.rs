//! Calendar months: comparable keys, tokens and inclusive instant spans

use chrono::{Datelike, Days, Month, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use std::fmt;
use std::str::FromStr;

use crate::error::{ReportError, Result};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Earliest and latest years a four-digit year token can name
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// A calendar month, ordered chronologically.
///
/// Internally the first day of the month, so comparisons are plain date
/// comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey(NaiveDate);

impl MonthKey {
    /// Month containing `date`
    pub fn of(date: NaiveDate) -> Self {
        MonthKey(date - Days::new(u64::from(date.day0())))
    }

    pub fn from_ym(year: i32, month: u32) -> Option<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, 1).map(MonthKey)
    }

    /// Build from the `month` / `year` string pair carried by a bucket
    pub fn from_parts(month: &str, year: &str) -> Result<Self> {
        let token = format!("{}-{}", month.trim(), year.trim());
        token.parse()
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

    /// Three-letter English month name, e.g. "Feb"
    pub fn short_name(&self) -> &'static str {
        MONTH_ABBREVIATIONS[self.0.month0() as usize]
    }

    /// Four-digit year string, e.g. "2024"
    pub fn year_string(&self) -> String {
        format!("{:04}", self.year())
    }

    /// Human label, e.g. "Feb 2024"
    pub fn label(&self) -> String {
        format!("{} {}", self.short_name(), self.year_string())
    }

    pub fn checked_sub_months(&self, months: u32) -> Option<Self> {
        let date = self.0.checked_sub_months(Months::new(months))?;
        (date.year() >= MIN_YEAR).then_some(MonthKey(date))
    }

    pub fn next(&self) -> Option<Self> {
        let date = self.0.checked_add_months(Months::new(1))?;
        (date.year() <= MAX_YEAR).then_some(MonthKey(date))
    }

    /// Signed number of months from `self` to `later`
    pub fn months_until(&self, later: &MonthKey) -> i64 {
        let years = i64::from(later.year()) - i64::from(self.year());
        years * 12 + i64::from(later.month()) - i64::from(self.month())
    }

    /// Inclusive instant bounds of this month
    pub fn span(&self) -> Option<MonthSpan> {
        let start = self.0.and_time(NaiveTime::MIN);
        let next_start = self.0.checked_add_months(Months::new(1))?.and_time(NaiveTime::MIN);
        let end = next_start.checked_sub_signed(TimeDelta::milliseconds(1))?;
        Some(MonthSpan {
            key: *self,
            start,
            end,
        })
    }
}

/// `"Feb-2024"`, the select-option value form
impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.short_name(), self.year_string())
    }
}

/// Accepts `"Feb-2024"`, `"Feb 2024"`, `"february 2024"` (month names are
/// case-insensitive).
impl FromStr for MonthKey {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ReportError::InvalidMonthToken(s.to_string());

        let parts: Vec<&str> = s
            .split(|c: char| c == '-' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        let [month, year] = parts.as_slice() else {
            return Err(invalid());
        };

        let month = Month::from_str(month).map_err(|_| invalid())?;
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;

        MonthKey::from_ym(year, month.number_from_month()).ok_or_else(invalid)
    }
}

/// One calendar month as an inclusive `[start, end]` interval, millisecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthSpan {
    pub key: MonthKey,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// The `count` calendar months ending with the month of `reference`, oldest first
pub fn trailing_months(reference: NaiveDate, count: u32) -> Result<Vec<MonthSpan>> {
    let newest = MonthKey::of(reference);

    (0..count)
        .rev()
        .map(|back| {
            newest
                .checked_sub_months(back)
                .and_then(|key| key.span())
                .ok_or_else(|| {
                    ReportError::InvalidWindow(format!(
                        "{} months back from {} is out of range",
                        back, reference
                    ))
                })
        })
        .collect()
}
