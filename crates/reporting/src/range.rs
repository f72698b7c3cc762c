//! Request inputs: merchant identifiers and inclusive date ranges

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ReportError, Result};

/// Validated merchant identifier (positive integer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct MerchantId(i64);

impl MerchantId {
    pub fn new(id: i64) -> Result<Self> {
        if id > 0 {
            Ok(MerchantId(id))
        } else {
            Err(ReportError::InvalidMerchantId(id.to_string()))
        }
    }

    pub fn get(&self) -> i64 {
        self.0
    }

    /// Parse an optional raw query value; absence is its own error
    pub fn parse_param(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None | Some("") => Err(ReportError::MissingMerchantId),
            Some(value) => value.parse(),
        }
    }
}

impl FromStr for MerchantId {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        let id: i64 = s
            .trim()
            .parse()
            .map_err(|_| ReportError::InvalidMerchantId(s.to_string()))?;
        MerchantId::new(id)
    }
}

impl TryFrom<i64> for MerchantId {
    type Error = ReportError;

    fn try_from(id: i64) -> Result<Self> {
        MerchantId::new(id)
    }
}

impl From<MerchantId> for i64 {
    fn from(id: MerchantId) -> i64 {
        id.0
    }
}

impl fmt::Display for MerchantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive instant range; a missing bound is open-ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start.is_none_or(|start| at >= start) && self.end.is_none_or(|end| at <= end)
    }

    /// Build from optional raw `startDate` / `endDate` query values.
    ///
    /// Date-only values cover whole days: a start begins at midnight, an end
    /// runs to the last millisecond of that day. RFC 3339 timestamps are
    /// converted to the reporting offset.
    pub fn parse_params(
        start: Option<&str>,
        end: Option<&str>,
        offset: FixedOffset,
    ) -> Result<Self> {
        let start = non_empty(start)
            .map(|raw| parse_bound(raw, Bound::Start, offset))
            .transpose()?;
        let end = non_empty(end)
            .map(|raw| parse_bound(raw, Bound::End, offset))
            .transpose()?;

        if let (Some(s), Some(e)) = (start, end)
            && e < s
        {
            return Err(ReportError::InvalidWindow(format!(
                "endDate {} is before startDate {}",
                e, s
            )));
        }

        Ok(Self { start, end })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bound(raw: &str, bound: Bound, offset: FixedOffset) -> Result<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return match bound {
            Bound::Start => Ok(date.and_time(NaiveTime::MIN)),
            Bound::End => date
                .succ_opt()
                .and_then(|next| next.and_time(NaiveTime::MIN).checked_sub_signed(TimeDelta::milliseconds(1)))
                .ok_or_else(|| ReportError::InvalidDate(raw.to_string())),
        };
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&offset).naive_local());
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map_err(|_| ReportError::InvalidDate(raw.to_string()))
}

/// Calendar date of an instant as seen from the reporting offset
pub fn reporting_date(at: DateTime<chrono::Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}
