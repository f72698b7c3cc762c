//! Month-range filtering and month-over-month growth
//!
//! Growth is always derived from the filtered series: the first retained
//! month has zero growth, whatever preceded it in the unfiltered data.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::aggregate::MonthBucket;
use crate::error::Result;
use crate::money;
use crate::month::MonthKey;

/// Inclusive `[start, end]` month selection; filtering is off unless both are set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthSelection {
    pub start: Option<MonthKey>,
    pub end: Option<MonthKey>,
}

impl MonthSelection {
    pub fn new(start: Option<MonthKey>, end: Option<MonthKey>) -> Self {
        Self { start, end }
    }

    /// Parse optional `"Feb-2024"` style tokens
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let parse = |token: Option<&str>| -> Result<Option<MonthKey>> {
            token
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::parse::<MonthKey>)
                .transpose()
        };
        Ok(Self {
            start: parse(start)?,
            end: parse(end)?,
        })
    }

    /// Both ends chosen
    pub fn is_active(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    pub fn contains(&self, key: &MonthKey) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= *key && *key <= end,
            _ => true,
        }
    }
}

/// A bucket with its growth relative to the previous retained bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthPoint {
    #[serde(skip)]
    pub key: MonthKey,
    pub month: &'static str,
    pub year: String,
    #[serde(with = "money::rounded")]
    pub revenue: Decimal,
    /// Percent, rounded to two places; zero for the first point
    #[serde(with = "money::rounded")]
    pub growth: Decimal,
}

/// Keep the buckets inside `selection` and derive growth over what is kept
pub fn filter_and_derive_growth(buckets: &[MonthBucket], selection: &MonthSelection) -> Vec<GrowthPoint> {
    let retained: Vec<&MonthBucket> = buckets.iter().filter(|b| selection.contains(&b.key)).collect();

    let mut points = Vec::with_capacity(retained.len());
    let mut previous: Option<Decimal> = None;

    for bucket in retained {
        let growth = match previous {
            Some(prev) => money::percent_change(prev, bucket.revenue),
            None => Decimal::ZERO,
        };
        points.push(GrowthPoint {
            key: bucket.key,
            month: bucket.month(),
            year: bucket.year(),
            revenue: bucket.revenue,
            growth,
        });
        previous = Some(bucket.revenue);
    }

    points
}

/// With `start` chosen, the candidates that cannot be an end (strictly earlier)
pub fn invalid_end_candidates(start: &MonthKey, candidates: &[MonthKey]) -> BTreeSet<MonthKey> {
    candidates.iter().filter(|c| *c < start).copied().collect()
}

/// With `end` chosen, the candidates that cannot be a start (strictly later)
pub fn invalid_start_candidates(end: &MonthKey, candidates: &[MonthKey]) -> BTreeSet<MonthKey> {
    candidates.iter().filter(|c| *c > end).copied().collect()
}
