//! Revenue-analysis view state
//!
//! Holds the fetched buckets and summary, the month selection, and what a
//! dashboard derives from them. Every fetch takes a [`RequestTicket`]; a
//! response is applied only when its ticket is newer than the last one
//! applied, so a slow, superseded fetch can never overwrite fresher data.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

use crate::aggregate::MonthBucket;
use crate::error::Result;
use crate::growth::{
    GrowthPoint, MonthSelection, filter_and_derive_growth, invalid_end_candidates,
    invalid_start_candidates,
};
use crate::month::MonthKey;
use crate::summary::SummaryStats;

/// Monotonic sequence number handed out per fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// Select option for a month picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthOption {
    #[serde(skip)]
    pub key: MonthKey,
    /// `"Feb-2024"`
    pub value: String,
    /// `"Feb 2024"`
    pub label: String,
}

impl From<MonthKey> for MonthOption {
    fn from(key: MonthKey) -> Self {
        MonthOption {
            key,
            value: key.to_string(),
            label: key.label(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

/// Latest month-over-month change of the displayed series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trend {
    pub direction: TrendDirection,
    /// Absolute percentage
    pub percent: Decimal,
}

impl Trend {
    pub fn from_points(points: &[GrowthPoint]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let growth = points.last()?.growth;
        let direction = if growth > Decimal::ZERO {
            TrendDirection::Up
        } else if growth < Decimal::ZERO {
            TrendDirection::Down
        } else {
            TrendDirection::Flat
        };
        Some(Trend {
            direction,
            percent: growth.abs(),
        })
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            TrendDirection::Up => write!(f, "Trending up by {:.1}% this month", self.percent),
            TrendDirection::Down => write!(f, "Trending down by {:.1}% this month", self.percent),
            TrendDirection::Flat => write!(f, "Flat this month"),
        }
    }
}

/// `"Jan 2024 - Jun 2024"` for the window the buckets cover
pub fn window_label(buckets: &[MonthBucket]) -> String {
    match (buckets.first(), buckets.last()) {
        (Some(first), Some(last)) => format!("{} - {}", first.key.label(), last.key.label()),
        _ => "N/A".to_string(),
    }
}

#[derive(Debug, Default)]
pub struct RevenueAnalysis {
    buckets: Vec<MonthBucket>,
    summary: Option<SummaryStats>,
    selection: MonthSelection,
    last_issued: u64,
    last_applied: Option<RequestTicket>,
}

impl RevenueAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticket for a fetch about to be issued
    pub fn begin_request(&mut self) -> RequestTicket {
        self.last_issued += 1;
        RequestTicket(self.last_issued)
    }

    /// Apply a fetched response. Returns `false` (and changes nothing) when a
    /// newer response has already been applied.
    pub fn apply_response(
        &mut self,
        ticket: RequestTicket,
        buckets: Vec<MonthBucket>,
        summary: Option<SummaryStats>,
    ) -> bool {
        if self.last_applied.is_some_and(|applied| ticket <= applied) {
            debug!(
                ticket = ticket.sequence(),
                applied = self.last_applied.map(|t| t.sequence()),
                "discarding stale response"
            );
            return false;
        }

        self.buckets = buckets;
        self.summary = summary;
        self.last_applied = Some(ticket);

        if self.selection.start.is_none() {
            self.selection.start = self.buckets.first().map(|b| b.key);
        }
        true
    }

    pub fn last_applied(&self) -> Option<RequestTicket> {
        self.last_applied
    }

    pub fn buckets(&self) -> &[MonthBucket] {
        &self.buckets
    }

    pub fn summary(&self) -> Option<&SummaryStats> {
        self.summary.as_ref()
    }

    pub fn selection(&self) -> MonthSelection {
        self.selection
    }

    pub fn options(&self) -> Vec<MonthOption> {
        self.buckets.iter().map(|b| MonthOption::from(b.key)).collect()
    }

    fn option_key(&self, token: &str) -> Result<Option<MonthKey>> {
        let key: MonthKey = token.parse()?;
        Ok(self.buckets.iter().any(|b| b.key == key).then_some(key))
    }

    /// Choose the start month; a month not among the options clears it
    pub fn select_start(&mut self, token: &str) -> Result<()> {
        self.selection.start = self.option_key(token)?;
        Ok(())
    }

    /// Choose the end month; a month not among the options clears it
    pub fn select_end(&mut self, token: &str) -> Result<()> {
        self.selection.end = self.option_key(token)?;
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = MonthSelection::default();
    }

    /// Filtered series with growth recomputed over it
    pub fn points(&self) -> Vec<GrowthPoint> {
        filter_and_derive_growth(&self.buckets, &self.selection)
    }

    fn candidate_keys(&self) -> Vec<MonthKey> {
        self.buckets.iter().map(|b| b.key).collect()
    }

    /// End options ruled out by the chosen start
    pub fn disabled_end_options(&self) -> BTreeSet<MonthKey> {
        match self.selection.start {
            Some(start) => invalid_end_candidates(&start, &self.candidate_keys()),
            None => BTreeSet::new(),
        }
    }

    /// Start options ruled out by the chosen end
    pub fn disabled_start_options(&self) -> BTreeSet<MonthKey> {
        match self.selection.end {
            Some(end) => invalid_start_candidates(&end, &self.candidate_keys()),
            None => BTreeSet::new(),
        }
    }

    pub fn trend(&self) -> Option<Trend> {
        Trend::from_points(&self.points())
    }

    pub fn window_label(&self) -> String {
        window_label(&self.buckets)
    }

    /// Zero until a summary has been applied, or when revenue is zero
    pub fn profit_margin(&self) -> Decimal {
        self.summary
            .as_ref()
            .map(SummaryStats::profit_margin)
            .unwrap_or(Decimal::ZERO)
    }
}
