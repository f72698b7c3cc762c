//! Merchant financial reporting core
//!
//! Turns payment and expense records into the figures a merchant dashboard
//! shows: summary statistics, a trailing window of monthly revenue buckets,
//! and month-over-month growth over a user-selected month range.
//!
//! Records live behind the [`RecordStore`] trait. Everything here reads; the
//! "current date" is always passed in explicitly.

pub mod aggregate;
pub mod error;
pub mod growth;
pub mod money;
pub mod month;
pub mod range;
pub mod store;
pub mod summary;
pub mod view;

pub use aggregate::{
    DEFAULT_MONTHS_BACK, MonthBucket, ReportWindow, WindowLimits, aggregate_monthly_revenue,
};
pub use error::{ReportError, Result};
pub use growth::{
    GrowthPoint, MonthSelection, filter_and_derive_growth, invalid_end_candidates,
    invalid_start_candidates,
};
pub use month::{MonthKey, MonthSpan, trailing_months};
pub use range::{DateRange, MerchantId};
pub use store::{MemoryStore, RecordStore};
pub use summary::{CustomerScope, SummaryStats, compute_summary};
pub use view::{RequestTicket, RevenueAnalysis, Trend, window_label};
