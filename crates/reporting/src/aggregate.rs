//! Monthly revenue aggregation over a trailing window of calendar months

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReportError, Result};
use crate::month::{MonthKey, trailing_months};
use crate::range::{DateRange, MerchantId};
use crate::store::RecordStore;

/// Trailing window used when a request does not ask for one
pub const DEFAULT_MONTHS_BACK: u32 = 6;

/// Revenue total for one calendar month.
///
/// Serialized as `{"month": "Jan", "year": "2024", "revenue": 100.0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "BucketRepr", try_from = "BucketRepr")]
pub struct MonthBucket {
    pub key: MonthKey,
    pub revenue: Decimal,
}

impl MonthBucket {
    pub fn new(key: MonthKey, revenue: Decimal) -> Self {
        Self { key, revenue }
    }

    pub fn month(&self) -> &'static str {
        self.key.short_name()
    }

    pub fn year(&self) -> String {
        self.key.year_string()
    }
}

#[derive(Serialize, Deserialize)]
struct BucketRepr {
    month: String,
    year: String,
    #[serde(with = "crate::money::rounded")]
    revenue: Decimal,
}

impl From<MonthBucket> for BucketRepr {
    fn from(bucket: MonthBucket) -> Self {
        BucketRepr {
            month: bucket.month().to_string(),
            year: bucket.year(),
            revenue: bucket.revenue,
        }
    }
}

impl TryFrom<BucketRepr> for MonthBucket {
    type Error = ReportError;

    fn try_from(repr: BucketRepr) -> Result<Self> {
        Ok(MonthBucket {
            key: MonthKey::from_parts(&repr.month, &repr.year)?,
            revenue: repr.revenue,
        })
    }
}

/// Sum payments for each of the `months_back` calendar months ending with the
/// month of `reference`.
///
/// Returns exactly `months_back` buckets, oldest first; months without
/// payments get a zero bucket. Any store failure fails the whole call.
pub async fn aggregate_monthly_revenue<S>(
    store: &S,
    merchant: MerchantId,
    months_back: u32,
    reference: NaiveDate,
) -> Result<Vec<MonthBucket>>
where
    S: RecordStore + ?Sized,
{
    let spans = trailing_months(reference, months_back)?;
    let mut buckets = Vec::with_capacity(spans.len());

    for span in spans {
        let range = DateRange::between(span.start, span.end);
        let revenue = store.sum_payments(merchant, &range).await?;
        debug!(merchant = %merchant, month = %span.key, %revenue, "aggregated month");
        buckets.push(MonthBucket::new(span.key, revenue));
    }

    Ok(buckets)
}

/// Bounds for window sizes accepted from callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLimits {
    pub default_months: u32,
    pub max_months: u32,
}

impl Default for WindowLimits {
    fn default() -> Self {
        Self {
            default_months: DEFAULT_MONTHS_BACK,
            max_months: 24,
        }
    }
}

/// Resolved trailing window: `months` calendar months ending at `reference`'s month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub reference: NaiveDate,
    pub months: u32,
}

impl ReportWindow {
    /// Resolve a request's window.
    ///
    /// `range.end` (if any) anchors the window instead of `today`. The size is
    /// `months_back` when given, otherwise the span from `range.start`'s month
    /// to the anchor month, otherwise the configured default.
    pub fn resolve(
        today: NaiveDate,
        range: &DateRange,
        months_back: Option<u32>,
        limits: WindowLimits,
    ) -> Result<Self> {
        let reference = range.end.map(|end| end.date()).unwrap_or(today);

        let months = match (months_back, range.start) {
            (Some(n), _) => i64::from(n),
            (None, Some(start)) => {
                MonthKey::of(start.date()).months_until(&MonthKey::of(reference)) + 1
            }
            (None, None) => i64::from(limits.default_months),
        };

        if months < 1 || months > i64::from(limits.max_months) {
            return Err(ReportError::InvalidWindow(format!(
                "window must cover 1 to {} months, got {}",
                limits.max_months, months
            )));
        }

        Ok(Self {
            reference,
            months: months as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::store::testing::FailingStore;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn merchant() -> MerchantId {
        MerchantId::new(1).unwrap()
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        let pay = |y, m, d, amount: &str| {
            store.add_payment(merchant(), date(y, m, d).and_hms_opt(10, 0, 0).unwrap(), dec(amount));
        };
        pay(2024, 1, 1, "60");
        pay(2024, 1, 31, "40");
        pay(2024, 2, 14, "150");
        pay(2024, 3, 31, "90");
        // Outside the window and for another merchant
        pay(2023, 12, 31, "1000");
        store.add_payment(
            MerchantId::new(2).unwrap(),
            date(2024, 2, 14).and_hms_opt(10, 0, 0).unwrap(),
            dec("500"),
        );
        store
    }

    #[tokio::test]
    async fn test_aggregates_one_bucket_per_month() {
        let store = seeded_store();
        let buckets = aggregate_monthly_revenue(&store, merchant(), 3, date(2024, 3, 15))
            .await
            .unwrap();

        let got: Vec<(String, Decimal)> = buckets.iter().map(|b| (b.key.to_string(), b.revenue)).collect();
        assert_eq!(
            got,
            vec![
                ("Jan-2024".to_string(), dec("100")),
                ("Feb-2024".to_string(), dec("150")),
                ("Mar-2024".to_string(), dec("90")),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_months_yield_zero_buckets() {
        let store = seeded_store();
        let buckets = aggregate_monthly_revenue(&store, merchant(), 6, date(2024, 6, 1))
            .await
            .unwrap();

        assert_eq!(buckets.len(), 6);
        assert_eq!(buckets[0].key.to_string(), "Jan-2024");
        assert_eq!(buckets[5].key.to_string(), "Jun-2024");
        assert!(buckets[3..].iter().all(|b| b.revenue.is_zero()));
    }

    #[tokio::test]
    async fn test_bucket_count_matches_request() {
        let store = MemoryStore::new();
        for n in [1, 6, 12, 24] {
            let buckets = aggregate_monthly_revenue(&store, merchant(), n, date(2025, 1, 20))
                .await
                .unwrap();
            assert_eq!(buckets.len(), n as usize);
            assert!(buckets.windows(2).all(|w| w[0].key.next() == Some(w[1].key)));
        }
    }

    #[tokio::test]
    async fn test_store_failure_fails_whole_call() {
        let result = aggregate_monthly_revenue(&FailingStore, merchant(), 6, date(2024, 3, 1)).await;
        assert!(matches!(result, Err(ReportError::Store(_))));
    }

    #[test]
    fn test_bucket_json_shape() {
        let bucket = MonthBucket::new(MonthKey::from_ym(2024, 1).unwrap(), dec("100.456"));
        let json = serde_json::to_value(&bucket).unwrap();
        assert_eq!(json, serde_json::json!({"month": "Jan", "year": "2024", "revenue": 100.46}));

        let back: MonthBucket = serde_json::from_value(json).unwrap();
        assert_eq!(back.key, bucket.key);
        assert_eq!(back.revenue, dec("100.46"));
    }

    #[test]
    fn test_window_defaults_to_trailing_six() {
        let today = date(2024, 6, 10);
        let window = ReportWindow::resolve(today, &DateRange::unbounded(), None, WindowLimits::default()).unwrap();
        assert_eq!(window, ReportWindow { reference: today, months: 6 });
    }

    #[test]
    fn test_window_anchored_by_range() {
        let range = DateRange::between(
            date(2023, 11, 5).and_hms_opt(0, 0, 0).unwrap(),
            date(2024, 2, 20).and_hms_opt(0, 0, 0).unwrap(),
        );
        let window = ReportWindow::resolve(date(2024, 6, 10), &range, None, WindowLimits::default()).unwrap();
        assert_eq!(window.reference, date(2024, 2, 20));
        assert_eq!(window.months, 4);

        let explicit = ReportWindow::resolve(date(2024, 6, 10), &range, Some(2), WindowLimits::default()).unwrap();
        assert_eq!(explicit.months, 2);
    }

    #[test]
    fn test_window_limits_enforced() {
        let limits = WindowLimits::default();
        let today = date(2024, 6, 10);
        assert!(ReportWindow::resolve(today, &DateRange::unbounded(), Some(0), limits).is_err());
        assert!(ReportWindow::resolve(today, &DateRange::unbounded(), Some(25), limits).is_err());

        let future_start = DateRange {
            start: Some(date(2024, 9, 1).and_hms_opt(0, 0, 0).unwrap()),
            end: None,
        };
        assert!(matches!(
            ReportWindow::resolve(today, &future_start, None, limits),
            Err(ReportError::InvalidWindow(_))
        ));
    }
}
