//! The record store seam
//!
//! Reporting only ever reads: sums of payment / expense amounts and payment
//! counts for one merchant over an inclusive date range.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::sync::{PoisonError, RwLock};

use crate::error::{ReportError, Result};
use crate::money;
use crate::range::{DateRange, MerchantId};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Sum of payment amounts, zero when nothing matches
    async fn sum_payments(&self, merchant: MerchantId, range: &DateRange) -> Result<Decimal>;

    /// Sum of expense amounts, zero when nothing matches
    async fn sum_expenses(&self, merchant: MerchantId, range: &DateRange) -> Result<Decimal>;

    /// Number of payment records
    async fn count_payments(&self, merchant: MerchantId, range: &DateRange) -> Result<u64>;
}

#[derive(Debug, Clone, PartialEq)]
struct MemoryRecord {
    merchant: MerchantId,
    at: NaiveDateTime,
    amount: Decimal,
}

/// In-memory store, handy for tests and small fixtures
#[derive(Debug, Default)]
pub struct MemoryStore {
    payments: RwLock<Vec<MemoryRecord>>,
    expenses: RwLock<Vec<MemoryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_payment(&self, merchant: MerchantId, at: NaiveDateTime, amount: Decimal) {
        self.payments
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MemoryRecord { merchant, at, amount });
    }

    pub fn add_expense(&self, merchant: MerchantId, at: NaiveDateTime, amount: Decimal) {
        self.expenses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MemoryRecord { merchant, at, amount });
    }

    fn total(
        records: &RwLock<Vec<MemoryRecord>>,
        merchant: MerchantId,
        range: &DateRange,
    ) -> Result<Decimal> {
        money::checked_total(Self::matching(records, merchant, range))
            .ok_or_else(|| ReportError::store(format!("amount total overflowed for merchant {}", merchant)))
    }

    fn matching(
        records: &RwLock<Vec<MemoryRecord>>,
        merchant: MerchantId,
        range: &DateRange,
    ) -> Vec<Decimal> {
        records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.merchant == merchant && range.contains(r.at))
            .map(|r| r.amount)
            .collect()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn sum_payments(&self, merchant: MerchantId, range: &DateRange) -> Result<Decimal> {
        Self::total(&self.payments, merchant, range)
    }

    async fn sum_expenses(&self, merchant: MerchantId, range: &DateRange) -> Result<Decimal> {
        Self::total(&self.expenses, merchant, range)
    }

    async fn count_payments(&self, merchant: MerchantId, range: &DateRange) -> Result<u64> {
        Ok(Self::matching(&self.payments, merchant, range).len() as u64)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_memory_store_filters_by_merchant_and_range() {
        let store = MemoryStore::new();
        let m1 = MerchantId::new(1).unwrap();
        let m2 = MerchantId::new(2).unwrap();
        let jan = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(12, 0, 0).unwrap();
        let feb = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap().and_hms_opt(12, 0, 0).unwrap();

        store.add_payment(m1, jan, Decimal::from_str("10.10").unwrap());
        store.add_payment(m1, feb, Decimal::from_str("20.20").unwrap());
        store.add_payment(m2, feb, Decimal::from_str("99").unwrap());

        let all = DateRange::unbounded();
        assert_eq!(store.sum_payments(m1, &all).await.unwrap(), Decimal::from_str("30.30").unwrap());
        assert_eq!(store.count_payments(m1, &all).await.unwrap(), 2);

        let only_feb = DateRange {
            start: Some(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()),
            end: None,
        };
        assert_eq!(store.sum_payments(m1, &only_feb).await.unwrap(), Decimal::from_str("20.20").unwrap());
        assert_eq!(store.sum_expenses(m1, &all).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_overflowing_total_is_a_store_error() {
        let store = MemoryStore::new();
        let m1 = MerchantId::new(1).unwrap();
        let at = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(12, 0, 0).unwrap();
        store.add_payment(m1, at, Decimal::MAX);
        store.add_payment(m1, at, Decimal::MAX);

        let result = store.sum_payments(m1, &DateRange::unbounded()).await;
        assert!(matches!(result, Err(ReportError::Store(_))));
        assert_eq!(store.count_payments(m1, &DateRange::unbounded()).await.unwrap(), 2);
    }
}
