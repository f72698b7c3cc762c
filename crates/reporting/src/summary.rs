//! Summary statistics: total revenue, total expenses, net profit, customer count

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReportError, Result};
use crate::money;
use crate::range::{DateRange, MerchantId};
use crate::store::RecordStore;

/// Which payments `totalCustomers` counts.
///
/// The figure counts payment records, not distinct customers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CustomerScope {
    /// Every payment of the merchant, ignoring the date range
    #[default]
    AllTime,
    /// Only payments inside the summary's date range
    DateRange,
}

/// Exact summary figures; rounding happens only when serialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    #[serde(with = "money::rounded")]
    pub total_revenue: Decimal,
    #[serde(with = "money::rounded")]
    pub total_expenses: Decimal,
    #[serde(with = "money::rounded")]
    pub net_profit: Decimal,
    pub total_customers: u64,
}

impl SummaryStats {
    pub fn new(total_revenue: Decimal, total_expenses: Decimal, total_customers: u64) -> Self {
        Self {
            total_revenue,
            total_expenses,
            net_profit: total_revenue - total_expenses,
            total_customers,
        }
    }

    /// Net profit as a percentage of revenue, zero when there is no revenue
    pub fn profit_margin(&self) -> Decimal {
        money::ratio_percent(self.net_profit, self.total_revenue)
    }
}

/// Sum revenue and expenses over `range` and count payments.
///
/// The three queries are independent and run concurrently; the first failure
/// fails the summary.
pub async fn compute_summary<S>(
    store: &S,
    merchant: MerchantId,
    range: &DateRange,
    scope: CustomerScope,
) -> Result<SummaryStats>
where
    S: RecordStore + ?Sized,
{
    let customer_range = match scope {
        CustomerScope::AllTime => DateRange::unbounded(),
        CustomerScope::DateRange => *range,
    };

    let (revenue, expenses, customers) = futures::try_join!(
        store.sum_payments(merchant, range),
        store.sum_expenses(merchant, range),
        store.count_payments(merchant, &customer_range),
    )?;

    if revenue.checked_sub(expenses).is_none() {
        return Err(ReportError::store(format!(
            "net profit overflowed for merchant {}",
            merchant
        )));
    }

    debug!(merchant = %merchant, %revenue, %expenses, customers, "computed summary");

    Ok(SummaryStats::new(revenue, expenses, customers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::store::testing::FailingStore;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(9, 30, 0).unwrap()
    }

    fn merchant() -> MerchantId {
        MerchantId::new(7).unwrap()
    }

    #[tokio::test]
    async fn test_rounding_applied_after_subtraction() {
        let store = MemoryStore::new();
        store.add_payment(merchant(), at(2024, 1, 3), dec("100.002"));
        store.add_payment(merchant(), at(2024, 1, 9), dec("200.002"));
        store.add_expense(merchant(), at(2024, 1, 5), dec("100.001"));

        let stats = compute_summary(&store, merchant(), &DateRange::unbounded(), CustomerScope::AllTime)
            .await
            .unwrap();

        assert_eq!(stats.total_revenue, dec("300.004"));
        assert_eq!(stats.total_expenses, dec("100.001"));
        assert_eq!(stats.net_profit, dec("200.003"));
        assert_eq!(stats.net_profit, stats.total_revenue - stats.total_expenses);
        assert_eq!(stats.total_customers, 2);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "totalRevenue": 300.0,
                "totalExpenses": 100.0,
                "netProfit": 200.0,
                "totalCustomers": 2
            })
        );
    }

    #[tokio::test]
    async fn test_customer_scope() {
        let store = MemoryStore::new();
        store.add_payment(merchant(), at(2023, 6, 1), dec("10"));
        store.add_payment(merchant(), at(2024, 2, 1), dec("20"));
        store.add_payment(merchant(), at(2024, 2, 2), dec("30"));

        let range = DateRange {
            start: Some(at(2024, 1, 1)),
            end: None,
        };

        let all_time = compute_summary(&store, merchant(), &range, CustomerScope::AllTime)
            .await
            .unwrap();
        assert_eq!(all_time.total_revenue, dec("50"));
        assert_eq!(all_time.total_customers, 3);

        let ranged = compute_summary(&store, merchant(), &range, CustomerScope::DateRange)
            .await
            .unwrap();
        assert_eq!(ranged.total_customers, 2);
    }

    #[tokio::test]
    async fn test_expense_range_is_inclusive() {
        let store = MemoryStore::new();
        store.add_expense(merchant(), at(2024, 3, 1), dec("5"));
        store.add_expense(merchant(), at(2024, 3, 31), dec("7"));
        store.add_expense(merchant(), at(2024, 4, 1), dec("100"));

        let range = DateRange::between(at(2024, 3, 1), at(2024, 3, 31));
        let stats = compute_summary(&store, merchant(), &range, CustomerScope::AllTime)
            .await
            .unwrap();
        assert_eq!(stats.total_expenses, dec("12"));
        assert_eq!(stats.net_profit, dec("-12"));
    }

    #[test]
    fn test_profit_margin_zero_revenue() {
        let losing = SummaryStats::new(Decimal::ZERO, dec("40"), 0);
        assert_eq!(losing.profit_margin(), Decimal::ZERO);

        let idle = SummaryStats::new(Decimal::ZERO, Decimal::ZERO, 0);
        assert_eq!(idle.profit_margin(), Decimal::ZERO);

        let healthy = SummaryStats::new(dec("200"), dec("50"), 4);
        assert_eq!(healthy.profit_margin(), dec("75"));
    }

    #[tokio::test]
    async fn test_overflowing_revenue_fails_the_summary() {
        let store = MemoryStore::new();
        store.add_payment(merchant(), at(2024, 1, 3), Decimal::MAX);
        store.add_payment(merchant(), at(2024, 1, 4), Decimal::MAX);

        let result = compute_summary(&store, merchant(), &DateRange::unbounded(), CustomerScope::AllTime).await;
        assert!(matches!(result, Err(ReportError::Store(_))));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let result = compute_summary(&FailingStore, merchant(), &DateRange::unbounded(), CustomerScope::AllTime).await;
        assert!(matches!(result, Err(ReportError::Store(_))));
    }
}
