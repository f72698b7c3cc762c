//! SQLite storage for payment and expense records
//!
//! Amounts are stored as decimal strings and summed in Rust so totals stay
//! exact. Instants are stored in a fixed-width text form (reporting
//! timezone), so range filters are plain string comparisons.

use anyhow::{Context, Result};
use async_trait::async_trait;
use merchant_reporting::{DateRange, MerchantId, RecordStore, ReportError};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqlitePool};
use std::path::Path;
use std::str::FromStr;

use crate::records::{Expense, Payment, stored_instant};

/// Record database wrapper
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

/// Row type for payments query
#[derive(FromRow)]
struct PaymentRow {
    id: i64,
    merchant_id: i64,
    customer_id: Option<i64>,
    amount: String,
    payment_date: String,
}

/// Row type for expenses query
#[derive(FromRow)]
struct ExpenseRow {
    id: i64,
    merchant_id: i64,
    description: String,
    amount: String,
    expense_date: String,
}

impl SqliteStore {
    /// Open or create the record database
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        // SQLx requires the file to exist for SQLite
        if !path.exists() {
            std::fs::File::create(path)?;
        }

        let url = format!("sqlite:{}", path.display());
        let pool = SqlitePool::connect(&url)
            .await
            .with_context(|| format!("Failed to open record database {}", path.display()))?;

        // WAL lets the server read while the CLI imports
        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout=5000").execute(&pool).await?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    /// Private in-memory database (single connection, so every query sees it)
    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "
            CREATE TABLE IF NOT EXISTS payments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                merchant_id INTEGER NOT NULL,
                customer_id INTEGER,
                amount TEXT NOT NULL,
                payment_date TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_payments_merchant_date
             ON payments (merchant_id, payment_date)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "
            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                merchant_id INTEGER NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                amount TEXT NOT NULL,
                expense_date TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_expenses_merchant_date
             ON expenses (merchant_id, expense_date)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Get payments, optionally for one merchant
    pub async fn get_payments(&self, merchant: Option<MerchantId>) -> Result<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            "SELECT id, merchant_id, customer_id, amount, payment_date
             FROM payments
             WHERE ?1 IS NULL OR merchant_id = ?1
             ORDER BY payment_date, id",
        )
        .bind(merchant.map(|m| m.get()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(Payment {
                    id: Some(r.id),
                    merchant_id: r.merchant_id,
                    customer_id: r.customer_id,
                    amount: parse_amount(&r.amount)?,
                    date: r.payment_date,
                })
            })
            .collect()
    }

    /// Add a new payment, returns the ID
    pub async fn add_payment(&self, payment: &Payment) -> Result<i64> {
        let record = payment.validate()?;

        let result = sqlx::query(
            "INSERT INTO payments (merchant_id, customer_id, amount, payment_date)
             VALUES (?, ?, ?, ?)",
        )
        .bind(record.merchant.get())
        .bind(payment.customer_id)
        .bind(record.amount.to_string())
        .bind(stored_instant(record.at))
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Import multiple payments (all or nothing)
    pub async fn import_payments(&self, payments: &[Payment]) -> Result<usize> {
        // Validate everything before touching the database
        let mut records = Vec::with_capacity(payments.len());
        for payment in payments {
            records.push((payment.validate()?, payment.customer_id));
        }

        let mut tx = self.pool.begin().await?;

        for (record, customer_id) in &records {
            sqlx::query(
                "INSERT INTO payments (merchant_id, customer_id, amount, payment_date)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(record.merchant.get())
            .bind(*customer_id)
            .bind(record.amount.to_string())
            .bind(stored_instant(record.at))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(records.len())
    }

    // =========================================================================
    // Expenses
    // =========================================================================

    /// Get expenses, optionally for one merchant
    pub async fn get_expenses(&self, merchant: Option<MerchantId>) -> Result<Vec<Expense>> {
        let rows: Vec<ExpenseRow> = sqlx::query_as(
            "SELECT id, merchant_id, description, amount, expense_date
             FROM expenses
             WHERE ?1 IS NULL OR merchant_id = ?1
             ORDER BY expense_date, id",
        )
        .bind(merchant.map(|m| m.get()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(Expense {
                    id: Some(r.id),
                    merchant_id: r.merchant_id,
                    description: r.description,
                    amount: parse_amount(&r.amount)?,
                    date: r.expense_date,
                })
            })
            .collect()
    }

    /// Add a new expense, returns the ID
    pub async fn add_expense(&self, expense: &Expense) -> Result<i64> {
        let record = expense.validate()?;

        let result = sqlx::query(
            "INSERT INTO expenses (merchant_id, description, amount, expense_date)
             VALUES (?, ?, ?, ?)",
        )
        .bind(record.merchant.get())
        .bind(&expense.description)
        .bind(record.amount.to_string())
        .bind(stored_instant(record.at))
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Import multiple expenses (all or nothing)
    pub async fn import_expenses(&self, expenses: &[Expense]) -> Result<usize> {
        let mut records = Vec::with_capacity(expenses.len());
        for expense in expenses {
            records.push((expense.validate()?, expense.description.as_str()));
        }

        let mut tx = self.pool.begin().await?;

        for (record, description) in &records {
            sqlx::query(
                "INSERT INTO expenses (merchant_id, description, amount, expense_date)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(record.merchant.get())
            .bind(*description)
            .bind(record.amount.to_string())
            .bind(stored_instant(record.at))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(records.len())
    }

    // =========================================================================
    // Aggregate queries
    // =========================================================================

    /// Exact sum of the amount column of `sql`'s rows
    async fn sum_amounts(
        &self,
        sql: &str,
        merchant: MerchantId,
        range: &DateRange,
    ) -> merchant_reporting::Result<Decimal> {
        let rows: Vec<(String,)> = sqlx::query_as(sql)
            .bind(merchant.get())
            .bind(range.start.map(stored_instant))
            .bind(range.end.map(stored_instant))
            .fetch_all(&self.pool)
            .await
            .map_err(ReportError::store)?;

        rows.iter().try_fold(Decimal::ZERO, |sum, (amount,)| {
            let amount = Decimal::from_str(amount).map_err(ReportError::store)?;
            sum.checked_add(amount).ok_or_else(|| {
                ReportError::store(format!("amount total overflowed for merchant {}", merchant))
            })
        })
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn sum_payments(
        &self,
        merchant: MerchantId,
        range: &DateRange,
    ) -> merchant_reporting::Result<Decimal> {
        self.sum_amounts(
            "SELECT amount FROM payments
             WHERE merchant_id = ?1
               AND (?2 IS NULL OR payment_date >= ?2)
               AND (?3 IS NULL OR payment_date <= ?3)",
            merchant,
            range,
        )
        .await
    }

    async fn sum_expenses(
        &self,
        merchant: MerchantId,
        range: &DateRange,
    ) -> merchant_reporting::Result<Decimal> {
        self.sum_amounts(
            "SELECT amount FROM expenses
             WHERE merchant_id = ?1
               AND (?2 IS NULL OR expense_date >= ?2)
               AND (?3 IS NULL OR expense_date <= ?3)",
            merchant,
            range,
        )
        .await
    }

    async fn count_payments(
        &self,
        merchant: MerchantId,
        range: &DateRange,
    ) -> merchant_reporting::Result<u64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM payments
             WHERE merchant_id = ?1
               AND (?2 IS NULL OR payment_date >= ?2)
               AND (?3 IS NULL OR payment_date <= ?3)",
        )
        .bind(merchant.get())
        .bind(range.start.map(stored_instant))
        .bind(range.end.map(stored_instant))
        .fetch_one(&self.pool)
        .await
        .map_err(ReportError::store)?;

        Ok(count.max(0) as u64)
    }
}

// =============================================================================
// Helper functions
// =============================================================================

fn parse_amount(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).with_context(|| format!("Corrupt amount in database: '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use merchant_reporting::{CustomerScope, aggregate_monthly_revenue, compute_summary};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn merchant() -> MerchantId {
        MerchantId::new(1).unwrap()
    }

    fn payment(amount: &str, date: &str) -> Payment {
        Payment {
            id: None,
            merchant_id: 1,
            customer_id: None,
            amount: dec(amount),
            date: date.to_string(),
        }
    }

    fn expense(amount: &str, date: &str) -> Expense {
        Expense {
            id: None,
            merchant_id: 1,
            description: "rent".to_string(),
            amount: dec(amount),
            date: date.to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let id = store.add_payment(&payment("12.34", "2024-05-02 10:00:00")).await.unwrap();
        assert!(id > 0);
        store.add_expense(&expense("5.00", "2024-05-03")).await.unwrap();

        let payments = store.get_payments(Some(merchant())).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, dec("12.34"));
        assert_eq!(payments[0].date, "2024-05-02 10:00:00.000");

        let expenses = store.get_expenses(None).await.unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].description, "rent");

        let other = store.get_payments(Some(MerchantId::new(2).unwrap())).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_record_rejected() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        assert!(store.add_payment(&payment("-3", "2024-05-02")).await.is_err());

        // One bad row aborts the whole import
        let batch = vec![payment("1", "2024-05-02"), payment("2", "not a date")];
        assert!(store.import_payments(&batch).await.is_err());
        assert!(store.get_payments(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sums_are_exact_and_inclusive() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store
            .import_payments(&[
                payment("100.002", "2024-01-01 00:00:00"),
                payment("200.002", "2024-01-31 23:59:59.999"),
                payment("999", "2024-02-01 00:00:00"),
            ])
            .await
            .unwrap();
        store.import_expenses(&[expense("100.001", "2024-01-15")]).await.unwrap();

        let jan = DateRange::between(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31)
                .unwrap()
                .and_hms_milli_opt(23, 59, 59, 999)
                .unwrap(),
        );

        assert_eq!(store.sum_payments(merchant(), &jan).await.unwrap(), dec("300.004"));
        assert_eq!(store.count_payments(merchant(), &jan).await.unwrap(), 2);
        assert_eq!(
            store.count_payments(merchant(), &DateRange::unbounded()).await.unwrap(),
            3
        );

        let stats = compute_summary(&store, merchant(), &jan, CustomerScope::AllTime)
            .await
            .unwrap();
        assert_eq!(stats.net_profit, dec("200.003"));
        assert_eq!(stats.total_customers, 3);
    }

    #[tokio::test]
    async fn test_overflowing_sum_is_a_store_error() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let max = Decimal::MAX.to_string();
        store
            .import_payments(&[payment(&max, "2024-01-10"), payment(&max, "2024-01-11")])
            .await
            .unwrap();

        let result = store.sum_payments(merchant(), &DateRange::unbounded()).await;
        assert!(matches!(result, Err(ReportError::Store(_))));

        let summary =
            compute_summary(&store, merchant(), &DateRange::unbounded(), CustomerScope::AllTime)
                .await;
        assert!(matches!(summary, Err(ReportError::Store(_))));

        let monthly = aggregate_monthly_revenue(
            &store,
            merchant(),
            1,
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .await;
        assert!(matches!(monthly, Err(ReportError::Store(_))));
    }

    #[tokio::test]
    async fn test_monthly_aggregation_against_sqlite() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store
            .import_payments(&[
                payment("100", "2024-01-10"),
                payment("150", "2024-02-10"),
                payment("90", "2024-03-10"),
            ])
            .await
            .unwrap();

        let buckets = aggregate_monthly_revenue(
            &store,
            merchant(),
            4,
            NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
        )
        .await
        .unwrap();

        let revenue: Vec<Decimal> = buckets.iter().map(|b| b.revenue).collect();
        assert_eq!(revenue, vec![Decimal::ZERO, dec("100"), dec("150"), dec("90")]);
        assert_eq!(buckets[0].key.to_string(), "Dec-2023");
    }
}
