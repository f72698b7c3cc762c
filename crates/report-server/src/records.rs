//! Payment and expense records
//!
//! Records are stored in the SQLite database and can be managed via CLI
//! commands. Reporting itself never writes them.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use merchant_reporting::MerchantId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::Path;

use crate::constants;

/// Payment received by a merchant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Database ID (None for payments not yet saved)
    #[serde(skip)]
    pub id: Option<i64>,
    pub merchant_id: i64,
    pub customer_id: Option<i64>,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// YYYY-MM-DD or YYYY-MM-DD HH:MM:SS, reporting timezone
    pub date: String,
}

/// Expense paid by a merchant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Database ID (None for expenses not yet saved)
    #[serde(skip)]
    pub id: Option<i64>,
    pub merchant_id: i64,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// YYYY-MM-DD or YYYY-MM-DD HH:MM:SS, reporting timezone
    pub date: String,
}

/// Checked values ready for storage
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRecord {
    pub merchant: MerchantId,
    pub amount: Decimal,
    pub at: NaiveDateTime,
}

impl Payment {
    pub fn validate(&self) -> Result<ValidRecord> {
        validate(self.merchant_id, self.amount, &self.date)
            .with_context(|| format!("Invalid payment dated '{}'", self.date))
    }
}

impl Expense {
    pub fn validate(&self) -> Result<ValidRecord> {
        validate(self.merchant_id, self.amount, &self.date)
            .with_context(|| format!("Invalid expense dated '{}'", self.date))
    }
}

fn validate(merchant_id: i64, amount: Decimal, date: &str) -> Result<ValidRecord> {
    let merchant = MerchantId::new(merchant_id)?;
    if amount < Decimal::ZERO {
        anyhow::bail!("amount must not be negative: {}", amount);
    }
    Ok(ValidRecord {
        merchant,
        amount,
        at: parse_record_instant(date)?,
    })
}

/// Parse a record date; date-only values are taken at midnight
pub fn parse_record_instant(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(at);
        }
    }
    anyhow::bail!("expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS, got '{}'", raw)
}

/// Render an instant the way the database stores it
pub fn stored_instant(at: NaiveDateTime) -> String {
    at.format(constants::STORED_INSTANT_FORMAT).to_string()
}

/// Load records from a CSV file (for importing/migration)
pub fn load_from_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut records = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let record: T = result.with_context(|| format!("Bad CSV record #{}", line + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Export records to CSV (for backup)
pub fn export_to_csv<T: Serialize>(records: &[T], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Get total of a set of amounts
pub fn total(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal> {
    merchant_reporting::money::checked_total(amounts)
        .context("Total exceeds the representable amount range")
}
