//! Error taxonomy for report computation

use thiserror::Error;

/// Boxed error coming out of a record store implementation
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Merchant ID is required")]
    MissingMerchantId,

    #[error("Invalid merchant ID '{0}': must be a positive integer")]
    InvalidMerchantId(String),

    #[error("Invalid date '{0}': expected YYYY-MM-DD or an RFC 3339 timestamp")]
    InvalidDate(String),

    #[error("Invalid month '{0}': expected a token like 'Feb-2024' or 'Feb 2024'")]
    InvalidMonthToken(String),

    #[error("Invalid report window: {0}")]
    InvalidWindow(String),

    #[error("Record store query failed: {0}")]
    Store(#[source] StoreError),
}

impl ReportError {
    /// Wrap any store-side failure
    pub fn store<E>(err: E) -> Self
    where
        E: Into<StoreError>,
    {
        ReportError::Store(err.into())
    }

    /// Caller mistakes, rejected before any store access
    pub fn is_validation(&self) -> bool {
        !matches!(self, ReportError::Store(_))
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
