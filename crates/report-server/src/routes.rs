//! HTTP surface: the monthly-growth and summary report endpoints

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use merchant_reporting::range::reporting_date;
use merchant_reporting::{
    CustomerScope, DateRange, MerchantId, MonthBucket, RecordStore, ReportError, ReportWindow,
    SummaryStats, WindowLimits, aggregate_monthly_revenue, compute_summary,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::{Config, ReportingZone};
use crate::constants;

/// Where "today" comes from when resolving the trailing window
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    /// Wall clock, read in the reporting timezone
    System(ReportingZone),
    /// Pinned date
    Fixed(NaiveDate),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::System(zone) => reporting_date(Utc::now(), zone.offset_now()),
            Clock::Fixed(date) => *date,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub limits: WindowLimits,
    pub zone: ReportingZone,
    pub customer_scope: CustomerScope,
    pub clock: Clock,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: &Config) -> Self {
        Self {
            store,
            limits: config.limits,
            zone: config.zone,
            customer_scope: config.customer_scope,
            clock: Clock::System(config.zone),
        }
    }
}

/// Raw query string; everything is optional so validation owns the messages
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub merchant_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub months_back: Option<String>,
}

/// Report failure as sent to the client
#[derive(Debug)]
pub struct ApiError {
    error: ReportError,
    /// Client-facing message for store failures
    failure: &'static str,
}

impl ApiError {
    fn monthly_growth(error: ReportError) -> Self {
        Self {
            error,
            failure: "Failed to fetch monthly growth data",
        }
    }

    fn summary(error: ReportError) -> Self {
        Self {
            error,
            failure: "Failed to fetch report summary",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.error.is_validation() {
            debug!(error = %self.error, "rejected report request");
            let body = Json(json!({ "error": self.error.to_string() }));
            return (StatusCode::BAD_REQUEST, body).into_response();
        }

        error!(error = %self.error, "{}", self.failure);
        let body = Json(json!({ "error": self.failure }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Build the router; routes are served both bare and under `/api`
pub fn router(state: AppState) -> Router {
    let reports = Router::new()
        .route(constants::MONTHLY_GROWTH_PATH, get(monthly_growth))
        .route(constants::SUMMARY_PATH, get(summary));

    Router::new()
        .merge(reports.clone())
        .nest(constants::API_PREFIX, reports)
        .with_state(state)
}

async fn monthly_growth(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<MonthBucket>>, ApiError> {
    let merchant = MerchantId::parse_param(query.merchant_id.as_deref())
        .map_err(ApiError::monthly_growth)?;
    let range = DateRange::parse_params(
        query.start_date.as_deref(),
        query.end_date.as_deref(),
        state.zone.offset_now(),
    )
    .map_err(ApiError::monthly_growth)?;
    let months_back = parse_months_back(query.months_back.as_deref())
        .map_err(ApiError::monthly_growth)?;

    let window = ReportWindow::resolve(state.clock.today(), &range, months_back, state.limits)
        .map_err(ApiError::monthly_growth)?;

    debug!(
        merchant = %merchant,
        months = window.months,
        reference = %window.reference,
        "monthly growth request"
    );

    let buckets =
        aggregate_monthly_revenue(state.store.as_ref(), merchant, window.months, window.reference)
            .await
            .map_err(ApiError::monthly_growth)?;

    Ok(Json(buckets))
}

async fn summary(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<SummaryStats>, ApiError> {
    let merchant =
        MerchantId::parse_param(query.merchant_id.as_deref()).map_err(ApiError::summary)?;
    let range = DateRange::parse_params(
        query.start_date.as_deref(),
        query.end_date.as_deref(),
        state.zone.offset_now(),
    )
    .map_err(ApiError::summary)?;

    debug!(merchant = %merchant, ?range, "summary request");

    let stats = compute_summary(state.store.as_ref(), merchant, &range, state.customer_scope)
        .await
        .map_err(ApiError::summary)?;

    Ok(Json(stats))
}

fn parse_months_back(raw: Option<&str>) -> merchant_reporting::Result<Option<u32>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| {
            ReportError::InvalidWindow(format!("monthsBack must be a positive integer, got '{}'", value))
        }),
    }
}
