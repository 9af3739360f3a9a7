use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use sportshub_sales::ReportPeriod;

use crate::app::dto::{self, ReportBucketResponse};
use crate::app::errors;
use crate::app::services::AppServices;

/// `GET /api/sales/reports/sales?period=daily|weekly|monthly|yearly`.
///
/// A missing period means monthly.
pub async fn sales_report(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ReportQuery>,
) -> axum::response::Response {
    let period = match query.period.as_deref() {
        None => ReportPeriod::default(),
        Some(raw) => match raw.parse::<ReportPeriod>() {
            Ok(p) => p,
            Err(e) => return errors::domain_error_to_response(e),
        },
    };

    match services
        .run(move |shop| {
            Ok(shop
                .sales_report(period)?
                .into_iter()
                .map(ReportBucketResponse::from)
                .collect::<Vec<_>>())
        })
        .await
    {
        Ok(buckets) => (StatusCode::OK, Json(buckets)).into_response(),
        Err(resp) => resp,
    }
}
