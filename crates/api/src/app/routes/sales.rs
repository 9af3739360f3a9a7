use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use sportshub_sales::SaleRequest;

use crate::app::dto::{self, SaleResponse};
use crate::app::routes::reports;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(record_sale).get(list_sales))
        .route("/reports/sales", get(reports::sales_report))
}

pub async fn record_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RecordSaleRequest>,
) -> axum::response::Response {
    let request = SaleRequest::from(body);

    match services
        .run(move |shop| {
            let sale = shop.record_sale(request)?;
            Ok(SaleResponse::try_from(&sale)?)
        })
        .await
    {
        Ok(sale) => (StatusCode::CREATED, Json(sale)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn list_sales(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services
        .run(|shop| {
            Ok(shop
                .list_sales()?
                .iter()
                .map(SaleResponse::try_from)
                .collect::<Result<Vec<_>, _>>()?)
        })
        .await
    {
        Ok(sales) => (StatusCode::OK, Json(sales)).into_response(),
        Err(resp) => resp,
    }
}
