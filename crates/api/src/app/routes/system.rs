use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::services::AppServices;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Low-stock items as last seen by the background stock watch.
pub async fn stock_alerts(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    let watch = services.stock_watch();
    let items: Vec<serde_json::Value> = watch
        .low_stock()
        .into_iter()
        .map(|item| {
            serde_json::json!({
                "itemId": item.item_id.to_string(),
                "itemName": item.name,
                "quantity": item.quantity,
            })
        })
        .collect();

    Json(serde_json::json!({
        "threshold": watch.threshold(),
        "items": items,
    }))
}
