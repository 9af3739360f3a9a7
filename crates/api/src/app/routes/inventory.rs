use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use sportshub_inventory::ItemId;

use crate::app::dto::{self, ItemResponse};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(add_item).get(list_items))
        .route("/low-stock", get(list_low_stock))
        .route("/:id", get(get_item))
        .route("/:id/adjust", post(adjust_quantity))
}

fn parse_item_id(id: &str) -> Result<ItemId, axum::response::Response> {
    id.parse::<ItemId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id"))
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateItemRequest>,
) -> axum::response::Response {
    let new_item = match body.into_new_item() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .run(move |shop| {
            let item = shop.add_item(new_item)?;
            Ok(ItemResponse::new(&item, shop.is_low_stock(&item)))
        })
        .await
    {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn list_items(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services
        .run(|shop| {
            Ok(shop
                .list_items()?
                .iter()
                .map(|item| ItemResponse::new(item, shop.is_low_stock(item)))
                .collect::<Vec<_>>())
        })
        .await
    {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn list_low_stock(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services
        .run(|shop| {
            Ok(shop
                .low_stock_items()?
                .iter()
                .map(|item| ItemResponse::new(item, true))
                .collect::<Vec<_>>())
        })
        .await
    {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let item_id = match parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .run(move |shop| {
            let item = shop.get_item(item_id)?;
            Ok(ItemResponse::new(&item, shop.is_low_stock(&item)))
        })
        .await
    {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn adjust_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::AdjustQuantityRequest>,
) -> axum::response::Response {
    let item_id = match parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .run(move |shop| {
            let item = shop.adjust_quantity(item_id, body.delta)?;
            Ok(ItemResponse::new(&item, shop.is_low_stock(&item)))
        })
        .await
    {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(resp) => resp,
    }
}
