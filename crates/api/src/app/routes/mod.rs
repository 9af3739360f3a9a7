use axum::Router;

pub mod inventory;
pub mod reports;
pub mod sales;
pub mod system;

/// Router for every `/api` endpoint.
pub fn router() -> Router {
    Router::new()
        .nest("/inventory", inventory::router())
        .nest("/sales", sales::router())
}
