use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sportshub_core::{DomainError, Money};
use sportshub_infra::NewItem;
use sportshub_inventory::{Category, InventoryItem};
use sportshub_sales::{ReportBucket, SaleLine, SaleLineRequest, SaleRequest, SaleTransaction};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    #[serde(alias = "name")]
    pub item_name: String,
    pub category: String,
    pub quantity: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

impl CreateItemRequest {
    pub fn into_new_item(self) -> Result<NewItem, DomainError> {
        Ok(NewItem {
            name: self.item_name,
            category: self.category.parse::<Category>()?,
            quantity: self.quantity,
            unit_price: Money::new(self.unit_price),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustQuantityRequest {
    pub delta: i64,
}

/// Missing strings and lists deserialize as empty so the engine reports them
/// in its own validation order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSaleRequest {
    #[serde(default)]
    pub invoice_number: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub items: Vec<SaleItemRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemRequest {
    pub item_id: String,
    pub quantity: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

impl From<RecordSaleRequest> for SaleRequest {
    fn from(body: RecordSaleRequest) -> Self {
        SaleRequest {
            invoice_number: body.invoice_number,
            payment_method: body.payment_method,
            lines: body
                .items
                .into_iter()
                .map(|line| SaleLineRequest {
                    item_id: line.item_id,
                    quantity: line.quantity,
                    unit_price: Money::new(line.unit_price),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub period: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: String,
    /// Same value as `id`, under the key older clients read.
    #[serde(rename = "_id")]
    pub legacy_id: String,
    pub item_name: String,
    pub category: Category,
    pub quantity: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub low_stock: bool,
}

impl ItemResponse {
    pub fn new(item: &InventoryItem, low_stock: bool) -> Self {
        let id = item.id_typed().to_string();
        Self {
            legacy_id: id.clone(),
            id,
            item_name: item.name().to_string(),
            category: item.category(),
            quantity: item.quantity(),
            unit_price: item.unit_price().amount(),
            low_stock,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineResponse {
    pub item_id: String,
    pub quantity: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub line_total: Decimal,
}

impl TryFrom<&SaleLine> for SaleLineResponse {
    type Error = DomainError;

    fn try_from(line: &SaleLine) -> Result<Self, Self::Error> {
        Ok(Self {
            item_id: line.item_id.to_string(),
            quantity: line.quantity,
            unit_price: line.unit_price.amount(),
            line_total: line.line_total()?.amount(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub id: String,
    pub invoice_number: String,
    pub payment_method: String,
    pub items: Vec<SaleLineResponse>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub created_at: String,
}

impl TryFrom<&SaleTransaction> for SaleResponse {
    type Error = DomainError;

    fn try_from(sale: &SaleTransaction) -> Result<Self, Self::Error> {
        Ok(Self {
            id: sale.id_typed().to_string(),
            invoice_number: sale.invoice_number().to_string(),
            payment_method: sale.payment_method().to_string(),
            items: sale
                .lines()
                .iter()
                .map(SaleLineResponse::try_from)
                .collect::<Result<_, _>>()?,
            total_amount: sale.total().amount(),
            created_at: sale.recorded_at().to_rfc3339(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBucketResponse {
    pub bucket_key: String,
    /// Chart label key used by older clients.
    #[serde(rename = "_id")]
    pub legacy_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_sales: Decimal,
}

impl From<ReportBucket> for ReportBucketResponse {
    fn from(bucket: ReportBucket) -> Self {
        Self {
            legacy_id: bucket.bucket_key.clone(),
            bucket_key: bucket.bucket_key,
            total_sales: bucket.total_sales.amount(),
        }
    }
}
