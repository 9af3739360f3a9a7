//! End-to-end walk through the shop engine: stock an item, sell part of it,
//! read it back through the ledger and the sales report.

use chrono::{TimeZone, Utc};

use sportshub_core::Money;
use sportshub_infra::command_dispatcher::DispatchError;
use sportshub_infra::config::ShopConfig;
use sportshub_infra::ledger::NewItem;
use sportshub_infra::InMemoryShop;
use sportshub_inventory::Category;
use sportshub_sales::{PaymentMethod, ReportBucket, ReportPeriod, SaleLineRequest, SaleRequest};

fn football_sale(shop: &InMemoryShop, invoice: &str, quantity: i64) -> SaleRequest {
    let football = shop.list_items().unwrap()[0].id_typed();
    SaleRequest {
        invoice_number: invoice.to_string(),
        payment_method: "Cash".to_string(),
        lines: vec![SaleLineRequest {
            item_id: football.to_string(),
            quantity,
            unit_price: Money::from(1500),
        }],
    }
}

#[test]
fn football_sale_updates_stock_and_daily_report() {
    let shop = InMemoryShop::in_memory(ShopConfig::default());
    let football = shop
        .add_item(NewItem {
            name: "Football".to_string(),
            category: "Balls".parse::<Category>().unwrap(),
            quantity: 15,
            unit_price: Money::from(1500),
        })
        .unwrap();

    let sale = shop.record_sale(football_sale(&shop, "INV-1", 3)).unwrap();
    assert_eq!(sale.invoice_number(), "INV-1");
    assert_eq!(sale.payment_method(), PaymentMethod::Cash);
    assert_eq!(sale.total(), Money::from(4500));

    assert_eq!(shop.get_item(football.id_typed()).unwrap().quantity(), 12);

    let today = sale.recorded_at().format("%Y-%m-%d").to_string();
    assert_eq!(
        shop.sales_report(ReportPeriod::Daily).unwrap(),
        vec![ReportBucket {
            bucket_key: today,
            total_sales: Money::from(4500),
        }]
    );
}

#[test]
fn rejected_sale_reports_available_stock_and_changes_nothing() {
    let shop = InMemoryShop::in_memory(ShopConfig::default());
    let football = shop
        .add_item(NewItem {
            name: "Football".to_string(),
            category: Category::Balls,
            quantity: 15,
            unit_price: Money::from(1500),
        })
        .unwrap()
        .id_typed();

    let err = shop.record_sale(football_sale(&shop, "INV-1", 16)).unwrap_err();
    assert!(matches!(
        err,
        DispatchError::InsufficientStock { requested: 16, available: 15, .. }
    ));

    assert_eq!(shop.get_item(football).unwrap().quantity(), 15);
    assert!(shop.list_sales().unwrap().is_empty());
    assert!(shop.sales_report(ReportPeriod::Monthly).unwrap().is_empty());
}

#[test]
fn sales_across_periods_bucket_chronologically() {
    let shop = InMemoryShop::in_memory(ShopConfig::default());
    shop.add_item(NewItem {
        name: "Football".to_string(),
        category: Category::Balls,
        quantity: 100,
        unit_price: Money::from(1500),
    })
    .unwrap();

    let at = |y, m, d| Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
    shop.record_sale_at(football_sale(&shop, "INV-3", 1), at(2025, 1, 2)).unwrap();
    shop.record_sale_at(football_sale(&shop, "INV-1", 2), at(2024, 12, 30)).unwrap();
    shop.record_sale_at(football_sale(&shop, "INV-2", 1), at(2024, 12, 31)).unwrap();

    let keys = |period| -> Vec<String> {
        shop.sales_report(period)
            .unwrap()
            .into_iter()
            .map(|b| b.bucket_key)
            .collect()
    };

    assert_eq!(keys(ReportPeriod::Daily), vec!["2024-12-30", "2024-12-31", "2025-01-02"]);
    // 2024-12-30 falls in ISO week 1 of 2025.
    assert_eq!(keys(ReportPeriod::Weekly), vec!["2025-W01"]);
    assert_eq!(keys(ReportPeriod::Monthly), vec!["2024-12", "2025-01"]);
    assert_eq!(keys(ReportPeriod::Yearly), vec!["2024", "2025"]);

    let yearly = shop.sales_report(ReportPeriod::Yearly).unwrap();
    assert_eq!(yearly[0].total_sales, Money::from(4500));
    assert_eq!(yearly[1].total_sales, Money::from(1500));
}
