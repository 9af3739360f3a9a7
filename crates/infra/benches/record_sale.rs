use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use sportshub_core::Money;
use sportshub_infra::config::ShopConfig;
use sportshub_infra::ledger::NewItem;
use sportshub_infra::InMemoryShop;
use sportshub_inventory::{Category, ItemId};
use sportshub_sales::{ReportPeriod, SaleLineRequest, SaleRequest};

fn shop_with_items(count: usize, quantity: i64) -> (InMemoryShop, Vec<ItemId>) {
    let shop = InMemoryShop::in_memory(ShopConfig::default());
    let ids = (0..count)
        .map(|i| {
            shop.add_item(NewItem {
                name: format!("Item {i}"),
                category: Category::Equipment,
                quantity,
                unit_price: Money::from(100),
            })
            .unwrap()
            .id_typed()
        })
        .collect();
    (shop, ids)
}

fn request(invoice: String, items: &[ItemId]) -> SaleRequest {
    SaleRequest {
        invoice_number: invoice,
        payment_method: "Cash".to_string(),
        lines: items
            .iter()
            .map(|id| SaleLineRequest {
                item_id: id.to_string(),
                quantity: 1,
                unit_price: Money::from(100),
            })
            .collect(),
    }
}

fn bench_record_sale(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_sale");

    for lines in [1usize, 5, 20].iter() {
        group.throughput(Throughput::Elements(*lines as u64));
        group.bench_with_input(BenchmarkId::new("lines", lines), lines, |b, &lines| {
            let (shop, ids) = shop_with_items(lines, i64::MAX / 2);
            let mut n = 0u64;
            b.iter(|| {
                n += 1;
                let sale = shop.record_sale(request(format!("INV-{n}"), &ids)).unwrap();
                black_box(sale);
            });
        });
    }

    group.finish();
}

fn bench_sales_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("sales_report");

    for sales in [100usize, 1_000].iter() {
        let (shop, ids) = shop_with_items(3, i64::MAX / 2);
        for n in 0..*sales {
            shop.record_sale(request(format!("INV-{n}"), &ids)).unwrap();
        }

        group.bench_with_input(BenchmarkId::new("daily", sales), sales, |b, _| {
            b.iter(|| black_box(shop.sales_report(ReportPeriod::Daily).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_record_sale, bench_sales_report);
criterion_main!(benches);
