//! Calendar bucketing of committed sales.
//!
//! Pure functions over already-committed transactions. Buckets are sparse:
//! a period with no sales produces no bucket.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use sportshub_core::{DomainError, Money};

use crate::transaction::{sale_total, SaleTransaction};

/// Report granularity.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Daily => "daily",
            ReportPeriod::Weekly => "weekly",
            ReportPeriod::Monthly => "monthly",
            ReportPeriod::Yearly => "yearly",
        }
    }

    /// Sortable key of the calendar bucket containing `at` (UTC).
    ///
    /// Zero-padded so lexical order equals chronological order:
    /// `2024-03-09`, `2024-W10`, `2024-03`, `2024`.
    pub fn bucket_key(&self, at: DateTime<Utc>) -> String {
        match self {
            ReportPeriod::Daily => at.format("%Y-%m-%d").to_string(),
            ReportPeriod::Weekly => {
                let week = at.iso_week();
                format!("{:04}-W{:02}", week.year(), week.week())
            }
            ReportPeriod::Monthly => format!("{:04}-{:02}", at.year(), at.month()),
            ReportPeriod::Yearly => format!("{:04}", at.year()),
        }
    }
}

impl core::fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ReportPeriod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(ReportPeriod::Daily),
            "weekly" => Ok(ReportPeriod::Weekly),
            "monthly" => Ok(ReportPeriod::Monthly),
            "yearly" => Ok(ReportPeriod::Yearly),
            other => Err(DomainError::validation(format!(
                "unknown report period '{other}' (expected daily, weekly, monthly or yearly)"
            ))),
        }
    }
}

/// One point of the sales series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBucket {
    pub bucket_key: String,
    pub total_sales: Money,
}

/// Sum `quantity × unit price at sale time` per bucket, in chronological order.
///
/// Fails only when a bucket total no longer fits a `Decimal`.
pub fn aggregate<'a, I>(period: ReportPeriod, transactions: I) -> Result<Vec<ReportBucket>, DomainError>
where
    I: IntoIterator<Item = &'a SaleTransaction>,
{
    let mut buckets: BTreeMap<String, Money> = BTreeMap::new();

    for tx in transactions {
        let total = sale_total(tx.lines())?;
        let key = period.bucket_key(tx.recorded_at());
        let slot = buckets.entry(key.clone()).or_insert(Money::ZERO);
        *slot = slot.checked_add(total).ok_or_else(|| {
            DomainError::invariant(format!("{period} sales total for {key} is too large to report"))
        })?;
    }

    Ok(buckets
        .into_iter()
        .map(|(bucket_key, total_sales)| ReportBucket {
            bucket_key,
            total_sales,
        })
        .collect())
}
