use core::str::FromStr;

use serde::{Deserialize, Serialize};

use sportshub_core::{DomainError, ValueObject};

/// Accepted payment methods.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Card,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    #[serde(rename = "Mobile Money")]
    MobileMoney,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::BankTransfer,
        PaymentMethod::MobileMoney,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::MobileMoney => "Mobile Money",
        }
    }
}

impl ValueObject for PaymentMethod {}

impl core::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase with separators dropped: "Bank Transfer", "bank_transfer" and
/// "BankTransfer" all compare equal.
fn normalize(label: &str) -> String {
    label
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);

        // Legacy label still sent by older registers.
        if wanted == "mpesa" {
            return Ok(PaymentMethod::MobileMoney);
        }

        PaymentMethod::ALL
            .into_iter()
            .find(|m| normalize(m.as_str()) == wanted)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "unknown payment method '{}' (expected one of: {})",
                    s.trim(),
                    PaymentMethod::ALL.map(|m| m.as_str()).join(", ")
                ))
            })
    }
}
