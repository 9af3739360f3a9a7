use core::str::FromStr;

use serde::{Deserialize, Serialize};

use sportshub_core::{DomainError, ValueObject};

/// Fixed set of shop categories.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Jerseys,
    Boots,
    Balls,
    Socks,
    Accessories,
    Trophies,
    Medals,
    Equipment,
    Apparel,
    Others,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Jerseys,
        Category::Boots,
        Category::Balls,
        Category::Socks,
        Category::Accessories,
        Category::Trophies,
        Category::Medals,
        Category::Equipment,
        Category::Apparel,
        Category::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Jerseys => "Jerseys",
            Category::Boots => "Boots",
            Category::Balls => "Balls",
            Category::Socks => "Socks",
            Category::Accessories => "Accessories",
            Category::Trophies => "Trophies",
            Category::Medals => "Medals",
            Category::Equipment => "Equipment",
            Category::Apparel => "Apparel",
            Category::Others => "Others",
        }
    }
}

impl ValueObject for Category {}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "unknown category '{wanted}' (expected one of: {})",
                    Category::ALL.map(|c| c.as_str()).join(", ")
                ))
            })
    }
}
