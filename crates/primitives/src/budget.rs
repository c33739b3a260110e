//! Capacity budgets.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::RepositoryObject;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;
const TIB: u64 = 1024 * GIB;

/// What a [`CapacityBudget`] counts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum BudgetUnit {
    /// Every object weighs 1.
    Objects,
    /// Every object weighs its payload size.
    Bytes,
}

/// Error returned when a budget string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BudgetParseError {
    #[error("empty capacity")]
    Empty,
    #[error("invalid number in capacity {0:?}")]
    InvalidNumber(String),
    #[error("unknown capacity unit {0:?}")]
    UnknownUnit(String),
    #[error("capacity {0:?} overflows")]
    Overflow(String),
}

/// Ceiling on what a store may hold.
///
/// Parsed from and printed as strings such as `10GiB`, `512MiB`, `500MB`,
/// `1000objects` or a bare byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CapacityBudget {
    limit: u64,
    unit: BudgetUnit,
}

impl CapacityBudget {
    pub const fn objects(limit: u64) -> Self {
        Self {
            limit,
            unit: BudgetUnit::Objects,
        }
    }

    pub const fn bytes(limit: u64) -> Self {
        Self {
            limit,
            unit: BudgetUnit::Bytes,
        }
    }

    /// Budget of `gb` gibibytes.
    pub const fn gib(gb: u64) -> Self {
        Self::bytes(gb.saturating_mul(GIB))
    }

    pub const fn limit(&self) -> u64 {
        self.limit
    }

    pub const fn unit(&self) -> BudgetUnit {
        self.unit
    }

    /// How much of the budget `object` consumes.
    pub fn weight(&self, object: &RepositoryObject) -> u64 {
        match self.unit {
            BudgetUnit::Objects => 1,
            BudgetUnit::Bytes => object.size(),
        }
    }

    /// Whether `object` could fit in an empty store with this budget.
    pub fn admits(&self, object: &RepositoryObject) -> bool {
        self.weight(object) <= self.limit
    }

    /// Usage as a percentage of the limit.
    pub fn percent_used(&self, used: u64) -> f64 {
        if self.limit == 0 {
            return 100.0;
        }
        used as f64 / self.limit as f64 * 100.0
    }
}

impl fmt::Display for CapacityBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            BudgetUnit::Objects => write!(f, "{}objects", self.limit),
            BudgetUnit::Bytes => {
                let n = self.limit;
                for (size, suffix) in [(TIB, "TiB"), (GIB, "GiB"), (MIB, "MiB"), (KIB, "KiB")] {
                    if n != 0 && n % size == 0 {
                        return write!(f, "{}{suffix}", n / size);
                    }
                }
                write!(f, "{n}B")
            }
        }
    }
}

impl FromStr for CapacityBudget {
    type Err = BudgetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(BudgetParseError::Empty);
        }

        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, suffix) = s.split_at(split);
        let n: u64 = digits
            .parse()
            .map_err(|_| BudgetParseError::InvalidNumber(s.to_owned()))?;

        let (unit, multiplier) = match suffix.trim().to_ascii_lowercase().as_str() {
            "" | "b" | "bytes" => (BudgetUnit::Bytes, 1),
            "kb" => (BudgetUnit::Bytes, 1_000),
            "mb" => (BudgetUnit::Bytes, 1_000_000),
            "gb" => (BudgetUnit::Bytes, 1_000_000_000),
            "tb" => (BudgetUnit::Bytes, 1_000_000_000_000),
            "kib" => (BudgetUnit::Bytes, KIB),
            "mib" => (BudgetUnit::Bytes, MIB),
            "gib" => (BudgetUnit::Bytes, GIB),
            "tib" => (BudgetUnit::Bytes, TIB),
            "obj" | "object" | "objects" => (BudgetUnit::Objects, 1),
            other => return Err(BudgetParseError::UnknownUnit(other.to_owned())),
        };

        let limit = n
            .checked_mul(multiplier)
            .ok_or_else(|| BudgetParseError::Overflow(s.to_owned()))?;
        Ok(Self { limit, unit })
    }
}

impl TryFrom<String> for CapacityBudget {
    type Error = BudgetParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CapacityBudget> for String {
    fn from(budget: CapacityBudget) -> Self {
        budget.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("10GiB".parse::<CapacityBudget>(), Ok(CapacityBudget::gib(10)));
        assert_eq!("512 MiB".parse::<CapacityBudget>(), Ok(CapacityBudget::bytes(512 * MIB)));
        assert_eq!("500MB".parse::<CapacityBudget>(), Ok(CapacityBudget::bytes(500_000_000)));
        assert_eq!("1000objects".parse::<CapacityBudget>(), Ok(CapacityBudget::objects(1000)));
        assert_eq!("3 obj".parse::<CapacityBudget>(), Ok(CapacityBudget::objects(3)));
        assert_eq!("123".parse::<CapacityBudget>(), Ok(CapacityBudget::bytes(123)));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<CapacityBudget>(), Err(BudgetParseError::Empty));
        assert!(matches!(
            "GiB".parse::<CapacityBudget>(),
            Err(BudgetParseError::InvalidNumber(_))
        ));
        assert!(matches!(
            "10 parsecs".parse::<CapacityBudget>(),
            Err(BudgetParseError::UnknownUnit(_))
        ));
        assert!(matches!(
            "99999999999TiB".parse::<CapacityBudget>(),
            Err(BudgetParseError::Overflow(_))
        ));
    }

    #[test]
    fn test_display_parses_back() {
        for budget in [
            CapacityBudget::gib(10),
            CapacityBudget::bytes(1500),
            CapacityBudget::bytes(0),
            CapacityBudget::bytes(3 * MIB),
            CapacityBudget::objects(7),
        ] {
            assert_eq!(budget.to_string().parse::<CapacityBudget>(), Ok(budget));
        }
        assert_eq!(CapacityBudget::gib(10).to_string(), "10GiB");
        assert_eq!(CapacityBudget::objects(3).to_string(), "3objects");
    }

    #[test]
    fn test_weight() {
        let obj = RepositoryObject::new("r", "p", vec![0u8; 100], 0);
        assert_eq!(CapacityBudget::objects(3).weight(&obj), 1);
        assert_eq!(CapacityBudget::bytes(1000).weight(&obj), 100);
        assert!(!CapacityBudget::bytes(99).admits(&obj));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&CapacityBudget::gib(2)).unwrap();
        assert_eq!(json, "\"2GiB\"");
        let back: CapacityBudget = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CapacityBudget::gib(2));
    }
}
