use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Top-level asset classes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AssetClass {
    AlternativeInvestment,
    Commodity,
    Debt,
    Equity,
    FixedIncome,
    Liquidity,
    PreciousMetals,
    RealEstate,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::AlternativeInvestment => "ALTERNATIVE_INVESTMENT",
            AssetClass::Commodity => "COMMODITY",
            AssetClass::Debt => "DEBT",
            AssetClass::Equity => "EQUITY",
            AssetClass::FixedIncome => "FIXED_INCOME",
            AssetClass::Liquidity => "LIQUIDITY",
            AssetClass::PreciousMetals => "PRECIOUS_METALS",
            AssetClass::RealEstate => "REAL_ESTATE",
        }
    }

    pub fn all() -> &'static [AssetClass] {
        &[
            AssetClass::AlternativeInvestment,
            AssetClass::Commodity,
            AssetClass::Debt,
            AssetClass::Equity,
            AssetClass::FixedIncome,
            AssetClass::Liquidity,
            AssetClass::PreciousMetals,
            AssetClass::RealEstate,
        ]
    }

    /// Sub-classes that are valid within this asset class
    pub fn valid_sub_classes(&self) -> &'static [AssetSubClass] {
        VALID_SUB_CLASSES
            .get(self)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

impl FromStr for AssetClass {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALTERNATIVE_INVESTMENT" => Ok(AssetClass::AlternativeInvestment),
            "COMMODITY" => Ok(AssetClass::Commodity),
            "DEBT" => Ok(AssetClass::Debt),
            "EQUITY" => Ok(AssetClass::Equity),
            "FIXED_INCOME" => Ok(AssetClass::FixedIncome),
            "LIQUIDITY" => Ok(AssetClass::Liquidity),
            "PRECIOUS_METALS" => Ok(AssetClass::PreciousMetals),
            "REAL_ESTATE" => Ok(AssetClass::RealEstate),
            _ => Err(()),
        }
    }
}

/// Second-level asset classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AssetSubClass {
    Bond,
    Cash,
    Collectible,
    Commodity,
    Cryptocurrency,
    DebtFund,
    Etf,
    FixedDeposit,
    Gold22k,
    Gold24k,
    GoldEtf,
    House,
    MutualFund,
    Plot,
    PreciousMetal,
    PrivateEquity,
    SilverBar,
    Stock,
}

impl AssetSubClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetSubClass::Bond => "BOND",
            AssetSubClass::Cash => "CASH",
            AssetSubClass::Collectible => "COLLECTIBLE",
            AssetSubClass::Commodity => "COMMODITY",
            AssetSubClass::Cryptocurrency => "CRYPTOCURRENCY",
            AssetSubClass::DebtFund => "DEBT_FUND",
            AssetSubClass::Etf => "ETF",
            AssetSubClass::FixedDeposit => "FIXED_DEPOSIT",
            AssetSubClass::Gold22k => "GOLD_22K",
            AssetSubClass::Gold24k => "GOLD_24K",
            AssetSubClass::GoldEtf => "GOLD_ETF",
            AssetSubClass::House => "HOUSE",
            AssetSubClass::MutualFund => "MUTUALFUND",
            AssetSubClass::Plot => "PLOT",
            AssetSubClass::PreciousMetal => "PRECIOUS_METAL",
            AssetSubClass::PrivateEquity => "PRIVATE_EQUITY",
            AssetSubClass::SilverBar => "SILVER_BAR",
            AssetSubClass::Stock => "STOCK",
        }
    }

    /// Whether this sub-class may appear under the given class
    pub fn is_valid_for(&self, class: AssetClass) -> bool {
        class.valid_sub_classes().contains(self)
    }
}

impl FromStr for AssetSubClass {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BOND" => Ok(AssetSubClass::Bond),
            "CASH" => Ok(AssetSubClass::Cash),
            "COLLECTIBLE" => Ok(AssetSubClass::Collectible),
            "COMMODITY" => Ok(AssetSubClass::Commodity),
            "CRYPTOCURRENCY" => Ok(AssetSubClass::Cryptocurrency),
            "DEBT_FUND" => Ok(AssetSubClass::DebtFund),
            "ETF" => Ok(AssetSubClass::Etf),
            "FIXED_DEPOSIT" => Ok(AssetSubClass::FixedDeposit),
            "GOLD_22K" => Ok(AssetSubClass::Gold22k),
            "GOLD_24K" => Ok(AssetSubClass::Gold24k),
            "GOLD_ETF" => Ok(AssetSubClass::GoldEtf),
            "HOUSE" => Ok(AssetSubClass::House),
            "MUTUALFUND" | "MUTUAL_FUND" => Ok(AssetSubClass::MutualFund),
            "PLOT" => Ok(AssetSubClass::Plot),
            "PRECIOUS_METAL" => Ok(AssetSubClass::PreciousMetal),
            "PRIVATE_EQUITY" => Ok(AssetSubClass::PrivateEquity),
            "SILVER_BAR" => Ok(AssetSubClass::SilverBar),
            "STOCK" => Ok(AssetSubClass::Stock),
            _ => Err(()),
        }
    }
}

/// Class → valid sub-class mapping. Frozen vocabulary; a sub-class target is
/// rejected when its sub-class is absent from its parent's entry here.
static VALID_SUB_CLASSES: Lazy<HashMap<AssetClass, Vec<AssetSubClass>>> = Lazy::new(|| {
    use AssetClass as C;
    use AssetSubClass as S;
    HashMap::from([
        (
            C::Equity,
            vec![S::Etf, S::MutualFund, S::PrivateEquity, S::Stock],
        ),
        (C::Debt, vec![S::Bond, S::DebtFund, S::FixedDeposit]),
        (
            C::PreciousMetals,
            vec![S::Gold22k, S::Gold24k, S::GoldEtf, S::SilverBar],
        ),
        (C::RealEstate, vec![S::House, S::Plot]),
        (C::Commodity, vec![S::Commodity, S::PreciousMetal]),
        (C::Liquidity, vec![S::Cash, S::Cryptocurrency]),
        (C::FixedIncome, vec![S::Bond]),
        (C::AlternativeInvestment, vec![S::Collectible]),
    ])
});

/// Kind of financial event observed in the activity stream
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivityType {
    Buy,
    Sell,
    Dividend,
    Interest,
    Fee,
    Item,
    Liability,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Buy => "BUY",
            ActivityType::Sell => "SELL",
            ActivityType::Dividend => "DIVIDEND",
            ActivityType::Interest => "INTEREST",
            ActivityType::Fee => "FEE",
            ActivityType::Item => "ITEM",
            ActivityType::Liability => "LIABILITY",
        }
    }
}

impl FromStr for ActivityType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(ActivityType::Buy),
            "SELL" => Ok(ActivityType::Sell),
            "DIVIDEND" => Ok(ActivityType::Dividend),
            "INTEREST" => Ok(ActivityType::Interest),
            "FEE" => Ok(ActivityType::Fee),
            "ITEM" => Ok(ActivityType::Item),
            "LIABILITY" => Ok(ActivityType::Liability),
            _ => Err(()),
        }
    }
}

/// An observed financial event. Append-only input; the engine never mutates
/// activities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Option<i64>,
    pub activity_type: ActivityType,
    pub date: NaiveDate,
    pub symbol: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub fee: Decimal,
    /// Explicit total override; when absent the value is quantity x unit_price
    pub value_override: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// Total monetary value of the event (override wins over qty x price)
    pub fn value(&self) -> Decimal {
        self.value_override
            .unwrap_or(self.quantity * self.unit_price)
    }
}

/// Daily portfolio snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Valuation {
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub total_value: Decimal,
    pub deposits: Decimal,
    pub withdrawals: Decimal,
}

impl Valuation {
    /// Net external flow for the day (deposits minus withdrawals)
    pub fn external_flow(&self) -> Decimal {
        self.deposits - self.withdrawals
    }
}

/// A rebalancing strategy with its two-level target tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub id: Option<i64>,
    pub user_id: String,
    pub name: String,
    pub is_active: bool,
    /// Drift percentage that flips a row to CRITICAL; WARNING starts at half
    pub drift_threshold: Decimal,
    pub class_targets: Vec<AssetClassTarget>,
    pub created_at: DateTime<Utc>,
}

/// Target share of the portfolio for one asset class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetClassTarget {
    pub id: Option<i64>,
    pub asset_class: AssetClass,
    /// Percent of the total portfolio, 0-100
    pub target_percent: Decimal,
    pub sub_targets: Vec<AssetSubClassTarget>,
}

/// Target share within a parent class for one sub-class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSubClassTarget {
    pub id: Option<i64>,
    pub asset_sub_class: AssetSubClass,
    /// Percent of the PARENT class, 0-100 (not of the total portfolio)
    pub target_percent: Decimal,
}

/// Per-strategy opt-out for a specific symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exclusion {
    pub id: Option<i64>,
    pub strategy_id: i64,
    pub symbol: String,
    pub data_source: String,
    /// Remove the holding from both actual and denominator before drift
    pub exclude_from_calculation: bool,
    /// Suppress SELL suggestions for the symbol
    pub never_sell: bool,
    pub reason: Option<String>,
}

/// One holding as supplied by the portfolio collaborator, already valued in
/// the base currency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub data_source: String,
    pub name: Option<String>,
    pub asset_class: AssetClass,
    pub asset_sub_class: AssetSubClass,
    pub quantity: Decimal,
    pub market_price: Decimal,
    pub value: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_class_round_trip() {
        for class in AssetClass::all() {
            let parsed: AssetClass = class.as_str().parse().unwrap();
            assert_eq!(parsed, *class);
        }
    }

    #[test]
    fn test_sub_class_validity_mapping() {
        assert!(AssetSubClass::Stock.is_valid_for(AssetClass::Equity));
        assert!(AssetSubClass::Etf.is_valid_for(AssetClass::Equity));
        assert!(AssetSubClass::Bond.is_valid_for(AssetClass::Debt));
        assert!(AssetSubClass::Bond.is_valid_for(AssetClass::FixedIncome));
        assert!(AssetSubClass::Cash.is_valid_for(AssetClass::Liquidity));
        assert!(!AssetSubClass::Stock.is_valid_for(AssetClass::Debt));
        assert!(!AssetSubClass::House.is_valid_for(AssetClass::Equity));
    }

    #[test]
    fn test_every_class_has_sub_classes() {
        for class in AssetClass::all() {
            assert!(
                !class.valid_sub_classes().is_empty(),
                "{} has no sub-classes",
                class.as_str()
            );
        }
    }

    #[test]
    fn test_activity_value_override() {
        let mut activity = Activity {
            id: None,
            activity_type: ActivityType::Buy,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            symbol: Some("VTI".to_string()),
            quantity: Decimal::from(10),
            unit_price: Decimal::from(220),
            fee: Decimal::ONE,
            value_override: None,
            created_at: Utc::now(),
        };
        assert_eq!(activity.value(), Decimal::from(2200));

        activity.value_override = Some(Decimal::from(2150));
        assert_eq!(activity.value(), Decimal::from(2150));
    }

    #[test]
    fn test_valuation_external_flow() {
        let valuation = Valuation {
            id: None,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            total_value: Decimal::from(10_000),
            deposits: Decimal::from(500),
            withdrawals: Decimal::from(200),
        };
        assert_eq!(valuation.external_flow(), Decimal::from(300));
    }

    #[test]
    fn test_mutualfund_accepts_underscore_spelling() {
        let parsed: AssetSubClass = "MUTUAL_FUND".parse().unwrap();
        assert_eq!(parsed, AssetSubClass::MutualFund);
    }
}
