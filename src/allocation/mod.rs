//! Allocation analysis
//!
//! Reconciles actual holdings against a strategy's two-level target tree.
//! Sub-class targets are stored as percent-of-parent (how users think about
//! them) but drift is always evaluated as percent-of-total; both
//! representations are carried on every row and never conflated.

pub mod suggestions;
pub mod summary;
pub mod validation;

use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::db::models::{AssetClass, AssetSubClass, Exclusion, Holding, Strategy};

/// Severity band for a drift value against the strategy threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriftStatus {
    Ok,
    Warning,
    Critical,
}

impl DriftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftStatus::Ok => "OK",
            DriftStatus::Warning => "WARNING",
            DriftStatus::Critical => "CRITICAL",
        }
    }

    /// OK below half the threshold, WARNING from half, CRITICAL from the
    /// threshold itself
    pub fn classify(drift_percent: Decimal, threshold: Decimal) -> Self {
        let drift = drift_percent.abs();
        if drift >= threshold {
            DriftStatus::Critical
        } else if drift >= threshold / Decimal::TWO {
            DriftStatus::Warning
        } else {
            DriftStatus::Ok
        }
    }
}

/// Drift row for one sub-class within a class target
#[derive(Debug, Clone, Serialize)]
pub struct SubClassAllocation {
    pub asset_sub_class: AssetSubClass,
    /// Target as stored: percent of the parent class
    pub target_percent_of_parent: Decimal,
    /// Target re-expressed against the whole portfolio
    pub target_percent_of_total: Decimal,
    pub target_value: Decimal,
    pub actual_value: Decimal,
    pub actual_percent_of_total: Decimal,
    pub actual_percent_of_parent: Decimal,
    /// Drift in percent-of-total space
    pub drift_percent: Decimal,
    pub drift_value: Decimal,
    pub status: DriftStatus,
}

/// Drift row for one asset-class target
#[derive(Debug, Clone, Serialize)]
pub struct ClassAllocation {
    pub asset_class: AssetClass,
    pub target_percent: Decimal,
    pub target_value: Decimal,
    pub actual_value: Decimal,
    pub actual_percent: Decimal,
    pub drift_percent: Decimal,
    pub drift_value: Decimal,
    pub status: DriftStatus,
    pub sub_classes: Vec<SubClassAllocation>,
}

/// Full two-level reconciliation of actuals against an active strategy
#[derive(Debug, Clone, Serialize)]
pub struct AllocationAnalysis {
    pub strategy_id: i64,
    pub strategy_name: String,
    pub drift_threshold: Decimal,
    /// Sum of included holdings; excluded holdings are out of the
    /// denominator entirely
    pub portfolio_value: Decimal,
    pub excluded_value: Decimal,
    pub classes: Vec<ClassAllocation>,
    pub max_drift: Decimal,
    pub overall_status: DriftStatus,
}

fn percent_of(value: Decimal, total: Decimal) -> Decimal {
    if total > Decimal::ZERO {
        value / total * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

/// Reconcile holdings against the strategy's targets.
///
/// Holdings flagged `exclude_from_calculation` are removed from both the
/// actual values and the denominator before any percentage is computed.
pub fn analyze(
    strategy: &Strategy,
    holdings: &[Holding],
    exclusions: &[Exclusion],
) -> AllocationAnalysis {
    let excluded_keys: HashMap<(&str, &str), &Exclusion> = exclusions
        .iter()
        .map(|e| ((e.data_source.as_str(), e.symbol.as_str()), e))
        .collect();

    let (excluded, included): (Vec<&Holding>, Vec<&Holding>) = holdings.iter().partition(|h| {
        excluded_keys
            .get(&(h.data_source.as_str(), h.symbol.as_str()))
            .map(|e| e.exclude_from_calculation)
            .unwrap_or(false)
    });

    let portfolio_value: Decimal = included.iter().map(|h| h.value).sum();
    let excluded_value: Decimal = excluded.iter().map(|h| h.value).sum();

    let by_class: HashMap<AssetClass, Decimal> = included
        .iter()
        .map(|h| (h.asset_class, h.value))
        .into_grouping_map()
        .sum();
    let by_sub_class: HashMap<AssetSubClass, Decimal> = included
        .iter()
        .map(|h| (h.asset_sub_class, h.value))
        .into_grouping_map()
        .sum();

    let mut classes = Vec::with_capacity(strategy.class_targets.len());
    for target in &strategy.class_targets {
        let actual_value = by_class
            .get(&target.asset_class)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let actual_percent = percent_of(actual_value, portfolio_value);
        let target_value = target.target_percent / Decimal::ONE_HUNDRED * portfolio_value;
        let drift_percent = actual_percent - target.target_percent;
        let drift_value = actual_value - target_value;

        let mut sub_classes = Vec::with_capacity(target.sub_targets.len());
        for sub in &target.sub_targets {
            let target_percent_of_total =
                target.target_percent * sub.target_percent / Decimal::ONE_HUNDRED;
            let target_value_sub =
                target_percent_of_total / Decimal::ONE_HUNDRED * portfolio_value;
            let actual_value_sub = by_sub_class
                .get(&sub.asset_sub_class)
                .copied()
                .unwrap_or(Decimal::ZERO);
            let actual_percent_of_total = percent_of(actual_value_sub, portfolio_value);
            let actual_percent_of_parent = percent_of(actual_value_sub, actual_value);
            let sub_drift_percent = actual_percent_of_total - target_percent_of_total;

            sub_classes.push(SubClassAllocation {
                asset_sub_class: sub.asset_sub_class,
                target_percent_of_parent: sub.target_percent,
                target_percent_of_total,
                target_value: target_value_sub,
                actual_value: actual_value_sub,
                actual_percent_of_total,
                actual_percent_of_parent,
                drift_percent: sub_drift_percent,
                drift_value: actual_value_sub - target_value_sub,
                status: DriftStatus::classify(sub_drift_percent, strategy.drift_threshold),
            });
        }

        classes.push(ClassAllocation {
            asset_class: target.asset_class,
            target_percent: target.target_percent,
            target_value,
            actual_value,
            actual_percent,
            drift_percent,
            drift_value,
            status: DriftStatus::classify(drift_percent, strategy.drift_threshold),
            sub_classes,
        });
    }

    let max_drift = classes
        .iter()
        .map(|c| c.drift_percent.abs())
        .max()
        .unwrap_or(Decimal::ZERO);
    let overall_status = DriftStatus::classify(max_drift, strategy.drift_threshold);

    AllocationAnalysis {
        strategy_id: strategy.id.unwrap_or_default(),
        strategy_name: strategy.name.clone(),
        drift_threshold: strategy.drift_threshold,
        portfolio_value,
        excluded_value,
        classes,
        max_drift,
        overall_status,
    }
}
