//! Validation for strategy and target mutations
//!
//! Every rule failure surfaces as `EngineError::Validation`; callers decide
//! how to present it. Sums are checked within their own scope: class targets
//! across the strategy, sub-class targets within their parent class.

use anyhow::bail;
use rust_decimal::Decimal;

use crate::db::models::{AssetClass, AssetClassTarget, AssetSubClass, Strategy};
use crate::error::EngineError;
use crate::Result;

pub const MIN_DRIFT_THRESHOLD: Decimal = Decimal::ONE;
pub const MAX_DRIFT_THRESHOLD: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Drift threshold must lie in 1-50 percent
pub fn validate_threshold(threshold: Decimal) -> Result<()> {
    if threshold < MIN_DRIFT_THRESHOLD || threshold > MAX_DRIFT_THRESHOLD {
        bail!(EngineError::Validation(format!(
            "drift threshold must be between {} and {}, got {}",
            MIN_DRIFT_THRESHOLD, MAX_DRIFT_THRESHOLD, threshold
        )));
    }
    Ok(())
}

fn validate_percent(percent: Decimal, what: &str) -> Result<()> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        bail!(EngineError::Validation(format!(
            "{} must be between 0 and 100, got {}",
            what, percent
        )));
    }
    Ok(())
}

/// Check a class-target create/update: percent range, uniqueness within the
/// strategy, and the strategy-wide sum staying within 100.
///
/// `replacing` carries the id of the target being updated so its old percent
/// drops out of the sum.
pub fn validate_class_target(
    strategy: &Strategy,
    asset_class: AssetClass,
    target_percent: Decimal,
    replacing: Option<i64>,
) -> Result<()> {
    validate_percent(target_percent, "class target percent")?;

    for existing in &strategy.class_targets {
        if existing.asset_class == asset_class && existing.id != replacing {
            bail!(EngineError::Validation(format!(
                "strategy '{}' already has a target for {}",
                strategy.name,
                asset_class.as_str()
            )));
        }
    }

    let other_sum: Decimal = strategy
        .class_targets
        .iter()
        .filter(|t| t.id != replacing)
        .map(|t| t.target_percent)
        .sum();
    if other_sum + target_percent > Decimal::ONE_HUNDRED {
        bail!(EngineError::Validation(format!(
            "class targets would sum to {}, exceeding 100",
            other_sum + target_percent
        )));
    }

    Ok(())
}

/// Check a sub-class-target create/update: percent range, membership in the
/// class's valid sub-class set, uniqueness, and the within-class sum staying
/// within 100.
pub fn validate_sub_class_target(
    class_target: &AssetClassTarget,
    asset_sub_class: AssetSubClass,
    target_percent: Decimal,
    replacing: Option<i64>,
) -> Result<()> {
    validate_percent(target_percent, "sub-class target percent")?;

    if !asset_sub_class.is_valid_for(class_target.asset_class) {
        bail!(EngineError::Validation(format!(
            "{} is not a valid sub-class of {}",
            asset_sub_class.as_str(),
            class_target.asset_class.as_str()
        )));
    }

    for existing in &class_target.sub_targets {
        if existing.asset_sub_class == asset_sub_class && existing.id != replacing {
            bail!(EngineError::Validation(format!(
                "{} already has a target for {}",
                class_target.asset_class.as_str(),
                asset_sub_class.as_str()
            )));
        }
    }

    let other_sum: Decimal = class_target
        .sub_targets
        .iter()
        .filter(|t| t.id != replacing)
        .map(|t| t.target_percent)
        .sum();
    if other_sum + target_percent > Decimal::ONE_HUNDRED {
        bail!(EngineError::Validation(format!(
            "sub-class targets within {} would sum to {}, exceeding 100",
            class_target.asset_class.as_str(),
            other_sum + target_percent
        )));
    }

    Ok(())
}
