//! Rebalancing suggestion generation
//!
//! Two passes over an allocation analysis in strict order: sells for
//! overweight sub-classes first, then buys for underweight ones. Priority is
//! positional, starting at 1, class-major and sub-class-minor; within a
//! sub-class, sells follow the holding order supplied by the portfolio
//! collaborator.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::db::models::{AssetClass, AssetSubClass, Exclusion, Holding};

use super::AllocationAnalysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SuggestionAction {
    Buy,
    Sell,
}

impl SuggestionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionAction::Buy => "BUY",
            SuggestionAction::Sell => "SELL",
        }
    }
}

/// One prioritized trade recommendation
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub priority: u32,
    pub action: SuggestionAction,
    pub asset_class: AssetClass,
    pub asset_sub_class: AssetSubClass,
    /// Present on sells; buys leave the symbol choice to the user
    pub symbol: Option<String>,
    pub data_source: Option<String>,
    pub name: Option<String>,
    pub current_value: Decimal,
    pub current_shares: Decimal,
    pub suggested_amount: Decimal,
    /// Whole shares, floored by the market price; sells only
    pub suggested_shares: Option<Decimal>,
    pub reason: String,
    /// Projected share of the total portfolio after exact execution
    pub target_percent_after: Decimal,
    /// Optimistic post-trade drift, assuming exact execution
    pub drift_after: Decimal,
}

/// Generate prioritized SELL-then-BUY suggestions from an analysis.
///
/// `holdings` must be the same collaborator snapshot the analysis was run
/// over; the iteration order of sellable holdings pins the sell priorities.
pub fn generate(
    analysis: &AllocationAnalysis,
    holdings: &[Holding],
    exclusions: &[Exclusion],
) -> Vec<Suggestion> {
    let exclusion_index: HashMap<(&str, &str), &Exclusion> = exclusions
        .iter()
        .map(|e| ((e.data_source.as_str(), e.symbol.as_str()), e))
        .collect();

    let flags = |h: &Holding| -> (bool, bool) {
        exclusion_index
            .get(&(h.data_source.as_str(), h.symbol.as_str()))
            .map(|e| (e.exclude_from_calculation, e.never_sell))
            .unwrap_or((false, false))
    };

    let mut suggestions = Vec::new();
    let mut priority = 1u32;

    // Pass 1 - sells for overweight sub-classes, distributed over sellable
    // holdings in proportion to their value
    for class in &analysis.classes {
        if class.drift_percent <= Decimal::ZERO {
            continue;
        }
        for sub in &class.sub_classes {
            if sub.drift_percent <= Decimal::ZERO {
                continue;
            }

            let amount_to_sell = sub.drift_value.abs();
            let sellable: Vec<&Holding> = holdings
                .iter()
                .filter(|h| h.asset_sub_class == sub.asset_sub_class)
                .filter(|h| {
                    let (excluded, never_sell) = flags(*h);
                    !excluded && !never_sell
                })
                .collect();
            let total_sellable: Decimal = sellable.iter().map(|h| h.value).sum();
            if total_sellable <= Decimal::ZERO {
                continue;
            }

            for holding in sellable {
                let holding_sell_amount = amount_to_sell * holding.value / total_sellable;
                if holding.market_price <= Decimal::ZERO {
                    continue;
                }
                let shares = (holding_sell_amount / holding.market_price).floor();
                if shares <= Decimal::ZERO {
                    continue;
                }

                suggestions.push(Suggestion {
                    priority,
                    action: SuggestionAction::Sell,
                    asset_class: class.asset_class,
                    asset_sub_class: sub.asset_sub_class,
                    symbol: Some(holding.symbol.clone()),
                    data_source: Some(holding.data_source.clone()),
                    name: holding.name.clone(),
                    current_value: holding.value,
                    current_shares: holding.quantity,
                    suggested_amount: holding_sell_amount,
                    suggested_shares: Some(shares),
                    reason: format!(
                        "{}/{} is {:.2}% overweight; sell to move back toward the {:.2}% target",
                        class.asset_class.as_str(),
                        sub.asset_sub_class.as_str(),
                        sub.drift_percent.round_dp(2),
                        sub.target_percent_of_total.round_dp(2),
                    ),
                    target_percent_after: sub.target_percent_of_total,
                    drift_after: Decimal::ZERO,
                });
                priority += 1;
            }
        }
    }

    // Pass 2 - one symbol-less buy per underweight sub-class
    for class in &analysis.classes {
        if class.drift_percent >= Decimal::ZERO {
            continue;
        }
        for sub in &class.sub_classes {
            if sub.drift_percent >= Decimal::ZERO {
                continue;
            }

            suggestions.push(Suggestion {
                priority,
                action: SuggestionAction::Buy,
                asset_class: class.asset_class,
                asset_sub_class: sub.asset_sub_class,
                symbol: None,
                data_source: None,
                name: None,
                current_value: sub.actual_value,
                current_shares: Decimal::ZERO,
                suggested_amount: sub.drift_value.abs(),
                suggested_shares: None,
                reason: format!(
                    "{}/{} is {:.2}% underweight; invest to reach the {:.2}% target",
                    class.asset_class.as_str(),
                    sub.asset_sub_class.as_str(),
                    sub.drift_percent.abs().round_dp(2),
                    sub.target_percent_of_total.round_dp(2),
                ),
                target_percent_after: sub.target_percent_of_total,
                drift_after: Decimal::ZERO,
            });
            priority += 1;
        }
    }

    suggestions
}
