//! Performance facade
//!
//! Composes the IRR solver, the TTWROR accumulator, and the FIFO lot ledger
//! into per-portfolio and per-holding metrics. The facade is a pure function
//! of its inputs: activities and valuations are sorted and filtered to the
//! requested window, a fresh ledger is built per call, and nothing suspends
//! on I/O.

pub mod irr;
pub mod ledger;
pub mod ttwror;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::db::models::{Activity, ActivityType, Valuation};
use irr::{CashFlow, CashFlowType, IrrResult};
use ledger::{CostBasisSummary, LotLedger};
use ttwror::{TtwrorResult, ValuationPoint};

/// Combined portfolio performance over a reporting window
#[derive(Debug, Clone)]
pub struct PerformanceSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub current_value: Decimal,
    pub irr: IrrResult,
    pub ttwror: TtwrorResult,
    /// Realized gains from FIFO replay of buys and sells
    pub capital_gains: Decimal,
    pub dividends: Decimal,
    pub interest: Decimal,
    pub fees: Decimal,
    pub taxes: Decimal,
    pub absolute_perf: Decimal,
    pub absolute_perf_percent: Decimal,
}

/// Per-holding metrics at a caller-supplied price
#[derive(Debug, Clone)]
pub struct HoldingPerformance {
    pub symbol: String,
    pub irr: IrrResult,
    pub cost_basis: CostBasisSummary,
    pub realized_gain: Decimal,
    pub dividends: Decimal,
    pub oldest_holding_days: Option<i64>,
    pub is_long_term: bool,
}

/// Stable date sort; ties keep input order so replay order is deterministic
fn sorted_window(activities: &[Activity], start: NaiveDate, end: NaiveDate) -> Vec<Activity> {
    let mut window: Vec<Activity> = activities
        .iter()
        .filter(|a| a.date >= start && a.date <= end)
        .cloned()
        .collect();
    window.sort_by_key(|a| a.date);
    window
}

/// Portfolio-level performance.
///
/// The money-weighted side is driven by the valuations' external flows
/// (deposits negative, withdrawals positive, terminal `current_value`
/// positive on `end`); activity-level dividends and sales stay inside the
/// portfolio value and therefore do not appear as IRR flows. The
/// time-weighted side runs over the same valuation series.
pub fn calculate_performance(
    activities: &[Activity],
    valuations: &[Valuation],
    start: NaiveDate,
    end: NaiveDate,
    current_value: Decimal,
) -> PerformanceSummary {
    let window = sorted_window(activities, start, end);

    let mut valuation_window: Vec<&Valuation> = valuations
        .iter()
        .filter(|v| v.date >= start && v.date <= end)
        .collect();
    valuation_window.sort_by_key(|v| v.date);

    // Money-weighted: external flows only, plus the terminal value
    let mut flows = Vec::new();
    for valuation in &valuation_window {
        if valuation.deposits > Decimal::ZERO {
            flows.push(CashFlow::new(
                valuation.date,
                -valuation.deposits,
                CashFlowType::Deposit,
            ));
        }
        if valuation.withdrawals > Decimal::ZERO {
            flows.push(CashFlow::new(
                valuation.date,
                valuation.withdrawals,
                CashFlowType::Withdrawal,
            ));
        }
    }
    let irr = irr::calculate_irr(&flows, current_value, end);

    let points: Vec<ValuationPoint> = valuation_window
        .iter()
        .map(|v| ValuationPoint::new(v.date, v.total_value, v.external_flow()))
        .collect();
    let ttwror = ttwror::calculate_ttwror(&points);

    // Activity totals and FIFO replay for realized gains
    let mut ledger = LotLedger::new();
    let mut capital_gains = Decimal::ZERO;
    let mut dividends = Decimal::ZERO;
    let mut interest = Decimal::ZERO;
    let mut fees = Decimal::ZERO;
    let mut invested = Decimal::ZERO;
    let mut proceeds = Decimal::ZERO;

    for activity in &window {
        fees += activity.fee;
        match activity.activity_type {
            ActivityType::Buy => {
                invested += activity.value() + activity.fee;
                if let Some(symbol) = &activity.symbol {
                    ledger.add_purchase(
                        symbol,
                        activity.date,
                        activity.quantity,
                        activity.value() + activity.fee,
                        activity.fee,
                    );
                }
            }
            ActivityType::Sell => {
                proceeds += activity.value() - activity.fee;
                if let Some(symbol) = &activity.symbol {
                    let sale = ledger.process_sale(
                        symbol,
                        activity.quantity,
                        activity.unit_price,
                        activity.date,
                    );
                    capital_gains += sale.realized_gain;
                }
            }
            ActivityType::Dividend => {
                dividends += activity.value();
                proceeds += activity.value();
            }
            ActivityType::Interest => {
                interest += activity.value();
                proceeds += activity.value();
            }
            ActivityType::Fee => {
                fees += activity.value();
                invested += activity.value();
            }
            // Balance-sheet entries; not part of return computation
            ActivityType::Item | ActivityType::Liability => {}
        }
    }

    let absolute_perf = current_value + proceeds - invested;
    let absolute_perf_percent = if invested > Decimal::ZERO {
        absolute_perf / invested * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    PerformanceSummary {
        start,
        end,
        current_value,
        irr,
        ttwror,
        capital_gains,
        dividends,
        interest,
        fees,
        // No TAX activity type in the stream yet; carried for the contract
        taxes: Decimal::ZERO,
        absolute_perf,
        absolute_perf_percent,
    }
}

/// Single-holding performance from that symbol's activities.
///
/// The IRR here is activity-based: buys out, sells/dividends in, terminal
/// value = remaining shares at `current_price`.
pub fn calculate_holding_performance(
    symbol: &str,
    activities: &[Activity],
    current_price: Decimal,
    end: NaiveDate,
    long_term_threshold_days: i64,
) -> HoldingPerformance {
    let mut window: Vec<&Activity> = activities
        .iter()
        .filter(|a| a.symbol.as_deref() == Some(symbol) && a.date <= end)
        .collect();
    window.sort_by_key(|a| a.date);

    let mut ledger = LotLedger::new();
    let mut flows = Vec::new();
    let mut realized_gain = Decimal::ZERO;
    let mut dividends = Decimal::ZERO;

    for activity in &window {
        match activity.activity_type {
            ActivityType::Buy => {
                ledger.add_purchase(
                    symbol,
                    activity.date,
                    activity.quantity,
                    activity.value() + activity.fee,
                    activity.fee,
                );
                flows.push(CashFlow::new(
                    activity.date,
                    -(activity.value() + activity.fee),
                    CashFlowType::Buy,
                ));
            }
            ActivityType::Sell => {
                let sale = ledger.process_sale(
                    symbol,
                    activity.quantity,
                    activity.unit_price,
                    activity.date,
                );
                realized_gain += sale.realized_gain;
                flows.push(CashFlow::new(
                    activity.date,
                    activity.value() - activity.fee,
                    CashFlowType::Sell,
                ));
            }
            ActivityType::Dividend => {
                dividends += activity.value();
                flows.push(CashFlow::new(
                    activity.date,
                    activity.value(),
                    CashFlowType::Dividend,
                ));
            }
            ActivityType::Interest => {
                flows.push(CashFlow::new(
                    activity.date,
                    activity.value(),
                    CashFlowType::Interest,
                ));
            }
            ActivityType::Fee => {
                flows.push(CashFlow::new(
                    activity.date,
                    -activity.value(),
                    CashFlowType::Fee,
                ));
            }
            ActivityType::Item | ActivityType::Liability => {}
        }
    }

    let cost_basis = ledger.summary(symbol, current_price);
    let terminal_value = cost_basis.total_shares * current_price;
    let irr = irr::calculate_irr(&flows, terminal_value, end);

    let oldest_holding_days = ledger.oldest_holding_days(symbol, end);
    let is_long_term = ledger.is_long_term(symbol, end, long_term_threshold_days);

    HoldingPerformance {
        symbol: symbol.to_string(),
        irr,
        cost_basis,
        realized_gain,
        dividends,
        oldest_holding_days,
        is_long_term,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn activity(
        activity_type: ActivityType,
        y: i32,
        m: u32,
        d: u32,
        symbol: Option<&str>,
        quantity: Decimal,
        unit_price: Decimal,
        fee: Decimal,
    ) -> Activity {
        Activity {
            id: None,
            activity_type,
            date: date(y, m, d),
            symbol: symbol.map(|s| s.to_string()),
            quantity,
            unit_price,
            fee,
            value_override: None,
            created_at: Utc::now(),
        }
    }

    fn valuation(y: i32, m: u32, d: u32, value: Decimal, deposits: Decimal, withdrawals: Decimal) -> Valuation {
        Valuation {
            id: None,
            date: date(y, m, d),
            total_value: value,
            deposits,
            withdrawals,
        }
    }

    #[test]
    fn test_portfolio_performance_composes_components() {
        let activities = vec![
            activity(ActivityType::Buy, 2023, 1, 1, Some("VTI"), dec!(10), dec!(100), dec!(0)),
            activity(ActivityType::Dividend, 2023, 6, 1, Some("VTI"), dec!(0), dec!(0), dec!(0)),
        ];
        let mut activities = activities;
        activities[1].value_override = Some(dec!(30));

        let valuations = vec![
            valuation(2023, 1, 1, dec!(1000), dec!(1000), dec!(0)),
            valuation(2023, 7, 1, dec!(1550), dec!(500), dec!(0)),
            valuation(2024, 1, 1, dec!(1650), dec!(0), dec!(0)),
        ];

        let perf = calculate_performance(
            &activities,
            &valuations,
            date(2023, 1, 1),
            date(2024, 1, 1),
            dec!(1650),
        );

        assert_eq!(perf.dividends, dec!(30));
        assert_eq!(perf.fees, Decimal::ZERO);
        assert_eq!(perf.capital_gains, Decimal::ZERO);
        // Deposit-neutral chaining: 1550/1500 * 1650/1550 - 1 = 10%
        assert!((perf.ttwror.ttwror - dec!(0.10)).abs() < dec!(0.001));
        // IRR flows: -1000, -500, +1650 terminal; converged positive rate
        assert!(perf.irr.converged);
        assert!(perf.irr.irr.unwrap() > 0.0);
    }

    #[test]
    fn test_realized_gains_via_fifo_replay() {
        let activities = vec![
            activity(ActivityType::Buy, 2023, 1, 1, Some("VTI"), dec!(10), dec!(100), dec!(0)),
            activity(ActivityType::Buy, 2023, 2, 1, Some("VTI"), dec!(10), dec!(120), dec!(0)),
            activity(ActivityType::Sell, 2023, 3, 1, Some("VTI"), dec!(15), dec!(130), dec!(0)),
        ];
        let perf = calculate_performance(
            &activities,
            &[],
            date(2023, 1, 1),
            date(2023, 12, 31),
            dec!(650),
        );

        assert_eq!(perf.capital_gains, dec!(350));
        // invested 2200, proceeds 1950, current 650 -> absolute 400
        assert_eq!(perf.absolute_perf, dec!(400));
    }

    #[test]
    fn test_degenerate_empty_inputs() {
        let perf = calculate_performance(
            &[],
            &[],
            date(2023, 1, 1),
            date(2024, 1, 1),
            Decimal::ZERO,
        );
        assert!(perf.irr.irr.is_none());
        assert_eq!(perf.ttwror.ttwror, Decimal::ZERO);
        assert_eq!(perf.absolute_perf, Decimal::ZERO);
        assert_eq!(perf.absolute_perf_percent, Decimal::ZERO);
    }

    #[test]
    fn test_window_filtering() {
        let activities = vec![
            activity(ActivityType::Fee, 2022, 1, 1, None, dec!(0), dec!(0), dec!(0)),
            activity(ActivityType::Fee, 2023, 6, 1, None, dec!(0), dec!(0), dec!(0)),
        ];
        let mut activities = activities;
        activities[0].value_override = Some(dec!(99));
        activities[1].value_override = Some(dec!(7));

        let perf = calculate_performance(
            &activities,
            &[],
            date(2023, 1, 1),
            date(2023, 12, 31),
            Decimal::ZERO,
        );
        assert_eq!(perf.fees, dec!(7));
    }

    #[test]
    fn test_holding_performance_metrics() {
        let activities = vec![
            activity(ActivityType::Buy, 2023, 1, 1, Some("VTI"), dec!(10), dec!(100), dec!(0)),
        ];
        let holding = calculate_holding_performance("VTI", &activities, dec!(110), date(2024, 1, 1), 365);

        assert_eq!(holding.cost_basis.total_shares, dec!(10));
        assert_eq!(holding.cost_basis.unrealized_gain, dec!(100));
        assert_eq!(holding.oldest_holding_days, Some(365));
        assert!(!holding.is_long_term);
        // -1000 out, 1100 terminal over one year: ~10%
        assert!((holding.irr.irr.unwrap() - 0.10).abs() < 1e-3);
    }

    #[test]
    fn test_holding_performance_ignores_other_symbols() {
        let activities = vec![
            activity(ActivityType::Buy, 2023, 1, 1, Some("VTI"), dec!(10), dec!(100), dec!(0)),
            activity(ActivityType::Buy, 2023, 1, 1, Some("BND"), dec!(5), dec!(80), dec!(0)),
        ];
        let holding = calculate_holding_performance("VTI", &activities, dec!(100), date(2024, 1, 1), 365);
        assert_eq!(holding.cost_basis.total_shares, dec!(10));
        assert_eq!(holding.cost_basis.total_cost_basis, dec!(1000));
    }

    #[test]
    fn test_holding_long_term_flag() {
        let activities = vec![
            activity(ActivityType::Buy, 2022, 1, 1, Some("VTI"), dec!(10), dec!(100), dec!(0)),
        ];
        let holding = calculate_holding_performance("VTI", &activities, dec!(100), date(2024, 1, 1), 365);
        assert_eq!(holding.oldest_holding_days, Some(730));
        assert!(holding.is_long_term);
    }
}
