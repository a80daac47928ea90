//! Money-weighted return (IRR) solver
//!
//! Finds the rate at which the net present value of a dated cash-flow series
//! plus a terminal portfolio value is zero. The NPV is expressed in
//! discount-factor form with base `x = 1 + r`:
//!
//! ```text
//! NPV(x) = sum_i value_i * x^(-days_i / 365)
//! ```
//!
//! where `days_i` counts from the earliest cash flow. Root finding runs in
//! three phases: a sign probe with recursive bisection to bootstrap the
//! initial guess, Newton-Raphson with a finite-difference derivative, and
//! annualization over the holding period.
//!
//! All money enters as `Decimal` and is converted to f64 exactly once at the
//! NPV entry point; the solver itself is pure floating point.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Sign convention: negative = outflow from the investor (BUY, FEE, DEPOSIT),
/// positive = inflow to the investor (SELL, DIVIDEND, INTEREST, WITHDRAWAL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashFlowType {
    Buy,
    Sell,
    Dividend,
    Interest,
    Fee,
    Deposit,
    Withdrawal,
}

/// A signed cash flow between the investor and the portfolio
#[derive(Debug, Clone)]
pub struct CashFlow {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub flow_type: CashFlowType,
}

impl CashFlow {
    pub fn new(date: NaiveDate, amount: Decimal, flow_type: CashFlowType) -> Self {
        Self {
            date,
            amount,
            flow_type,
        }
    }
}

/// IRR solver output
#[derive(Debug, Clone)]
pub struct IrrResult {
    /// Periodic rate over the interval from the earliest flow to the end date
    pub irr: Option<f64>,
    /// Rate rescaled to a 365-day year
    pub irr_annualized: Option<f64>,
    pub converged: bool,
    pub iterations: u32,
}

impl IrrResult {
    fn empty() -> Self {
        Self {
            irr: None,
            irr_annualized: None,
            converged: true,
            iterations: 0,
        }
    }
}

const MAX_ITERATIONS: u32 = 500;
const CONVERGENCE_TOLERANCE: f64 = 1e-5;
const DERIVATIVE_GUARD: f64 = 1e-10;
const BISECTION_WIDTH: f64 = 1e-3;
const CLAMP_LO: f64 = 1e-4;
const CLAMP_HI: f64 = 100.0;

/// (value, days since earliest flow) pairs; the one place Decimal becomes f64
struct NpvSeries {
    entries: Vec<(f64, f64)>,
}

impl NpvSeries {
    fn npv(&self, x: f64) -> f64 {
        self.entries
            .iter()
            .map(|(value, days)| value * x.powf(-days / 365.0))
            .sum()
    }

    /// Central finite difference with step scaled to the iterate
    fn derivative(&self, x: f64) -> f64 {
        let h = x.abs() * 1e-6;
        (self.npv(x + h) - self.npv(x - h)) / (2.0 * h)
    }
}

/// Solve for the money-weighted rate of return.
///
/// `end_value` is appended as a positive inflow on `end_date`. Returns a null
/// result (both rates `None`) when there are no cash flows, or when every
/// flow and the end value are zero. Non-convergence is reported through
/// `converged = false` with the last iterate, never as an error.
pub fn calculate_irr(cash_flows: &[CashFlow], end_value: Decimal, end_date: NaiveDate) -> IrrResult {
    if cash_flows.is_empty() {
        return IrrResult::empty();
    }

    let total_abs: Decimal = cash_flows.iter().map(|cf| cf.amount.abs()).sum();
    if total_abs.is_zero() && end_value.is_zero() {
        return IrrResult::empty();
    }

    let earliest = cash_flows
        .iter()
        .map(|cf| cf.date)
        .min()
        .unwrap_or(end_date);

    let mut entries: Vec<(f64, f64)> = cash_flows
        .iter()
        .map(|cf| {
            let days = (cf.date - earliest).num_days() as f64;
            (cf.amount.to_f64().unwrap_or(0.0), days)
        })
        .collect();
    entries.push((
        end_value.to_f64().unwrap_or(0.0),
        (end_date - earliest).num_days() as f64,
    ));

    let series = NpvSeries { entries };
    let guess = initial_guess(&series);
    let (x, converged, iterations) = newton_raphson(&series, guess);

    let holding_days = (end_date - earliest).num_days();
    let exponent_days = holding_days.max(1) as f64;

    // The solver works in annual discount space; the reported periodic rate
    // spans the whole holding interval.
    let irr = x.powf(exponent_days / 365.0) - 1.0;
    let irr_annualized = if holding_days <= 0 {
        0.0
    } else if 1.0 + irr > 0.0 {
        (1.0 + irr).powf(365.0 / exponent_days) - 1.0
    } else {
        -1.0
    };

    IrrResult {
        irr: Some(irr),
        irr_annualized: Some(irr_annualized),
        converged,
        iterations,
    }
}

/// Probe the NPV at the bracket edges; bisect when the signs differ,
/// otherwise fall back to a fixed optimistic seed.
fn initial_guess(series: &NpvSeries) -> f64 {
    let lo = 0.001;
    let hi = 1.0;
    let npv_lo = series.npv(lo);
    let npv_hi = series.npv(hi);

    if npv_lo * npv_hi < 0.0 {
        bisect(series, lo, hi, npv_lo)
    } else {
        1.05
    }
}

/// Recursive bisection until the bracket is narrower than `BISECTION_WIDTH`;
/// the midpoint seeds Newton-Raphson.
fn bisect(series: &NpvSeries, lo: f64, hi: f64, npv_lo: f64) -> f64 {
    let mid = (lo + hi) / 2.0;
    if hi - lo < BISECTION_WIDTH {
        return mid;
    }

    let npv_mid = series.npv(mid);
    if npv_lo * npv_mid < 0.0 {
        bisect(series, lo, mid, npv_lo)
    } else {
        bisect(series, mid, hi, npv_mid)
    }
}

/// Returns (root, converged, iterations). Successors are clamped to
/// `[CLAMP_LO, CLAMP_HI]` to keep the iteration from diverging on flat
/// stretches of the NPV curve.
fn newton_raphson(series: &NpvSeries, guess: f64) -> (f64, bool, u32) {
    let mut x = guess;

    for iteration in 1..=MAX_ITERATIONS {
        let derivative = series.derivative(x);
        if derivative.abs() < DERIVATIVE_GUARD {
            return (x, false, iteration);
        }

        let next = (x - series.npv(x) / derivative).clamp(CLAMP_LO, CLAMP_HI);
        let step = (next - x).abs();
        x = next;

        if step < CONVERGENCE_TOLERANCE {
            return (x, true, iteration);
        }
    }

    (x, false, MAX_ITERATIONS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn buy(y: i32, m: u32, d: u32, amount: Decimal) -> CashFlow {
        CashFlow::new(date(y, m, d), amount, CashFlowType::Buy)
    }

    #[test]
    fn test_single_buy_ten_percent() {
        let flows = vec![buy(2023, 1, 1, dec!(-1000))];
        let result = calculate_irr(&flows, dec!(1100), date(2024, 1, 1));

        assert!(result.converged);
        let irr = result.irr.unwrap();
        let annualized = result.irr_annualized.unwrap();
        assert!((irr - 0.10).abs() < 1e-3, "irr = {}", irr);
        assert!((annualized - 0.10).abs() < 1e-3, "annualized = {}", annualized);
    }

    #[test]
    fn test_doubling_over_two_years() {
        let flows = vec![buy(2022, 1, 1, dec!(-1000))];
        let result = calculate_irr(&flows, dec!(2000), date(2024, 1, 1));

        assert!(result.converged);
        let irr = result.irr.unwrap();
        let annualized = result.irr_annualized.unwrap();
        assert!((irr - 1.0).abs() < 1e-2, "irr = {}", irr);
        assert!((annualized - 0.414).abs() < 1e-2, "annualized = {}", annualized);
    }

    #[test]
    fn test_losing_position() {
        let flows = vec![buy(2023, 1, 1, dec!(-1000))];
        let result = calculate_irr(&flows, dec!(800), date(2024, 1, 1));

        assert!(result.converged);
        let irr = result.irr.unwrap();
        assert!((irr + 0.20).abs() < 1e-3, "irr = {}", irr);
    }

    #[test]
    fn test_multiple_flows() {
        // Two deposits, one interim withdrawal, modest growth
        let flows = vec![
            buy(2023, 1, 1, dec!(-1000)),
            buy(2023, 7, 1, dec!(-500)),
            CashFlow::new(date(2023, 10, 1), dec!(200), CashFlowType::Withdrawal),
        ];
        let result = calculate_irr(&flows, dec!(1400), date(2024, 1, 1));

        assert!(result.converged);
        let irr = result.irr.unwrap();
        assert!(irr > 0.0 && irr < 0.25, "irr = {}", irr);
    }

    #[test]
    fn test_empty_flows_is_null() {
        let result = calculate_irr(&[], dec!(1000), date(2024, 1, 1));
        assert!(result.irr.is_none());
        assert!(result.irr_annualized.is_none());
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_all_zero_is_null() {
        let flows = vec![buy(2023, 1, 1, Decimal::ZERO)];
        let result = calculate_irr(&flows, Decimal::ZERO, date(2024, 1, 1));
        assert!(result.irr.is_none());
        assert!(result.irr_annualized.is_none());
    }

    #[test]
    fn test_zero_holding_period_annualizes_to_zero() {
        let flows = vec![buy(2023, 6, 15, dec!(-1000))];
        let result = calculate_irr(&flows, dec!(1050), date(2023, 6, 15));
        assert_eq!(result.irr_annualized, Some(0.0));
    }

    #[test]
    fn test_flat_portfolio_zero_rate() {
        let flows = vec![buy(2023, 1, 1, dec!(-1000))];
        let result = calculate_irr(&flows, dec!(1000), date(2024, 1, 1));

        assert!(result.converged);
        let irr = result.irr.unwrap();
        assert!(irr.abs() < 1e-3, "irr = {}", irr);
    }
}
