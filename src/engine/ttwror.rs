//! True time-weighted rate of return
//!
//! Links daily sub-period returns geometrically so that external cash flows
//! have no effect on the result. Inbound flows are attributed to the start of
//! their period (they grow the denominator), outbound flows to the end (they
//! are added back to the closing value); a flow with no market movement then
//! contributes a factor of exactly 1.
//!
//! Everything stays in `Decimal`; only the annualized rate, which needs a
//! fractional power, leaves as f64.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// One day of the valuation series
#[derive(Debug, Clone)]
pub struct ValuationPoint {
    pub date: NaiveDate,
    pub market_value: Decimal,
    /// Net external flow on the day: deposits positive, withdrawals negative
    pub external_flow: Decimal,
}

impl ValuationPoint {
    pub fn new(date: NaiveDate, market_value: Decimal, external_flow: Decimal) -> Self {
        Self {
            date,
            market_value,
            external_flow,
        }
    }
}

/// Cumulative return recorded after each day's linking step
#[derive(Debug, Clone)]
pub struct DailyReturn {
    pub date: NaiveDate,
    /// Cumulative return up to and including this day (0.05 = +5%)
    pub cumulative: Decimal,
}

/// TTWROR accumulator output
#[derive(Debug, Clone)]
pub struct TtwrorResult {
    /// Cumulative time-weighted return over the whole series (0.1 = 10%)
    pub ttwror: Decimal,
    /// Rescaled to a 365-day year
    pub ttwror_annualized: f64,
    /// Calendar span of the series
    pub days: i64,
    pub series: Vec<DailyReturn>,
}

impl TtwrorResult {
    fn zero() -> Self {
        Self {
            ttwror: Decimal::ZERO,
            ttwror_annualized: 0.0,
            days: 0,
            series: Vec::new(),
        }
    }
}

/// Chain daily returns into the cumulative time-weighted return.
///
/// Periods whose denominator is not positive contribute nothing; the
/// cumulative factor simply carries forward. Fewer than two points yields
/// all zeros.
pub fn calculate_ttwror(points: &[ValuationPoint]) -> TtwrorResult {
    if points.len() < 2 {
        return TtwrorResult::zero();
    }

    let mut sorted: Vec<&ValuationPoint> = points.iter().collect();
    sorted.sort_by_key(|p| p.date);

    let mut cumulative_factor = Decimal::ONE;
    let mut series = Vec::with_capacity(sorted.len() - 1);

    for pair in sorted.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);

        let inbound = curr.external_flow.max(Decimal::ZERO);
        let outbound = (-curr.external_flow).max(Decimal::ZERO);
        let denominator = prev.market_value + inbound;

        if denominator > Decimal::ZERO {
            let period_return = (curr.market_value + outbound) / denominator - Decimal::ONE;
            cumulative_factor *= Decimal::ONE + period_return;
        }

        series.push(DailyReturn {
            date: curr.date,
            cumulative: cumulative_factor - Decimal::ONE,
        });
    }

    let ttwror = cumulative_factor - Decimal::ONE;
    let days = (sorted[sorted.len() - 1].date - sorted[0].date).num_days();

    let base = 1.0 + ttwror.to_f64().unwrap_or(0.0);
    let ttwror_annualized = if days <= 0 {
        0.0
    } else if base > 0.0 {
        base.powf(365.0 / days as f64) - 1.0
    } else {
        -1.0
    };

    TtwrorResult {
        ttwror,
        ttwror_annualized,
        days,
        series,
    }
}
