//! FIFO purchase-lot ledger
//!
//! Tracks acquisitions per security as individual lots and consumes them
//! oldest-first on sales and transfers. Lots keep their cost-per-share frozen
//! at creation; only `remaining_shares` ever decreases. Fully consumed lots
//! are retained for audit but excluded from active totals.
//!
//! The ledger is a pure in-memory projection rebuilt from the activity stream
//! per analysis call; it never touches market data or storage. Callers supply
//! the current price when they want a summary.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// One acquisition, the unit of FIFO accounting
#[derive(Debug, Clone)]
pub struct PurchaseLot {
    pub id: u64,
    pub date: NaiveDate,
    /// Shares originally acquired
    pub shares: Decimal,
    /// Frozen at creation: total_cost / shares
    pub cost_per_share: Decimal,
    /// Acquisition cost including fees
    pub total_cost: Decimal,
    pub remaining_shares: Decimal,
    pub fees: Decimal,
}

/// Record of shares taken from one lot during a sale or transfer
#[derive(Debug, Clone)]
pub struct LotConsumed {
    pub lot_id: u64,
    pub lot_date: NaiveDate,
    pub shares: Decimal,
    pub cost_basis: Decimal,
}

/// Outcome of a FIFO sale
#[derive(Debug, Clone)]
pub struct SaleResult {
    pub shares_requested: Decimal,
    /// May be less than requested when the position is short
    pub shares_sold: Decimal,
    pub total_cost_basis: Decimal,
    pub total_proceeds: Decimal,
    pub realized_gain: Decimal,
    pub realized_gain_percent: Decimal,
    pub lots_used: Vec<LotConsumed>,
}

/// Position totals over active lots only
#[derive(Debug, Clone)]
pub struct CostBasisSummary {
    pub total_shares: Decimal,
    pub total_cost_basis: Decimal,
    pub average_cost: Decimal,
    pub unrealized_gain: Decimal,
    pub unrealized_gain_percent: Decimal,
}

/// Securities-keyed FIFO lot store
#[derive(Debug, Default)]
pub struct LotLedger {
    lots: HashMap<String, Vec<PurchaseLot>>,
    next_lot_id: u64,
}

impl LotLedger {
    pub fn new() -> Self {
        Self {
            lots: HashMap::new(),
            next_lot_id: 1,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_lot_id;
        self.next_lot_id += 1;
        id
    }

    /// Record an acquisition. Zero-share purchases are ignored (nothing to
    /// hold, and cost-per-share would be undefined).
    pub fn add_purchase(
        &mut self,
        security: &str,
        date: NaiveDate,
        shares: Decimal,
        total_cost: Decimal,
        fees: Decimal,
    ) {
        if shares <= Decimal::ZERO {
            return;
        }

        let lot = PurchaseLot {
            id: self.next_id(),
            date,
            shares,
            cost_per_share: total_cost / shares,
            total_cost,
            remaining_shares: shares,
            fees,
        };

        let lots = self.lots.entry(security.to_string()).or_default();
        // Insert after any same-date lot so equal dates keep arrival order
        let position = lots.partition_point(|existing| existing.date <= lot.date);
        lots.insert(position, lot);
    }

    /// Consume lots oldest-first for a sale. The ledger never goes negative:
    /// a request beyond the available shares is clamped and the shortfall
    /// shows up as `shares_sold < shares_requested`.
    pub fn process_sale(
        &mut self,
        security: &str,
        shares: Decimal,
        sale_price: Decimal,
        _date: NaiveDate,
    ) -> SaleResult {
        let mut remaining_to_sell = shares.max(Decimal::ZERO);
        let mut total_cost_basis = Decimal::ZERO;
        let mut shares_sold = Decimal::ZERO;
        let mut lots_used = Vec::new();

        if let Some(lots) = self.lots.get_mut(security) {
            for lot in lots.iter_mut() {
                if remaining_to_sell <= Decimal::ZERO {
                    break;
                }
                if lot.remaining_shares <= Decimal::ZERO {
                    continue;
                }

                let consumed = remaining_to_sell.min(lot.remaining_shares);
                let cost_basis = consumed * lot.cost_per_share;

                lot.remaining_shares -= consumed;
                remaining_to_sell -= consumed;
                shares_sold += consumed;
                total_cost_basis += cost_basis;
                lots_used.push(LotConsumed {
                    lot_id: lot.id,
                    lot_date: lot.date,
                    shares: consumed,
                    cost_basis,
                });
            }
        }

        let total_proceeds = shares_sold * sale_price;
        let realized_gain = total_proceeds - total_cost_basis;
        let realized_gain_percent = if total_cost_basis > Decimal::ZERO {
            realized_gain / total_cost_basis * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        SaleResult {
            shares_requested: shares,
            shares_sold,
            total_cost_basis,
            total_proceeds,
            realized_gain,
            realized_gain_percent,
            lots_used,
        }
    }

    /// Consume lots like a sale, but emit replacement lots that keep the
    /// original acquisition date (holding-period continuity) and carry a
    /// proportional slice of the source lot's fees. Booking the returned lots
    /// into a destination ledger is the caller's responsibility.
    pub fn process_transfer(
        &mut self,
        security: &str,
        shares: Decimal,
        _date: NaiveDate,
    ) -> Vec<PurchaseLot> {
        let mut remaining_to_move = shares.max(Decimal::ZERO);
        let mut consumed: Vec<(NaiveDate, Decimal, Decimal, Decimal)> = Vec::new();

        if let Some(lots) = self.lots.get_mut(security) {
            for lot in lots.iter_mut() {
                if remaining_to_move <= Decimal::ZERO {
                    break;
                }
                if lot.remaining_shares <= Decimal::ZERO {
                    continue;
                }

                let taken = remaining_to_move.min(lot.remaining_shares);
                let fee_slice = if lot.shares > Decimal::ZERO {
                    lot.fees * taken / lot.shares
                } else {
                    Decimal::ZERO
                };

                lot.remaining_shares -= taken;
                remaining_to_move -= taken;
                consumed.push((lot.date, taken, lot.cost_per_share, fee_slice));
            }
        }

        consumed
            .into_iter()
            .map(|(date, taken, cost_per_share, fee_slice)| PurchaseLot {
                id: self.next_id(),
                date,
                shares: taken,
                cost_per_share,
                total_cost: taken * cost_per_share,
                remaining_shares: taken,
                fees: fee_slice,
            })
            .collect()
    }

    /// Position totals at the supplied price, over lots with shares remaining
    pub fn summary(&self, security: &str, current_price: Decimal) -> CostBasisSummary {
        let empty = Vec::new();
        let lots = self.lots.get(security).unwrap_or(&empty);

        let mut total_shares = Decimal::ZERO;
        let mut total_cost_basis = Decimal::ZERO;
        for lot in lots.iter().filter(|l| l.remaining_shares > Decimal::ZERO) {
            total_shares += lot.remaining_shares;
            total_cost_basis += lot.remaining_shares * lot.cost_per_share;
        }

        let average_cost = if total_shares > Decimal::ZERO {
            total_cost_basis / total_shares
        } else {
            Decimal::ZERO
        };
        let unrealized_gain = total_shares * current_price - total_cost_basis;
        let unrealized_gain_percent = if total_cost_basis > Decimal::ZERO {
            unrealized_gain / total_cost_basis * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        CostBasisSummary {
            total_shares,
            total_cost_basis,
            average_cost,
            unrealized_gain,
            unrealized_gain_percent,
        }
    }

    /// Days since the oldest lot that still has shares; None when flat
    pub fn oldest_holding_days(&self, security: &str, as_of: NaiveDate) -> Option<i64> {
        self.lots
            .get(security)?
            .iter()
            .find(|lot| lot.remaining_shares > Decimal::ZERO)
            .map(|lot| (as_of - lot.date).num_days())
    }

    /// Whether the oldest open lot has been held past the supplied threshold
    pub fn is_long_term(&self, security: &str, as_of: NaiveDate, threshold_days: i64) -> bool {
        self.oldest_holding_days(security, as_of)
            .map(|days| days > threshold_days)
            .unwrap_or(false)
    }

    /// All lots for a security, consumed ones included
    pub fn lots(&self, security: &str) -> &[PurchaseLot] {
        self.lots.get(security).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn securities(&self) -> impl Iterator<Item = &String> {
        self.lots.keys()
    }

    pub fn clear(&mut self) {
        self.lots.clear();
        self.next_lot_id = 1;
    }
}
