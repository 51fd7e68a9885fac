//! Pure P&L arithmetic. No I/O: the execution engine and portfolio views
//! feed these functions, and reconciliation replays the ledger through them.
//!
//! Monetary outputs round to 2 decimal places, half away from zero, exactly
//! once at the output boundary; intermediates keep full precision.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::engine::{apply_buy, apply_sell};
use crate::types::trade::{Trade, TradeSide};

pub const MONEY_DP: u32 = 2;

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AveragePrice {
    pub average_price: Decimal,
    pub total_quantity: Decimal,
}

/// One historical sale, carrying the average cost *as of that sale* so the
/// result is free of look-ahead bias. The caller supplies that basis; using
/// the current average here would be wrong.
#[derive(Debug, Clone, PartialEq)]
pub struct RealizedSale {
    pub quantity: Decimal,
    pub sale_price: Decimal,
    pub average_cost_at_sale: Decimal,
}

/// Replay an ordered trade list through the same fold the engine applies
/// incrementally. Divergence from the stored position (beyond rounding)
/// means the aggregate is corrupt.
pub fn compute_average_price(trades: &[Trade]) -> AveragePrice {
    let mut quantity = Decimal::ZERO;
    let mut average = Decimal::ZERO;
    for trade in trades {
        (quantity, average) = match trade.side {
            TradeSide::Buy => {
                apply_buy(quantity, average, trade.quantity, trade.price, trade.fees)
            }
            TradeSide::Sell => {
                // A well-formed ledger never oversells; replaying one that
                // does stops the basis at a full close.
                apply_sell(quantity, average, trade.quantity)
                    .unwrap_or((Decimal::ZERO, Decimal::ZERO))
            }
        };
    }
    AveragePrice {
        average_price: average,
        total_quantity: quantity,
    }
}

/// Sum of `quantity * (sale_price - average_cost_at_sale)` over the sales.
pub fn compute_realized_pnl(sales: &[RealizedSale]) -> Decimal {
    let total = sales
        .iter()
        .map(|s| s.quantity * s.sale_price - s.quantity * s.average_cost_at_sale)
        .sum::<Decimal>();
    round_money(total)
}

/// Paper P&L of the held units against a live quote. Zero when flat.
pub fn compute_unrealized_pnl(
    quantity: Decimal,
    average_cost: Decimal,
    current_quote: Decimal,
) -> Decimal {
    if quantity.is_zero() {
        return Decimal::ZERO;
    }
    round_money((current_quote - average_cost) * quantity)
}
