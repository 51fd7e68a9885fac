//! P&L calculator integration tests: ledger replay, realized/unrealized
//! P&L, output-boundary rounding.

use chrono::{Duration, Utc};
use portfolio_engine::engine::{apply_buy, apply_sell};
use portfolio_engine::pnl::{
    compute_average_price, compute_realized_pnl, compute_unrealized_pnl, round_money, RealizedSale,
};
use portfolio_engine::types::trade::{Trade, TradeSide};
use rust_decimal::Decimal;
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn trade(seq: i64, side: TradeSide, quantity: &str, price: &str, fees: &str) -> Trade {
    Trade {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        account_id: Uuid::new_v4(),
        ticker: "PETR4".to_string(),
        side,
        quantity: dec(quantity),
        price: dec(price),
        fees: dec(fees),
        executed_at: Utc::now() + Duration::seconds(seq),
    }
}

#[test]
fn ledger_replay_reproduces_incremental_position() {
    let trades = vec![
        trade(1, TradeSide::Buy, "100", "10.00", "0"),
        trade(2, TradeSide::Buy, "100", "20.00", "0"),
        trade(3, TradeSide::Sell, "50", "25.00", "0"),
        trade(4, TradeSide::Buy, "30", "18.00", "2.40"),
    ];

    // The incremental fold the engine applies per trade.
    let (mut qty, mut avg) = (dec("0"), dec("0"));
    for t in &trades {
        (qty, avg) = match t.side {
            TradeSide::Buy => apply_buy(qty, avg, t.quantity, t.price, t.fees),
            TradeSide::Sell => apply_sell(qty, avg, t.quantity).unwrap(),
        };
    }

    let replayed = compute_average_price(&trades);
    assert_eq!(replayed.total_quantity, qty);
    assert_eq!(replayed.average_price, avg);
}

#[test]
fn ledger_replay_empty_is_flat() {
    let replayed = compute_average_price(&[]);
    assert_eq!(replayed.total_quantity, dec("0"));
    assert_eq!(replayed.average_price, dec("0"));
}

#[test]
fn ledger_replay_full_close_resets_basis() {
    let trades = vec![
        trade(1, TradeSide::Buy, "10", "50.00", "0"),
        trade(2, TradeSide::Sell, "10", "55.00", "0"),
    ];
    let replayed = compute_average_price(&trades);
    assert_eq!(replayed.total_quantity, dec("0"));
    assert_eq!(replayed.average_price, dec("0"));
}

#[test]
fn realized_pnl_uses_basis_at_sale_time() {
    // 50 sold at 25.00 against a 15.00 basis held at that moment.
    let sales = vec![RealizedSale {
        quantity: dec("50"),
        sale_price: dec("25.00"),
        average_cost_at_sale: dec("15.00"),
    }];
    assert_eq!(compute_realized_pnl(&sales), dec("500.00"));
}

#[test]
fn realized_pnl_sums_per_sale_bases() {
    let sales = vec![
        RealizedSale {
            quantity: dec("10"),
            sale_price: dec("12.00"),
            average_cost_at_sale: dec("10.00"),
        },
        RealizedSale {
            quantity: dec("5"),
            sale_price: dec("9.00"),
            average_cost_at_sale: dec("11.00"),
        },
    ];
    // 10*(12-10) + 5*(9-11) = 20 - 10
    assert_eq!(compute_realized_pnl(&sales), dec("10.00"));
}

#[test]
fn unrealized_pnl_against_quote() {
    assert_eq!(
        compute_unrealized_pnl(dec("150"), dec("15.00"), dec("18.00")),
        dec("450.00")
    );
    assert_eq!(
        compute_unrealized_pnl(dec("10"), dec("20.00"), dec("17.50")),
        dec("-25.00")
    );
}

#[test]
fn unrealized_pnl_zero_when_flat() {
    assert_eq!(
        compute_unrealized_pnl(dec("0"), dec("0"), dec("99.99")),
        dec("0")
    );
}

#[test]
fn rounding_is_half_away_from_zero() {
    assert_eq!(round_money(dec("2.345")), dec("2.35"));
    assert_eq!(round_money(dec("-2.345")), dec("-2.35"));
    assert_eq!(round_money(dec("2.3449")), dec("2.34"));
    assert_eq!(round_money(dec("2.005")), dec("2.01"));
}

#[test]
fn rounding_happens_only_at_the_boundary() {
    // Three units at a third of a currency unit each: the intermediate
    // product keeps full precision, the output rounds once.
    let pnl = compute_unrealized_pnl(dec("3"), dec("10.00"), dec("10.333333"));
    assert_eq!(pnl, dec("1.00"));
}
