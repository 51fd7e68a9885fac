//! Execution-engine math integration tests: buy/sell folds, sell guards,
//! ticker normalization.

use portfolio_engine::engine::{apply_buy, apply_sell, normalize_ticker};
use portfolio_engine::error::EngineError;
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn first_buy_sets_quantity_and_average() {
    let (qty, avg) = apply_buy(dec("0"), dec("0"), dec("100"), dec("10.00"), dec("0"));
    assert_eq!(qty, dec("100"));
    assert_eq!(avg, dec("10.00"));
}

#[test]
fn second_buy_blends_weighted_average() {
    let (qty, avg) = apply_buy(dec("100"), dec("10.00"), dec("100"), dec("20.00"), dec("0"));
    assert_eq!(qty, dec("200"));
    assert_eq!(avg, dec("15.00"));
}

#[test]
fn partial_sell_keeps_average() {
    let (qty, avg) = apply_sell(dec("200"), dec("15.00"), dec("50")).unwrap();
    assert_eq!(qty, dec("150"));
    assert_eq!(avg, dec("15.00"));
}

#[test]
fn oversell_fails_with_held_quantity() {
    let err = apply_sell(dec("150"), dec("15.00"), dec("999")).unwrap_err();
    match err {
        EngineError::InsufficientPosition { held, requested } => {
            assert_eq!(held, dec("150"));
            assert_eq!(requested, dec("999"));
        }
        other => panic!("expected InsufficientPosition, got {other:?}"),
    }
}

#[test]
fn full_sell_resets_average_to_zero() {
    let (qty, avg) = apply_sell(dec("150"), dec("15.00"), dec("150")).unwrap();
    assert_eq!(qty, dec("0"));
    assert_eq!(avg, dec("0"));
}

#[test]
fn sell_on_empty_position_fails() {
    assert!(apply_sell(dec("0"), dec("0"), dec("1")).is_err());
}

#[test]
fn fees_fold_into_average_cost() {
    let (qty, avg) = apply_buy(dec("0"), dec("0"), dec("10"), dec("10.00"), dec("5.00"));
    assert_eq!(qty, dec("10"));
    assert_eq!(avg, dec("10.50"));
}

#[test]
fn buy_after_full_close_starts_from_clean_basis() {
    let (qty, avg) = apply_sell(dec("10"), dec("50.00"), dec("10")).unwrap();
    let (qty, avg) = apply_buy(qty, avg, dec("4"), dec("8.00"), dec("0"));
    assert_eq!(qty, dec("4"));
    assert_eq!(avg, dec("8.00"));
}

#[test]
fn repeated_equal_buys_converge_to_trade_price() {
    let (mut qty, mut avg) = (dec("0"), dec("0"));
    for _ in 0..7 {
        (qty, avg) = apply_buy(qty, avg, dec("3"), dec("12.50"), dec("0"));
    }
    assert_eq!(qty, dec("21"));
    assert_eq!(avg, dec("12.50"));
}

#[test]
fn normalize_ticker_trims_and_uppercases() {
    assert_eq!(normalize_ticker("  petr4 ").unwrap(), "PETR4");
    assert_eq!(normalize_ticker("AAPL").unwrap(), "AAPL");
}

#[test]
fn normalize_ticker_rejects_empty() {
    assert!(matches!(
        normalize_ticker("   "),
        Err(EngineError::Validation(_))
    ));
    assert!(normalize_ticker("").is_err());
}
