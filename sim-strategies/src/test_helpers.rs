//! Shared fixtures for strategy unit tests: a one-exchange `Environment` over a fixed
//! snapshot book and fixed mark/index price feeds, built on `sim_core::testing`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use sim_core::book::BookSide;
use sim_core::chunk_source::{BookRow, PriceRow, RowAction};
use sim_core::environment::Environment;
use sim_core::exchange::Exchange;
use sim_core::testing::{fixed_exchange, FixedDataSourceFactory};

/// A two-sided snapshot book: one ask at `ask_price`, one bid at `bid_price`.
pub fn book_rows_at(bid_price: Decimal, ask_price: Decimal) -> Vec<BookRow> {
    vec![
        BookRow { timestamp: 0, action: RowAction::Snapshot, side: BookSide::Ask, price: ask_price, size: dec!(10), count: 1 },
        BookRow { timestamp: 0, action: RowAction::Snapshot, side: BookSide::Bid, price: bid_price, size: dec!(10), count: 1 },
    ]
}

/// A single scalar price observation at `ts = 0`.
pub fn price_rows_at(value: Decimal) -> Vec<PriceRow> {
    vec![PriceRow { timestamp: 0, value: Some(value) }]
}

/// A one-exchange `Environment` named `exchange_name`, seeded with `quote_balance` of
/// `USDT`, over the given fixed book/mark/index rows.
pub fn test_environment(
    exchange_name: &str,
    book: Vec<BookRow>,
    mark: Vec<PriceRow>,
    index: Vec<PriceRow>,
    quote_balance: Decimal,
) -> Environment {
    let exchange = fixed_exchange(exchange_name, book, mark, index, quote_balance);
    Environment::new(0, [(exchange_name.to_string(), exchange)])
}

/// Like `test_environment`, but seeds a multi-currency starting balance rather than a
/// single `USDT` amount, for strategies that rebalance a base-currency holding.
pub fn test_environment_with_balances(
    exchange_name: &str,
    book: Vec<BookRow>,
    mark: Vec<PriceRow>,
    index: Vec<PriceRow>,
    balances: impl IntoIterator<Item = (String, Decimal)>,
) -> Environment {
    let exchange = Exchange::new(
        exchange_name,
        Box::new(FixedDataSourceFactory { book, mark, index }),
        10_000,
        1,
        balances,
    )
    .expect("test exchange construction must succeed");
    Environment::new(0, [(exchange_name.to_string(), exchange)])
}
