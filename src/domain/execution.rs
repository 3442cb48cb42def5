//! Trade execution and fill simulation.
//!
//! Implements entry fills for market and limit orders, fee-aware sizing,
//! trailing-stop exit fills, and the cash accounting around them.

use chrono::NaiveDateTime;

use super::ohlcv::PriceBar;
use super::portfolio::Portfolio;
use super::position::{ClosedTrade, Position};
use super::strategy::OrderEntry;

pub const DEFAULT_TAKER_FEE: f64 = 0.0020;
pub const DEFAULT_MAKER_FEE: f64 = 0.0010;

/// Fee fractions of notional charged per fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSchedule {
    pub taker: f64,
    pub maker: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule {
            taker: DEFAULT_TAKER_FEE,
            maker: DEFAULT_MAKER_FEE,
        }
    }
}

impl FeeSchedule {
    pub fn disabled() -> Self {
        FeeSchedule {
            taker: 0.0,
            maker: 0.0,
        }
    }

    /// Fee rate paid by an entry placed with `order_entry`.
    pub fn entry_rate(&self, order_entry: OrderEntry) -> f64 {
        match order_entry {
            OrderEntry::Market => self.taker,
            OrderEntry::Limit => self.maker,
        }
    }

    /// Stop exits always take liquidity.
    pub fn exit_rate(&self) -> f64 {
        self.taker
    }
}

/// Entry fill price for a signal on `bar`, or `None` if the order does not fill.
///
/// Market orders fill at the open. Limit orders rest at the prior close and
/// fill at `min(open, limit)` once the low reaches the limit.
pub fn entry_fill_price(bar: &PriceBar, prev_close: Option<f64>, order_entry: OrderEntry) -> Option<f64> {
    match order_entry {
        OrderEntry::Market => Some(bar.open),
        OrderEntry::Limit => {
            let limit = prev_close?;
            (bar.low <= limit).then(|| bar.open.min(limit))
        }
    }
}

/// Exit fill price for `position` on `bar`, or `None` if the stop holds.
///
/// The peak must already include this bar's high. `prior_stop` is the stop in
/// force before this bar; a bar that opens below it fills at the open.
pub fn exit_fill_price(
    position: &Position,
    bar: &PriceBar,
    trailing_stop_pct: f64,
    prior_stop: f64,
) -> Option<f64> {
    if !position.should_exit(bar.low, trailing_stop_pct) {
        return None;
    }
    if bar.open < prior_stop {
        return Some(bar.open);
    }
    Some(position.stop_price(trailing_stop_pct))
}

/// Quantity such that notional plus fee equals `cash * allocation_pct`.
pub fn position_quantity(cash: f64, allocation_pct: f64, price: f64, fee_rate: f64) -> f64 {
    let capital = cash * allocation_pct;
    if capital <= 0.0 || price <= 0.0 {
        return 0.0;
    }
    capital / (price * (1.0 + fee_rate))
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        quantity: f64,
        execution_price: f64,
        cost: f64,
        fee: f64,
    },
    InsufficientCapital,
}

pub fn enter_long(
    portfolio: &mut Portfolio,
    symbol: &str,
    execution_price: f64,
    time: NaiveDateTime,
    allocation_pct: f64,
    fee_rate: f64,
) -> EntryResult {
    let quantity = position_quantity(portfolio.cash, allocation_pct, execution_price, fee_rate);
    if quantity <= 0.0 || !quantity.is_finite() {
        return EntryResult::InsufficientCapital;
    }

    let cost = quantity * execution_price;
    let fee = cost * fee_rate;
    if cost + fee > portfolio.cash + 1e-9 {
        return EntryResult::InsufficientCapital;
    }

    // Sizing already bounds cost + fee by cash; clamp rounding residue.
    portfolio.cash = (portfolio.cash - cost - fee).max(0.0);
    portfolio.add_position(Position {
        symbol: symbol.to_string(),
        entry_time: time,
        entry_price: execution_price,
        peak_price: execution_price,
        quantity,
        allocation_pct,
        entry_fee: fee,
    });

    EntryResult::Entered {
        quantity,
        execution_price,
        cost,
        fee,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub quantity: f64,
    pub exit_price: f64,
    pub exit_value: f64,
    pub exit_fee: f64,
    pub pnl: f64,
}

/// Close the position in `symbol`, credit the proceeds and record the trade.
pub fn exit_position(
    portfolio: &mut Portfolio,
    symbol: &str,
    exit_price: f64,
    exit_time: NaiveDateTime,
    fee_rate: f64,
) -> Option<ExitResult> {
    let position = portfolio.remove_position(symbol)?;

    let exit_value = position.quantity * exit_price;
    let exit_fee = exit_value * fee_rate;
    let pnl = position.quantity * (exit_price - position.entry_price) - position.entry_fee - exit_fee;
    let basis = position.quantity * position.entry_price + position.entry_fee;
    let return_pct = if basis > 0.0 { pnl / basis * 100.0 } else { 0.0 };

    portfolio.cash += exit_value - exit_fee;

    portfolio.record_trade(ClosedTrade {
        symbol: position.symbol,
        entry_time: position.entry_time,
        entry_price: position.entry_price,
        exit_time,
        exit_price,
        quantity: position.quantity,
        allocation_pct: position.allocation_pct,
        entry_fee: position.entry_fee,
        exit_fee,
        pnl,
        return_pct,
        cash_after: portfolio.cash,
    });

    Some(ExitResult {
        quantity: position.quantity,
        exit_price,
        exit_value,
        exit_fee,
        pnl,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn bar(open: f64, high: f64, low: f64, close: f64) -> PriceBar {
        PriceBar {
            symbol: "BTC-USD".into(),
            timestamp: at(1),
            open,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn fee_schedule_rates() {
        let fees = FeeSchedule::default();
        assert_relative_eq!(fees.entry_rate(OrderEntry::Market), 0.0020);
        assert_relative_eq!(fees.entry_rate(OrderEntry::Limit), 0.0010);
        assert_relative_eq!(fees.exit_rate(), 0.0020);
        assert_relative_eq!(FeeSchedule::disabled().exit_rate(), 0.0);
    }

    #[test]
    fn market_fills_at_open() {
        let b = bar(100.0, 105.0, 95.0, 102.0);
        assert_eq!(entry_fill_price(&b, None, OrderEntry::Market), Some(100.0));
    }

    #[test]
    fn limit_fills_at_prior_close_when_reached() {
        let b = bar(100.0, 105.0, 95.0, 102.0);
        assert_eq!(entry_fill_price(&b, Some(97.0), OrderEntry::Limit), Some(97.0));
    }

    #[test]
    fn limit_fills_at_open_when_gapping_below() {
        let b = bar(94.0, 96.0, 93.0, 95.0);
        assert_eq!(entry_fill_price(&b, Some(97.0), OrderEntry::Limit), Some(94.0));
    }

    #[test]
    fn limit_unfilled_above_low() {
        let b = bar(100.0, 105.0, 98.0, 102.0);
        assert_eq!(entry_fill_price(&b, Some(97.0), OrderEntry::Limit), None);
        assert_eq!(entry_fill_price(&b, None, OrderEntry::Limit), None);
    }

    #[test]
    fn quantity_reserves_fee() {
        let qty = position_quantity(10_000.0, 0.5, 100.0, 0.002);
        assert_relative_eq!(qty * 100.0 * 1.002, 5_000.0, epsilon = 1e-9);
        assert_relative_eq!(position_quantity(0.0, 1.0, 100.0, 0.0), 0.0);
        assert_relative_eq!(position_quantity(100.0, 0.0, 100.0, 0.0), 0.0);
    }

    #[test]
    fn enter_long_deducts_cost_and_fee() {
        let mut portfolio = Portfolio::new(10_000.0);
        let result = enter_long(&mut portfolio, "BTC-USD", 100.0, at(1), 1.0, 0.002);

        let EntryResult::Entered { quantity, cost, fee, .. } = result else {
            panic!("expected entry");
        };
        assert_relative_eq!(cost + fee, 10_000.0, epsilon = 1e-6);
        assert_relative_eq!(fee, cost * 0.002, epsilon = 1e-9);
        assert!(portfolio.cash >= 0.0);
        assert!(portfolio.cash < 1e-6);
        let pos = portfolio.get_position("BTC-USD").unwrap();
        assert_relative_eq!(pos.quantity, quantity);
        assert_relative_eq!(pos.peak_price, 100.0);
    }

    #[test]
    fn enter_long_without_cash() {
        let mut portfolio = Portfolio::new(0.0);
        let result = enter_long(&mut portfolio, "BTC-USD", 100.0, at(1), 1.0, 0.0);
        assert_eq!(result, EntryResult::InsufficientCapital);
        assert!(!portfolio.has_position("BTC-USD"));
    }

    #[test]
    fn exit_fill_at_stop() {
        let mut portfolio = Portfolio::new(1_000.0);
        enter_long(&mut portfolio, "BTC-USD", 100.0, at(1), 1.0, 0.0);
        let pos = portfolio.get_position_mut("BTC-USD").unwrap();
        pos.update_peak(110.0);
        let prior_stop = pos.stop_price(0.10);

        // stop = 110 * 0.9 = 99
        let b = bar(105.0, 110.0, 98.0, 99.5);
        assert_relative_eq!(exit_fill_price(pos, &b, 0.10, prior_stop).unwrap(), 99.0, epsilon = 1e-9);
        let holding = bar(105.0, 110.0, 100.0, 101.0);
        assert_eq!(exit_fill_price(pos, &holding, 0.10, prior_stop), None);
    }

    #[test]
    fn exit_fill_at_open_on_gap_down() {
        let mut portfolio = Portfolio::new(1_000.0);
        enter_long(&mut portfolio, "BTC-USD", 100.0, at(1), 1.0, 0.0);
        let pos = portfolio.get_position("BTC-USD").unwrap();

        let b = bar(80.0, 85.0, 75.0, 82.0);
        assert_relative_eq!(exit_fill_price(pos, &b, 0.10, pos.stop_price(0.10)).unwrap(), 80.0);
    }

    #[test]
    fn gap_is_measured_against_stop_before_the_bar() {
        let mut portfolio = Portfolio::new(1_000.0);
        enter_long(&mut portfolio, "BTC-USD", 100.0, at(1), 1.0, 0.0);
        let pos = portfolio.get_position_mut("BTC-USD").unwrap();
        let prior_stop = pos.stop_price(0.02);
        assert_relative_eq!(prior_stop, 98.0, epsilon = 1e-9);

        let b = bar(99.0, 110.0, 98.5, 105.0);
        pos.update_peak(b.high);
        assert_relative_eq!(exit_fill_price(pos, &b, 0.02, prior_stop).unwrap(), 107.8, epsilon = 1e-9);
    }

    #[test]
    fn round_trip_pnl_net_of_fees() {
        let mut portfolio = Portfolio::new(10_000.0);
        let EntryResult::Entered { quantity, fee: entry_fee, .. } =
            enter_long(&mut portfolio, "BTC-USD", 100.0, at(1), 1.0, 0.001)
        else {
            panic!("expected entry");
        };

        let exit = exit_position(&mut portfolio, "BTC-USD", 110.0, at(5), 0.002).unwrap();

        let expected_exit_fee = quantity * 110.0 * 0.002;
        let expected_pnl = quantity * 10.0 - entry_fee - expected_exit_fee;
        assert_relative_eq!(exit.exit_fee, expected_exit_fee, epsilon = 1e-9);
        assert_relative_eq!(exit.pnl, expected_pnl, epsilon = 1e-9);
        assert_relative_eq!(portfolio.cash, 10_000.0 + expected_pnl, epsilon = 1e-6);

        let trade = &portfolio.closed_trades[0];
        assert_relative_eq!(trade.return_pct, expected_pnl / 10_000.0 * 100.0, epsilon = 1e-6);
        assert_relative_eq!(trade.cash_after, portfolio.cash);
        assert_eq!(trade.exit_time, at(5));
    }

    #[test]
    fn single_trade_without_fees_matches_price_move() {
        let mut portfolio = Portfolio::new(1_000.0);
        enter_long(&mut portfolio, "BTC-USD", 100.0, at(1), 1.0, 0.0);
        let exit = exit_position(&mut portfolio, "BTC-USD", 98.0, at(2), 0.0).unwrap();
        assert_relative_eq!(exit.pnl, -20.0, epsilon = 1e-9);
        assert_relative_eq!(portfolio.closed_trades[0].return_pct, -2.0, epsilon = 1e-9);
    }

    #[test]
    fn exit_nonexistent_position() {
        let mut portfolio = Portfolio::new(1_000.0);
        assert!(exit_position(&mut portfolio, "XYZ", 1.0, at(1), 0.0).is_none());
    }
}
