//! Transaction charges and P&L for equity intraday trades.
//!
//! Rates follow the discount-broker intraday schedule: brokerage is a
//! percentage of turnover capped per executed order, every statutory levy is
//! charged per side except STT which only applies to the sell side.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::value_objects::TradeType;

/// Percentage rates and caps used to compute charges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeSchedule {
    /// Brokerage percent per side.
    #[serde(default = "default_brokerage_percent")]
    pub brokerage_percent: Decimal,
    /// Brokerage ceiling per side.
    #[serde(default = "default_brokerage_cap")]
    pub brokerage_cap: Decimal,
    /// Exchange turnover fee percent per side.
    #[serde(default = "default_turnover_percent")]
    pub turnover_percent: Decimal,
    /// GST percent on brokerage plus turnover fee.
    #[serde(default = "default_gst_percent")]
    pub gst_percent: Decimal,
    /// Securities transaction tax percent, sell side only.
    #[serde(default = "default_stt_percent")]
    pub stt_percent: Decimal,
    /// Regulator fee percent per side.
    #[serde(default = "default_sebi_percent")]
    pub sebi_percent: Decimal,
    /// Stamp duty percent per side.
    #[serde(default = "default_stamp_percent")]
    pub stamp_percent: Decimal,
}

impl Default for ChargeSchedule {
    fn default() -> Self {
        Self {
            brokerage_percent: default_brokerage_percent(),
            brokerage_cap: default_brokerage_cap(),
            turnover_percent: default_turnover_percent(),
            gst_percent: default_gst_percent(),
            stt_percent: default_stt_percent(),
            sebi_percent: default_sebi_percent(),
            stamp_percent: default_stamp_percent(),
        }
    }
}

const fn default_brokerage_percent() -> Decimal {
    dec!(0.01)
}
const fn default_brokerage_cap() -> Decimal {
    dec!(20)
}
const fn default_turnover_percent() -> Decimal {
    dec!(0.00325)
}
const fn default_gst_percent() -> Decimal {
    dec!(18)
}
const fn default_stt_percent() -> Decimal {
    dec!(0.025)
}
const fn default_sebi_percent() -> Decimal {
    dec!(0.00015)
}
const fn default_stamp_percent() -> Decimal {
    dec!(0.003)
}

/// Profit and loss of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePnl {
    /// Gross P/L.
    pub profit_loss: Decimal,
    /// Total charges.
    pub charges: Decimal,
    /// Gross P/L minus charges.
    pub net_profit_loss: Decimal,
    /// Net P/L as a percent of the entry value; absent when that value is zero.
    pub pl_percentage: Option<Decimal>,
}

impl ChargeSchedule {
    /// Total charges for a round trip of `quantity` shares.
    #[must_use]
    pub fn charges(&self, buy_price: Decimal, sell_price: Decimal, quantity: u32) -> Decimal {
        let qty = Decimal::from(quantity);
        let buy_value = buy_price * qty;
        let sell_value = sell_price * qty;
        let turnover = buy_value + sell_value;

        let brokerage = self.side_brokerage(buy_value) + self.side_brokerage(sell_value);
        let exchange_fee = percent(turnover, self.turnover_percent);
        let gst = percent(brokerage + exchange_fee, self.gst_percent);
        let stt = percent(sell_value, self.stt_percent);
        let sebi = percent(turnover, self.sebi_percent);
        let stamp = percent(turnover, self.stamp_percent);

        brokerage + exchange_fee + gst + stt + sebi + stamp
    }

    /// P&L of a trade closed at `exit`.
    ///
    /// Per-share P/L is rounded to paise before scaling by quantity.
    #[must_use]
    pub fn pnl(&self, trade_type: TradeType, entry: Decimal, exit: Decimal, quantity: u32) -> TradePnl {
        self.pnl_with_exit_value(trade_type, entry, exit, exit, quantity)
    }

    /// Mark-to-market P&L of an open position at `cmp`.
    ///
    /// Charges assume the exit executes at the entry price.
    #[must_use]
    pub fn open_pnl(&self, trade_type: TradeType, entry: Decimal, cmp: Decimal, quantity: u32) -> TradePnl {
        self.pnl_with_exit_value(trade_type, entry, cmp, entry, quantity)
    }

    fn pnl_with_exit_value(
        &self,
        trade_type: TradeType,
        entry: Decimal,
        exit: Decimal,
        charged_exit: Decimal,
        quantity: u32,
    ) -> TradePnl {
        let per_share = match trade_type {
            TradeType::Long => exit - entry,
            TradeType::Short => entry - exit,
        };
        let profit_loss = paise(per_share) * Decimal::from(quantity);

        let (buy, sell) = match trade_type {
            TradeType::Long => (entry, charged_exit),
            TradeType::Short => (charged_exit, entry),
        };
        let charges = paise(self.charges(buy, sell, quantity));
        let net_profit_loss = paise(profit_loss - charges);

        let entry_value = entry * Decimal::from(quantity);
        let pl_percentage = (entry_value > Decimal::ZERO)
            .then(|| paise(net_profit_loss * dec!(100) / entry_value));

        TradePnl {
            profit_loss,
            charges,
            net_profit_loss,
            pl_percentage,
        }
    }

    fn side_brokerage(&self, value: Decimal) -> Decimal {
        percent(value, self.brokerage_percent).min(self.brokerage_cap)
    }
}

fn percent(value: Decimal, rate: Decimal) -> Decimal {
    value * rate / dec!(100)
}

fn paise(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_round_trip_charges() {
        let schedule = ChargeSchedule::default();
        let charges = schedule.charges(dec!(100), dec!(105), 100);
        assert_eq!(charges, dec!(6.475925));
    }

    #[test]
    fn long_trade_pnl() {
        let pnl = ChargeSchedule::default().pnl(TradeType::Long, dec!(100), dec!(105), 100);
        assert_eq!(pnl.profit_loss, dec!(500));
        assert_eq!(pnl.charges, dec!(6.48));
        assert_eq!(pnl.net_profit_loss, dec!(493.52));
        assert_eq!(pnl.pl_percentage, Some(dec!(4.94)));
    }

    #[test]
    fn short_trade_profits_when_price_falls() {
        let pnl = ChargeSchedule::default().pnl(TradeType::Short, dec!(200), dec!(190), 10);
        assert_eq!(pnl.profit_loss, dec!(100));
        assert!(pnl.net_profit_loss < pnl.profit_loss);
    }

    #[test]
    fn short_pays_stt_on_entry_value() {
        let schedule = ChargeSchedule::default();
        let short = schedule.pnl(TradeType::Short, dec!(200), dec!(100), 10);
        let long = schedule.pnl(TradeType::Long, dec!(100), dec!(200), 10);
        assert_eq!(short.charges, long.charges);
        assert_eq!(short.profit_loss, long.profit_loss);
    }

    #[test]
    fn brokerage_is_capped_per_side() {
        let schedule = ChargeSchedule::default();
        // 10 lakh per side: 0.01% = 100, capped at 20
        let big = schedule.charges(dec!(1000), dec!(1000), 1000);
        let turnover = dec!(2000000);
        let expected = dec!(40)
            + turnover * dec!(0.0000325)
            + (dec!(40) + turnover * dec!(0.0000325)) * dec!(0.18)
            + dec!(1000000) * dec!(0.00025)
            + turnover * dec!(0.0000015)
            + turnover * dec!(0.00003);
        assert_eq!(big, expected);
    }

    #[test]
    fn open_position_charges_assume_exit_at_entry() {
        let schedule = ChargeSchedule::default();
        let pnl = schedule.open_pnl(TradeType::Long, dec!(100), dec!(102), 100);
        assert_eq!(pnl.profit_loss, dec!(200));
        assert_eq!(pnl.charges, schedule.charges(dec!(100), dec!(100), 100).round_dp(2));
    }

    #[test]
    fn zero_quantity_has_no_percentage() {
        let pnl = ChargeSchedule::default().pnl(TradeType::Long, dec!(100), dec!(105), 0);
        assert_eq!(pnl.pl_percentage, None);
        assert_eq!(pnl.profit_loss, Decimal::ZERO);
    }
}
