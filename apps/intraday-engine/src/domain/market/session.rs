//! Trading session calendar.
//!
//! All session times are exchange-local wall-clock times. The engine runs on
//! UTC instants and converts through a fixed offset (IST has no DST).

use std::collections::BTreeSet;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Offset, TimeDelta, Utc, Weekday,
};

/// India Standard Time, UTC+05:30.
pub const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Exchange session hours, holidays and the square-off deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSession {
    offset: FixedOffset,
    open: NaiveTime,
    close: NaiveTime,
    broker_square_off: NaiveTime,
    square_off_lead: TimeDelta,
    holidays: BTreeSet<NaiveDate>,
}

impl MarketSession {
    /// Build a session.
    #[must_use]
    pub fn new(
        offset: FixedOffset,
        open: NaiveTime,
        close: NaiveTime,
        broker_square_off: NaiveTime,
        square_off_lead: TimeDelta,
        holidays: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        Self {
            offset,
            open,
            close,
            broker_square_off,
            square_off_lead,
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Convert an instant to exchange-local time.
    #[must_use]
    pub fn local(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.offset)
    }

    /// Exchange-local calendar date of an instant.
    #[must_use]
    pub fn trading_date(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local(now).date_naive()
    }

    /// Whether the exchange trades on this date.
    #[must_use]
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// Whether the market is open right now.
    #[must_use]
    pub fn is_market_open(&self, now: DateTime<Utc>) -> bool {
        let local = self.local(now);
        let time = local.time();
        self.is_trading_day(local.date_naive()) && time >= self.open && time < self.close
    }

    /// Whether no more trading can happen today (weekend, holiday or past close).
    #[must_use]
    pub fn is_market_closed_for_day(&self, now: DateTime<Utc>) -> bool {
        let local = self.local(now);
        !self.is_trading_day(local.date_naive()) || local.time() >= self.close
    }

    /// Local time at which every open position must start squaring off.
    #[must_use]
    pub fn square_off_deadline(&self) -> NaiveTime {
        self.broker_square_off - self.square_off_lead
    }

    /// Whether the intraday square-off deadline has passed.
    #[must_use]
    pub fn is_square_off_time(&self, now: DateTime<Utc>) -> bool {
        let local = self.local(now);
        !self.is_trading_day(local.date_naive()) || local.time() >= self.square_off_deadline()
    }

    /// Session open time.
    #[must_use]
    pub const fn open(&self) -> NaiveTime {
        self.open
    }

    /// Session close time.
    #[must_use]
    pub const fn close(&self) -> NaiveTime {
        self.close
    }
}

impl Default for MarketSession {
    /// NSE cash segment: 09:15–15:30 IST, broker auto square-off at 15:15.
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix()),
            open: wall_clock(9, 15),
            close: wall_clock(15, 30),
            broker_square_off: wall_clock(15, 15),
            square_off_lead: TimeDelta::minutes(2),
            holidays: BTreeSet::new(),
        }
    }
}

fn wall_clock(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}
