use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// First `$` amount on the page: digits with any commas, then an optional fraction.
static PRICE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d[\d,]*)(?:\.(\d+))?").expect("price pattern is valid"));

const CURRENCY_SYMBOL: &str = "$";

/// A canonical two-decimal dollar amount, or `Unknown` when nothing could be parsed.
///
/// `Unknown` behaves like a float NaN: it is not equal to anything, itself
/// included, and has no ordering against other values.
#[derive(Debug, Clone, Copy)]
pub enum MonetaryValue {
    Amount(Decimal),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceDirection {
    Increase,
    Decrease,
}

impl MonetaryValue {
    pub fn is_known(&self) -> bool {
        matches!(self, MonetaryValue::Amount(_))
    }

    /// Direction of a move from `previous` to `self`, `None` when either side
    /// is unknown or the amounts are equal.
    pub fn direction_from(&self, previous: &MonetaryValue) -> Option<PriceDirection> {
        match self.partial_cmp(previous)? {
            Ordering::Less => Some(PriceDirection::Decrease),
            Ordering::Greater => Some(PriceDirection::Increase),
            Ordering::Equal => None,
        }
    }
}

impl PartialEq for MonetaryValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MonetaryValue::Amount(a), MonetaryValue::Amount(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for MonetaryValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (MonetaryValue::Amount(a), MonetaryValue::Amount(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for MonetaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonetaryValue::Amount(amount) => write!(f, "{}{}", CURRENCY_SYMBOL, amount),
            MonetaryValue::Unknown => f.write_str("N/A"),
        }
    }
}

impl Serialize for MonetaryValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse raw element text into a canonical price.
///
/// Only the first `$` amount is considered. Every comma is dropped and
/// the amount is rounded half away from zero to two decimals, so `$1,299`,
/// `$1299` and `$1299.0` all become `$1299.00`.
pub fn parse_price(text: &str) -> MonetaryValue {
    let Some(captures) = PRICE_REGEX.captures(text) else {
        return MonetaryValue::Unknown;
    };

    let mut number = captures[1].replace(',', "");
    if let Some(fraction) = captures.get(2) {
        number.push('.');
        number.push_str(fraction.as_str());
    }

    match Decimal::from_str(&number) {
        Ok(amount) => {
            let mut amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            amount.rescale(2);
            MonetaryValue::Amount(amount)
        }
        Err(_) => MonetaryValue::Unknown,
    }
}
