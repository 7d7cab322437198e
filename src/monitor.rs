use serde::Serialize;

use crate::plugins::trackers::{parse_price, MonetaryValue, PriceDirection, StockStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceIdentity {
    pub name: String,
    pub url: String,
}

/// A meaningful change derived from one observation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    StockChanged {
        source: SourceIdentity,
        new_status: StockStatus,
        price: MonetaryValue,
    },
    BaselineObserved {
        source: SourceIdentity,
        price: MonetaryValue,
    },
    PriceChanged {
        source: SourceIdentity,
        old_price: MonetaryValue,
        new_price: MonetaryValue,
        direction: PriceDirection,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Baseline,
    StockIn,
    StockOut,
    PriceUp,
    PriceDown,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Baseline => "baseline",
            EventKind::StockIn => "stock_in",
            EventKind::StockOut => "stock_out",
            EventKind::PriceUp => "price_up",
            EventKind::PriceDown => "price_down",
        }
    }
}

impl Event {
    pub fn source(&self) -> &SourceIdentity {
        match self {
            Event::StockChanged { source, .. }
            | Event::BaselineObserved { source, .. }
            | Event::PriceChanged { source, .. } => source,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::StockChanged { new_status: StockStatus::In, .. } => EventKind::StockIn,
            Event::StockChanged { new_status: StockStatus::Out, .. } => EventKind::StockOut,
            Event::BaselineObserved { .. } => EventKind::Baseline,
            Event::PriceChanged { direction: PriceDirection::Increase, .. } => EventKind::PriceUp,
            Event::PriceChanged { direction: PriceDirection::Decrease, .. } => EventKind::PriceDown,
        }
    }
}

/// Last-known view of one source. Lives as long as the process.
#[derive(Debug, Clone)]
pub struct SourceState {
    identity: SourceIdentity,
    last_status: Option<StockStatus>,
    last_price: Option<MonetaryValue>,
    has_announced_baseline: bool,
}

impl SourceState {
    pub fn new(identity: SourceIdentity) -> Self {
        Self {
            identity,
            last_status: None,
            last_price: None,
            has_announced_baseline: false,
        }
    }

    pub fn identity(&self) -> &SourceIdentity {
        &self.identity
    }

    pub fn last_status(&self) -> Option<StockStatus> {
        self.last_status
    }

    pub fn last_price(&self) -> Option<MonetaryValue> {
        self.last_price
    }

    pub fn has_announced_baseline(&self) -> bool {
        self.has_announced_baseline
    }
}

/// Change detector for a single source.
///
/// Each observation is compared against the state left by the previous
/// successful observation; state is only written after the events for the
/// current observation have been computed.
#[derive(Debug, Clone)]
pub struct SourceMonitor {
    state: SourceState,
}

impl SourceMonitor {
    pub fn new(identity: SourceIdentity) -> Self {
        Self {
            state: SourceState::new(identity),
        }
    }

    pub fn state(&self) -> &SourceState {
        &self.state
    }

    /// Returns events in reporting order: stock, baseline, price.
    pub fn observe(&mut self, status: StockStatus, price_text: &str) -> Vec<Event> {
        let new_price = parse_price(price_text);
        let identity = &self.state.identity;
        let mut events = Vec::new();

        if let Some(last_status) = self.state.last_status {
            if last_status != status {
                events.push(Event::StockChanged {
                    source: identity.clone(),
                    new_status: status,
                    price: new_price,
                });
            }
        }

        // Announced with the first price that actually parses, never with N/A.
        if !self.state.has_announced_baseline && new_price.is_known() {
            events.push(Event::BaselineObserved {
                source: identity.clone(),
                price: new_price,
            });
            self.state.has_announced_baseline = true;
        }

        if let Some(old_price) = self.state.last_price {
            if let Some(direction) = new_price.direction_from(&old_price) {
                events.push(Event::PriceChanged {
                    source: identity.clone(),
                    old_price,
                    new_price,
                    direction,
                });
            }
        }

        self.state.last_status = Some(status);
        if new_price.is_known() {
            self.state.last_price = Some(new_price);
        }

        events
    }
}
