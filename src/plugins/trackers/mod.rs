// Observation parsers: canonical prices and stock status
pub mod price;
pub mod stock;

pub use price::{parse_price, MonetaryValue, PriceDirection};
pub use stock::{StockStatus, DEFAULT_IN_STOCK_PHRASE};
