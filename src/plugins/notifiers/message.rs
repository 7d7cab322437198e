use crate::monitor::Event;
use crate::plugins::trackers::{PriceDirection, StockStatus};

/// Render an event as Discord-flavoured markdown.
///
/// Every message names the source, the kind of change, the relevant price(s)
/// and links back to the listing.
pub fn render(event: &Event, item_name: &str) -> String {
    match event {
        Event::StockChanged { source, new_status: StockStatus::In, price } => format!(
            "🚨🤩 **{}: {} is IN STOCK!**\n💰 Price: **{}**\n🔗 [Buy Now]({})",
            source.name, item_name, price, source.url
        ),
        Event::StockChanged { source, new_status: StockStatus::Out, price } => format!(
            "🚨😢 **{}: {} is NOW OUT OF STOCK!**\n💰 Price Was: **{}**\n🔗 [Link to Store]({})",
            source.name, item_name, price, source.url
        ),
        Event::BaselineObserved { source, price } => format!(
            "🚨🙂 **{}: Initial Check: {} Price**\n💰 Price: **{}**\n🔗 [Buy Now]({})",
            source.name, item_name, price, source.url
        ),
        Event::PriceChanged { source, old_price, new_price, direction } => {
            let (change, emoji) = match direction {
                PriceDirection::Decrease => ("Price Decrease", "🤩"),
                PriceDirection::Increase => ("Price Increase", "😢"),
            };
            format!(
                "🚨 **{}: {}: {}** {}\n💰 New Price: **{}** (was {})\n🔗 [Buy Now]({})",
                change, source.name, item_name, emoji, new_price, old_price, source.url
            )
        }
    }
}
