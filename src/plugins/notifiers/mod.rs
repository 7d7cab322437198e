// Notifier plugin implementations
pub mod discord;
pub mod log;
pub mod message;

pub use discord::DiscordNotifier;
pub use log::LogNotifier;
