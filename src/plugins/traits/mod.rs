pub mod fetcher;
pub mod notifier;

pub use fetcher::{FetchRequest, FetchSession, PageFetcher, PageSnapshot};
pub use notifier::NotifierPlugin;
