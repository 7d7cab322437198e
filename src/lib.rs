pub mod config;
pub mod coordinator;
pub mod monitor;
pub mod plugins;
pub mod scheduler;
pub mod scraper;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use coordinator::{CycleOutcome, CycleReport, TrackingCoordinator};
pub use monitor::{Event, SourceMonitor};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
