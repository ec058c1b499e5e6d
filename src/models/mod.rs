pub mod monitor_config;
pub mod notification_config;
pub mod status;
pub mod target;

// Re-exports for convenience
pub use monitor_config::*;
pub use notification_config::*;
pub use status::*;
pub use target::*;
