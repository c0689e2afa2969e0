// DropLauncher - Configure and launch bwheadless to run Brood War AI bots
//
// This is the library crate containing the core business logic and data structures.
// The binary crate (main.rs) provides the command line entry point.

pub mod config;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::{MemoryStore, SettingsManager, SettingsStore, YamlSettingsStore};
pub use models::{JoinMode, LaunchConfig, LauncherSettings, NetworkMode, Payload, Race};
pub use services::{Headless, LaunchError, ReadyStatus, SettingError};
pub use state::{AUTO_REJOIN_DELAY, LaunchEvent, SessionManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
