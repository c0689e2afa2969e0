//! Services module - Business logic for configuring and running bwheadless.
//!
//! The services are framework-agnostic: nothing here knows about the command
//! line front end, and every dependency (the settings store, the executable
//! paths) is passed in explicitly.
//!
//! # Components
//!
//! - [`profile`]: [`sanitize_profile_name`] filters names down to what a
//!   StarCraft profile accepts
//! - [`readiness`]: [`evaluate`] reports the first missing piece of
//!   configuration as a [`ReadyStatus`]
//! - [`process`]: [`ProcessPipe`] owns one child process and the write side of
//!   its standard input
//! - [`headless`]: [`Headless`] ties the three together around a
//!   [`SettingsStore`](crate::config::SettingsStore)
//!
//! # Usage Example
//!
//! ```ignore
//! use droplauncher::config::MemoryStore;
//! use droplauncher::services::Headless;
//!
//! let mut headless = Headless::new(MemoryStore::new());
//! headless.set_starcraft_exe("C:/StarCraft/StarCraft.exe")?;
//! headless.set_bwapi_dll("C:/StarCraft/BWAPI.dll")?;
//! headless.set_bot_library("C:/bots/MyBot.dll")?;
//!
//! if headless.is_ready() {
//!     headless.start()?;
//! }
//! // ...
//! headless.stop().await?;
//! ```

pub mod headless;
pub mod process;
pub mod profile;
pub mod readiness;

pub use headless::{DroppedRole, Headless, LaunchError, SettingError, build_args};
pub use process::{PipeError, PipeState, ProcessPipe};
pub use profile::sanitize_profile_name;
pub use readiness::{ReadyStatus, evaluate, is_ready};
