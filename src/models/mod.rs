//! Data models for the DropLauncher application.
//!
//! - [`LaunchConfig`]: The strongly typed record of everything bwheadless needs
//! - [`Payload`]: The bot binary, either a library loaded into the game or a standalone client
//! - [`Race`], [`NetworkMode`], [`JoinMode`]: Enumerated game session options
//! - [`LauncherSettings`]: Launcher-wide preferences stored in the `droplauncher` section
//!
//! Setting keys live in [`settings`] so the persistence layer and the
//! [`Headless`](crate::services::Headless) facade agree on one spelling.

pub mod launch_config;
pub mod settings;

pub use launch_config::{
    BWAPI_DLL_FILENAME, BotFileKind, DEFAULT_BOT_NAME, JoinMode, LaunchConfig,
    MAX_PROFILE_NAME_LENGTH, NetworkMode, ParseValueError, Payload, Race, is_bwapi_dll,
};
pub use settings::{
    BWHEADLESS_SECTION, DROPLAUNCHER_SECTION, EXTRA_FILE_KEY, HeadlessKey, LauncherKey,
    LauncherSettings,
};
