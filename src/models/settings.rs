use serde::{Deserialize, Serialize};

/// Settings section holding launcher-wide preferences.
pub const DROPLAUNCHER_SECTION: &str = "droplauncher";

/// Settings section holding everything passed to bwheadless.
pub const BWHEADLESS_SECTION: &str = "bwheadless";

/// Keys stored in the [`DROPLAUNCHER_SECTION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherKey {
    Version,
    AutoEjectBot,
    AutoBotRejoin,
    ShowLogWindow,
    CleanStarcraftDir,
    WarnUnknownBwapiDll,
    CopyWriteRead,
}

impl LauncherKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            LauncherKey::Version => "version",
            LauncherKey::AutoEjectBot => "auto_eject_bot",
            LauncherKey::AutoBotRejoin => "auto_bot_rejoin",
            LauncherKey::ShowLogWindow => "show_log_window",
            LauncherKey::CleanStarcraftDir => "clean_sc_dir",
            LauncherKey::WarnUnknownBwapiDll => "warn_unknown_bwapi_dll",
            LauncherKey::CopyWriteRead => "copy_write_read",
        }
    }

    /// Boolean preferences and the value written when they are missing.
    pub const TOGGLE_DEFAULTS: [(LauncherKey, bool); 6] = [
        (LauncherKey::AutoEjectBot, true),
        (LauncherKey::AutoBotRejoin, false),
        (LauncherKey::ShowLogWindow, true),
        (LauncherKey::CleanStarcraftDir, true),
        (LauncherKey::WarnUnknownBwapiDll, true),
        (LauncherKey::CopyWriteRead, true),
    ];
}

/// Keys stored in the [`BWHEADLESS_SECTION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlessKey {
    StarcraftExe,
    BwapiDll,
    BotName,
    BotRace,
    BotDll,
    BotClient,
    NetworkProvider,
    JoinMode,
}

impl HeadlessKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeadlessKey::StarcraftExe => "starcraft_exe",
            HeadlessKey::BwapiDll => "bwapi_dll",
            HeadlessKey::BotName => "bot_name",
            HeadlessKey::BotRace => "bot_race",
            HeadlessKey::BotDll => "bot_dll",
            HeadlessKey::BotClient => "bot_client",
            HeadlessKey::NetworkProvider => "network_provider",
            HeadlessKey::JoinMode => "join_mode",
        }
    }
}

/// Base key for auxiliary bot files, stored as `extra_file_0`, `extra_file_1`, ...
pub const EXTRA_FILE_KEY: &str = "extra_file_";

/// Launcher preferences read back from the store.
///
/// `copy_write_read` mirrors BWAPI's option of copying the bot's `write`
/// folder back into `read` after each game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    pub version: String,
    pub auto_eject_bot: bool,
    pub auto_bot_rejoin: bool,
    pub show_log_window: bool,
    pub clean_starcraft_dir: bool,
    pub warn_unknown_bwapi_dll: bool,
    pub copy_write_read: bool,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            version: crate::VERSION.to_string(),
            auto_eject_bot: true,
            auto_bot_rejoin: false,
            show_log_window: true,
            clean_starcraft_dir: true,
            warn_unknown_bwapi_dll: true,
            copy_write_read: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_defaults_match_settings_defaults() {
        let settings = LauncherSettings::default();
        for (key, value) in LauncherKey::TOGGLE_DEFAULTS {
            let expected = match key {
                LauncherKey::AutoEjectBot => settings.auto_eject_bot,
                LauncherKey::AutoBotRejoin => settings.auto_bot_rejoin,
                LauncherKey::ShowLogWindow => settings.show_log_window,
                LauncherKey::CleanStarcraftDir => settings.clean_starcraft_dir,
                LauncherKey::WarnUnknownBwapiDll => settings.warn_unknown_bwapi_dll,
                LauncherKey::CopyWriteRead => settings.copy_write_read,
                LauncherKey::Version => unreachable!(),
            };
            assert_eq!(value, expected, "default mismatch for {}", key.as_str());
        }
    }

    #[test]
    fn test_launcher_settings_yaml() {
        let yaml = serde_yaml_ng::to_string(&LauncherSettings::default()).unwrap();
        assert!(yaml.contains("copy_write_read: true"));

        // Missing fields fall back to their defaults
        let parsed: LauncherSettings = serde_yaml_ng::from_str("auto_bot_rejoin: true\n").unwrap();
        assert!(parsed.auto_bot_rejoin);
        assert!(parsed.copy_write_read);
        assert_eq!(parsed.version, crate::VERSION);
    }
}
