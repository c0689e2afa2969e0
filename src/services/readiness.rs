//! Launch readiness checks.
//!
//! [`evaluate`] walks the configuration in a fixed order and reports the first
//! thing that would stop bwheadless from starting. It never fails and never
//! caches: call it whenever the answer is needed.

use crate::models::{LaunchConfig, MAX_PROFILE_NAME_LENGTH};
use camino::Utf8Path;
use std::fmt;

/// Result of a readiness check; everything but `Ready` names a missing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadyStatus {
    StarcraftExe,
    BwapiDll,
    BotName,
    BotFile,
    BotRace,
    NetworkMode,
    JoinMode,
    Ready,
}

impl ReadyStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReadyStatus::Ready)
    }

    /// Message shown to the user when a launch is refused.
    pub fn message(&self) -> &'static str {
        match self {
            ReadyStatus::StarcraftExe => "missing StarCraft.exe",
            ReadyStatus::BwapiDll => "missing BWAPI.dll",
            ReadyStatus::BotName => "missing or invalid bot name",
            ReadyStatus::BotFile => "missing bot file (*.dll, *.exe or *.jar)",
            ReadyStatus::BotRace => "missing bot race",
            ReadyStatus::NetworkMode => "missing network provider",
            ReadyStatus::JoinMode => "missing join mode",
            ReadyStatus::Ready => "ready",
        }
    }
}

impl fmt::Display for ReadyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

fn file_exists(path: Option<&Utf8Path>) -> bool {
    path.is_some_and(Utf8Path::is_file)
}

/// Evaluate `config`; the first failing check wins.
pub fn evaluate(config: &LaunchConfig) -> ReadyStatus {
    let name = config.bot_name.trim();

    if !file_exists(config.starcraft_exe.as_deref()) {
        ReadyStatus::StarcraftExe
    } else if !file_exists(config.bwapi_dll.as_deref()) {
        ReadyStatus::BwapiDll
    } else if name.is_empty() || config.bot_name.chars().count() > MAX_PROFILE_NAME_LENGTH {
        ReadyStatus::BotName
    } else if !file_exists(config.payload.path()) {
        ReadyStatus::BotFile
    } else if config.race.is_none() {
        ReadyStatus::BotRace
    } else if config.network.is_none() {
        ReadyStatus::NetworkMode
    } else if config.join_mode.is_none() {
        ReadyStatus::JoinMode
    } else {
        ReadyStatus::Ready
    }
}

pub fn is_ready(config: &LaunchConfig) -> bool {
    evaluate(config).is_ready()
}
