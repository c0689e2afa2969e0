use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum profile name length in Brood War 1.16.1
pub const MAX_PROFILE_NAME_LENGTH: usize = 24;

/// Name used when the configured bot name sanitizes to nothing.
pub const DEFAULT_BOT_NAME: &str = "BOT";

/// The only file name accepted for the BWAPI support library.
pub const BWAPI_DLL_FILENAME: &str = "BWAPI.dll";

/// A string that does not name any variant of one of the launch enums.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseValueError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseValueError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Race selection passed to bwheadless with `--race`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Race {
    #[default]
    Terran,
    Protoss,
    Zerg,
    Random,
}

impl Race {
    pub const ALL: [Race; 4] = [Race::Terran, Race::Protoss, Race::Zerg, Race::Random];

    pub fn as_str(&self) -> &'static str {
        match self {
            Race::Terran => "Terran",
            Race::Protoss => "Protoss",
            Race::Zerg => "Zerg",
            Race::Random => "Random",
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Race {
    type Err = ParseValueError;

    /// Accepts the full race name or its initial, case-insensitive, the same
    /// forms bwheadless itself accepts.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Race::ALL
            .into_iter()
            .find(|race| {
                trimmed.eq_ignore_ascii_case(race.as_str())
                    || trimmed.eq_ignore_ascii_case(&race.as_str()[..1])
            })
            .ok_or_else(|| ParseValueError::new("race", s))
    }
}

/// Network provider bwheadless uses to find or host games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NetworkMode {
    /// LAN over UDP
    #[default]
    Lan,
    /// Local PC over shared memory (provided by BWAPI)
    LocalPc,
}

impl NetworkMode {
    /// Provider name for `--networkprovider`.
    pub fn provider(&self) -> &'static str {
        match self {
            NetworkMode::Lan => "UDPN",
            NetworkMode::LocalPc => "SMEM",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkMode::Lan => "LAN",
            NetworkMode::LocalPc => "LocalPC",
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkMode {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        [NetworkMode::Lan, NetworkMode::LocalPc]
            .into_iter()
            .find(|mode| {
                trimmed.eq_ignore_ascii_case(mode.as_str())
                    || trimmed.eq_ignore_ascii_case(mode.provider())
            })
            .ok_or_else(|| ParseValueError::new("network mode", s))
    }
}

/// Whether the bot hosts a game or joins the first one it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoinMode {
    Host,
    #[default]
    Join,
}

impl JoinMode {
    /// Short bwheadless flag for this mode.
    pub fn flag(&self) -> &'static str {
        match self {
            JoinMode::Host => "-h",
            JoinMode::Join => "-j",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JoinMode::Host => "Host",
            JoinMode::Join => "Join",
        }
    }
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JoinMode {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        [JoinMode::Host, JoinMode::Join]
            .into_iter()
            .find(|mode| trimmed.eq_ignore_ascii_case(mode.as_str()))
            .ok_or_else(|| ParseValueError::new("join mode", s))
    }
}

/// The bot's own binary.
///
/// A bot is either a module loaded into the game process (`Library`) or a
/// standalone client that connects to BWAPI from outside (`Client`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Payload {
    #[default]
    None,
    Library(Utf8PathBuf),
    Client(Utf8PathBuf),
}

impl Payload {
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            Payload::None => None,
            Payload::Library(path) | Payload::Client(path) => Some(path),
        }
    }

    pub fn library(&self) -> Option<&Utf8Path> {
        match self {
            Payload::Library(path) => Some(path),
            _ => None,
        }
    }

    pub fn client(&self) -> Option<&Utf8Path> {
        match self {
            Payload::Client(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }
}

/// Classification of a bot file by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotFileKind {
    Library,
    Client,
    Unknown,
}

impl BotFileKind {
    pub fn from_path(path: &Utf8Path) -> Self {
        match path.extension().map(str::to_ascii_lowercase).as_deref() {
            Some("dll") => BotFileKind::Library,
            Some("exe") | Some("jar") => BotFileKind::Client,
            _ => BotFileKind::Unknown,
        }
    }
}

/// Returns true if the path's file name is `BWAPI.dll`, ignoring case.
pub fn is_bwapi_dll(path: &Utf8Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.eq_ignore_ascii_case(BWAPI_DLL_FILENAME))
}

/// Everything bwheadless needs to start a bot.
///
/// Fields are plain data; validation happens in the setters of
/// [`Headless`](crate::services::Headless) and readiness is computed by
/// [`evaluate`](crate::services::readiness::evaluate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub starcraft_exe: Option<Utf8PathBuf>,
    pub bwapi_dll: Option<Utf8PathBuf>,
    pub bot_name: String,
    pub payload: Payload,
    pub race: Option<Race>,
    pub network: Option<NetworkMode>,
    pub join_mode: Option<JoinMode>,
    pub extra_files: Vec<Utf8PathBuf>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            starcraft_exe: None,
            bwapi_dll: None,
            bot_name: DEFAULT_BOT_NAME.to_string(),
            payload: Payload::None,
            race: Some(Race::default()),
            network: Some(NetworkMode::default()),
            join_mode: Some(JoinMode::default()),
            extra_files: Vec::new(),
        }
    }
}

impl LaunchConfig {
    /// Directory containing the game executable, used as the child's
    /// working directory.
    pub fn starcraft_dir(&self) -> Option<&Utf8Path> {
        self.starcraft_exe
            .as_deref()
            .and_then(Utf8Path::parent)
            .filter(|dir| !dir.as_str().is_empty())
    }
}
