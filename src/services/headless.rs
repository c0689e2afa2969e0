/*
> bwheadless.exe --help
Usage: bwheadless.exe [option]...
A tool to start StarCraft: Brood War as a console application, with no graphics, sound or user input.

  -e, --exe         The exe file to launch. Default 'StarCraft.exe'.
  -h, --host        Host a game instead of joining.
  -j, --join        Join instead of hosting. The first game that is found
                    will be joined.
  -n, --name NAME   The player name. Default 'playername'.
  -g, --game NAME   The game name when hosting. Defaults to the player name.
                    If this option is specified when joining, then only games
                    with the specified name will be joined.
  -m, --map FILE    The map to use when hosting.
  -r, --race RACE   Zerg/Terran/Protoss/Random/Z/T/P/R (case insensitive).
  -l, --dll DLL     Load DLL into StarCraft. This option can be
                    specified multiple times to load multiple dlls.
      --networkprovider NAME  Use the specified network provider.
                              'UDPN' is LAN (UDP), 'SMEM' is Local PC (provided
                              by BWAPI). Others are provided by .snp files and
                              may or may not work. Default SMEM.
      --lan         Sets the network provider to LAN (UDP).
      --localpc     Sets the network provider to Local PC (this is default).
      --lan-sendto IP  Overrides the IP that UDP packets are sent to. This
                       can be used together with --lan to connect to a
                       specified IP-address instead of broadcasting for games
                       on LAN (The ports used is 6111 and 6112).
      --installpath PATH  Overrides the InstallPath value that would usually
                          be read from the registry. This is used by BWAPI to
                          locate bwapi-data/bwapi.ini.
*/

use crate::config::{SettingsStore, StoreError, read_indexed, write_indexed};
use crate::models::{
    BWHEADLESS_SECTION, BotFileKind, DEFAULT_BOT_NAME, EXTRA_FILE_KEY, HeadlessKey, JoinMode,
    LaunchConfig, NetworkMode, ParseValueError, Payload, Race, is_bwapi_dll,
};
use crate::services::process::{PipeError, ProcessPipe};
use crate::services::profile::sanitize_profile_name;
use crate::services::readiness::{self, ReadyStatus};
use camino::{Utf8Path, Utf8PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

/// Default location of the bwheadless executable, relative to the launcher.
pub const DEFAULT_HEADLESS_EXE: &str = "bwheadless.exe";

/// Errors from the configuration setters
#[derive(Error, Debug)]
pub enum SettingError {
    #[error("File not found: {0}")]
    FileNotFound(Utf8PathBuf),

    #[error("Filename does not equal BWAPI.dll: {0}")]
    InvalidBwapiDll(Utf8PathBuf),

    #[error("Invalid bot name: {0:?}")]
    InvalidName(String),

    #[error("Not a bot file (*.dll, *.exe, *.jar): {0}")]
    UnknownBotFile(Utf8PathBuf),

    #[error(transparent)]
    InvalidValue(#[from] ParseValueError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from starting or stopping bwheadless
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Not ready: {0}")]
    NotReady(ReadyStatus),

    #[error("bwheadless can only load bot modules; start the client separately: {0}")]
    ClientPayload(Utf8PathBuf),

    #[error(transparent)]
    Pipe(#[from] PipeError),
}

/// What a dropped file was used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DroppedRole {
    BwapiDll,
    BotLibrary,
    BotClient,
    ExtraFile,
}

/// Configuration and process handling for bwheadless.
///
/// Every setter validates its input, writes the result to the settings store
/// and only then updates the in-memory [`LaunchConfig`], so the store is never
/// behind what [`build_args`](Self::build_args) would use.
pub struct Headless<S: SettingsStore> {
    config: LaunchConfig,
    store: S,
    pipe: ProcessPipe,
    headless_exe: Utf8PathBuf,
}

impl<S: SettingsStore> Headless<S> {
    /// Create a facade with default configuration. The store is not read.
    pub fn new(store: S) -> Self {
        Self {
            config: LaunchConfig::default(),
            store,
            pipe: ProcessPipe::new(),
            headless_exe: Utf8PathBuf::from(DEFAULT_HEADLESS_EXE),
        }
    }

    /// Create a facade and load its configuration from `store`.
    pub fn from_store(store: S) -> Result<Self, SettingError> {
        let mut headless = Self::new(store);
        headless.load_from_store()?;
        Ok(headless)
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn headless_exe(&self) -> &Utf8Path {
        &self.headless_exe
    }

    pub fn set_headless_exe<P: AsRef<Utf8Path>>(&mut self, path: P) {
        self.headless_exe = path.as_ref().to_path_buf();
    }

    pub fn ready_status(&self) -> ReadyStatus {
        readiness::evaluate(&self.config)
    }

    pub fn is_ready(&self) -> bool {
        self.ready_status().is_ready()
    }

    fn persist(&mut self, key: HeadlessKey, value: &str) -> Result<(), StoreError> {
        self.store.set(BWHEADLESS_SECTION, key.as_str(), value)
    }

    pub fn set_starcraft_exe<P: AsRef<Utf8Path>>(&mut self, path: P) -> Result<(), SettingError> {
        let path = path.as_ref();
        if !path.is_file() {
            self.persist(HeadlessKey::StarcraftExe, "")?;
            self.config.starcraft_exe = None;
            return Err(SettingError::FileNotFound(path.to_path_buf()));
        }

        let path = absolute(path);
        self.persist(HeadlessKey::StarcraftExe, path.as_str())?;
        tracing::info!("StarCraft.exe set to {}", path);
        self.config.starcraft_exe = Some(path);
        Ok(())
    }

    /// Set the BWAPI support library. The file name must be `BWAPI.dll`.
    pub fn set_bwapi_dll<P: AsRef<Utf8Path>>(&mut self, path: P) -> Result<(), SettingError> {
        let path = path.as_ref();
        if !is_bwapi_dll(path) {
            return Err(SettingError::InvalidBwapiDll(path.to_path_buf()));
        }
        if !path.is_file() {
            self.persist(HeadlessKey::BwapiDll, "")?;
            self.config.bwapi_dll = None;
            return Err(SettingError::FileNotFound(path.to_path_buf()));
        }

        let path = absolute(path);
        self.persist(HeadlessKey::BwapiDll, path.as_str())?;
        tracing::info!("BWAPI.dll set to {}", path);
        self.config.bwapi_dll = Some(path);
        Ok(())
    }

    /// Set the bot name, rejecting anything that sanitization would change.
    pub fn set_bot_name(&mut self, name: &str) -> Result<(), SettingError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || sanitize_profile_name(trimmed) != trimmed {
            return Err(SettingError::InvalidName(name.to_string()));
        }

        self.persist(HeadlessKey::BotName, trimmed)?;
        self.config.bot_name = trimmed.to_string();
        Ok(())
    }

    /// Set the bot name after sanitizing it, falling back to
    /// [`DEFAULT_BOT_NAME`] when nothing usable is left.
    pub fn set_bot_name_lossy(&mut self, name: &str) -> Result<(), SettingError> {
        let mut clean = sanitize_profile_name(name);
        if clean.is_empty() {
            clean = DEFAULT_BOT_NAME.to_string();
        }
        if clean != name {
            tracing::debug!("Bot name {:?} stored as {:?}", name, clean);
        }

        self.persist(HeadlessKey::BotName, &clean)?;
        self.config.bot_name = clean;
        Ok(())
    }

    /// Use a DLL bot module. Clears any client payload.
    pub fn set_bot_library<P: AsRef<Utf8Path>>(&mut self, path: P) -> Result<(), SettingError> {
        self.set_payload(path.as_ref(), BotFileKind::Library)
    }

    /// Use a standalone client (`.exe` or `.jar`). Clears any library payload.
    pub fn set_bot_client<P: AsRef<Utf8Path>>(&mut self, path: P) -> Result<(), SettingError> {
        self.set_payload(path.as_ref(), BotFileKind::Client)
    }

    /// Use a bot file, picking library or client from its extension.
    pub fn set_bot_file<P: AsRef<Utf8Path>>(&mut self, path: P) -> Result<(), SettingError> {
        let path = path.as_ref();
        match BotFileKind::from_path(path) {
            BotFileKind::Unknown => Err(SettingError::UnknownBotFile(path.to_path_buf())),
            kind => self.set_payload(path, kind),
        }
    }

    fn set_payload(&mut self, path: &Utf8Path, kind: BotFileKind) -> Result<(), SettingError> {
        if !path.is_file() {
            self.persist(HeadlessKey::BotClient, "")?;
            self.persist(HeadlessKey::BotDll, "")?;
            self.config.payload = Payload::None;
            return Err(SettingError::FileNotFound(path.to_path_buf()));
        }

        let path = absolute(path);
        let payload = match kind {
            BotFileKind::Client => {
                self.persist(HeadlessKey::BotDll, "")?;
                self.persist(HeadlessKey::BotClient, path.as_str())?;
                Payload::Client(path)
            }
            _ => {
                self.persist(HeadlessKey::BotClient, "")?;
                self.persist(HeadlessKey::BotDll, path.as_str())?;
                Payload::Library(path)
            }
        };

        tracing::info!("Bot file set to {:?}", payload);
        self.config.payload = payload;
        Ok(())
    }

    pub fn set_race(&mut self, race: Race) -> Result<(), SettingError> {
        self.persist(HeadlessKey::BotRace, race.as_str())?;
        self.config.race = Some(race);
        Ok(())
    }

    /// Parse and set the race; the configuration is untouched on a bad value.
    pub fn set_race_str(&mut self, race: &str) -> Result<(), SettingError> {
        let race = race.parse::<Race>()?;
        self.set_race(race)
    }

    pub fn set_network_mode(&mut self, mode: NetworkMode) -> Result<(), SettingError> {
        self.persist(HeadlessKey::NetworkProvider, mode.as_str())?;
        self.config.network = Some(mode);
        Ok(())
    }

    pub fn set_join_mode(&mut self, mode: JoinMode) -> Result<(), SettingError> {
        self.persist(HeadlessKey::JoinMode, mode.as_str())?;
        self.config.join_mode = Some(mode);
        Ok(())
    }

    /// Add an auxiliary bot file. A file with the same name (ignoring case)
    /// replaces the earlier entry.
    pub fn add_extra_file<P: AsRef<Utf8Path>>(&mut self, path: P) -> Result<(), SettingError> {
        let path = absolute(path.as_ref());
        let name = path.file_name().unwrap_or_default();

        let mut files: Vec<Utf8PathBuf> = self
            .config
            .extra_files
            .iter()
            .filter(|existing| {
                !existing
                    .file_name()
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
            .cloned()
            .collect();
        files.push(path);

        self.write_extra_files(files)
    }

    pub fn clear_extra_files(&mut self) -> Result<(), SettingError> {
        self.write_extra_files(Vec::new())
    }

    fn write_extra_files(&mut self, files: Vec<Utf8PathBuf>) -> Result<(), SettingError> {
        let values: Vec<String> = files.iter().map(|p| p.to_string()).collect();
        write_indexed(&mut self.store, BWHEADLESS_SECTION, EXTRA_FILE_KEY, &values)?;
        self.config.extra_files = files;
        Ok(())
    }

    /// Sort a batch of files into their roles, the way files dropped onto the
    /// launcher are handled.
    ///
    /// `BWAPI.dll` becomes the support library, other `.dll` files the bot
    /// module, `.exe`/`.jar` the bot client and everything else an extra file.
    /// Directories are skipped.
    pub fn add_files<P: AsRef<Utf8Path>>(
        &mut self,
        paths: &[P],
    ) -> Result<Vec<(Utf8PathBuf, DroppedRole)>, SettingError> {
        let mut placed = Vec::new();

        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                tracing::warn!("Skipping directory: {}", path);
                continue;
            }

            let role = if is_bwapi_dll(path) {
                self.set_bwapi_dll(path)?;
                DroppedRole::BwapiDll
            } else {
                match BotFileKind::from_path(path) {
                    BotFileKind::Library => {
                        self.set_bot_library(path)?;
                        DroppedRole::BotLibrary
                    }
                    BotFileKind::Client => {
                        self.set_bot_client(path)?;
                        DroppedRole::BotClient
                    }
                    BotFileKind::Unknown => {
                        if !path.is_file() {
                            return Err(SettingError::FileNotFound(path.to_path_buf()));
                        }
                        self.add_extra_file(path)?;
                        DroppedRole::ExtraFile
                    }
                }
            };

            tracing::info!("{} -> {:?}", path, role);
            placed.push((path.to_path_buf(), role));
        }

        Ok(placed)
    }

    /// Rebuild the configuration from the store.
    ///
    /// Paths that no longer exist are cleared, unparsable enum values fall
    /// back to their defaults, and the bot name goes through the lossy setter.
    pub fn load_from_store(&mut self) -> Result<(), SettingError> {
        self.config = LaunchConfig::default();

        if let Some(exe) = self.stored(HeadlessKey::StarcraftExe)? {
            keep_going(self.set_starcraft_exe(exe.as_str()))?;
        }
        if let Some(dll) = self.stored(HeadlessKey::BwapiDll)? {
            keep_going(self.set_bwapi_dll(dll.as_str()))?;
        }

        let name = self.stored(HeadlessKey::BotName)?.unwrap_or_default();
        self.set_bot_name_lossy(&name)?;

        if let Some(dll) = self.stored(HeadlessKey::BotDll)? {
            keep_going(self.set_bot_library(dll.as_str()))?;
        }
        if let Some(client) = self.stored(HeadlessKey::BotClient)? {
            keep_going(self.set_bot_client(client.as_str()))?;
        }

        let race = self.stored_or_default::<Race>(HeadlessKey::BotRace)?;
        self.set_race(race)?;
        let network = self.stored_or_default::<NetworkMode>(HeadlessKey::NetworkProvider)?;
        self.set_network_mode(network)?;
        let join_mode = self.stored_or_default::<JoinMode>(HeadlessKey::JoinMode)?;
        self.set_join_mode(join_mode)?;

        self.config.extra_files = read_indexed(&self.store, BWHEADLESS_SECTION, EXTRA_FILE_KEY)?
            .into_iter()
            .map(Utf8PathBuf::from)
            .collect();

        tracing::info!("Loaded bwheadless settings: {}", self.ready_status());
        Ok(())
    }

    fn stored(&self, key: HeadlessKey) -> Result<Option<String>, StoreError> {
        Ok(self
            .store
            .get(BWHEADLESS_SECTION, key.as_str())?
            .filter(|v| !v.trim().is_empty()))
    }

    fn stored_or_default<T>(&self, key: HeadlessKey) -> Result<T, StoreError>
    where
        T: std::str::FromStr + Default,
    {
        Ok(self
            .stored(key)?
            .and_then(|v| v.parse::<T>().ok())
            .unwrap_or_default())
    }

    /// Arguments for bwheadless, excluding the executable itself.
    pub fn build_args(&self) -> Vec<String> {
        build_args(&self.config)
    }

    pub fn is_running(&self) -> bool {
        self.pipe.is_open()
    }

    /// OS process id of the running bwheadless, if any.
    pub fn pid(&self) -> Option<u32> {
        self.pipe.id()
    }

    /// Start bwheadless if the configuration is ready.
    ///
    /// `--exe` already carries the game executable, so a client payload has
    /// no place on the bwheadless command line and is refused.
    pub fn start(&mut self) -> Result<(), LaunchError> {
        let status = self.ready_status();
        if !status.is_ready() {
            tracing::warn!("Launch refused: {}", status);
            return Err(LaunchError::NotReady(status));
        }
        if let Some(client) = self.config.payload.client() {
            tracing::warn!("Launch refused: bot client {} is not loaded by bwheadless", client);
            return Err(LaunchError::ClientPayload(client.to_path_buf()));
        }

        let args = self.build_args();
        self.pipe
            .set_working_dir(self.config.starcraft_dir().map(Utf8Path::to_path_buf));
        self.pipe.open(&self.headless_exe, &args)?;
        Ok(())
    }

    /// Stop bwheadless. Stopping when nothing runs succeeds.
    pub async fn stop(&mut self) -> Result<(), LaunchError> {
        self.pipe.close().await?;
        Ok(())
    }

    /// Non-blocking check for a bwheadless that exited by itself.
    pub fn poll_exit(&mut self) -> Option<ExitStatus> {
        if !self.pipe.is_open() {
            return None;
        }
        match self.pipe.try_wait() {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Failed to poll bwheadless: {}", e);
                None
            }
        }
    }
}

/// Build the bwheadless argument vector for `config`.
///
/// Unset fields are left out; callers check readiness first. Only a library
/// payload appears here, see [`Headless::start`].
pub fn build_args(config: &LaunchConfig) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(exe) = &config.starcraft_exe {
        args.push("--exe".to_string());
        args.push(exe.to_string());
    }

    if let Some(join_mode) = config.join_mode {
        args.push(join_mode.flag().to_string());
    }

    let mut name = sanitize_profile_name(&config.bot_name);
    if name.is_empty() {
        name = DEFAULT_BOT_NAME.to_string();
    }
    args.push("--name".to_string());
    args.push(name);

    if let Some(race) = config.race {
        args.push("--race".to_string());
        args.push(race.to_string());
    }

    if let Some(dll) = &config.bwapi_dll {
        args.push("--dll".to_string());
        args.push(dll.to_string());
    }

    if let Some(module) = config.payload.library() {
        args.push("--dll".to_string());
        args.push(module.to_string());
    }

    if let Some(network) = config.network {
        args.push("--networkprovider".to_string());
        args.push(network.provider().to_string());
    }

    args
}

/// Stale stored values are logged and dropped; store failures still abort.
fn keep_going(result: Result<(), SettingError>) -> Result<(), SettingError> {
    match result {
        Err(SettingError::Store(e)) => Err(SettingError::Store(e)),
        Err(e) => {
            tracing::warn!("Ignoring stored setting: {}", e);
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

fn absolute(path: &Utf8Path) -> Utf8PathBuf {
    std::path::absolute(path.as_std_path())
        .ok()
        .and_then(|p| Utf8PathBuf::try_from(p).ok())
        .unwrap_or_else(|| path.to_path_buf())
}
