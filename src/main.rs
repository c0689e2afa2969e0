//! DropLauncher - Configure and launch bwheadless from the command line.
//!
//! # Overview
//!
//! Every command opens the settings file, brings the launcher section up to
//! date with this version, and rebuilds the bwheadless configuration from it.
//! Commands that change a setting write it back immediately.
//!
//! # Execution Flow
//!
//! 1. Parse arguments and initialize logging → logs/droplauncher.<date>
//! 2. Create a tokio runtime with 2 worker threads
//! 3. Open `DropLauncher Data/droplauncher.yaml` (or `--config`)
//! 4. Run the command; `launch` waits for Ctrl-C or for bwheadless to exit

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use droplauncher::config::{SettingsCheck, ensure_default_settings, load_launcher_settings};
use droplauncher::logging::{DEFAULT_LOG_DIR, setup_logging_with_console};
use droplauncher::services::build_args;
use droplauncher::{
    APP_NAME, AUTO_REJOIN_DELAY, Headless, JoinMode, LaunchEvent, LauncherSettings, NetworkMode,
    SessionManager, SettingsManager, SettingsStore, VERSION, YamlSettingsStore,
};
use serde::Serialize;
use std::time::Duration;

/// How often a running bwheadless is checked for exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(
    name = "droplauncher",
    version,
    about = "Configure and launch bwheadless to run a Brood War AI bot"
)]
struct Cli {
    /// Settings file (defaults to "DropLauncher Data/droplauncher.yaml")
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// Enable debug logging and echo logs to the console
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current configuration and whether it is ready to launch
    Status {
        /// Print as YAML
        #[arg(long)]
        yaml: bool,
    },
    /// Change one setting
    Set {
        #[command(subcommand)]
        setting: SetCommands,
    },
    /// Sort files into BWAPI.dll, bot module, bot client or extra files
    Add {
        /// Files to add
        #[arg(required = true)]
        paths: Vec<Utf8PathBuf>,
    },
    /// Print the bwheadless command line for the current configuration
    Args,
    /// Start bwheadless and wait for Ctrl-C or for it to exit
    Launch {
        /// Path to bwheadless.exe
        #[arg(long)]
        headless_exe: Option<Utf8PathBuf>,
    },
    /// Clear every setting and write the defaults back
    Reset,
}

#[derive(Subcommand)]
enum SetCommands {
    /// Path to StarCraft.exe
    Exe { path: Utf8PathBuf },
    /// Path to BWAPI.dll
    Bwapi { path: Utf8PathBuf },
    /// Bot name (letters, digits and spaces, up to 24 characters)
    Name {
        name: String,
        /// Strip invalid characters instead of rejecting the name
        #[arg(long)]
        lossy: bool,
    },
    /// Bot race: Terran, Zerg, Protoss or Random (or their initials)
    Race { race: String },
    /// Bot module (*.dll) or client (*.exe, *.jar)
    Bot { path: Utf8PathBuf },
    /// Network provider: LAN or LocalPC
    Network { mode: NetworkMode },
    /// Host a game or join the first one found
    Join { mode: JoinMode },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let console = cli.debug || matches!(cli.command, Commands::Launch { .. });
    let _guard = setup_logging_with_console(Utf8Path::new(DEFAULT_LOG_DIR), cli.debug, console)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("droplauncher-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    let result = runtime.block_on(run(cli));

    // A bwheadless that is still attached is killed when its handle drops
    runtime.shutdown_timeout(Duration::from_secs(5));
    tracing::info!("Shutdown complete");

    result.inspect_err(|e| tracing::error!("{:#}", e))
}

async fn run(cli: Cli) -> Result<()> {
    let manager = match &cli.config {
        Some(path) => SettingsManager::with_settings_path(path)?,
        None => SettingsManager::new(SettingsManager::DEFAULT_DIR)?,
    };
    tracing::debug!("Settings file: {}", manager.settings_path());

    let (mut store, check) = manager.open_store()?;
    if let SettingsCheck::VersionChanged { previous, current } = &check {
        println!(
            "Settings were written by version {} and have been reset for {}",
            previous, current
        );
    }

    if matches!(cli.command, Commands::Reset) {
        store.clear().context("Failed to clear settings")?;
        ensure_default_settings(&mut store, VERSION).context("Failed to write default settings")?;
        println!("Settings reset: {}", manager.settings_path());
        return Ok(());
    }

    let launcher = load_launcher_settings(&store).context("Failed to read launcher settings")?;
    let mut headless =
        Headless::from_store(store).context("Failed to load bwheadless settings")?;

    match cli.command {
        Commands::Status { yaml: false } => print_status(&headless, &launcher),
        Commands::Status { yaml: true } => {
            let report = StatusReport::new(&headless, launcher);
            print!(
                "{}",
                serde_yaml_ng::to_string(&report).context("Failed to serialize status")?
            );
        }
        Commands::Set { setting } => {
            apply_setting(&mut headless, setting)?;
            println!("Status: {}", headless.ready_status());
        }
        Commands::Add { paths } => {
            let placed = headless.add_files(&paths).context("Failed to add files")?;
            for (path, role) in placed {
                println!("{:?}: {}", role, path);
            }
            println!("Status: {}", headless.ready_status());
        }
        Commands::Args => {
            let mut line = vec![quote(headless.headless_exe().as_str())];
            line.extend(build_args(headless.config()).iter().map(|a| quote(a)));
            println!("{}", line.join(" "));
            if let Some(client) = headless.config().payload.client() {
                println!(
                    "Note: bot client {} is not part of this command line and must be started separately",
                    client
                );
            }
        }
        Commands::Launch { headless_exe } => {
            if let Some(exe) = headless_exe {
                headless.set_headless_exe(exe);
            }
            launch(headless, &launcher).await?;
        }
        Commands::Reset => {}
    }

    Ok(())
}

fn apply_setting(headless: &mut Headless<YamlSettingsStore>, setting: SetCommands) -> Result<()> {
    match setting {
        SetCommands::Exe { path } => headless.set_starcraft_exe(&path),
        SetCommands::Bwapi { path } => headless.set_bwapi_dll(&path),
        SetCommands::Name { name, lossy: true } => headless.set_bot_name_lossy(&name),
        SetCommands::Name { name, lossy: false } => headless.set_bot_name(&name),
        SetCommands::Race { race } => headless.set_race_str(&race),
        SetCommands::Bot { path } => headless.set_bot_file(&path),
        SetCommands::Network { mode } => headless.set_network_mode(mode),
        SetCommands::Join { mode } => headless.set_join_mode(mode),
    }
    .context("Failed to update setting")
}

fn print_status(headless: &Headless<YamlSettingsStore>, launcher: &LauncherSettings) {
    fn or_unset<T: ToString>(value: Option<T>) -> String {
        value.map_or_else(|| "(not set)".to_string(), |v| v.to_string())
    }

    let config = headless.config();
    println!("StarCraft.exe:   {}", or_unset(config.starcraft_exe.as_ref()));
    println!("BWAPI.dll:       {}", or_unset(config.bwapi_dll.as_ref()));
    println!("Bot name:        {}", config.bot_name);
    println!("Bot module:      {}", or_unset(config.payload.library()));
    println!("Bot client:      {}", or_unset(config.payload.client()));
    println!("Race:            {}", or_unset(config.race));
    println!("Network:         {}", or_unset(config.network));
    println!("Join mode:       {}", or_unset(config.join_mode));
    for file in &config.extra_files {
        println!("Extra file:      {}", file);
    }
    println!("Rejoin on exit:  {}", launcher.auto_bot_rejoin);
    println!("Status:          {}", headless.ready_status());
}

/// Machine-readable form of `status`.
#[derive(Serialize)]
struct StatusReport {
    starcraft_exe: Option<String>,
    bwapi_dll: Option<String>,
    bot_name: String,
    bot_dll: Option<String>,
    bot_client: Option<String>,
    race: Option<String>,
    network: Option<String>,
    join_mode: Option<String>,
    extra_files: Vec<String>,
    launcher: LauncherSettings,
    ready: bool,
    status: String,
}

impl StatusReport {
    fn new(headless: &Headless<YamlSettingsStore>, launcher: LauncherSettings) -> Self {
        let config = headless.config();
        let status = headless.ready_status();
        Self {
            starcraft_exe: config.starcraft_exe.as_ref().map(ToString::to_string),
            bwapi_dll: config.bwapi_dll.as_ref().map(ToString::to_string),
            bot_name: config.bot_name.clone(),
            bot_dll: config.payload.library().map(ToString::to_string),
            bot_client: config.payload.client().map(ToString::to_string),
            race: config.race.map(|r| r.to_string()),
            network: config.network.map(|n| n.to_string()),
            join_mode: config.join_mode.map(|j| j.to_string()),
            extra_files: config.extra_files.iter().map(ToString::to_string).collect(),
            launcher,
            ready: status.is_ready(),
            status: status.to_string(),
        }
    }
}

/// Wrap arguments containing whitespace in double quotes for display.
fn quote(arg: &str) -> String {
    if arg.chars().any(char::is_whitespace) {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

async fn launch(headless: Headless<YamlSettingsStore>, launcher: &LauncherSettings) -> Result<()> {
    let session = SessionManager::new(headless);

    let mut events = session.subscribe();
    let reporter = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                LaunchEvent::Started { pid } => println!("bwheadless started (pid {:?})", pid),
                LaunchEvent::StartFailed { reason } => println!("Launch failed: {}", reason),
                LaunchEvent::Stopped {
                    requested: true, ..
                } => println!("bwheadless ejected"),
                LaunchEvent::Stopped { exit_code, .. } => {
                    println!("bwheadless exited (code {:?})", exit_code)
                }
                LaunchEvent::ConfigurationChanged { .. } => {}
            }
        }
    });

    session.launch().await.context("Failed to launch bwheadless")?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(EXIT_POLL_INTERVAL);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Interrupted, ejecting bot");
                session.eject().await.context("Failed to eject bwheadless")?;
                break;
            }
            _ = ticker.tick() => {
                if session.poll_exit().await.is_none() {
                    continue;
                }
                if !launcher.auto_bot_rejoin {
                    break;
                }
                tokio::select! {
                    result = &mut ctrl_c => {
                        result.context("Failed to listen for Ctrl-C")?;
                        tracing::info!("Interrupted while waiting to rejoin");
                        break;
                    }
                    result = session.rejoin(AUTO_REJOIN_DELAY) => {
                        result.context("Failed to relaunch bwheadless")?;
                    }
                }
            }
        }
    }

    drop(session);
    let _ = reporter.await;
    Ok(())
}
