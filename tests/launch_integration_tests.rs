//! Integration tests for readiness, argument construction and the process lifecycle
//!
//! These tests verify:
//! - The readiness gate against real files on disk
//! - The bwheadless argument vector for a complete configuration
//! - Payload exclusivity across arbitrary setter sequences
//! - Launch and eject through the SessionManager

use camino::{Utf8Path, Utf8PathBuf};
use droplauncher::models::{LaunchConfig, Payload};
use droplauncher::services::{
    PipeError, PipeState, ProcessPipe, build_args, evaluate, sanitize_profile_name,
};
use droplauncher::{
    Headless, JoinMode, LaunchError, LaunchEvent, MemoryStore, NetworkMode, Race, ReadyStatus,
    SessionManager,
};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;
use tokio::time::{Duration, timeout};

fn create_test_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, path)
}

fn touch(root: &Utf8Path, name: &str) -> Utf8PathBuf {
    let path = root.join(name);
    fs::write(&path, b"").unwrap();
    path
}

/// A facade with StarCraft.exe, BWAPI.dll and a bot module in `root`.
fn ready_headless(root: &Utf8Path) -> Headless<MemoryStore> {
    let mut headless = Headless::new(MemoryStore::new());
    headless.set_starcraft_exe(touch(root, "StarCraft.exe")).unwrap();
    headless.set_bwapi_dll(touch(root, "BWAPI.dll")).unwrap();
    headless.set_bot_library(touch(root, "MyBot.dll")).unwrap();
    headless
}

fn pair(args: &[String], flag: &str, value: &str) -> bool {
    args.windows(2).any(|w| w[0] == flag && w[1] == value)
}

#[test]
fn test_missing_exe_blocks_everything() {
    let (_temp_dir, root) = create_test_dir();
    let config = LaunchConfig {
        starcraft_exe: Some(root.join("StarCraft.exe")),
        bwapi_dll: Some(touch(&root, "BWAPI.dll")),
        bot_name: String::new(),
        payload: Payload::Library(touch(&root, "MyBot.dll")),
        ..LaunchConfig::default()
    };

    assert_eq!(evaluate(&config), ReadyStatus::StarcraftExe);
}

#[test]
fn test_empty_name_reported_after_files() {
    let (_temp_dir, root) = create_test_dir();
    let config = LaunchConfig {
        starcraft_exe: Some(touch(&root, "StarCraft.exe")),
        bwapi_dll: Some(touch(&root, "BWAPI.dll")),
        bot_name: String::new(),
        payload: Payload::Library(touch(&root, "MyBot.dll")),
        ..LaunchConfig::default()
    };

    assert_eq!(evaluate(&config), ReadyStatus::BotName);
}

#[test]
fn test_complete_configuration_scenario() {
    let (_temp_dir, root) = create_test_dir();
    let exe = touch(&root, "StarCraft.exe");
    let support = touch(&root, "support.dll");
    let bot = touch(&root, "bot.dll");

    let config = LaunchConfig {
        starcraft_exe: Some(exe.clone()),
        bwapi_dll: Some(support.clone()),
        bot_name: "My Bot!".to_string(),
        payload: Payload::Library(bot.clone()),
        race: Some(Race::Terran),
        network: Some(NetworkMode::Lan),
        join_mode: Some(JoinMode::Join),
        extra_files: Vec::new(),
    };

    assert_eq!(evaluate(&config), ReadyStatus::Ready);

    let args = build_args(&config);
    assert!(pair(&args, "--exe", exe.as_str()));
    assert!(pair(&args, "--name", &sanitize_profile_name("My Bot!")));
    assert!(pair(&args, "--race", "Terran"));
    assert!(pair(&args, "--dll", bot.as_str()));
    assert!(pair(&args, "--dll", support.as_str()));
    assert!(pair(&args, "--networkprovider", "UDPN"));
    assert!(args.iter().any(|a| a == "-j"));
    assert!(!args.iter().any(|a| a == "-h"));
}

#[test]
fn test_sanitizer_examples() {
    assert_eq!(sanitize_profile_name("Player_1!"), "Player1");
    assert_eq!(sanitize_profile_name("  A  "), "A");
    assert_eq!(sanitize_profile_name(&"a1".repeat(15)), "a1".repeat(12));
}

#[derive(Debug, Clone)]
enum PayloadStep {
    Library,
    Client,
    Missing,
}

fn payload_step() -> impl Strategy<Value = PayloadStep> {
    prop_oneof![
        Just(PayloadStep::Library),
        Just(PayloadStep::Client),
        Just(PayloadStep::Missing),
    ]
}

proptest! {
    #[test]
    fn prop_payload_is_exclusive(steps in prop::collection::vec(payload_step(), 1..12)) {
        let (_temp_dir, root) = create_test_dir();
        let dll = touch(&root, "MyBot.dll");
        let exe = touch(&root, "MyBot.exe");
        let mut headless = Headless::new(MemoryStore::new());

        for step in &steps {
            let _ = match step {
                PayloadStep::Library => headless.set_bot_library(&dll),
                PayloadStep::Client => headless.set_bot_client(&exe),
                PayloadStep::Missing => headless.set_bot_library(root.join("Gone.dll")),
            };

            let payload = &headless.config().payload;
            prop_assert!(payload.library().is_none() || payload.client().is_none());
        }

        let expected = match steps.last() {
            Some(PayloadStep::Library) => Payload::Library(dll.clone()),
            Some(PayloadStep::Client) => Payload::Client(exe.clone()),
            _ => Payload::None,
        };
        prop_assert_eq!(&headless.config().payload, &expected);
    }
}

#[tokio::test]
async fn test_supervisor_close_never_opened() {
    let mut pipe = ProcessPipe::new();
    pipe.close().await.unwrap();
    assert_eq!(pipe.state(), PipeState::Closed);
}

#[tokio::test]
async fn test_supervisor_open_missing_executable() {
    let (_temp_dir, root) = create_test_dir();
    let mut pipe = ProcessPipe::new().with_working_dir(&root);

    let result = pipe.open(&root.join("bwheadless.exe"), &["-j".to_string()]);
    assert!(matches!(result, Err(PipeError::ExecutableNotFound(_))));
    assert_eq!(pipe.state(), PipeState::Closed);
}

#[tokio::test]
async fn test_session_refuses_incomplete_configuration() {
    let session = SessionManager::new(Headless::new(MemoryStore::new()));
    let mut rx = session.subscribe();

    assert!(matches!(
        session.toggle().await,
        Err(LaunchError::NotReady(ReadyStatus::StarcraftExe))
    ));
    assert!(!session.is_running().await);

    let event = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");
    assert!(matches!(event, LaunchEvent::StartFailed { .. }));
}

#[tokio::test]
async fn test_session_refuses_bot_client() {
    let (_temp_dir, root) = create_test_dir();
    let client = touch(&root, "MyBot.jar");
    let mut headless = Headless::new(MemoryStore::new());
    headless.set_starcraft_exe(touch(&root, "StarCraft.exe")).unwrap();
    headless.set_bwapi_dll(touch(&root, "BWAPI.dll")).unwrap();
    headless.set_bot_file(&client).unwrap();
    headless.set_headless_exe(touch(&root, "bwheadless.exe"));

    let session = SessionManager::new(headless);
    let mut rx = session.subscribe();
    assert_eq!(session.read(|h| h.ready_status()).await, ReadyStatus::Ready);

    let err = session.launch().await.unwrap_err();
    assert!(matches!(err, LaunchError::ClientPayload(ref path) if *path == client));
    assert!(!session.is_running().await);

    let event = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");
    assert!(matches!(event, LaunchEvent::StartFailed { .. }));
}

#[tokio::test]
async fn test_session_reports_readiness_changes() {
    let (_temp_dir, root) = create_test_dir();
    let session = SessionManager::new(Headless::new(MemoryStore::new()));
    let mut rx = session.subscribe();

    let exe = touch(&root, "StarCraft.exe");
    session
        .update(|h| h.set_starcraft_exe(&exe))
        .await
        .unwrap();

    let event = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");
    assert_eq!(
        event,
        LaunchEvent::ConfigurationChanged {
            status: ReadyStatus::BwapiDll
        }
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_session_notices_exit() {
    // sh rejects the bwheadless flags and exits right away
    let sh = Utf8Path::new("/bin/sh");
    if !sh.is_file() {
        return;
    }

    let (_temp_dir, root) = create_test_dir();
    let mut headless = ready_headless(&root);
    headless.set_headless_exe(sh);

    let session = SessionManager::new(headless);
    let mut rx = session.subscribe();
    session.launch().await.unwrap();

    let started = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");
    assert!(matches!(started, LaunchEvent::Started { .. }));

    let mut exited = None;
    for _ in 0..100 {
        if let Some(status) = session.poll_exit().await {
            exited = Some(status);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(exited.is_some_and(|s| !s.success()));
    assert!(!session.is_running().await);
    let stopped = rx.recv().await.unwrap();
    assert!(matches!(stopped, LaunchEvent::Stopped { requested: false, .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn test_session_launch_and_eject() {
    use std::os::unix::fs::PermissionsExt;

    let (_temp_dir, root) = create_test_dir();
    let script = root.join("bwheadless");
    fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let mut headless = ready_headless(&root);
    headless.set_headless_exe(&script);

    let session = SessionManager::new(headless);
    let mut rx = session.subscribe();

    assert!(session.toggle().await.unwrap());
    assert!(session.is_running().await);
    assert!(session.read(|h| h.pid()).await.is_some());
    assert!(matches!(
        rx.recv().await.unwrap(),
        LaunchEvent::Started { pid: Some(_) }
    ));

    assert!(!session.toggle().await.unwrap());
    assert!(!session.is_running().await);
    assert_eq!(
        rx.recv().await.unwrap(),
        LaunchEvent::Stopped {
            requested: true,
            exit_code: None
        }
    );
}
