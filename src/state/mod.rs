// Session management module
//
// This module provides the SessionManager which wraps the Headless facade with
// an async mutex so launch and eject requests from worker tasks never overlap,
// and emits launch events for whoever is driving the launcher.

use crate::config::SettingsStore;
use crate::services::{Headless, LaunchError, ReadyStatus};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};

/// Pause before relaunching a bwheadless that exited by itself.
pub const AUTO_REJOIN_DELAY: Duration = Duration::from_millis(3500);

/// Events emitted when the session changes
#[derive(Clone, Debug, PartialEq)]
pub enum LaunchEvent {
    /// A configuration change moved the readiness result
    ConfigurationChanged { status: ReadyStatus },

    /// bwheadless was spawned
    Started { pid: Option<u32> },

    /// A launch attempt was refused or failed to spawn
    StartFailed { reason: String },

    /// bwheadless is gone, either ejected or exited by itself
    Stopped {
        requested: bool,
        exit_code: Option<i32>,
    },
}

/// Serialized access to a [`Headless`] with event emission
///
/// Every lifecycle call takes the same lock, so callers may fire
/// [`launch`](Self::launch) and [`eject`](Self::eject) from any task without
/// coordinating among themselves. Cloning is cheap and shares the session.
pub struct SessionManager<S: SettingsStore> {
    headless: Arc<Mutex<Headless<S>>>,

    /// Broadcast channel for launch events; sends with no listeners are fine
    event_tx: broadcast::Sender<LaunchEvent>,
}

impl<S: SettingsStore> Clone for SessionManager<S> {
    fn clone(&self) -> Self {
        Self {
            headless: Arc::clone(&self.headless),
            event_tx: self.event_tx.clone(),
        }
    }
}

impl<S: SettingsStore> SessionManager<S> {
    /// Wrap `headless` with a broadcast buffer of 100 events
    pub fn new(headless: Headless<S>) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            headless: Arc::new(Mutex::new(headless)),
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LaunchEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: LaunchEvent) {
        tracing::debug!("Session event: {:?}", event);
        let _ = self.event_tx.send(event);
    }

    /// Execute a function with read access to the facade
    pub async fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Headless<S>) -> R,
    {
        let headless = self.headless.lock().await;
        f(&headless)
    }

    /// Mutate the configuration; emits `ConfigurationChanged` when the
    /// readiness result moves.
    ///
    /// # Example
    /// ```ignore
    /// session.update(|h| h.set_race_str("zerg")).await?;
    /// ```
    pub async fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Headless<S>) -> R,
    {
        let mut headless = self.headless.lock().await;
        let before = headless.ready_status();
        let result = f(&mut headless);
        let after = headless.ready_status();

        if before != after {
            self.emit(LaunchEvent::ConfigurationChanged { status: after });
        }
        result
    }

    pub async fn is_running(&self) -> bool {
        self.headless.lock().await.is_running()
    }

    /// Start bwheadless if ready.
    pub async fn launch(&self) -> Result<(), LaunchError> {
        let mut headless = self.headless.lock().await;

        match headless.start() {
            Ok(()) => {
                self.emit(LaunchEvent::Started {
                    pid: headless.pid(),
                });
                Ok(())
            }
            Err(e) => {
                tracing::error!("Launch failed: {}", e);
                self.emit(LaunchEvent::StartFailed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Stop bwheadless. Ejecting an idle session succeeds without an event.
    pub async fn eject(&self) -> Result<(), LaunchError> {
        let mut headless = self.headless.lock().await;
        if !headless.is_running() {
            return Ok(());
        }

        let result = headless.stop().await;
        self.emit(LaunchEvent::Stopped {
            requested: true,
            exit_code: None,
        });
        result
    }

    /// Wait `delay`, then launch again.
    ///
    /// The lock is not held while waiting, so dropping the future during the
    /// delay cancels the relaunch.
    pub async fn rejoin(&self, delay: Duration) -> Result<(), LaunchError> {
        tracing::info!("Rejoining in {:?}", delay);
        tokio::time::sleep(delay).await;
        self.launch().await
    }

    /// Launch when idle, eject when running. Returns whether bwheadless is
    /// running afterwards.
    pub async fn toggle(&self) -> Result<bool, LaunchError> {
        if self.is_running().await {
            self.eject().await?;
            Ok(false)
        } else {
            self.launch().await?;
            Ok(true)
        }
    }

    /// Notice a bwheadless that exited on its own.
    pub async fn poll_exit(&self) -> Option<ExitStatus> {
        let status = self.headless.lock().await.poll_exit()?;
        self.emit(LaunchEvent::Stopped {
            requested: false,
            exit_code: status.code(),
        });
        Some(status)
    }
}
