//! Interface Thread
//!
//! Every script-facing object lives on one dedicated thread, the way a desktop
//! toolkit keeps its UI on a single thread. Other threads talk to it through an
//! [`InterfaceHandle`]: evaluate script, or re-schedule a closure onto the
//! interface thread with [`InterfaceHandle::run_later`].

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use dejaview_bridge::{BridgeError, BridgeState, NativeApi, ScriptScope};

use crate::app::{Dejaview, Hooks};
use crate::config::DejaviewConfig;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Interface thread has closed")]
    Closed,

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Interface thread is busy")]
    Busy,

    #[error("Interface thread panicked")]
    ThreadPanic,

    #[error("Failed to spawn interface thread: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Failed to open page: {0}")]
    Open(String),

    #[error("JavaScript error: {0}")]
    JavaScript(String),
}

/// A closure re-scheduled onto the interface thread.
pub type Task = Box<dyn for<'js> FnOnce(ScriptScope<'js>) + Send>;

enum InterfaceCommand {
    Eval {
        source: String,
        reply: oneshot::Sender<Result<String, String>>,
    },
    RunLater(Task),
}

/// Handle to the interface thread. `Send + Sync`.
pub struct InterfaceHandle {
    cmd_tx: mpsc::Sender<InterfaceCommand>,
    shutdown_tx: watch::Sender<bool>,
    closed: Arc<AtomicBool>,
    thread_handle: Mutex<Option<thread::JoinHandle<Result<BridgeState, ShellError>>>>,
}

impl InterfaceHandle {
    /// Evaluate `source` in the page scope and return the rendered result.
    pub async fn eval(&self, source: impl Into<String>) -> Result<String, ShellError> {
        if self.is_closed() {
            return Err(ShellError::Closed);
        }

        let (reply, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(InterfaceCommand::Eval {
                source: source.into(),
                reply,
            })
            .await
            .map_err(|_| ShellError::ChannelClosed)?;

        reply_rx
            .await
            .map_err(|_| ShellError::ChannelClosed)?
            .map_err(ShellError::JavaScript)
    }

    /// Queue `task` to run on the interface thread, after any earlier command.
    pub fn run_later<F>(&self, task: F) -> Result<(), ShellError>
    where
        F: for<'js> FnOnce(ScriptScope<'js>) + Send + 'static,
    {
        if self.is_closed() {
            return Err(ShellError::Closed);
        }
        self.cmd_tx
            .try_send(InterfaceCommand::RunLater(Box::new(task)))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Closed(_) => ShellError::ChannelClosed,
                mpsc::error::TrySendError::Full(_) => ShellError::Busy,
            })
    }

    /// Ask the interface thread to close the bridge and stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Whether the interface loop has stopped.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait for the interface thread and return the bridge's final state.
    pub fn join(self) -> Result<BridgeState, ShellError> {
        let handle = match self.thread_handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match handle {
            Some(handle) => handle.join().map_err(|_| ShellError::ThreadPanic)?,
            None => Err(ShellError::Closed),
        }
    }
}

impl Drop for InterfaceHandle {
    fn drop(&mut self) {
        self.shutdown();
        let handle = match self.thread_handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

/// Start the interface thread with hooks built from `config`.
pub fn spawn_interface<A, F>(config: DejaviewConfig, make_api: F) -> Result<InterfaceHandle, ShellError>
where
    A: NativeApi,
    F: FnOnce() -> A + Send + 'static,
{
    spawn_interface_with(config, move |config| (make_api(), Hooks::from_config(config)))
}

/// Start the interface thread; `setup` runs on it and builds the API and hooks.
///
/// Returns once the entry page has loaded.
pub fn spawn_interface_with<A, F>(config: DejaviewConfig, setup: F) -> Result<InterfaceHandle, ShellError>
where
    A: NativeApi,
    F: FnOnce(&DejaviewConfig) -> (A, Hooks) + Send + 'static,
{
    let closed = Arc::new(AtomicBool::new(false));
    let closed_clone = closed.clone();

    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (init_tx, init_rx) = std::sync::mpsc::sync_channel::<Result<(), String>>(1);

    let thread_handle = thread::Builder::new()
        .name("dejaview-interface".to_string())
        .spawn(move || -> Result<BridgeState, ShellError> {
            debug!("[interface] thread started");

            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(ShellError::SpawnFailed)?;

            let (api, hooks) = setup(&config);
            let app = match Dejaview::open(&config, api, hooks) {
                Ok(app) => {
                    let _ = init_tx.send(Ok(()));
                    app
                }
                Err(e) => {
                    closed_clone.store(true, Ordering::SeqCst);
                    let _ = init_tx.send(Err(e.to_string()));
                    return Err(ShellError::Open(e.to_string()));
                }
            };

            let state = rt.block_on(run_interface(app, cmd_rx, shutdown_rx, closed_clone));
            rt.shutdown_background();
            debug!("[interface] thread exiting");
            Ok(state)
        })?;

    init_rx
        .recv()
        .map_err(|_| ShellError::ChannelClosed)?
        .map_err(ShellError::Open)?;

    Ok(InterfaceHandle {
        cmd_tx,
        shutdown_tx,
        closed,
        thread_handle: Mutex::new(Some(thread_handle)),
    })
}

async fn run_interface<A: NativeApi>(
    mut app: Dejaview<A>,
    mut cmd_rx: mpsc::Receiver<InterfaceCommand>,
    mut shutdown_rx: watch::Receiver<bool>,
    closed: Arc<AtomicBool>,
) -> BridgeState {
    loop {
        if app.state().is_terminal() {
            debug!(state = ?app.state(), "[interface] bridge is terminal");
            break;
        }
        if app.close_requested() {
            info!("[interface] window asked to close");
            break;
        }

        tokio::select! {
            _ = shutdown_rx.changed() => {
                debug!("[interface] shutdown requested");
                break;
            }
            cmd = cmd_rx.recv() => match cmd {
                Some(InterfaceCommand::Eval { source, reply }) => {
                    let result = app.eval(&source).map_err(|e| match e {
                        BridgeError::JavaScript(message) => message,
                        other => other.to_string(),
                    });
                    let _ = reply.send(result);
                }
                Some(InterfaceCommand::RunLater(task)) => {
                    app.with_scope(task);
                    app.pump();
                }
                None => break,
            }
        }
    }

    closed.store(true, Ordering::SeqCst);
    cmd_rx.close();
    app.close();
    app.state()
}
