//! Engine lifecycle
//!
//! [`Engine`] is the single entry point `dirsync-cli` drives: `start` wires
//! up the watcher(s), debounce table, and the chosen handler, then spawns
//! one dispatch task that owns all of that mutable state; `stop` tears it
//! down; `status` reports what the dispatch task last observed.
//!
//! The dispatch loop itself is a `tokio::select!` between "a new event
//! arrived" and "the poll timer ticked", with the poll branch resolving due
//! debounce entries directly against the handler rather than batching them,
//! since these actions are cheap enough to run inline.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dirsync_core::domain::{AbsPath, Mode, SyncConfig};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::adapter::{EventAdapter, Side};
use crate::debounce::DebounceTable;
use crate::error::{ActionError, EngineError};
use crate::mirror::MirrorHandler;
use crate::oneway::OneWayHandler;
use crate::sidecar;
use crate::suppression::SuppressionSet;

/// How often the dispatch loop checks the debounce table for entries whose
/// interval has elapsed. Independent of `debounce_interval`, which governs
/// how long a path must stay quiet, not how finely that quiet is measured.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Snapshot of the engine's lifecycle state, returned by [`Engine::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub running: bool,
    pub last_error: Option<String>,
}

impl Status {
    fn idle() -> Self {
        Self {
            running: false,
            last_error: None,
        }
    }
}

struct RunningState {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// The replication engine's lifecycle: idle until [`start`](Engine::start),
/// running one dispatch task until [`stop`](Engine::stop).
pub struct Engine {
    state: Option<RunningState>,
    status: Arc<Mutex<Status>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: None,
            status: Arc::new(Mutex::new(Status::idle())),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.is_some()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status.lock().expect("status mutex poisoned").clone()
    }

    /// Validates `config`, prepares sidecar directories, starts watching the
    /// appropriate root(s), and spawns the dispatch task.
    pub async fn start(&mut self, config: SyncConfig) -> Result<(), EngineError> {
        if self.state.is_some() {
            return Err(EngineError::AlreadyRunning);
        }

        let (root_a, root_b) = config.validated_roots()?;
        ensure_root_exists(&root_a).await?;
        ensure_root_exists(&root_b).await?;

        let (mut adapter, rx) = EventAdapter::new();
        let dispatch = match config.mode {
            Mode::AtoB => {
                let sidecar_root = sidecar::create(&root_b, &config.sidecar_name).await?;
                adapter.add(Side::A, &root_a)?;
                Dispatch::OneWay {
                    handler: OneWayHandler::new(
                        root_a,
                        root_b.clone(),
                        sidecar_root,
                        config.sidecar_name.clone(),
                    ),
                    sidecar_tree_root: root_b,
                }
            }
            Mode::BtoA => {
                let sidecar_root = sidecar::create(&root_a, &config.sidecar_name).await?;
                adapter.add(Side::A, &root_b)?;
                Dispatch::OneWay {
                    handler: OneWayHandler::new(
                        root_b,
                        root_a.clone(),
                        sidecar_root,
                        config.sidecar_name.clone(),
                    ),
                    sidecar_tree_root: root_a,
                }
            }
            Mode::Mirror => {
                let sidecar_a = sidecar::create(&root_a, &config.sidecar_name).await?;
                let sidecar_b = sidecar::create(&root_b, &config.sidecar_name).await?;
                adapter.add(Side::A, &root_a)?;
                adapter.add(Side::B, &root_b)?;
                Dispatch::Mirror {
                    handler: MirrorHandler::new(
                        root_a.clone(),
                        root_b.clone(),
                        sidecar_a,
                        sidecar_b,
                        config.sidecar_name.clone(),
                    ),
                    root_a,
                    root_b,
                }
            }
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        let status = Arc::clone(&self.status);
        let debounce_interval = config.debounce_interval;
        let sidecar_name = config.sidecar_name.clone();

        let task = tokio::spawn(run_dispatch_loop(
            dispatch,
            rx,
            stop_rx,
            adapter,
            debounce_interval,
            sidecar_name,
            status,
        ));

        {
            let mut status = self.status.lock().expect("status mutex poisoned");
            status.running = true;
            status.last_error = None;
        }
        self.state = Some(RunningState { stop_tx, task });
        info!(mode = ?config.mode, "engine started");
        Ok(())
    }

    /// Stops the dispatch task and waits for it to finish. Idempotent: a
    /// call while idle is a no-op.
    pub async fn stop(&mut self) -> Result<(), EngineError> {
        let Some(state) = self.state.take() else {
            return Ok(());
        };

        let _ = state.stop_tx.send(());
        if let Err(e) = state.task.await {
            warn!(error = %e, "dispatch task panicked during stop");
        }

        let mut status = self.status.lock().expect("status mutex poisoned");
        status.running = false;
        info!("engine stopped");
        Ok(())
    }
}

async fn ensure_root_exists(root: &AbsPath) -> Result<(), EngineError> {
    tokio::fs::metadata(root.as_path())
        .await
        .map_err(|_| {
            EngineError::Config(dirsync_core::domain::DomainError::Config(format!(
                "root does not exist: {root}"
            )))
        })?;
    Ok(())
}

enum Dispatch {
    OneWay {
        handler: OneWayHandler,
        /// Tree root the sidecar directory lives under (the destination
        /// side), kept so `stop` can recompute and remove it.
        sidecar_tree_root: AbsPath,
    },
    Mirror {
        handler: MirrorHandler,
        root_a: AbsPath,
        root_b: AbsPath,
    },
}

impl Dispatch {
    fn side_of(&self, path: &PathBuf) -> Side {
        match self {
            Dispatch::OneWay { .. } => Side::A,
            Dispatch::Mirror { root_a, .. } => match AbsPath::new(path.clone()) {
                Ok(p) if p.starts_with(root_a) => Side::A,
                _ => Side::B,
            },
        }
    }

    /// The tree roots whose sidecar directory this dispatch mode owns, for
    /// recreation and cleanup.
    fn sidecar_tree_roots(&self) -> Vec<&AbsPath> {
        match self {
            Dispatch::OneWay { sidecar_tree_root, .. } => vec![sidecar_tree_root],
            Dispatch::Mirror { root_a, root_b, .. } => vec![root_a, root_b],
        }
    }
}

async fn run_dispatch_loop(
    mut dispatch: Dispatch,
    mut rx: tokio::sync::mpsc::UnboundedReceiver<crate::adapter::SidedEvent>,
    mut stop_rx: oneshot::Receiver<()>,
    _adapter: EventAdapter,
    debounce_interval: Duration,
    sidecar_name: String,
    status: Arc<Mutex<Status>>,
) {
    let mut debounce = DebounceTable::new(debounce_interval);
    let mut suppression = SuppressionSet::new(debounce_interval);
    let mut poll_timer = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            biased;

            _ = &mut stop_rx => {
                debug!("stop signal received, shutting down dispatch loop");
                break;
            }

            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(sided) => {
                        let result = match &dispatch {
                            Dispatch::OneWay { handler, .. } => {
                                handler.handle_event(&sided.event, &mut debounce).await.map(|_| ())
                            }
                            Dispatch::Mirror { handler, .. } => {
                                handler
                                    .handle_event(&sided, &mut debounce, &mut suppression)
                                    .await
                                    .map(|_| ())
                            }
                        };
                        if let Err(err) = result {
                            handle_action_error(err, &dispatch, &sidecar_name, &status).await;
                        }
                    }
                    None => {
                        debug!("event channel closed, shutting down dispatch loop");
                        break;
                    }
                }
            }

            _ = poll_timer.tick() => {
                let due = debounce.due(Instant::now());
                for path in due {
                    let side = dispatch.side_of(&path);
                    let result = match &dispatch {
                        Dispatch::OneWay { handler, .. } => handler.handle_due(&path, &mut debounce).await,
                        Dispatch::Mirror { handler, .. } => {
                            handler.handle_due(&path, side, &mut debounce, &mut suppression).await
                        }
                    };
                    if let Err(err) = result {
                        handle_action_error(err, &dispatch, &sidecar_name, &status).await;
                    }
                }
                suppression.sweep(Instant::now());
            }
        }
    }

    debounce.drain();
    suppression.clear();
    remove_sidecars(&dispatch, &sidecar_name).await;

    let mut status = status.lock().expect("status mutex poisoned");
    status.running = false;
}

fn sidecar_path(root: &AbsPath, name: &str) -> Result<AbsPath, EngineError> {
    AbsPath::join(root, std::path::Path::new(name)).map_err(EngineError::Config)
}

async fn remove_sidecars(dispatch: &Dispatch, sidecar_name: &str) {
    for root in dispatch.sidecar_tree_roots() {
        if let Ok(sidecar) = sidecar_path(root, sidecar_name) {
            let _ = sidecar::remove(&sidecar).await;
        }
    }
}

/// Applies the policy implied by each [`ActionError`] variant: transient
/// and missing-source errors are dropped silently (the next
/// event retries them), a missing sidecar is recreated, and anything else
/// is logged and surfaced via [`Status::last_error`] without stopping the
/// loop.
async fn handle_action_error(
    err: ActionError,
    dispatch: &Dispatch,
    sidecar_name: &str,
    status: &Arc<Mutex<Status>>,
) {
    match err {
        ActionError::Transient { path, source } => {
            debug!(path = %path.display(), error = %source, "transient error, will retry on next event");
        }
        ActionError::MissingSource(path) => {
            debug!(path = %path.display(), "source vanished before action ran, dropping");
        }
        ActionError::MissingSidecar(_) => {
            warn!("sidecar directory missing, recreating");
            recreate_sidecars(dispatch, sidecar_name).await;
        }
        ActionError::NotUnderRoot(e) => {
            error!(error = %e, "path mapping failed unexpectedly");
            status.lock().expect("status mutex poisoned").last_error = Some(e.to_string());
        }
        ActionError::Fatal { path, source } => {
            error!(path = %path.display(), error = %source, "fatal action error");
            status.lock().expect("status mutex poisoned").last_error = Some(source.to_string());
        }
    }
}

async fn recreate_sidecars(dispatch: &Dispatch, sidecar_name: &str) {
    for root in dispatch.sidecar_tree_roots() {
        if sidecar::create(root, sidecar_name).await.is_err() {
            error!(root = %root, "failed to recreate sidecar directory");
        }
    }
}
