// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The supervisor.
//!
//! [`Daemon`] owns the worker set and converges it onto the desired
//! configuration: spawn workers for new interfaces, hand changed
//! configurations to existing ones (bounded by a per-worker timeout), and
//! stop workers whose interface disappeared. Reload requests arrive over an
//! internal channel and are acknowledged once the whole reconciliation pass
//! has run.

use crate::config::Config;
use crate::device::{DeviceWatcher, NetlinkDeviceWatcher};
use crate::errors::{ReloadError, ValidationErrors};
use crate::shutdown::cancelled;
use crate::socket::{KernelSocketFactory, SocketFactory};
use crate::status::Status;
use crate::worker::{Advertiser, AdvertiserHandle};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, RwLock as AsyncRwLock, mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{info, warn};

/// Bound on one worker's reload so a stuck worker cannot stall the
/// reconciliation pass.
const RELOAD_TIMEOUT: Duration = Duration::from_secs(3);

struct ReloadRequest {
    config: Config,
    done: oneshot::Sender<()>,
}

/// The Router Advertisement daemon.
pub struct Daemon {
    initial_config: Config,
    reload_tx: mpsc::Sender<ReloadRequest>,
    reload_rx: AsyncMutex<mpsc::Receiver<ReloadRequest>>,
    workers: AsyncRwLock<HashMap<String, AdvertiserHandle>>,
    sockets: Arc<dyn SocketFactory>,
    devices: Arc<dyn DeviceWatcher>,
}

impl Daemon {
    /// Create a daemon from `config`, validated on a defaulted copy; the
    /// caller's struct is left untouched.
    ///
    /// # Errors
    ///
    /// Returns every constraint violation found in the configuration.
    pub fn new(config: &Config) -> Result<Daemon, ValidationErrors> {
        Daemon::with_providers(
            config,
            Arc::new(KernelSocketFactory),
            Arc::new(NetlinkDeviceWatcher),
        )
    }

    /// Create a daemon with explicit socket and device-watcher providers.
    /// This is how tests substitute their doubles.
    pub(crate) fn with_providers(
        config: &Config,
        sockets: Arc<dyn SocketFactory>,
        devices: Arc<dyn DeviceWatcher>,
    ) -> Result<Daemon, ValidationErrors> {
        let initial_config = config.default_and_validate()?;
        let (reload_tx, reload_rx) = mpsc::channel(1);
        Ok(Daemon {
            initial_config,
            reload_tx,
            reload_rx: AsyncMutex::new(reload_rx),
            workers: AsyncRwLock::new(HashMap::new()),
            sockets,
            devices,
        })
    }

    /// Run the daemon until `shutdown` fires. Reconciles the worker set at
    /// startup and again on every reload, in FIFO order; one pass completes
    /// before the next request is consumed.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("starting daemon");
        let mut reload_rx = self.reload_rx.lock().await;
        let mut config = self.initial_config.clone();
        let mut done: Option<oneshot::Sender<()>> = None;

        loop {
            self.reconcile(&config, &shutdown).await;
            if let Some(done) = done.take() {
                let _ = done.send(());
            }

            tokio::select! {
                () = cancelled(&mut shutdown) => {
                    info!("shutting down daemon");
                    break;
                }
                maybe = reload_rx.recv() => {
                    let Some(request) = maybe else { break };
                    info!("reloading configuration");
                    config = request.config;
                    done = Some(request.done);
                }
            }
        }

        self.drain_workers().await;
    }

    /// Converge the worker set onto `config`. Holds the worker-set write
    /// lock for the whole pass, so status readers see either the old set or
    /// the new one.
    async fn reconcile(&self, config: &Config, shutdown: &watch::Receiver<bool>) {
        let mut workers = self.workers.write().await;

        for interface in &config.interfaces {
            if let Some(worker) = workers.get(&interface.name) {
                info!(interface = %interface.name, "updating RA worker");
                match timeout(RELOAD_TIMEOUT, worker.reload(interface.clone())).await {
                    Ok(Ok(())) => {}
                    Ok(Err(())) => {
                        warn!(interface = %interface.name, "worker is gone, reload dropped");
                    }
                    Err(_) => {
                        warn!(
                            interface = %interface.name,
                            "reload timed out, worker keeps its previous configuration"
                        );
                    }
                }
            } else {
                info!(interface = %interface.name, "adding RA worker");
                let worker = Advertiser::spawn(
                    interface.clone(),
                    self.sockets.clone(),
                    self.devices.clone(),
                    shutdown.clone(),
                );
                workers.insert(interface.name.clone(), worker);
            }
        }

        let desired: HashSet<&str> = config
            .interfaces
            .iter()
            .map(|interface| interface.name.as_str())
            .collect();
        let stale: Vec<String> = workers
            .keys()
            .filter(|name| !desired.contains(name.as_str()))
            .cloned()
            .collect();
        for name in stale {
            info!(interface = %name, "removing RA worker");
            if let Some(mut worker) = workers.remove(&name) {
                worker.stop();
            }
        }
    }

    /// Replace the running configuration. Validates on a defaulted copy,
    /// queues the result, and resolves once the main loop has completed the
    /// reconciliation pass for it.
    ///
    /// # Errors
    ///
    /// [`ReloadError::Validation`] leaves the daemon untouched;
    /// [`ReloadError::Cancelled`] means the caller's `cancel` fired (or the
    /// daemon went away) first, in which case the reload may or may not
    /// have been applied.
    pub async fn reload(
        &self,
        config: &Config,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), ReloadError> {
        let validated = config.default_and_validate()?;
        let (done_tx, done_rx) = oneshot::channel();
        let request = ReloadRequest {
            config: validated,
            done: done_tx,
        };

        tokio::select! {
            sent = self.reload_tx.send(request) => {
                if sent.is_err() {
                    return Err(ReloadError::Cancelled);
                }
            }
            () = cancelled(cancel) => return Err(ReloadError::Cancelled),
        }

        tokio::select! {
            acked = done_rx => acked.map_err(|_| ReloadError::Cancelled),
            () = cancelled(cancel) => Err(ReloadError::Cancelled),
        }
    }

    /// A deep copy of every worker's status, sorted by interface name.
    pub async fn status(&self) -> Status {
        let workers = self.workers.read().await;
        let mut interfaces: Vec<_> = workers.values().map(AdvertiserHandle::status).collect();
        drop(workers);
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        Status { interfaces }
    }

    /// Stop every worker and wait for them to release their sockets.
    async fn drain_workers(&self) {
        let mut workers = self.workers.write().await;
        let drained: Vec<AdvertiserHandle> = workers
            .drain()
            .map(|(_, mut worker)| {
                worker.stop();
                worker
            })
            .collect();
        drop(workers);
        for worker in drained {
            worker.join().await;
        }
    }
}
