// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Test doubles for the socket and device-watcher seams.
//!
//! The fake socket registry captures everything a worker transmits, split
//! into multicast and link-local unicast streams, and lets tests inject
//! solicitations and open failures. The fake device watcher replays the
//! last known state to late subscribers so tests need not race worker
//! bring-up.

use crate::device::{DeviceState, DeviceWatcher, is_unicast_link_local};
use crate::errors::{DeviceError, SocketError};
use crate::shutdown::cancelled;
use crate::socket::{RaSocket, SocketFactory};
use async_trait::async_trait;
use ndp::ra::RouterAdvertisement;
use ndp::solicit::RouterSolicitation;
use std::collections::HashMap;
use std::io;
use std::net::Ipv6Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Poll `check` with a short sleep until it holds; panic after ~2 s of
/// (virtual) time.
pub(crate) async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time: {what}");
}

/// One captured advertisement.
pub(crate) struct FakeRa {
    /// Virtual-clock timestamp of the send.
    pub(crate) at: Instant,
    pub(crate) ra: RouterAdvertisement,
    pub(crate) to: Ipv6Addr,
}

/// A registry of fake sockets, one per opened interface.
pub(crate) struct FakeSockRegistry {
    socks: Mutex<HashMap<String, Arc<FakeSockHandle>>>,
    open_errors: Mutex<HashMap<String, i32>>,
}

/// The test-facing side of one fake socket.
pub(crate) struct FakeSockHandle {
    multicast_rx: tokio::sync::Mutex<mpsc::Receiver<FakeRa>>,
    unicast_rx: tokio::sync::Mutex<mpsc::Receiver<FakeRa>>,
    rs_tx: mpsc::Sender<(RouterSolicitation, Ipv6Addr)>,
    closed: Arc<AtomicBool>,
}

impl FakeSockHandle {
    /// Next advertisement sent to the all-nodes group.
    pub(crate) async fn recv_multicast(&self) -> Option<FakeRa> {
        self.multicast_rx
            .lock()
            .await
            .recv()
            .await
    }

    /// Next advertisement sent to a link-local unicast destination.
    pub(crate) async fn recv_unicast(&self) -> Option<FakeRa> {
        self.unicast_rx.lock().await.recv().await
    }

    /// Hand a solicitation to the worker's receiver.
    pub(crate) async fn inject_rs(&self, rs: RouterSolicitation, from: Ipv6Addr) {
        let _ = self.rs_tx.send((rs, from)).await;
    }

    /// True once the worker has released the socket.
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl FakeSockRegistry {
    pub(crate) fn new() -> FakeSockRegistry {
        FakeSockRegistry {
            socks: Mutex::new(HashMap::new()),
            open_errors: Mutex::new(HashMap::new()),
        }
    }

    /// Make subsequent opens of `interface` fail with the given errno.
    pub(crate) fn fail_open_with(&self, interface: &str, errno: i32) {
        self.open_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(interface.to_string(), errno);
    }

    /// Let subsequent opens of `interface` succeed again.
    pub(crate) fn clear_open_error(&self, interface: &str) {
        self.open_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(interface);
    }

    /// The handle of the most recently opened socket on `interface`.
    pub(crate) fn get(&self, interface: &str) -> Option<Arc<FakeSockHandle>> {
        self.socks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(interface)
            .cloned()
    }
}

impl SocketFactory for FakeSockRegistry {
    fn open(&self, interface: &str) -> Result<Arc<dyn RaSocket>, SocketError> {
        if let Some(errno) = self
            .open_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(interface)
        {
            return Err(SocketError::Open {
                interface: interface.to_string(),
                source: io::Error::from_raw_os_error(*errno),
            });
        }

        let (multicast_tx, multicast_rx) = mpsc::channel(128);
        let (unicast_tx, unicast_rx) = mpsc::channel(128);
        let (rs_tx, rs_rx) = mpsc::channel(128);
        let closed = Arc::new(AtomicBool::new(false));

        let handle = Arc::new(FakeSockHandle {
            multicast_rx: tokio::sync::Mutex::new(multicast_rx),
            unicast_rx: tokio::sync::Mutex::new(unicast_rx),
            rs_tx,
            closed: closed.clone(),
        });
        // A reopen after device recovery replaces the previous handle.
        self.socks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(interface.to_string(), handle);

        Ok(Arc::new(FakeSock {
            multicast_tx,
            unicast_tx,
            rs_rx: tokio::sync::Mutex::new(rs_rx),
            closed,
        }))
    }
}

/// The worker-facing side of one fake socket.
struct FakeSock {
    multicast_tx: mpsc::Sender<FakeRa>,
    unicast_tx: mpsc::Sender<FakeRa>,
    rs_rx: tokio::sync::Mutex<mpsc::Receiver<(RouterSolicitation, Ipv6Addr)>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl RaSocket for FakeSock {
    async fn send_ra(
        &self,
        dst: Ipv6Addr,
        ra: &RouterAdvertisement,
        _cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), SocketError> {
        let captured = FakeRa {
            at: Instant::now(),
            ra: ra.clone(),
            to: dst,
        };
        let full = |what: &str| {
            SocketError::Send(io::Error::other(format!("tx {what} channel is full")))
        };
        if dst.is_multicast() {
            self.multicast_tx
                .try_send(captured)
                .map_err(|_| full("multicast"))
        } else if is_unicast_link_local(dst) {
            self.unicast_tx
                .try_send(captured)
                .map_err(|_| full("link-local unicast"))
        } else {
            Err(SocketError::Send(io::Error::other(
                "unsupported destination address type",
            )))
        }
    }

    async fn recv_rs(
        &self,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(RouterSolicitation, Ipv6Addr), SocketError> {
        let mut rs_rx = self.rs_rx.lock().await;
        tokio::select! {
            maybe = rs_rx.recv() => maybe.ok_or(SocketError::Cancelled),
            () = cancelled(cancel) => Err(SocketError::Cancelled),
        }
    }
}

impl Drop for FakeSock {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A device watcher fed by the test instead of the kernel.
pub(crate) struct FakeDeviceWatcher {
    inner: Mutex<HashMap<String, FakeDevice>>,
}

#[derive(Default)]
struct FakeDevice {
    last: Option<DeviceState>,
    subscribers: Vec<mpsc::Sender<DeviceState>>,
}

impl FakeDeviceWatcher {
    pub(crate) fn new() -> FakeDeviceWatcher {
        FakeDeviceWatcher {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Publish a state change for `interface`.
    pub(crate) fn update(&self, interface: &str, state: DeviceState) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let device = inner.entry(interface.to_string()).or_default();
        device.last = Some(state.clone());
        device
            .subscribers
            .retain(|subscriber| subscriber.try_send(state.clone()).is_ok());
    }
}

#[async_trait]
impl DeviceWatcher for FakeDeviceWatcher {
    async fn watch(
        &self,
        interface: &str,
        _cancel: watch::Receiver<bool>,
    ) -> Result<mpsc::Receiver<DeviceState>, DeviceError> {
        let (tx, rx) = mpsc::channel(16);
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let device = inner.entry(interface.to_string()).or_default();
        if let Some(last) = &device.last {
            let _ = tx.try_send(last.clone());
        }
        device.subscribers.push(tx);
        Ok(rx)
    }
}
