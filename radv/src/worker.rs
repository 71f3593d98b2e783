// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The per-interface worker.
//!
//! One worker owns one socket and one device subscription, and turns one
//! [`InterfaceConfig`] into a stream of router advertisements: periodic
//! multicasts, plus unicast replies to solicitations relayed by a
//! subordinate receiver task. The worker linearizes its event sources
//! (solicitation, tick, reload, device change, stop, shutdown) in a single
//! select loop.
//!
//! Status lives behind its own lock, never held across I/O, so the daemon
//! can read it even while the loop is blocked in a syscall.

use crate::config::{
    DEFAULT_NAT64_LIFETIME_SECS, DEFAULT_PREFERRED_LIFETIME_SECS, DEFAULT_VALID_LIFETIME_SECS,
    InterfaceConfig, Preference,
};
use crate::device::{DeviceState, DeviceWatcher};
use crate::shutdown::cancelled;
use crate::socket::{ALL_NODES, RaSocket, SocketFactory};
use crate::status::{InterfaceState, InterfaceStatus};
use ndp::option::{
    DnsSearchList, NdpOption, Pref64, PrefixInformation, RecursiveDnsServer, RouteInformation,
};
use ndp::preference::RouterPreference;
use ndp::prefix::Ipv6Prefix;
use ndp::ra::RouterAdvertisement;
use ndp::solicit::RouterSolicitation;
use std::fmt::Display;
use std::net::Ipv6Addr;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{error, info, trace, warn};

/// Constant backoff between socket open attempts.
const OPEN_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// A solicitation relayed from the receiver task to the worker loop.
struct RsMsg {
    #[allow(dead_code)] // the solicitation body carries nothing we act on yet
    rs: RouterSolicitation,
    from: Ipv6Addr,
}

/// The worker's status record. Writers hold the lock only for field
/// assignment; readers take it for the duration of one clone.
#[derive(Clone)]
pub(crate) struct StatusCell(Arc<RwLock<InterfaceStatus>>);

impl StatusCell {
    fn new(name: &str) -> StatusCell {
        StatusCell(Arc::new(RwLock::new(InterfaceStatus {
            name: name.to_string(),
            state: InterfaceState::Unknown,
            ..InterfaceStatus::default()
        })))
    }

    fn write(&self) -> RwLockWriteGuard<'_, InterfaceStatus> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn snapshot(&self) -> InterfaceStatus {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn running(&self) {
        let mut status = self.write();
        status.state = InterfaceState::Running;
        status.message.clear();
    }

    fn reloading(&self) {
        let mut status = self.write();
        status.state = InterfaceState::Reloading;
        status.message.clear();
    }

    fn failing(&self, error: &impl Display) {
        let mut status = self.write();
        status.state = InterfaceState::Failing;
        status.message = error.to_string();
    }

    fn stopped(&self, message: &str) {
        let mut status = self.write();
        status.state = InterfaceState::Stopped;
        status.message = message.to_string();
    }

    fn sent(&self, solicited: bool) {
        let mut status = self.write();
        if solicited {
            status.tx_solicited_ra += 1;
        } else {
            status.tx_unsolicited_ra += 1;
        }
    }

    fn touch(&self) {
        self.write().last_update = now_unix();
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}

/// The daemon-facing side of a worker.
pub(crate) struct AdvertiserHandle {
    status: StatusCell,
    reload_tx: mpsc::Sender<InterfaceConfig>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl AdvertiserHandle {
    /// Hand a new configuration to the worker. Resolves once the worker has
    /// room to take it; the caller bounds this with its own timeout.
    pub(crate) async fn reload(&self, config: InterfaceConfig) -> Result<(), ()> {
        self.reload_tx.send(config).await.map_err(|_| ())
    }

    /// Signal the worker to stop. Idempotent.
    pub(crate) fn stop(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
    }

    pub(crate) fn status(&self) -> InterfaceStatus {
        self.status.snapshot()
    }

    /// Wait for the worker task to finish.
    pub(crate) async fn join(self) {
        let _ = self.task.await;
    }
}

/// The per-interface worker task state.
pub(crate) struct Advertiser {
    config: InterfaceConfig,
    status: StatusCell,
    reload_rx: mpsc::Receiver<InterfaceConfig>,
    stop_rx: oneshot::Receiver<()>,
    sockets: Arc<dyn SocketFactory>,
    devices: Arc<dyn DeviceWatcher>,
}

impl Advertiser {
    /// Spawn a worker for `config` and return its handle.
    pub(crate) fn spawn(
        config: InterfaceConfig,
        sockets: Arc<dyn SocketFactory>,
        devices: Arc<dyn DeviceWatcher>,
        shutdown: watch::Receiver<bool>,
    ) -> AdvertiserHandle {
        let status = StatusCell::new(&config.name);
        let (reload_tx, reload_rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = oneshot::channel();
        let advertiser = Advertiser {
            config,
            status: status.clone(),
            reload_rx,
            stop_rx,
            sockets,
            devices,
        };
        let task = tokio::spawn(advertiser.run(shutdown));
        AdvertiserHandle {
            status,
            reload_tx,
            stop_tx: Some(stop_tx),
            task,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let Advertiser {
            mut config,
            status,
            mut reload_rx,
            mut stop_rx,
            sockets,
            devices,
        } = self;

        // Timestamp of the first "update".
        status.touch();

        let mut device_updates = match devices.watch(&config.name, shutdown.clone()).await {
            Ok(updates) => updates,
            Err(e) => {
                error!(interface = %config.name, "device subscription failed: {e}");
                status.stopped(&e.to_string());
                return;
            }
        };
        let mut dev = DeviceState::default();

        'wait_device: loop {
            // Wait until the device is up, has a hardware address, and has
            // a link-local address. Anything less is ignored.
            while !dev.is_ready() {
                tokio::select! {
                    () = cancelled(&mut shutdown) => {
                        status.stopped("cancelled");
                        return;
                    }
                    _ = &mut stop_rx => {
                        status.stopped("");
                        return;
                    }
                    maybe = device_updates.recv() => {
                        match maybe {
                            Some(update) => dev = update,
                            None => {
                                status.stopped("device watcher terminated");
                                return;
                            }
                        }
                    }
                }
            }

            // Open the socket: EPERM/EINVAL stop the worker, anything else
            // is retried every second.
            let socket = loop {
                match sockets.open(&config.name) {
                    Ok(socket) => break socket,
                    Err(e) if e.is_unrecoverable() => {
                        error!(interface = %config.name, "giving up on socket: {e}");
                        status.stopped(&e.to_string());
                        return;
                    }
                    Err(e) => {
                        warn!(interface = %config.name, "socket open failed, will retry: {e}");
                        status.failing(&e);
                        tokio::select! {
                            () = cancelled(&mut shutdown) => {
                                status.stopped("cancelled");
                                return;
                            }
                            _ = &mut stop_rx => {
                                status.stopped("");
                                return;
                            }
                            () = time::sleep(OPEN_RETRY_BACKOFF) => {}
                        }
                    }
                }
            };

            // The receiver task relays solicitations until its own
            // cancellation fires; it shares the socket, so the kernel
            // resources go away once both sides have dropped it.
            let (rs_tx, mut rs_rx) = mpsc::channel::<RsMsg>(16);
            let (receiver_cancel, receiver_cancel_rx) = watch::channel(false);
            spawn_rs_receiver(socket.clone(), rs_tx, receiver_cancel_rx, status.clone());

            status.running();

            'reload: loop {
                let ra = build_ra(&config, &dev);
                let period = Duration::from_millis(config.ra_interval_milliseconds);
                let mut ticker = time::interval_at(time::Instant::now() + period, period);

                loop {
                    tokio::select! {
                        maybe = rs_rx.recv() => {
                            let Some(rs) = maybe else {
                                status.stopped("solicitation receiver terminated");
                                return;
                            };
                            trace!(interface = %config.name, from = %rs.from, "replying to router solicitation");
                            match socket.send_ra(rs.from, &ra, &mut shutdown).await {
                                Ok(()) => {
                                    status.sent(true);
                                    status.running();
                                }
                                Err(e) => status.failing(&e),
                            }
                        }
                        _ = ticker.tick() => {
                            match socket.send_ra(ALL_NODES, &ra, &mut shutdown).await {
                                Ok(()) => {
                                    status.sent(false);
                                    status.running();
                                }
                                Err(e) => status.failing(&e),
                            }
                        }
                        maybe = reload_rx.recv() => {
                            let Some(new_config) = maybe else {
                                let _ = receiver_cancel.send(true);
                                status.stopped("");
                                return;
                            };
                            if new_config == config {
                                info!(interface = %config.name, "no configuration change, skipping reload");
                                continue;
                            }
                            config = new_config;
                            status.reloading();
                            status.touch();
                            continue 'reload;
                        }
                        maybe = device_updates.recv() => {
                            let Some(update) = maybe else {
                                let _ = receiver_cancel.send(true);
                                status.stopped("device watcher terminated");
                                return;
                            };
                            let old_mac = dev.mac;
                            dev = update;
                            if !dev.is_up {
                                // Stop advertising until the device comes
                                // back; the socket is released here.
                                let _ = receiver_cancel.send(true);
                                status.failing(&"device is down");
                                continue 'wait_device;
                            }
                            if dev.mac != old_mac {
                                // The link-layer address option must follow.
                                status.reloading();
                                continue 'reload;
                            }
                        }
                        _ = &mut stop_rx => {
                            let _ = receiver_cancel.send(true);
                            status.stopped("");
                            return;
                        }
                        () = cancelled(&mut shutdown) => {
                            let _ = receiver_cancel.send(true);
                            status.stopped("cancelled");
                            return;
                        }
                    }
                }
            }
        }
    }
}

fn spawn_rs_receiver(
    socket: Arc<dyn RaSocket>,
    rs_tx: mpsc::Sender<RsMsg>,
    mut cancel: watch::Receiver<bool>,
    status: StatusCell,
) {
    tokio::spawn(async move {
        loop {
            match socket.recv_rs(&mut cancel).await {
                Ok((rs, from)) => {
                    if rs_tx.send(RsMsg { rs, from }).await.is_err() {
                        return;
                    }
                }
                Err(crate::errors::SocketError::Cancelled) => return,
                Err(e) => {
                    status.failing(&e);
                }
            }
        }
    });
}

/// Build the advertisement for the current configuration and device state.
/// Rebuilt on every reload and hardware address change; byte-stable across
/// ticks of one configuration.
fn build_ra(config: &InterfaceConfig, dev: &DeviceState) -> RouterAdvertisement {
    let mut options = Vec::new();

    if let Some(mac) = dev.mac {
        options.push(NdpOption::SourceLinkLayerAddress(mac));
    }

    if config.mtu > 0 {
        options.push(NdpOption::Mtu(config.mtu));
    }

    for prefix in &config.prefixes {
        // Validated on ingress; failing to parse here is a bug.
        let Ok(parsed) = prefix.prefix.parse::<Ipv6Prefix>() else {
            error!(prefix = %prefix.prefix, "skipping unparseable prefix in validated config");
            continue;
        };
        options.push(NdpOption::PrefixInformation(PrefixInformation {
            prefix: parsed,
            on_link: prefix.on_link,
            autonomous: prefix.autonomous,
            valid_lifetime: prefix
                .valid_lifetime_seconds
                .unwrap_or(DEFAULT_VALID_LIFETIME_SECS),
            preferred_lifetime: prefix
                .preferred_lifetime_seconds
                .unwrap_or(DEFAULT_PREFERRED_LIFETIME_SECS),
        }));
    }

    for route in &config.routes {
        let Ok(parsed) = route.prefix.parse::<Ipv6Prefix>() else {
            error!(prefix = %route.prefix, "skipping unparseable route in validated config");
            continue;
        };
        options.push(NdpOption::RouteInformation(RouteInformation {
            prefix: parsed,
            preference: wire_preference(route.preference),
            lifetime: route.lifetime_seconds,
        }));
    }

    for rdnss in &config.rdnsses {
        let servers: Vec<Ipv6Addr> = rdnss
            .addresses
            .iter()
            .filter_map(|address| match address.parse() {
                Ok(server) => Some(server),
                Err(_) => {
                    error!(address = %address, "skipping unparseable rdnss address in validated config");
                    None
                }
            })
            .collect();
        options.push(NdpOption::RecursiveDnsServer(RecursiveDnsServer {
            lifetime: rdnss.lifetime_seconds,
            servers,
        }));
    }

    for dnssl in &config.dnssls {
        options.push(NdpOption::DnsSearchList(DnsSearchList {
            lifetime: dnssl.lifetime_seconds,
            domains: dnssl.domain_names.clone(),
        }));
    }

    for nat64 in &config.nat64_prefixes {
        let Ok(parsed) = nat64.prefix.parse::<Ipv6Prefix>() else {
            error!(prefix = %nat64.prefix, "skipping unparseable NAT64 prefix in validated config");
            continue;
        };
        options.push(NdpOption::Pref64(Pref64 {
            lifetime: nat64
                .lifetime_seconds
                .unwrap_or(DEFAULT_NAT64_LIFETIME_SECS),
            prefix: parsed,
        }));
    }

    RouterAdvertisement {
        cur_hop_limit: config.current_hop_limit,
        managed: config.managed,
        other: config.other,
        preference: wire_preference(config.preference),
        router_lifetime: config.router_lifetime_seconds,
        reachable_time: config.reachable_time_milliseconds,
        retransmit_timer: config.retransmit_time_milliseconds,
        options,
    }
}

fn wire_preference(preference: Preference) -> RouterPreference {
    match preference {
        Preference::Low => RouterPreference::Low,
        Preference::Medium => RouterPreference::Medium,
        Preference::High => RouterPreference::High,
        Preference::Unknown => {
            warn!("unknown router preference, using medium");
            RouterPreference::Medium
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeDeviceWatcher, FakeSockRegistry, eventually};
    use ndp::mac::Mac;

    const MAC: Mac = Mac::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);

    fn quick_config(name: &str) -> InterfaceConfig {
        InterfaceConfig {
            name: name.to_string(),
            ra_interval_milliseconds: 100,
            ..InterfaceConfig::default()
        }
    }

    struct Harness {
        sockets: Arc<FakeSockRegistry>,
        devices: Arc<FakeDeviceWatcher>,
        shutdown: watch::Sender<bool>,
        handle: AdvertiserHandle,
    }

    fn spawn_worker(config: InterfaceConfig) -> Harness {
        let sockets = Arc::new(FakeSockRegistry::new());
        let devices = Arc::new(FakeDeviceWatcher::new());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = Advertiser::spawn(config, sockets.clone(), devices.clone(), shutdown_rx);
        Harness {
            sockets,
            devices,
            shutdown,
            handle,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unrecoverable_open_error_stops_the_worker() {
        let harness = spawn_worker(quick_config("net0"));
        harness.sockets.fail_open_with("net0", libc::EPERM);
        harness.devices.update("net0", DeviceState::ready(MAC));

        eventually("worker stopped", || {
            harness.handle.status().state == InterfaceState::Stopped
        })
        .await;
        assert!(
            harness
                .handle
                .status()
                .message
                .contains("cannot create socket")
        );
        drop(harness.shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_open_error_is_retried() {
        let harness = spawn_worker(quick_config("net0"));
        harness.sockets.fail_open_with("net0", libc::EAGAIN);
        harness.devices.update("net0", DeviceState::ready(MAC));

        eventually("worker failing", || {
            harness.handle.status().state == InterfaceState::Failing
        })
        .await;

        harness.sockets.clear_open_error("net0");
        eventually("worker recovered", || {
            harness.handle.status().state == InterfaceState::Running
        })
        .await;
        drop(harness.shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn device_down_releases_the_socket_and_recovers() {
        let harness = spawn_worker(quick_config("net0"));
        harness.devices.update("net0", DeviceState::ready(MAC));

        eventually("worker running", || {
            harness.handle.status().state == InterfaceState::Running
        })
        .await;
        let first_sock = harness.sockets.get("net0").unwrap();

        harness.devices.update(
            "net0",
            DeviceState {
                is_up: false,
                ..DeviceState::ready(MAC)
            },
        );
        eventually("worker failing", || {
            harness.handle.status().state == InterfaceState::Failing
        })
        .await;
        assert_eq!(harness.handle.status().message, "device is down");
        eventually("first socket closed", || first_sock.is_closed()).await;

        harness.devices.update("net0", DeviceState::ready(MAC));
        eventually("worker running again", || {
            harness.handle.status().state == InterfaceState::Running
        })
        .await;
        assert!(!harness.sockets.get("net0").unwrap().is_closed());
        drop(harness.shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn hardware_address_change_updates_the_lla_option() {
        let harness = spawn_worker(quick_config("net0"));
        harness.devices.update("net0", DeviceState::ready(MAC));

        eventually("worker running", || {
            harness.handle.status().state == InterfaceState::Running
        })
        .await;
        let sock = harness.sockets.get("net0").unwrap();

        let new_mac = Mac::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
        harness.devices.update("net0", DeviceState::ready(new_mac));
        // Let the device update drain before soliciting.
        time::sleep(Duration::from_millis(50)).await;

        let from: Ipv6Addr = "fe80::1".parse().unwrap();
        sock.inject_rs(RouterSolicitation::default(), from).await;

        let reply = sock.recv_unicast().await.unwrap();
        assert_eq!(reply.to, from);
        assert!(
            reply
                .ra
                .options
                .contains(&NdpOption::SourceLinkLayerAddress(new_mac))
        );
        drop(harness.shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_closes_the_socket() {
        let mut harness = spawn_worker(quick_config("net0"));
        harness.devices.update("net0", DeviceState::ready(MAC));

        eventually("worker running", || {
            harness.handle.status().state == InterfaceState::Running
        })
        .await;
        let sock = harness.sockets.get("net0").unwrap();

        harness.handle.stop();
        eventually("socket closed", || sock.is_closed()).await;
        assert_eq!(harness.handle.status().state, InterfaceState::Stopped);
        drop(harness.shutdown);
    }

    #[test]
    fn ra_reflects_the_whole_config() {
        let config = InterfaceConfig {
            name: "net0".to_string(),
            current_hop_limit: 10,
            managed: true,
            other: true,
            preference: Preference::High,
            router_lifetime_seconds: 10,
            reachable_time_milliseconds: 10_000,
            retransmit_time_milliseconds: 10_000,
            mtu: 1500,
            ..InterfaceConfig::default()
        };
        let ra = build_ra(&config, &DeviceState::ready(MAC));
        assert_eq!(ra.cur_hop_limit, 10);
        assert!(ra.managed);
        assert!(ra.other);
        assert_eq!(ra.preference, RouterPreference::High);
        assert_eq!(ra.router_lifetime, 10);
        assert_eq!(ra.reachable_time, 10_000);
        assert_eq!(ra.retransmit_timer, 10_000);
        assert_eq!(
            ra.options,
            vec![
                NdpOption::SourceLinkLayerAddress(MAC),
                NdpOption::Mtu(1500),
            ]
        );
        // Byte-identical across rebuilds of the same config.
        assert_eq!(
            ra.encode().unwrap(),
            build_ra(&config, &DeviceState::ready(MAC)).encode().unwrap()
        );
    }
}
