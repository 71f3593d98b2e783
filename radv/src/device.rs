// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Device state watcher.
//!
//! Workers need to know three things about their interface: is the link up,
//! what is its hardware address, and does it have an IPv6 link-local
//! address. The kernel implementation subscribes to the rtnetlink link and
//! IPv6 address notification groups, primes itself with a dump of the
//! existing state, and forwards every change for the named interface.

use crate::errors::DeviceError;
use crate::shutdown::cancelled;
use async_trait::async_trait;
use futures::stream::{StreamExt, TryStreamExt};
use ndp::mac::Mac;
use netlink_packet_core::NetlinkPayload;
use netlink_packet_route::RouteNetlinkMessage;
use netlink_packet_route::address::{AddressAttribute, AddressMessage};
use netlink_packet_route::link::{LinkAttribute, LinkFlag, LinkMessage};
use netlink_sys::{AsyncSocket, SocketAddr};
use std::net::{IpAddr, Ipv6Addr};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

/// rtnetlink notification group for link changes.
const RTNLGRP_LINK: u32 = 1;
/// rtnetlink notification group for IPv6 address changes.
const RTNLGRP_IPV6_IFADDR: u32 = 9;

/// Group bit for a netlink multicast group, as passed in a socket bind.
fn nl_mgrp(group: u32) -> u32 {
    1 << (group - 1)
}

/// What a worker knows about its device at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DeviceState {
    /// The link is administratively and operationally up.
    pub(crate) is_up: bool,
    /// The interface hardware address, once known.
    pub(crate) mac: Option<Mac>,
    /// An IPv6 link-local unicast address is currently bound.
    pub(crate) v6_ll_addr_assigned: bool,
}

impl DeviceState {
    /// True once the device can carry router advertisements.
    pub(crate) fn is_ready(&self) -> bool {
        self.is_up && self.mac.is_some() && self.v6_ll_addr_assigned
    }

    /// A fully ready device, for tests.
    #[cfg(test)]
    pub(crate) fn ready(mac: Mac) -> DeviceState {
        DeviceState {
            is_up: true,
            mac: Some(mac),
            v6_ll_addr_assigned: true,
        }
    }
}

/// Emits [`DeviceState`] updates for a named interface. Lazy: nothing is
/// subscribed until a worker calls [`DeviceWatcher::watch`], and the stream
/// ends when the given cancellation fires.
#[async_trait]
pub(crate) trait DeviceWatcher: Send + Sync {
    /// Subscribe to state changes of `interface`. The current state is
    /// emitted first when the interface already exists.
    async fn watch(
        &self,
        interface: &str,
        cancel: watch::Receiver<bool>,
    ) -> Result<mpsc::Receiver<DeviceState>, DeviceError>;
}

/// The rtnetlink-backed [`DeviceWatcher`].
pub(crate) struct NetlinkDeviceWatcher;

#[async_trait]
impl DeviceWatcher for NetlinkDeviceWatcher {
    async fn watch(
        &self,
        interface: &str,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<mpsc::Receiver<DeviceState>, DeviceError> {
        let (mut connection, handle, mut messages) =
            rtnetlink::new_connection().map_err(DeviceError::Subscribe)?;

        // Join the notification groups before the connection starts
        // processing, so no event can slip between the dump and the
        // subscription.
        let groups = nl_mgrp(RTNLGRP_LINK) | nl_mgrp(RTNLGRP_IPV6_IFADDR);
        connection
            .socket_mut()
            .socket_mut()
            .bind(&SocketAddr::new(0, groups))
            .map_err(DeviceError::Subscribe)?;
        tokio::spawn(connection);

        let (tx, rx) = mpsc::channel(16);
        let name = interface.to_string();
        tokio::spawn(async move {
            let mut state = DeviceState::default();
            let mut ifindex: Option<u32> = None;

            // List-existing semantics: prime from one link + address dump.
            let mut links = handle.link().get().match_name(name.clone()).execute();
            match links.try_next().await {
                Ok(Some(link)) => {
                    apply_link(&mut state, &link);
                    ifindex = Some(link.header.index);
                }
                Ok(None) => {}
                Err(e) => debug!(interface = %name, "link dump failed: {e}"),
            }
            if let Some(index) = ifindex {
                let mut addresses = handle
                    .address()
                    .get()
                    .set_link_index_filter(index)
                    .execute();
                loop {
                    match addresses.try_next().await {
                        Ok(Some(address)) => {
                            if address_is_link_local(&address) {
                                state.v6_ll_addr_assigned = true;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            debug!(interface = %name, "address dump failed: {e}");
                            break;
                        }
                    }
                }
                if tx.send(state.clone()).await.is_err() {
                    return;
                }
            }

            loop {
                tokio::select! {
                    () = cancelled(&mut cancel) => return,
                    maybe = messages.next() => {
                        let Some((message, _)) = maybe else {
                            warn!(interface = %name, "netlink event stream closed");
                            return;
                        };
                        let NetlinkPayload::InnerMessage(event) = message.payload else {
                            continue;
                        };
                        let changed = match event {
                            RouteNetlinkMessage::NewLink(link) => {
                                if link_name(&link) != Some(name.as_str()) {
                                    continue;
                                }
                                ifindex = Some(link.header.index);
                                apply_link(&mut state, &link);
                                true
                            }
                            RouteNetlinkMessage::DelLink(link) => {
                                if link_name(&link) != Some(name.as_str()) {
                                    continue;
                                }
                                ifindex = None;
                                state.is_up = false;
                                state.v6_ll_addr_assigned = false;
                                true
                            }
                            RouteNetlinkMessage::NewAddress(address) => {
                                if Some(address.header.index) == ifindex
                                    && address_is_link_local(&address)
                                {
                                    state.v6_ll_addr_assigned = true;
                                    true
                                } else {
                                    false
                                }
                            }
                            RouteNetlinkMessage::DelAddress(address) => {
                                if Some(address.header.index) == ifindex
                                    && address_is_link_local(&address)
                                {
                                    state.v6_ll_addr_assigned = false;
                                    true
                                } else {
                                    false
                                }
                            }
                            other => {
                                trace!(interface = %name, "ignoring netlink event {other:?}");
                                false
                            }
                        };
                        if changed && tx.send(state.clone()).await.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

fn link_name(link: &LinkMessage) -> Option<&str> {
    link.attributes.iter().find_map(|attr| match attr {
        LinkAttribute::IfName(name) => Some(name.as_str()),
        _ => None,
    })
}

fn apply_link(state: &mut DeviceState, link: &LinkMessage) {
    state.is_up = link.header.flags.contains(&LinkFlag::Up);
    if let Some(mac) = link.attributes.iter().find_map(|attr| match attr {
        LinkAttribute::Address(bytes) => Mac::from_slice(bytes),
        _ => None,
    }) {
        state.mac = Some(mac);
    }
}

fn address_is_link_local(address: &AddressMessage) -> bool {
    address.attributes.iter().any(|attr| match attr {
        AddressAttribute::Address(IpAddr::V6(addr)) => is_unicast_link_local(*addr),
        _ => false,
    })
}

/// fe80::/10, without relying on the unstable std method.
pub(crate) fn is_unicast_link_local(addr: Ipv6Addr) -> bool {
    addr.segments()[0] & 0xffc0 == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_needs_all_three() {
        let mac = Some(Mac::new([2, 0, 0, 0, 0, 1]));
        let ready = DeviceState {
            is_up: true,
            mac,
            v6_ll_addr_assigned: true,
        };
        assert!(ready.is_ready());
        assert!(!DeviceState { is_up: false, ..ready.clone() }.is_ready());
        assert!(!DeviceState { mac: None, ..ready.clone() }.is_ready());
        assert!(
            !DeviceState {
                v6_ll_addr_assigned: false,
                ..ready
            }
            .is_ready()
        );
    }

    #[test]
    fn link_local_detection() {
        assert!(is_unicast_link_local("fe80::1".parse().unwrap()));
        assert!(is_unicast_link_local("febf::1".parse().unwrap()));
        assert!(!is_unicast_link_local("fec0::1".parse().unwrap()));
        assert!(!is_unicast_link_local("2001:db8::1".parse().unwrap()));
        assert!(!is_unicast_link_local("ff02::1".parse().unwrap()));
    }

    #[test]
    fn group_masks() {
        assert_eq!(nl_mgrp(RTNLGRP_LINK), 0x1);
        assert_eq!(nl_mgrp(RTNLGRP_IPV6_IFADDR), 0x100);
    }
}
