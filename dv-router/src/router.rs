use crate::concepts::advertised::AdvertisedState;
use crate::concepts::packet::{DataPacket, OutboundPacket, Packet, RouteAdvertisement};
use crate::concepts::peer_table::{Expiry, PeerTableStore};
use crate::concepts::route::Route;
use crate::feedback::RoutingWarning;
use crate::framework::{ProtocolParams, RoutingSystem, Timestamp};
use crate::util::{clamp_cost, cost_in_range, sum_inf};
use educe::Educe;
use log::{debug, trace, warn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::cmp::max;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Oldest warnings are dropped once this many are queued
pub const MAX_QUEUED_WARNINGS: usize = 256;

/// A single distance-vector router.
///
/// The router does no I/O. The host feeds it events (link changes, packets, timer ticks) one at a
/// time, and drains `outbound_packets` afterwards to put them on the wire.
#[derive(Educe)]
#[educe(Debug(bound()))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(bound = ""))]
pub struct Router<T: RoutingSystem + ?Sized> {
    pub params: ProtocolParams,
    pub store: PeerTableStore<T>,
    /// Destination, Route
    #[cfg_attr(feature = "serde", serde(with = "serde_with::As::<Vec<(serde_with::Same, serde_with::Same)>>"))]
    pub routes: BTreeMap<T::HostAddress, Route<T>>,
    /// destinations that lost their route, with the time of the first full update that poisoned
    /// them (None until then). Never overlaps with `routes`
    #[cfg_attr(feature = "serde", serde(with = "serde_with::As::<Vec<(serde_with::Same, serde_with::Same)>>"))]
    pub withdrawn: BTreeMap<T::HostAddress, Option<Timestamp>>,
    pub advertised: AdvertisedState<T>,
    pub outbound_packets: Vec<OutboundPacket<T>>,
    /// drained by the host, holds at most `MAX_QUEUED_WARNINGS`
    #[cfg_attr(feature = "serde", serde(skip))]
    pub warnings: Vec<RoutingWarning<T>>,
    /// the latest time we have been told about
    pub clock: Timestamp,
}

impl<T: RoutingSystem + ?Sized> Router<T> {
    pub fn new() -> Self {
        Self::with_params(T::config())
    }

    pub fn with_params(params: ProtocolParams) -> Self {
        Self {
            params,
            store: PeerTableStore::new(),
            routes: BTreeMap::new(),
            withdrawn: BTreeMap::new(),
            advertised: AdvertisedState::new(),
            outbound_packets: Vec::new(),
            warnings: Vec::new(),
            clock: 0,
        }
    }

    // region Inspection
    pub fn route(&self, destination: &T::HostAddress) -> Option<&Route<T>> {
        self.routes.get(destination)
    }

    pub fn next_hop(&self, destination: &T::HostAddress) -> Option<T::Port> {
        self.routes.get(destination).map(|r| r.port)
    }

    pub fn metric_to(&self, destination: &T::HostAddress) -> Option<u16> {
        self.routes.get(destination).map(|r| r.metric)
    }

    pub fn active_ports(&self) -> Vec<T::Port> {
        self.store.ports().copied().collect()
    }

    fn observe(&mut self, now: Timestamp) {
        self.clock = max(self.clock, now);
    }

    fn warn(&mut self, warning: RoutingWarning<T>) {
        warn!("{warning}");
        if self.warnings.len() >= MAX_QUEUED_WARNINGS {
            self.warnings.remove(0);
        }
        self.warnings.push(warning);
    }
    // endregion

    // region Event Handlers
    pub fn handle_link_up(&mut self, port: T::Port, latency: u16) {
        if self.store.is_active(&port) {
            self.warn(RoutingWarning::LinkAlreadyUp { port });
            self.handle_link_down(port);
        }
        debug!("Link up on port {port:?}, latency {latency}");
        self.store.set_link_latency(port, latency);
        self.store.create_peer_table(port);

        // the new neighbour gets our whole table right away
        let dump: Vec<(T::HostAddress, u16)> = self
            .routes
            .values()
            .map(|r| (r.destination.clone(), r.metric))
            .collect();
        for (destination, metric) in dump {
            self.send_advertisement(port, destination, metric);
        }
    }

    pub fn handle_link_down(&mut self, port: T::Port) {
        if self.store.destroy_peer_table(&port).is_none() {
            self.warn(RoutingWarning::LinkAlreadyDown { port });
            return;
        }
        self.advertised.forget_port(&port);

        let lost: Vec<T::HostAddress> = self
            .routes
            .values()
            .filter(|r| r.port == port)
            .map(|r| r.destination.clone())
            .collect();
        debug!("Link down on port {port:?}, lost {} routes", lost.len());
        for destination in lost {
            self.routes.remove(&destination);
            self.withdrawn.entry(destination).or_insert(None);
        }

        self.update_routes();
        self.send_routes(false);
    }

    /// Adds a host that is directly attached to `port`. Such routes never expire.
    pub fn handle_static_attach(&mut self, host: T::HostAddress, port: T::Port) {
        if !self.store.upsert(&port, host.clone(), 0, Expiry::Never) {
            self.warn(RoutingWarning::InactivePort { port });
            return;
        }
        debug!("Attached host {host:?} on port {port:?}");
        self.update_routes();
        self.send_routes(false);
    }

    pub fn handle_route_advertisement(
        &mut self,
        destination: T::HostAddress,
        port: T::Port,
        cost: i32,
        now: Timestamp,
    ) {
        self.observe(now);
        if !self.store.is_active(&port) {
            self.warn(RoutingWarning::InactivePort { port });
            return;
        }
        let inf = self.params.infinity;
        let latency = clamp_cost(cost, inf);
        if !cost_in_range(cost, inf) {
            self.warn(RoutingWarning::CostOutOfRange {
                port,
                destination: destination.clone(),
                cost,
                clamped: latency,
            });
        }
        let expires_at = Expiry::At(now.saturating_add(self.params.route_ttl));
        self.store.upsert(&port, destination, latency, expires_at);

        self.update_routes();
        self.send_routes(false);
    }

    /// Forwards a data packet along the forwarding table. Never changes routing state.
    pub fn handle_data_packet(&mut self, packet: DataPacket<T>, in_port: T::Port) {
        if !self.store.is_active(&in_port) {
            self.warn(RoutingWarning::InactivePort { port: in_port });
            return;
        }
        let out_port = match self.routes.get(&packet.destination) {
            Some(route) if route.metric < self.params.infinity && route.port != in_port => route.port,
            _ => {
                trace!("Dropped packet for {:?} from port {in_port:?}", packet.destination);
                return;
            }
        };
        self.outbound_packets.push(OutboundPacket {
            port: out_port,
            packet: Packet::Data(packet),
        });
    }

    /// handle a single packet received on `in_port`
    pub fn handle_packet(&mut self, packet: Packet<T>, in_port: T::Port, now: Timestamp) {
        match packet {
            Packet::RouteAdvertisement(RouteAdvertisement { destination, cost }) => {
                self.handle_route_advertisement(destination, in_port, cost, now)
            }
            Packet::Data(data) => self.handle_data_packet(data, in_port),
        }
    }

    /// Periodic maintenance, expires stale routes then re-sends the entire table
    pub fn handle_timer(&mut self, now: Timestamp) {
        self.expire_routes(now);
        self.send_routes(true);
    }
    // endregion

    // region Route Selection

    /// Rebuilds the forwarding table from scratch out of every active peer table.
    ///
    /// Ports are visited in ascending order, and ties keep the first route seen, so the result is
    /// fully determined by the peer tables. Destinations that disappear are marked as withdrawn,
    /// destinations that (re)appear stop being withdrawn.
    pub fn update_routes(&mut self) {
        let inf = self.params.infinity;
        let mut table: BTreeMap<T::HostAddress, Route<T>> = BTreeMap::new();
        for (port, peers) in self.store.tables() {
            let link_latency = self.store.link_latency(port).unwrap_or(inf);
            for (destination, entry) in peers.iter() {
                let metric = sum_inf(link_latency, entry.latency, inf);
                match table.entry(destination.clone()) {
                    Entry::Occupied(mut e) => {
                        if metric < e.get().metric {
                            e.insert(Route {
                                destination: destination.clone(),
                                port: *port,
                                metric,
                            });
                        }
                    }
                    Entry::Vacant(e) => {
                        e.insert(Route {
                            destination: destination.clone(),
                            port: *port,
                            metric,
                        });
                    }
                }
            }
        }

        for (destination, old) in &self.routes {
            match table.get(destination) {
                None => {
                    debug!("Withdrawing {destination:?}, was metric {} via {:?}", old.metric, old.port);
                    self.withdrawn.entry(destination.clone()).or_insert(None);
                }
                Some(new) if new.port != old.port || new.metric != old.metric => {
                    debug!(
                        "Route to {destination:?} changed from metric {} via {:?} to metric {} via {:?}",
                        old.metric, old.port, new.metric, new.port
                    );
                }
                _ => {}
            }
        }
        for destination in table.keys() {
            if self.withdrawn.remove(destination).is_some() {
                debug!("{destination:?} is reachable again");
            }
        }
        self.routes = table;
    }
    // endregion

    // region Expiration

    /// Drops every learned route that has outlived its TTL, returning the (destination, port)
    /// pairs that were removed. Also forgets withdrawals older than `withdrawal_hold`.
    pub fn expire_routes(&mut self, now: Timestamp) -> Vec<(T::HostAddress, T::Port)> {
        self.observe(now);
        let mut expired = Vec::new();
        for port in self.active_ports() {
            let stale = match self.store.peer_table(&port) {
                Some(table) => table.expired(now),
                None => continue,
            };
            for destination in stale {
                debug!("Route to {destination:?} via port {port:?} expired");
                self.store.remove(&port, &destination);
                expired.push((destination, port));
            }
        }
        if !expired.is_empty() {
            self.update_routes();
        }

        let hold = self.params.withdrawal_hold;
        let flushed: Vec<T::HostAddress> = self
            .withdrawn
            .iter()
            .filter(|(_, since)| (**since).is_some_and(|since| now.saturating_sub(since) > hold))
            .map(|(destination, _)| destination.clone())
            .collect();
        for destination in flushed {
            trace!("Forgetting withdrawn destination {destination:?}");
            self.withdrawn.remove(&destination);
            self.advertised.forget_destination(&destination);
        }
        expired
    }
    // endregion

    // region Advertisement

    /// Advertises the forwarding table, and any withdrawn destinations, to every neighbour.
    ///
    /// Towards the port a route goes out of, the route is poisoned (advertised at infinity), or
    /// withheld entirely when poison mode is off. Unless `force` is set, pairs whose last
    /// advertised cost is unchanged are skipped. Returns how many advertisements were queued.
    pub fn send_routes(&mut self, force: bool) -> usize {
        let inf = self.params.infinity;
        let poison = self.params.poison_mode;
        let mut pending = Vec::new();
        let mut withheld = Vec::new();

        for port in self.store.ports() {
            for route in self.routes.values() {
                if route.port == *port {
                    if poison {
                        pending.push((*port, route.destination.clone(), inf));
                    } else {
                        withheld.push((*port, route.destination.clone()));
                    }
                } else {
                    pending.push((*port, route.destination.clone(), route.metric));
                }
            }
            for destination in self.withdrawn.keys() {
                pending.push((*port, destination.clone(), inf));
            }
        }

        for (port, destination) in withheld {
            self.advertised.forget(&port, &destination);
        }
        if force && self.store.ports().next().is_some() {
            let clock = self.clock;
            for since in self.withdrawn.values_mut() {
                since.get_or_insert(clock);
            }
        }
        let mut sent = 0;
        for (port, destination, cost) in pending {
            if force || self.advertised.differs(&port, &destination, cost) {
                self.send_advertisement(port, destination, cost);
                sent += 1;
            }
        }
        sent
    }

    fn send_advertisement(&mut self, port: T::Port, destination: T::HostAddress, cost: u16) {
        trace!("Advertising {destination:?} at {cost} on port {port:?}");
        self.advertised.record(port, destination.clone(), cost);
        self.outbound_packets.push(OutboundPacket {
            port,
            packet: Packet::RouteAdvertisement(RouteAdvertisement {
                destination,
                cost: cost as i32,
            }),
        });
    }
    // endregion
}

impl<T: RoutingSystem + ?Sized> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}
