use std::collections::{BTreeMap, BTreeSet};
use dv_router::concepts::packet::{DataPacket, OutboundPacket, Packet};
use dv_router::framework::{ProtocolParams, RoutingSystem, Timestamp};
use dv_router::router::Router;
use serde::{Deserialize, Serialize};

pub struct VirtualSystem;

impl RoutingSystem for VirtualSystem {
    type HostAddress = String;
    type Port = i32;
    type Payload = String;
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Endpoint {
    Router(String),
    Host(String),
}

/// A whole network of routers living in one process, with a logical clock.
///
/// Router-to-router links use the link id as the port number on both ends.
#[derive(Serialize, Deserialize)]
pub struct VirtualNetwork {
    pub routers: BTreeMap<String, Router<VirtualSystem>>,
    /// link id -> (router a, router b, latency)
    pub links: BTreeMap<i32, (String, String, u16)>,
    pub down: BTreeSet<i32>,
    /// router -> port -> whatever is on the other side
    pub endpoints: BTreeMap<String, BTreeMap<i32, Endpoint>>,
    /// host -> (router, port)
    pub hosts: BTreeMap<String, (String, i32)>,
    pub inboxes: BTreeMap<String, Vec<DataPacket<VirtualSystem>>>,
    /// every packet that left a router, in order
    pub trace: Vec<(String, OutboundPacket<VirtualSystem>)>,
    pub time: Timestamp,
    /// when set, route advertisements in flight are lost
    pub lossy: bool,
}

impl VirtualNetwork {
    pub fn create(
        nodes: &[&str],
        links: &[(i32, &str, &str, u16)],
        hosts: &[(&str, &str, i32, u16)],
    ) -> VirtualNetwork {
        Self::create_with_params(nodes, links, hosts, ProtocolParams::default())
    }

    pub fn create_with_params(
        nodes: &[&str],
        links: &[(i32, &str, &str, u16)],
        hosts: &[(&str, &str, i32, u16)],
        params: ProtocolParams,
    ) -> VirtualNetwork {
        let mut network = VirtualNetwork {
            routers: nodes
                .iter()
                .map(|id| (id.to_string(), Router::with_params(params.clone())))
                .collect(),
            links: BTreeMap::new(),
            down: BTreeSet::new(),
            endpoints: BTreeMap::new(),
            hosts: BTreeMap::new(),
            inboxes: BTreeMap::new(),
            trace: Vec::new(),
            time: 0,
            lossy: false,
        };
        for (lid, a, b, latency) in links {
            network.links.insert(*lid, (a.to_string(), b.to_string(), *latency));
            network.connect(a, *lid, Endpoint::Router(b.to_string()));
            network.connect(b, *lid, Endpoint::Router(a.to_string()));
            network.get_node(a).handle_link_up(*lid, *latency);
            network.get_node(b).handle_link_up(*lid, *latency);
            network.flush_packets();
        }
        for (host, router, port, latency) in hosts {
            network.hosts.insert(host.to_string(), (router.to_string(), *port));
            network.connect(router, *port, Endpoint::Host(host.to_string()));
            let node = network.get_node(router);
            node.handle_link_up(*port, *latency);
            node.handle_static_attach(host.to_string(), *port);
            network.flush_packets();
        }
        network
    }

    fn connect(&mut self, router: &str, port: i32, endpoint: Endpoint) {
        self.endpoints.entry(router.to_string()).or_default().insert(port, endpoint);
    }

    pub fn get_node(&mut self, node: &str) -> &mut Router<VirtualSystem> {
        self.routers.get_mut(node).unwrap_or_else(|| panic!("No node {node} found"))
    }

    pub fn node(&self, node: &str) -> &Router<VirtualSystem> {
        self.routers.get(node).unwrap_or_else(|| panic!("No node {node} found"))
    }

    pub fn get_next_hop(&self, cur: &str, dst: &str) -> i32 {
        self.node(cur).next_hop(&dst.to_string()).unwrap_or_else(|| panic!("No route found to {dst} at {cur}"))
    }

    pub fn get_metric_to(&self, cur: &str, dst: &str) -> u16 {
        self.node(cur).metric_to(&dst.to_string()).unwrap_or_else(|| panic!("No route found to {dst} at {cur}"))
    }

    pub fn has_route(&self, cur: &str, dst: &str) -> bool {
        self.node(cur).route(&dst.to_string()).is_some()
    }

    pub fn link_down(&mut self, link: i32) {
        let (a, b, _) = self.links[&link].clone();
        self.down.insert(link);
        self.get_node(&a).handle_link_down(link);
        self.get_node(&b).handle_link_down(link);
        self.flush_packets();
    }

    pub fn link_up(&mut self, link: i32) {
        let (a, b, latency) = self.links[&link].clone();
        self.down.remove(&link);
        self.get_node(&a).handle_link_up(link, latency);
        self.get_node(&b).handle_link_up(link, latency);
        self.flush_packets();
    }

    /// Injects a data packet from `src` (a host) and delivers it as far as it goes
    pub fn send_data(&mut self, src: &str, dst: &str, payload: &str) {
        let (router, port) = self.hosts[src].clone();
        let time = self.time;
        self.get_node(&router).handle_packet(
            Packet::Data(DataPacket {
                source: src.to_string(),
                destination: dst.to_string(),
                payload: payload.to_string(),
            }),
            port,
            time,
        );
        self.flush_packets();
    }

    pub fn inbox(&self, host: &str) -> Vec<DataPacket<VirtualSystem>> {
        self.inboxes.get(host).cloned().unwrap_or_default()
    }

    /// Delivers queued packets until every router is quiet
    pub fn flush_packets(&mut self) {
        for _ in 0..10_000 {
            let mut outbound = Vec::new();
            for (name, router) in &mut self.routers {
                for packet in router.outbound_packets.drain(..) {
                    outbound.push((name.clone(), packet));
                }
            }
            if outbound.is_empty() {
                return;
            }
            for (from, packet) in outbound {
                self.trace.push((from.clone(), packet.clone()));
                self.deliver(&from, packet);
            }
        }
        panic!("Network did not go quiet");
    }

    fn deliver(&mut self, from: &str, packet: OutboundPacket<VirtualSystem>) {
        if self.down.contains(&packet.port) {
            return;
        }
        let endpoint = match self.endpoints.get(from).and_then(|ports| ports.get(&packet.port)) {
            Some(endpoint) => endpoint.clone(),
            None => return,
        };
        match (endpoint, packet.packet) {
            (Endpoint::Router(_), Packet::RouteAdvertisement(_)) if self.lossy => {}
            (Endpoint::Router(to), pkt) => {
                let time = self.time;
                self.get_node(&to).handle_packet(pkt, packet.port, time);
            }
            (Endpoint::Host(host), Packet::Data(data)) => {
                self.inboxes.entry(host).or_default().push(data);
            }
            // hosts don't take part in routing
            (Endpoint::Host(_), Packet::RouteAdvertisement(_)) => {}
        }
    }

    pub fn tick(&mut self) {
        let interval = self.routers.values().next().map(|r| r.params.timer_interval).unwrap_or(5);
        self.time += interval;
        let time = self.time;
        for router in self.routers.values_mut() {
            router.handle_timer(time);
        }
        self.flush_packets();
    }

    pub fn tick_n(&mut self, times: i32) {
        for _ in 0..times {
            self.tick();
        }
    }

    /// Lets time pass without anyone running their timer, nothing gets refreshed
    pub fn advance_time(&mut self, by: Timestamp) {
        self.time += by;
    }

    /// Shortest path cost from every router to every host over the links that are up, capped at
    /// infinity. None where a host is unreachable.
    pub fn expected_metrics(&self, inf: u16) -> BTreeMap<(String, String), Option<u16>> {
        let names: Vec<String> = self.routers.keys().cloned().collect();
        let idx = |name: &str| names.iter().position(|n| n == name).unwrap();
        let n = names.len();
        let mut dist = vec![vec![None::<u32>; n]; n];
        for (i, row) in dist.iter_mut().enumerate() {
            row[i] = Some(0);
        }
        for (lid, (a, b, latency)) in &self.links {
            if self.down.contains(lid) {
                continue;
            }
            let (a, b) = (idx(a.as_str()), idx(b.as_str()));
            let latency = dist[a][b].map_or(*latency as u32, |d| d.min(*latency as u32));
            dist[a][b] = Some(latency);
            dist[b][a] = Some(latency);
        }
        for k in 0..n {
            for i in 0..n {
                for j in 0..n {
                    if let (Some(ik), Some(kj)) = (dist[i][k], dist[k][j]) {
                        if dist[i][j].map_or(true, |d| ik + kj < d) {
                            dist[i][j] = Some(ik + kj);
                        }
                    }
                }
            }
        }
        let mut expected = BTreeMap::new();
        for (i, router) in names.iter().enumerate() {
            for (host, (home, port)) in &self.hosts {
                let host_latency = self.node(home).store.link_latency(port).unwrap_or(inf) as u32;
                let metric = dist[i][idx(home.as_str())].map(|d| (d + host_latency).min(inf as u32) as u16);
                expected.insert((router.clone(), host.clone()), metric);
            }
        }
        expected
    }

    pub fn freeze(&mut self) -> String {
        serde_json::to_string(&self).unwrap()
    }

    pub fn restore(state: String) -> VirtualNetwork {
        serde_json::from_str(&state).unwrap()
    }
}
