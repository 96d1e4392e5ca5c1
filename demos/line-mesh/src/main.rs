use std::collections::BTreeMap;

use anyhow::Context;
use dv_router::concepts::packet::OutboundPacket;
use dv_router::concepts::route::Route;
use dv_router::framework::RoutingSystem;
use dv_router::router::Router;
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

struct LineMesh {} // just a type to tell the router about our addressing
impl RoutingSystem for LineMesh {
    type HostAddress = String; // hosts have string names
    type Port = u8;
    type Payload = String;
}

fn main() -> anyhow::Result<()> {
    TermLogger::init(LevelFilter::Debug, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)
        .context("Failed to install logger")?;

    // we have the following connection: (laptop) bob <-1-> eve <-2-> alice (printer)
    // the port number on each router is the number of the link
    let links = [(1u8, "bob", "eve", 2u16), (2, "eve", "alice", 3)];

    let mut nodes: BTreeMap<&str, Router<LineMesh>> = BTreeMap::new();
    for name in ["bob", "eve", "alice"] {
        nodes.insert(name, Router::new());
    }
    for (port, a, b, latency) in links {
        for end in [a, b] {
            nodes.get_mut(end).context("unknown node")?.handle_link_up(port, latency);
        }
    }
    let bob = nodes.get_mut("bob").context("unknown node")?;
    bob.handle_link_up(10, 1);
    bob.handle_static_attach("laptop".to_string(), 10);
    let alice = nodes.get_mut("alice").context("unknown node")?;
    alice.handle_link_up(10, 1);
    alice.handle_static_attach("printer".to_string(), 10);

    // lets simulate routing!
    let mut now = 0;
    for step in 0..3 {
        // deliver everything that is queued, until the network goes quiet
        loop {
            let mut packets: Vec<(&str, OutboundPacket<LineMesh>)> = Vec::new();
            for (name, node) in nodes.iter_mut() {
                packets.extend(node.outbound_packets.drain(..).map(|p| (*name, p)));
            }
            if packets.is_empty() {
                break;
            }
            for (from, OutboundPacket { port, packet }) in packets {
                let peer = links.iter().find_map(|(link, a, b, _)| match (*link == port, *a == from) {
                    (true, true) => Some(*b),
                    (true, false) if *b == from => Some(*a),
                    _ => None,
                });
                // anything else went out to a host
                if let Some(node) = peer.and_then(|peer| nodes.get_mut(peer)) {
                    node.handle_packet(packet, port, now);
                }
            }
        }

        info!("Bob's routes in step {step}:");
        for (dest, Route::<LineMesh> { metric, port, .. }) in &nodes["bob"].routes {
            info!(" - {dest}: metric: {metric}, port: {port}");
        }

        now += 5;
        for node in nodes.values_mut() {
            node.handle_timer(now);
        }
    }

    println!("{}", serde_json::to_string_pretty(&nodes["bob"])?);
    Ok(())
}
