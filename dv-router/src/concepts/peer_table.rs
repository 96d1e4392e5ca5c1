use std::collections::BTreeMap;

use educe::Educe;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::framework::{RoutingSystem, Timestamp};

/// When a peer table entry stops being valid
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Expiry {
    /// statically attached hosts never expire
    Never,
    At(Timestamp),
}

impl Expiry {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(t) => now > *t,
        }
    }
}

/// A single destination, as advertised by the neighbour on one port
#[derive(Educe)]
#[educe(Clone(bound()), Debug(bound()), PartialEq(bound()))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(bound = ""))]
pub struct PeerTableEntry<T: RoutingSystem + ?Sized> {
    pub destination: T::HostAddress,
    /// cost from the neighbour to the destination, already clamped to infinity
    pub latency: u16,
    pub expires_at: Expiry,
}

/// Everything the neighbour on one port has told us
#[derive(Educe)]
#[educe(Clone(bound()), Debug(bound()))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(bound = ""))]
pub struct PeerTable<T: RoutingSystem + ?Sized> {
    #[cfg_attr(feature = "serde", serde(with = "serde_with::As::<Vec<(serde_with::Same, serde_with::Same)>>"))]
    entries: BTreeMap<T::HostAddress, PeerTableEntry<T>>,
}

impl<T: RoutingSystem + ?Sized> PeerTable<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, destination: &T::HostAddress) -> Option<&PeerTableEntry<T>> {
        self.entries.get(destination)
    }

    pub fn upsert(&mut self, entry: PeerTableEntry<T>) {
        self.entries.insert(entry.destination.clone(), entry);
    }

    pub fn remove(&mut self, destination: &T::HostAddress) -> Option<PeerTableEntry<T>> {
        self.entries.remove(destination)
    }

    /// Entries in ascending destination order
    pub fn iter(&self) -> impl Iterator<Item = (&T::HostAddress, &PeerTableEntry<T>)> {
        self.entries.iter()
    }

    /// Destinations whose entry is past its expiry
    pub fn expired(&self, now: Timestamp) -> Vec<T::HostAddress> {
        self.entries
            .values()
            .filter(|e| e.expires_at.is_expired(now))
            .map(|e| e.destination.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: RoutingSystem + ?Sized> Default for PeerTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-port link latencies, plus one peer table for every port whose link is up.
///
/// Pure storage: nothing here recomputes routes or sends advertisements, the router does that
/// after each mutation.
#[derive(Educe)]
#[educe(Clone(bound()), Debug(bound()))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(bound = ""))]
pub struct PeerTableStore<T: RoutingSystem + ?Sized> {
    #[cfg_attr(feature = "serde", serde(with = "serde_with::As::<Vec<(serde_with::Same, serde_with::Same)>>"))]
    link_latency: BTreeMap<T::Port, u16>,
    #[cfg_attr(feature = "serde", serde(with = "serde_with::As::<Vec<(serde_with::Same, serde_with::Same)>>"))]
    peer_tables: BTreeMap<T::Port, PeerTable<T>>,
}

impl<T: RoutingSystem + ?Sized> PeerTableStore<T> {
    pub fn new() -> Self {
        Self {
            link_latency: BTreeMap::new(),
            peer_tables: BTreeMap::new(),
        }
    }

    pub fn set_link_latency(&mut self, port: T::Port, latency: u16) {
        self.link_latency.insert(port, latency);
    }

    pub fn link_latency(&self, port: &T::Port) -> Option<u16> {
        self.link_latency.get(port).copied()
    }

    /// Starts an empty peer table for `port`, replacing anything already there
    pub fn create_peer_table(&mut self, port: T::Port) {
        self.peer_tables.insert(port, PeerTable::new());
    }

    pub fn destroy_peer_table(&mut self, port: &T::Port) -> Option<PeerTable<T>> {
        self.peer_tables.remove(port)
    }

    pub fn is_active(&self, port: &T::Port) -> bool {
        self.peer_tables.contains_key(port)
    }

    /// Returns false (and does nothing) if `port` has no peer table
    pub fn upsert(
        &mut self,
        port: &T::Port,
        destination: T::HostAddress,
        latency: u16,
        expires_at: Expiry,
    ) -> bool {
        match self.peer_tables.get_mut(port) {
            Some(table) => {
                table.upsert(PeerTableEntry {
                    destination,
                    latency,
                    expires_at,
                });
                true
            }
            None => false,
        }
    }

    pub fn remove(
        &mut self,
        port: &T::Port,
        destination: &T::HostAddress,
    ) -> Option<PeerTableEntry<T>> {
        self.peer_tables.get_mut(port)?.remove(destination)
    }

    pub fn peer_table(&self, port: &T::Port) -> Option<&PeerTable<T>> {
        self.peer_tables.get(port)
    }

    /// Entries learned on `port`, empty if the link is down
    pub fn iter(
        &self,
        port: &T::Port,
    ) -> impl Iterator<Item = (&T::HostAddress, &PeerTableEntry<T>)> {
        self.peer_tables.get(port).into_iter().flat_map(|t| t.iter())
    }

    /// Active ports in ascending order
    pub fn ports(&self) -> impl Iterator<Item = &T::Port> {
        self.peer_tables.keys()
    }

    /// Active ports with their tables, in ascending port order
    pub fn tables(&self) -> impl Iterator<Item = (&T::Port, &PeerTable<T>)> {
        self.peer_tables.iter()
    }
}

impl<T: RoutingSystem + ?Sized> Default for PeerTableStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
