use std::collections::BTreeMap;

use crate::framework::RoutingSystem;
use educe::Educe;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The last cost sent to each (port, destination) pair.
///
/// Only used to avoid re-sending unchanged advertisements, routing never reads it.
#[derive(Educe)]
#[educe(Clone(bound()), Debug(bound()))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(bound = ""))]
pub struct AdvertisedState<T: RoutingSystem + ?Sized> {
    #[cfg_attr(feature = "serde", serde(with = "serde_with::As::<Vec<(serde_with::Same, serde_with::Same)>>"))]
    sent: BTreeMap<(T::Port, T::HostAddress), u16>,
}

impl<T: RoutingSystem + ?Sized> AdvertisedState<T> {
    pub fn new() -> Self {
        Self {
            sent: BTreeMap::new(),
        }
    }

    pub fn get(&self, port: &T::Port, destination: &T::HostAddress) -> Option<u16> {
        self.sent.get(&(*port, destination.clone())).copied()
    }

    /// Whether sending `cost` would tell the neighbour anything new
    pub fn differs(&self, port: &T::Port, destination: &T::HostAddress, cost: u16) -> bool {
        self.get(port, destination) != Some(cost)
    }

    pub fn record(&mut self, port: T::Port, destination: T::HostAddress, cost: u16) {
        self.sent.insert((port, destination), cost);
    }

    pub fn forget(&mut self, port: &T::Port, destination: &T::HostAddress) {
        self.sent.remove(&(*port, destination.clone()));
    }

    /// Drops everything sent over `port`, used when its link goes down
    pub fn forget_port(&mut self, port: &T::Port) {
        self.sent.retain(|(p, _), _| p != port);
    }

    /// Drops everything sent about `destination`, on every port
    pub fn forget_destination(&mut self, destination: &T::HostAddress) {
        self.sent.retain(|(_, d), _| d != destination);
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

impl<T: RoutingSystem + ?Sized> Default for AdvertisedState<T> {
    fn default() -> Self {
        Self::new()
    }
}
