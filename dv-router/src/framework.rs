use std::fmt::Debug;
use std::hash::Hash;

use cfg_if::cfg_if;
#[cfg(feature = "serde")]
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Logical time as provided by the host. Units are whatever the host ticks in.
pub type Timestamp = u64;

/// Default metric that represents an unreachable destination.
pub const INF: u16 = 16;
/// Default lifetime of a route learned from a neighbour advertisement.
pub const ROUTE_TTL: Timestamp = 15;

pub trait RoutingSystem {
    /// Identifier of a routable destination (usually a host), MUST be globally unique
    type HostAddress: Ord + RootData + RootKey;
    /// Local identifier of a link attached to this router, only unique per router
    type Port: Ord + Copy + RootData + RootKey;
    /// Opaque body carried by data packets
    type Payload: RootData + PartialEq;
    fn config() -> ProtocolParams {
        Default::default()
    }
}

cfg_if! {
    if #[cfg(feature = "serde")] {
        pub trait RootData: Clone + Debug + Serialize + DeserializeOwned + Sized {}
        impl<T: Clone + Debug + Serialize + DeserializeOwned + Sized> RootData for T {}
    } else {
        pub trait RootData: Clone + Debug + Sized {}
        impl<T: Clone + Debug + Sized> RootData for T {}
    }
}

pub trait RootKey: Eq + PartialEq + Hash {}
impl<T: Eq + PartialEq + Hash> RootKey for T {}

/// Tunable protocol parameters
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProtocolParams {
    /// any cost at or above this value is unreachable
    pub infinity: u16,
    /// how long a learned route lives without being refreshed
    pub route_ttl: Timestamp,
    /// advertise `infinity` back towards the next hop, instead of staying silent
    pub poison_mode: bool,
    /// how often the host is expected to call `handle_timer`
    pub timer_interval: Timestamp,
    /// how long a withdrawn destination keeps being poisoned, counted from the first full update
    /// that carried it
    pub withdrawal_hold: Timestamp,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            infinity: INF,
            route_ttl: ROUTE_TTL,
            poison_mode: true,
            timer_interval: 5,
            withdrawal_hold: ROUTE_TTL,
        }
    }
}
