use crate::framework::RoutingSystem;
use educe::Educe;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A forwarding table entry: the best way out of this router towards `destination`
#[derive(Educe)]
#[educe(Clone(bound()), Debug(bound()), PartialEq(bound()))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(bound = ""))]
pub struct Route<T: RoutingSystem + ?Sized> {
    pub destination: T::HostAddress,
    /// the port whose peer table supplied this route
    pub port: T::Port,
    /// link latency plus the neighbour's advertised cost, capped at infinity
    pub metric: u16,
}
