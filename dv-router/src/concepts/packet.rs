use crate::framework::RoutingSystem;
use educe::Educe;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Educe)]
#[educe(Clone(bound()), Debug(bound()), PartialEq(bound()))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(bound = ""))]
pub enum Packet<T: RoutingSystem + ?Sized> {
    /// distance-vector control traffic, exchanged only between neighbours
    RouteAdvertisement(RouteAdvertisement<T>),
    /// user traffic, forwarded hop by hop using the forwarding table
    Data(DataPacket<T>),
}

#[derive(Educe)]
#[educe(Clone(bound()), Debug(bound()), PartialEq(bound()))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(bound = ""))]
pub struct RouteAdvertisement<T: RoutingSystem + ?Sized> {
    pub destination: T::HostAddress,
    /// cost from the sender to the destination. Signed, since it comes off the wire untrusted,
    /// anything outside of [0, infinity] is clamped on receipt
    pub cost: i32,
}

#[derive(Educe)]
#[educe(Clone(bound()), Debug(bound()), PartialEq(bound()))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(bound = ""))]
pub struct DataPacket<T: RoutingSystem + ?Sized> {
    pub source: T::HostAddress,
    pub destination: T::HostAddress,
    pub payload: T::Payload,
}

#[derive(Educe)]
#[educe(Clone(bound()), Debug(bound()), PartialEq(bound()))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(bound = ""))]
pub struct OutboundPacket<T: RoutingSystem + ?Sized> {
    /// send via this port
    pub port: T::Port,
    pub packet: Packet<T>,
}

impl<T: RoutingSystem + ?Sized> OutboundPacket<T> {
    /// The advertisement carried by this packet, if it is one
    pub fn advertisement(&self) -> Option<&RouteAdvertisement<T>> {
        match &self.packet {
            Packet::RouteAdvertisement(ad) => Some(ad),
            Packet::Data(_) => None,
        }
    }
}
