use educe::Educe;
use thiserror::Error;
use crate::framework::RoutingSystem;

/// Malformed or stale input the router tolerated.
///
/// None of these are fatal: the offending event is either ignored or sanitized, and the router
/// keeps processing. They are logged and queued on `Router::warnings` for the host to inspect.
#[derive(Error)]
#[derive(Educe)]
#[educe(Clone(bound()), Debug(bound()), PartialEq(bound()))]
pub enum RoutingWarning<T: RoutingSystem + ?Sized> {
    /// An advertisement, static attachment or data packet arrived on a port whose link is down.
    /// Usually a packet racing a link-down event, the event is dropped.
    #[error("Ignored event on port {port:?}, the link is not up")]
    InactivePort {
        port: T::Port
    },
    /// A neighbour advertised a cost outside of [0, infinity], it was clamped before use
    #[error("Neighbour on port {port:?} advertised cost {cost} for {destination:?}, clamped to {clamped}")]
    CostOutOfRange {
        port: T::Port,
        destination: T::HostAddress,
        cost: i32,
        clamped: u16
    },
    /// Link-up for a port that is already up, handled as a flap (down, then up)
    #[error("Link on port {port:?} came up while already up")]
    LinkAlreadyUp {
        port: T::Port
    },
    /// Link-down for a port that is not up, ignored
    #[error("Link on port {port:?} went down while not up")]
    LinkAlreadyDown {
        port: T::Port
    }
}
