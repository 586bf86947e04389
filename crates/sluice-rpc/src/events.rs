//! Client-wide notifications.

use crate::envelope::RpcResponse;

/// Broadcast to every [`RpcClient::subscribe`](crate::RpcClient::subscribe) receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The method registry was rebuilt.
    Connected {
        /// Fully qualified names now available.
        methods: Vec<String>,
    },
    /// A call failed; carries the failure envelope. Emitted before the
    /// call's own failure callback runs.
    Error(RpcResponse),
}

/// Capacity of the client's event channel.
pub(crate) const EVENT_CAPACITY: usize = 64;
