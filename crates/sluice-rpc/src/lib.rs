#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    clippy::all,
    clippy::pedantic
)]
#![allow(clippy::module_name_repetitions)]

//! JSON-RPC client for the torrent daemon's web endpoint.
//!
//! The client learns what it can call from `system.listMethods`, groups the
//! dotted names into namespaces, and executes calls as `POST {method, params,
//! id}`. Results reach callers either through per-call callbacks
//! ([`CallOptions`]) or as plain `async` results, while every failure is also
//! broadcast to [`ClientEvent`] subscribers.

pub mod call;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod events;
pub mod registry;

pub use call::{CallOptions, PendingCall, RpcFailure, split_call_options};
pub use client::{MethodHandle, Namespace, RpcClient};
pub use config::RpcClientConfig;
pub use envelope::{ErrorCode, RpcErrorObject, RpcRequest, RpcResponse};
pub use error::{RpcError, RpcResult};
pub use events::ClientEvent;
pub use registry::{MethodRegistry, split_method_name};
