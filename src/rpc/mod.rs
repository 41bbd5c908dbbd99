//! Lightweight remote-procedure protocol between the gateway and its workers.
//!
//! A call names its target as `"<Service>.<Method>"`, carries one JSON
//! parameter object, and ends in exactly one of a status string or an error
//! string. Frames are length-prefixed JSON over TCP; the client opens one
//! connection per call.
//!
//! - [`wire`]: framing and envelopes
//! - [`RpcClient`]: one synchronous call with a caller-supplied deadline
//! - [`RpcService`] / [`ServiceRegistry`]: server-side method dispatch
//! - [`RpcListener`]: accept loop with a failure budget and admission limit

mod client;
mod listener;
mod service;
pub mod wire;

pub use client::RpcClient;
pub use listener::{AcceptOutcome, Acceptor, ListenerState, RpcListener};
pub use service::{decode_params, RpcService, ServiceRegistry};
pub use wire::{MethodTarget, RpcReply, RpcRequest};
