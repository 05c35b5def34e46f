//! Binary RPC adapter: length-prefixed `MsgPack` frames over TCP.
//!
//! Each frame is a 4-byte big-endian length followed by a named-field
//! `MsgPack` encoding of [`RpcRequest`](addsvc_core::messages::RpcRequest)
//! or [`RpcResponse`](addsvc_core::messages::RpcResponse). Requests on one
//! connection are answered in order.

pub mod client;
pub mod codec;
pub mod server;

pub use client::{RpcClient, RpcError};
pub use codec::{ClientCodec, Decoded, RpcCodec, ServerCodec};
pub use server::{RpcDispatcher, RpcModule};
