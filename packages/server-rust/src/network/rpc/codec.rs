//! Frame codec shared by the RPC server and client.

use std::io;
use std::marker::PhantomData;

use addsvc_core::messages::{RpcRequest, RpcResponse};
use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Outcome of decoding one complete frame.
#[derive(Debug, PartialEq)]
pub enum Decoded<T> {
    Frame(T),
    /// The frame was complete but its body is not a valid message. The
    /// stream stays in sync, so the connection can keep serving.
    Malformed(String),
}

/// Length-delimited `MsgPack` codec decoding `In` and encoding `Out`.
#[derive(Debug)]
pub struct RpcCodec<In, Out> {
    inner: LengthDelimitedCodec,
    _marker: PhantomData<fn(Out) -> In>,
}

/// Server side: reads requests, writes responses.
pub type ServerCodec = RpcCodec<RpcRequest, RpcResponse>;

/// Client side: reads responses, writes requests.
pub type ClientCodec = RpcCodec<RpcResponse, RpcRequest>;

impl<In, Out> RpcCodec<In, Out> {
    #[must_use]
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            inner: LengthDelimitedCodec::builder()
                .length_field_length(4)
                .big_endian()
                .max_frame_length(max_frame_length)
                .new_codec(),
            _marker: PhantomData,
        }
    }
}

impl<In: DeserializeOwned, Out> Decoder for RpcCodec<In, Out> {
    type Item = Decoded<In>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(frame) = self.inner.decode(src)? else {
            return Ok(None);
        };
        Ok(Some(match rmp_serde::from_slice(&frame) {
            Ok(msg) => Decoded::Frame(msg),
            Err(e) => Decoded::Malformed(e.to_string()),
        }))
    }
}

impl<In, Out: Serialize> Encoder<Out> for RpcCodec<In, Out> {
    type Error = io::Error;

    fn encode(&mut self, item: Out, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = rmp_serde::to_vec_named(&item)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.inner.encode(Bytes::from(body), dst)
    }
}
