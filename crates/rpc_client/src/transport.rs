//! Terminal transport of the interceptor chain.
//!
//! Interceptors work on encoded bytes so the chain is independent of the
//! request and response message types. [`RawCodec`] hands those bytes to tonic
//! untouched; protobuf encoding happens in [`crate::RpcChannel::unary`].

use crate::interceptor::RpcCall;
use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes};
use tonic::client::Grpc;
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::Status;

/// Executes a single unary call attempt.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn unary(&self, call: RpcCall) -> Result<Bytes, Status>;
}

/// Transport backed by a tonic [`Channel`].
#[derive(Debug, Clone)]
pub struct TonicTransport {
    grpc: Grpc<Channel>,
}

impl TonicTransport {
    pub fn new(channel: Channel) -> Self {
        Self {
            grpc: Grpc::new(channel),
        }
    }
}

#[async_trait]
impl Transport for TonicTransport {
    async fn unary(&self, call: RpcCall) -> Result<Bytes, Status> {
        let mut grpc = self.grpc.clone();
        grpc.ready()
            .await
            .map_err(|e| Status::unavailable(format!("service was not ready: {}", e)))?;

        let mut request = tonic::Request::new(call.payload);
        *request.metadata_mut() = call.metadata;
        if let Some(timeout) = call.timeout {
            request.set_timeout(timeout);
        }

        let path = PathAndQuery::from_static(call.method);
        let response = grpc.unary(request, path, RawCodec).await?;
        Ok(response.into_inner())
    }
}

/// Pass-through codec for pre-encoded protobuf messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl Codec for RawCodec {
    type Encode = Bytes;
    type Decode = Bytes;
    type Encoder = RawEncoder;
    type Decoder = RawDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        RawEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        RawDecoder
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawEncoder;

impl Encoder for RawEncoder {
    type Item = Bytes;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        dst.put(item);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl Decoder for RawDecoder {
    type Item = Bytes;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let len = src.remaining();
        Ok(Some(src.copy_to_bytes(len)))
    }
}
