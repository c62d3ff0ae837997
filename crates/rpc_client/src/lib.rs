//! Resilient outbound RPC layer for talking to backend services.
//!
//! Every backend gets one long-lived [`RpcChannel`]. A channel owns an ordered
//! interceptor chain that is composed once, when the channel is built, and
//! wraps every unary call:
//!
//! ```text
//! RpcChannel::unary
//!         ↓
//! TracingInterceptor   (span per call, W3C trace context into metadata)
//!         ↓
//! RetryInterceptor     (bounded attempts, per-attempt deadline)
//!         ↓
//! Transport            (tonic channel, raw protobuf bytes)
//! ```
//!
//! The layer adds resilience only. After the final attempt the backend's
//! `tonic::Status` is handed back to the caller unchanged.

pub mod channel;
pub mod error;
pub mod interceptor;
pub mod policy;
pub mod retry;
pub mod trace;
pub mod transport;

pub use channel::{make_client, RpcChannel};
pub use error::{Result, RpcError};
pub use interceptor::{Interceptor, Next, RpcCall};
pub use policy::RetryPolicy;
pub use retry::RetryInterceptor;
pub use trace::TracingInterceptor;
pub use transport::{RawCodec, TonicTransport, Transport};
