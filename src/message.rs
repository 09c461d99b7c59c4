//! Wire messages exchanged over an RPC connection.
//!
//! [`Frame`] is the unit written to and read from the transport. Requests and
//! responses carry a [`RequestId`] used as the correlation key, while
//! [`Frame::Heartbeat`] is an identifier-free liveness probe.

use std::fmt;

use bincode::{
    Decode,
    Encode,
    config,
    decode_from_slice,
    encode_to_vec,
    error::{DecodeError, EncodeError},
};

use crate::error::RpcError;

/// Wrapper trait for types that travel over the wire.
///
/// Any type deriving [`Encode`] and [`Decode`] implements this trait via a
/// blanket implementation using bincode's standard configuration.
pub trait Message: Encode + Decode<()> {
    /// Serialize the message into a byte vector.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if serialization fails.
    fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> { encode_to_vec(self, config::standard()) }

    /// Deserialize a message from a byte slice, returning the message and
    /// the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if deserialization fails.
    fn from_bytes(bytes: &[u8]) -> Result<(Self, usize), DecodeError>
    where
        Self: Sized,
    {
        decode_from_slice(bytes, config::standard())
    }
}

impl<T> Message for T where T: Encode + Decode<()> {}

/// Identifier correlating a request with its eventual response.
///
/// Uniqueness among in-flight requests on one connection is the caller's
/// responsibility. [`RequestId::generate`] hands out random UUIDs for callers
/// that do not maintain their own scheme.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub struct RequestId(String);

impl RequestId {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

    /// Allocate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self { Self(uuid::Uuid::new_v4().to_string()) }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self { Self::new(value) }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self { Self(value) }
}

/// Outbound remote procedure call.
///
/// Only [`request_id`](Self::request_id) is read by the session layer; the
/// remaining fields are opaque to it.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct RpcRequest {
    request_id: RequestId,
    service: String,
    method: String,
    payload: Vec<u8>,
}

impl RpcRequest {
    /// Build a request with a freshly generated identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use rpclink::message::RpcRequest;
    ///
    /// let a = RpcRequest::new("echo", "say", vec![1]);
    /// let b = RpcRequest::new("echo", "say", vec![1]);
    /// assert_ne!(a.request_id(), b.request_id());
    /// ```
    #[must_use]
    pub fn new(service: impl Into<String>, method: impl Into<String>, payload: Vec<u8>) -> Self {
        Self::with_id(RequestId::generate(), service, method, payload)
    }

    /// Build a request carrying a caller-assigned identifier.
    #[must_use]
    pub fn with_id(
        request_id: impl Into<RequestId>,
        service: impl Into<String>,
        method: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            service: service.into(),
            method: method.into(),
            payload,
        }
    }

    /// Correlation key of this request.
    #[must_use]
    pub fn request_id(&self) -> &RequestId { &self.request_id }

    /// Name of the remote service.
    #[must_use]
    pub fn service(&self) -> &str { &self.service }

    /// Name of the remote method.
    #[must_use]
    pub fn method(&self) -> &str { &self.method }

    /// Encoded call arguments.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }
}

/// Reply to an [`RpcRequest`], tagged with the originating identifier.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct RpcResponse {
    request_id: RequestId,
    error: Option<String>,
    payload: Vec<u8>,
}

impl RpcResponse {
    /// Successful response carrying `payload`.
    #[must_use]
    pub fn ok(request_id: impl Into<RequestId>, payload: Vec<u8>) -> Self {
        Self {
            request_id: request_id.into(),
            error: None,
            payload,
        }
    }

    /// Response reporting a failure raised by the remote service.
    #[must_use]
    pub fn error(request_id: impl Into<RequestId>, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            error: Some(message.into()),
            payload: Vec::new(),
        }
    }

    /// Correlation key of this response.
    #[must_use]
    pub fn request_id(&self) -> &RequestId { &self.request_id }

    /// Encoded result value.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Remote error message, if the call failed on the peer.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> { self.error.as_deref() }

    /// Returns `true` when the peer reported a failure.
    #[must_use]
    pub fn is_error(&self) -> bool { self.error.is_some() }

    /// Convert into the payload, mapping a remote failure to [`RpcError::Remote`].
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Remote`] when the response carries an error message.
    pub fn into_result(self) -> Result<Vec<u8>, RpcError> {
        match self.error {
            Some(message) => Err(RpcError::Remote(message)),
            None => Ok(self.payload),
        }
    }
}

/// Unit written to and read from a connection.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Frame {
    /// A call issued by the client.
    Request(RpcRequest),
    /// A reply issued by the server.
    Response(RpcResponse),
    /// Liveness probe; carries no identifier and is never correlated.
    Heartbeat,
}

impl From<RpcRequest> for Frame {
    fn from(value: RpcRequest) -> Self { Frame::Request(value) }
}

impl From<RpcResponse> for Frame {
    fn from(value: RpcResponse) -> Self { Frame::Response(value) }
}
