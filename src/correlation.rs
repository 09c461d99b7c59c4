//! Traits for working with correlation identifiers on frames.
//!
//! `CorrelatableFrame` abstracts over frame types that may carry a
//! [`RequestId`], allowing the session to route inbound frames without
//! knowing their concrete representation.

use crate::message::{Frame, RequestId, RpcRequest, RpcResponse};

/// Access the correlation identifier carried by a frame.
pub trait CorrelatableFrame {
    /// Return the correlation identifier associated with this frame, if any.
    fn request_id(&self) -> Option<&RequestId>;
}

impl CorrelatableFrame for RpcRequest {
    fn request_id(&self) -> Option<&RequestId> { Some(RpcRequest::request_id(self)) }
}

impl CorrelatableFrame for RpcResponse {
    fn request_id(&self) -> Option<&RequestId> { Some(RpcResponse::request_id(self)) }
}

impl CorrelatableFrame for Frame {
    fn request_id(&self) -> Option<&RequestId> {
        match self {
            Frame::Request(request) => CorrelatableFrame::request_id(request),
            Frame::Response(response) => CorrelatableFrame::request_id(response),
            Frame::Heartbeat => None,
        }
    }
}
