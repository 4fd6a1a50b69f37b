//! # Codec Facade
//!
//! The per-request protocol the dispatch layer drives: decode the body once,
//! report the dispatched method name, bind arguments, write the reply or an
//! error.
//!
//! ## Failure Reporting
//!
//! By default a failure becomes a transport-level error: a non-2xx status
//! with a plain-text reason and no `<fault>` document. With
//! `with_fault_responses(true)` failures are instead written as XML-RPC
//! faults with status 200.

use std::fmt;

use tracing::error;

use crate::bind::bind_params;
use crate::bind::Record;
use crate::decode::decode;
use crate::encode::encode_fault;
use crate::encode::encode_reply;
use crate::error::Result;
use crate::error::FAULT_INTERNAL_ERROR;
use crate::value::MethodCall;

/// Content type of every XML-RPC document, both directions.
pub const CONTENT_TYPE: &str = "text/xml; charset=utf-8";
/// Content type of transport-level error bodies.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Upper-cases the first letter of the last dot-separated segment.
///
/// `wp.getPosts` becomes `wp.GetPosts`; the rest of the segment is unchanged.
pub fn capitalize_method_name(name: &str) -> String {
    let (prefix, last) = match name.rfind('.') {
        Some(dot) => name.split_at(dot + 1),
        None => ("", name),
    };

    let mut chars = last.chars();
    match chars.next() {
        Some(first) => {
            let mut out = String::with_capacity(name.len());
            out.push_str(prefix);
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
            out
        }
        None => name.to_string(),
    }
}

/// The standard reason phrase for the statuses this crate produces.
pub fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        415 => "Unsupported Media Type",
        500 => "Internal Server Error",
        _ => "Unknown Status",
    }
}

/// A finished response, ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    /// A `text/xml` document with status 200.
    pub fn document(body: Vec<u8>) -> Self {
        Self { status: 200, content_type: CONTENT_TYPE, body }
    }

    /// A transport-level error: the status text as a plain-text body.
    pub fn error(status: u16) -> Self {
        Self {
            status,
            content_type: TEXT_CONTENT_TYPE,
            body: format!("{}\n", status_text(status)).into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Codec configuration. Cheap to copy into every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Codec {
    auto_capitalize_method_name: bool,
    fault_responses: bool,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch `wp.getPosts` as `wp.GetPosts`.
    pub fn with_auto_capitalize(mut self, on: bool) -> Self {
        self.auto_capitalize_method_name = on;
        self
    }

    /// Report failures as `<fault>` documents instead of HTTP errors.
    pub fn with_fault_responses(mut self, on: bool) -> Self {
        self.fault_responses = on;
        self
    }

    pub fn auto_capitalize(&self) -> bool {
        self.auto_capitalize_method_name
    }

    pub fn fault_responses(&self) -> bool {
        self.fault_responses
    }

    /// Decodes the request body once; arguments are bound later.
    pub fn new_request(&self, body: &[u8]) -> Result<CodecRequest> {
        let call = decode(body)?;
        Ok(CodecRequest { codec: *self, call })
    }

    /// Reports a failure that happened before a request could be decoded.
    pub fn write_error(&self, status: u16, code: i64, err: &dyn fmt::Display) -> Response {
        write_error(self.fault_responses, status, code, err)
    }
}

/// One decoded inbound call.
#[derive(Debug, Clone)]
pub struct CodecRequest {
    codec: Codec,
    call: MethodCall,
}

impl CodecRequest {
    /// The method name used for dispatch, after the capitalization policy.
    pub fn method(&self) -> String {
        if self.codec.auto_capitalize_method_name {
            capitalize_method_name(&self.call.method_name)
        } else {
            self.call.method_name.clone()
        }
    }

    pub fn call(&self) -> &MethodCall {
        &self.call
    }

    /// Binds the decoded parameters onto `args`.
    pub fn read_request<T: Record>(&self, args: &mut T) -> Result<()> {
        bind_params(&self.call.params, args)
    }

    /// Encodes `reply`; an encoding failure becomes a status 500 error.
    pub fn write_response<T: Record>(&self, reply: &T) -> Response {
        match encode_reply(reply) {
            Ok(body) => Response::document(body),
            Err(e) => self.write_error(500, e.fault_code(), &e),
        }
    }

    pub fn write_error(&self, status: u16, code: i64, err: &dyn fmt::Display) -> Response {
        write_error(self.codec.fault_responses, status, code, err)
    }
}

fn write_error(fault_responses: bool, status: u16, code: i64, err: &dyn fmt::Display) -> Response {
    error!(code = status, "write error: {}", err);

    if !fault_responses {
        return Response::error(status);
    }

    match encode_fault(code, &err.to_string()) {
        Ok(body) => Response::document(body),
        Err(e) => {
            error!(fault = FAULT_INTERNAL_ERROR, error = %e, "xmlrpc: error encoding fault");
            Response::error(500)
        }
    }
}
