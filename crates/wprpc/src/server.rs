//! # Dispatch
//!
//! A registry from dispatched method names to typed handlers, driving the
//! codec once per inbound request.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: The server knows nothing about sockets or routing. A
//!   transport hands it a verb, a content type and a body, and writes back the
//!   `Response` it returns.
//! - **Typed Handlers**: Each method is registered with its argument and reply
//!   records; binding and encoding happen here, never in the handler.
//!
//! ## Status Mapping
//!
//! | failure | status |
//! |---|---|
//! | verb other than `POST` | 405 |
//! | content type other than `text/xml` | 415 |
//! | undecodable body, bind failure, encode failure | 500 |
//! | unknown method, handler error | 400 |

use std::collections::BTreeMap;
use std::time::Instant;

use thiserror::Error;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::bind::Record;
use crate::codec::Codec;
use crate::codec::CodecRequest;
use crate::codec::Response;
use crate::error::FAULT_APPLICATION_ERROR;
use crate::error::FAULT_METHOD_NOT_FOUND;

/// A handler failure with an explicit fault code.
///
/// Handlers may return this through `anyhow`; any other error is reported
/// with `FAULT_APPLICATION_ERROR`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Fault {
    pub code: i64,
    pub message: String,
}

impl Fault {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Credentials were missing or rejected.
    pub fn forbidden() -> Self {
        Self::new(403, "Forbidden")
    }
}

/// One inbound request as the transport sees it.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// HTTP verb.
    pub method: &'a str,
    pub content_type: Option<&'a str>,
    pub body: &'a [u8],
}

impl<'a> Request<'a> {
    /// A `POST` with the XML-RPC content type.
    pub fn post(body: &'a [u8]) -> Self {
        Self { method: "POST", content_type: Some(crate::codec::CONTENT_TYPE), body }
    }
}

type Handler = Box<dyn Fn(&CodecRequest) -> Response + Send + Sync>;

/// Dispatches decoded calls to registered handlers.
pub struct Server {
    codec: Codec,
    handlers: BTreeMap<String, Handler>,
}

impl Server {
    pub fn new(codec: Codec) -> Self {
        Self { codec, handlers: BTreeMap::new() }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Registers `handler` under its dispatched name, e.g. `wp.GetUsers`.
    ///
    /// A later registration under the same name replaces the earlier one.
    pub fn register<A, R, F>(&mut self, method: &str, handler: F) -> &mut Self
    where
        A: Record + Default + 'static,
        R: Record + Default + 'static,
        F: Fn(&A, &mut R) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let erased = move |req: &CodecRequest| -> Response {
            let mut args = A::default();
            if let Err(e) = req.read_request(&mut args) {
                return req.write_error(500, e.fault_code(), &e);
            }

            let mut reply = R::default();
            if let Err(e) = handler(&args, &mut reply) {
                let code = e.downcast_ref::<Fault>().map_or(FAULT_APPLICATION_ERROR, |f| f.code);
                return req.write_error(400, code, &e);
            }

            req.write_response(&reply)
        };

        self.handlers.insert(method.to_string(), Box::new(erased));
        self
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Exact match first, then the first name equal ignoring ASCII case.
    fn lookup(&self, method: &str) -> Option<&Handler> {
        self.handlers.get(method).or_else(|| {
            self.handlers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(method))
                .map(|(_, handler)| handler)
        })
    }

    /// Serves one request and logs its outcome.
    pub fn serve(&self, req: &Request<'_>) -> Response {
        let started = Instant::now();
        let resp = self.dispatch(req);
        let elapsed = started.elapsed();

        let code = resp.status;
        let sz = req.body.len();
        let respsz = resp.body.len();
        let ct = req.content_type.unwrap_or("");
        if resp.is_success() {
            info!(code, sz, respsz, d = ?elapsed, ct, "{} xmlrpc", req.method);
        } else if (300..400).contains(&code) {
            warn!(code, sz, respsz, d = ?elapsed, ct, "{} xmlrpc", req.method);
        } else {
            error!(code, sz, respsz, d = ?elapsed, ct, "{} xmlrpc", req.method);
        }
        resp
    }

    fn dispatch(&self, req: &Request<'_>) -> Response {
        if req.method != "POST" {
            error!(verb = req.method, "rpc: POST method required");
            return Response::error(405);
        }

        if let Some(ct) = req.content_type.filter(|ct| !ct.is_empty()) {
            let media = ct.split(';').next().unwrap_or("").trim();
            if !media.eq_ignore_ascii_case("text/xml") {
                error!(ct, "rpc: unrecognized Content-Type");
                return Response::error(415);
            }
        }

        let codec_req = match self.codec.new_request(req.body) {
            Ok(r) => r,
            Err(e) => return self.codec.write_error(500, e.fault_code(), &e),
        };

        let method = codec_req.method();
        match self.lookup(&method) {
            Some(handler) => handler(&codec_req),
            None => {
                let reason = format!("rpc: can't find method \"{}\"", method);
                codec_req.write_error(400, FAULT_METHOD_NOT_FOUND, &reason)
            }
        }
    }
}
