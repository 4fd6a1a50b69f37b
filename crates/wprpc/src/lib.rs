//! # wprpc
//!
//! The XML-RPC wire codec behind the WordPress/MetaWeblog to Micropub bridge.
//!
//! ## Architecture
//!
//! - **Value**: a closed sum over the XML-RPC type vocabulary.
//! - **Decode**: `methodCall` document to method name plus `Value`s.
//! - **Bind**: `Value`s onto a typed record, positionally, through the static
//!   field table `#[derive(Record)]` generates.
//! - **Encode**: a typed reply record to a `methodResponse` document.
//! - **Codec / Server**: the per-request protocol and a method registry.
//!
//! Everything here is synchronous and request-scoped; no state is shared
//! between calls.
//!
//! ```ignore
//! #[derive(Record, Default)]
//! struct GetPostsArgs {
//!     blog_id: String,
//!     username: String,
//!     password: String,
//!     filter: PostFilter,
//! }
//!
//! #[derive(Record, Default)]
//! struct PostFilter {
//!     post_type: String,
//!     #[xmlrpc(name = "number")]
//!     limit: i32,
//! }
//!
//! let call = wprpc::decode(body)?;
//! let mut args = GetPostsArgs::default();
//! wprpc::bind(&call.params, &mut args)?;
//! ```

extern crate self as wprpc;

pub mod bind;
pub mod codec;
pub mod decode;
pub mod encode;
pub mod error;
pub mod server;
pub mod value;
pub mod xml;

pub use bind::bind_params as bind;
pub use bind::Bind;
pub use bind::Field;
pub use bind::Record;

pub use codec::Codec;
pub use codec::CodecRequest;
pub use codec::Response;
pub use codec::CONTENT_TYPE;

pub use decode::decode;

pub use encode::encode_fault;
pub use encode::encode_reply as encode;
pub use encode::Encode;

pub use error::Error;
pub use error::Result;

pub use server::Fault;
pub use server::Request;
pub use server::Server;

pub use value::Kind;
pub use value::MethodCall;
pub use value::Value;

pub use xml::Writer;

#[cfg(feature = "derive")]
pub use wprpc_derive::Record;
