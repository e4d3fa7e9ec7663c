//! # Server Module
//!
//! The request/response model exchanged with transport adapters.
//!
//! An adapter turns its host's native request into a [`Request`] (upper-case method,
//! every query value a sequence, body decoded to a string), calls
//! [`crate::App::serve`], and writes the returned [`Response`] back using
//! [`Response::into_parts`]: a status code, `(name, value)` header pairs where a
//! repeated header appears several times, and a string body.

pub mod request;
pub mod response;

pub use request::{parse_cookies, parse_query, HeaderVec, Request, MAX_INLINE_HEADERS};
pub use response::{Cookie, Reply, Response, SharedResponse};
