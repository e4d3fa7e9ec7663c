//! # App Module
//!
//! Ties routing, dependency resolution and the error-handler chain together.
//!
//! ## Request flow
//!
//! 1. [`App::serve`] asks the [`Router`](crate::router::Router) for the handler and
//!    coerced path parameters.
//! 2. A fresh `200` response is shared with the handler and its dependencies.
//! 3. The handler's return value becomes the response's raw value, which
//!    `finalize` turns into a body and content type.
//! 4. Any failure along the way is passed to the most specific registered error
//!    handler. Handlers that fail themselves are skipped; if none succeeds the
//!    response is a bare `500`.
//!
//! ## Default error handlers
//!
//! | Kind | Response |
//! |---|---|
//! | `REDIRECT` | redirect status, `location` header, `content-type: text/plain`, empty body |
//! | `HTTP` | the condition's status, body `{"detail": <details>}` |
//! | `EXCEPTION` | `500`, empty body |

mod core;
mod errors;

pub use core::{html, App, Blueprint, Mountable};
