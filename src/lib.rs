//! # cuproute
//!
//! **cuproute** is a small, synchronous request-handling framework: it routes a
//! request to a handler, resolves the handler's declared parameters through
//! dependency injection, turns the return value into a response and runs a
//! specificity-ordered error-handler chain on any failure.
//!
//! It does not own sockets. A transport adapter builds a [`Request`], calls
//! [`App::serve`] and writes back the parts of the returned [`Response`].
//!
//! ## Architecture
//!
//! - **[`coerce`]** - Declared parameter types and string-to-value coercion
//! - **[`router`]** - Path templates compiled to anchored regexes, first match wins
//! - **[`server`]** - Request and response model
//! - **[`dependency`]** - Two-phase dependency injection and built-in dependencies
//! - **[`app`]** - Dispatch, sub-application mounting and the error-handler chain
//! - **[`error`]** - Error kinds, the request [`Error`] and registration [`RouteError`]
//! - **[`logging`]** - `tracing-subscriber` setup
//! - **[`runtime_config`]** - Environment-based configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use cuproute::dependency::builtin;
//! use cuproute::prelude::*;
//!
//! let mut app = App::new();
//! app.get(
//!     "/items/{id}",
//!     Handler::new(|args| {
//!         let id: i64 = args.param("id")?;
//!         let verbose: ParamValue = args.take("verbose")?;
//!         Ok(serde_json::json!({ "id": id, "verbose": verbose.as_bool() }))
//!     })
//!     .param("id", FieldType::Integer)
//!     .inject_as("verbose", FieldType::optional(FieldType::Boolean), builtin::query()),
//! )?;
//!
//! let response = app.serve(Request::from_target("GET", "/items/3?verbose=true"));
//! assert_eq!(response.status(), 200);
//! assert_eq!(response.body(), r#"{"id":3,"verbose":true}"#);
//!
//! let missing = app.serve(Request::new("GET", "/items/three"));
//! assert_eq!(missing.status(), 404);
//! # Ok::<(), cuproute::RouteError>(())
//! ```

pub mod app;
pub mod coerce;
pub mod dependency;
pub mod error;
mod handler;
pub mod logging;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use app::{html, App, Blueprint, Mountable};
pub use error::{Error, ErrorKind, RouteError};
pub use handler::Handler;
pub use server::{Reply, Request, Response};

/// The names most applications need.
pub mod prelude {
    pub use crate::app::{html, App, Blueprint, Mountable};
    pub use crate::coerce::{FieldType, ParamValue};
    pub use crate::dependency::{Args, Dependency, Resolved, Signature};
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::handler::Handler;
    pub use crate::server::{Reply, Request, Response};
}
