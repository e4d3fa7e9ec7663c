//! # Router Module
//!
//! Path matching and route resolution.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling path templates such as `/pets/{id}` into anchored regexes
//! - Binding handlers to compiled patterns per method, or for any method
//! - Rejecting conflicting registrations up front
//! - Matching incoming requests and coercing path parameters to declared types
//! - Merging other routers under a prefix
//!
//! ## Matching
//!
//! Entries are kept in registration order and the first entry whose pattern
//! matches the path wins, whatever the method. A route registered for `/{page}`
//! therefore shadows a later `/about`.
//!
//! ## Example
//!
//! ```rust
//! use cuproute::coerce::FieldType;
//! use cuproute::dependency::Signature;
//! use cuproute::router::{MethodFilter, Router};
//! use cuproute::Handler;
//!
//! let mut router = Router::new();
//! let handler = Handler::new(|args| {
//!     let id: i64 = args.param("id")?;
//!     Ok(format!("pet {id}"))
//! })
//! .param("id", FieldType::Integer);
//!
//! router
//!     .add_route(&[MethodFilter::method("GET")], "/pets/{id}", handler)
//!     .unwrap();
//!
//! let matched = router.handle_route("get", "/pets/7").unwrap();
//! assert_eq!(matched.path_params["id"].as_i64(), Some(7));
//! assert!(router.handle_route("GET", "/pets/seven").is_err());
//! ```

mod core;

pub use core::{MethodFilter, RouteEntry, RouteMatch, Router};
