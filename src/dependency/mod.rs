//! # Dependency Module
//!
//! Two-phase dependency injection for handlers.
//!
//! ## Overview
//!
//! Handlers and dependencies declare their parameters explicitly through the
//! [`Signature`] builder methods. Each parameter is one of:
//!
//! - **plain** – supplied by the caller (path parameters, the error passed to an
//!   error handler);
//! - **injected** – filled by a [`Dependency`] before the call;
//! - **context** – bound to the current [`InjectContext`].
//!
//! A dependency is a provider closure with its own parameters. Resolving it runs
//! the provider, which returns a [`Resolved`] value and optionally a cleanup
//! closure. Cleanups run after the handler returns, in the order their
//! dependencies were entered.
//!
//! ## Example
//!
//! ```rust
//! use cuproute::dependency::{builtin, Dependency, Resolved, Signature};
//! use cuproute::{Handler, Reply};
//!
//! let greeting = Dependency::new(|args| {
//!     let ctx = args.context("ctx")?;
//!     let name = ctx.param_name.clone().unwrap_or_default();
//!     Ok(Resolved::new(format!("Hello from '{name}'")))
//! })
//! .context("ctx");
//!
//! let handler = Handler::new(|args| {
//!     let greet: String = args.take("greet")?;
//!     Ok(Reply::Json(serde_json::json!({ "message": greet })))
//! })
//! .inject("greet", greeting)
//! .inject("request", builtin::request());
//! # let _ = handler;
//! ```

pub mod builtin;
mod core;

pub use core::{
    invoke, Args, Cleanup, Dependency, InjectContext, Param, ParamSource, Resolved, Signature,
};
