//! # Error Module
//!
//! Every failure that can surface while serving a request is an [`Error`]. Each
//! variant maps onto an [`ErrorKind`], and kinds form an explicit parent chain that
//! the application's error-handler chain uses to pick the most specific handler.
//!
//! ## Kind hierarchy
//!
//! ```text
//! EXCEPTION
//! └── HTTP
//!     ├── NOT_FOUND
//!     ├── METHOD_NOT_ALLOWED
//!     ├── REDIRECT
//!     └── BAD_REQUEST
//!         ├── QUERY_PARAM_MISSING
//!         └── PAYLOAD
//! ```
//!
//! Applications declare their own kinds as statics hanging off any built-in kind:
//!
//! ```rust
//! use cuproute::error::{ErrorKind, EXCEPTION};
//!
//! static KEY_ERROR: ErrorKind = ErrorKind::new("key_error", &EXCEPTION);
//! assert!(KEY_ERROR.is_a(&EXCEPTION));
//! assert_eq!(KEY_ERROR.depth(), 2);
//! ```

use serde_json::{json, Value};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A node in the error-kind hierarchy.
///
/// Kinds compare by identity, so declare them as `static` items; a `const` kind
/// would be a different kind at every use. Names are only used for display.
#[derive(Debug)]
pub struct ErrorKind {
    name: &'static str,
    parent: Option<&'static ErrorKind>,
}

impl ErrorKind {
    /// Declare a root kind with no parent.
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Declare a kind that specializes `parent`.
    pub const fn new(name: &'static str, parent: &'static ErrorKind) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<&'static ErrorKind> {
        self.parent
    }

    /// Length of the ancestor chain, this kind included.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.parent;
        while let Some(kind) = current {
            depth += 1;
            current = kind.parent;
        }
        depth
    }

    /// Whether this kind is `other` or descends from it.
    #[must_use]
    pub fn is_a(&self, other: &ErrorKind) -> bool {
        if self == other {
            return true;
        }
        let mut current = self.parent;
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent;
        }
        false
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for ErrorKind {}

impl Hash for ErrorKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self, state);
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Catch-all root of the hierarchy.
pub static EXCEPTION: ErrorKind = ErrorKind::root("exception");
/// Conditions that carry an HTTP status.
pub static HTTP: ErrorKind = ErrorKind::new("http", &EXCEPTION);
pub static NOT_FOUND: ErrorKind = ErrorKind::new("not_found", &HTTP);
pub static METHOD_NOT_ALLOWED: ErrorKind = ErrorKind::new("method_not_allowed", &HTTP);
pub static BAD_REQUEST: ErrorKind = ErrorKind::new("bad_request", &HTTP);
pub static QUERY_PARAM_MISSING: ErrorKind = ErrorKind::new("query_param_missing", &BAD_REQUEST);
pub static PAYLOAD: ErrorKind = ErrorKind::new("payload", &BAD_REQUEST);
pub static REDIRECT: ErrorKind = ErrorKind::new("redirect", &HTTP);

/// Default status used by [`Error::redirect`].
pub const DEFAULT_REDIRECT_STATUS: u16 = 307;

/// Failure raised while routing, resolving dependencies, or running a handler.
#[derive(Debug)]
pub enum Error {
    /// No route pattern matched the request path.
    NotFound,
    /// A route pattern matched, but not for this method.
    MethodNotAllowed { method: String, path: String },
    /// Malformed request input.
    BadRequest { message: String },
    /// A required query parameter was absent.
    QueryParamMissing { field: String },
    /// The body loader rejected the request body.
    Payload,
    /// Not a failure: send the client elsewhere.
    Redirect { to: String, status: u16 },
    /// Any other HTTP condition with an explicit status.
    Http { status: u16, message: String },
    /// A handler produced a value the response cannot materialize.
    UnsupportedReturnType { found: &'static str },
    /// A handler asked for a binding that was never supplied or has another type.
    Binding { name: String, reason: &'static str },
    /// Anything else, tagged with an application-declared kind.
    ///
    /// `status` is set for kinds declared under [`HTTP`]; others respond with 500.
    Other {
        kind: &'static ErrorKind,
        status: Option<u16>,
        source: anyhow::Error,
    },
}

impl Error {
    /// Redirect with the default 307 status.
    pub fn redirect(to: impl Into<String>) -> Self {
        Error::Redirect {
            to: to.into(),
            status: DEFAULT_REDIRECT_STATUS,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Error::Http {
            status,
            message: message.into(),
        }
    }

    /// Wrap an arbitrary failure under an application-declared kind.
    pub fn custom(kind: &'static ErrorKind, source: impl Into<anyhow::Error>) -> Self {
        Error::Other {
            kind,
            status: None,
            source: source.into(),
        }
    }

    /// An application-declared HTTP condition with its own status.
    ///
    /// ```rust
    /// use cuproute::error::{Error, ErrorKind, HTTP};
    ///
    /// static TEAPOT: ErrorKind = ErrorKind::new("teapot", &HTTP);
    ///
    /// let err = Error::custom_http(&TEAPOT, 418, "short and stout");
    /// assert_eq!(err.status_code(), 418);
    /// assert!(err.is_http());
    /// ```
    pub fn custom_http(kind: &'static ErrorKind, status: u16, message: impl Into<String>) -> Self {
        Error::Other {
            kind,
            status: Some(status),
            source: anyhow::Error::msg(message.into()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static ErrorKind {
        match self {
            Error::NotFound => &NOT_FOUND,
            Error::MethodNotAllowed { .. } => &METHOD_NOT_ALLOWED,
            Error::BadRequest { .. } => &BAD_REQUEST,
            Error::QueryParamMissing { .. } => &QUERY_PARAM_MISSING,
            Error::Payload => &PAYLOAD,
            Error::Redirect { .. } => &REDIRECT,
            Error::Http { .. } => &HTTP,
            Error::UnsupportedReturnType { .. } | Error::Binding { .. } => &EXCEPTION,
            Error::Other { kind, .. } => kind,
        }
    }

    /// Whether this is an expected HTTP condition rather than a programming error.
    #[must_use]
    pub fn is_http(&self) -> bool {
        self.kind().is_a(&HTTP)
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound => 404,
            Error::MethodNotAllowed { .. } => 405,
            Error::BadRequest { .. } | Error::QueryParamMissing { .. } | Error::Payload => 400,
            Error::Redirect { status, .. } | Error::Http { status, .. } => *status,
            Error::Other {
                status: Some(status),
                ..
            } => *status,
            _ => 500,
        }
    }

    /// Condition-specific payload rendered under `detail` by the default HTTP handler.
    #[must_use]
    pub fn details(&self) -> Value {
        match self {
            Error::NotFound => json!({ "msg": "Page not found" }),
            Error::MethodNotAllowed { .. } => json!({ "msg": "Method Not Allowed" }),
            Error::QueryParamMissing { field } => json!({
                "msg": "Required fields missing from request",
                "fields": [field],
            }),
            Error::Payload => json!({ "msg": "Failed to load payload" }),
            Error::Redirect { .. } => json!({ "msg": "Redirect" }),
            Error::BadRequest { message } | Error::Http { message, .. } => json!({ "msg": message }),
            other => json!({ "msg": other.to_string() }),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound => write!(f, "Page not found"),
            Error::MethodNotAllowed { method, path } => {
                write!(f, "Method '{method}' not allowed for path '{path}'")
            }
            Error::BadRequest { message } => write!(f, "{message}"),
            Error::QueryParamMissing { field } => {
                write!(f, "Query parameter '{field}' is mandatory")
            }
            Error::Payload => write!(f, "Failed to load payload"),
            Error::Redirect { to, status } => write!(f, "Redirect ({status}) to '{to}'"),
            Error::Http { status, message } => write!(f, "HTTP {status}: {message}"),
            Error::UnsupportedReturnType { found } => {
                write!(f, "Unsupported return type {found}")
            }
            Error::Binding { name, reason } => write!(f, "Binding '{name}' {reason}"),
            Error::Other { source, .. } => write!(f, "{source}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Other { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(source: anyhow::Error) -> Self {
        Error::Other {
            kind: &EXCEPTION,
            status: None,
            source,
        }
    }
}

/// Result alias used by handlers, dependencies and dispatch.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Registration-time failure while building the route table.
#[derive(Debug)]
pub enum RouteError {
    /// Path templates must start with `/`.
    InvalidPath { path: String },
    /// Prefixes must be empty or start with `/`, and can not be `/` itself.
    InvalidPrefix { prefix: String },
    /// The same placeholder appears twice in one template.
    DuplicateParam { name: String },
    /// A placeholder has no matching handler parameter.
    MissingParam { name: String },
    /// A placeholder's declared type has no path pattern.
    UnsupportedType { name: String, ty: String },
    /// An any-method handler already owns this path.
    AnyMethodExists { path: String },
    /// The method is already bound for this path.
    MethodExists { method: String, path: String },
    /// Method-specific handlers already own this path.
    MethodsExist { methods: Vec<String>, path: String },
    /// The compiled pattern was rejected by the regex engine.
    Pattern(regex::Error),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::InvalidPath { path } => {
                write!(f, "Path '{path}' should start with /")
            }
            RouteError::InvalidPrefix { prefix } => write!(
                f,
                "Prefix '{prefix}' is invalid: it should start with / and can not be /"
            ),
            RouteError::DuplicateParam { name } => {
                write!(f, "Duplicate path parameter {name}")
            }
            RouteError::MissingParam { name } => write!(
                f,
                "Route parameter {name} missing from the handler parameters"
            ),
            RouteError::UnsupportedType { name, ty } => {
                write!(f, "Unsupported parameter type {ty} for path parameter {name}")
            }
            RouteError::AnyMethodExists { path } => {
                write!(f, "Route for any method on path '{path}' already exists")
            }
            RouteError::MethodExists { method, path } => write!(
                f,
                "Route for method '{method}' on path '{path}' already exists"
            ),
            RouteError::MethodsExist { methods, path } => write!(
                f,
                "Routes for methods ({}) on path '{path}' already exist",
                methods.join(", ")
            ),
            RouteError::Pattern(err) => write!(f, "Invalid route pattern: {err}"),
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouteError::Pattern(err) => Some(err),
            _ => None,
        }
    }
}

impl From<regex::Error> for RouteError {
    fn from(err: regex::Error) -> Self {
        RouteError::Pattern(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static KEY_ERROR: ErrorKind = ErrorKind::new("key_error", &EXCEPTION);

    #[test]
    fn test_kind_depth() {
        assert_eq!(EXCEPTION.depth(), 1);
        assert_eq!(HTTP.depth(), 2);
        assert_eq!(QUERY_PARAM_MISSING.depth(), 4);
        assert_eq!(KEY_ERROR.depth(), 2);
    }

    #[test]
    fn test_kinds_compare_by_identity() {
        static FIRST: ErrorKind = ErrorKind::new("duplicate", &EXCEPTION);
        static SECOND: ErrorKind = ErrorKind::new("duplicate", &HTTP);

        assert_eq!(&FIRST, &FIRST);
        assert_ne!(&FIRST, &SECOND);
        assert!(!SECOND.is_a(&FIRST));
    }

    #[test]
    fn test_kind_ancestry() {
        assert!(PAYLOAD.is_a(&BAD_REQUEST));
        assert!(PAYLOAD.is_a(&HTTP));
        assert!(PAYLOAD.is_a(&EXCEPTION));
        assert!(!PAYLOAD.is_a(&NOT_FOUND));
        assert!(!HTTP.is_a(&PAYLOAD));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::NotFound.status_code(), 404);
        assert_eq!(Error::Payload.status_code(), 400);
        assert_eq!(Error::redirect("/x").status_code(), 307);
        assert_eq!(Error::from(anyhow::anyhow!("boom")).status_code(), 500);
    }

    #[test]
    fn test_custom_http_status() {
        static TEAPOT: ErrorKind = ErrorKind::new("teapot", &HTTP);

        let err = Error::custom_http(&TEAPOT, 418, "short and stout");
        assert_eq!(err.status_code(), 418);
        assert_eq!(err.kind(), &TEAPOT);
        assert_eq!(err.details(), json!({"msg": "short and stout"}));
        assert_eq!(Error::custom(&TEAPOT, anyhow::anyhow!("tea")).status_code(), 500);
    }

    #[test]
    fn test_http_classification() {
        assert!(Error::NotFound.is_http());
        assert!(Error::redirect("/").is_http());
        assert!(!Error::custom(&KEY_ERROR, anyhow::anyhow!("k")).is_http());
        assert!(!Error::UnsupportedReturnType { found: "number" }.is_http());
    }

    #[test]
    fn test_query_param_missing_details() {
        let err = Error::QueryParamMissing {
            field: "page".to_string(),
        };
        assert_eq!(
            err.details(),
            json!({"msg": "Required fields missing from request", "fields": ["page"]})
        );
        assert!(err.to_string().contains("'page' is mandatory"));
    }

    #[test]
    fn test_route_error_messages() {
        let err = RouteError::MethodsExist {
            methods: vec!["GET".into(), "POST".into()],
            path: "/".into(),
        };
        assert_eq!(
            err.to_string(),
            "Routes for methods (GET, POST) on path '/' already exist"
        );
    }
}
