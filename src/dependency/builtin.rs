//! Dependencies every application gets for free.

use super::core::{Dependency, Resolved, Signature};
use crate::coerce::{coerce, FieldType, ParamValue, RawValue};
use crate::error::Error;
use crate::server::{Request, SharedResponse};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::rc::Rc;
use tracing::debug;

/// The current request.
#[must_use]
pub fn request() -> Dependency {
    Dependency::new(|args| {
        let ctx = args.context("context")?;
        Ok(Resolved::new(Rc::clone(&ctx.request)))
    })
    .context("context")
}

/// The response being built for the current request.
#[must_use]
pub fn response() -> Dependency {
    Dependency::new(|args| {
        let ctx = args.context("context")?;
        Ok(Resolved::new(Rc::clone(&ctx.response)))
    })
    .context("context")
}

/// Setter for the response status, injected by [`status_code`].
pub struct StatusCode {
    response: SharedResponse,
}

impl StatusCode {
    pub fn set(&self, status: u16) {
        self.response.borrow_mut().set_status(status);
    }

    #[must_use]
    pub fn get(&self) -> u16 {
        self.response.borrow().status()
    }
}

/// A [`StatusCode`] setter; `default` is applied to the response on resolution.
#[must_use]
pub fn status_code(default: Option<u16>) -> Dependency {
    Dependency::new(move |args| {
        let response: SharedResponse = args.take("response")?;
        if let Some(status) = default {
            response.borrow_mut().set_status(status);
        }
        Ok(Resolved::new(StatusCode { response }))
    })
    .inject("response", response())
}

/// Read request cookies and queue response cookies.
pub struct Cookies {
    request: Rc<Request>,
    response: SharedResponse,
}

impl Cookies {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.request.get_cookie(name).map(str::to_string)
    }

    /// Queue a cookie with path `/`.
    pub fn set(&self, name: &str, value: impl Into<String>) {
        self.set_with(name, value, "/", None, None);
    }

    pub fn set_with(
        &self,
        name: &str,
        value: impl Into<String>,
        path: &str,
        max_age: Option<i64>,
        http_only: Option<bool>,
    ) {
        self.response
            .borrow_mut()
            .set_cookie(name, value, Some(path), max_age, http_only);
    }
}

/// A [`Cookies`] accessor bound to the current request and response.
#[must_use]
pub fn cookies() -> Dependency {
    Dependency::new(|args| {
        let request: Rc<Request> = args.take("request")?;
        let response: SharedResponse = args.take("response")?;
        Ok(Resolved::new(Cookies { request, response }))
    })
    .inject("request", request())
    .inject("response", response())
}

/// Query-string parameter lookup.
///
/// The value is looked up under the explicit name, or else the name of the
/// parameter it is injected into, and coerced to that parameter's declared type
/// (text when undeclared). The resolved value is a [`ParamValue`].
#[derive(Debug, Clone, Default)]
pub struct Query {
    name: Option<String>,
    default: Option<ParamValue>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    /// Look up `name` instead of the parameter name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Value used verbatim when the parameter is absent.
    #[must_use]
    pub fn default(mut self, value: impl Into<ParamValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn into_dependency(self) -> Dependency {
        let Query { name, default } = self;
        Dependency::new(move |args| {
            let ctx = args.context("context")?;
            let field = name
                .clone()
                .or_else(|| ctx.param_name.clone())
                .ok_or_else(|| Error::Binding {
                    name: "query".to_string(),
                    reason: "has no parameter name to look up",
                })?;

            let Some(values) = ctx.request.query_values(&field) else {
                if let Some(default) = &default {
                    return Ok(Resolved::new(default.clone()));
                }
                if ctx.param_type.as_ref().is_some_and(FieldType::is_optional) {
                    return Ok(Resolved::new(ParamValue::Null));
                }
                return Err(Error::QueryParamMissing { field });
            };

            let ty = ctx.param_type.clone().unwrap_or(FieldType::Text);
            match coerce(&ty, RawValue::Many(values)) {
                Ok(value) => Ok(Resolved::new(value)),
                Err(err) => {
                    debug!(field = %field, error = %err, "Query parameter conversion failed");
                    Err(Error::bad_request(format!(
                        "Failed to convert parameter {field}"
                    )))
                }
            }
        })
        .context("context")
    }
}

impl From<Query> for Dependency {
    fn from(query: Query) -> Self {
        query.into_dependency()
    }
}

/// Query parameter named after the parameter it is injected into.
#[must_use]
pub fn query() -> Dependency {
    Query::new().into_dependency()
}

/// Query parameter looked up under an explicit name.
#[must_use]
pub fn query_named(name: &str) -> Dependency {
    Query::new().name(name).into_dependency()
}

/// Apply `loader` to the raw request body and the declared parameter type.
///
/// Any loader failure becomes [`Error::Payload`].
pub fn body_with<T, F>(loader: F) -> Dependency
where
    T: Any,
    F: Fn(&str, Option<&FieldType>) -> anyhow::Result<T> + Send + Sync + 'static,
{
    Dependency::new(move |args| {
        let request: Rc<Request> = args.take("request")?;
        let ctx = args.context("context")?;
        match loader(request.body(), ctx.param_type.as_ref()) {
            Ok(value) => Ok(Resolved::new(value)),
            Err(err) => {
                debug!(error = %err, "Body loader failed");
                Err(Error::Payload)
            }
        }
    })
    .context("context")
    .inject("request", request())
}

/// The raw body as a `String`.
#[must_use]
pub fn body() -> Dependency {
    body_with(|body, _| Ok(body.to_string()))
}

/// The body parsed as a `serde_json::Value`.
#[must_use]
pub fn json_body() -> Dependency {
    body_with(|body, _| Ok(serde_json::from_str::<Value>(body)?))
}

/// The body deserialized into `T`.
#[must_use]
pub fn json_as<T>() -> Dependency
where
    T: DeserializeOwned + 'static,
{
    body_with(|body, _| Ok(serde_json::from_str::<T>(body)?))
}
