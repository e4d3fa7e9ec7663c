use super::request::HeaderVec;
use crate::error::Error;
use http::header::{CONTENT_TYPE, SET_COOKIE};
use http::StatusCode;
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Response shared between a handler and its dependencies for one request.
pub type SharedResponse = Rc<RefCell<Response>>;

/// Raw value returned by a handler, materialized by [`Response::finalize`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Reply {
    /// Nothing to materialize; the handler populated the response itself.
    #[default]
    Empty,
    Text(String),
    Html(String),
    Json(Value),
}

impl From<&str> for Reply {
    fn from(value: &str) -> Self {
        Reply::Text(value.to_string())
    }
}

impl From<String> for Reply {
    fn from(value: String) -> Self {
        Reply::Text(value)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Json(value)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Empty
    }
}

/// A cookie waiting to be written as a `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub max_age: Option<i64>,
    pub http_only: Option<bool>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            max_age: None,
            http_only: None,
        }
    }
}

/// Renders `name=value` followed by `HttpOnly`, `Max-Age` and `Path`, in that order.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, quote_cookie_value(&self.value))?;
        if self.http_only == Some(true) {
            f.write_str("; HttpOnly")?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={max_age}")?;
        }
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        Ok(())
    }
}

fn is_legal_cookie_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~:".contains(c)
}

fn quote_cookie_value(value: &str) -> String {
    if value.chars().all(is_legal_cookie_char) {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Outgoing response, built up while one request is handled.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HeaderVec,
    cookies: Vec<Cookie>,
    body: String,
    raw: Reply,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(200)
    }
}

impl Response {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            cookies: Vec::new(),
            body: String::new(),
            raw: Reply::Empty,
        }
    }

    /// Wrap in the shared handle passed through dependency resolution.
    #[must_use]
    pub fn shared(self) -> SharedResponse {
        Rc::new(RefCell::new(self))
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Status code and canonical reason phrase, e.g. `404 Not Found`.
    #[must_use]
    pub fn status_line(&self) -> String {
        let reason = StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        format!("{} {}", self.status, reason)
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    #[must_use]
    pub fn raw(&self) -> &Reply {
        &self.raw
    }

    pub fn set_raw(&mut self, raw: Reply) {
        self.raw = raw;
    }

    /// Replace every value of a header.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.into()));
    }

    /// Replace every value of a header with `values`.
    pub fn set_header_values<I, V>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        let name: Arc<str> = Arc::from(name.to_ascii_lowercase());
        for value in values {
            self.headers.push((Arc::clone(&name), value.into()));
        }
    }

    /// Append a value, keeping existing ones (e.g. repeated `Set-Cookie`).
    pub fn add_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.into()));
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[must_use]
    pub fn get_single_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterate `(name, value)` pairs; a multi-valued header yields several pairs.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    /// Queue a cookie. Setting a name twice updates the value and any given attribute.
    pub fn set_cookie(
        &mut self,
        name: &str,
        value: impl Into<String>,
        path: Option<&str>,
        max_age: Option<i64>,
        http_only: Option<bool>,
    ) {
        let index = match self.cookies.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.cookies.push(Cookie::new(name, ""));
                self.cookies.len() - 1
            }
        };
        let cookie = &mut self.cookies[index];
        cookie.value = value.into();
        if let Some(path) = path {
            cookie.path = Some(path.to_string());
        }
        if max_age.is_some() {
            cookie.max_age = max_age;
        }
        if http_only.is_some() {
            cookie.http_only = http_only;
        }
    }

    #[must_use]
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Materialize the raw value into the body, then emit pending cookies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedReturnType`] for a JSON value that is neither an
    /// object nor an array.
    pub fn finalize(&mut self) -> Result<(), Error> {
        self.apply_raw()?;
        self.apply_cookies();
        Ok(())
    }

    fn apply_raw(&mut self) -> Result<(), Error> {
        let (body, content_type) = match &self.raw {
            Reply::Empty => return Ok(()),
            Reply::Text(text) => (text.clone(), "text/plain"),
            Reply::Html(html) => (html.clone(), "text/html"),
            Reply::Json(value @ (Value::Object(_) | Value::Array(_))) => {
                (value.to_string(), "application/json")
            }
            Reply::Json(other) => {
                return Err(Error::UnsupportedReturnType {
                    found: json_type_name(other),
                })
            }
        };
        self.body = body;
        self.set_header(CONTENT_TYPE.as_str(), content_type);
        Ok(())
    }

    fn apply_cookies(&mut self) {
        let rendered: Vec<String> = self.cookies.iter().map(Cookie::to_string).collect();
        for cookie in rendered {
            self.add_header(SET_COOKIE.as_str(), cookie);
        }
    }

    /// Split into status, header pairs and body for a transport adapter.
    #[must_use]
    pub fn into_parts(self) -> (u16, Vec<(String, String)>, String) {
        let headers = self
            .headers
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        (self.status, headers, self.body)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "json string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
