use smallvec::SmallVec;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage shared by [`Request`] and [`super::Response`].
///
/// Names are stored lower-cased as `Arc<str>`; a name may repeat.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Inbound request as seen by routing and dependency resolution.
///
/// Built by a transport adapter, then treated as immutable. Header names are
/// lower-cased on the way in and cookies are parsed as soon as the `cookie`
/// header is supplied.
pub struct Request {
    method: String,
    path: String,
    query: HashMap<String, Vec<String>>,
    headers: HeaderVec,
    cookies: HashMap<String, String>,
    body: String,
    raw: Option<Box<dyn Any>>,
}

impl Request {
    /// Create a request with no query, headers or body.
    ///
    /// The method is upper-cased.
    pub fn new(method: &str, path: impl Into<String>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.into(),
            query: HashMap::new(),
            headers: HeaderVec::new(),
            cookies: HashMap::new(),
            body: String::new(),
            raw: None,
        }
    }

    /// Create a request from a request target such as `/users?limit=10`.
    ///
    /// Everything after the first `?` is parsed as a form-urlencoded query.
    pub fn from_target(method: &str, target: &str) -> Self {
        match target.split_once('?') {
            Some((path, qs)) => Self::new(method, path).with_query(parse_query(qs)),
            None => Self::new(method, target),
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: HashMap<String, Vec<String>>) -> Self {
        self.query = query;
        self
    }

    /// Append one value to a query parameter.
    #[must_use]
    pub fn with_query_value(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query
            .entry(name.to_string())
            .or_default()
            .push(value.into());
        self
    }

    /// Set a header, replacing any previous value under the same name.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        if name == http::header::COOKIE.as_str() {
            self.cookies = parse_cookies(&value);
            debug!(
                cookie_count = self.cookies.len(),
                cookie_names = ?self.cookies.keys().collect::<Vec<_>>(),
                "Cookies extracted"
            );
        }
        self.headers.retain(|(k, _)| k.as_ref() != name);
        self.headers.push((Arc::from(name), value));
        self
    }

    #[must_use]
    pub fn with_headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        headers
            .into_iter()
            .fold(self, |req, (k, v)| req.with_header(k.as_ref(), v))
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Attach the transport-native object this request was built from.
    #[must_use]
    pub fn with_raw<T: Any>(mut self, raw: T) -> Self {
        self.raw = Some(Box::new(raw));
        self
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> &HashMap<String, Vec<String>> {
        &self.query
    }

    #[must_use]
    pub fn query_values(&self, name: &str) -> Option<&[String]> {
        self.query.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The transport-native object, if it has type `T`.
    #[must_use]
    pub fn raw<T: Any>(&self) -> Option<&T> {
        self.raw.as_ref().and_then(|raw| raw.downcast_ref::<T>())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn get_header_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get_header(name).unwrap_or(default)
    }

    /// Iterate `(name, value)` pairs; names are lower-case.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    #[inline]
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("body_len", &self.body.len())
            .field("has_raw", &self.raw.is_some())
            .finish()
    }
}

/// Parse a `Cookie` header value into name/value pairs.
///
/// Surrounding double quotes are stripped from values.
#[must_use]
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Parse a form-urlencoded query string.
///
/// Repeated names accumulate, so every value is a sequence.
#[must_use]
pub fn parse_query(qs: &str) -> HashMap<String, Vec<String>> {
    let mut query: HashMap<String, Vec<String>> = HashMap::new();
    for (k, v) in url::form_urlencoded::parse(qs.as_bytes()) {
        query.entry(k.into_owned()).or_default().push(v.into_owned());
    }
    query
}
