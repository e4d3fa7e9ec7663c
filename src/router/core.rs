//! Route table and path matcher.
//!
//! Path templates such as `/users/{id}/posts` are compiled into anchored regexes at
//! registration time. Each compiled pattern owns a [`RouteEntry`] holding the
//! handlers bound to it per method. Matching scans entries in registration order and
//! the first entry whose pattern matches the path decides the outcome.

use crate::coerce::{coerce, FieldType, ParamValue, RawValue};
use crate::dependency::Signature;
use crate::error::{Error, RouteError};
use crate::handler::Handler;
use anyhow::anyhow;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// Which request methods a handler is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodFilter {
    /// Every method. Excludes any method-specific binding on the same path.
    Any,
    /// One upper-cased method name.
    Method(String),
}

impl MethodFilter {
    #[must_use]
    pub fn method(method: &str) -> Self {
        MethodFilter::Method(method.to_ascii_uppercase())
    }
}

impl fmt::Display for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodFilter::Any => f.write_str("*"),
            MethodFilter::Method(method) => f.write_str(method),
        }
    }
}

impl From<&str> for MethodFilter {
    fn from(method: &str) -> Self {
        MethodFilter::method(method)
    }
}

impl From<http::Method> for MethodFilter {
    fn from(method: http::Method) -> Self {
        MethodFilter::method(method.as_str())
    }
}

/// Result of matching a request to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub handler: Handler,
    /// Path parameters coerced to the handler's declared types.
    pub path_params: HashMap<String, ParamValue>,
    /// The template the handler was registered with.
    pub path: String,
}

/// A path template compiled against a handler's declared parameters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CompiledPath {
    /// Pattern with anonymous groups; two templates that differ only in
    /// placeholder names share this key.
    pub key: String,
    /// Pattern with named groups, used to extract values.
    pub pattern: String,
    pub attrs: Vec<(String, FieldType)>,
}

#[derive(Debug, Clone)]
struct MethodBinding {
    method: MethodFilter,
    handler: Handler,
    path: String,
    pattern: String,
    regex: Regex,
    attrs: Vec<(String, FieldType)>,
}

impl MethodBinding {
    fn with_prefix(&self, prefix: &str) -> Result<Self, RouteError> {
        let pattern = format!("{prefix}{}", self.pattern);
        Ok(Self {
            method: self.method.clone(),
            handler: self.handler.clone(),
            path: self.path.clone(),
            regex: anchored(&pattern)?,
            pattern,
            attrs: self.attrs.clone(),
        })
    }

    fn extract(&self, path: &str) -> Result<HashMap<String, ParamValue>, Error> {
        let captures = self.regex.captures(path).ok_or_else(|| {
            anyhow!(
                "Handler pattern '{}' does not match path '{path}'",
                self.pattern
            )
        })?;

        let mut values = HashMap::with_capacity(self.attrs.len());
        for (name, ty) in &self.attrs {
            let raw = captures.name(name).map_or("", |m| m.as_str());
            // The pattern admits integers wider than i64; such a path has no route.
            let Ok(value) = coerce(ty, RawValue::Single(raw)) else {
                debug!(
                    path = %path,
                    param = %name,
                    value = %raw,
                    "Path parameter out of range for its type"
                );
                return Err(Error::NotFound);
            };
            values.insert(name.clone(), value);
        }
        Ok(values)
    }
}

/// All handlers bound to one compiled path pattern.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    key: String,
    regex: Regex,
    bindings: Vec<MethodBinding>,
}

impl RouteEntry {
    fn new(key: String) -> Result<Self, RouteError> {
        Ok(Self {
            regex: anchored(&key)?,
            key,
            bindings: Vec::new(),
        })
    }

    /// The compiled pattern, without anchors.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn methods(&self) -> Vec<MethodFilter> {
        self.bindings.iter().map(|b| b.method.clone()).collect()
    }

    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    fn add(&mut self, binding: MethodBinding) -> Result<(), RouteError> {
        if self.bindings.iter().any(|b| b.method == MethodFilter::Any) {
            return Err(RouteError::AnyMethodExists { path: binding.path });
        }
        if self.bindings.iter().any(|b| b.method == binding.method) {
            return Err(RouteError::MethodExists {
                method: binding.method.to_string(),
                path: binding.path,
            });
        }
        if binding.method == MethodFilter::Any && !self.bindings.is_empty() {
            return Err(RouteError::MethodsExist {
                methods: self.bindings.iter().map(|b| b.method.to_string()).collect(),
                path: binding.path,
            });
        }
        self.bindings.push(binding);
        Ok(())
    }

    fn binding_for(&self, method: &str) -> Option<&MethodBinding> {
        self.bindings
            .iter()
            .find(|b| b.method == MethodFilter::Any)
            .or_else(|| {
                self.bindings
                    .iter()
                    .find(|b| matches!(&b.method, MethodFilter::Method(m) if m == method))
            })
    }
}

/// Ordered route table.
#[derive(Debug, Clone, Default)]
pub struct Router {
    prefix: String,
    routes: Vec<RouteEntry>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A router whose every route is registered under `prefix`.
    pub fn with_prefix(prefix: &str) -> Result<Self, RouteError> {
        validate_prefix(prefix)?;
        Ok(Self {
            prefix: prefix.to_string(),
            routes: Vec::new(),
        })
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Bind `handler` to `path` for each of `methods`.
    ///
    /// Placeholders (`{name}`) take the handler's declared type for that
    /// parameter, or text when it has none.
    pub fn add_route(
        &mut self,
        methods: &[MethodFilter],
        path: &str,
        handler: Handler,
    ) -> Result<(), RouteError> {
        let compiled = Self::path_to_regex(path, &handler)?;
        let prefix = regex::escape(&self.prefix);
        let key = format!("{prefix}{}", compiled.key);
        let pattern = format!("{prefix}{}", compiled.pattern);
        let regex = anchored(&pattern)?;

        for method in methods {
            self.add_binding(
                &key,
                MethodBinding {
                    method: method.clone(),
                    handler: handler.clone(),
                    path: path.to_string(),
                    pattern: pattern.clone(),
                    regex: regex.clone(),
                    attrs: compiled.attrs.clone(),
                },
            )?;
            info!(
                method = %method,
                path = %path,
                pattern = %key,
                handler_name = %handler.name(),
                "Route registered"
            );
        }
        Ok(())
    }

    /// Merge every route of `other` under `prefix`.
    ///
    /// This router's own prefix is prepended as well, on top of the prefix
    /// `other` was built with.
    pub fn include(&mut self, other: &Router, prefix: &str) -> Result<(), RouteError> {
        validate_prefix(prefix)?;
        let prefix = regex::escape(&format!("{}{prefix}", self.prefix));

        for entry in &other.routes {
            let key = format!("{prefix}{}", entry.key);
            for binding in &entry.bindings {
                self.add_binding(&key, binding.with_prefix(&prefix)?)?;
            }
        }

        info!(
            prefix = %prefix,
            routes_count = other.routes.len(),
            "Router included"
        );
        Ok(())
    }

    /// Find the handler for `method` and `path`.
    ///
    /// The first entry whose pattern matches decides: a path match with no
    /// binding for the method is [`Error::MethodNotAllowed`], even when a later
    /// entry would have accepted it.
    pub fn handle_route(&self, method: &str, path: &str) -> Result<RouteMatch, Error> {
        let method = method.to_ascii_uppercase();

        let Some(entry) = self.routes.iter().find(|entry| entry.is_match(path)) else {
            debug!(method = %method, path = %path, "No route matched");
            return Err(Error::NotFound);
        };

        let Some(binding) = entry.binding_for(&method) else {
            debug!(
                method = %method,
                path = %path,
                route_pattern = %entry.key,
                "Method not allowed"
            );
            return Err(Error::MethodNotAllowed {
                method,
                path: path.to_string(),
            });
        };

        let path_params = binding.extract(path)?;
        debug!(
            method = %method,
            path = %path,
            handler_name = %binding.handler.name(),
            route_pattern = %entry.key,
            path_params = ?path_params,
            "Route matched"
        );

        Ok(RouteMatch {
            handler: binding.handler.clone(),
            path_params,
            path: binding.path.clone(),
        })
    }

    /// Log every registered route.
    pub fn dump_routes(&self) {
        info!(
            prefix = %self.prefix,
            count = self.routes.len(),
            "Route table"
        );
        for entry in &self.routes {
            for binding in &entry.bindings {
                info!(
                    method = %binding.method,
                    path = %binding.path,
                    pattern = %entry.key,
                    handler_name = %binding.handler.name(),
                    "Route"
                );
            }
        }
    }

    /// Compile a path template against the parameters `handler` declares.
    pub(crate) fn path_to_regex(path: &str, handler: &Handler) -> Result<CompiledPath, RouteError> {
        if !path.starts_with('/') {
            return Err(RouteError::InvalidPath {
                path: path.to_string(),
            });
        }

        let mut key_parts = Vec::new();
        let mut pattern_parts = Vec::new();
        let mut attrs: Vec<(String, FieldType)> = Vec::new();

        for part in path.split('/') {
            let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) else {
                let literal = regex::escape(part);
                key_parts.push(literal.clone());
                pattern_parts.push(literal);
                continue;
            };

            if attrs.iter().any(|(existing, _)| existing == name) {
                return Err(RouteError::DuplicateParam {
                    name: name.to_string(),
                });
            }
            let param = handler
                .find_param(name)
                .ok_or_else(|| RouteError::MissingParam {
                    name: name.to_string(),
                })?;
            let ty = param.ty.clone().unwrap_or(FieldType::Text);
            let sub = ty.path_pattern().ok_or_else(|| RouteError::UnsupportedType {
                name: name.to_string(),
                ty: ty.to_string(),
            })?;

            key_parts.push(format!("({sub})"));
            pattern_parts.push(format!("(?P<{name}>{sub})"));
            attrs.push((name.to_string(), ty));
        }

        Ok(CompiledPath {
            key: key_parts.join("/"),
            pattern: pattern_parts.join("/"),
            attrs,
        })
    }

    fn add_binding(&mut self, key: &str, binding: MethodBinding) -> Result<(), RouteError> {
        let index = match self.routes.iter().position(|entry| entry.key == key) {
            Some(index) => index,
            None => {
                self.routes.push(RouteEntry::new(key.to_string())?);
                self.routes.len() - 1
            }
        };
        self.routes[index].add(binding)
    }
}

fn validate_prefix(prefix: &str) -> Result<(), RouteError> {
    if (!prefix.is_empty() && !prefix.starts_with('/')) || prefix == "/" {
        return Err(RouteError::InvalidPrefix {
            prefix: prefix.to_string(),
        });
    }
    Ok(())
}

fn anchored(pattern: &str) -> Result<Regex, RouteError> {
    Ok(Regex::new(&format!("^{pattern}$"))?)
}
