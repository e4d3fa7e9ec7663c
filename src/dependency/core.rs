use crate::coerce::{FieldType, FromParam, ParamValue};
use crate::error::{Error, Result};
use crate::server::{Request, SharedResponse};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tracing::trace;

/// Deferred second phase of a dependency, run after the handler returns.
pub type Cleanup = Box<dyn FnOnce() -> Result<()>>;

type ProviderFn = dyn Fn(&mut Args) -> Result<Resolved> + Send + Sync;

/// Everything a dependency may know about the slot it is filling.
pub struct InjectContext {
    /// Name of the parameter being resolved; `None` for the top-level invocation.
    pub param_name: Option<String>,
    /// Declared type of that parameter, if any.
    pub param_type: Option<FieldType>,
    pub request: Rc<Request>,
    pub response: SharedResponse,
}

impl InjectContext {
    /// Context for invoking a handler directly.
    pub fn new(request: Rc<Request>, response: SharedResponse) -> Self {
        Self {
            param_name: None,
            param_type: None,
            request,
            response,
        }
    }

    /// Context for resolving the dependency attached to `param`.
    #[must_use]
    pub fn child(&self, param: &Param) -> Self {
        Self {
            param_name: Some(param.name.clone()),
            param_type: param.ty.clone(),
            request: Rc::clone(&self.request),
            response: Rc::clone(&self.response),
        }
    }
}

impl Clone for InjectContext {
    fn clone(&self) -> Self {
        Self {
            param_name: self.param_name.clone(),
            param_type: self.param_type.clone(),
            request: Rc::clone(&self.request),
            response: Rc::clone(&self.response),
        }
    }
}

impl fmt::Debug for InjectContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectContext")
            .field("param_name", &self.param_name)
            .field("param_type", &self.param_type)
            .field("method", &self.request.method())
            .field("path", &self.request.path())
            .finish()
    }
}

/// Where a parameter's value comes from.
#[derive(Clone)]
pub enum ParamSource {
    /// Supplied by the caller: path parameters, or internal bindings.
    Plain,
    /// Resolved through a dependency before the call.
    Inject(Dependency),
    /// The current [`InjectContext`] itself.
    Context,
}

impl fmt::Debug for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamSource::Plain => f.write_str("Plain"),
            ParamSource::Inject(_) => f.write_str("Inject"),
            ParamSource::Context => f.write_str("Context"),
        }
    }
}

/// One declared parameter of a handler or dependency.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Option<FieldType>,
    pub source: ParamSource,
}

/// Builder methods shared by everything that declares parameters.
pub trait Signature: Sized {
    fn params(&self) -> &[Param];

    fn params_mut(&mut self) -> &mut Vec<Param>;

    fn find_param(&self, name: &str) -> Option<&Param> {
        self.params().iter().find(|p| p.name == name)
    }

    /// A caller-supplied parameter with a declared type.
    fn param(mut self, name: &str, ty: FieldType) -> Self {
        self.params_mut().push(Param {
            name: name.to_string(),
            ty: Some(ty),
            source: ParamSource::Plain,
        });
        self
    }

    /// A caller-supplied parameter without a declared type.
    fn untyped_param(mut self, name: &str) -> Self {
        self.params_mut().push(Param {
            name: name.to_string(),
            ty: None,
            source: ParamSource::Plain,
        });
        self
    }

    /// A parameter filled by `dependency`, with no declared type.
    fn inject(mut self, name: &str, dependency: impl Into<Dependency>) -> Self {
        self.params_mut().push(Param {
            name: name.to_string(),
            ty: None,
            source: ParamSource::Inject(dependency.into()),
        });
        self
    }

    /// A parameter filled by `dependency`; the dependency sees `ty` in its context.
    fn inject_as(mut self, name: &str, ty: FieldType, dependency: impl Into<Dependency>) -> Self {
        self.params_mut().push(Param {
            name: name.to_string(),
            ty: Some(ty),
            source: ParamSource::Inject(dependency.into()),
        });
        self
    }

    /// A parameter bound to the current [`InjectContext`].
    fn context(mut self, name: &str) -> Self {
        self.params_mut().push(Param {
            name: name.to_string(),
            ty: None,
            source: ParamSource::Context,
        });
        self
    }
}

/// First-phase result of a dependency: the injected value plus optional cleanup.
pub struct Resolved {
    value: Box<dyn Any>,
    cleanup: Option<Cleanup>,
}

impl Resolved {
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            value: Box::new(value),
            cleanup: None,
        }
    }

    /// Run `cleanup` once the handler has returned.
    #[must_use]
    pub fn with_cleanup<F>(mut self, cleanup: F) -> Self
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        self.cleanup = Some(Box::new(cleanup));
        self
    }

    #[must_use]
    pub fn has_cleanup(&self) -> bool {
        self.cleanup.is_some()
    }

    pub fn into_parts(self) -> (Box<dyn Any>, Option<Cleanup>) {
        (self.value, self.cleanup)
    }
}

/// A two-phase provider with its own declared parameters.
///
/// The provider runs before the handler and returns a [`Resolved`]; its cleanup,
/// if any, runs after the handler returns. Parameters of the provider are resolved
/// with the same algorithm as handler parameters, so dependencies compose.
#[derive(Clone)]
pub struct Dependency {
    params: Vec<Param>,
    provider: Arc<ProviderFn>,
}

impl Dependency {
    pub fn new<F>(provider: F) -> Self
    where
        F: Fn(&mut Args) -> Result<Resolved> + Send + Sync + 'static,
    {
        Self {
            params: Vec::new(),
            provider: Arc::new(provider),
        }
    }

    /// A dependency that yields a fresh clone of `value` and has no cleanup.
    pub fn value<T>(value: T) -> Self
    where
        T: Any + Clone + Send + Sync,
    {
        Self::new(move |_| Ok(Resolved::new(value.clone())))
    }

    /// Run the provider under `ctx`, resolving its own parameters first.
    ///
    /// Cleanups of nested dependencies run as soon as the provider returns.
    pub fn resolve(&self, ctx: &InjectContext) -> Result<Resolved> {
        invoke(ctx, &self.params, Args::new(), |args| (self.provider)(args))
    }
}

impl Signature for Dependency {
    fn params(&self) -> &[Param] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut Vec<Param> {
        &mut self.params
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Values bound for one call: named parameters plus positional arguments.
#[derive(Default)]
pub struct Args {
    named: HashMap<String, Box<dyn Any>>,
    positional: Vec<Box<dyn Any>>,
}

impl Args {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    #[must_use]
    pub fn with_positional<T: Any>(mut self, value: T) -> Self {
        self.positional.push(Box::new(value));
        self
    }

    pub fn insert<T: Any>(&mut self, name: impl Into<String>, value: T) {
        self.named.insert(name.into(), Box::new(value));
    }

    pub fn insert_boxed(&mut self, name: impl Into<String>, value: Box<dyn Any>) {
        self.named.insert(name.into(), value);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// Borrow a named binding.
    pub fn get<T: Any>(&self, name: &str) -> Result<&T> {
        self.named
            .get(name)
            .ok_or_else(|| missing(name))?
            .downcast_ref::<T>()
            .ok_or_else(|| mistyped(name))
    }

    /// Move a named binding out.
    pub fn take<T: Any>(&mut self, name: &str) -> Result<T> {
        let value = self.named.remove(name).ok_or_else(|| missing(name))?;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => {
                self.named.insert(name.to_string(), value);
                Err(mistyped(name))
            }
        }
    }

    /// Read a coerced path or query parameter as a native type.
    pub fn param<T: FromParam>(&self, name: &str) -> Result<T> {
        T::from_param(self.get::<ParamValue>(name)?).ok_or_else(|| mistyped(name))
    }

    /// Borrow a positional argument.
    pub fn arg<T: Any>(&self, index: usize) -> Result<&T> {
        let label = || format!("#{index}");
        self.positional
            .get(index)
            .ok_or_else(|| missing(&label()))?
            .downcast_ref::<T>()
            .ok_or_else(|| mistyped(&label()))
    }

    /// The error an error handler was invoked for.
    pub fn error(&self) -> Result<&Error> {
        self.arg::<Rc<Error>>(0).map(|err| &**err)
    }

    /// Borrow a context binding declared with [`Signature::context`].
    pub fn context(&self, name: &str) -> Result<&InjectContext> {
        self.get::<InjectContext>(name)
    }
}

impl From<HashMap<String, ParamValue>> for Args {
    fn from(values: HashMap<String, ParamValue>) -> Self {
        let mut args = Args::new();
        for (name, value) in values {
            args.insert(name, value);
        }
        args
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("named", &self.named.keys().collect::<Vec<_>>())
            .field("positional", &self.positional.len())
            .finish()
    }
}

fn missing(name: &str) -> Error {
    Error::Binding {
        name: name.to_string(),
        reason: "was not bound",
    }
}

fn mistyped(name: &str) -> Error {
    Error::Binding {
        name: name.to_string(),
        reason: "has a different type than requested",
    }
}

/// Resolve `params` under `ctx`, run `call`, then run the collected cleanups.
///
/// Context parameters receive a clone of `ctx`; injected parameters are resolved in
/// declaration order, each under a child context naming that parameter; plain
/// parameters must already be present in `args`. Cleanups run in the order their
/// dependencies were entered, and only if `call` succeeded. A failing cleanup stops
/// the remaining ones and its error is returned.
pub fn invoke<R>(
    ctx: &InjectContext,
    params: &[Param],
    mut args: Args,
    call: impl FnOnce(&mut Args) -> Result<R>,
) -> Result<R> {
    let mut cleanups: Vec<Cleanup> = Vec::new();

    for param in params {
        match &param.source {
            ParamSource::Context => args.insert(param.name.clone(), ctx.clone()),
            ParamSource::Inject(dependency) => {
                let child = ctx.child(param);
                let (value, cleanup) = dependency.resolve(&child)?.into_parts();
                trace!(
                    param = %param.name,
                    has_cleanup = cleanup.is_some(),
                    "Dependency resolved"
                );
                args.insert_boxed(param.name.clone(), value);
                cleanups.extend(cleanup);
            }
            ParamSource::Plain => {}
        }
    }

    let result = call(&mut args)?;

    for cleanup in cleanups {
        cleanup()?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Response;
    use std::cell::RefCell;

    fn context() -> InjectContext {
        InjectContext::new(Rc::new(Request::new("GET", "/")), Response::default().shared())
    }

    #[test]
    fn test_args_take_and_get() {
        let mut args = Args::new();
        args.insert("n", 5_i32);
        assert_eq!(args.get::<i32>("n").unwrap(), &5);
        assert!(matches!(args.get::<String>("n"), Err(Error::Binding { .. })));
        assert!(args.take::<String>("n").is_err());
        assert_eq!(args.take::<i32>("n").unwrap(), 5);
        assert!(!args.contains("n"));
    }

    #[test]
    fn test_args_param() {
        let mut values = HashMap::new();
        values.insert("id".to_string(), ParamValue::Integer(42));
        let args = Args::from(values);
        assert_eq!(args.param::<i64>("id").unwrap(), 42);
        assert!(args.param::<String>("id").is_err());
    }

    #[test]
    fn test_nested_resolution_sees_child_context() {
        let inner = Dependency::new(|args| {
            let ctx = args.context("ctx")?;
            Ok(Resolved::new(ctx.param_name.clone().unwrap_or_default()))
        })
        .context("ctx");
        let outer = Dependency::new(|args| {
            let name: String = args.take("dep")?;
            Ok(Resolved::new(format!("{name}+outer")))
        })
        .inject("dep", inner);

        let resolved = outer.resolve(&context()).unwrap();
        let (value, _) = resolved.into_parts();
        assert_eq!(*value.downcast::<String>().unwrap(), "dep+outer");
    }

    thread_local! {
        static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    fn logged(name: &'static str) -> Dependency {
        Dependency::new(move |_| {
            LOG.with(|log| log.borrow_mut().push(format!("enter {name}")));
            Ok(Resolved::new(name.to_string()).with_cleanup(move || {
                LOG.with(|log| log.borrow_mut().push(format!("exit {name}")));
                Ok(())
            }))
        })
    }

    #[test]
    fn test_cleanups_run_in_entry_order_after_call() {
        LOG.with(|log| log.borrow_mut().clear());
        let params = vec![
            Param {
                name: "a".to_string(),
                ty: None,
                source: ParamSource::Inject(logged("a")),
            },
            Param {
                name: "b".to_string(),
                ty: None,
                source: ParamSource::Inject(logged("b")),
            },
        ];

        let result = invoke(&context(), &params, Args::new(), |args| {
            let a: String = args.take("a")?;
            let b: String = args.take("b")?;
            LOG.with(|log| log.borrow_mut().push(format!("call {a}{b}")));
            Ok(7)
        })
        .unwrap();

        assert_eq!(result, 7);
        assert_eq!(
            LOG.with(|log| log.borrow().clone()),
            vec!["enter a", "enter b", "call ab", "exit a", "exit b"]
        );
    }

    #[test]
    fn test_failing_call_skips_cleanup() {
        thread_local! {
            static CLEANED: RefCell<bool> = const { RefCell::new(false) };
        }
        let dep = Dependency::new(|_| {
            Ok(Resolved::new(()).with_cleanup(|| {
                CLEANED.with(|c| *c.borrow_mut() = true);
                Ok(())
            }))
        });
        let params = vec![Param {
            name: "d".to_string(),
            ty: None,
            source: ParamSource::Inject(dep),
        }];
        let result: Result<()> = invoke(&context(), &params, Args::new(), |_| {
            Err(Error::bad_request("nope"))
        });
        assert!(result.is_err());
        assert!(!CLEANED.with(|c| *c.borrow()));
    }
}
